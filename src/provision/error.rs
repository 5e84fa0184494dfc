use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("Failed to pull image {reference}{}", exit_suffix(*code))]
    PullFailed {
        reference: String,
        code: Option<i32>,
    },

    #[error("{cli} CLI not found. Please install Docker or Podman.")]
    RuntimeUnavailable {
        cli: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to execute {command}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Image reference is empty")]
    EmptyReference,
}

impl ProvisionError {
    /// Process exit code to report for this error
    ///
    /// A failed pull propagates the runtime's own exit code; everything else is 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            ProvisionError::PullFailed {
                code: Some(code), ..
            } if *code != 0 => *code,
            _ => 1,
        }
    }
}

fn exit_suffix(code: Option<i32>) -> String {
    match code {
        Some(code) => format!(" (exit code {})", code),
        None => " (terminated by signal)".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pull_failure_propagates_exit_code() {
        let err = ProvisionError::PullFailed {
            reference: "redis:latest".to_string(),
            code: Some(125),
        };
        assert_eq!(err.exit_code(), 125);
        assert_eq!(
            err.to_string(),
            "Failed to pull image redis:latest (exit code 125)"
        );
    }

    #[test]
    fn test_pull_failure_without_code_exits_one() {
        let err = ProvisionError::PullFailed {
            reference: "redis:latest".to_string(),
            code: None,
        };
        assert_eq!(err.exit_code(), 1);
        assert!(err.to_string().ends_with("(terminated by signal)"));
    }

    #[test]
    fn test_other_errors_exit_one() {
        let err = ProvisionError::RuntimeUnavailable {
            cli: "podman".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        };
        assert_eq!(err.exit_code(), 1);
        assert_eq!(ProvisionError::EmptyReference.exit_code(), 1);
    }
}
