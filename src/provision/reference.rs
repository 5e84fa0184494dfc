// Image references as handed to the container runtime

use std::fmt;

use super::error::ProvisionError;

/// A container image reference such as `postgres:10.5-alpine`
///
/// Only emptiness is checked here. Whether the reference is well-formed is left
/// to the container runtime, which reports it as a failed pull.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageRef(String);

impl ImageRef {
    pub fn new(reference: impl Into<String>) -> Result<Self, ProvisionError> {
        let reference = reference.into();
        if reference.trim().is_empty() {
            return Err(ProvisionError::EmptyReference);
        }
        Ok(Self(reference))
    }

    /// Join a base repository name with a version tag (`base:version`)
    pub fn versioned(base: &str, version: &str) -> Result<Self, ProvisionError> {
        Self::new(format!("{}:{}", base, version))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_reference_rejected() {
        assert!(matches!(
            ImageRef::new(""),
            Err(ProvisionError::EmptyReference)
        ));
        assert!(matches!(
            ImageRef::new("   "),
            Err(ProvisionError::EmptyReference)
        ));
    }

    #[test]
    fn test_reference_kept_verbatim() {
        // No normalization: the runtime decides what the reference means
        let image = ImageRef::new("Registry.io/Org/App").unwrap();
        assert_eq!(image.as_str(), "Registry.io/Org/App");
        assert_eq!(image.to_string(), "Registry.io/Org/App");
    }

    #[test]
    fn test_versioned_reference() {
        let image = ImageRef::versioned("appstack/worker", "0.4.2").unwrap();
        assert_eq!(image.as_str(), "appstack/worker:0.4.2");
    }
}
