// Container runtime operations (local image query and pull)

use std::process::{Command, Stdio};
use tracing::debug;

use super::error::ProvisionError;
use super::reference::ImageRef;

/// Operations the provisioner needs from a container runtime
pub trait ContainerRuntime {
    /// Display name of the runtime command (e.g. "docker")
    fn name(&self) -> &str;

    /// Check whether the image is in the runtime's local image store
    fn image_present(&self, image: &ImageRef) -> Result<bool, ProvisionError>;

    /// Pull the image from its registry into the local image store
    fn pull(&self, image: &ImageRef) -> Result<(), ProvisionError>;
}

/// Container runtime driven through its CLI (docker, podman, ...)
#[derive(Debug, Clone)]
pub struct CliRuntime {
    program: String,
    leading_args: Vec<String>,
}

impl CliRuntime {
    /// Parse a runtime command such as `docker` or `docker --context remote`
    pub fn from_command_line(command_line: &str) -> Option<Self> {
        let mut parts = command_line.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self {
            program,
            leading_args: parts.collect(),
        })
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.leading_args);
        cmd
    }

    /// Fail early if the runtime CLI cannot be executed at all
    pub fn check_available(&self) -> Result<(), ProvisionError> {
        let mut cmd = self.command();
        cmd.arg("--version");
        debug!("Executing command: {:?}", cmd);

        cmd.output()
            .map(|_| ())
            .map_err(|source| ProvisionError::RuntimeUnavailable {
                cli: self.program.clone(),
                source,
            })
    }
}

impl ContainerRuntime for CliRuntime {
    fn name(&self) -> &str {
        &self.program
    }

    fn image_present(&self, image: &ImageRef) -> Result<bool, ProvisionError> {
        let mut cmd = self.command();
        cmd.arg("images").arg("-q").arg(image.as_str());
        cmd.stdin(Stdio::null()).stderr(Stdio::null());

        debug!("Executing command: {:?}", cmd);

        let output = cmd.output().map_err(|source| ProvisionError::Spawn {
            command: format!("{} images", self.program),
            source,
        })?;

        if !output.status.success() {
            // Treated as absent; the pull reports the real problem
            debug!(
                "{} images -q {} exited with status: {}",
                self.program, image, output.status
            );
            return Ok(false);
        }

        Ok(has_image_ids(&String::from_utf8_lossy(&output.stdout)))
    }

    fn pull(&self, image: &ImageRef) -> Result<(), ProvisionError> {
        let mut cmd = self.command();
        cmd.arg("pull").arg(image.as_str());
        cmd.stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        debug!("Executing command: {:?}", cmd);

        let status = cmd.status().map_err(|source| ProvisionError::Spawn {
            command: format!("{} pull", self.program),
            source,
        })?;

        if !status.success() {
            return Err(ProvisionError::PullFailed {
                reference: image.to_string(),
                code: status.code(),
            });
        }

        Ok(())
    }
}

/// `images -q` prints one image ID per line; no lines means no match
fn has_image_ids(stdout: &str) -> bool {
    stdout.lines().any(|line| !line.trim().is_empty())
}
