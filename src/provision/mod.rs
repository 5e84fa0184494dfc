// Provision module - make sure container images are present locally
//
// Walks an ordered list of image references, skips the ones the container
// runtime already has and pulls the rest. The first failed pull aborts the run.

pub(crate) mod catalog;
mod error;
mod reference;
mod runtime;

pub use catalog::{ImageCatalog, ImageEntry, ImageSource};
pub use error::ProvisionError;
pub use reference::ImageRef;
pub use runtime::{CliRuntime, ContainerRuntime};

use tracing::info;

/// What `ensure_present` did for a single image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    AlreadyPresent,
    Pulled,
}

/// Result of a complete provisioning run
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Summary {
    pub already_present: Vec<ImageRef>,
    pub pulled: Vec<ImageRef>,
}

impl Summary {
    fn record(&mut self, image: &ImageRef, outcome: Outcome) {
        match outcome {
            Outcome::AlreadyPresent => self.already_present.push(image.clone()),
            Outcome::Pulled => self.pulled.push(image.clone()),
        }
    }

    pub fn total(&self) -> usize {
        self.already_present.len() + self.pulled.len()
    }
}

/// Make sure a single image is in the local image store, pulling it if needed
pub fn ensure_present<R: ContainerRuntime + ?Sized>(
    runtime: &R,
    image: &ImageRef,
) -> Result<Outcome, ProvisionError> {
    if runtime.image_present(image)? {
        info!("Image {} already exists locally, skipping pull", image);
        return Ok(Outcome::AlreadyPresent);
    }

    info!("Pulling image {} with {}...", image, runtime.name());
    runtime.pull(image)?;
    info!("✓ Pulled image {}", image);
    Ok(Outcome::Pulled)
}

/// Provision every image in order, stopping at the first failure
pub fn run_all<R: ContainerRuntime + ?Sized>(
    runtime: &R,
    images: &[ImageRef],
) -> Result<Summary, ProvisionError> {
    info!("==== Pulling images ====");

    let mut summary = Summary::default();
    for image in images {
        let outcome = ensure_present(runtime, image)?;
        summary.record(image, outcome);
    }

    info!(
        "✓ All {} images present ({} pulled, {} already present)",
        summary.total(),
        summary.pulled.len(),
        summary.already_present.len()
    );
    Ok(summary)
}


#[cfg(test)]
mod tests {
    use super::testing::{refs, RecordingRuntime};
    use super::*;

    #[test]
    fn test_present_image_is_not_pulled() {
        let runtime = RecordingRuntime::default().with_present(&["postgres:latest"]);
        let image = ImageRef::new("postgres:latest").unwrap();

        let outcome = ensure_present(&runtime, &image).unwrap();

        assert_eq!(outcome, Outcome::AlreadyPresent);
        assert!(runtime.pulls().is_empty());
    }

    #[test]
    fn test_absent_image_is_pulled_once() {
        let runtime = RecordingRuntime::default();
        let image = ImageRef::new("redis:latest").unwrap();

        let outcome = ensure_present(&runtime, &image).unwrap();

        assert_eq!(outcome, Outcome::Pulled);
        assert_eq!(
            *runtime.calls.borrow(),
            vec!["query redis:latest", "pull redis:latest"]
        );
    }

    #[test]
    fn test_all_absent_pulls_in_order() {
        let runtime = RecordingRuntime::default();

        let summary = run_all(&runtime, &refs(&["postgres:latest", "redis:latest"])).unwrap();

        assert_eq!(runtime.pulls(), vec!["postgres:latest", "redis:latest"]);
        assert_eq!(summary.pulled, refs(&["postgres:latest", "redis:latest"]));
        assert!(summary.already_present.is_empty());
    }

    #[test]
    fn test_only_missing_images_are_pulled() {
        let runtime = RecordingRuntime::default().with_present(&["postgres:latest"]);

        let summary = run_all(&runtime, &refs(&["postgres:latest", "redis:latest"])).unwrap();

        assert_eq!(runtime.pulls(), vec!["redis:latest"]);
        assert_eq!(summary.already_present, refs(&["postgres:latest"]));
        assert_eq!(summary.pulled, refs(&["redis:latest"]));
    }

    #[test]
    fn test_first_failure_stops_the_run() {
        let runtime = RecordingRuntime::default().with_failing(&["b"]);

        let err = run_all(&runtime, &refs(&["a", "b", "c"])).unwrap_err();

        assert!(matches!(
            err,
            ProvisionError::PullFailed { ref reference, .. } if reference == "b"
        ));
        assert_eq!(
            *runtime.calls.borrow(),
            vec!["query a", "pull a", "query b", "pull b"]
        );
    }

    #[test]
    fn test_duplicate_reference_pulled_once() {
        let runtime = RecordingRuntime::default();

        let summary = run_all(&runtime, &refs(&["redis:latest", "redis:latest"])).unwrap();

        assert_eq!(runtime.pulls(), vec!["redis:latest"]);
        assert_eq!(summary.pulled.len(), 1);
        assert_eq!(summary.already_present.len(), 1);
    }

    #[test]
    fn test_empty_list_succeeds() {
        let runtime = RecordingRuntime::default();

        let summary = run_all(&runtime, &[]).unwrap();

        assert_eq!(summary.total(), 0);
        assert!(runtime.calls.borrow().is_empty());
    }
}
