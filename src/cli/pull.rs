// Pull every catalog image that is missing from the local image store

use anyhow::Result;
use tracing::info;

use crate::config::Settings;
use crate::provision::{self, CliRuntime, ContainerRuntime, Summary};

/// Resolve the catalog and provision it with the configured container CLI
pub fn pull_images(settings: &Settings) -> Result<Summary> {
    let resolved = settings.catalog.resolve_from_env()?;
    let runtime = runtime_for(settings)?;
    runtime.check_available()?;

    pull_catalog(&runtime, resolved)
}

pub(crate) fn runtime_for(settings: &Settings) -> Result<CliRuntime> {
    CliRuntime::from_command_line(&settings.container_cli)
        .ok_or_else(|| anyhow::anyhow!("Container CLI command is empty"))
}

fn pull_catalog<R: ContainerRuntime + ?Sized>(
    runtime: &R,
    resolved: Vec<(String, provision::ImageRef)>,
) -> Result<Summary> {
    for (name, image) in &resolved {
        info!("Image {}: {}", name, image);
    }

    let images: Vec<_> = resolved.into_iter().map(|(_, image)| image).collect();
    Ok(provision::run_all(runtime, &images)?)
}

/// Pull with an explicit catalog and environment, bypassing the process environment
#[cfg(test)]
fn pull_catalog_with_env<R, F>(
    runtime: &R,
    catalog: &provision::ImageCatalog,
    env: F,
) -> Result<Summary>
where
    R: ContainerRuntime + ?Sized,
    F: Fn(&str) -> Option<String>,
{
    pull_catalog(runtime, catalog.resolve(env)?)
}
