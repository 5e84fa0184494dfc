// Configuration: project file (provision.toml / .provision.toml), global file,
// environment variables and CLI flags

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::provision::{ImageCatalog, ImageEntry, ImageSource};

pub const PROJECT_CONFIG_FILE: &str = "provision.toml";
pub const HIDDEN_PROJECT_CONFIG_FILE: &str = ".provision.toml";

/// Environment variable selecting the container CLI
pub const CONTAINER_CLI_ENV: &str = "CONTAINER_CLI";

const DEFAULT_CONTAINER_CLI: &str = "docker";

/// Read an environment variable, treating empty strings as if the variable is not set.
pub(crate) fn env_var_non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Root structure for provision.toml / .provision.toml
#[derive(Debug, Deserialize, Serialize, Default)]
pub struct ProjectConfig {
    /// Optional version (must be 1 if present)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime: Option<RuntimeConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<ImagesConfig>,
}

#[derive(Debug, Deserialize, Serialize, Default)]
pub struct RuntimeConfig {
    /// Container CLI to use (docker, podman, or a command with leading arguments)
    pub container_cli: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Default)]
pub struct ImagesConfig {
    /// Environment variable holding the application version
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_env: Option<String>,

    /// Version used when the version variable is unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_version: Option<String>,

    /// Ordered image entries; replaces the built-in list when non-empty
    #[serde(default, rename = "entry", skip_serializing_if = "Vec::is_empty")]
    pub entries: Vec<EntryConfig>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct EntryConfig {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub env: Option<String>,

    /// Complete image reference
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,

    /// Repository name, tagged with the application version
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,
}

impl TryFrom<EntryConfig> for ImageEntry {
    type Error = anyhow::Error;

    fn try_from(entry: EntryConfig) -> Result<Self> {
        let source = match (entry.default, entry.base) {
            (Some(default), None) => ImageSource::Fixed { default },
            (None, Some(base)) => ImageSource::Versioned { base },
            (Some(_), Some(_)) => bail!(
                "Image entry '{}' sets both 'default' and 'base'; use exactly one",
                entry.name
            ),
            (None, None) => bail!(
                "Image entry '{}' needs either 'default' or 'base'",
                entry.name
            ),
        };

        Ok(ImageEntry {
            name: entry.name,
            env: entry.env,
            source,
        })
    }
}

impl From<&ImageEntry> for EntryConfig {
    fn from(entry: &ImageEntry) -> Self {
        let (default, base) = match &entry.source {
            ImageSource::Fixed { default } => (Some(default.clone()), None),
            ImageSource::Versioned { base } => (None, Some(base.clone())),
        };
        Self {
            name: entry.name.clone(),
            env: entry.env.clone(),
            default,
            base,
        }
    }
}

impl ImagesConfig {
    /// Build the image catalog, starting from the built-in one
    pub fn into_catalog(self) -> Result<ImageCatalog> {
        let mut catalog = ImageCatalog::default();

        if !self.entries.is_empty() {
            catalog.entries = self
                .entries
                .into_iter()
                .map(ImageEntry::try_from)
                .collect::<Result<Vec<_>>>()?;
            // A custom list only gets a default version if the file names one
            catalog.default_version = None;
        }
        if let Some(version_env) = self.version_env {
            catalog.version_env = version_env;
        }
        if let Some(default_version) = self.default_version {
            catalog.default_version = Some(default_version);
        }

        Ok(catalog)
    }
}

impl From<&ImageCatalog> for ImagesConfig {
    fn from(catalog: &ImageCatalog) -> Self {
        Self {
            version_env: Some(catalog.version_env.clone()),
            default_version: catalog.default_version.clone(),
            entries: catalog.entries.iter().map(EntryConfig::from).collect(),
        }
    }
}

/// Locate the project config file in a directory
///
/// provision.toml takes precedence over .provision.toml.
pub fn find_project_config(dir: &Path) -> Option<PathBuf> {
    let visible = dir.join(PROJECT_CONFIG_FILE);
    let hidden = dir.join(HIDDEN_PROJECT_CONFIG_FILE);

    if visible.exists() && hidden.exists() {
        warn!(
            "Both {} and {} found. Using {}.",
            PROJECT_CONFIG_FILE, HIDDEN_PROJECT_CONFIG_FILE, PROJECT_CONFIG_FILE
        );
    }

    if visible.exists() {
        Some(visible)
    } else if hidden.exists() {
        Some(hidden)
    } else {
        None
    }
}

/// Parse a project config file, warning about unknown fields
pub fn load_project_config_file(path: &Path) -> Result<ProjectConfig> {
    info!("Loading project config from {}", path.display());
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let mut unused_fields = Vec::new();
    let deserializer = toml::Deserializer::new(&content);
    let config: ProjectConfig = serde_ignored::deserialize(deserializer, |field| {
        unused_fields.push(field.to_string());
    })
    .with_context(|| format!("Failed to parse {}", path.display()))?;

    for field in &unused_fields {
        warn!(
            "Unknown configuration field in {}: {}",
            path.display(),
            field
        );
    }

    match config.version {
        Some(1) => {}
        Some(version) => bail!(
            "Unsupported {} version: {}. This tool supports version 1.",
            path.display(),
            version
        ),
        None => debug!("No version specified in {}, using latest", path.display()),
    }

    Ok(config)
}

/// Load the project config from an explicit path or by searching `dir`
///
/// Returns Ok(None) if no path was given and no config file was found.
pub fn load_project_config(explicit: Option<&Path>, dir: &Path) -> Result<Option<ProjectConfig>> {
    match explicit {
        Some(path) => {
            if !path.is_file() {
                bail!("Config file '{}' does not exist", path.display());
            }
            load_project_config_file(path).map(Some)
        }
        None => find_project_config(dir)
            .map(|path| load_project_config_file(&path))
            .transpose(),
    }
}

/// Write a project config to `dir/provision.toml`
pub fn write_project_config(dir: &Path, config: &ProjectConfig) -> Result<PathBuf> {
    let path = dir.join(PROJECT_CONFIG_FILE);
    let toml_string = toml::to_string_pretty(config).context("Failed to serialize config")?;
    std::fs::write(&path, toml_string)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    info!("Wrote project config to {}", path.display());
    Ok(path)
}

/// Per-user settings (~/.config/image-provisioner/config.toml on Linux)
#[derive(Debug, Deserialize, Default)]
pub struct GlobalConfig {
    pub container_cli: Option<String>,
}

impl GlobalConfig {
    /// Get the path to the global config file
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("image-provisioner").join("config.toml"))
    }

    /// Load the global config; a missing file yields the defaults
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }
}

/// Fully resolved settings for a run
#[derive(Debug)]
pub struct Settings {
    pub container_cli: String,
    pub catalog: ImageCatalog,
}

impl Settings {
    /// Merge all configuration sources
    ///
    /// Container CLI precedence (highest to lowest):
    /// 1. CLI flag
    /// 2. CONTAINER_CLI environment variable
    /// 3. Project config file
    /// 4. Global config file
    /// 5. "docker"
    pub fn merge(
        cli_flag: Option<&str>,
        env_cli: Option<String>,
        project: Option<ProjectConfig>,
        global: GlobalConfig,
    ) -> Result<Self> {
        let project = project.unwrap_or_default();

        // A blank value at any layer counts as unset
        let non_blank = |cli: &String| !cli.trim().is_empty();
        let container_cli = cli_flag
            .map(str::to_string)
            .filter(non_blank)
            .or(env_cli.filter(non_blank))
            .or_else(|| {
                project
                    .runtime
                    .and_then(|r| r.container_cli)
                    .filter(non_blank)
            })
            .or(global.container_cli.filter(non_blank))
            .unwrap_or_else(|| DEFAULT_CONTAINER_CLI.to_string());

        let catalog = match project.images {
            Some(images) => images.into_catalog()?,
            None => ImageCatalog::default(),
        };

        debug!("Using container CLI: {}", container_cli);
        Ok(Self {
            container_cli,
            catalog,
        })
    }

    /// Load settings from the working directory, environment and global config
    pub fn load(config_path: Option<&Path>, cli_flag: Option<&str>) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to determine working directory")?;
        let project = load_project_config(config_path, &cwd)?;

        let global = GlobalConfig::load().unwrap_or_else(|e| {
            warn!(
                "Failed to load global config: {:#}. Continuing without it.",
                e
            );
            GlobalConfig::default()
        });

        Self::merge(
            cli_flag,
            env_var_non_empty(CONTAINER_CLI_ENV),
            project,
            global,
        )
    }
}

/// Default config written by `init`
pub fn default_project_config() -> ProjectConfig {
    ProjectConfig {
        version: Some(1),
        runtime: Some(RuntimeConfig {
            container_cli: Some(DEFAULT_CONTAINER_CLI.to_string()),
        }),
        images: Some(ImagesConfig::from(&ImageCatalog::default())),
    }
}
