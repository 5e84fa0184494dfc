// Image catalog - the ordered list of images a deployment needs
//
// Entries resolve to concrete references from environment variables, falling
// back to built-in defaults. Environment lookups are passed in so resolution
// stays a pure function of its inputs.

use anyhow::{bail, Context, Result};

use super::reference::ImageRef;

/// Environment variable holding the application image version
pub const DEFAULT_VERSION_ENV: &str = "APP_VERSION";

/// Where an entry's reference comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// Complete reference, e.g. `postgres:10.5-alpine`
    Fixed { default: String },
    /// Repository name tagged with the application version
    Versioned { base: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageEntry {
    pub name: String,
    /// Environment variable that overrides the default reference (or base name)
    pub env: Option<String>,
    pub source: ImageSource,
}

impl ImageEntry {
    pub fn fixed(name: &str, env: &str, default: &str) -> Self {
        Self {
            name: name.to_string(),
            env: Some(env.to_string()),
            source: ImageSource::Fixed {
                default: default.to_string(),
            },
        }
    }

    pub fn versioned(name: &str, env: &str, base: &str) -> Self {
        Self {
            name: name.to_string(),
            env: Some(env.to_string()),
            source: ImageSource::Versioned {
                base: base.to_string(),
            },
        }
    }

    fn env_override<F>(&self, env: &F) -> Option<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        self.env
            .as_deref()
            .and_then(env)
            .filter(|value| !value.is_empty())
    }
}

/// Ordered set of images to provision
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageCatalog {
    pub entries: Vec<ImageEntry>,
    pub version_env: String,
    pub default_version: Option<String>,
}

impl Default for ImageCatalog {
    /// Infrastructure services first, then the application images
    fn default() -> Self {
        Self {
            entries: vec![
                ImageEntry::fixed("postgres", "IMAGE_POSTGRES", "postgres:10.5-alpine"),
                ImageEntry::fixed("redis", "IMAGE_REDIS", "redis:5.0.3-alpine3.8"),
                ImageEntry::fixed("kafka", "IMAGE_KAFKA", "bitnami/kafka:2.8.1"),
                ImageEntry::fixed("zookeeper", "IMAGE_ZOOKEEPER", "bitnami/zookeeper:3.7.0"),
                ImageEntry::versioned("admin", "IMAGE_ADMIN", "appstack/admin"),
                ImageEntry::versioned("web-admin", "IMAGE_WEB_ADMIN", "appstack/web-admin"),
                ImageEntry::versioned("worker", "IMAGE_WORKER", "appstack/worker"),
                ImageEntry::versioned("predictor", "IMAGE_PREDICTOR", "appstack/predictor"),
            ],
            version_env: DEFAULT_VERSION_ENV.to_string(),
            default_version: Some("latest".to_string()),
        }
    }
}

impl ImageCatalog {
    /// Resolve the application version, needed only if a versioned entry exists
    fn version<F>(&self, env: &F) -> Result<Option<String>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let needs_version = self
            .entries
            .iter()
            .any(|e| matches!(e.source, ImageSource::Versioned { .. }));
        if !needs_version {
            return Ok(None);
        }

        match env(self.version_env.as_str())
            .filter(|v| !v.is_empty())
            .or_else(|| self.default_version.clone().filter(|v| !v.is_empty()))
        {
            Some(version) => Ok(Some(version)),
            None => bail!(
                "No image version configured. Set {} or images.default_version.",
                self.version_env
            ),
        }
    }

    /// Resolve every entry to a concrete reference, keeping catalog order
    pub fn resolve<F>(&self, env: F) -> Result<Vec<(String, ImageRef)>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let version = self.version(&env)?;

        let mut resolved = Vec::with_capacity(self.entries.len());
        for entry in &self.entries {
            let image = match &entry.source {
                ImageSource::Fixed { default } => {
                    let reference = entry.env_override(&env).unwrap_or_else(|| default.clone());
                    ImageRef::new(reference)
                }
                ImageSource::Versioned { base } => {
                    let base = entry.env_override(&env).unwrap_or_else(|| base.clone());
                    // version() only returns None when no entry is versioned
                    ImageRef::versioned(&base, version.as_deref().unwrap_or_default())
                }
            }
            .with_context(|| format!("Invalid image entry '{}'", entry.name))?;

            resolved.push((entry.name.clone(), image));
        }

        Ok(resolved)
    }

    /// Resolve against the process environment
    pub fn resolve_from_env(&self) -> Result<Vec<(String, ImageRef)>> {
        self.resolve(|key| std::env::var(key).ok())
    }
}
