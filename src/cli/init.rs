// Write a provision.toml containing the built-in catalog

use anyhow::{bail, Result};
use std::path::{Path, PathBuf};

use crate::config::{self, PROJECT_CONFIG_FILE};

pub fn init_config(dir: &Path, force: bool) -> Result<PathBuf> {
    let path = dir.join(PROJECT_CONFIG_FILE);
    if path.exists() && !force {
        bail!(
            "{} already exists. Use --force to overwrite it.",
            path.display()
        );
    }

    let path = config::write_project_config(dir, &config::default_project_config())?;
    println!("Created {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_refuses_to_overwrite() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join(PROJECT_CONFIG_FILE);
        std::fs::write(&path, "version = 1\n").unwrap();

        assert!(init_config(temp_dir.path(), false).is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "version = 1\n");

        init_config(temp_dir.path(), true).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("[[images.entry]]"));
        assert!(written.contains("IMAGE_POSTGRES"));
    }
}
