//! Deleting the scratch directory and the generated-source tree.

use std::io;
use std::path::Path;

use tokio::fs;

use crate::config::Config;
use crate::{Error, Result};

/// Recursively delete `dir`. Returns whether anything was removed.
pub async fn remove_dir_if_exists(dir: &Path) -> Result<bool> {
    match fs::remove_dir_all(dir).await {
        Ok(()) => {
            log::debug!("Removed {}", dir.display());
            Ok(true)
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(Error::at_path(dir, e)),
    }
}

/// Delete the scratch directory once its sources have been relocated
pub async fn clean_generated_directory(config: &Config) -> Result<bool> {
    config.validate()?;
    let removed = remove_dir_if_exists(&config.scratch_path()).await?;
    if removed {
        log::info!("Removed scratch directory {}", config.scratch_path().display());
    }
    Ok(removed)
}

/// Delete the whole generated-source tree and the scratch directory.
///
/// Hand edits inside the generated tree are lost; the next build recreates
/// the tree from the current contracts only.
pub async fn clean(config: &Config) -> Result<bool> {
    config.validate()?;
    let generated = remove_dir_if_exists(&config.generated_path()).await?;
    if generated {
        log::info!(
            "Removed generated sources {}",
            config.generated_path().display()
        );
    }
    let scratch = remove_dir_if_exists(&config.scratch_path()).await?;
    Ok(generated || scratch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn config(root: &Path) -> Config {
        let mut config = Config::new("com.example");
        config.project_root = root.to_path_buf();
        config
    }

    #[tokio::test]
    async fn test_remove_absent_dir_is_noop() -> Result<()> {
        let root = tempdir()?;
        assert!(!remove_dir_if_exists(&root.path().join("missing")).await?);
        Ok(())
    }

    #[tokio::test]
    async fn test_clean_generated_directory_removes_scratch_only() -> Result<()> {
        let root = tempdir()?;
        let config = config(root.path());
        fs::create_dir_all(config.scratch_path().join("src/main/kotlin")).await?;
        fs::create_dir_all(config.generated_path().join("com/example/api")).await?;

        assert!(clean_generated_directory(&config).await?);
        assert!(!config.scratch_path().exists());
        assert!(config.generated_path().exists());
        assert!(!clean_generated_directory(&config).await?);
        Ok(())
    }

    #[tokio::test]
    async fn test_clean_removes_generated_tree() -> Result<()> {
        let root = tempdir()?;
        let config = config(root.path());
        let file = config.generated_path().join("com/example/api/WidgetApi.kt");
        fs::create_dir_all(file.parent().unwrap()).await?;
        fs::write(&file, "edited").await?;

        assert!(clean(&config).await?);
        assert!(!config.generated_path().exists());
        assert!(root.path().exists());
        assert!(!clean(&config).await?);
        Ok(())
    }

    #[tokio::test]
    async fn test_clean_refuses_unsafe_dirs() -> Result<()> {
        let root = tempdir()?;
        let mut config = config(root.path());
        config.generated_dir = PathBuf::from("..");
        assert!(matches!(clean(&config).await, Err(Error::Config(_))));
        assert!(root.path().exists());
        Ok(())
    }
}
