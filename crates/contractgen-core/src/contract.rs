//! Locating OpenAPI contract files.

use std::path::{Path, PathBuf};

use tokio::fs;

use crate::{config::Config, Error};

/// Extensions recognized as contract files
pub const CONTRACT_EXTENSIONS: &[&str] = &["yaml", "yml"];

/// A contract file on disk
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ContractFile {
    /// Full path of the contract
    pub path: PathBuf,
    /// File name, used to identify the contract in logs and reports
    pub name: String,
}

impl ContractFile {
    fn new(path: PathBuf) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self { path, name }
    }
}

/// Whether a path has a contract extension
pub fn is_contract_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| CONTRACT_EXTENSIONS.contains(&ext))
        .unwrap_or(false)
}

/// List the contract files directly inside `dir`, sorted by name.
///
/// A missing or unreadable directory yields no contracts rather than an error.
pub async fn discover(dir: &Path) -> Vec<ContractFile> {
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) => {
            log::debug!("No contract directory at {}: {}", dir.display(), e);
            return Vec::new();
        }
    };

    let mut contracts = Vec::new();
    while let Ok(Some(entry)) = entries.next_entry().await {
        let path = entry.path();
        let is_file = entry
            .file_type()
            .await
            .map(|t| t.is_file())
            .unwrap_or(false);
        if is_file && is_contract_file(&path) {
            contracts.push(ContractFile::new(path));
        }
    }
    contracts.sort_by(|a, b| a.name.cmp(&b.name));
    contracts
}

/// Resolve the contracts a pipeline run should process.
///
/// Explicitly configured contracts must exist; otherwise every contract in
/// the contract directory is used.
pub async fn resolve(config: &Config) -> crate::Result<Vec<ContractFile>> {
    let dir = config.contract_dir_path();
    if config.contracts.is_empty() {
        let contracts = discover(&dir).await;
        log::debug!(
            "Discovered {} contract(s) in {}",
            contracts.len(),
            dir.display()
        );
        return Ok(contracts);
    }

    let mut contracts = Vec::with_capacity(config.contracts.len());
    for name in &config.contracts {
        let path = dir.join(name);
        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Err(Error::openapi(format!(
                "Contract file not found: {}",
                path.display()
            )));
        }
        contracts.push(ContractFile::new(path));
    }
    contracts.sort_by(|a, b| a.name.cmp(&b.name));
    contracts.dedup();
    Ok(contracts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_discover_filters_and_sorts() -> crate::Result<()> {
        let dir = tempdir()?;
        for name in ["b.yaml", "a.yml", "notes.md", "c.json"] {
            tokio::fs::write(dir.path().join(name), "openapi: 3.0.0").await?;
        }
        tokio::fs::create_dir(dir.path().join("template.yaml")).await?;

        let names: Vec<String> = discover(dir.path())
            .await
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["a.yml", "b.yaml"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_discover_missing_dir_is_empty() {
        let contracts = discover(Path::new("/nonexistent/contracts")).await;
        assert!(contracts.is_empty());
    }

    #[tokio::test]
    async fn test_resolve_explicit_contracts() -> crate::Result<()> {
        let root = tempdir()?;
        let mut config = Config::new("com.example");
        config.project_root = root.path().to_path_buf();
        tokio::fs::create_dir_all(config.contract_dir_path()).await?;
        tokio::fs::write(config.contract_dir_path().join("one.yaml"), "x: 1").await?;
        tokio::fs::write(config.contract_dir_path().join("two.yaml"), "x: 1").await?;

        config.contracts = vec!["one.yaml".to_string()];
        let contracts = resolve(&config).await?;
        assert_eq!(contracts.len(), 1);
        assert_eq!(contracts[0].name, "one.yaml");

        config.contracts.clear();
        assert_eq!(resolve(&config).await?.len(), 2);

        config.contracts = vec!["missing.yaml".to_string()];
        assert!(matches!(resolve(&config).await, Err(Error::OpenApi(_))));
        Ok(())
    }
}
