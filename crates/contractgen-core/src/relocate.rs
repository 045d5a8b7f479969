//! Moving generated sources from the scratch directory into the permanent tree.
//!
//! Relocation only ever adds files. A file that already exists in the
//! generated tree is left alone, so hand edits survive every rebuild, and the
//! generator's bootstrap file never enters the tree at all.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tokio::fs;

use crate::config::Config;
use crate::{Error, Result};

/// What happened to each scratch file during relocation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RelocationReport {
    /// Destinations written by this run
    pub copied: Vec<PathBuf>,
    /// Destinations that already existed and were left unchanged
    pub skipped_existing: Vec<PathBuf>,
    /// Bootstrap files found in scratch and ignored
    pub skipped_bootstrap: Vec<PathBuf>,
}

impl RelocationReport {
    /// True when scratch held nothing eligible for relocation
    pub fn is_empty(&self) -> bool {
        self.copied.is_empty()
            && self.skipped_existing.is_empty()
            && self.skipped_bootstrap.is_empty()
    }
}

/// Copy newly generated api, model and invoker sources into the generated tree.
///
/// Only files directly inside each category's scratch directory with the
/// configured extension are considered. Missing category directories are
/// skipped.
pub async fn move_generated_sources(config: &Config) -> Result<RelocationReport> {
    let mut report = RelocationReport::default();

    for category in config.categories() {
        let source_dir = config.scratch_category_dir(&category);
        let target_dir = config.generated_category_dir(&category);
        let files = source_files(&source_dir, &config.source_extension).await?;
        if files.is_empty() {
            log::debug!(
                "No {} sources in {}",
                category.name,
                source_dir.display()
            );
            continue;
        }

        for source in files {
            let Some(name) = source.file_name() else {
                continue;
            };
            let target = target_dir.join(name);

            if name == config.bootstrap_file.as_str() {
                log::debug!("Skipping bootstrap file {}", source.display());
                report.skipped_bootstrap.push(source);
                continue;
            }

            if fs::try_exists(&target)
                .await
                .map_err(|e| Error::at_path(&target, e))?
            {
                log::debug!("Keeping existing {}", target.display());
                report.skipped_existing.push(target);
                continue;
            }

            fs::create_dir_all(&target_dir)
                .await
                .map_err(|e| Error::at_path(&target_dir, e))?;
            fs::copy(&source, &target)
                .await
                .map_err(|e| Error::at_path(&target, e))?;
            log::debug!("Relocated {}", target.display());
            report.copied.push(target);
        }
    }

    log::info!(
        "Relocated {} file(s), kept {} existing, skipped {} bootstrap",
        report.copied.len(),
        report.skipped_existing.len(),
        report.skipped_bootstrap.len()
    );
    Ok(report)
}

/// Files directly inside `dir` with the given extension, sorted by name
async fn source_files(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(Error::at_path(dir, e)),
    };

    let mut files = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| Error::at_path(dir, e))?
    {
        let path = entry.path();
        let is_file = entry.file_type().await.map(|t| t.is_file()).unwrap_or(false);
        let matches = path.extension().and_then(|e| e.to_str()) == Some(extension);
        if is_file && matches {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
