//! Rebuilding the generated tree when contracts or templates change.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use contractgen_core::{contract::is_contract_file, Config, Task};
use notify::{Config as NotifyConfig, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{error, info, warn};

/// Run `update-open-api-spec` once, then again after every debounced change.
///
/// Failed rebuilds are logged and watching continues. Returns on Ctrl-C.
pub async fn watch(config: Config, debounce: Duration) -> anyhow::Result<()> {
    refresh(&config).await;

    let (tx, mut rx) = mpsc::unbounded_channel::<PathBuf>();
    let mut watcher = RecommendedWatcher::new(
        move |res: Result<Event, notify::Error>| match res {
            Ok(event) => {
                if matches!(
                    event.kind,
                    EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
                ) {
                    for path in event.paths {
                        let _ = tx.send(path);
                    }
                }
            }
            Err(e) => eprintln!("watch error: {e:?}"),
        },
        NotifyConfig::default(),
    )
    .context("Failed to create file watcher")?;

    for (dir, mode) in watch_targets(&config).await? {
        watcher
            .watch(&dir, mode)
            .with_context(|| format!("Failed to watch {}", dir.display()))?;
        info!("Watching {}", dir.display());
    }

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    let mut deadline: Option<Instant> = None;

    loop {
        let wake = deadline.unwrap_or_else(|| Instant::now() + Duration::from_secs(3600));
        tokio::select! {
            _ = &mut shutdown => {
                info!("Stopping watcher");
                break;
            }
            Some(path) = rx.recv() => {
                if is_watched(&path) {
                    info!("Changed: {}", path.display());
                    deadline = Some(Instant::now() + debounce);
                }
            }
            _ = tokio::time::sleep_until(wake), if deadline.is_some() => {
                deadline = None;
                refresh(&config).await;
            }
        }
    }
    Ok(())
}

/// Directories to watch. A missing contract directory is created so the first
/// contract dropped into it triggers a build; a missing template directory is
/// skipped.
async fn watch_targets(config: &Config) -> anyhow::Result<Vec<(PathBuf, RecursiveMode)>> {
    let contract_dir = config.contract_dir_path();
    if !contract_dir.is_dir() {
        warn!(
            "Contract directory {} does not exist, creating it",
            contract_dir.display()
        );
        tokio::fs::create_dir_all(&contract_dir)
            .await
            .with_context(|| format!("Failed to create {}", contract_dir.display()))?;
    }

    let mut targets = vec![(contract_dir, RecursiveMode::NonRecursive)];
    match config.template_dir_path() {
        Some(dir) if dir.is_dir() => targets.push((dir, RecursiveMode::Recursive)),
        Some(dir) => warn!("Template directory {} does not exist, not watching it", dir.display()),
        None => {}
    }
    Ok(targets)
}

/// Contract files and templates trigger a rebuild; editor temp files do not
fn is_watched(path: &Path) -> bool {
    is_contract_file(path) || path.extension().and_then(|e| e.to_str()) == Some("tera")
}

async fn refresh(config: &Config) {
    // A pipeline runs once, so every rebuild gets a fresh one
    match crate::run_pipeline(config.clone(), Task::UpdateOpenApiSpec).await {
        Ok(report) => {
            let copied = report
                .relocation
                .as_ref()
                .map(|r| r.copied.len())
                .unwrap_or(0);
            info!("Contracts refreshed, {} new file(s)", copied);
        }
        Err(e) => error!("Rebuild failed: {:#}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_watched_paths() {
        assert!(is_watched(Path::new("docs/contract/campus.yaml")));
        assert!(is_watched(Path::new("templates/api.kt.tera")));
        assert!(!is_watched(Path::new("docs/contract/.campus.yaml.swp")));
        assert!(!is_watched(Path::new("docs/contract/notes.md")));
    }

    #[tokio::test]
    async fn test_missing_contract_dir_is_created() -> anyhow::Result<()> {
        let root = tempfile::tempdir()?;
        let mut config = Config::new("com.example");
        config.project_root = root.path().to_path_buf();
        config.template_dir = Some(PathBuf::from("templates"));

        let targets = watch_targets(&config).await?;
        let dirs: Vec<&PathBuf> = targets.iter().map(|(dir, _)| dir).collect();
        assert_eq!(dirs, vec![&config.contract_dir_path()]);
        assert!(config.contract_dir_path().is_dir());

        tokio::fs::create_dir_all(root.path().join("templates")).await?;
        assert_eq!(watch_targets(&config).await?.len(), 2);
        Ok(())
    }
}
