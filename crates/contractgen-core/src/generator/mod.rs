//! Running the code generator once per contract.
//!
//! Every contract becomes one [`GenerationTask`] that writes into the shared
//! scratch directory. Tasks run one after another in contract-name order, so
//! when two contracts produce the same file the later contract's copy is the
//! one left on disk. [`generate_all`] reports such collisions instead of
//! hiding them.

pub mod command;

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tokio::task;

use crate::clean::remove_dir_if_exists;
use crate::config::{Config, GeneratorOptions};
use crate::contract::ContractFile;
use crate::openapi::OpenApiContext;
use crate::templates::TemplateManager;
use crate::validate::validate_document;
use crate::{Error, Result};

pub use command::CommandGenerator;

/// Everything the generator needs for one contract
#[derive(Debug, Clone)]
pub struct GenerationTask {
    pub contract: ContractFile,
    /// Scratch directory all tasks write into
    pub output_dir: PathBuf,
    /// Source root relative to `output_dir`
    pub source_root: PathBuf,
    pub generator_name: String,
    pub api_package: String,
    pub model_package: String,
    pub invoker_package: String,
    pub template_dir: Option<PathBuf>,
    pub options: GeneratorOptions,
}

impl GenerationTask {
    pub fn new(config: &Config, contract: ContractFile) -> Self {
        Self {
            contract,
            output_dir: config.scratch_path(),
            source_root: config.source_root.clone(),
            generator_name: config.generator.name.clone(),
            api_package: config.api_package(),
            model_package: config.model_package(),
            invoker_package: config.invoker_package(),
            template_dir: config.template_dir_path(),
            options: config.generator.options.clone(),
        }
    }
}

/// The generator back-end selected by configuration
#[derive(Debug, Clone)]
pub enum Generator {
    /// Bundled Tera templates
    Builtin(TemplateManager),
    /// External generator process
    Command(CommandGenerator),
}

impl Generator {
    /// Pick the back-end: an external command when one is configured, the
    /// built-in templates otherwise.
    pub async fn from_config(config: &Config) -> Result<Self> {
        if config.generator.command.is_empty() {
            let manager =
                TemplateManager::new(&config.generator.name, config.template_dir_path()).await?;
            Ok(Self::Builtin(manager))
        } else {
            Ok(Self::Command(CommandGenerator::new(&config.generator.command)?))
        }
    }

    /// Generate one contract into the task's output directory.
    ///
    /// The built-in back-end refuses contracts that fail validation; an
    /// external generator does its own checking. Returns the written files
    /// relative to the output directory.
    pub async fn generate(&self, task: &GenerationTask) -> Result<Vec<PathBuf>> {
        match self {
            Self::Builtin(manager) => {
                let contract = OpenApiContext::from_file(&task.contract.path).await?;
                let report = validate_document(&contract, false);
                if !report.is_valid() {
                    return Err(Error::openapi(format!(
                        "{} is not a valid contract: {}",
                        task.contract.name,
                        report.errors.join("; ")
                    )));
                }
                manager.generate(&contract, task).await
            }
            Self::Command(command) => command.generate(task).await,
        }
    }

    /// Short human-readable name of the back-end
    pub fn describe(&self) -> String {
        match self {
            Self::Builtin(manager) => format!("built-in {} templates", manager.generator_name()),
            Self::Command(command) => format!("command `{}`", command.program()),
        }
    }
}

/// Two contracts produced the same scratch file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Collision {
    pub path: PathBuf,
    /// Contract whose output was overwritten
    pub overwritten: String,
    /// Contract whose output was kept
    pub kept: String,
}

/// Result of generating every contract of a run
#[derive(Debug, Clone, Default, Serialize)]
pub struct GenerationReport {
    /// Contracts generated, in processing order
    pub contracts: Vec<String>,
    /// Distinct files written, relative to the scratch directory
    pub files: Vec<PathBuf>,
    pub collisions: Vec<Collision>,
}

/// Generate every contract into a fresh scratch directory.
///
/// Output left over from an earlier run is removed first. The first failing
/// contract aborts the run and its partial scratch output is removed, so
/// relocation never sees it.
pub async fn generate_all(
    generator: &Generator,
    config: &Config,
    contracts: &[ContractFile],
) -> Result<GenerationReport> {
    let scratch = config.scratch_path();
    if remove_dir_if_exists(&scratch).await? {
        log::debug!("Discarded stale scratch output in {}", scratch.display());
    }

    match generate_each(generator, config, contracts).await {
        Ok(report) => Ok(report),
        Err(e) => {
            if let Err(cleanup) = remove_dir_if_exists(&scratch).await {
                log::warn!("Failed to discard partial output: {}", cleanup);
            }
            Err(e)
        }
    }
}

async fn generate_each(
    generator: &Generator,
    config: &Config,
    contracts: &[ContractFile],
) -> Result<GenerationReport> {
    let mut report = GenerationReport::default();
    if contracts.is_empty() {
        log::warn!(
            "No contracts found in {}",
            config.contract_dir_path().display()
        );
        return Ok(report);
    }

    let mut owners: BTreeMap<PathBuf, String> = BTreeMap::new();
    for contract in contracts {
        let task = GenerationTask::new(config, contract.clone());
        log::info!(
            "Generating {} with {}",
            contract.name,
            generator.describe()
        );
        let written = generator.generate(&task).await.map_err(|e| match e {
            Error::Generator(msg) => Error::generator(msg),
            other => Error::generator(format!("{}: {}", contract.name, other)),
        })?;
        log::debug!("{} produced {} file(s)", contract.name, written.len());

        for path in written {
            if let Some(previous) = owners.insert(path.clone(), contract.name.clone()) {
                if previous != contract.name {
                    log::warn!(
                        "{} is generated by both {} and {}; keeping the output of {}",
                        path.display(),
                        previous,
                        contract.name,
                        contract.name
                    );
                    report.collisions.push(Collision {
                        path,
                        overwritten: previous,
                        kept: contract.name.clone(),
                    });
                }
            }
        }
        report.contracts.push(contract.name.clone());
    }

    report.files = owners.into_keys().collect();
    Ok(report)
}

/// List every file below `dir`, relative to it and sorted.
///
/// This function uses `spawn_blocking` to avoid blocking the async runtime
/// during the recursive walk. A missing directory yields an empty list.
pub async fn list_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let root = dir.to_path_buf();

    task::spawn_blocking(move || -> Result<Vec<PathBuf>> {
        fn walk_dir(root: &Path, dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
            for entry in std::fs::read_dir(dir).map_err(|e| Error::at_path(dir, e))? {
                let path = entry?.path();
                if path.is_dir() {
                    walk_dir(root, &path, files)?;
                } else if let Ok(relative) = path.strip_prefix(root) {
                    files.push(relative.to_path_buf());
                }
            }
            Ok(())
        }

        let mut files = Vec::new();
        if root.is_dir() {
            walk_dir(&root, &root, &mut files)?;
        }
        files.sort();
        Ok(files)
    })
    .await
    .map_err(|e| {
        io::Error::new(
            io::ErrorKind::Other,
            format!("Failed to join blocking task: {}", e),
        )
    })?
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const CONTRACT: &str = r#"
openapi: 3.0.3
info:
  title: Shared
  version: 1.0.0
paths:
  /widgets/{id}:
    get:
      operationId: getWidget
      tags: [Widget]
      parameters:
        - name: id
          in: path
          required: true
          schema:
            type: string
      responses:
        "200":
          description: ok
          content:
            application/json:
              schema:
                $ref: '#/components/schemas/Widget'
components:
  schemas:
    Widget:
      type: object
      properties:
        id:
          type: string
"#;

    async fn project(names: &[&str]) -> Result<(tempfile::TempDir, Config)> {
        let root = tempdir()?;
        let mut config = Config::new("com.example");
        config.project_root = root.path().to_path_buf();
        tokio::fs::create_dir_all(config.contract_dir_path()).await?;
        for name in names {
            tokio::fs::write(config.contract_dir_path().join(name), CONTRACT).await?;
        }
        Ok((root, config))
    }

    #[test]
    fn test_generation_task_from_config() {
        let mut config = Config::new("com.woowahan.campus");
        config.project_root = PathBuf::from("/work");
        config.template_dir = Some(PathBuf::from("templates"));
        let task = GenerationTask::new(
            &config,
            ContractFile {
                path: PathBuf::from("/work/docs/contract/campus.yaml"),
                name: "campus.yaml".to_string(),
            },
        );
        assert_eq!(task.output_dir, PathBuf::from("/work/build/openapi"));
        assert_eq!(task.source_root, PathBuf::from("src/main/kotlin"));
        assert_eq!(task.api_package, "com.woowahan.campus.api");
        assert_eq!(task.invoker_package, "com.woowahan.campus.invoker");
        assert_eq!(task.template_dir, Some(PathBuf::from("/work/templates")));
    }

    #[tokio::test]
    async fn test_generate_all_reports_collisions() -> Result<()> {
        let (_root, config) = project(&["a.yaml", "b.yaml"]).await?;
        let contracts = crate::contract::resolve(&config).await?;
        let generator = Generator::from_config(&config).await?;

        let report = generate_all(&generator, &config, &contracts).await?;
        assert_eq!(report.contracts, vec!["a.yaml", "b.yaml"]);
        assert_eq!(
            report.files,
            vec![
                PathBuf::from("src/main/kotlin/com/example/api/WidgetApi.kt"),
                PathBuf::from("src/main/kotlin/com/example/model/Widget.kt"),
            ]
        );
        assert_eq!(report.collisions.len(), 2);
        assert_eq!(report.collisions[0].overwritten, "a.yaml");
        assert_eq!(report.collisions[0].kept, "b.yaml");
        Ok(())
    }

    #[tokio::test]
    async fn test_generate_all_fails_fast() -> Result<()> {
        let (_root, config) = project(&["good.yaml"]).await?;
        tokio::fs::write(config.contract_dir_path().join("bad.yaml"), "openapi: [").await?;
        let contracts = crate::contract::resolve(&config).await?;
        let generator = Generator::from_config(&config).await?;

        let result = generate_all(&generator, &config, &contracts).await;
        assert!(matches!(result, Err(Error::Generator(msg)) if msg.contains("bad.yaml")));
        assert!(!config.scratch_path().exists());
        Ok(())
    }

    #[tokio::test]
    async fn test_failure_after_good_contract_discards_scratch() -> Result<()> {
        let (_root, config) = project(&["a.yaml"]).await?;
        tokio::fs::write(config.contract_dir_path().join("b.yaml"), "openapi: [").await?;
        let contracts = crate::contract::resolve(&config).await?;
        let generator = Generator::from_config(&config).await?;

        let result = generate_all(&generator, &config, &contracts).await;
        assert!(matches!(result, Err(Error::Generator(msg)) if msg.contains("b.yaml")));
        assert!(list_files(&config.scratch_path()).await?.is_empty());
        assert!(!config.scratch_path().exists());
        Ok(())
    }

    #[tokio::test]
    async fn test_stale_scratch_is_discarded() -> Result<()> {
        let (_root, config) = project(&["a.yaml"]).await?;
        let stale = config
            .scratch_path()
            .join("src/main/kotlin/com/example/api/OldApi.kt");
        tokio::fs::create_dir_all(stale.parent().unwrap()).await?;
        tokio::fs::write(&stale, "interface OldApi").await?;

        let contracts = crate::contract::resolve(&config).await?;
        let generator = Generator::from_config(&config).await?;
        let report = generate_all(&generator, &config, &contracts).await?;
        assert!(!stale.exists());
        assert_eq!(list_files(&config.scratch_path()).await?, report.files);
        Ok(())
    }

    #[tokio::test]
    async fn test_invalid_contract_is_not_generated() -> Result<()> {
        let (_root, config) = project(&[]).await?;
        let contract = r#"
paths:
  /a:
    get:
      operationId: dup
      tags: [X]
      responses: {"200": {description: ok}}
  /b:
    get:
      operationId: dup
      tags: [X]
      responses: {"200": {description: ok}}
"#;
        tokio::fs::write(config.contract_dir_path().join("x.yaml"), contract).await?;
        let contracts = crate::contract::resolve(&config).await?;
        let generator = Generator::from_config(&config).await?;

        match generate_all(&generator, &config, &contracts).await {
            Err(Error::Generator(msg)) => {
                assert!(msg.contains("x.yaml"));
                assert!(msg.contains("'openapi'"));
                assert!(msg.contains("duplicate operationId 'dup'"));
            }
            other => panic!("expected generator error, got {:?}", other.map(|r| r.files)),
        }
        assert!(!config.scratch_path().exists());
        Ok(())
    }

    #[tokio::test]
    async fn test_generate_all_without_contracts() -> Result<()> {
        let (_root, config) = project(&[]).await?;
        let generator = Generator::from_config(&config).await?;
        let report = generate_all(&generator, &config, &[]).await?;
        assert!(report.contracts.is_empty());
        assert!(report.files.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_list_files_is_relative_and_sorted() -> Result<()> {
        let dir = tempdir()?;
        tokio::fs::create_dir_all(dir.path().join("b/c")).await?;
        tokio::fs::write(dir.path().join("b/c/z.kt"), "").await?;
        tokio::fs::write(dir.path().join("a.kt"), "").await?;

        let files = list_files(dir.path()).await?;
        assert_eq!(files, vec![PathBuf::from("a.kt"), PathBuf::from("b/c/z.kt")]);
        assert!(list_files(&dir.path().join("missing")).await?.is_empty());
        Ok(())
    }
}
