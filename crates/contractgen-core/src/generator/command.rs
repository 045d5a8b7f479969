//! External generator process back-end.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::process::Command as AsyncCommand;

use super::{list_files, GenerationTask};
use crate::{Error, Result};

/// Invokes an external OpenAPI generator (e.g. `openapi-generator-cli`) per contract
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandGenerator {
    program: String,
    args: Vec<String>,
}

impl CommandGenerator {
    /// Build from a configured command line; the first element is the program
    pub fn new(command: &[String]) -> Result<Self> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| Error::config("generator.command must not be empty"))?;
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments passed after the configured command for one task
    pub fn arguments(&self, task: &GenerationTask, output_dir: &Path) -> Vec<String> {
        let mut args = self.args.clone();
        args.extend([
            "generate".to_string(),
            "-g".to_string(),
            task.generator_name.clone(),
            "-i".to_string(),
            task.contract.path.display().to_string(),
            "-o".to_string(),
            output_dir.display().to_string(),
            "--api-package".to_string(),
            task.api_package.clone(),
            "--model-package".to_string(),
            task.model_package.clone(),
            "--invoker-package".to_string(),
            task.invoker_package.clone(),
        ]);
        if let Some(dir) = &task.template_dir {
            args.push("-t".to_string());
            args.push(dir.display().to_string());
        }

        // Fixed options win over pass-through ones
        let options = &task.options;
        let mut properties: BTreeMap<String, String> = options.additional.clone();
        properties.insert("dateLibrary".into(), options.date_library.to_string());
        properties.insert("useSpringBoot3".into(), options.use_spring_boot3.to_string());
        properties.insert("useTags".into(), options.use_tags.to_string());
        properties.insert("interfaceOnly".into(), options.interface_only.to_string());
        let joined = properties
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(",");
        args.push(format!("--additional-properties={}", joined));
        args
    }

    /// Run the generator into a temporary directory and merge its output into
    /// the task's output directory.
    ///
    /// Returns the merged files relative to the output directory.
    pub async fn generate(&self, task: &GenerationTask) -> Result<Vec<PathBuf>> {
        let staging = tempfile::tempdir()?;
        let args = self.arguments(task, staging.path());
        log::debug!("Running {} {}", self.program, args.join(" "));

        let output = AsyncCommand::new(&self.program)
            .args(&args)
            .output()
            .await
            .map_err(|e| {
                Error::generator(format!(
                    "failed to start '{}' for {}: {}",
                    self.program, task.contract.name, e
                ))
            })?;

        if !output.status.success() {
            return Err(Error::generator(format!(
                "'{}' failed for {} with status {}\n{}{}",
                self.program,
                task.contract.name,
                output.status,
                String::from_utf8_lossy(&output.stderr),
                String::from_utf8_lossy(&output.stdout)
            )));
        }

        let files = list_files(staging.path()).await?;
        for relative in &files {
            let target = task.output_dir.join(relative);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)
                    .await
                    .map_err(|e| Error::at_path(parent, e))?;
            }
            fs::copy(staging.path().join(relative), &target)
                .await
                .map_err(|e| Error::at_path(&target, e))?;
        }
        Ok(files)
    }
}
