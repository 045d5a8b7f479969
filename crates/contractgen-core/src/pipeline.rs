//! Ordered execution of the build tasks.
//!
//! A build is the strict chain generate → relocate → clean scratch → compile.
//! Each named [`Task`] runs a prefix of that chain. A [`Pipeline`] tracks its
//! progress in a [`PipelineState`] that only moves forward, so a stage can
//! never run before the one it depends on and an instance runs once.
//!
//! # Examples
//!
//! ```no_run
//! use contractgen_core::{Config, Pipeline, Task};
//!
//! # #[tokio::main]
//! # async fn main() -> contractgen_core::Result<()> {
//! let config = Config::discover(".").await?;
//! let report = Pipeline::new(config).await?.run(Task::Compile).await?;
//! println!("relocated {:?}", report.relocation);
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use tokio::process::Command as AsyncCommand;

use crate::clean::clean_generated_directory;
use crate::config::Config;
use crate::contract;
use crate::generator::{generate_all, GenerationReport, Generator};
use crate::relocate::{move_generated_sources, RelocationReport};
use crate::{Error, Result};

/// Named build tasks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Task {
    /// Generate every contract into the scratch directory
    OpenApiGenerate,
    /// Generate, then relocate new sources
    MoveGeneratedSources,
    /// Generate, relocate, then delete the scratch directory
    CleanGeneratedDirectory,
    /// The full contract refresh (same chain as `CleanGeneratedDirectory`)
    UpdateOpenApiSpec,
    /// The full refresh followed by the compile commands
    Compile,
}

/// One step of the build chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    Generate,
    Relocate,
    CleanScratch,
    Compile,
}

impl Task {
    /// Every task, shortest chain first
    pub const ALL: [Task; 5] = [
        Task::OpenApiGenerate,
        Task::MoveGeneratedSources,
        Task::CleanGeneratedDirectory,
        Task::UpdateOpenApiSpec,
        Task::Compile,
    ];

    /// Task name as used on the command line
    pub fn name(&self) -> &'static str {
        match self {
            Task::OpenApiGenerate => "open-api-generate",
            Task::MoveGeneratedSources => "move-generated-sources",
            Task::CleanGeneratedDirectory => "clean-generated-directory",
            Task::UpdateOpenApiSpec => "update-open-api-spec",
            Task::Compile => "compile",
        }
    }

    /// Stages this task runs, in order, including the ones it depends on
    pub fn stages(&self) -> &'static [Stage] {
        static FULL: [Stage; 4] = [
            Stage::Generate,
            Stage::Relocate,
            Stage::CleanScratch,
            Stage::Compile,
        ];
        match self {
            Task::OpenApiGenerate => &FULL[..1],
            Task::MoveGeneratedSources => &FULL[..2],
            Task::CleanGeneratedDirectory | Task::UpdateOpenApiSpec => &FULL[..3],
            Task::Compile => &FULL,
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Task {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s == "create-open-api" {
            return Ok(Task::UpdateOpenApiSpec);
        }
        Task::ALL
            .into_iter()
            .find(|task| task.name() == s)
            .ok_or_else(|| Error::pipeline(format!("unknown task '{}'", s)))
    }
}

/// Progress of one pipeline invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PipelineState {
    Idle,
    Generating,
    Relocating,
    ScratchCleaned,
    Compiling,
    Done,
}

impl PipelineState {
    /// Only a single step forward, or finishing early, is allowed
    pub fn can_transition_to(self, next: PipelineState) -> bool {
        match (self, next) {
            (PipelineState::Done, _) => false,
            (_, PipelineState::Done) => true,
            (current, next) => next as u8 == current as u8 + 1,
        }
    }

    fn entered_by(stage: Stage) -> Self {
        match stage {
            Stage::Generate => PipelineState::Generating,
            Stage::Relocate => PipelineState::Relocating,
            Stage::CleanScratch => PipelineState::ScratchCleaned,
            Stage::Compile => PipelineState::Compiling,
        }
    }
}

/// Summary of one pipeline run
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub task: Task,
    pub generation: Option<GenerationReport>,
    pub relocation: Option<RelocationReport>,
    pub scratch_removed: bool,
    /// Compile commands that ran successfully
    pub compiled: Vec<String>,
}

impl PipelineReport {
    fn new(task: Task) -> Self {
        Self {
            task,
            generation: None,
            relocation: None,
            scratch_removed: false,
            compiled: Vec::new(),
        }
    }
}

/// One build invocation over a validated configuration
#[derive(Debug)]
pub struct Pipeline {
    config: Config,
    generator: Generator,
    state: PipelineState,
}

impl Pipeline {
    /// Validate the configuration and set up the configured generator
    pub async fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let generator = Generator::from_config(&config).await?;
        Ok(Self::with_generator(config, generator))
    }

    /// Use an already constructed generator
    pub fn with_generator(config: Config, generator: Generator) -> Self {
        Self {
            config,
            generator,
            state: PipelineState::Idle,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    fn advance(&mut self, next: PipelineState) -> Result<()> {
        if !self.state.can_transition_to(next) {
            return Err(Error::pipeline(format!(
                "illegal transition from {:?} to {:?}",
                self.state, next
            )));
        }
        log::debug!("Pipeline {:?} -> {:?}", self.state, next);
        self.state = next;
        Ok(())
    }

    /// Run a task and every stage it depends on.
    ///
    /// Any failing stage aborts the run; later stages do not execute.
    pub async fn run(&mut self, task: Task) -> Result<PipelineReport> {
        let mut report = PipelineReport::new(task);
        log::info!("Running {}", task);

        for stage in task.stages() {
            self.advance(PipelineState::entered_by(*stage))?;
            match stage {
                Stage::Generate => {
                    let contracts = contract::resolve(&self.config).await?;
                    report.generation =
                        Some(generate_all(&self.generator, &self.config, &contracts).await?);
                }
                Stage::Relocate => {
                    report.relocation = Some(move_generated_sources(&self.config).await?);
                }
                Stage::CleanScratch => {
                    report.scratch_removed = clean_generated_directory(&self.config).await?;
                }
                Stage::Compile => {
                    report.compiled = run_compile(&self.config).await?;
                }
            }
        }

        self.advance(PipelineState::Done)?;
        Ok(report)
    }
}

/// Run the configured compile commands in the project root
async fn run_compile(config: &Config) -> Result<Vec<String>> {
    if config.compile.is_empty() {
        log::info!("No compile command configured, skipping compile");
        return Ok(Vec::new());
    }

    let mut compiled = Vec::with_capacity(config.compile.len());
    for command in &config.compile {
        log::info!("Running compile command: {}", command);
        let output = AsyncCommand::new("sh")
            .arg("-c")
            .arg(command)
            .current_dir(&config.project_root)
            .output()
            .await
            .map_err(|e| {
                Error::compile(format!("failed to execute '{}': {}", command, e))
            })?;

        if !output.status.success() {
            return Err(Error::compile(format!(
                "'{}' failed with status {}\n{}{}",
                command,
                output.status,
                String::from_utf8_lossy(&output.stderr),
                String::from_utf8_lossy(&output.stdout)
            )));
        }
        log::debug!("{}", String::from_utf8_lossy(&output.stdout));
        compiled.push(command.clone());
    }
    Ok(compiled)
}
