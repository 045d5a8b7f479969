//! Configuration for the contractgen pipeline.
//!
//! This module defines the [`Config`] struct that every pipeline stage receives
//! explicitly. It carries the fixed paths, package names and generator options
//! of a project. The configuration can be loaded from a YAML or TOML file,
//! created programmatically, or adjusted from command-line arguments.
//!
//! All relative paths are resolved against [`Config::project_root`].
//!
//! # Examples
//!
//! ```no_run
//! use contractgen_core::config::Config;
//!
//! # #[tokio::main]
//! # async fn main() -> contractgen_core::Result<()> {
//! // Start from the defaults and point at a single contract
//! let mut config = Config::new("com.woowahan.campus");
//! config.contracts = vec!["campus-platform-contract.yaml".to_string()];
//! config.validate()?;
//!
//! // Or load from a config file
//! let config = Config::from_file("contractgen.yaml").await?;
//! # let _ = config;
//! # Ok(())
//! # }
//! ```

// Internal imports (std, crate)
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Component, Path, PathBuf};

use crate::utils::{is_valid_package_name, package_path};
use crate::Error;

// External imports (alphabetized)
use serde::{Deserialize, Deserializer, Serialize};
use serde_value::Value as SerdeValue;
use tokio::fs;

/// File names tried by [`Config::discover`], in order
pub const CONFIG_FILE_NAMES: &[&str] = &["contractgen.yaml", "contractgen.yml", "contractgen.toml"];

/// Configuration for one project's generation pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Root that all relative paths below are resolved against
    #[serde(default = "default_project_root")]
    pub project_root: PathBuf,

    /// Directory holding the OpenAPI contract files
    #[serde(default = "default_contract_dir")]
    pub contract_dir: PathBuf,

    /// Contract file names inside `contract_dir`; empty means every YAML file there
    #[serde(default)]
    pub contracts: Vec<String>,

    /// Optional directory whose templates override the built-in ones
    #[serde(default)]
    pub template_dir: Option<PathBuf>,

    /// Transient generator output, deleted after relocation
    #[serde(default = "default_scratch_dir")]
    pub scratch_dir: PathBuf,

    /// Permanent generated-source tree that relocated files land in
    #[serde(default = "default_generated_dir")]
    pub generated_dir: PathBuf,

    /// Source root inside the scratch directory where the generator puts packages
    #[serde(default = "default_source_root")]
    pub source_root: PathBuf,

    /// Extension of the source files that get relocated
    #[serde(default = "default_source_extension")]
    pub source_extension: String,

    /// Generator-emitted entry file that is never relocated
    #[serde(default = "default_bootstrap_file")]
    pub bootstrap_file: String,

    /// Base package of the project
    pub package_name: String,

    /// Package for API interfaces (defaults to `<package_name>.api`)
    #[serde(default)]
    pub api_package: Option<String>,

    /// Package for models (defaults to `<package_name>.model`)
    #[serde(default)]
    pub model_package: Option<String>,

    /// Package for invoker/bootstrap code (defaults to `<package_name>.invoker`)
    #[serde(default)]
    pub invoker_package: Option<String>,

    /// Generator selection and fixed options
    #[serde(default)]
    pub generator: GeneratorConfig,

    /// Shell commands that compile the project once the generated tree is ready
    #[serde(default, deserialize_with = "deserialize_commands")]
    pub compile: Vec<String>,

    /// Whether contract validation reports recommendations
    #[serde(default = "default_true")]
    pub recommend: bool,
}

/// Which generator runs for each contract and how it is configured
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Generator target (e.g. `kotlin-spring`)
    #[serde(default = "default_generator_name")]
    pub name: String,

    /// External generator command; empty selects the built-in templates
    #[serde(default, deserialize_with = "deserialize_commands")]
    pub command: Vec<String>,

    /// Fixed generator options applied to every contract
    #[serde(default)]
    pub options: GeneratorOptions,
}

/// Fixed options handed to the generator for every contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratorOptions {
    /// Library used for `date` and `date-time` schemas
    #[serde(default)]
    pub date_library: DateLibrary,

    /// Emit Spring Boot 3 (jakarta) imports instead of javax
    #[serde(default = "default_true")]
    pub use_spring_boot3: bool,

    /// Group operations into API interfaces by their first tag
    #[serde(default = "default_true")]
    pub use_tags: bool,

    /// Only emit interfaces and models, no bootstrap code
    #[serde(default = "default_true")]
    pub interface_only: bool,

    /// Extra options passed through to an external generator
    #[serde(default)]
    pub additional: BTreeMap<String, String>,
}

/// Date/time type mapping for generated code
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum DateLibrary {
    /// `java.time.LocalDate` / `java.time.OffsetDateTime`
    #[default]
    #[serde(alias = "java-time")]
    Java8,
    /// `java.util.Date`
    Legacy,
    /// Plain strings
    #[serde(rename = "string")]
    #[value(name = "string")]
    Text,
}

impl DateLibrary {
    /// Returns the option value understood by generators
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Java8 => "java8",
            Self::Legacy => "legacy",
            Self::Text => "string",
        }
    }
}

impl fmt::Display for DateLibrary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One generated package category (api, model or invoker)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceCategory {
    /// Category name
    pub name: &'static str,
    /// Fully qualified package
    pub package: String,
}

impl SourceCategory {
    /// Directory of the package relative to a source root
    pub fn package_path(&self) -> PathBuf {
        package_path(&self.package)
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            name: default_generator_name(),
            command: Vec::new(),
            options: GeneratorOptions::default(),
        }
    }
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            date_library: DateLibrary::default(),
            use_spring_boot3: true,
            use_tags: true,
            interface_only: true,
            additional: BTreeMap::new(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new("com.example")
    }
}

impl Config {
    /// Create a new Config with default values for the given base package
    pub fn new(package_name: impl Into<String>) -> Self {
        Self {
            project_root: default_project_root(),
            contract_dir: default_contract_dir(),
            contracts: Vec::new(),
            template_dir: None,
            scratch_dir: default_scratch_dir(),
            generated_dir: default_generated_dir(),
            source_root: default_source_root(),
            source_extension: default_source_extension(),
            bootstrap_file: default_bootstrap_file(),
            package_name: package_name.into(),
            api_package: None,
            model_package: None,
            invoker_package: None,
            generator: GeneratorConfig::default(),
            compile: Vec::new(),
            recommend: true,
        }
    }

    /// Load configuration from a YAML or TOML file (chosen by extension)
    pub async fn from_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| Error::at_path(path, e))?;
        let config = match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => toml::from_str(&content)?,
            _ => serde_yaml::from_str(&content)?,
        };
        Ok(config)
    }

    /// Load the first config file found in `project_root`, or defaults when there is none.
    ///
    /// A `project_root` missing from the file is set to the directory it was found in.
    pub async fn discover<P: AsRef<Path>>(project_root: P) -> crate::Result<Self> {
        let project_root = project_root.as_ref();
        for name in CONFIG_FILE_NAMES {
            let candidate = project_root.join(name);
            if fs::try_exists(&candidate).await.unwrap_or(false) {
                log::debug!("Loading configuration from {}", candidate.display());
                let mut config = Self::from_file(&candidate).await?;
                if config.project_root.is_relative() {
                    config.project_root = project_root.join(&config.project_root);
                }
                return Ok(config);
            }
        }
        log::debug!(
            "No configuration file in {}, using defaults",
            project_root.display()
        );
        Ok(Self {
            project_root: project_root.to_path_buf(),
            ..Self::default()
        })
    }

    /// Save configuration to a YAML file
    pub async fn save<P: AsRef<Path>>(&self, path: P) -> crate::Result<()> {
        let content = serde_yaml::to_string(self)?;
        fs::write(path.as_ref(), content)
            .await
            .map_err(|e| Error::at_path(path.as_ref(), e))?;
        Ok(())
    }

    /// Check the configuration before any stage touches the filesystem
    pub fn validate(&self) -> crate::Result<()> {
        for category in self.categories() {
            if !is_valid_package_name(&category.package) {
                return Err(Error::config(format!(
                    "invalid {} package '{}'",
                    category.name, category.package
                )));
            }
        }
        check_owned_dir("scratch_dir", &self.scratch_dir)?;
        check_owned_dir("generated_dir", &self.generated_dir)?;
        if self.scratch_dir == self.generated_dir {
            return Err(Error::config(
                "scratch_dir and generated_dir must be different directories",
            ));
        }
        if self.source_extension.is_empty() || self.source_extension.contains('.') {
            return Err(Error::config(format!(
                "source_extension must be a bare extension, got '{}'",
                self.source_extension
            )));
        }
        if self.bootstrap_file.is_empty() {
            return Err(Error::config("bootstrap_file must not be empty"));
        }
        if self.generator.name.is_empty() {
            return Err(Error::config("generator.name must not be empty"));
        }
        Ok(())
    }

    /// Package for API interfaces
    pub fn api_package(&self) -> String {
        self.api_package
            .clone()
            .unwrap_or_else(|| format!("{}.api", self.package_name))
    }

    /// Package for models
    pub fn model_package(&self) -> String {
        self.model_package
            .clone()
            .unwrap_or_else(|| format!("{}.model", self.package_name))
    }

    /// Package for invoker code
    pub fn invoker_package(&self) -> String {
        self.invoker_package
            .clone()
            .unwrap_or_else(|| format!("{}.invoker", self.package_name))
    }

    /// The three generated package categories, in relocation order
    pub fn categories(&self) -> Vec<SourceCategory> {
        vec![
            SourceCategory {
                name: "api",
                package: self.api_package(),
            },
            SourceCategory {
                name: "model",
                package: self.model_package(),
            },
            SourceCategory {
                name: "invoker",
                package: self.invoker_package(),
            },
        ]
    }

    /// Absolute (project-rooted) contract directory
    pub fn contract_dir_path(&self) -> PathBuf {
        self.project_root.join(&self.contract_dir)
    }

    /// Absolute (project-rooted) template override directory, if any
    pub fn template_dir_path(&self) -> Option<PathBuf> {
        self.template_dir
            .as_ref()
            .map(|dir| self.project_root.join(dir))
    }

    /// Absolute (project-rooted) scratch directory
    pub fn scratch_path(&self) -> PathBuf {
        self.project_root.join(&self.scratch_dir)
    }

    /// Absolute (project-rooted) generated-source directory
    pub fn generated_path(&self) -> PathBuf {
        self.project_root.join(&self.generated_dir)
    }

    /// Directory the generator writes a category's sources to
    pub fn scratch_category_dir(&self, category: &SourceCategory) -> PathBuf {
        self.scratch_path()
            .join(&self.source_root)
            .join(category.package_path())
    }

    /// Directory a category's sources are relocated to
    pub fn generated_category_dir(&self, category: &SourceCategory) -> PathBuf {
        self.generated_path().join(category.package_path())
    }
}

/// Directories the pipeline deletes must stay strictly inside the project root
fn check_owned_dir(field: &str, dir: &Path) -> crate::Result<()> {
    let mut normal = 0;
    for component in dir.components() {
        match component {
            Component::Normal(_) => normal += 1,
            Component::CurDir => {}
            _ => {
                return Err(Error::config(format!(
                    "{field} must be a relative path inside the project, got '{}'",
                    dir.display()
                )));
            }
        }
    }
    if normal == 0 {
        return Err(Error::config(format!(
            "{field} must name a directory below the project root"
        )));
    }
    Ok(())
}

fn default_project_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_contract_dir() -> PathBuf {
    PathBuf::from("docs/contract")
}

fn default_scratch_dir() -> PathBuf {
    PathBuf::from("build/openapi")
}

fn default_generated_dir() -> PathBuf {
    PathBuf::from("src/main/generated")
}

fn default_source_root() -> PathBuf {
    PathBuf::from("src/main/kotlin")
}

fn default_source_extension() -> String {
    "kt".to_string()
}

fn default_bootstrap_file() -> String {
    "Application.kt".to_string()
}

fn default_generator_name() -> String {
    "kotlin-spring".to_string()
}

fn default_true() -> bool {
    true
}

/// Deserialize either a single command or a list of commands
fn deserialize_commands<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match SerdeValue::deserialize(deserializer)? {
        SerdeValue::Unit | SerdeValue::Option(None) => Ok(Vec::new()),
        SerdeValue::String(s) => Ok(vec![s]),
        SerdeValue::Seq(seq) => seq
            .into_iter()
            .map(|item| match item {
                SerdeValue::String(s) => Ok(s),
                _ => Err(serde::de::Error::custom(
                    "Expected string or array of strings",
                )),
            })
            .collect(),
        _ => Err(serde::de::Error::custom(
            "Expected string or array of strings",
        )),
    }
}
