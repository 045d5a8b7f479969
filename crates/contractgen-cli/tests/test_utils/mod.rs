//! Test utilities for contractgen integration tests

// Internal imports (std, crate)
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

// External imports (alphabetized)
use anyhow::Context;
use tempfile::TempDir;

/// A throwaway project with a config file and a contract directory
pub struct TestProject {
    _dir: TempDir,
    pub root: PathBuf,
}

impl TestProject {
    /// Create a project whose contract uses `tag` for its only operation
    pub fn new(tag: &str) -> anyhow::Result<Self> {
        let dir = tempfile::tempdir()?;
        let root = dir.path().to_path_buf();
        fs::write(root.join("contractgen.yaml"), CONFIG)?;
        fs::create_dir_all(root.join("docs/contract"))?;
        let project = Self { _dir: dir, root };
        project.write_contract("campus-platform-contract.yaml", tag)?;
        Ok(project)
    }

    /// Write (or overwrite) a contract in the contract directory
    pub fn write_contract(&self, name: &str, tag: &str) -> anyhow::Result<PathBuf> {
        let path = self.root.join("docs/contract").join(name);
        fs::write(&path, CONTRACT.replace("{tag}", tag))?;
        Ok(path)
    }

    /// Run the binary in the project directory
    pub fn run(&self, args: &[&str]) -> anyhow::Result<Output> {
        Command::new(env!("CARGO_BIN_EXE_contractgen"))
            .arg("--project-dir")
            .arg(&self.root)
            .args(args)
            .env("RUST_LOG", "warn")
            .output()
            .context("Failed to run contractgen")
    }

    /// Run the binary and require success, returning stdout
    pub fn run_ok(&self, args: &[&str]) -> anyhow::Result<String> {
        let output = self.run(args)?;
        if !output.status.success() {
            anyhow::bail!(
                "contractgen {:?} failed with {}\n{}",
                args,
                output.status,
                String::from_utf8_lossy(&output.stderr)
            );
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Package directory of the api category in the generated tree
    pub fn generated_api_dir(&self) -> PathBuf {
        self.root.join("src/main/generated/com/woowahan/campus/api")
    }

    pub fn scratch_dir(&self) -> PathBuf {
        self.root.join("build/openapi")
    }
}

/// Sorted file names directly inside `dir`
pub fn file_names(dir: &Path) -> anyhow::Result<Vec<String>> {
    let mut names = fs::read_dir(dir)
        .with_context(|| format!("Failed to read {}", dir.display()))?
        .map(|entry| -> anyhow::Result<String> {
            Ok(entry?.file_name().to_string_lossy().into_owned())
        })
        .collect::<anyhow::Result<Vec<_>>>()?;
    names.sort();
    Ok(names)
}

/// Asserts that a file contains specific content
pub fn assert_file_contains<P: AsRef<Path>>(path: P, contents: &[&str]) -> anyhow::Result<()> {
    let path = path.as_ref();
    let file_content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))?;

    let missing: Vec<&str> = contents
        .iter()
        .copied()
        .filter(|expected| !file_content.contains(expected))
        .collect();
    if !missing.is_empty() {
        anyhow::bail!(
            "File {} is missing expected content:\n  {}",
            path.display(),
            missing.join("\n  ")
        );
    }
    Ok(())
}

const CONFIG: &str = r#"
package_name: com.woowahan.campus
generator:
  name: kotlin-spring
  options:
    dateLibrary: java8
"#;

const CONTRACT: &str = r#"
openapi: 3.0.3
info:
  title: Campus Platform
  version: 1.0.0
paths:
  /widgets/{id}:
    get:
      operationId: getWidget
      summary: Fetch one widget
      tags: [{tag}]
      parameters:
        - name: id
          in: path
          required: true
          schema:
            type: string
      responses:
        "200":
          description: The widget
          content:
            application/json:
              schema:
                $ref: '#/components/schemas/Widget'
components:
  schemas:
    Widget:
      type: object
      required: [id]
      properties:
        id:
          type: string
        createdAt:
          type: string
          format: date-time
"#;
