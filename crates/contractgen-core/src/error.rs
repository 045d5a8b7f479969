//! Error handling for the contractgen pipeline.
//!
//! This module defines the main error type `Error` used throughout the library,
//! along with a convenient `Result` type alias. It uses `thiserror` for easy
//! error handling and implements conversions from common error types.
//!
//! Every variant is fatal for the build invocation that produced it. The only
//! intentionally silent outcomes (an already relocated file, a directory that
//! is already gone) never surface as errors at all.
//!
//! # Examples
//!
//! ```
//! use contractgen_core::error::{Error, Result};
//!
//! fn might_fail(name: &str) -> Result<()> {
//!     if name.is_empty() {
//!         return Err(Error::config("package name must not be empty"));
//!     }
//!     Ok(())
//! }
//!
//! assert!(might_fail("com.example").is_ok());
//! ```

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Result type for contractgen operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for contractgen operations
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// I/O error tied to a specific file or directory
    #[error("I/O error at {}: {source}", path.display())]
    Path {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// OpenAPI contract error
    #[error("OpenAPI error: {0}")]
    OpenApi(String),

    /// Template error
    #[error("Template error: {0}")]
    Template(String),

    /// Template engine error
    #[error("Template engine error: {0}")]
    Tera(#[from] tera::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// The code generator failed for a contract
    #[error("Generator error: {0}")]
    Generator(String),

    /// A compile command failed
    #[error("Compile error: {0}")]
    Compile(String),

    /// Pipeline ordering violation
    #[error("Pipeline error: {0}")]
    Pipeline(String),
}

impl Error {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new OpenAPI error
    pub fn openapi<S: Into<String>>(msg: S) -> Self {
        Self::OpenApi(msg.into())
    }

    /// Create a new template error
    pub fn template<S: Into<String>>(msg: S) -> Self {
        Self::Template(msg.into())
    }

    /// Create a new generator error
    pub fn generator<S: Into<String>>(msg: S) -> Self {
        Self::Generator(msg.into())
    }

    /// Create a new compile error
    pub fn compile<S: Into<String>>(msg: S) -> Self {
        Self::Compile(msg.into())
    }

    /// Create a new pipeline error
    pub fn pipeline<S: Into<String>>(msg: S) -> Self {
        Self::Pipeline(msg.into())
    }

    /// Wrap an I/O error with the path it happened on
    pub fn at_path(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Path {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_error_display() {
        let err = Error::at_path(
            "src/main/generated",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        let msg = err.to_string();
        assert!(msg.contains("src/main/generated"));
        assert!(msg.contains("denied"));
    }

    #[test]
    fn test_helpers() {
        assert!(matches!(Error::config("x"), Error::Config(_)));
        assert!(matches!(Error::openapi("x"), Error::OpenApi(_)));
        assert!(matches!(Error::template("x"), Error::Template(_)));
        assert!(matches!(Error::generator("x"), Error::Generator(_)));
        assert!(matches!(Error::compile("x"), Error::Compile(_)));
        assert!(matches!(Error::pipeline("x"), Error::Pipeline(_)));
    }
}
