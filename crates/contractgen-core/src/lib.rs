//! contractgen Core Library
//!
//! This library provides the build-time pipeline that turns OpenAPI contracts
//! into server-stub sources: generate into a scratch directory, relocate new
//! files into the permanent generated tree, clean the scratch directory, then
//! compile.

pub mod builders;
pub mod clean;
pub mod config;
pub mod contract;
pub mod error;
pub mod generator;
pub mod openapi;
pub mod pipeline;
pub mod relocate;
pub mod templates;
pub mod utils;
pub mod validate;

pub use crate::{
    clean::{clean, clean_generated_directory},
    config::{Config, DateLibrary, GeneratorConfig, GeneratorOptions},
    contract::ContractFile,
    error::{Error, Result},
    generator::{GenerationTask, Generator},
    openapi::OpenApiContext,
    pipeline::{Pipeline, PipelineReport, PipelineState, Task},
    relocate::{move_generated_sources, RelocationReport},
    templates::TemplateManager,
    validate::{validate_contract, ValidationReport},
};
