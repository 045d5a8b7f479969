//! Context builder traits and adapters for language-specific codegen.
pub mod kotlin;

use std::path::PathBuf;

use crate::generator::GenerationTask;
use crate::openapi::OpenApiContext;
use serde_json::Value as JsonValue;

/// One file to render: which template, where to, and with what context
#[derive(Debug, Clone)]
pub struct RenderJob {
    /// Template name as registered with the template engine
    pub template: &'static str,
    /// Destination relative to the task's output directory
    pub destination: PathBuf,
    /// Template context (a JSON object)
    pub context: JsonValue,
}

/// Trait for turning a contract into the files a generator target renders.
pub trait ContextBuilder {
    /// Generator name this builder serves (e.g. `kotlin-spring`)
    fn generator_name(&self) -> &'static str;

    /// Built-in templates as `(name, source)` pairs
    fn builtin_templates(&self) -> Vec<(&'static str, &'static str)>;

    /// Plan every file generated for one contract.
    ///
    /// Jobs come back sorted by destination for consistent output.
    fn build(&self, contract: &OpenApiContext, task: &GenerationTask)
        -> crate::Result<Vec<RenderJob>>;
}

/// The built-in builder for a generator name, if there is one
pub fn builder_for(generator_name: &str) -> Option<Box<dyn ContextBuilder + Send + Sync>> {
    match generator_name {
        "kotlin-spring" => Some(Box::new(kotlin::KotlinSpringBuilder)),
        _ => None,
    }
}

/// Generator names with built-in templates
pub fn builtin_generators() -> Vec<&'static str> {
    vec![kotlin::KotlinSpringBuilder.generator_name()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_lookup() {
        assert!(builder_for("kotlin-spring").is_some());
        assert!(builder_for("typescript-axios").is_none());
        assert_eq!(builtin_generators(), vec!["kotlin-spring"]);
    }
}
