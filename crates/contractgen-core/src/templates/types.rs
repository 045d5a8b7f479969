//! Template-specific types for code generation

use serde::{Deserialize, Serialize};

/// Where an operation parameter comes from (OpenAPI `in`, plus the request body)
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterKind {
    Path,
    Query,
    Header,
    Cookie,
    Body,
}

impl ParameterKind {
    /// Map an OpenAPI `in` value; unknown locations are treated as query parameters
    pub fn from_location(location: &str) -> Self {
        match location {
            "path" => Self::Path,
            "header" => Self::Header,
            "cookie" => Self::Cookie,
            _ => Self::Query,
        }
    }
}

/// Language-agnostic parameter info with target language type
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TemplateParameterInfo {
    /// Name as declared in the contract
    pub name: String,
    /// Identifier used in generated code
    pub param_name: String,
    /// Target-language type, including nullability
    pub target_type: String,
    /// Framework annotation binding the parameter
    pub annotation: String,
    pub required: bool,
    pub description: Option<String>,
    pub kind: ParameterKind,
}
