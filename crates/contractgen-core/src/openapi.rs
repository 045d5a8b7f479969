//! OpenAPI contract parsing and utilities.
//!
//! This module loads contract documents and exposes the parts the generators
//! need: operations with their resolved parameters and responses, and the
//! component schemas.
//!
//! # Examples
//!
//! ```no_run
//! use contractgen_core::openapi::OpenApiContext;
//! use contractgen_core::error::Result;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<()> {
//! let contract = OpenApiContext::from_file("docs/contract/campus.yaml").await?;
//!
//! if let Some(title) = contract.title() {
//!     println!("API Title: {}", title);
//! }
//! for op in contract.parse_operations()? {
//!     println!("{} {} -> {}", op.method, op.path, op.id);
//! }
//! # Ok(())
//! # }
//! ```

// Internal imports (std, crate)
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use crate::utils::to_lower_camel_case;
use crate::Error;

// External imports (alphabetized)
use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value as JsonValue};
use tokio::fs;

/// HTTP methods an OpenAPI path item may declare, in declaration order
pub const HTTP_METHODS: &[&str] = &[
    "get", "put", "post", "delete", "options", "head", "patch", "trace",
];

const SCHEMA_REF_PREFIX: &str = "#/components/schemas/";

/// Represents a parsed OpenAPI contract
#[derive(Debug, Serialize)]
#[serde(transparent)]
pub struct OpenApiContext {
    /// The raw JSON value of the contract
    pub json: JsonValue,
}

impl OpenApiContext {
    /// Load a contract from a file (YAML or JSON)
    pub async fn from_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| Error::at_path(path, e))?;
        Self::parse_content(&content).map_err(|e| {
            Error::openapi(format!(
                "Failed to parse OpenAPI contract at {}: {}",
                path.display(),
                e
            ))
        })
    }

    /// Parse content as either JSON or YAML
    pub fn parse_content(content: &str) -> Result<Self, String> {
        let json: JsonValue = match serde_json::from_str(content) {
            Ok(json) => json,
            Err(_) => {
                let yaml: serde_yaml::Value =
                    serde_yaml::from_str(content).map_err(|e| e.to_string())?;
                yaml_to_json(yaml)
            }
        };
        if !json.is_object() {
            return Err("document is not a mapping".to_string());
        }
        Ok(Self { json })
    }

    /// Get a reference to the raw JSON value
    pub fn as_json(&self) -> &JsonValue {
        &self.json
    }

    /// Get the declared OpenAPI version (`openapi`, or `swagger` for 2.0 documents)
    pub fn spec_version(&self) -> Option<&str> {
        self.json
            .get("openapi")
            .or_else(|| self.json.get("swagger"))?
            .as_str()
    }

    /// Get the title of the API
    pub fn title(&self) -> Option<&str> {
        self.json.get("info")?.get("title")?.as_str()
    }

    /// Get the version of the API
    pub fn version(&self) -> Option<&str> {
        self.json.get("info")?.get("version")?.as_str()
    }

    /// Component schemas by name (sorted for stable output)
    pub fn schemas(&self) -> BTreeMap<String, JsonValue> {
        self.json
            .pointer("/components/schemas")
            .and_then(JsonValue::as_object)
            .map(|m| m.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default()
    }

    /// Follow a local `$ref` (e.g. `#/components/parameters/limit`) if `value` is one
    pub fn resolve<'a>(&'a self, value: &'a JsonValue) -> &'a JsonValue {
        match value.get("$ref").and_then(JsonValue::as_str) {
            Some(reference) if reference.starts_with('#') => {
                self.json.pointer(&reference[1..]).unwrap_or(value)
            }
            _ => value,
        }
    }

    /// Name of the component schema a `$ref` points to
    pub fn schema_ref_name(schema: &JsonValue) -> Option<&str> {
        schema
            .get("$ref")
            .and_then(JsonValue::as_str)
            .and_then(|r| r.strip_prefix(SCHEMA_REF_PREFIX))
    }

    /// Parse every operation of every path
    pub fn parse_operations(&self) -> crate::Result<Vec<OpenApiOperation>> {
        let mut operations = Vec::new();
        let paths = self
            .json
            .get("paths")
            .and_then(JsonValue::as_object)
            .ok_or_else(|| Error::openapi("Missing 'paths' object"))?;

        for (path, item) in paths {
            let item = self.resolve(item);
            let shared_parameters = self.extract_parameters(item);
            for method in HTTP_METHODS {
                let Some(method_item) = item.get(*method).and_then(JsonValue::as_object) else {
                    continue;
                };

                let declared_id = method_item
                    .get("operationId")
                    .and_then(JsonValue::as_str)
                    .map(String::from);
                let has_operation_id = declared_id.is_some();
                let operation_id = declared_id
                    .unwrap_or_else(|| to_lower_camel_case(&format!("{method} {path}")));

                let tags = method_item
                    .get("tags")
                    .and_then(JsonValue::as_array)
                    .map(|arr| {
                        arr.iter()
                            .filter_map(JsonValue::as_str)
                            .map(String::from)
                            .collect()
                    });

                operations.push(OpenApiOperation {
                    id: operation_id,
                    has_operation_id,
                    method: method.to_string(),
                    path: path.clone(),
                    tags,
                    summary: string_field(method_item, "summary"),
                    description: string_field(method_item, "description"),
                    parameters: merge_parameters(
                        &shared_parameters,
                        self.extract_parameters(&JsonValue::Object(method_item.clone())),
                    ),
                    request_body: method_item
                        .get("requestBody")
                        .map(|body| self.resolve(body).clone()),
                    responses: self.extract_responses(method_item),
                    deprecated: method_item.get("deprecated").and_then(JsonValue::as_bool),
                    vendor_extensions: Self::extract_vendor_extensions(method_item),
                });
            }
        }
        Ok(operations)
    }

    /// Parameters declared on a path item or operation, with `$ref`s resolved
    pub fn extract_parameters(&self, item: &JsonValue) -> Vec<OpenApiParameter> {
        item.get("parameters")
            .and_then(JsonValue::as_array)
            .map(|arr| {
                arr.iter()
                    .filter_map(|param| serde_json::from_value(self.resolve(param).clone()).ok())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Extract responses from an operation object, with `$ref`s resolved
    pub fn extract_responses(
        &self,
        operation: &JsonMap<String, JsonValue>,
    ) -> BTreeMap<String, OpenApiResponse> {
        operation
            .get("responses")
            .and_then(JsonValue::as_object)
            .map(|map| {
                map.iter()
                    .filter_map(|(k, v)| {
                        serde_json::from_value(self.resolve(v).clone())
                            .ok()
                            .map(|resp| (k.clone(), resp))
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Extract vendor extensions from an operation object
    pub fn extract_vendor_extensions(
        operation: &JsonMap<String, JsonValue>,
    ) -> HashMap<String, JsonValue> {
        operation
            .iter()
            .filter(|(k, _)| k.starts_with("x-"))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

/// YAML allows non-string mapping keys (`200:` response codes); JSON does not
fn yaml_to_json(value: serde_yaml::Value) -> JsonValue {
    use serde_yaml::Value as Yaml;
    match value {
        Yaml::Null => JsonValue::Null,
        Yaml::Bool(b) => JsonValue::Bool(b),
        Yaml::Number(n) => {
            if let Some(i) = n.as_i64() {
                JsonValue::from(i)
            } else if let Some(u) = n.as_u64() {
                JsonValue::from(u)
            } else {
                n.as_f64()
                    .and_then(serde_json::Number::from_f64)
                    .map(JsonValue::Number)
                    .unwrap_or(JsonValue::Null)
            }
        }
        Yaml::String(s) => JsonValue::String(s),
        Yaml::Sequence(seq) => JsonValue::Array(seq.into_iter().map(yaml_to_json).collect()),
        Yaml::Mapping(map) => JsonValue::Object(
            map.into_iter()
                .map(|(k, v)| (yaml_key(k), yaml_to_json(v)))
                .collect(),
        ),
        Yaml::Tagged(tagged) => yaml_to_json(tagged.value),
    }
}

fn yaml_key(key: serde_yaml::Value) -> String {
    use serde_yaml::Value as Yaml;
    match key {
        Yaml::String(s) => s,
        Yaml::Bool(b) => b.to_string(),
        Yaml::Number(n) => n.to_string(),
        Yaml::Null => "null".to_string(),
        other => serde_yaml::to_string(&other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}

fn string_field(object: &JsonMap<String, JsonValue>, key: &str) -> Option<String> {
    object.get(key).and_then(JsonValue::as_str).map(String::from)
}

/// Operation-level parameters override path-level ones with the same name and location
fn merge_parameters(
    shared: &[OpenApiParameter],
    own: Vec<OpenApiParameter>,
) -> Vec<OpenApiParameter> {
    let mut merged: Vec<OpenApiParameter> = shared
        .iter()
        .filter(|p| !own.iter().any(|o| o.name == p.name && o.in_ == p.in_))
        .cloned()
        .collect();
    merged.extend(own);
    merged
}

/// Parsed OpenAPI operation
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OpenApiOperation {
    /// Declared `operationId`, or one derived from method and path
    #[serde(rename = "operationId")]
    pub id: String,
    /// Whether the contract declared the `operationId` itself
    #[serde(skip)]
    pub has_operation_id: bool,
    /// Lowercase HTTP method
    pub method: String,
    /// The path where this operation is defined (e.g., "/widgets/{id}")
    pub path: String,
    /// Tags used to group operations
    pub tags: Option<Vec<String>>,
    /// A short summary of what the operation does.
    pub summary: Option<String>,
    /// A verbose explanation of the operation behavior.
    pub description: Option<String>,
    /// Path-level and operation-level parameters, merged
    pub parameters: Vec<OpenApiParameter>,
    /// The request body applicable for this operation.
    #[serde(rename = "requestBody")]
    pub request_body: Option<JsonValue>,
    /// Responses keyed by status code (or `default`)
    pub responses: BTreeMap<String, OpenApiResponse>,
    /// Declares this operation to be deprecated.
    pub deprecated: Option<bool>,
    /// Specification extensions (fields starting with `x-`).
    #[serde(flatten)]
    pub vendor_extensions: HashMap<String, JsonValue>,
}

impl OpenApiOperation {
    /// The first tag, used for grouping
    pub fn primary_tag(&self) -> Option<&str> {
        self.tags.as_ref()?.first().map(String::as_str)
    }

    /// The success response a generated method returns: `200`, then any other `2xx`, then `default`
    pub fn success_response(&self) -> Option<&OpenApiResponse> {
        self.responses
            .get("200")
            .or_else(|| {
                self.responses
                    .iter()
                    .find(|(code, _)| code.starts_with('2'))
                    .map(|(_, r)| r)
            })
            .or_else(|| self.responses.get("default"))
    }
}

/// Information about a single parameter in an OpenAPI operation.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct OpenApiParameter {
    /// The name of the parameter. Parameter names are case sensitive.
    pub name: String,
    /// The location of the parameter. Possible values: "query", "header", "path", or "cookie".
    #[serde(rename = "in")]
    pub in_: String,
    /// A brief description of the parameter.
    pub description: Option<String>,
    /// Determines whether this parameter is mandatory.
    pub required: Option<bool>,
    /// Specifies that a parameter is deprecated and SHOULD be transitioned out of usage.
    pub deprecated: Option<bool>,
    /// The schema defining the type used for the parameter.
    pub schema: Option<JsonValue>,
    /// Example of the parameter's potential value.
    pub example: Option<JsonValue>,
}

impl OpenApiParameter {
    /// Path parameters are always required
    pub fn is_required(&self) -> bool {
        self.in_ == "path" || self.required.unwrap_or(false)
    }
}

/// A single response of an operation
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct OpenApiResponse {
    /// A short description of the response.
    pub description: Option<String>,
    /// Response payloads keyed by media type
    pub content: Option<BTreeMap<String, JsonValue>>,
}

impl OpenApiResponse {
    /// Schema of the JSON payload (falling back to the first media type)
    pub fn json_schema(&self) -> Option<&JsonValue> {
        let content = self.content.as_ref()?;
        content
            .get("application/json")
            .or_else(|| content.values().next())?
            .get("schema")
    }
}
