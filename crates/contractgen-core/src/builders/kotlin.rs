//! Kotlin Spring context builder.
//!
//! Produces one API interface per operation group and one model file per
//! component schema, plus the Spring Boot entry point when the generator is
//! not restricted to interfaces.

use std::collections::{BTreeMap, BTreeSet};

use super::{ContextBuilder, RenderJob};
use crate::config::DateLibrary;
use crate::generator::GenerationTask;
use crate::openapi::{OpenApiContext, OpenApiOperation};
use crate::templates::{ParameterKind, TemplateParameterInfo};
use crate::utils::{
    enum_constant_name, kotlin_identifier, package_path, to_lower_camel_case, to_upper_camel_case,
};
use serde::Serialize;
use serde_json::{json, Value as JsonValue};

const EXTENSION: &str = "kt";
const DEFAULT_GROUP: &str = "default";
const BOOTSTRAP_CLASS: &str = "Application";

const API_TEMPLATE: &str = "api.kt.tera";
const MODEL_TEMPLATE: &str = "model.kt.tera";
const APPLICATION_TEMPLATE: &str = "application.kt.tera";

#[derive(Debug, Clone)]
pub struct KotlinSpringBuilder;

impl ContextBuilder for KotlinSpringBuilder {
    fn generator_name(&self) -> &'static str {
        "kotlin-spring"
    }

    fn builtin_templates(&self) -> Vec<(&'static str, &'static str)> {
        vec![
            (
                API_TEMPLATE,
                include_str!("../../templates/kotlin-spring/api.kt.tera"),
            ),
            (
                MODEL_TEMPLATE,
                include_str!("../../templates/kotlin-spring/model.kt.tera"),
            ),
            (
                APPLICATION_TEMPLATE,
                include_str!("../../templates/kotlin-spring/application.kt.tera"),
            ),
        ]
    }

    fn build(
        &self,
        contract: &OpenApiContext,
        task: &GenerationTask,
    ) -> crate::Result<Vec<RenderJob>> {
        let mut jobs = Vec::new();
        let header = json!({
            "title": contract.title().unwrap_or_default(),
            "version": contract.version().unwrap_or_default(),
            "contract": task.contract.name,
        });

        let api_dir = task.source_root.join(package_path(&task.api_package));
        for (class_name, operations) in group_operations(contract.parse_operations()?, task) {
            let mut types = TypeMapper::new(task.options.date_library);
            let operations: Vec<KotlinOperation> = operations
                .iter()
                .map(|op| build_operation(contract, op, &mut types))
                .collect();
            jobs.push(RenderJob {
                template: API_TEMPLATE,
                destination: api_dir.join(format!("{class_name}.{EXTENSION}")),
                context: json!({
                    "header": header,
                    "package": task.api_package,
                    "model_package": task.model_package,
                    "class_name": class_name,
                    "imports": types.imports,
                    "use_spring_boot3": task.options.use_spring_boot3,
                    "operations": operations,
                }),
            });
        }

        let model_dir = task.source_root.join(package_path(&task.model_package));
        for (name, schema) in contract.schemas() {
            let mut types = TypeMapper::new(task.options.date_library);
            let model = build_model(contract, &name, &schema, &mut types);
            jobs.push(RenderJob {
                template: MODEL_TEMPLATE,
                destination: model_dir.join(format!("{}.{EXTENSION}", model.class_name)),
                context: json!({
                    "header": header,
                    "package": task.model_package,
                    "imports": types.imports,
                    "use_spring_boot3": task.options.use_spring_boot3,
                    "model": model,
                }),
            });
        }

        if !task.options.interface_only {
            jobs.push(RenderJob {
                template: APPLICATION_TEMPLATE,
                destination: task
                    .source_root
                    .join(package_path(&task.invoker_package))
                    .join(format!("{BOOTSTRAP_CLASS}.{EXTENSION}")),
                context: json!({
                    "header": header,
                    "package": task.invoker_package,
                    "class_name": BOOTSTRAP_CLASS,
                    "scan_packages": [task.api_package, task.model_package],
                }),
            });
        }

        jobs.sort_by(|a, b| a.destination.cmp(&b.destination));
        Ok(jobs)
    }
}

/// Group operations into API interfaces: by first tag, or by first path segment
fn group_operations(
    operations: Vec<OpenApiOperation>,
    task: &GenerationTask,
) -> BTreeMap<String, Vec<OpenApiOperation>> {
    let mut groups: BTreeMap<String, Vec<OpenApiOperation>> = BTreeMap::new();
    for op in operations {
        let group = match task.options.use_tags {
            true => op.primary_tag(),
            false => op
                .path
                .split('/')
                .find(|segment| !segment.is_empty() && !segment.starts_with('{')),
        }
        .unwrap_or(DEFAULT_GROUP);
        let class_name = format!("{}Api", to_upper_camel_case(group));
        groups.entry(class_name).or_default().push(op);
    }
    groups
}

#[derive(Debug, Serialize)]
struct KotlinOperation {
    fn_name: String,
    operation_id: String,
    http_method: String,
    path: String,
    summary: Option<String>,
    description: Option<String>,
    deprecated: bool,
    params: Vec<TemplateParameterInfo>,
    return_type: String,
}

fn build_operation(
    contract: &OpenApiContext,
    op: &OpenApiOperation,
    types: &mut TypeMapper,
) -> KotlinOperation {
    let mut params: Vec<TemplateParameterInfo> = op
        .parameters
        .iter()
        .map(|p| {
            let kind = ParameterKind::from_location(&p.in_);
            let required = p.is_required();
            let base = p
                .schema
                .as_ref()
                .map(|s| types.map(contract, s))
                .unwrap_or_else(|| "kotlin.String".to_string());
            TemplateParameterInfo {
                param_name: parameter_identifier(&p.name),
                target_type: nullable(base, required),
                annotation: annotation(kind, &p.name, required),
                required,
                description: p.description.clone(),
                name: p.name.clone(),
                kind,
            }
        })
        .collect();

    if let Some(body) = &op.request_body {
        let required = body.get("required").and_then(JsonValue::as_bool).unwrap_or(false);
        let schema = body
            .get("content")
            .and_then(JsonValue::as_object)
            .and_then(|content| {
                content
                    .get("application/json")
                    .or_else(|| content.values().next())
            })
            .and_then(|media| media.get("schema"));
        if let Some(schema) = schema {
            let name = OpenApiContext::schema_ref_name(schema)
                .map(parameter_identifier)
                .unwrap_or_else(|| "body".to_string());
            params.push(TemplateParameterInfo {
                name: name.clone(),
                param_name: name,
                target_type: nullable(types.map(contract, schema), required),
                annotation: annotation(ParameterKind::Body, "", required),
                required,
                description: body
                    .get("description")
                    .and_then(JsonValue::as_str)
                    .map(String::from),
                kind: ParameterKind::Body,
            });
        }
    }
    // Stable sort keeps declaration order within each location
    params.sort_by_key(|p| p.kind);

    let return_type = op
        .success_response()
        .and_then(|r| r.json_schema())
        .map(|schema| types.map(contract, schema))
        .unwrap_or_else(|| "Unit".to_string());

    KotlinOperation {
        fn_name: kotlin_identifier(&to_lower_camel_case(&op.id)),
        operation_id: op.id.clone(),
        http_method: op.method.to_uppercase(),
        path: op.path.clone(),
        summary: op.summary.clone(),
        description: op.description.clone(),
        deprecated: op.deprecated.unwrap_or(false),
        params,
        return_type,
    }
}

fn annotation(kind: ParameterKind, name: &str, required: bool) -> String {
    match kind {
        ParameterKind::Path => format!("@PathVariable(\"{name}\")"),
        ParameterKind::Query => {
            format!("@RequestParam(value = \"{name}\", required = {required})")
        }
        ParameterKind::Header => {
            format!("@RequestHeader(value = \"{name}\", required = {required})")
        }
        ParameterKind::Cookie => format!("@CookieValue(name = \"{name}\", required = {required})"),
        ParameterKind::Body => format!("@Valid @RequestBody(required = {required})"),
    }
}

fn nullable(kotlin_type: String, required: bool) -> String {
    if required || kotlin_type.ends_with('?') {
        kotlin_type
    } else {
        format!("{kotlin_type}?")
    }
}

fn parameter_identifier(name: &str) -> String {
    let camel = to_lower_camel_case(name);
    kotlin_identifier(if camel.is_empty() { name } else { &camel })
}

/// Schema names become class names; names that already are valid types are kept as-is
fn class_name(schema_name: &str) -> String {
    let is_type_name = schema_name
        .chars()
        .next()
        .map(|c| c.is_ascii_uppercase())
        .unwrap_or(false)
        && schema_name.chars().all(|c| c.is_ascii_alphanumeric());
    if is_type_name {
        schema_name.to_string()
    } else {
        to_upper_camel_case(schema_name)
    }
}

#[derive(Debug, Serialize)]
struct KotlinModel {
    class_name: String,
    description: Option<String>,
    /// `data`, `enum` or `alias`
    kind: &'static str,
    properties: Vec<KotlinProperty>,
    enum_values: Vec<KotlinEnumValue>,
    enum_type: String,
    alias_type: String,
}

#[derive(Debug, Serialize)]
struct KotlinProperty {
    name: String,
    json_name: String,
    kotlin_type: String,
    required: bool,
    description: Option<String>,
}

#[derive(Debug, Serialize)]
struct KotlinEnumValue {
    name: String,
    literal: String,
}

fn build_model(
    contract: &OpenApiContext,
    name: &str,
    schema: &JsonValue,
    types: &mut TypeMapper,
) -> KotlinModel {
    let mut model = KotlinModel {
        class_name: class_name(name),
        description: schema
            .get("description")
            .and_then(JsonValue::as_str)
            .map(String::from),
        kind: "alias",
        properties: Vec::new(),
        enum_values: Vec::new(),
        enum_type: String::new(),
        alias_type: String::new(),
    };

    if let Some(values) = schema.get("enum").and_then(JsonValue::as_array) {
        let is_integer = schema.get("type").and_then(JsonValue::as_str) == Some("integer");
        model.kind = "enum";
        model.enum_type = if is_integer { "kotlin.Int" } else { "kotlin.String" }.to_string();
        model.enum_values = values
            .iter()
            .filter(|v| !v.is_null())
            .map(|v| {
                let raw = match v {
                    JsonValue::String(s) => s.clone(),
                    other => other.to_string(),
                };
                KotlinEnumValue {
                    name: enum_constant_name(&raw),
                    literal: if is_integer {
                        raw
                    } else {
                        serde_json::to_string(&raw).unwrap_or_default()
                    },
                }
            })
            .collect();
        return model;
    }

    let (properties, required) = collect_properties(contract, schema);
    if properties.is_empty() {
        model.alias_type = types.map(contract, schema);
        return model;
    }

    model.kind = "data";
    model.properties = properties
        .into_iter()
        .map(|(json_name, prop)| {
            let is_required = required.contains(&json_name);
            KotlinProperty {
                name: parameter_identifier(&json_name),
                kotlin_type: nullable(types.map(contract, &prop), is_required),
                required: is_required,
                description: prop
                    .get("description")
                    .and_then(JsonValue::as_str)
                    .map(String::from),
                json_name,
            }
        })
        .collect();
    // Required properties first, as Kotlin data classes put defaulted ones last
    model.properties.sort_by_key(|p| !p.required);
    model
}

/// Properties and required names of an object schema, flattening `allOf`
fn collect_properties(
    contract: &OpenApiContext,
    schema: &JsonValue,
) -> (Vec<(String, JsonValue)>, BTreeSet<String>) {
    let mut properties = Vec::new();
    let mut required = BTreeSet::new();
    let mut pending = vec![schema];
    let mut depth = 0;

    while let Some(current) = pending.pop() {
        depth += 1;
        if depth > 32 {
            break;
        }
        let current = contract.resolve(current);
        if let Some(props) = current.get("properties").and_then(JsonValue::as_object) {
            for (name, prop) in props {
                if !properties.iter().any(|(existing, _)| existing == name) {
                    properties.push((name.clone(), prop.clone()));
                }
            }
        }
        if let Some(names) = current.get("required").and_then(JsonValue::as_array) {
            required.extend(names.iter().filter_map(JsonValue::as_str).map(String::from));
        }
        if let Some(parts) = current.get("allOf").and_then(JsonValue::as_array) {
            pending.extend(parts.iter().rev());
        }
    }
    (properties, required)
}

/// Maps schemas to Kotlin types and remembers the imports they need
struct TypeMapper {
    date_library: DateLibrary,
    imports: BTreeSet<String>,
}

impl TypeMapper {
    fn new(date_library: DateLibrary) -> Self {
        Self {
            date_library,
            imports: BTreeSet::new(),
        }
    }

    fn import(&mut self, qualified: &str) -> String {
        self.imports.insert(qualified.to_string());
        qualified
            .rsplit('.')
            .next()
            .unwrap_or(qualified)
            .to_string()
    }

    fn map(&mut self, contract: &OpenApiContext, schema: &JsonValue) -> String {
        if let Some(name) = OpenApiContext::schema_ref_name(schema) {
            return class_name(name);
        }
        if let Some(parts) = schema.get("allOf").and_then(JsonValue::as_array) {
            if let [single] = parts.as_slice() {
                return self.map(contract, single);
            }
        }
        if schema.get("oneOf").is_some() || schema.get("anyOf").is_some() {
            return "kotlin.Any".to_string();
        }

        let format = schema.get("format").and_then(JsonValue::as_str);
        match schema.get("type").and_then(JsonValue::as_str) {
            Some("string") => match format {
                Some("date") => self.date_type("java.time.LocalDate"),
                Some("date-time") => self.date_type("java.time.OffsetDateTime"),
                Some("uuid") => self.import("java.util.UUID"),
                Some("uri") => self.import("java.net.URI"),
                Some("byte") => "kotlin.ByteArray".to_string(),
                Some("binary") => self.import("org.springframework.core.io.Resource"),
                _ => "kotlin.String".to_string(),
            },
            Some("integer") => match format {
                Some("int64") => "kotlin.Long".to_string(),
                _ => "kotlin.Int".to_string(),
            },
            Some("number") => match format {
                Some("float") => "kotlin.Float".to_string(),
                Some("double") => "kotlin.Double".to_string(),
                _ => self.import("java.math.BigDecimal"),
            },
            Some("boolean") => "kotlin.Boolean".to_string(),
            Some("array") => {
                let item = schema
                    .get("items")
                    .map(|items| self.map(contract, items))
                    .unwrap_or_else(|| "kotlin.Any".to_string());
                format!("kotlin.collections.List<{item}>")
            }
            Some("object") | None
                if schema
                    .get("additionalProperties")
                    .map(JsonValue::is_object)
                    .unwrap_or(false) =>
            {
                let value = schema
                    .get("additionalProperties")
                    .map(|v| self.map(contract, v))
                    .unwrap_or_else(|| "kotlin.Any".to_string());
                format!("kotlin.collections.Map<kotlin.String, {value}>")
            }
            Some("object") => "kotlin.collections.Map<kotlin.String, kotlin.Any>".to_string(),
            _ => "kotlin.Any".to_string(),
        }
    }

    fn date_type(&mut self, java_time: &str) -> String {
        match self.date_library {
            DateLibrary::Java8 => self.import(java_time),
            DateLibrary::Legacy => self.import("java.util.Date"),
            DateLibrary::Text => "kotlin.String".to_string(),
        }
    }
}
