//! Contract validation with optional recommendations.
//!
//! Errors make a contract unusable for generation. Recommendations point out
//! things that still generate but produce poor code, such as operations whose
//! method names have to be derived from the path.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::openapi::{OpenApiContext, OpenApiOperation};
use crate::Result;

/// Outcome of validating one contract
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    pub contract: PathBuf,
    /// Declared OpenAPI version, if any
    pub version: Option<String>,
    pub errors: Vec<String>,
    pub recommendations: Vec<String>,
}

impl ValidationReport {
    /// A contract with no errors can be generated; recommendations do not count
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Validate a contract file.
///
/// Returns `Err` only when the file cannot be read or parsed at all.
pub async fn validate_contract(path: &Path, recommend: bool) -> Result<ValidationReport> {
    let contract = OpenApiContext::from_file(path).await?;
    let mut report = validate_document(&contract, recommend);
    report.contract = path.to_path_buf();
    log::debug!(
        "{}: {} error(s), {} recommendation(s)",
        path.display(),
        report.errors.len(),
        report.recommendations.len()
    );
    Ok(report)
}

/// Validate an already parsed contract
pub fn validate_document(contract: &OpenApiContext, recommend: bool) -> ValidationReport {
    let mut report = ValidationReport {
        version: contract.spec_version().map(String::from),
        ..ValidationReport::default()
    };

    match contract.spec_version() {
        None => report
            .errors
            .push("missing 'openapi' version field".to_string()),
        Some(version) if !version.starts_with("3.") => report
            .errors
            .push(format!("unsupported OpenAPI version '{}', expected 3.x", version)),
        Some(_) => {}
    }
    if contract.title().is_none() {
        report.errors.push("missing info.title".to_string());
    }
    if contract.version().is_none() {
        report.errors.push("missing info.version".to_string());
    }

    let paths = contract.as_json().get("paths").and_then(|p| p.as_object());
    match paths {
        None => report.errors.push("missing 'paths' object".to_string()),
        Some(paths) if paths.is_empty() && recommend => report
            .recommendations
            .push("contract defines no paths; nothing will be generated".to_string()),
        Some(_) => {}
    }

    // Structural check, only meaningful once the basics are in place
    if report.errors.is_empty()
        && report
            .version
            .as_deref()
            .is_some_and(|v| v.starts_with("3.0"))
    {
        if let Err(e) = serde_json::from_value::<openapiv3::OpenAPI>(contract.as_json().clone()) {
            report
                .errors
                .push(format!("not a valid OpenAPI 3.0 document: {}", e));
        }
    }

    if paths.is_some() {
        match contract.parse_operations() {
            Ok(operations) => check_operations(&operations, recommend, &mut report),
            Err(e) => report.errors.push(e.to_string()),
        }
    }
    report
}

fn check_operations(
    operations: &[OpenApiOperation],
    recommend: bool,
    report: &mut ValidationReport,
) {
    let mut seen: BTreeMap<&str, Vec<String>> = BTreeMap::new();
    for op in operations.iter().filter(|op| op.has_operation_id) {
        seen.entry(op.id.as_str())
            .or_default()
            .push(describe(op));
    }
    for (id, locations) in &seen {
        if locations.len() > 1 {
            report.errors.push(format!(
                "duplicate operationId '{}' on {}",
                id,
                locations.join(", ")
            ));
        }
    }

    if !recommend {
        return;
    }
    for op in operations {
        if !op.has_operation_id {
            report.recommendations.push(format!(
                "{} has no operationId; generated method will be named '{}'",
                describe(op),
                op.id
            ));
        }
        if op.primary_tag().is_none() {
            report.recommendations.push(format!(
                "{} has no tags; it will be grouped by path",
                describe(op)
            ));
        }
        if op.responses.values().all(|r| r.description.is_none()) {
            report
                .recommendations
                .push(format!("{} has no response description", describe(op)));
        }
    }
}

fn describe(op: &OpenApiOperation) -> String {
    format!("{} {}", op.method.to_uppercase(), op.path)
}
