use std::path::Path;

use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::domain::iac::resource_config::{AllResourceConfigs, ResourceConfig};

const TF_PLAN_FORMAT_VERSION: &str = "0.1";
const MANAGED_MODE: &str = "managed";

#[derive(Debug, Error)]
pub enum PlanLoadError {
    #[error("failed to read tfplan JSON file {path}: {source}")]
    ReadFile {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to decode tfplan JSON: {0}")]
    InvalidPlan(#[from] serde_json::Error),

    #[error("terraform format version should be '0.1', found '{0}'")]
    IncorrectFormatVersion(String),

    #[error("terraform version cannot be empty in tfplan JSON")]
    EmptyTerraformVersion,
}

#[derive(Debug, Deserialize)]
struct TfPlan {
    #[serde(default)]
    format_version: String,
    #[serde(default)]
    terraform_version: String,
    #[serde(default)]
    planned_values: Value,
}

pub fn load_tfplan_file(path: &Path) -> Result<AllResourceConfigs, PlanLoadError> {
    debug!("processing tfplan file {}", path.display());

    let content = std::fs::read(path).map_err(|source| PlanLoadError::ReadFile {
        path: path.display().to_string(),
        source,
    })?;

    parse_tfplan(&content)
}

/// Extracts every managed resource planned anywhere under the root module, child modules
/// included, grouped by resource type.
pub fn parse_tfplan(content: &[u8]) -> Result<AllResourceConfigs, PlanLoadError> {
    let plan: TfPlan = serde_json::from_slice(content)?;

    if plan.format_version != TF_PLAN_FORMAT_VERSION {
        return Err(PlanLoadError::IncorrectFormatVersion(plan.format_version));
    }

    if plan.terraform_version.is_empty() {
        return Err(PlanLoadError::EmptyTerraformVersion);
    }

    let mut resources = Vec::new();
    if let Some(root_module) = plan.planned_values.get("root_module") {
        find_managed_resources_recursive(root_module, &mut resources);
    }

    debug!("found {} managed resources in tfplan", resources.len());
    Ok(resources.into_iter().collect())
}

fn find_managed_resources_recursive(node: &Value, resources: &mut Vec<ResourceConfig>) {
    match node {
        Value::Object(map) => {
            if let Some(resource) = try_create_resource_config(map) {
                resources.push(resource);
            }
            for value in map.values() {
                find_managed_resources_recursive(value, resources);
            }
        }
        Value::Array(items) => {
            for item in items {
                find_managed_resources_recursive(item, resources);
            }
        }
        _ => {}
    }
}

fn try_create_resource_config(map: &Map<String, Value>) -> Option<ResourceConfig> {
    if map.get("mode").and_then(Value::as_str) != Some(MANAGED_MODE) {
        return None;
    }

    let address = map.get("address").and_then(Value::as_str)?;
    let resource_type = map.get("type").and_then(Value::as_str)?;

    Some(ResourceConfig {
        id: address.to_string(),
        resource_type: resource_type.to_string(),
        name: map
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        config: map.get("values").cloned().unwrap_or(Value::Null),
        source: String::new(),
    })
}
