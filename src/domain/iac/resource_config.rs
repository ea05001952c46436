use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(PartialEq, Clone, Debug, Serialize, Deserialize)]
pub struct ResourceConfig {
    pub id: String,
    #[serde(rename = "type")]
    pub resource_type: String,
    pub name: String,
    #[serde(default)]
    pub config: Value,
    #[serde(default)]
    pub source: String,
}

/// Resources grouped by type, in document order within each type.
#[derive(PartialEq, Clone, Debug, Default, Serialize)]
#[serde(transparent)]
pub struct AllResourceConfigs(BTreeMap<String, Vec<ResourceConfig>>);

impl AllResourceConfigs {
    pub fn push(&mut self, resource: ResourceConfig) {
        self.0
            .entry(resource.resource_type.clone())
            .or_default()
            .push(resource);
    }

    pub fn of_type(&self, resource_type: &str) -> &[ResourceConfig] {
        self.0
            .get(resource_type)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn resource_types(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<ResourceConfig> for AllResourceConfigs {
    fn from_iter<T: IntoIterator<Item = ResourceConfig>>(iter: T) -> Self {
        let mut all = Self::default();
        iter.into_iter().for_each(|resource| all.push(resource));
        all
    }
}
