use crate::traits::ConfigName;
use serde::Deserialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SeedsFile {
    #[serde(default)]
    pub seeds: Vec<SeedConfig>,
}

/// Options for one CSV seed.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct SeedConfig {
    pub name: String,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub full_refresh: Option<bool>,
    /// Column -> type string; overrides inference.
    #[serde(default)]
    pub column_types: BTreeMap<String, String>,
}

impl SeedConfig {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn alias(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

impl ConfigName for SeedConfig {
    fn name(&self) -> &str {
        &self.name
    }
}
