use crate::traits::ConfigName;
use crate::types::model::{ColumnConstraint, FieldHint, ModelDefinition, SchemaHints};
use serde::{Deserialize, Deserializer};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModelsFile {
    #[serde(default)]
    pub models: Vec<ModelConfig>,
}

/// Per-model options declared next to the SQL files.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ModelConfig {
    pub name: String,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub config: ModelOptions,
    #[serde(default)]
    pub columns: Vec<ColumnConfig>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ModelOptions {
    #[serde(default, deserialize_with = "one_or_many")]
    pub primary_key: Vec<String>,
    #[serde(default)]
    pub watermark: Option<String>,
    #[serde(default)]
    pub full_refresh: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ColumnConfig {
    pub name: String,
    #[serde(default)]
    pub data_type: Option<String>,
    #[serde(default)]
    pub constraints: Vec<ColumnConstraint>,
    #[serde(default)]
    pub watermarks: Vec<String>,
}

impl ModelConfig {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn alias(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    /// Declared primary key; falls back to columns tagged `primary_key`.
    pub fn primary_key(&self) -> Vec<String> {
        if !self.config.primary_key.is_empty() {
            return self.config.primary_key.clone();
        }
        self.columns
            .iter()
            .filter(|c| c.constraints.contains(&ColumnConstraint::PrimaryKey))
            .map(|c| c.name.clone())
            .collect()
    }

    pub fn schema_hints(&self) -> SchemaHints {
        self.columns
            .iter()
            .filter_map(|c| {
                let hint = FieldHint {
                    watermarks: c.watermarks.clone(),
                    constraints: c.constraints.clone(),
                };
                (!hint.is_empty()).then(|| (c.name.clone(), hint))
            })
            .collect()
    }

    pub fn definition(&self, sql_text: &str) -> ModelDefinition {
        ModelDefinition {
            sql_text: sql_text.to_string(),
            primary_key: self.primary_key(),
            watermark: self.config.watermark.clone(),
            output_stream_schema_hints: self.schema_hints(),
        }
    }
}

impl ConfigName for ModelConfig {
    fn name(&self) -> &str {
        &self.name
    }
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(OneOrMany::One(s)) => vec![s],
        Some(OneOrMany::Many(v)) => v,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODELS: &str = r#"
models:
  - name: http_events
    config:
      primary_key: id
      watermark: "ts AS ts - INTERVAL '5' SECOND"
    columns:
      - name: id
        data_type: BIGINT
        constraints: [not_null]
      - name: ts
        watermarks: ["ts - INTERVAL '5' SECOND"]
      - name: payload
  - name: orders
    alias: orders_v2
    config:
      primary_key: [region, id]
"#;

    #[test]
    fn parses_models_file() {
        let file: ModelsFile = serde_yaml::from_str(MODELS).unwrap();
        assert_eq!(file.models.len(), 2);

        let events = &file.models[0];
        assert_eq!(events.primary_key(), vec!["id"]);
        assert_eq!(
            events.config.watermark.as_deref(),
            Some("ts AS ts - INTERVAL '5' SECOND")
        );
        assert_eq!(events.alias(), "http_events");

        let orders = &file.models[1];
        assert_eq!(orders.primary_key(), vec!["region", "id"]);
        assert_eq!(orders.alias(), "orders_v2");
    }

    #[test]
    fn hints_skip_plain_columns() {
        let file: ModelsFile = serde_yaml::from_str(MODELS).unwrap();
        let hints = file.models[0].schema_hints();
        assert_eq!(hints.len(), 2);
        assert!(hints["id"].has(ColumnConstraint::NotNull));
        assert_eq!(hints["ts"].watermarks.len(), 1);
        assert!(!hints.contains_key("payload"));
    }

    #[test]
    fn column_constraint_supplies_primary_key() {
        let yaml = r#"
name: m
columns:
  - name: a
    constraints: [primary_key]
  - name: b
  - name: c
    constraints: [primary_key, not_null]
"#;
        let model: ModelConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(model.primary_key(), vec!["a", "c"]);

        let def = model.definition("SELECT 1");
        assert_eq!(def.sql_text, "SELECT 1");
        assert_eq!(def.primary_key, vec!["a", "c"]);
        assert!(def.watermark.is_none());
    }
}
