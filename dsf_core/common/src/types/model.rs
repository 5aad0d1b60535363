use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Address of a remote stream / pipeline pair.
///
/// `database` and `schema` are carried for the host's relation handles only;
/// the remote service addresses everything by `name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceIdentity {
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default)]
    pub schema: Option<String>,
    pub name: String,
}

impl ResourceIdentity {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            database: None,
            schema: None,
            name: name.into(),
        }
    }

    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self.clone()
        }
    }
}

impl fmt::Display for ResourceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnConstraint {
    NotNull,
    PrimaryKey,
}

/// Per-column adjustments applied to the derived output schema.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldHint {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub watermarks: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constraints: Vec<ColumnConstraint>,
}

impl FieldHint {
    pub fn is_empty(&self) -> bool {
        self.watermarks.is_empty() && self.constraints.is_empty()
    }

    pub fn has(&self, constraint: ColumnConstraint) -> bool {
        self.constraints.contains(&constraint)
    }
}

/// Field name to hint. Ordered so that recorded hints compare structurally.
pub type SchemaHints = BTreeMap<String, FieldHint>;

/// Desired state of a model, rebuilt from source on every invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDefinition {
    pub sql_text: String,
    #[serde(default)]
    pub primary_key: Vec<String>,
    #[serde(default)]
    pub watermark: Option<String>,
    #[serde(default)]
    pub output_stream_schema_hints: SchemaHints,
}

impl ModelDefinition {
    pub fn new(sql_text: impl Into<String>) -> Self {
        Self {
            sql_text: sql_text.into(),
            ..Default::default()
        }
    }

    pub fn with_primary_key<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.primary_key = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_watermark(mut self, watermark: impl Into<String>) -> Self {
        self.watermark = Some(watermark.into());
        self
    }

    pub fn with_hint(mut self, field: impl Into<String>, hint: FieldHint) -> Self {
        self.output_stream_schema_hints.insert(field.into(), hint);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constraints_use_snake_case_names() {
        let hint: FieldHint =
            serde_json::from_str(r#"{"constraints": ["not_null", "primary_key"]}"#).unwrap();
        assert!(hint.has(ColumnConstraint::NotNull));
        assert!(hint.has(ColumnConstraint::PrimaryKey));
        assert!(hint.watermarks.is_empty());
    }

    #[test]
    fn empty_hint_serialises_to_empty_object() {
        assert_eq!(serde_json::to_string(&FieldHint::default()).unwrap(), "{}");
    }

    #[test]
    fn hints_compare_independent_of_insertion_order() {
        let a = ModelDefinition::new("SELECT 1")
            .with_hint("a", FieldHint::default())
            .with_hint("b", FieldHint::default());
        let b = ModelDefinition::new("SELECT 1")
            .with_hint("b", FieldHint::default())
            .with_hint("a", FieldHint::default());
        assert_eq!(a, b);
    }

    #[test]
    fn identity_displays_name_only() {
        let mut id = ResourceIdentity::new("orders");
        id.schema = Some("ignored".into());
        assert_eq!(id.to_string(), "orders");
        assert_eq!(id.renamed("orders_v2").schema.as_deref(), Some("ignored"));
    }
}
