use crate::types::field_type::FieldType;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One column of a stream schema.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SchemaField {
    Physical {
        name: String,
        #[serde(rename = "type")]
        field_type: FieldType,
    },
    Metadata {
        name: String,
        key: String,
        #[serde(rename = "type")]
        field_type: FieldType,
    },
    Computed {
        name: String,
        expression: String,
    },
}

impl SchemaField {
    pub fn physical(name: impl Into<String>, field_type: FieldType) -> Self {
        SchemaField::Physical {
            name: name.into(),
            field_type,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            SchemaField::Physical { name, .. }
            | SchemaField::Metadata { name, .. }
            | SchemaField::Computed { name, .. } => name,
        }
    }

    /// Declared type; computed fields have none.
    pub fn field_type(&self) -> Option<&FieldType> {
        match self {
            SchemaField::Physical { field_type, .. } | SchemaField::Metadata { field_type, .. } => {
                Some(field_type)
            }
            SchemaField::Computed { .. } => None,
        }
    }

    pub fn field_type_mut(&mut self) -> Option<&mut FieldType> {
        match self {
            SchemaField::Physical { field_type, .. } | SchemaField::Metadata { field_type, .. } => {
                Some(field_type)
            }
            SchemaField::Computed { .. } => None,
        }
    }
}

impl fmt::Display for SchemaField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaField::Physical { name, field_type } => {
                write!(f, "name: '{name}' | kind: 'physical' | type: '{field_type}'")
            }
            SchemaField::Metadata {
                name,
                key,
                field_type,
            } => write!(
                f,
                "name: '{name}' | kind: 'metadata' | key: '{key}' | type: '{field_type}'"
            ),
            SchemaField::Computed { name, expression } => {
                write!(f, "name: '{name}' | kind: 'computed' | expression: '{expression}'")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Watermark {
    pub name: String,
    pub expression: String,
}

impl Watermark {
    /// Parse `<field> AS <expression>`. The keyword is matched case-insensitively
    /// and may be surrounded by any whitespace, newlines included.
    pub fn parse(raw: &str) -> Option<Watermark> {
        let re = Regex::new(r"(?is)^\s*(.+?)\s+as\s+(.+?)\s*$").ok()?;
        let caps = re.captures(raw)?;
        Some(Watermark {
            name: caps[1].to_string(),
            expression: caps[2].to_string(),
        })
    }
}

impl fmt::Display for Watermark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} AS {}", self.name, self.expression)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Constraints {
    #[serde(default)]
    pub primary_key: Vec<String>,
}

/// Full schema of a stream: fields, watermarks and constraints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StreamSchema {
    pub fields: Vec<SchemaField>,
    #[serde(default)]
    pub watermarks: Vec<Watermark>,
    #[serde(default)]
    pub constraints: Constraints,
}

impl StreamSchema {
    pub fn new(fields: Vec<SchemaField>) -> Self {
        Self {
            fields,
            ..Default::default()
        }
    }

    pub fn field(&self, name: &str) -> Option<&SchemaField> {
        self.fields.iter().find(|f| f.name() == name)
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(SchemaField::name).collect()
    }

    /// Move inline `PRIMARY KEY` markers out of the field types.
    ///
    /// The service reports the key of a derived output schema inline; streams
    /// carry it as a constraint instead.
    pub fn strip_primary_key_markers(&mut self) -> Vec<String> {
        let mut keys = Vec::new();
        for field in self.fields.iter_mut() {
            let name = field.name().to_string();
            if let Some(t) = field.field_type_mut() {
                if t.is_primary_key() {
                    *t = t.without_primary_key();
                    keys.push(name);
                }
            }
        }
        keys
    }

    /// Multi-line rendering used in warnings, fields sorted by name.
    pub fn pretty(&self, indent: usize, label: Option<&str>) -> String {
        let mut fields: Vec<&SchemaField> = self.fields.iter().collect();
        fields.sort_by(|a, b| a.name().cmp(b.name()));

        let pad = "\t".repeat(indent);
        let inner = "\t".repeat(indent + 1);
        let mut out = match label {
            Some(label) => format!("{pad}{label} = {{\n"),
            None => format!("{pad}{{\n"),
        };
        for field in &fields {
            let t = field
                .field_type()
                .map(ToString::to_string)
                .unwrap_or_else(|| "<computed>".to_string());
            out.push_str(&format!("{inner}{}: {t},\n", field.name()));
        }
        if fields.is_empty() {
            out.push('}');
        } else {
            out.push_str(&format!("{pad}}}"));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn physical_field_serialises_with_kind_tag() {
        let field = SchemaField::physical("field1", FieldType::String);
        assert_eq!(
            serde_json::to_value(&field).unwrap(),
            json!({"kind": "physical", "name": "field1", "type": "STRING"})
        );
        assert_eq!(
            field.to_string(),
            "name: 'field1' | kind: 'physical' | type: 'STRING'"
        );
    }

    #[test]
    fn schema_from_json_components() {
        let schema: StreamSchema = serde_json::from_value(json!({
            "fields": [
                {"kind": "physical", "name": "id", "type": "INT"},
                {"kind": "metadata", "name": "offset", "key": "kafka.offset", "type": "BIGINT"},
                {"kind": "computed", "name": "id2", "expression": "id * 2"}
            ],
            "watermarks": [{"name": "ts", "expression": "ts - INTERVAL '1' SECOND"}],
            "constraints": {"primary_key": ["id"]}
        }))
        .unwrap();

        assert_eq!(schema.field_names(), vec!["id", "offset", "id2"]);
        assert_eq!(schema.constraints.primary_key, vec!["id"]);
        assert_eq!(
            schema.watermarks[0].to_string(),
            "ts AS ts - INTERVAL '1' SECOND"
        );
        assert!(schema.field("id2").unwrap().field_type().is_none());
    }

    #[test]
    fn missing_watermarks_and_constraints_default_to_empty() {
        let schema: StreamSchema = serde_json::from_value(json!({
            "fields": [{"kind": "physical", "name": "id", "type": "INT"}]
        }))
        .unwrap();
        assert!(schema.watermarks.is_empty());
        assert!(schema.constraints.primary_key.is_empty());
    }

    #[test]
    fn unknown_field_kind_is_rejected() {
        let res = serde_json::from_value::<SchemaField>(json!({
            "kind": "virtual", "name": "x", "type": "INT"
        }));
        assert!(res.is_err());
    }

    #[test]
    fn equality_follows_type_synonyms() {
        let a = StreamSchema::new(vec![SchemaField::physical("n", FieldType::String)]);
        let b = StreamSchema::new(vec![SchemaField::physical(
            "n",
            FieldType::Varchar(crate::types::field_type::MAX_LENGTH),
        )]);
        assert_eq!(a, b);
    }

    #[test]
    fn watermark_parsing() {
        let w = Watermark::parse("ts as ts - INTERVAL '5' SECOND").unwrap();
        assert_eq!(w.name, "ts");
        assert_eq!(w.expression, "ts - INTERVAL '5' SECOND");
        assert!(Watermark::parse("ts - INTERVAL '5' SECOND").is_none());
        assert!(Watermark::parse(" AS x").is_none());
    }

    #[test]
    fn watermark_keyword_accepts_any_whitespace() {
        for raw in [
            "ts\tAS ts",
            "ts AS\tts",
            "ts\nAS\n  ts",
            "  ts   as   ts  \n",
        ] {
            let w = Watermark::parse(raw).unwrap();
            assert_eq!(w.to_string(), "ts AS ts", "{raw:?}");
        }
        let w = Watermark::parse("ts AS ts\n  - INTERVAL '5' SECOND").unwrap();
        assert_eq!(w.expression, "ts\n  - INTERVAL '5' SECOND");
    }

    #[test]
    fn primary_key_markers_move_to_constraints() {
        let mut schema = StreamSchema::new(vec![
            SchemaField::physical("id", FieldType::PrimaryKey(Box::new(FieldType::Int))),
            SchemaField::physical("name", FieldType::String),
        ]);
        let keys = schema.strip_primary_key_markers();
        assert_eq!(keys, vec!["id"]);
        assert_eq!(schema.field("id").unwrap().field_type(), Some(&FieldType::Int));
    }

    #[test]
    fn pretty_print_sorts_fields() {
        let schema = StreamSchema::new(vec![
            SchemaField::physical("b", FieldType::Int),
            SchemaField::physical("a", FieldType::String),
        ]);
        assert_eq!(
            schema.pretty(0, Some("schema")),
            "schema = {\n\ta: STRING,\n\tb: INT,\n}"
        );
        assert_eq!(StreamSchema::default().pretty(1, None), "\t{\n}");
    }
}
