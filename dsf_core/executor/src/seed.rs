//! Seeds: CSV files pushed into a stream through an inbound REST connection.

use crate::error::ExecutorError;
use crate::types::{Outcome, SeedFile};
use crate::Executor;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use common::types::field_type::FieldType;
use common::types::schema::{SchemaField, StreamSchema};
use log::{debug, info, warn};
use serde_json::{Map, Value};
use shared_clients::decodable::types::CreateConnection;
use std::collections::BTreeMap;
use std::path::Path;

/// Header and rows of a seed file.
#[derive(Debug, Clone, PartialEq)]
pub struct SeedTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl SeedTable {
    pub fn from_path(path: &Path) -> Result<Self, ExecutorError> {
        let reader = csv::Reader::from_path(path)?;
        Self::from_reader(reader)
    }

    pub fn from_reader<R: std::io::Read>(mut reader: csv::Reader<R>) -> Result<Self, ExecutorError> {
        let columns = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect::<Vec<String>>();
        let mut rows = Vec::new();
        for record in reader.records() {
            rows.push(record?.iter().map(str::to_string).collect());
        }
        Ok(Self { columns, rows })
    }

    fn values(&self, index: usize) -> impl Iterator<Item = &str> {
        self.rows
            .iter()
            .filter_map(move |row| row.get(index))
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// Stream schema for the seed: inferred types, overridden by `column_types`.
    pub fn schema(&self, seed: &str, column_types: &BTreeMap<String, String>) -> StreamSchema {
        let fields = self
            .columns
            .iter()
            .enumerate()
            .map(|(index, column)| {
                let inferred = infer_type(self.values(index));
                let field_type = match column_types.get(column) {
                    Some(raw) => FieldType::parse(raw).unwrap_or_else(|| {
                        warn!(
                            "Type override `{raw}` for column `{column}` in seed `{seed}` doesn't \
                             match any known type. Falling back to inferred type."
                        );
                        inferred
                    }),
                    None => inferred,
                };
                SchemaField::physical(column.clone(), field_type)
            })
            .collect();
        StreamSchema::new(fields)
    }

    /// One event per row; empty cells are sent as null.
    pub fn events(&self) -> Vec<Value> {
        self.rows
            .iter()
            .map(|row| {
                let event: Map<String, Value> = self
                    .columns
                    .iter()
                    .enumerate()
                    .map(|(index, column)| {
                        let value = match row.get(index).map(String::as_str) {
                            None | Some("") => Value::Null,
                            Some(v) => Value::String(v.to_string()),
                        };
                        (column.clone(), value)
                    })
                    .collect();
                Value::Object(event)
            })
            .collect()
    }
}

fn is_timestamp(v: &str) -> bool {
    DateTime::parse_from_rfc3339(v).is_ok()
        || NaiveDateTime::parse_from_str(v, "%Y-%m-%d %H:%M:%S%.f").is_ok()
        || NaiveDateTime::parse_from_str(v, "%Y-%m-%dT%H:%M:%S%.f").is_ok()
}

/// Narrowest type every non-empty value of a column fits.
pub fn infer_type<'a>(values: impl Iterator<Item = &'a str>) -> FieldType {
    let values: Vec<&str> = values.collect();
    let all = |check: fn(&str) -> bool| !values.is_empty() && values.iter().all(|v| check(v));

    if all(|v| v.eq_ignore_ascii_case("true") || v.eq_ignore_ascii_case("false")) {
        FieldType::Boolean
    } else if all(|v| v.parse::<i64>().is_ok()) {
        FieldType::BigInt
    } else if all(|v| v.parse::<f64>().is_ok_and(f64::is_finite)) {
        FieldType::Double
    } else if all(|v| NaiveDate::parse_from_str(v, "%Y-%m-%d").is_ok()) {
        FieldType::Date
    } else if all(is_timestamp) {
        FieldType::TimestampLocal(3)
    } else if all(|v| NaiveTime::parse_from_str(v, "%H:%M:%S%.f").is_ok()) {
        FieldType::Time(3)
    } else {
        FieldType::String
    }
}

impl Executor {
    /// Load a seed. A full refresh, or a seed never loaded before, rebuilds
    /// connection and stream; otherwise the stream is cleared and refilled.
    pub(crate) async fn load_seed(&self, seed: &SeedFile) -> Result<Outcome, ExecutorError> {
        let name = seed.name.as_str();
        let table = SeedTable::from_path(&seed.path)?;
        if table.columns.is_empty() {
            return Err(ExecutorError::config(format!(
                "Seed '{name}' at {} has no header row",
                seed.path.display()
            )));
        }

        let stream_exists = self.api().get_stream(name).await?.is_some();
        let connection_exists = self.api().get_connection(name).await?.is_some();

        if seed.full_refresh || !stream_exists || !connection_exists {
            if seed.full_refresh {
                info!("Full refresh of seed '{name}'");
            }
            self.drop_connection(name).await?;
            self.drop_stream(name).await?;
            let schema = table.schema(name, &seed.column_types);
            debug!("Creating connection and stream for seed '{name}'");
            self.api()
                .create_connection(&CreateConnection::rest_source(name, name, schema))
                .await?;
        } else {
            debug!("Clearing stream '{name}' before reloading");
            self.api().clear_stream(name).await?;
        }
        self.api().activate_connection(name).await?;

        let events = table.events();
        let received = self.api().send_events(name, &events).await?;
        if received != events.len() as u64 {
            warn!(
                "While seeding data for `{name}`: sent {} but connection reported only \
                 {received} events received.",
                events.len()
            );
        }
        self.api().deactivate_connection(name).await?;
        self.cache.invalidate(name);
        Ok(Outcome::Seeded {
            rows: events.len() as u64,
        })
    }

    /// Stop and delete the connection `name`. Returns false when there was none.
    pub async fn drop_connection(&self, name: &str) -> Result<bool, ExecutorError> {
        if self.api().get_connection(name).await?.is_none() {
            return Ok(false);
        }
        self.api().deactivate_connection(name).await?;
        self.api().delete_connection(name).await?;
        debug!("Connection '{name}' deleted successfully");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(csv: &str) -> SeedTable {
        SeedTable::from_reader(csv::Reader::from_reader(csv.as_bytes())).unwrap()
    }

    #[test]
    fn types_are_inferred_per_column() {
        let seed = table(
            "id,price,active,day,at,clock,name\n\
             1,1.5,true,2024-01-01,2024-01-01 10:00:00,10:00:00,a\n\
             2,2,FALSE,2024-01-02,2024-01-02T10:00:00Z,11:30:00,b\n",
        );
        let schema = seed.schema("s", &BTreeMap::new());
        let types: Vec<String> = schema
            .fields
            .iter()
            .map(|f| f.field_type().unwrap().to_string())
            .collect();
        assert_eq!(
            types,
            vec![
                "BIGINT",
                "DOUBLE",
                "BOOLEAN",
                "DATE",
                "TIMESTAMP_LTZ(3)",
                "TIME(3)",
                "STRING"
            ]
        );
    }

    #[test]
    fn overrides_win_and_bad_overrides_fall_back() {
        let seed = table("id,code\n1,US\n");
        let overrides = BTreeMap::from([
            ("id".to_string(), "INT".to_string()),
            ("code".to_string(), "NOT A TYPE".to_string()),
        ]);
        let schema = seed.schema("s", &overrides);
        assert_eq!(schema.field("id").unwrap().field_type(), Some(&FieldType::Int));
        assert_eq!(
            schema.field("code").unwrap().field_type(),
            Some(&FieldType::String)
        );
    }

    #[test]
    fn empty_cells_become_null_and_do_not_affect_inference() {
        let seed = table("id,note\n1,\n2,x\n");
        assert_eq!(infer_type(seed.values(0)), FieldType::BigInt);
        let events = seed.events();
        assert_eq!(events[0]["id"], Value::String("1".into()));
        assert!(events[0]["note"].is_null());
    }

    #[test]
    fn non_finite_words_stay_text() {
        let seed = table("reading,ratio
NaN,0.5
inf,1e3
infinity,-2.25
");
        assert_eq!(infer_type(seed.values(0)), FieldType::String);
        assert_eq!(infer_type(seed.values(1)), FieldType::Double);
    }
}
