//! Reading back what a previous build left on the service.
//!
//! Streams carry the primary key; the pipeline carries the SQL and, in its
//! description, the watermark and schema hints it was built with.

use crate::error::ExecutorError;
use common::types::model::{ModelDefinition, SchemaHints};
use log::warn;
use planner::{PipelineStatus, RemoteState};
use regex::{NoExpand, Regex};
use shared_clients::decodable::types::PipelineInfo;
use shared_clients::StreamingApi;

const WATERMARK_LINE: &str = "watermark: ";
const HINTS_LINE: &str = "schema-hints: ";

/// `INSERT INTO <sink> <sql>`, the statement every model pipeline runs.
pub fn wrap_as_pipeline(sink: &str, sql: &str) -> String {
    format!("INSERT INTO {sink} {sql}")
}

fn sink_pattern(sink: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!(r"(?i)^\s*insert\s+into\s+{}\s+", regex::escape(sink)))
}

/// Model SQL of a pipeline, without its `INSERT INTO <sink>` head.
pub fn strip_sink(sink: &str, sql: &str) -> String {
    match sink_pattern(sink) {
        Ok(re) => re.replace(sql, "").into_owned(),
        Err(_) => sql.to_string(),
    }
}

/// Point a pipeline at a renamed sink.
pub fn replace_sink(old: &str, new: &str, sql: &str) -> String {
    match sink_pattern(old) {
        Ok(re) => re
            .replace(sql, NoExpand(&format!("INSERT INTO {new} ")))
            .into_owned(),
        Err(_) => sql.to_string(),
    }
}

/// Rewrite `FROM <old>` and `JOIN <old>` to read from `new`.
pub fn replace_source(old: &str, new: &str, sql: &str) -> String {
    let pattern = format!(r"(?i)\b(from|join)(\s+){}\b", regex::escape(old));
    match Regex::new(&pattern) {
        Ok(re) => re
            .replace_all(sql, |caps: &regex::Captures| {
                format!("{}{}{new}", &caps[1], &caps[2])
            })
            .into_owned(),
        Err(_) => sql.to_string(),
    }
}

fn description_head(name: &str) -> String {
    format!("Pipeline for the '{name}' model")
}

/// Pipeline description recording the parts of `definition` the service
/// does not keep on its own.
pub fn pipeline_description(
    name: &str,
    definition: &ModelDefinition,
) -> Result<String, ExecutorError> {
    let record = |what: &str, e: serde_json::Error| {
        ExecutorError::unexpected(format!("Could not record {what} for '{name}': {e}"))
    };
    let mut description = description_head(name);
    if let Some(watermark) = &definition.watermark {
        // JSON keeps a multi-line expression on one line.
        let watermark = serde_json::to_string(watermark).map_err(|e| record("watermark", e))?;
        description.push('\n');
        description.push_str(WATERMARK_LINE);
        description.push_str(&watermark);
    }
    if !definition.output_stream_schema_hints.is_empty() {
        let hints = serde_json::to_string(&definition.output_stream_schema_hints)
            .map_err(|e| record("schema hints", e))?;
        description.push('\n');
        description.push_str(HINTS_LINE);
        description.push_str(&hints);
    }
    Ok(description)
}

/// Definition parts read back from a pipeline description.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordedDefinition {
    /// False when the description was not written by `pipeline_description`.
    pub recorded: bool,
    pub watermark: Option<String>,
    pub schema_hints: SchemaHints,
}

pub fn parse_description(name: &str, description: &str) -> RecordedDefinition {
    let mut lines = description.lines();
    if lines.next() != Some(description_head(name).as_str()) {
        return RecordedDefinition::default();
    }
    let mut recorded = RecordedDefinition {
        recorded: true,
        ..Default::default()
    };
    for line in lines {
        if let Some(watermark) = line.strip_prefix(WATERMARK_LINE) {
            let watermark = serde_json::from_str::<String>(watermark)
                .unwrap_or_else(|_| watermark.to_string());
            recorded.watermark = Some(watermark);
        } else if let Some(hints) = line.strip_prefix(HINTS_LINE) {
            match serde_json::from_str(hints) {
                Ok(hints) => recorded.schema_hints = hints,
                Err(e) => warn!("Ignoring unreadable schema hints on pipeline '{name}': {e}"),
            }
        }
    }
    recorded
}

/// Description of a renamed pipeline; recorded lines are carried over.
pub fn description_for_rename(old: &str, new: &str, description: &str) -> String {
    let head = description_head(old);
    match description.strip_prefix(head.as_str()) {
        Some(rest) if rest.is_empty() || rest.starts_with('\n') => {
            format!("{}{rest}", description_head(new))
        }
        _ => description.to_string(),
    }
}

pub fn pipeline_status(pipeline: &PipelineInfo) -> PipelineStatus {
    if pipeline.is_running() {
        PipelineStatus::Running
    } else if pipeline.is_stopped() {
        PipelineStatus::Stopped
    } else {
        PipelineStatus::Unknown
    }
}

/// Assemble the deployed state under `name`. A missing stream and pipeline
/// is absence, not an error.
pub async fn fetch_remote_state(
    api: &dyn StreamingApi,
    name: &str,
) -> Result<RemoteState, ExecutorError> {
    let pipeline = api.get_pipeline(name).await?;
    let stream = api.get_stream(name).await?;
    if pipeline.is_none() && stream.is_none() {
        return Ok(RemoteState::absent());
    }

    let recorded = pipeline
        .as_ref()
        .map(|p| parse_description(name, &p.description))
        .unwrap_or_default();
    let prior_watermark = if recorded.recorded {
        recorded.watermark
    } else {
        stream
            .as_ref()
            .and_then(|s| s.schema.watermarks.first())
            .map(ToString::to_string)
    };

    Ok(RemoteState {
        exists: true,
        prior_sql_text: pipeline.as_ref().map(|p| strip_sink(name, &p.sql)),
        prior_primary_key: stream
            .as_ref()
            .map(|s| s.schema.constraints.primary_key.clone())
            .unwrap_or_default(),
        prior_watermark,
        prior_schema_hints: recorded.schema_hints,
        pipeline_status: pipeline
            .as_ref()
            .map(pipeline_status)
            .unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::types::model::{ColumnConstraint, FieldHint};

    #[test]
    fn sink_is_stripped_and_replaced() {
        let sql = wrap_as_pipeline("orders", "SELECT * FROM raw");
        assert_eq!(strip_sink("orders", &sql), "SELECT * FROM raw");
        assert_eq!(strip_sink("other", &sql), sql);
        assert_eq!(
            replace_sink("orders", "orders_v2", &sql),
            "INSERT INTO orders_v2 SELECT * FROM raw"
        );
    }

    #[test]
    fn sources_are_replaced_on_word_boundaries() {
        let sql = "INSERT INTO x SELECT * FROM raw JOIN raw_extra ON 1=1 join raw r2 on 1=1";
        assert_eq!(
            replace_source("raw", "src", sql),
            "INSERT INTO x SELECT * FROM src JOIN raw_extra ON 1=1 join src r2 on 1=1"
        );
    }

    #[test]
    fn description_round_trips_watermark_and_hints() {
        let definition = ModelDefinition::new("SELECT 1")
            .with_watermark("ts AS ts - INTERVAL '5' SECOND")
            .with_hint(
                "id",
                FieldHint {
                    watermarks: vec![],
                    constraints: vec![ColumnConstraint::NotNull],
                },
            );
        let description = pipeline_description("orders", &definition).unwrap();
        assert!(description.starts_with("Pipeline for the 'orders' model\n"));

        let recorded = parse_description("orders", &description);
        assert!(recorded.recorded);
        assert_eq!(recorded.watermark, definition.watermark);
        assert_eq!(recorded.schema_hints, definition.output_stream_schema_hints);
    }

    #[test]
    fn multi_line_watermark_survives_the_description() {
        let definition =
            ModelDefinition::new("SELECT 1").with_watermark("ts AS ts\n  - INTERVAL '5' SECOND");
        let description = pipeline_description("orders", &definition).unwrap();
        assert_eq!(description.lines().count(), 2);
        assert_eq!(
            parse_description("orders", &description).watermark,
            definition.watermark
        );
    }

    #[test]
    fn plain_watermark_line_is_still_read() {
        let description = "Pipeline for the 'orders' model\nwatermark: ts AS ts";
        assert_eq!(
            parse_description("orders", description).watermark.as_deref(),
            Some("ts AS ts")
        );
    }

    #[test]
    fn rename_keeps_recorded_lines() {
        let definition = ModelDefinition::new("SELECT 1").with_watermark("ts AS ts");
        let description = pipeline_description("a", &definition).unwrap();
        let renamed = description_for_rename("a", "b", &description);
        assert_eq!(
            parse_description("b", &renamed).watermark.as_deref(),
            Some("ts AS ts")
        );
        assert_eq!(description_for_rename("a", "b", "custom"), "custom");
    }

    #[test]
    fn foreign_description_is_not_recorded() {
        let recorded = parse_description("orders", "hand made pipeline");
        assert!(!recorded.recorded);
        assert!(recorded.schema_hints.is_empty());
    }
}
