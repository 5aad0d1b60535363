use common::types::model::{ModelDefinition, SchemaHints};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineStatus {
    #[default]
    Unknown,
    Running,
    Stopped,
}

impl fmt::Display for PipelineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PipelineStatus::Unknown => "unknown",
            PipelineStatus::Running => "running",
            PipelineStatus::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

/// What is currently deployed under one resource name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteState {
    pub exists: bool,
    pub prior_sql_text: Option<String>,
    pub prior_primary_key: Vec<String>,
    pub prior_watermark: Option<String>,
    pub prior_schema_hints: SchemaHints,
    pub pipeline_status: PipelineStatus,
}

impl RemoteState {
    pub fn absent() -> Self {
        Self::default()
    }

    /// State left behind by a successful build of `definition`.
    pub fn deployed(definition: &ModelDefinition, status: PipelineStatus) -> Self {
        Self {
            exists: true,
            prior_sql_text: Some(definition.sql_text.clone()),
            prior_primary_key: definition.primary_key.clone(),
            prior_watermark: definition.watermark.clone(),
            prior_schema_hints: definition.output_stream_schema_hints.clone(),
            pipeline_status: status,
        }
    }
}
