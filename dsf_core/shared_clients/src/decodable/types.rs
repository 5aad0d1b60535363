use common::config::components::profile::PreviewStart;
use common::types::schema::StreamSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Lifecycle state reported for pipelines and connections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResourceState {
    Running,
    Starting,
    Stopping,
    Stopped,
    Failed,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamInfo {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "schema_v2", default)]
    pub schema: StreamSchema,
    /// `APPEND` or `CHANGE`.
    #[serde(rename = "type", default)]
    pub stream_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineInfo {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub sql: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub actual_state: Option<ResourceState>,
    #[serde(default)]
    pub target_state: Option<ResourceState>,
}

impl PipelineInfo {
    /// Running if either side of the state pair says so.
    pub fn is_running(&self) -> bool {
        self.actual_state == Some(ResourceState::Running)
            || self.target_state == Some(ResourceState::Running)
    }

    pub fn is_stopped(&self) -> bool {
        self.actual_state == Some(ResourceState::Stopped)
            && self.target_state != Some(ResourceState::Running)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionInfo {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub connector: String,
    #[serde(rename = "type", default)]
    pub connection_type: String,
    #[serde(default)]
    pub stream_name: Option<String>,
    #[serde(default)]
    pub actual_state: Option<ResourceState>,
    #[serde(default)]
    pub target_state: Option<ResourceState>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateStream {
    pub name: String,
    pub description: String,
    #[serde(rename = "schema_v2")]
    pub schema: StreamSchema,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreatePipeline {
    pub name: String,
    pub sql: String,
    pub description: String,
}

/// Partial update; only set fields are sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PipelineUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sql: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateConnection {
    pub name: String,
    /// Stream the connection writes into.
    #[serde(skip)]
    pub stream_name: String,
    pub connector: String,
    #[serde(rename = "type")]
    pub connection_type: String,
    #[serde(rename = "schema_v2")]
    pub schema: StreamSchema,
}

impl CreateConnection {
    /// Inbound REST connection, the only kind seeds need.
    pub fn rest_source(name: &str, stream_name: &str, schema: StreamSchema) -> Self {
        Self {
            name: name.to_string(),
            stream_name: stream_name.to_string(),
            connector: "rest".to_string(),
            connection_type: "source".to_string(),
            schema,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PreviewRequest {
    pub sql: String,
    pub start: PreviewStart,
    pub input_streams: Vec<String>,
}

impl PreviewRequest {
    pub(crate) fn body(&self) -> Value {
        let positions: Map<String, Value> = self
            .input_streams
            .iter()
            .map(|s| {
                (
                    s.clone(),
                    serde_json::json!({"type": "TAG", "value": self.start.to_string()}),
                )
            })
            .collect();
        serde_json::json!({
            "sql": self.sql,
            "start_positions": positions,
        })
    }
}

/// One page of preview output.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PreviewPage {
    pub id: String,
    #[serde(default)]
    pub output_stream_type: String,
    #[serde(default)]
    pub results: Vec<Value>,
    #[serde(default)]
    pub next_token: Option<String>,
}

impl PreviewPage {
    pub fn is_append(&self) -> bool {
        self.output_stream_type.eq_ignore_ascii_case("APPEND")
    }
}

/// List envelope used by every collection endpoint.
#[derive(Debug, Deserialize)]
pub(crate) struct Page<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AssociatedStream {
    pub stream_id: String,
    #[serde(default)]
    pub is_source: bool,
}
