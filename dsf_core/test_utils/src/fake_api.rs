use async_trait::async_trait;
use common::types::field_type::FieldType;
use common::types::schema::{SchemaField, StreamSchema};
use parking_lot::RwLock;
use serde_json::Value;
use shared_clients::decodable::types::{
    ConnectionInfo, CreateConnection, CreatePipeline, CreateStream, PipelineInfo, PipelineUpdate,
    PreviewPage, PreviewRequest, ResourceState, StreamInfo,
};
use shared_clients::{ApiClientError, StreamingApi};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use uuid::Uuid;

#[derive(Default)]
struct FakeState {
    streams: BTreeMap<String, StreamInfo>,
    pipelines: BTreeMap<String, PipelineInfo>,
    connections: BTreeMap<String, ConnectionInfo>,
    /// Events received per stream.
    events: BTreeMap<String, Vec<Value>>,
    output_schemas: HashMap<String, StreamSchema>,
    default_output_schema: Option<StreamSchema>,
    preview_pages: VecDeque<PreviewPage>,
    previews: Vec<PreviewRequest>,
    accept_at_most: Option<u64>,
    failures: HashSet<String>,
    calls: Vec<String>,
}

/// In-memory stand-in for the stream-processing service.
///
/// Mirrors the service's refusals that matter to callers: deleting a stream
/// still read or written by a pipeline or connection fails, as does creating a
/// resource whose name is taken. Every call is recorded as `op:name`.
#[derive(Default)]
pub struct FakeStreamingApi {
    state: RwLock<FakeState>,
}

fn fresh_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Names following `FROM` or `JOIN`, the way the service reports a pipeline's inputs.
fn sql_sources(sql: &str) -> Vec<String> {
    let tokens: Vec<&str> = sql
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|t| !t.is_empty())
        .collect();
    let mut sources = Vec::new();
    for pair in tokens.windows(2) {
        let keyword = pair[0].to_ascii_lowercase();
        if (keyword == "from" || keyword == "join") && !sources.iter().any(|s| s == pair[1]) {
            sources.push(pair[1].to_string());
        }
    }
    sources
}

/// Target of `INSERT INTO <name> ...`.
fn sink_of(sql: &str) -> Option<String> {
    let mut words = sql.split_whitespace();
    while let Some(word) = words.next() {
        if word.eq_ignore_ascii_case("into") {
            return words.next().map(str::to_string);
        }
    }
    None
}

impl FakeStreamingApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schema returned by `output_schema` for statements writing into `stream`.
    pub fn with_output_schema(self, stream: &str, schema: StreamSchema) -> Self {
        self.state
            .write()
            .output_schemas
            .insert(stream.to_string(), schema);
        self
    }

    /// Schema returned for any statement without a specific registration.
    pub fn with_default_output_schema(self, schema: StreamSchema) -> Self {
        self.state.write().default_output_schema = Some(schema);
        self
    }

    /// Pages handed out by `create_preview` then `run_preview`, in order.
    pub fn with_preview_pages(self, pages: Vec<PreviewPage>) -> Self {
        self.state.write().preview_pages = pages.into();
        self
    }

    /// Report at most `count` accepted events per `send_events` call.
    pub fn accepting_at_most(self, count: u64) -> Self {
        self.state.write().accept_at_most = Some(count);
        self
    }

    /// Make every call of `op` on `name` fail with an unexpected-response error.
    pub fn fail_on(&self, op: &str, name: &str) {
        self.state.write().failures.insert(format!("{op}:{name}"));
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.read().calls.clone()
    }

    /// Recorded calls whose operation is one of `ops`.
    pub fn calls_of(&self, ops: &[&str]) -> Vec<String> {
        self.state
            .read()
            .calls
            .iter()
            .filter(|c| ops.iter().any(|op| c.split(':').next() == Some(*op)))
            .cloned()
            .collect()
    }

    pub fn clear_calls(&self) {
        self.state.write().calls.clear();
    }

    pub fn previews(&self) -> Vec<PreviewRequest> {
        self.state.read().previews.clone()
    }

    pub fn stream(&self, name: &str) -> Option<StreamInfo> {
        self.state.read().streams.get(name).cloned()
    }

    pub fn pipeline(&self, name: &str) -> Option<PipelineInfo> {
        self.state.read().pipelines.get(name).cloned()
    }

    pub fn connection(&self, name: &str) -> Option<ConnectionInfo> {
        self.state.read().connections.get(name).cloned()
    }

    pub fn events(&self, stream: &str) -> Vec<Value> {
        self.state
            .read()
            .events
            .get(stream)
            .cloned()
            .unwrap_or_default()
    }

    pub fn stream_names(&self) -> Vec<String> {
        self.state.read().streams.keys().cloned().collect()
    }

    pub fn pipeline_names(&self) -> Vec<String> {
        self.state.read().pipelines.keys().cloned().collect()
    }

    /// Insert a stream directly, bypassing the call log.
    pub fn seed_stream(&self, name: &str, schema: StreamSchema) {
        self.state.write().streams.insert(
            name.to_string(),
            StreamInfo {
                id: fresh_id(),
                name: name.to_string(),
                description: String::new(),
                schema,
                stream_type: Some("APPEND".to_string()),
            },
        );
    }

    /// Insert a pipeline directly, bypassing the call log.
    pub fn seed_pipeline(&self, name: &str, sql: &str, running: bool) {
        let state = if running {
            ResourceState::Running
        } else {
            ResourceState::Stopped
        };
        self.state.write().pipelines.insert(
            name.to_string(),
            PipelineInfo {
                id: fresh_id(),
                name: name.to_string(),
                sql: sql.to_string(),
                description: String::new(),
                actual_state: Some(state.clone()),
                target_state: Some(state),
            },
        );
    }

    fn record(&self, op: &str, name: &str) -> Result<(), ApiClientError> {
        let key = format!("{op}:{name}");
        let mut state = self.state.write();
        state.calls.push(key.clone());
        if state.failures.contains(&key) {
            return Err(ApiClientError::unexpected(format!(
                "status code 500 with body: injected failure for {key}"
            )));
        }
        Ok(())
    }

    fn missing(kind: &str, name: &str) -> ApiClientError {
        ApiClientError::not_found(format!("{kind} '{name}' not found"))
    }

    fn set_pipeline_state(&self, name: &str, to: ResourceState) -> Result<(), ApiClientError> {
        let mut state = self.state.write();
        let pipeline = state
            .pipelines
            .get_mut(name)
            .ok_or_else(|| Self::missing("pipeline", name))?;
        pipeline.actual_state = Some(to.clone());
        pipeline.target_state = Some(to);
        Ok(())
    }

    fn set_connection_state(&self, name: &str, to: ResourceState) -> Result<(), ApiClientError> {
        let mut state = self.state.write();
        let connection = state
            .connections
            .get_mut(name)
            .ok_or_else(|| Self::missing("connection", name))?;
        connection.actual_state = Some(to.clone());
        connection.target_state = Some(to);
        Ok(())
    }
}

#[async_trait]
impl StreamingApi for FakeStreamingApi {
    async fn test_connection(&self) -> Result<(), ApiClientError> {
        self.record("test_connection", "")
    }

    async fn list_streams(&self) -> Result<Vec<StreamInfo>, ApiClientError> {
        self.record("list_streams", "")?;
        Ok(self.state.read().streams.values().cloned().collect())
    }

    async fn get_stream(&self, name: &str) -> Result<Option<StreamInfo>, ApiClientError> {
        self.record("get_stream", name)?;
        Ok(self.state.read().streams.get(name).cloned())
    }

    async fn create_stream(&self, request: &CreateStream) -> Result<StreamInfo, ApiClientError> {
        self.record("create_stream", &request.name)?;
        let mut state = self.state.write();
        if state.streams.contains_key(&request.name) {
            return Err(ApiClientError::already_exists(format!(
                "stream '{}' already exists",
                request.name
            )));
        }
        let info = StreamInfo {
            id: fresh_id(),
            name: request.name.clone(),
            description: request.description.clone(),
            schema: request.schema.clone(),
            stream_type: Some("APPEND".to_string()),
        };
        state.streams.insert(request.name.clone(), info.clone());
        Ok(info)
    }

    async fn rename_stream(&self, name: &str, new_name: &str) -> Result<(), ApiClientError> {
        self.record("rename_stream", name)?;
        let mut state = self.state.write();
        let mut stream = state
            .streams
            .remove(name)
            .ok_or_else(|| Self::missing("stream", name))?;
        stream.name = new_name.to_string();
        state.streams.insert(new_name.to_string(), stream);
        if let Some(events) = state.events.remove(name) {
            state.events.insert(new_name.to_string(), events);
        }
        Ok(())
    }

    async fn clear_stream(&self, name: &str) -> Result<(), ApiClientError> {
        self.record("clear_stream", name)?;
        let mut state = self.state.write();
        if !state.streams.contains_key(name) {
            return Err(Self::missing("stream", name));
        }
        state.events.remove(name);
        Ok(())
    }

    async fn delete_stream(&self, name: &str) -> Result<(), ApiClientError> {
        self.record("delete_stream", name)?;
        let mut state = self.state.write();
        if !state.streams.contains_key(name) {
            return Err(Self::missing("stream", name));
        }
        let in_use = state.pipelines.values().any(|p| {
            sink_of(&p.sql).as_deref() == Some(name) || sql_sources(&p.sql).iter().any(|s| s == name)
        }) || state
            .connections
            .values()
            .any(|c| c.stream_name.as_deref() == Some(name));
        if in_use {
            return Err(ApiClientError::invalid_request(format!(
                "stream '{name}' is still in use"
            )));
        }
        state.streams.remove(name);
        state.events.remove(name);
        Ok(())
    }

    async fn list_pipelines(&self) -> Result<Vec<PipelineInfo>, ApiClientError> {
        self.record("list_pipelines", "")?;
        Ok(self.state.read().pipelines.values().cloned().collect())
    }

    async fn get_pipeline(&self, name: &str) -> Result<Option<PipelineInfo>, ApiClientError> {
        self.record("get_pipeline", name)?;
        Ok(self.state.read().pipelines.get(name).cloned())
    }

    async fn create_pipeline(
        &self,
        request: &CreatePipeline,
    ) -> Result<PipelineInfo, ApiClientError> {
        self.record("create_pipeline", &request.name)?;
        let mut state = self.state.write();
        if state.pipelines.contains_key(&request.name) {
            return Err(ApiClientError::already_exists(format!(
                "pipeline '{}' already exists",
                request.name
            )));
        }
        if let Some(sink) = sink_of(&request.sql) {
            if !state.streams.contains_key(&sink) {
                return Err(ApiClientError::invalid_request(format!(
                    "sink stream '{sink}' does not exist"
                )));
            }
        }
        let info = PipelineInfo {
            id: fresh_id(),
            name: request.name.clone(),
            sql: request.sql.clone(),
            description: request.description.clone(),
            actual_state: Some(ResourceState::Stopped),
            target_state: Some(ResourceState::Stopped),
        };
        state.pipelines.insert(request.name.clone(), info.clone());
        Ok(info)
    }

    async fn update_pipeline(
        &self,
        name: &str,
        update: &PipelineUpdate,
    ) -> Result<(), ApiClientError> {
        self.record("update_pipeline", name)?;
        let mut state = self.state.write();
        let mut pipeline = state
            .pipelines
            .remove(name)
            .ok_or_else(|| Self::missing("pipeline", name))?;
        if let Some(sql) = &update.sql {
            pipeline.sql = sql.clone();
        }
        if let Some(description) = &update.description {
            pipeline.description = description.clone();
        }
        if let Some(new_name) = &update.name {
            pipeline.name = new_name.clone();
        }
        state.pipelines.insert(pipeline.name.clone(), pipeline);
        Ok(())
    }

    async fn activate_pipeline(&self, name: &str) -> Result<(), ApiClientError> {
        self.record("activate_pipeline", name)?;
        self.set_pipeline_state(name, ResourceState::Running)
    }

    async fn deactivate_pipeline(&self, name: &str) -> Result<(), ApiClientError> {
        self.record("deactivate_pipeline", name)?;
        self.set_pipeline_state(name, ResourceState::Stopped)
    }

    async fn delete_pipeline(&self, name: &str) -> Result<(), ApiClientError> {
        self.record("delete_pipeline", name)?;
        let mut state = self.state.write();
        match state.pipelines.get(name) {
            None => Err(Self::missing("pipeline", name)),
            Some(p) if p.is_running() => Err(ApiClientError::invalid_request(format!(
                "pipeline '{name}' must be stopped before deletion"
            ))),
            Some(_) => {
                state.pipelines.remove(name);
                Ok(())
            }
        }
    }

    async fn pipeline_sources(&self, name: &str) -> Result<Vec<String>, ApiClientError> {
        self.record("pipeline_sources", name)?;
        let state = self.state.read();
        let pipeline = state
            .pipelines
            .get(name)
            .ok_or_else(|| Self::missing("pipeline", name))?;
        Ok(sql_sources(&pipeline.sql))
    }

    async fn output_schema(&self, sql: &str) -> Result<StreamSchema, ApiClientError> {
        let sink = sink_of(sql).unwrap_or_default();
        self.record("output_schema", &sink)?;
        let state = self.state.read();
        Ok(state
            .output_schemas
            .get(&sink)
            .or(state.default_output_schema.as_ref())
            .cloned()
            .unwrap_or_else(|| {
                StreamSchema::new(vec![SchemaField::physical("value", FieldType::String)])
            }))
    }

    async fn list_connections(&self) -> Result<Vec<ConnectionInfo>, ApiClientError> {
        self.record("list_connections", "")?;
        Ok(self.state.read().connections.values().cloned().collect())
    }

    async fn get_connection(&self, name: &str) -> Result<Option<ConnectionInfo>, ApiClientError> {
        self.record("get_connection", name)?;
        Ok(self.state.read().connections.get(name).cloned())
    }

    async fn create_connection(
        &self,
        request: &CreateConnection,
    ) -> Result<ConnectionInfo, ApiClientError> {
        self.record("create_connection", &request.name)?;
        let mut state = self.state.write();
        if state.connections.contains_key(&request.name) {
            return Err(ApiClientError::already_exists(format!(
                "connection '{}' already exists",
                request.name
            )));
        }
        if !state.streams.contains_key(&request.stream_name) {
            state.streams.insert(
                request.stream_name.clone(),
                StreamInfo {
                    id: fresh_id(),
                    name: request.stream_name.clone(),
                    description: String::new(),
                    schema: request.schema.clone(),
                    stream_type: Some("APPEND".to_string()),
                },
            );
        }
        let info = ConnectionInfo {
            id: fresh_id(),
            name: request.name.clone(),
            connector: request.connector.clone(),
            connection_type: request.connection_type.clone(),
            stream_name: Some(request.stream_name.clone()),
            actual_state: Some(ResourceState::Stopped),
            target_state: Some(ResourceState::Stopped),
        };
        state.connections.insert(request.name.clone(), info.clone());
        Ok(info)
    }

    async fn activate_connection(&self, name: &str) -> Result<(), ApiClientError> {
        self.record("activate_connection", name)?;
        self.set_connection_state(name, ResourceState::Running)
    }

    async fn deactivate_connection(&self, name: &str) -> Result<(), ApiClientError> {
        self.record("deactivate_connection", name)?;
        self.set_connection_state(name, ResourceState::Stopped)
    }

    async fn delete_connection(&self, name: &str) -> Result<(), ApiClientError> {
        self.record("delete_connection", name)?;
        self.state
            .write()
            .connections
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| Self::missing("connection", name))
    }

    async fn send_events(
        &self,
        connection: &str,
        events: &[Value],
    ) -> Result<u64, ApiClientError> {
        self.record("send_events", connection)?;
        let mut state = self.state.write();
        let stream = state
            .connections
            .get(connection)
            .ok_or_else(|| Self::missing("connection", connection))?
            .stream_name
            .clone()
            .unwrap_or_default();
        let accepted = match state.accept_at_most {
            Some(cap) => events.len().min(cap as usize),
            None => events.len(),
        };
        state
            .events
            .entry(stream)
            .or_default()
            .extend(events[..accepted].iter().cloned());
        Ok(accepted as u64)
    }

    async fn preview_dependencies(&self, sql: &str) -> Result<Vec<String>, ApiClientError> {
        self.record("preview_dependencies", "")?;
        Ok(sql_sources(sql))
    }

    async fn create_preview(
        &self,
        request: &PreviewRequest,
    ) -> Result<PreviewPage, ApiClientError> {
        self.record("create_preview", "")?;
        let mut state = self.state.write();
        state.previews.push(request.clone());
        Ok(state.preview_pages.pop_front().unwrap_or_else(|| PreviewPage {
            id: "preview".to_string(),
            output_stream_type: "APPEND".to_string(),
            results: Vec::new(),
            next_token: None,
        }))
    }

    async fn run_preview(&self, id: &str, _token: &str) -> Result<PreviewPage, ApiClientError> {
        self.record("run_preview", id)?;
        let mut state = self.state.write();
        Ok(state.preview_pages.pop_front().unwrap_or_else(|| PreviewPage {
            id: id.to_string(),
            output_stream_type: "APPEND".to_string(),
            results: Vec::new(),
            next_token: None,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sources_follow_from_and_join() {
        assert_eq!(
            sql_sources("INSERT INTO out SELECT * FROM a JOIN b ON a.id = b.id"),
            vec!["a", "b"]
        );
        assert_eq!(sink_of("insert into out select 1").as_deref(), Some("out"));
    }

    #[tokio::test]
    async fn stream_in_use_cannot_be_deleted() {
        let api = FakeStreamingApi::new();
        api.seed_stream("orders", StreamSchema::default());
        api.seed_pipeline("orders", "INSERT INTO orders SELECT 1", true);

        assert!(api.delete_stream("orders").await.is_err());
        assert!(api.delete_pipeline("orders").await.is_err());
        api.deactivate_pipeline("orders").await.unwrap();
        api.delete_pipeline("orders").await.unwrap();
        api.delete_stream("orders").await.unwrap();
        assert!(api.stream_names().is_empty());
    }

    #[tokio::test]
    async fn injected_failures_are_recorded() {
        let api = FakeStreamingApi::new();
        api.fail_on("get_stream", "x");
        assert!(api.get_stream("x").await.is_err());
        assert!(api.get_stream("y").await.unwrap().is_none());
        assert_eq!(api.calls(), vec!["get_stream:x", "get_stream:y"]);
    }
}
