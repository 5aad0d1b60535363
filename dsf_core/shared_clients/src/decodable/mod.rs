pub mod client;
pub mod error;
pub mod types;

use crate::decodable::error::ApiClientError;
use crate::decodable::types::{
    ConnectionInfo, CreateConnection, CreatePipeline, CreateStream, PipelineInfo, PipelineUpdate,
    PreviewPage, PreviewRequest, StreamInfo,
};
use async_trait::async_trait;
use common::types::schema::StreamSchema;
use serde_json::Value;

/// Operations the materialisation driver needs from the stream-processing
/// service. Resources are addressed by name.
#[async_trait]
pub trait StreamingApi: Send + Sync {
    async fn test_connection(&self) -> Result<(), ApiClientError>;

    async fn list_streams(&self) -> Result<Vec<StreamInfo>, ApiClientError>;
    async fn get_stream(&self, name: &str) -> Result<Option<StreamInfo>, ApiClientError>;
    async fn create_stream(&self, request: &CreateStream) -> Result<StreamInfo, ApiClientError>;
    async fn rename_stream(&self, name: &str, new_name: &str) -> Result<(), ApiClientError>;
    async fn clear_stream(&self, name: &str) -> Result<(), ApiClientError>;
    async fn delete_stream(&self, name: &str) -> Result<(), ApiClientError>;

    async fn list_pipelines(&self) -> Result<Vec<PipelineInfo>, ApiClientError>;
    async fn get_pipeline(&self, name: &str) -> Result<Option<PipelineInfo>, ApiClientError>;
    async fn create_pipeline(
        &self,
        request: &CreatePipeline,
    ) -> Result<PipelineInfo, ApiClientError>;
    async fn update_pipeline(
        &self,
        name: &str,
        update: &PipelineUpdate,
    ) -> Result<(), ApiClientError>;
    async fn activate_pipeline(&self, name: &str) -> Result<(), ApiClientError>;
    async fn deactivate_pipeline(&self, name: &str) -> Result<(), ApiClientError>;
    async fn delete_pipeline(&self, name: &str) -> Result<(), ApiClientError>;
    /// Names of the streams the pipeline reads from.
    async fn pipeline_sources(&self, name: &str) -> Result<Vec<String>, ApiClientError>;
    /// Schema the service derives for an `INSERT INTO ... SELECT` statement.
    async fn output_schema(&self, sql: &str) -> Result<StreamSchema, ApiClientError>;

    async fn list_connections(&self) -> Result<Vec<ConnectionInfo>, ApiClientError>;
    async fn get_connection(&self, name: &str) -> Result<Option<ConnectionInfo>, ApiClientError>;
    async fn create_connection(
        &self,
        request: &CreateConnection,
    ) -> Result<ConnectionInfo, ApiClientError>;
    async fn activate_connection(&self, name: &str) -> Result<(), ApiClientError>;
    async fn deactivate_connection(&self, name: &str) -> Result<(), ApiClientError>;
    async fn delete_connection(&self, name: &str) -> Result<(), ApiClientError>;
    /// Returns how many events the service accepted.
    async fn send_events(&self, connection: &str, events: &[Value])
        -> Result<u64, ApiClientError>;

    /// Input streams a query reads from.
    async fn preview_dependencies(&self, sql: &str) -> Result<Vec<String>, ApiClientError>;
    async fn create_preview(&self, request: &PreviewRequest)
        -> Result<PreviewPage, ApiClientError>;
    async fn run_preview(&self, id: &str, token: &str) -> Result<PreviewPage, ApiClientError>;
}
