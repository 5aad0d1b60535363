use crate::decodable::error::ApiClientError;
use crate::decodable::types::{
    AssociatedStream, ConnectionInfo, CreateConnection, CreatePipeline, CreateStream, Page,
    PipelineInfo, PipelineUpdate, PreviewPage, PreviewRequest, StreamInfo,
};
use crate::decodable::StreamingApi;
use async_trait::async_trait;
use common::config::components::profile::TargetProfile;
use common::types::schema::StreamSchema;
use log::debug;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;

/// Bound on a single control-plane request. Preview polling has its own budget.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct DecodableClientConfig {
    pub base_url: String,
    pub access_token: String,
    pub timeout: Duration,
}

impl DecodableClientConfig {
    pub fn from_target(target: &TargetProfile, access_token: String) -> Self {
        Self {
            base_url: target.base_url(),
            access_token,
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

/// Control-plane REST client.
#[derive(Debug, Clone)]
pub struct DecodableClient {
    config: DecodableClientConfig,
    http: Client,
}

#[derive(Deserialize)]
struct OutputStream {
    #[serde(rename = "schema_v2", default)]
    schema: StreamSchema,
}

#[derive(Deserialize)]
struct EventsAccepted {
    count: u64,
}

#[derive(Deserialize)]
struct PreviewDependencies {
    #[serde(default)]
    inputs: Vec<PreviewInput>,
}

#[derive(Deserialize)]
struct PreviewInput {
    #[serde(rename = "resourceName")]
    resource_name: String,
}

impl DecodableClient {
    pub fn new(config: DecodableClientConfig) -> Result<Self, ApiClientError> {
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { config, http })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/{}", self.config.base_url.trim_end_matches('/'), path);
        self.http
            .request(method, url)
            .bearer_auth(&self.config.access_token)
            .header("accept", "application/json")
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, ApiClientError> {
        let resp = builder.send().await?;
        let status = resp.status();
        if status.is_success() {
            Ok(resp)
        } else {
            let body = resp.text().await.unwrap_or_default();
            Err(ApiClientError::from_status(status, &body))
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiClientError> {
        let resp = self.send(self.request(Method::GET, path)).await?;
        Ok(resp.json().await?)
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &impl serde::Serialize,
    ) -> Result<T, ApiClientError> {
        let resp = self
            .send(self.request(Method::POST, path).json(body))
            .await?;
        Ok(resp.json().await?)
    }

    async fn post_empty(&self, path: &str) -> Result<(), ApiClientError> {
        self.send(self.request(Method::POST, path).json(&json!({})))
            .await?;
        Ok(())
    }

    async fn patch(&self, path: &str, body: &impl serde::Serialize) -> Result<(), ApiClientError> {
        self.send(self.request(Method::PATCH, path).json(body))
            .await?;
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<(), ApiClientError> {
        self.send(self.request(Method::DELETE, path)).await?;
        Ok(())
    }

    /// Every item of a collection, following `next_page_token`.
    async fn list_all<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>, ApiClientError> {
        let mut items = Vec::new();
        let mut token: Option<String> = None;
        loop {
            let mut builder = self.request(Method::GET, path);
            if let Some(t) = &token {
                builder = builder.query(&[("start", t)]);
            }
            let page: Page<T> = self.send(builder).await?.json().await?;
            items.extend(page.items);
            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(next) => token = Some(next),
                None => break,
            }
        }
        Ok(items)
    }

    async fn stream_id(&self, name: &str) -> Result<String, ApiClientError> {
        self.list_streams()
            .await?
            .into_iter()
            .find(|s| s.name == name)
            .map(|s| s.id)
            .ok_or_else(|| ApiClientError::not_found(format!("stream '{name}'")))
    }

    async fn pipeline_id(&self, name: &str) -> Result<String, ApiClientError> {
        self.list_pipelines()
            .await?
            .into_iter()
            .find(|p| p.name == name)
            .map(|p| p.id)
            .ok_or_else(|| ApiClientError::not_found(format!("pipeline '{name}'")))
    }

    async fn connection_id(&self, name: &str) -> Result<String, ApiClientError> {
        self.list_connections()
            .await?
            .into_iter()
            .find(|c| c.name == name)
            .map(|c| c.id)
            .ok_or_else(|| ApiClientError::not_found(format!("connection '{name}'")))
    }
}

fn not_found_as_none<T>(res: Result<T, ApiClientError>) -> Result<Option<T>, ApiClientError> {
    match res {
        Ok(v) => Ok(Some(v)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

#[async_trait]
impl StreamingApi for DecodableClient {
    async fn test_connection(&self) -> Result<(), ApiClientError> {
        self.send(self.request(Method::GET, "streams")).await?;
        Ok(())
    }

    async fn list_streams(&self) -> Result<Vec<StreamInfo>, ApiClientError> {
        self.list_all("streams").await
    }

    async fn get_stream(&self, name: &str) -> Result<Option<StreamInfo>, ApiClientError> {
        let Some(id) = not_found_as_none(self.stream_id(name).await)? else {
            return Ok(None);
        };
        not_found_as_none(self.get_json(&format!("streams/{id}")).await)
    }

    async fn create_stream(&self, request: &CreateStream) -> Result<StreamInfo, ApiClientError> {
        debug!("creating stream '{}'", request.name);
        self.post_json("streams", request).await
    }

    async fn rename_stream(&self, name: &str, new_name: &str) -> Result<(), ApiClientError> {
        let id = self.stream_id(name).await?;
        debug!("renaming stream '{name}' to '{new_name}'");
        self.patch(&format!("streams/{id}"), &json!({ "name": new_name }))
            .await
    }

    async fn clear_stream(&self, name: &str) -> Result<(), ApiClientError> {
        let id = self.stream_id(name).await?;
        debug!("clearing stream '{name}'");
        self.post_empty(&format!("streams/{id}/clear")).await
    }

    async fn delete_stream(&self, name: &str) -> Result<(), ApiClientError> {
        let id = self.stream_id(name).await?;
        debug!("deleting stream '{name}'");
        self.delete(&format!("streams/{id}")).await
    }

    async fn list_pipelines(&self) -> Result<Vec<PipelineInfo>, ApiClientError> {
        self.list_all("pipelines").await
    }

    async fn get_pipeline(&self, name: &str) -> Result<Option<PipelineInfo>, ApiClientError> {
        let Some(id) = not_found_as_none(self.pipeline_id(name).await)? else {
            return Ok(None);
        };
        not_found_as_none(self.get_json(&format!("pipelines/{id}")).await)
    }

    async fn create_pipeline(
        &self,
        request: &CreatePipeline,
    ) -> Result<PipelineInfo, ApiClientError> {
        debug!("creating pipeline '{}'", request.name);
        self.post_json("pipelines", request).await
    }

    async fn update_pipeline(
        &self,
        name: &str,
        update: &PipelineUpdate,
    ) -> Result<(), ApiClientError> {
        let id = self.pipeline_id(name).await?;
        debug!("updating pipeline '{name}'");
        self.patch(&format!("pipelines/{id}"), update).await
    }

    async fn activate_pipeline(&self, name: &str) -> Result<(), ApiClientError> {
        let id = self.pipeline_id(name).await?;
        debug!("activating pipeline '{name}'");
        self.post_empty(&format!("pipelines/{id}/activate")).await
    }

    async fn deactivate_pipeline(&self, name: &str) -> Result<(), ApiClientError> {
        let id = self.pipeline_id(name).await?;
        debug!("deactivating pipeline '{name}'");
        self.post_empty(&format!("pipelines/{id}/deactivate")).await
    }

    async fn delete_pipeline(&self, name: &str) -> Result<(), ApiClientError> {
        let id = self.pipeline_id(name).await?;
        debug!("deleting pipeline '{name}'");
        self.delete(&format!("pipelines/{id}")).await
    }

    async fn pipeline_sources(&self, name: &str) -> Result<Vec<String>, ApiClientError> {
        let id = self.pipeline_id(name).await?;
        let associated: Vec<AssociatedStream> =
            self.list_all(&format!("pipelines/{id}/streams")).await?;
        let names: HashMap<String, String> = self
            .list_streams()
            .await?
            .into_iter()
            .map(|s| (s.id, s.name))
            .collect();
        Ok(associated
            .into_iter()
            .filter(|s| s.is_source)
            .filter_map(|s| names.get(&s.stream_id).cloned())
            .collect())
    }

    async fn output_schema(&self, sql: &str) -> Result<StreamSchema, ApiClientError> {
        let out: OutputStream = self
            .post_json("pipelines/outputStream", &json!({ "sql": sql }))
            .await?;
        Ok(out.schema)
    }

    async fn list_connections(&self) -> Result<Vec<ConnectionInfo>, ApiClientError> {
        self.list_all("connections").await
    }

    async fn get_connection(&self, name: &str) -> Result<Option<ConnectionInfo>, ApiClientError> {
        Ok(self
            .list_connections()
            .await?
            .into_iter()
            .find(|c| c.name == name))
    }

    async fn create_connection(
        &self,
        request: &CreateConnection,
    ) -> Result<ConnectionInfo, ApiClientError> {
        debug!(
            "creating connection '{}' into stream '{}'",
            request.name, request.stream_name
        );
        let builder = self
            .request(Method::POST, "connections")
            .query(&[("stream_name", request.stream_name.as_str())])
            .json(request);
        Ok(self.send(builder).await?.json().await?)
    }

    async fn activate_connection(&self, name: &str) -> Result<(), ApiClientError> {
        let id = self.connection_id(name).await?;
        debug!("activating connection '{name}'");
        self.post_empty(&format!("connections/{id}/activate")).await
    }

    async fn deactivate_connection(&self, name: &str) -> Result<(), ApiClientError> {
        let id = self.connection_id(name).await?;
        debug!("deactivating connection '{name}'");
        self.post_empty(&format!("connections/{id}/deactivate"))
            .await
    }

    async fn delete_connection(&self, name: &str) -> Result<(), ApiClientError> {
        let id = self.connection_id(name).await?;
        debug!("deleting connection '{name}'");
        self.delete(&format!("connections/{id}")).await
    }

    async fn send_events(
        &self,
        connection: &str,
        events: &[Value],
    ) -> Result<u64, ApiClientError> {
        let id = self.connection_id(connection).await?;
        debug!("sending {} events to '{connection}'", events.len());
        let accepted: EventsAccepted = self
            .post_json(
                &format!("connections/{id}/events"),
                &json!({ "events": events }),
            )
            .await?;
        Ok(accepted.count)
    }

    async fn preview_dependencies(&self, sql: &str) -> Result<Vec<String>, ApiClientError> {
        let deps: PreviewDependencies = self
            .post_json("preview/dependencies", &json!({ "sql": sql }))
            .await?;
        Ok(deps.inputs.into_iter().map(|i| i.resource_name).collect())
    }

    async fn create_preview(
        &self,
        request: &PreviewRequest,
    ) -> Result<PreviewPage, ApiClientError> {
        self.post_json("preview", &request.body()).await
    }

    async fn run_preview(&self, id: &str, token: &str) -> Result<PreviewPage, ApiClientError> {
        let builder = self
            .request(Method::GET, &format!("preview/{id}"))
            .query(&[("token", token)]);
        Ok(self.send(builder).await?.json().await?)
    }
}
