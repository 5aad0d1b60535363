pub mod cache;
pub mod error;
pub mod operations;
pub mod preview;
mod reconcile;
pub mod relations;
pub mod remote;
pub mod runner;
pub mod seed;
pub mod summary;
pub mod types;

pub use cache::StateCache;
pub use error::ExecutorError;
pub use operations::{CleanupOptions, OperationSummary};
pub use runner::{materialization_for, project_relations, run_project, RunOptions};
pub use summary::{NodeResult, NodeStatus, RunSummary};
pub use types::{
    ExecutionSettings, Materialization, Materialized, Outcome, SeedFile, TableModel, TestQuery,
};

use common::config::components::global::DsfConfig;
use common::types::model::ModelDefinition;
use log::info;
use shared_clients::{DecodableClient, DecodableClientConfig, StreamingApi};
use std::sync::Arc;

/// Drives materialisations against one stream-processing account.
pub struct Executor {
    api: Arc<dyn StreamingApi>,
    settings: ExecutionSettings,
    cache: StateCache,
}

impl Executor {
    pub fn new(api: Arc<dyn StreamingApi>, settings: ExecutionSettings) -> Self {
        Self {
            api,
            settings,
            cache: StateCache::new(),
        }
    }

    /// Executor for the configured target. Fails before any remote call when
    /// credentials are missing.
    pub fn from_config(config: &DsfConfig) -> Result<Self, ExecutorError> {
        let token = config.access_token()?;
        let client =
            DecodableClient::new(DecodableClientConfig::from_target(&config.target, token))?;
        Ok(Self::new(
            Arc::new(client),
            ExecutionSettings::from_target(&config.target),
        ))
    }

    pub fn api(&self) -> &dyn StreamingApi {
        self.api.as_ref()
    }

    pub fn settings(&self) -> &ExecutionSettings {
        &self.settings
    }

    pub fn cache(&self) -> &StateCache {
        &self.cache
    }

    /// Materialise one resource, dispatching on its kind.
    pub async fn materialize(
        &self,
        materialization: &Materialization,
    ) -> Result<Materialized, ExecutorError> {
        let outcome = match materialization {
            Materialization::Table(model) => {
                self.reconcile(
                    &model.name,
                    &model.definition,
                    &model.column_types,
                    model.full_refresh,
                )
                .await?
            }
            Materialization::Seed(seed) => self.load_seed(seed).await?,
            Materialization::Test(test) => self.run_test(test).await?,
        };
        info!(
            "{} '{}': {outcome}",
            materialization.kind(),
            materialization.name()
        );
        Ok(Materialized {
            relations: vec![materialization.relation()],
            outcome,
        })
    }

    async fn run_test(&self, test: &TestQuery) -> Result<Outcome, ExecutorError> {
        let sql = replace_disallowed_operations(&test.sql);
        if self.settings.materialize_tests {
            let definition = ModelDefinition::new(sql);
            return self
                .reconcile(
                    &test.name,
                    &definition,
                    &Default::default(),
                    test.full_refresh,
                )
                .await;
        }
        let rows = self.preview(&sql).await?;
        Ok(if rows.is_empty() {
            Outcome::Passed
        } else {
            Outcome::Failed {
                failures: rows.len(),
            }
        })
    }
}

/// The service's SQL dialect has no `!=`.
pub fn replace_disallowed_operations(sql: &str) -> String {
    sql.replace("!=", "<>")
}
