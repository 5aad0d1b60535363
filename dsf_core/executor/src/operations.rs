//! Bulk maintenance run outside the build cycle.
//!
//! Every operation accepts an optional list of names to restrict it to and a
//! `skip_errors` switch that turns per-resource failures into warnings.

use crate::error::ExecutorError;
use crate::Executor;
use common::types::relation::{Relation, ResourceKind};
use log::{info, warn};
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OperationSummary {
    /// Resources the operation acted on.
    pub processed: Vec<String>,
    /// Resources with nothing to do, or requested names that do not exist.
    pub skipped: Vec<String>,
    /// Failures downgraded by `skip_errors`, with their message.
    pub failed: Vec<(String, String)>,
}

impl OperationSummary {
    fn settle(
        &mut self,
        operation: &str,
        name: &str,
        result: Result<bool, ExecutorError>,
        skip_errors: bool,
    ) -> Result<(), ExecutorError> {
        match result {
            Ok(true) => self.processed.push(name.to_string()),
            Ok(false) => self.skipped.push(name.to_string()),
            Err(e) if skip_errors => {
                warn!("{operation} `{name}` failed: {e}");
                self.failed.push((name.to_string(), e.to_string()));
            }
            Err(e) => return Err(e),
        }
        Ok(())
    }

    fn missing(&mut self, requested: Option<&[String]>, present: &BTreeSet<String>) {
        for name in requested.unwrap_or_default() {
            if !present.contains(name) {
                warn!("`{name}` does not exist, skipping");
                self.skipped.push(name.clone());
            }
        }
    }
}

impl fmt::Display for OperationSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} processed, {} skipped, {} failed",
            self.processed.len(),
            self.skipped.len(),
            self.failed.len()
        )
    }
}

/// Which project resources `cleanup` removes.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanupOptions {
    pub names: Option<Vec<String>>,
    pub models: bool,
    pub seeds: bool,
    pub tests: bool,
    pub skip_errors: bool,
}

impl Default for CleanupOptions {
    fn default() -> Self {
        Self {
            names: None,
            models: true,
            seeds: true,
            tests: true,
            skip_errors: false,
        }
    }
}

impl CleanupOptions {
    fn includes(&self, relation: &Relation) -> bool {
        let kind = match relation.kind {
            ResourceKind::Table => self.models,
            ResourceKind::Seed => self.seeds,
            ResourceKind::Test => self.tests,
        };
        kind && selected(relation.name(), self.names.as_deref())
    }
}

fn selected(name: &str, names: Option<&[String]>) -> bool {
    names.map_or(true, |names| names.iter().any(|n| n == name))
}

impl Executor {
    /// Deactivate running pipelines.
    pub async fn stop_pipelines(
        &self,
        names: Option<&[String]>,
        skip_errors: bool,
    ) -> Result<OperationSummary, ExecutorError> {
        let mut summary = OperationSummary::default();
        let pipelines = self.api().list_pipelines().await?;
        let present: BTreeSet<String> = pipelines.iter().map(|p| p.name.clone()).collect();
        for pipeline in pipelines.iter().filter(|p| selected(&p.name, names)) {
            let result = if pipeline.is_running() {
                self.api()
                    .deactivate_pipeline(&pipeline.name)
                    .await
                    .map(|_| true)
                    .map_err(ExecutorError::from)
            } else {
                Ok(false)
            };
            summary.settle("Stopping pipeline", &pipeline.name, result, skip_errors)?;
        }
        summary.missing(names, &present);
        info!("stop_pipelines: {summary}");
        Ok(summary)
    }

    /// Stop and delete pipelines.
    pub async fn delete_pipelines(
        &self,
        names: Option<&[String]>,
        skip_errors: bool,
    ) -> Result<OperationSummary, ExecutorError> {
        let mut summary = OperationSummary::default();
        let pipelines = self.api().list_pipelines().await?;
        let present: BTreeSet<String> = pipelines.iter().map(|p| p.name.clone()).collect();
        for pipeline in pipelines.iter().filter(|p| selected(&p.name, names)) {
            let result = self.drop_pipeline(&pipeline.name).await;
            summary.settle("Deleting pipeline", &pipeline.name, result, skip_errors)?;
        }
        summary.missing(names, &present);
        info!("delete_pipelines: {summary}");
        Ok(summary)
    }

    /// Delete streams. Streams still used by a pipeline or connection are
    /// refused by the service.
    pub async fn delete_streams(
        &self,
        names: Option<&[String]>,
        skip_errors: bool,
    ) -> Result<OperationSummary, ExecutorError> {
        let mut summary = OperationSummary::default();
        let streams = self.api().list_streams().await?;
        let present: BTreeSet<String> = streams.iter().map(|s| s.name.clone()).collect();
        for stream in streams.iter().filter(|s| selected(&s.name, names)) {
            let result = self
                .api()
                .delete_stream(&stream.name)
                .await
                .map(|_| true)
                .map_err(ExecutorError::from);
            self.cache.invalidate(&stream.name);
            summary.settle("Deleting stream", &stream.name, result, skip_errors)?;
        }
        summary.missing(names, &present);
        info!("delete_streams: {summary}");
        Ok(summary)
    }

    /// Remove the given project resources. All pipelines and connections go
    /// first, then the streams, so no stream is deleted while something
    /// selected still reads it.
    pub async fn cleanup(
        &self,
        relations: &[Relation],
        options: &CleanupOptions,
    ) -> Result<OperationSummary, ExecutorError> {
        let mut summary = OperationSummary::default();
        let targets: Vec<&Relation> = relations.iter().filter(|r| options.includes(r)).collect();

        let mut failed = BTreeSet::new();
        for relation in &targets {
            let name = relation.name();
            let mut result = self.drop_pipeline(name).await;
            if relation.kind == ResourceKind::Seed && result.is_ok() {
                result = self.drop_connection(name).await;
            }
            if let Err(e) = result {
                if !options.skip_errors {
                    return Err(e);
                }
                warn!("Cleaning up `{name}` failed: {e}");
                summary.failed.push((name.to_string(), e.to_string()));
                failed.insert(name.to_string());
            }
        }

        for relation in targets {
            let name = relation.name();
            if failed.contains(name) {
                continue;
            }
            let result = match self.api().get_stream(name).await {
                Ok(Some(_)) => self
                    .api()
                    .delete_stream(name)
                    .await
                    .map(|_| true)
                    .map_err(ExecutorError::from),
                Ok(None) => Ok(false),
                Err(e) => Err(e.into()),
            };
            self.cache.invalidate(name);
            summary.settle("Deleting stream", name, result, options.skip_errors)?;
        }

        let present: BTreeSet<String> = relations.iter().map(|r| r.name().to_string()).collect();
        summary.missing(options.names.as_deref(), &present);
        info!("cleanup: {summary}");
        Ok(summary)
    }
}
