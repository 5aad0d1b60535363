use crate::error::ExecutorError;
use crate::summary::{NodeStatus, RunSummary};
use crate::types::{Materialization, SeedFile, TableModel, TestQuery};
use crate::Executor;
use common::config::DsfConfig;
use common::types::model::ModelDefinition;
use common::types::relation::{Relation, ResourceKind};
use dag::types::DagNode;
use dag::ProjectDag;
use log::{error, info, warn};
use std::collections::{BTreeMap, BTreeSet};

/// What a run covers.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOptions {
    pub kinds: Vec<ResourceKind>,
    /// Node names to restrict the run to.
    pub select: Option<BTreeSet<String>>,
    pub full_refresh: bool,
}

impl RunOptions {
    pub fn new(kinds: &[ResourceKind]) -> Self {
        Self {
            kinds: kinds.to_vec(),
            select: None,
            full_refresh: false,
        }
    }

    pub fn with_full_refresh(mut self, full_refresh: bool) -> Self {
        self.full_refresh = full_refresh;
        self
    }

    pub fn with_select(mut self, select: Option<BTreeSet<String>>) -> Self {
        self.select = select;
        self
    }
}

/// Turn a graph node into its unit of work. A per-resource `full_refresh`
/// setting overrides the run-wide flag.
pub fn materialization_for(
    node: &DagNode,
    config: &DsfConfig,
    full_refresh: bool,
) -> Result<Materialization, ExecutorError> {
    let name = node.resolved_name.clone();
    match node.kind {
        ResourceKind::Seed => {
            let path = node.path.clone().ok_or_else(|| {
                ExecutorError::config(format!("Seed '{}' has no file", node.name))
            })?;
            let seed_config = config.seeds.get(&node.name);
            Ok(Materialization::Seed(SeedFile {
                name,
                path,
                column_types: seed_config
                    .map(|s| s.column_types.clone())
                    .unwrap_or_default(),
                full_refresh: seed_config
                    .and_then(|s| s.full_refresh)
                    .unwrap_or(full_refresh),
            }))
        }
        ResourceKind::Table => {
            let model_config = config.models.get(&node.name);
            let definition = match model_config {
                Some(model) => model.definition(node.sql()),
                None => ModelDefinition::new(node.sql()),
            };
            let column_types: BTreeMap<String, String> = model_config
                .map(|model| {
                    model
                        .columns
                        .iter()
                        .filter_map(|c| Some((c.name.clone(), c.data_type.clone()?)))
                        .collect()
                })
                .unwrap_or_default();
            Ok(Materialization::Table(TableModel {
                name,
                definition,
                column_types,
                full_refresh: model_config
                    .and_then(|m| m.config.full_refresh)
                    .unwrap_or(full_refresh),
            }))
        }
        ResourceKind::Test => Ok(Materialization::Test(TestQuery {
            name,
            sql: node.sql().to_string(),
            full_refresh,
        })),
    }
}

/// Materialise the selected nodes in dependency order. A failed node does
/// not stop the run; everything downstream of it is skipped.
pub async fn run_project(
    executor: &Executor,
    dag: &ProjectDag,
    config: &DsfConfig,
    options: &RunOptions,
) -> Result<RunSummary, ExecutorError> {
    let full_refresh = options.full_refresh || config.project.full_refresh;
    let order = dag.execution_order(&options.kinds, options.select.as_ref())?;
    info!("Running {} nodes", order.len());

    let mut summary = RunSummary::default();
    let mut blocked: BTreeSet<String> = BTreeSet::new();
    for node in order {
        let relation = Relation::new(node.resolved_name.clone(), node.kind);
        if blocked.contains(&node.name) {
            warn!("Skipping {} '{}': an upstream node failed", node.kind, node.name);
            summary.record(relation, NodeStatus::Skipped);
            continue;
        }

        let result = match materialization_for(node, config, full_refresh) {
            Ok(materialization) => executor.materialize(&materialization).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(materialized) => summary.record(relation, NodeStatus::Done(materialized.outcome)),
            Err(e) => {
                error!("{} '{}' failed: {e}", node.kind, node.name);
                blocked.extend(dag.downstream(&node.name));
                summary.record(relation, NodeStatus::Error(e.to_string()));
            }
        }
    }
    info!("{summary}");
    Ok(summary)
}

/// Every resource the project defines, under its remote name.
pub fn project_relations(dag: &ProjectDag) -> Result<Vec<Relation>, ExecutorError> {
    Ok(dag
        .execution_order(&ResourceKind::ALL, None)?
        .into_iter()
        .map(|n| Relation::new(n.resolved_name.clone(), n.kind))
        .collect())
}
