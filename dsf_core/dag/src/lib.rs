pub mod error;
pub mod loader;
pub mod render;
pub mod types;

use crate::error::DagError;
use crate::render::{register_ref, SeenRefs};
use crate::types::{DagNode, DagResult, EmptyEdge};
use common::types::relation::ResourceKind;
use log::{debug, info};
use minijinja::Environment;
use petgraph::algo::{kosaraju_scc, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Instant;

pub use loader::load_project;

/// Dependency graph of every seed, model and test in a project.
///
/// Edges run from a referenced node to the node that references it, so a
/// topological walk visits upstream resources first.
#[derive(Debug, Default)]
pub struct ProjectDag {
    pub graph: DiGraph<DagNode, EmptyEdge>,
    pub ref_to_index: HashMap<String, NodeIndex>,
}

impl ProjectDag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, node: DagNode) -> DagResult<NodeIndex> {
        if self.ref_to_index.contains_key(&node.name) {
            return Err(DagError::duplicate_node(node.name));
        }
        let name = node.name.clone();
        let idx = self.graph.add_node(node);
        self.ref_to_index.insert(name, idx);
        Ok(idx)
    }

    /// Render every template, then wire up `ref()` edges and reject cycles.
    pub fn build(&mut self) -> DagResult<()> {
        let started = Instant::now();
        let resolved: Arc<HashMap<String, String>> = Arc::new(
            self.graph
                .node_weights()
                .map(|n| (n.name.clone(), n.resolved_name.clone()))
                .collect(),
        );

        let indices: Vec<NodeIndex> = self.graph.node_indices().collect();
        for idx in indices.iter().copied() {
            let Some(raw) = self.graph[idx].raw_sql.clone() else {
                continue;
            };
            let name = self.graph[idx].name.clone();

            let seen = SeenRefs::default();
            let mut env = Environment::new();
            register_ref(&mut env, resolved.clone(), seen.clone());
            let rendered = env
                .render_str(&raw, ())
                .map_err(|e| DagError::render(&name, e))?;

            let refs: BTreeSet<String> = seen.lock().clone();
            if let Some(missing) = refs.iter().find(|r| !resolved.contains_key(*r)) {
                return Err(DagError::ref_not_found(&name, missing));
            }
            debug!("rendered '{name}' with refs {refs:?}");

            let node = &mut self.graph[idx];
            node.sql = Some(rendered);
            node.refs = refs;
        }

        for idx in indices {
            let refs = self.graph[idx].refs.clone();
            for r in refs {
                if let Some(&from) = self.ref_to_index.get(&r) {
                    self.graph.update_edge(from, idx, EmptyEdge);
                }
            }
        }

        if petgraph::algo::is_cyclic_directed(&self.graph) {
            return Err(DagError::cycle_detected(self.cycle()));
        }

        info!(
            "ProjectDag::build completed in {:.3}s ({} nodes)",
            started.elapsed().as_secs_f64(),
            self.graph.node_count()
        );
        Ok(())
    }

    fn cycle(&self) -> Vec<String> {
        let mut names: Vec<String> = kosaraju_scc(&self.graph)
            .into_iter()
            .find(|scc| scc.len() > 1)
            .or_else(|| {
                // a node referencing itself
                self.graph
                    .node_indices()
                    .find(|&i| self.graph.contains_edge(i, i))
                    .map(|i| vec![i])
            })
            .unwrap_or_default()
            .into_iter()
            .map(|idx| self.graph[idx].name.clone())
            .collect();
        names.sort();
        names
    }

    pub fn get(&self, name: &str) -> Option<&DagNode> {
        self.ref_to_index.get(name).map(|&idx| &self.graph[idx])
    }

    pub fn toposort(&self) -> DagResult<Vec<NodeIndex>> {
        toposort(&self.graph, None).map_err(|_| DagError::cycle_detected(self.cycle()))
    }

    /// Nodes in execution order: seeds, then models, then tests, each phase
    /// keeping dependency order.
    ///
    /// `kinds` limits the phases; `select` limits to the named nodes.
    pub fn execution_order(
        &self,
        kinds: &[ResourceKind],
        select: Option<&BTreeSet<String>>,
    ) -> DagResult<Vec<&DagNode>> {
        let mut nodes: Vec<&DagNode> = self
            .toposort()?
            .into_iter()
            .map(|idx| &self.graph[idx])
            .filter(|n| kinds.contains(&n.kind))
            .filter(|n| select.map_or(true, |s| s.contains(&n.name)))
            .collect();
        nodes.sort_by_key(|n| phase(n.kind));
        Ok(nodes)
    }

    /// Nodes that reference `name`, directly or not.
    pub fn downstream(&self, name: &str) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        let Some(&start) = self.ref_to_index.get(name) else {
            return out;
        };
        let mut dfs = petgraph::visit::Dfs::new(&self.graph, start);
        while let Some(idx) = dfs.next(&self.graph) {
            if idx != start {
                out.insert(self.graph[idx].name.clone());
            }
        }
        out
    }
}

fn phase(kind: ResourceKind) -> u8 {
    match kind {
        ResourceKind::Seed => 0,
        ResourceKind::Table => 1,
        ResourceKind::Test => 2,
    }
}
