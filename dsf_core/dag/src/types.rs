use crate::error::DagError;
use common::types::relation::ResourceKind;
use std::collections::BTreeSet;
use std::path::PathBuf;

pub type DagResult<T> = Result<T, DagError>;

#[derive(Debug, Clone, Copy)]
pub struct EmptyEdge;

/// A seed, model or test in the project graph.
#[derive(Debug, Clone, PartialEq)]
pub struct DagNode {
    /// Name used in `ref()`.
    pub name: String,
    /// Remote resource name after alias and namespace are applied.
    pub resolved_name: String,
    pub kind: ResourceKind,
    pub path: Option<PathBuf>,
    /// Template source, absent for seeds.
    pub raw_sql: Option<String>,
    /// Filled in by `ProjectDag::build`.
    pub sql: Option<String>,
    pub refs: BTreeSet<String>,
}

impl DagNode {
    pub fn seed(name: &str, resolved_name: &str, path: Option<PathBuf>) -> Self {
        Self {
            name: name.to_string(),
            resolved_name: resolved_name.to_string(),
            kind: ResourceKind::Seed,
            path,
            raw_sql: None,
            sql: None,
            refs: BTreeSet::new(),
        }
    }

    pub fn query(name: &str, resolved_name: &str, kind: ResourceKind, raw_sql: &str) -> Self {
        Self {
            name: name.to_string(),
            resolved_name: resolved_name.to_string(),
            kind,
            path: None,
            raw_sql: Some(raw_sql.to_string()),
            sql: None,
            refs: BTreeSet::new(),
        }
    }

    pub fn with_path(mut self, path: PathBuf) -> Self {
        self.path = Some(path);
        self
    }

    /// Rendered SQL, or an empty string for nodes that carry none.
    pub fn sql(&self) -> &str {
        self.sql.as_deref().unwrap_or_default()
    }
}
