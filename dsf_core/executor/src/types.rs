use common::config::components::profile::{PreviewStart, TargetProfile};
use common::types::model::ModelDefinition;
use common::types::relation::{Relation, ResourceKind};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Per-target switches that shape how resources are materialised.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionSettings {
    pub materialize_tests: bool,
    pub preview_start: PreviewStart,
    pub preview_timeout: Duration,
}

impl Default for ExecutionSettings {
    fn default() -> Self {
        Self {
            materialize_tests: false,
            preview_start: PreviewStart::default(),
            preview_timeout: Duration::from_millis(
                common::config::components::profile::DEFAULT_PREVIEW_TIMEOUT_MS,
            ),
        }
    }
}

impl ExecutionSettings {
    pub fn from_target(target: &TargetProfile) -> Self {
        Self {
            materialize_tests: target.materialize_tests,
            preview_start: target.preview_start,
            preview_timeout: Duration::from_millis(target.preview_timeout_ms),
        }
    }
}

/// A model kept live as a stream fed by a pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct TableModel {
    /// Remote name, namespace already applied.
    pub name: String,
    pub definition: ModelDefinition,
    /// Column types declared in the model config, checked against the derived schema.
    pub column_types: BTreeMap<String, String>,
    pub full_refresh: bool,
}

/// A CSV file loaded into a stream through a REST connection.
#[derive(Debug, Clone, PartialEq)]
pub struct SeedFile {
    pub name: String,
    pub path: PathBuf,
    pub column_types: BTreeMap<String, String>,
    pub full_refresh: bool,
}

/// An assertion query; any row it returns is a failure.
#[derive(Debug, Clone, PartialEq)]
pub struct TestQuery {
    pub name: String,
    pub sql: String,
    pub full_refresh: bool,
}

/// One unit of work, tagged by resource kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Materialization {
    Table(TableModel),
    Seed(SeedFile),
    Test(TestQuery),
}

impl Materialization {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Materialization::Table(_) => ResourceKind::Table,
            Materialization::Seed(_) => ResourceKind::Seed,
            Materialization::Test(_) => ResourceKind::Test,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Materialization::Table(t) => &t.name,
            Materialization::Seed(s) => &s.name,
            Materialization::Test(t) => &t.name,
        }
    }

    pub fn relation(&self) -> Relation {
        Relation::new(self.name(), self.kind())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Created,
    Rebuilt,
    Unchanged,
    Seeded { rows: u64 },
    Passed,
    Failed { failures: usize },
}

impl Outcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failed { .. })
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Created => f.write_str("created"),
            Outcome::Rebuilt => f.write_str("rebuilt"),
            Outcome::Unchanged => f.write_str("unchanged"),
            Outcome::Seeded { rows } => write!(f, "seeded {rows} rows"),
            Outcome::Passed => f.write_str("pass"),
            Outcome::Failed { failures } => write!(f, "fail ({failures} failing rows)"),
        }
    }
}

/// What one materialisation did, and the relations it now owns.
#[derive(Debug, Clone, PartialEq)]
pub struct Materialized {
    pub relations: Vec<Relation>,
    pub outcome: Outcome,
}
