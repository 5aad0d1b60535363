use crate::types::model::ResourceIdentity;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What a node materialises into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    /// Stream fed by a pipeline.
    Table,
    /// Stream fed by a REST connection.
    Seed,
    /// Assertion query, previewed or materialised like a table.
    Test,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 3] = [ResourceKind::Seed, ResourceKind::Table, ResourceKind::Test];
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ResourceKind::Table => "table",
            ResourceKind::Seed => "seed",
            ResourceKind::Test => "test",
        };
        f.write_str(s)
    }
}

/// Handle to a materialised remote object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Relation {
    pub identity: ResourceIdentity,
    pub kind: ResourceKind,
}

impl Relation {
    pub fn new(name: impl Into<String>, kind: ResourceKind) -> Self {
        Self {
            identity: ResourceIdentity::new(name),
            kind,
        }
    }

    pub fn name(&self) -> &str {
        &self.identity.name
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.identity, self.kind)
    }
}
