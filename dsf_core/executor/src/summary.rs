use crate::types::Outcome;
use common::types::relation::{Relation, ResourceKind};
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum NodeStatus {
    Done(Outcome),
    Error(String),
    /// Not attempted because something it depends on failed.
    Skipped,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodeResult {
    pub relation: Relation,
    pub status: NodeStatus,
}

/// Result of one run, returned to the caller rather than kept in globals.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub results: Vec<NodeResult>,
}

impl RunSummary {
    pub fn record(&mut self, relation: Relation, status: NodeStatus) {
        self.results.push(NodeResult { relation, status });
    }

    pub fn count_kind(&self, kind: ResourceKind) -> usize {
        self.results
            .iter()
            .filter(|r| r.relation.kind == kind)
            .count()
    }

    pub fn count(&self, predicate: impl Fn(&NodeStatus) -> bool) -> usize {
        self.results.iter().filter(|r| predicate(&r.status)).count()
    }

    pub fn errors(&self) -> usize {
        self.count(|s| matches!(s, NodeStatus::Error(_)))
    }

    pub fn test_failures(&self) -> usize {
        self.count(|s| matches!(s, NodeStatus::Done(o) if o.is_failure()))
    }

    pub fn skipped(&self) -> usize {
        self.count(|s| matches!(s, NodeStatus::Skipped))
    }

    /// True when nothing errored and no test failed.
    pub fn is_success(&self) -> bool {
        self.errors() == 0 && self.test_failures() == 0
    }

    pub fn status_of(&self, name: &str) -> Option<&NodeStatus> {
        self.results
            .iter()
            .find(|r| r.relation.name() == name)
            .map(|r| &r.status)
    }
}

fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("{count} {noun}")
    } else {
        format!("{count} {noun}s")
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ok = self.count(|s| matches!(s, NodeStatus::Done(o) if !o.is_failure()));
        write!(
            f,
            "Completed {}, {}, {}. OK={ok} FAIL={} ERROR={} SKIP={}",
            plural(self.count_kind(ResourceKind::Seed), "seed"),
            plural(self.count_kind(ResourceKind::Table), "model"),
            plural(self.count_kind(ResourceKind::Test), "test"),
            self.test_failures(),
            self.errors(),
            self.skipped()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_and_rendering() {
        let mut summary = RunSummary::default();
        summary.record(
            Relation::new("countries", ResourceKind::Seed),
            NodeStatus::Done(Outcome::Seeded { rows: 3 }),
        );
        summary.record(
            Relation::new("orders", ResourceKind::Table),
            NodeStatus::Error("boom".to_string()),
        );
        summary.record(
            Relation::new("orders_test", ResourceKind::Test),
            NodeStatus::Skipped,
        );

        assert!(!summary.is_success());
        assert_eq!(summary.status_of("orders_test"), Some(&NodeStatus::Skipped));
        assert_eq!(
            summary.to_string(),
            "Completed 1 seed, 1 model, 1 test. OK=1 FAIL=0 ERROR=1 SKIP=1"
        );
    }
}
