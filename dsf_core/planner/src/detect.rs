use crate::plan::{PlanReason, ReconciliationPlan};
use crate::state::RemoteState;
use common::types::model::ModelDefinition;
use common::types::schema::Watermark;
use serde::Serialize;
use std::fmt;

/// A difference between the requested and the deployed definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Change {
    Sql,
    PrimaryKey,
    Watermark,
    SchemaHints,
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Change::Sql => "sql",
            Change::PrimaryKey => "primary key",
            Change::Watermark => "watermark",
            Change::SchemaHints => "schema hints",
        };
        f.write_str(s)
    }
}

/// Collapse whitespace runs to a single space and trim both ends.
pub fn normalize_sql(sql: &str) -> String {
    sql.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn normalize_watermark(raw: &str) -> String {
    match Watermark::parse(raw) {
        Some(w) => normalize_sql(&w.to_string()),
        None => normalize_sql(raw),
    }
}

/// Every way `requested` differs from what `remote` recorded.
pub fn detect_changes(requested: &ModelDefinition, remote: &RemoteState) -> Vec<Change> {
    let mut changes = Vec::new();

    let prior_sql = remote.prior_sql_text.as_deref().map(normalize_sql);
    if prior_sql.as_deref() != Some(normalize_sql(&requested.sql_text).as_str()) {
        changes.push(Change::Sql);
    }
    if requested.primary_key != remote.prior_primary_key {
        changes.push(Change::PrimaryKey);
    }
    let requested_wm = requested.watermark.as_deref().map(normalize_watermark);
    let prior_wm = remote.prior_watermark.as_deref().map(normalize_watermark);
    if requested_wm != prior_wm {
        changes.push(Change::Watermark);
    }
    if requested.output_stream_schema_hints != remote.prior_schema_hints {
        changes.push(Change::SchemaHints);
    }
    changes
}

/// Steps that converge the deployed pair to `requested`.
///
/// Never touches the network and never fails.
pub fn decide(
    requested: &ModelDefinition,
    remote: &RemoteState,
    force_full_refresh: bool,
) -> ReconciliationPlan {
    if !remote.exists {
        return ReconciliationPlan::create(PlanReason::Absent);
    }
    if force_full_refresh {
        return ReconciliationPlan::rebuild(PlanReason::FullRefresh);
    }
    let changes = detect_changes(requested, remote);
    if changes.is_empty() {
        ReconciliationPlan::noop()
    } else {
        ReconciliationPlan::rebuild(PlanReason::Changed(changes))
    }
}
