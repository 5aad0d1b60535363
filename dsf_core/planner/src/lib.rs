//! Change detection for stream / pipeline pairs.
//!
//! Everything here is pure: [`decide`] compares a requested model definition
//! with what is deployed and returns the steps needed to converge. Executing
//! those steps is the executor's job.

pub mod detect;
pub mod naming;
pub mod plan;
pub mod state;

pub use detect::{decide, detect_changes, normalize_sql, Change};
pub use naming::resolve_name;
pub use plan::{PlanReason, PlanStep, ReconciliationPlan};
pub use state::{PipelineStatus, RemoteState};
