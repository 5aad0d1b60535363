use crate::detect::Change;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStep {
    DropPipeline,
    DropStream,
    CreateStream,
    CreatePipeline,
    ActivatePipeline,
    Noop,
}

impl fmt::Display for PlanStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PlanStep::DropPipeline => "drop_pipeline",
            PlanStep::DropStream => "drop_stream",
            PlanStep::CreateStream => "create_stream",
            PlanStep::CreatePipeline => "create_pipeline",
            PlanStep::ActivatePipeline => "activate_pipeline",
            PlanStep::Noop => "noop",
        };
        f.write_str(s)
    }
}

/// Why a plan looks the way it does; carried for logging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanReason {
    Absent,
    FullRefresh,
    Changed(Vec<Change>),
    Unchanged,
}

impl fmt::Display for PlanReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanReason::Absent => f.write_str("not deployed"),
            PlanReason::FullRefresh => f.write_str("full refresh requested"),
            PlanReason::Unchanged => f.write_str("up to date"),
            PlanReason::Changed(changes) => {
                let names: Vec<String> = changes.iter().map(ToString::to_string).collect();
                write!(f, "changed: {}", names.join(", "))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconciliationPlan {
    steps: Vec<PlanStep>,
    reason: PlanReason,
}

impl ReconciliationPlan {
    pub(crate) fn create(reason: PlanReason) -> Self {
        Self {
            steps: vec![
                PlanStep::CreateStream,
                PlanStep::CreatePipeline,
                PlanStep::ActivatePipeline,
            ],
            reason,
        }
    }

    /// Pipeline goes before the stream it writes into.
    pub(crate) fn rebuild(reason: PlanReason) -> Self {
        Self {
            steps: vec![
                PlanStep::DropPipeline,
                PlanStep::DropStream,
                PlanStep::CreateStream,
                PlanStep::CreatePipeline,
                PlanStep::ActivatePipeline,
            ],
            reason,
        }
    }

    pub(crate) fn noop() -> Self {
        Self {
            steps: vec![PlanStep::Noop],
            reason: PlanReason::Unchanged,
        }
    }

    pub fn steps(&self) -> &[PlanStep] {
        &self.steps
    }

    pub fn reason(&self) -> &PlanReason {
        &self.reason
    }

    pub fn is_noop(&self) -> bool {
        self.steps == [PlanStep::Noop]
    }

    pub fn is_rebuild(&self) -> bool {
        self.steps.first() == Some(&PlanStep::DropPipeline)
    }
}

impl fmt::Display for ReconciliationPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let steps: Vec<String> = self.steps.iter().map(ToString::to_string).collect();
        write!(f, "[{}] ({})", steps.join(" -> "), self.reason)
    }
}
