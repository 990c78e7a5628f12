use std::fmt;

use serde::Serialize;

use super::roles::AgentRole;

/// One stop in the generation chain. The order of [`STAGES`] is the
/// execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Plan,
    Draft,
    Verify,
    Finalize,
}

pub const STAGES: [Stage; 4] = [Stage::Plan, Stage::Draft, Stage::Verify, Stage::Finalize];

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Plan => "plan",
            Self::Draft => "draft",
            Self::Verify => "verify",
            Self::Finalize => "finalize",
        }
    }

    /// Which role answers this stage.
    pub fn role(&self) -> AgentRole {
        match self {
            Self::Plan => AgentRole::Planner,
            Self::Draft | Self::Finalize => AgentRole::Writer,
            Self::Verify => AgentRole::Critic,
        }
    }

    /// Prior stages whose full output this stage is conditioned on.
    /// Finalize sees the plan and draft directly, not just the critique.
    pub fn dependencies(&self) -> &'static [Stage] {
        match self {
            Self::Plan => &[],
            Self::Draft => &[Stage::Plan],
            Self::Verify => &[Stage::Draft],
            Self::Finalize => &[Stage::Plan, Stage::Draft, Stage::Verify],
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw text returned by one stage. Immutable once produced.
#[derive(Debug, Clone)]
pub struct StageOutput {
    pub stage: Stage,
    pub text: String,
}
