use serde::{Deserialize, Serialize};

/// Per-agent, per-node execution status.
///
/// `Inactive -> Running -> {Success | Failure | Abort} -> Inactive`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    #[default]
    Inactive,
    Running,
    Success,
    Failure,
    Abort,
}

impl NodeStatus {
    pub fn is_running(self) -> bool {
        matches!(self, NodeStatus::Running)
    }

    pub fn is_finished(self) -> bool {
        matches!(
            self,
            NodeStatus::Success | NodeStatus::Failure | NodeStatus::Abort
        )
    }

    /// Stable numeric code used in trace events.
    pub fn code(self) -> u64 {
        match self {
            NodeStatus::Inactive => 0,
            NodeStatus::Running => 1,
            NodeStatus::Success => 2,
            NodeStatus::Failure => 3,
            NodeStatus::Abort => 4,
        }
    }
}
