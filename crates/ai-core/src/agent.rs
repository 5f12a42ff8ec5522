use core::fmt::Debug;

use serde::{Deserialize, Serialize};

/// Stable identifier for an agent.
///
/// Deterministic simulation requires:
/// - stable ordering (`Ord`)
/// - a stable numeric ID (`stable_id`) for seeding and logs
pub trait AgentId: Copy + Ord + Eq + Debug + 'static {
    fn stable_id(self) -> u64;
}

impl AgentId for u64 {
    fn stable_id(self) -> u64 {
        self
    }
}

impl AgentId for u32 {
    fn stable_id(self) -> u64 {
        self as u64
    }
}

impl AgentId for usize {
    fn stable_id(self) -> u64 {
        self as u64
    }
}

/// Entity reference as stored on a blackboard. `0` is the null entity.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct EntityRef(pub u64);

impl EntityRef {
    pub const NONE: EntityRef = EntityRef(0);

    pub fn of(agent: impl AgentId) -> Self {
        Self(agent.stable_id())
    }

    pub fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl AgentId for EntityRef {
    fn stable_id(self) -> u64 {
        self.0
    }
}
