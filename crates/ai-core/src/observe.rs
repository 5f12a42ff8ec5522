use crate::NodeStatus;

/// Outward observation hooks for debuggers and analytics.
///
/// Passed into every tick call; never consulted by gameplay logic. All methods default to no-ops.
/// `entity` is the agent's stable id; `node`, `goal` and `action` are asset-local indices.
pub trait AiObserver {
    fn node_entered(&mut self, _tick: u64, _entity: u64, _node: u32) {}

    fn node_exited(&mut self, _tick: u64, _entity: u64, _node: u32, _status: NodeStatus) {}

    fn decorator_checked(&mut self, _tick: u64, _entity: u64, _node: u32, _passed: bool) {}

    fn tree_completed(&mut self, _tick: u64, _entity: u64, _status: NodeStatus) {}

    fn goal_selected(&mut self, _tick: u64, _entity: u64, _goal: u32) {}

    fn plan_found(&mut self, _tick: u64, _entity: u64, _goal: u32, _actions: &[u32]) {}

    fn no_plan(&mut self, _tick: u64, _entity: u64) {}

    fn action_activated(&mut self, _tick: u64, _entity: u64, _action: u32) {}

    fn action_deactivated(&mut self, _tick: u64, _entity: u64, _action: u32) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl AiObserver for NullObserver {}
