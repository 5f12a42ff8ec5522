use serde::{Deserialize, Serialize};

use crate::{AiError, AiObserver, Blackboard, Frame};

/// Forced transitions delivered to a running policy from outside (signal bridge, external state
/// machines).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentCommand {
    /// Move the behavior-tree cursor to the node with this index.
    ForceNode(u32),
    /// Abort everything and restart from the root next tick.
    ResetTree,
    /// Drop the current plan and replan next tick.
    Replan,
}

/// Decision strategy owned by a `Brain`.
///
/// `init` and `free` are strictly paired: every list allocated in `init` is released in `free`.
/// An `init` that returns `Err` must leave nothing allocated.
pub trait Policy<F>: 'static
where
    F: Frame,
{
    fn init(
        &mut self,
        frame: &mut F,
        entity: F::Entity,
        blackboard: &mut Blackboard,
    ) -> Result<(), AiError>;

    fn tick(
        &mut self,
        frame: &mut F,
        entity: F::Entity,
        blackboard: &mut Blackboard,
        observer: &mut dyn AiObserver,
    );

    fn command(
        &mut self,
        _frame: &mut F,
        _entity: F::Entity,
        _blackboard: &mut Blackboard,
        _command: AgentCommand,
    ) {
    }

    fn free(
        &mut self,
        frame: &mut F,
        entity: F::Entity,
        blackboard: &mut Blackboard,
    ) -> Result<(), AiError>;
}
