use std::sync::Arc;

use ai_core::{AgentCommand, AiError, AiObserver, Blackboard, BtConfig, Frame, NodeStatus, Policy};

use crate::agent::BtAgent;
use crate::tree::{BehaviorTree, NodeId};

/// Runs one behavior tree per entity.
pub struct BtPolicy<F>
where
    F: Frame,
{
    tree: Arc<BehaviorTree<F>>,
    config: BtConfig,
    agent: Option<BtAgent<F>>,
}

impl<F> BtPolicy<F>
where
    F: Frame,
{
    pub fn new(tree: Arc<BehaviorTree<F>>) -> Self {
        Self {
            tree,
            config: BtConfig::default(),
            agent: None,
        }
    }

    pub fn with_config(mut self, config: BtConfig) -> Self {
        self.config = config;
        self
    }

    pub fn agent(&self) -> Option<&BtAgent<F>> {
        self.agent.as_ref()
    }

    pub fn last_status(&self) -> NodeStatus {
        self.agent
            .as_ref()
            .map(BtAgent::last_status)
            .unwrap_or_default()
    }
}

impl<F> Policy<F> for BtPolicy<F>
where
    F: Frame,
{
    fn init(
        &mut self,
        frame: &mut F,
        entity: F::Entity,
        blackboard: &mut Blackboard,
    ) -> Result<(), AiError> {
        let agent = BtAgent::init(Arc::clone(&self.tree), self.config, frame, entity, blackboard)?;
        self.agent = Some(agent);
        Ok(())
    }

    fn tick(
        &mut self,
        frame: &mut F,
        entity: F::Entity,
        blackboard: &mut Blackboard,
        observer: &mut dyn AiObserver,
    ) {
        let Some(agent) = self.agent.as_mut() else {
            return;
        };
        if let Err(err) = agent.tick(frame, entity, blackboard, observer) {
            tracing::error!(tree = %self.tree.name(), error = %err, "behavior tree tick failed");
        }
    }

    fn command(
        &mut self,
        frame: &mut F,
        entity: F::Entity,
        blackboard: &mut Blackboard,
        command: AgentCommand,
    ) {
        let Some(agent) = self.agent.as_mut() else {
            return;
        };
        let result = match command {
            AgentCommand::ForceNode(node) => match u16::try_from(node) {
                Ok(node) => agent.force_cursor(frame, entity, blackboard, NodeId(node)),
                Err(_) => {
                    tracing::warn!(node, "forced node index out of range");
                    Ok(())
                }
            },
            // Restarting the tree re-enters every leaf, so planning leaves plan again.
            AgentCommand::ResetTree | AgentCommand::Replan => agent.reset(frame, entity, blackboard),
        };
        if let Err(err) = result {
            tracing::error!(tree = %self.tree.name(), error = %err, "behavior tree command failed");
        }
    }

    fn free(
        &mut self,
        frame: &mut F,
        entity: F::Entity,
        blackboard: &mut Blackboard,
    ) -> Result<(), AiError> {
        match self.agent.take() {
            Some(mut agent) => Ok(agent.free(frame, entity, blackboard)?),
            None => Ok(()),
        }
    }
}
