use std::sync::Arc;

use ai_core::{
    AgentCommand, AiError, AiObserver, Blackboard, Frame, GoapConfig, NodeStatus, NullObserver,
    Policy,
};

use crate::agent::GoapAgent;
use crate::asset::GoapAsset;

/// Drives one entity directly from a GOAP asset, without a behavior tree around it.
pub struct GoapPolicy<F>
where
    F: Frame,
{
    asset: Arc<GoapAsset<F>>,
    config: GoapConfig,
    agent: Option<GoapAgent<F>>,
    last: NodeStatus,
}

impl<F> GoapPolicy<F>
where
    F: Frame,
{
    pub fn new(asset: Arc<GoapAsset<F>>) -> Self {
        Self {
            asset,
            config: GoapConfig::default(),
            agent: None,
            last: NodeStatus::Inactive,
        }
    }

    pub fn with_config(mut self, config: GoapConfig) -> Self {
        self.config = config;
        self
    }

    pub fn agent(&self) -> Option<&GoapAgent<F>> {
        self.agent.as_ref()
    }

    pub fn last_status(&self) -> NodeStatus {
        self.last
    }
}

impl<F> Policy<F> for GoapPolicy<F>
where
    F: Frame,
{
    fn init(
        &mut self,
        frame: &mut F,
        entity: F::Entity,
        blackboard: &mut Blackboard,
    ) -> Result<(), AiError> {
        let agent = GoapAgent::init(Arc::clone(&self.asset), self.config, frame, entity, blackboard)?;
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
        match agent.update(frame, entity, blackboard, observer) {
            Ok(status) => self.last = status,
            Err(err) => {
                tracing::error!(asset = %self.asset.name(), error = %err, "goap update failed");
                self.last = NodeStatus::Failure;
            }
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
        match command {
            AgentCommand::Replan | AgentCommand::ResetTree => {
                let mut null = NullObserver;
                agent.stop(frame, entity, blackboard, &mut null);
            }
            AgentCommand::ForceNode(node) => {
                tracing::trace!(node, "goap policy has no tree cursor to force");
            }
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
