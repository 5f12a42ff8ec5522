//! Runs a GOAP asset as a behavior-tree leaf.

use std::any::Any;
use std::sync::Arc;

use ai_bt::{BtContext, LeafLogic};
use ai_core::{AiError, Blackboard, Frame, GoapConfig, NodeStatus};

use crate::agent::GoapAgent;
use crate::asset::GoapAsset;

/// Leaf whose node memory is a `GoapAgent`.
///
/// - Entering the leaf forces a fresh plan.
/// - The leaf succeeds when the selected goal is reached and fails when nothing can be planned
///   or an action fails.
/// - Exiting the leaf (completion or abort) deactivates the running action.
pub struct GoapLeaf<F: Frame> {
    asset: Arc<GoapAsset<F>>,
    config: GoapConfig,
}

impl<F: Frame> GoapLeaf<F> {
    pub fn new(asset: Arc<GoapAsset<F>>) -> Self {
        Self {
            asset,
            config: GoapConfig::default(),
        }
    }

    pub fn with_config(mut self, config: GoapConfig) -> Self {
        self.config = config;
        self
    }
}

impl<F: Frame> LeafLogic<F> for GoapLeaf<F> {
    fn on_init(
        &self,
        frame: &mut F,
        entity: F::Entity,
        blackboard: &mut Blackboard,
    ) -> Result<Option<Box<dyn Any>>, AiError> {
        let agent = GoapAgent::init(Arc::clone(&self.asset), self.config, frame, entity, blackboard)?;
        Ok(Some(Box::new(agent)))
    }

    fn on_enter(&self, cx: &mut BtContext<'_, F>) {
        if let Some(agent) = cx.memory::<GoapAgent<F>>() {
            agent.request_replan();
        }
    }

    fn on_update(&self, cx: &mut BtContext<'_, F>) -> NodeStatus {
        let entity = cx.entity;
        let (agent, frame, blackboard, observer) = cx.memory_with::<GoapAgent<F>>();
        let Some(agent) = agent else {
            tracing::error!(asset = %self.asset.name(), "goap leaf without agent memory");
            return NodeStatus::Failure;
        };
        match agent.update(frame, entity, blackboard, observer) {
            Ok(status) => status,
            Err(err) => {
                tracing::error!(asset = %self.asset.name(), error = %err, "goap leaf update failed");
                NodeStatus::Failure
            }
        }
    }

    fn on_exit(&self, cx: &mut BtContext<'_, F>, _status: NodeStatus) {
        let entity = cx.entity;
        let (agent, frame, blackboard, observer) = cx.memory_with::<GoapAgent<F>>();
        if let Some(agent) = agent {
            agent.stop(frame, entity, blackboard, observer);
        }
    }

    fn on_free(
        &self,
        frame: &mut F,
        entity: F::Entity,
        blackboard: &mut Blackboard,
        memory: Box<dyn Any>,
    ) -> Result<(), AiError> {
        match memory.downcast::<GoapAgent<F>>() {
            Ok(mut agent) => Ok(agent.free(frame, entity, blackboard)?),
            Err(_) => Err(AiError::invalid_asset(
                self.asset.name(),
                "goap leaf memory has an unexpected type",
            )),
        }
    }
}
