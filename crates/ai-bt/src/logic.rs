use std::any::Any;

use ai_core::{AiError, AiObserver, Blackboard, Frame, FunctionContext, ListHandle, NodeStatus, FP};

use crate::tree::NodeId;

/// Everything a leaf or service sees while it runs: the host frame, its entity, the entity's
/// blackboard, the node's scratch slots and (if the leaf created one) its node memory.
pub struct BtContext<'a, F: Frame> {
    pub frame: &'a mut F,
    pub entity: F::Entity,
    pub blackboard: &'a mut Blackboard,
    pub observer: &'a mut dyn AiObserver,
    pub(crate) node: NodeId,
    pub(crate) scratch: ListHandle<i64>,
    pub(crate) scratch_offset: u32,
    pub(crate) scratch_len: u32,
    pub(crate) memory: Option<&'a mut (dyn Any + 'static)>,
}

impl<'a, F: Frame> BtContext<'a, F> {
    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn time(&self) -> FP {
        self.frame.time()
    }

    pub fn tick(&self) -> u64 {
        self.frame.tick()
    }

    pub fn functions(&self) -> FunctionContext<'_, F> {
        FunctionContext::new(&*self.frame, self.entity, &*self.blackboard)
    }

    /// Reads scratch slot `slot` of this node. Out-of-range slots read as `0`.
    pub fn scratch(&self, slot: u32) -> i64 {
        if slot >= self.scratch_len {
            return 0;
        }
        self.frame
            .lists()
            .get(self.scratch)
            .ok()
            .and_then(|list| list.get((self.scratch_offset + slot) as usize).copied())
            .unwrap_or_default()
    }

    pub fn set_scratch(&mut self, slot: u32, value: i64) {
        if slot >= self.scratch_len {
            tracing::warn!(node = self.node.0, slot, "scratch slot out of range");
            return;
        }
        let index = (self.scratch_offset + slot) as usize;
        if let Some(entry) = self
            .frame
            .lists_mut()
            .get_mut(self.scratch)
            .ok()
            .and_then(|list| list.get_mut(index))
        {
            *entry = value;
        }
    }

    pub fn memory<T: Any>(&mut self) -> Option<&mut T> {
        self.memory.as_deref_mut()?.downcast_mut::<T>()
    }

    /// Node memory borrowed alongside the frame, blackboard and observer, for leaves whose
    /// memory drives another runtime.
    pub fn memory_with<T: Any>(
        &mut self,
    ) -> (Option<&mut T>, &mut F, &mut Blackboard, &mut dyn AiObserver) {
        let memory = self
            .memory
            .as_deref_mut()
            .and_then(|memory| memory.downcast_mut::<T>());
        (memory, &mut *self.frame, &mut *self.blackboard, &mut *self.observer)
    }
}

/// Game logic of a leaf node. Shared by every agent running the tree, so per-agent state goes
/// into scratch slots or node memory.
pub trait LeafLogic<F: Frame>: 'static {
    /// Number of `i64` scratch slots reserved for this leaf in each agent.
    fn scratch_slots(&self) -> u32 {
        0
    }

    /// Creates per-agent node memory at agent init.
    fn on_init(
        &self,
        _frame: &mut F,
        _entity: F::Entity,
        _blackboard: &mut Blackboard,
    ) -> Result<Option<Box<dyn Any>>, AiError> {
        Ok(None)
    }

    fn on_enter(&self, _cx: &mut BtContext<'_, F>) {}

    fn on_update(&self, cx: &mut BtContext<'_, F>) -> NodeStatus;

    /// Called on completion and on abort.
    fn on_exit(&self, _cx: &mut BtContext<'_, F>, _status: NodeStatus) {}

    /// Releases node memory created by `on_init` at agent teardown.
    fn on_free(
        &self,
        _frame: &mut F,
        _entity: F::Entity,
        _blackboard: &mut Blackboard,
        _memory: Box<dyn Any>,
    ) -> Result<(), AiError> {
        Ok(())
    }
}

/// Gate in front of a decorator's child. `check` only gets shared access, so evaluating it has
/// no side effects and may be repeated freely.
pub trait DecoratorLogic<F: Frame>: 'static {
    fn check(&self, cx: &FunctionContext<'_, F>) -> bool;

    /// Blackboard keys whose writes re-trigger `check` for abortable decorators.
    fn observed_keys(&self) -> Vec<u64> {
        Vec::new()
    }
}

/// Background ticker bound to a leaf's active duration.
pub trait ServiceLogic<F: Frame>: 'static {
    /// Time between updates. Zero updates every tick.
    fn interval(&self) -> FP {
        FP::ZERO
    }

    fn update(&self, cx: &mut BtContext<'_, F>);
}
