//! Built-in leaves, decorators and services.

use ai_core::{AiFunction, CompareOp, Frame, FunctionContext, NodeStatus, FP};

use crate::logic::{BtContext, DecoratorLogic, LeafLogic, ServiceLogic};

/// Runs for a duration of simulation time, then succeeds.
#[derive(Debug, Clone)]
pub struct Wait {
    pub duration: AiFunction,
}

impl Wait {
    pub fn new(duration: AiFunction) -> Self {
        Self { duration }
    }

    pub fn seconds(duration: FP) -> Self {
        Self::new(AiFunction::fp(duration))
    }
}

impl<F: Frame> LeafLogic<F> for Wait {
    fn scratch_slots(&self) -> u32 {
        1
    }

    fn on_enter(&self, cx: &mut BtContext<'_, F>) {
        let duration = self.duration.resolve_fp(&cx.functions());
        let end = cx.time() + duration;
        cx.set_scratch(0, end.raw());
    }

    fn on_update(&self, cx: &mut BtContext<'_, F>) -> NodeStatus {
        if cx.time() >= FP::from_raw(cx.scratch(0)) {
            NodeStatus::Success
        } else {
            NodeStatus::Running
        }
    }
}

/// Writes the resolved value to a blackboard key. Fails when the write is rejected.
#[derive(Debug, Clone)]
pub struct SetBlackboard {
    pub key: u64,
    pub value: AiFunction,
}

impl SetBlackboard {
    pub fn new(key: u64, value: AiFunction) -> Self {
        Self { key, value }
    }
}

impl<F: Frame> LeafLogic<F> for SetBlackboard {
    fn on_update(&self, cx: &mut BtContext<'_, F>) -> NodeStatus {
        let Some(value) = self.value.resolve(&cx.functions()) else {
            return NodeStatus::Failure;
        };
        match cx.blackboard.set_value(self.key, value) {
            Ok(_) => NodeStatus::Success,
            Err(err) => {
                tracing::warn!(key = self.key, error = %err, "blackboard write rejected");
                NodeStatus::Failure
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Succeed;

impl<F: Frame> LeafLogic<F> for Succeed {
    fn on_update(&self, _cx: &mut BtContext<'_, F>) -> NodeStatus {
        NodeStatus::Success
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Fail;

impl<F: Frame> LeafLogic<F> for Fail {
    fn on_update(&self, _cx: &mut BtContext<'_, F>) -> NodeStatus {
        NodeStatus::Failure
    }
}

/// Leaf that succeeds when its condition resolves to `true`.
#[derive(Debug, Clone)]
pub struct ConditionLeaf {
    pub condition: AiFunction,
}

impl ConditionLeaf {
    pub fn new(condition: AiFunction) -> Self {
        Self { condition }
    }
}

impl<F: Frame> LeafLogic<F> for ConditionLeaf {
    fn on_update(&self, cx: &mut BtContext<'_, F>) -> NodeStatus {
        if self.condition.resolve_bool(&cx.functions()) {
            NodeStatus::Success
        } else {
            NodeStatus::Failure
        }
    }
}

/// Compares a blackboard key against a value and observes that key.
#[derive(Debug, Clone)]
pub struct BlackboardCondition {
    pub key: u64,
    pub op: CompareOp,
    pub value: AiFunction,
}

impl BlackboardCondition {
    pub fn new(key: u64, op: CompareOp, value: AiFunction) -> Self {
        Self { key, op, value }
    }

    pub fn is_true(key: u64) -> Self {
        Self::new(key, CompareOp::Eq, AiFunction::bool(true))
    }

    pub fn is_false(key: u64) -> Self {
        Self::new(key, CompareOp::Eq, AiFunction::bool(false))
    }
}

impl<F: Frame> DecoratorLogic<F> for BlackboardCondition {
    fn check(&self, cx: &FunctionContext<'_, F>) -> bool {
        AiFunction::compare(self.op, AiFunction::Read(self.key), self.value.clone()).resolve_bool(cx)
    }

    fn observed_keys(&self) -> Vec<u64> {
        let mut keys = self.value.read_keys();
        keys.push(self.key);
        keys.sort_unstable();
        keys.dedup();
        keys
    }
}

/// Decorator gated by an arbitrary boolean function; observes every key the function reads.
#[derive(Debug, Clone)]
pub struct FunctionCondition {
    pub condition: AiFunction,
}

impl FunctionCondition {
    pub fn new(condition: AiFunction) -> Self {
        Self { condition }
    }
}

impl<F: Frame> DecoratorLogic<F> for FunctionCondition {
    fn check(&self, cx: &FunctionContext<'_, F>) -> bool {
        self.condition.resolve_bool(cx)
    }

    fn observed_keys(&self) -> Vec<u64> {
        self.condition.read_keys()
    }
}

/// Decorator backed by a closure, for conditions that need host state.
pub struct FnCondition<C> {
    cond: C,
    keys: Vec<u64>,
}

impl<C> FnCondition<C> {
    pub fn new(cond: C) -> Self {
        Self {
            cond,
            keys: Vec::new(),
        }
    }

    pub fn observing(mut self, keys: impl IntoIterator<Item = u64>) -> Self {
        self.keys.extend(keys);
        self
    }
}

impl<F, C> DecoratorLogic<F> for FnCondition<C>
where
    F: Frame,
    C: Fn(&FunctionContext<'_, F>) -> bool + 'static,
{
    fn check(&self, cx: &FunctionContext<'_, F>) -> bool {
        (self.cond)(cx)
    }

    fn observed_keys(&self) -> Vec<u64> {
        self.keys.clone()
    }
}

/// Service that keeps a blackboard key up to date while its leaf runs.
#[derive(Debug, Clone)]
pub struct SetBlackboardService {
    pub key: u64,
    pub value: AiFunction,
    pub interval: FP,
}

impl SetBlackboardService {
    pub fn new(key: u64, value: AiFunction) -> Self {
        Self {
            key,
            value,
            interval: FP::ZERO,
        }
    }

    pub fn every(mut self, interval: FP) -> Self {
        self.interval = interval;
        self
    }
}

impl<F: Frame> ServiceLogic<F> for SetBlackboardService {
    fn interval(&self) -> FP {
        self.interval
    }

    fn update(&self, cx: &mut BtContext<'_, F>) {
        let Some(value) = self.value.resolve(&cx.functions()) else {
            return;
        };
        if let Err(err) = cx.blackboard.set_value(self.key, value) {
            tracing::warn!(key = self.key, error = %err, "service write rejected");
        }
    }
}
