#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

use ai_core::{AiObserver, NodeStatus};

/// A small, allocation-friendly trace event.
///
/// Dumb data, so it can be recorded during simulation and compared or rendered later. `a` and `b`
/// carry tag-specific payloads (node index, status code, goal index, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TraceEvent {
    pub tick: u64,
    pub entity: u64,
    pub tag: Cow<'static, str>,
    pub a: u64,
    pub b: u64,
}

impl TraceEvent {
    pub fn new(tick: u64, tag: impl Into<Cow<'static, str>>) -> Self {
        Self {
            tick,
            entity: 0,
            tag: tag.into(),
            a: 0,
            b: 0,
        }
    }

    pub fn with_entity(mut self, entity: u64) -> Self {
        self.entity = entity;
        self
    }

    pub fn with_a(mut self, a: u64) -> Self {
        self.a = a;
        self
    }

    pub fn with_b(mut self, b: u64) -> Self {
        self.b = b;
        self
    }
}

pub trait TraceSink {
    fn emit(&mut self, event: TraceEvent);
}

#[derive(Debug, Default)]
pub struct NullTraceSink;

impl TraceSink for NullTraceSink {
    fn emit(&mut self, _event: TraceEvent) {}
}

#[derive(Debug, Default)]
pub struct VecTraceSink {
    pub events: Vec<TraceEvent>,
}

impl TraceSink for VecTraceSink {
    fn emit(&mut self, event: TraceEvent) {
        self.events.push(event);
    }
}

/// Forwards every event to the `tracing` facade at trace level.
#[derive(Debug, Default)]
pub struct TracingSink;

impl TraceSink for TracingSink {
    fn emit(&mut self, event: TraceEvent) {
        tracing::trace!(
            tick = event.tick,
            entity = event.entity,
            a = event.a,
            b = event.b,
            "{}",
            event.tag
        );
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TraceLog {
    pub events: Vec<TraceEvent>,
}

impl TraceLog {
    pub fn push(&mut self, event: TraceEvent) {
        self.events.push(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Events carrying `tag`, in recording order.
    pub fn with_tag<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a TraceEvent> + 'a {
        self.events.iter().filter(move |e| e.tag == tag)
    }
}

impl TraceSink for TraceLog {
    fn emit(&mut self, event: TraceEvent) {
        self.push(event);
    }
}

/// `AiObserver` that turns every hook into a `TraceEvent`.
///
/// Two runs with the same seed and inputs must produce identical recordings; comparing them is
/// the replay check.
#[derive(Debug, Default)]
pub struct TraceRecorder<S: TraceSink = TraceLog> {
    sink: S,
}

impl<S: TraceSink> TraceRecorder<S> {
    pub fn new(sink: S) -> Self {
        Self { sink }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    fn record(&mut self, tick: u64, entity: u64, tag: &'static str, a: u64, b: u64) {
        self.sink.emit(
            TraceEvent::new(tick, tag)
                .with_entity(entity)
                .with_a(a)
                .with_b(b),
        );
    }
}

impl<S: TraceSink> AiObserver for TraceRecorder<S> {
    fn node_entered(&mut self, tick: u64, entity: u64, node: u32) {
        self.record(tick, entity, "bt.node.enter", node as u64, 0);
    }

    fn node_exited(&mut self, tick: u64, entity: u64, node: u32, status: NodeStatus) {
        self.record(tick, entity, "bt.node.exit", node as u64, status.code());
    }

    fn decorator_checked(&mut self, tick: u64, entity: u64, node: u32, passed: bool) {
        self.record(tick, entity, "bt.decorator.check", node as u64, passed as u64);
    }

    fn tree_completed(&mut self, tick: u64, entity: u64, status: NodeStatus) {
        self.record(tick, entity, "bt.tree.complete", status.code(), 0);
    }

    fn goal_selected(&mut self, tick: u64, entity: u64, goal: u32) {
        self.record(tick, entity, "goap.goal.selected", goal as u64, 0);
    }

    fn plan_found(&mut self, tick: u64, entity: u64, goal: u32, actions: &[u32]) {
        self.record(tick, entity, "goap.plan.found", goal as u64, actions.len() as u64);
        for (i, action) in actions.iter().enumerate() {
            self.record(tick, entity, "goap.plan.step", i as u64, *action as u64);
        }
    }

    fn no_plan(&mut self, tick: u64, entity: u64) {
        self.record(tick, entity, "goap.plan.none", 0, 0);
    }

    fn action_activated(&mut self, tick: u64, entity: u64, action: u32) {
        self.record(tick, entity, "goap.action.activate", action as u64, 0);
    }

    fn action_deactivated(&mut self, tick: u64, entity: u64, action: u32) {
        self.record(tick, entity, "goap.action.deactivate", action as u64, 0);
    }
}
