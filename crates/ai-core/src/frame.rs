use std::any::Any;
use std::collections::BTreeMap;

use crate::function::StatId;
use crate::rng::{derive_seed, mix64, SplitMix64};
use crate::{AgentId, ListArena, FP};

/// Host simulation boundary.
///
/// Everything the AI core consumes from the outside world goes through this trait: deterministic
/// time, a seed for per-entity random streams, list allocation, stat lookup and optional
/// component access.
pub trait Frame: 'static {
    type Entity: AgentId;

    fn tick(&self) -> u64;

    /// Simulation time. Never wall-clock.
    fn time(&self) -> FP;

    fn delta_time(&self) -> FP;

    fn seed(&self) -> u64;

    fn lists(&self) -> &ListArena;

    fn lists_mut(&mut self) -> &mut ListArena;

    /// Generator for `(tick, entity, stream)`. Two calls with the same inputs yield the same
    /// sequence.
    fn rng(&self, entity: Self::Entity, stream: u64) -> SplitMix64 {
        SplitMix64::new(derive_seed(
            self.seed() ^ mix64(self.tick()),
            entity.stable_id(),
            stream,
        ))
    }

    fn stat(&self, _entity: Self::Entity, _stat: StatId) -> Option<FP> {
        None
    }

    fn component<C: Any>(&self, _entity: Self::Entity) -> Option<&C> {
        None
    }

    fn component_mut<C: Any>(&mut self, _entity: Self::Entity) -> Option<&mut C> {
        None
    }
}

/// In-memory host used for headless simulation and tests.
#[derive(Debug)]
pub struct SimFrame {
    tick: u64,
    time: FP,
    delta: FP,
    seed: u64,
    lists: ListArena,
    stats: BTreeMap<(u64, StatId), FP>,
}

impl SimFrame {
    pub fn new(seed: u64, delta: FP) -> Self {
        Self {
            tick: 0,
            time: FP::ZERO,
            delta,
            seed,
            lists: ListArena::new(),
            stats: BTreeMap::new(),
        }
    }

    pub fn advance(&mut self) {
        self.tick = self.tick.saturating_add(1);
        self.time += self.delta;
    }

    pub fn set_stat(&mut self, entity: u64, stat: StatId, value: FP) {
        self.stats.insert((entity, stat), value);
    }
}

impl Default for SimFrame {
    fn default() -> Self {
        Self::new(0, FP::ONE)
    }
}

impl Frame for SimFrame {
    type Entity = u64;

    fn tick(&self) -> u64 {
        self.tick
    }

    fn time(&self) -> FP {
        self.time
    }

    fn delta_time(&self) -> FP {
        self.delta
    }

    fn seed(&self) -> u64 {
        self.seed
    }

    fn lists(&self) -> &ListArena {
        &self.lists
    }

    fn lists_mut(&mut self) -> &mut ListArena {
        &mut self.lists
    }

    fn stat(&self, entity: u64, stat: StatId) -> Option<FP> {
        self.stats.get(&(entity, stat)).copied()
    }
}
