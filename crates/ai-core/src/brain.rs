use serde::{Deserialize, Serialize};

use crate::{
    AgentCommand, AgentId, AiError, AiObserver, Blackboard, Frame, Policy, Signal, SignalBridge,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrainConfig {
    #[serde(default = "default_think_every_ticks")]
    pub think_every_ticks: u32,
    #[serde(default)]
    pub think_offset_ticks: u32,
}

fn default_think_every_ticks() -> u32 {
    1
}

impl Default for BrainConfig {
    fn default() -> Self {
        Self {
            think_every_ticks: 1,
            think_offset_ticks: 0,
        }
    }
}

impl BrainConfig {
    pub fn deterministic(agent: impl AgentId, think_every_ticks: u32) -> Self {
        let every = think_every_ticks.max(1);
        let offset = (agent.stable_id() % (every as u64)) as u32;
        Self {
            think_every_ticks: every,
            think_offset_ticks: offset,
        }
    }

    pub fn should_think(&self, tick: u64) -> bool {
        let every = self.think_every_ticks.max(1) as u64;
        ((tick + (self.think_offset_ticks as u64)) % every) == 0
    }
}

/// One AI-bearing entity: its blackboard and the policy that owns its arena lists.
pub struct Brain<F>
where
    F: Frame,
{
    entity: F::Entity,
    pub config: BrainConfig,
    pub blackboard: Blackboard,
    policy: Box<dyn Policy<F>>,
}

impl<F> Brain<F>
where
    F: Frame,
{
    /// Initializes `policy` for `entity`. Fails (allocating nothing) when the policy's assets do
    /// not fit the entity.
    pub fn spawn(
        frame: &mut F,
        entity: F::Entity,
        mut blackboard: Blackboard,
        mut policy: Box<dyn Policy<F>>,
    ) -> Result<Self, AiError> {
        if let Err(err) = policy.init(frame, entity, &mut blackboard) {
            tracing::error!(entity = entity.stable_id(), error = %err, "agent refused to start");
            return Err(err);
        }
        tracing::debug!(entity = entity.stable_id(), tick = frame.tick(), "agent spawned");
        Ok(Self {
            entity,
            config: BrainConfig::default(),
            blackboard,
            policy,
        })
    }

    pub fn with_config(mut self, config: BrainConfig) -> Self {
        self.config = config;
        self
    }

    pub fn entity(&self) -> F::Entity {
        self.entity
    }

    pub fn tick(&mut self, frame: &mut F, observer: &mut dyn AiObserver) {
        if !self.config.should_think(frame.tick()) {
            return;
        }
        self.policy
            .tick(frame, self.entity, &mut self.blackboard, observer);
    }

    /// Routes `signal` through `bridge` and delivers the resulting commands to the policy.
    pub fn signal(&mut self, frame: &mut F, bridge: &SignalBridge, signal: &Signal) {
        for command in bridge.dispatch(signal, &mut self.blackboard) {
            self.command(frame, command);
        }
    }

    pub fn command(&mut self, frame: &mut F, command: AgentCommand) {
        tracing::debug!(entity = self.entity.stable_id(), ?command, "agent command");
        self.policy
            .command(frame, self.entity, &mut self.blackboard, command);
    }

    /// Tears the agent down, releasing every list the policy allocated.
    pub fn despawn(mut self, frame: &mut F) -> Result<(), AiError> {
        let result = self
            .policy
            .free(frame, self.entity, &mut self.blackboard);
        match &result {
            Ok(()) => {
                tracing::debug!(entity = self.entity.stable_id(), tick = frame.tick(), "agent despawned")
            }
            Err(err) => {
                tracing::error!(entity = self.entity.stable_id(), error = %err, "agent teardown failed")
            }
        }
        result
    }
}

/// Ticks every brain in stable-id order.
pub fn tick_brains<F>(frame: &mut F, brains: &mut [Brain<F>], observer: &mut dyn AiObserver)
where
    F: Frame,
{
    brains.sort_by_key(|b| b.entity.stable_id());
    for brain in brains.iter_mut() {
        brain.tick(frame, observer);
    }
}
