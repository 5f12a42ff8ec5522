use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::blackboard::BlackboardValue;
use crate::{AgentCommand, Blackboard};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SignalKind(pub u32);

/// A typed notification raised by game logic (stun applied, pickup collected, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signal {
    pub kind: SignalKind,
    #[serde(default)]
    pub payload: Option<BlackboardValue>,
}

impl Signal {
    pub fn new(kind: SignalKind) -> Self {
        Self {
            kind,
            payload: None,
        }
    }

    pub fn with_payload(mut self, payload: BlackboardValue) -> Self {
        self.payload = Some(payload);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalRoute {
    Write { key: u64, value: BlackboardValue },
    WritePayload { key: u64 },
    Command(AgentCommand),
}

/// Routes signals into blackboard writes and agent commands.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SignalBridge {
    #[serde(default)]
    routes: BTreeMap<SignalKind, Vec<SignalRoute>>,
}

impl SignalBridge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, kind: SignalKind, route: SignalRoute) -> Self {
        self.add_route(kind, route);
        self
    }

    pub fn add_route(&mut self, kind: SignalKind, route: SignalRoute) {
        self.routes.entry(kind).or_default().push(route);
    }

    pub fn routes(&self, kind: SignalKind) -> &[SignalRoute] {
        self.routes.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Applies every route for `signal.kind` in declaration order. Writes land on the blackboard
    /// immediately (queueing observer reactions); commands are returned for the caller to deliver.
    pub fn dispatch(&self, signal: &Signal, blackboard: &mut Blackboard) -> Vec<AgentCommand> {
        let mut commands = Vec::new();
        for route in self.routes(signal.kind) {
            match *route {
                SignalRoute::Write { key, value } => write(blackboard, signal.kind, key, value),
                SignalRoute::WritePayload { key } => match signal.payload {
                    Some(value) => write(blackboard, signal.kind, key, value),
                    None => {
                        tracing::warn!(signal = signal.kind.0, key, "signal has no payload to write");
                    }
                },
                SignalRoute::Command(command) => commands.push(command),
            }
        }
        commands
    }
}

fn write(blackboard: &mut Blackboard, kind: SignalKind, key: u64, value: BlackboardValue) {
    if let Err(err) = blackboard.set_value(key, value) {
        tracing::warn!(signal = kind.0, key, error = %err, "signal write rejected");
    }
}
