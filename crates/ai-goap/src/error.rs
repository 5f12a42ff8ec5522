use ai_core::{AiError, BlackboardError, ListError};
use thiserror::Error;

use crate::GoapFact;

#[derive(Debug, Error)]
pub enum GoapError {
    #[error("goap asset `{asset}` declares no goals")]
    NoGoals { asset: String },
    #[error("duplicate {kind} `{name}`")]
    Duplicate { kind: &'static str, name: String },
    #[error("default goal `{name}` is not declared")]
    UnknownDefaultGoal { name: String },
    #[error("goal `{goal}` has an empty target state")]
    EmptyTarget { goal: String },
    #[error("action `{action}` has no effects")]
    NoEffects { action: String },
    #[error("asset has {count} actions, more than the supported {max}")]
    TooManyActions { count: usize, max: usize },
    #[error("fact {} is bound to blackboard key {key}, which is not a registered bool or int", fact.0)]
    InvalidBinding { fact: GoapFact, key: u64 },
    #[error(transparent)]
    List(#[from] ListError),
    #[error(transparent)]
    Blackboard(#[from] BlackboardError),
    #[error(transparent)]
    Ai(#[from] AiError),
}

impl From<GoapError> for AiError {
    fn from(err: GoapError) -> Self {
        match err {
            GoapError::List(err) => AiError::List(err),
            GoapError::Blackboard(err) => AiError::Blackboard(err),
            GoapError::Ai(err) => err,
            other => AiError::invalid_asset("goap", other.to_string()),
        }
    }
}
