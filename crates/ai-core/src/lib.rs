//! Deterministic, engine-agnostic AI kernel primitives.
//!
//! Fixed-point math, the host `Frame` boundary, the generational list arena, the typed
//! blackboard and function library, and the `Policy`/`Brain` lifecycle shared by the behavior
//! tree and GOAP crates.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod agent;
pub mod arena;
pub mod asset;
pub mod blackboard;
pub mod brain;
pub mod config;
pub mod error;
pub mod fixed;
pub mod frame;
pub mod function;
pub mod observe;
pub mod policy;
pub mod rng;
pub mod signal;
pub mod status;

pub use agent::{AgentId, EntityRef};
pub use arena::{ListArena, ListHandle};
pub use asset::{AssetDb, AssetId};
pub use blackboard::{
    BbKey, Blackboard, BlackboardInit, BlackboardTag, BlackboardType, BlackboardValue, ObserverId,
};
pub use brain::{tick_brains, Brain, BrainConfig};
pub use config::{AiConfig, BtConfig, GoapConfig};
pub use error::{AiError, BlackboardError, ListError};
pub use fixed::{FPVector2, FPVector3, FP};
pub use frame::{Frame, SimFrame};
pub use function::{AiFunction, CompareOp, FunctionContext, StatId};
pub use observe::{AiObserver, NullObserver};
pub use policy::{AgentCommand, Policy};
pub use rng::{DeterministicRng, SplitMix64};
pub use signal::{Signal, SignalBridge, SignalKind, SignalRoute};
pub use status::NodeStatus;
