//! Umbrella crate that re-exports the `ai-*` building blocks.
//!
//! - `core`: fixed-point math, blackboard, typed functions, arena lists, `Brain`.
//! - `bt`: behavior trees (also enables `GoapLeaf` when `goap` is on).
//! - `goap`: goal-oriented action planning.
//! - `tools`: trace recording for replay checks.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

#[cfg(feature = "core")]
#[cfg_attr(docsrs, doc(cfg(feature = "core")))]
pub use ai_core as core;

#[cfg(feature = "tools")]
#[cfg_attr(docsrs, doc(cfg(feature = "tools")))]
pub use ai_tools as tools;

#[cfg(feature = "bt")]
#[cfg_attr(docsrs, doc(cfg(feature = "bt")))]
pub use ai_bt as bt;

#[cfg(feature = "goap")]
#[cfg_attr(docsrs, doc(cfg(feature = "goap")))]
pub use ai_goap as goap;

/// The types most hosts touch when wiring agents up.
#[cfg(feature = "core")]
pub mod prelude {
    pub use ai_core::{
        AgentCommand, AiConfig, AiFunction, AiObserver, BbKey, Blackboard, BlackboardInit, Brain,
        Frame, NodeStatus, Policy, Signal, SignalBridge, SignalKind, SignalRoute, SimFrame, FP,
    };

    #[cfg(feature = "bt")]
    pub use ai_bt::{BehaviorTree, BtPolicy, NodeRegistry, NodeSpec, TreeDefinition};

    #[cfg(feature = "goap")]
    pub use ai_goap::{GoapActionDef, GoapAsset, GoapFact, GoapGoalDef, GoapPolicy};

    #[cfg(all(feature = "bt", feature = "goap"))]
    pub use ai_goap::GoapLeaf;

    #[cfg(feature = "tools")]
    pub use ai_tools::{TraceLog, TraceRecorder};
}
