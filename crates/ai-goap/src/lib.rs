//! Goal-oriented action planning on top of `ai-core`.
//!
//! A `GoapAsset` declares goals (a target fact state and a relevancy function) and actions
//! (conditions, effects and a cost function). `GoapPlanner` runs a bounded backward search from
//! a goal's target, and `GoapAgent` executes the resulting plan for one entity, either through
//! `GoapPolicy` or, with the `bt` feature, as a behavior-tree leaf.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod agent;
pub mod asset;
#[cfg(feature = "bt")]
#[cfg_attr(docsrs, doc(cfg(feature = "bt")))]
pub mod bt;
pub mod error;
pub mod planner;
pub mod policy;
pub mod state;

pub use agent::GoapAgent;
pub use asset::{
    GoapActionDef, GoapActionLogic, GoapActionStatus, GoapAsset, GoapAssetBuilder, GoapContext,
    GoapGoalDef, InstantAction,
};
#[cfg(feature = "bt")]
pub use bt::GoapLeaf;
pub use error::GoapError;
pub use planner::{GoapPlanner, Plan, PlanOutcome};
pub use policy::GoapPolicy;
pub use state::{GoapFact, GoapState};
