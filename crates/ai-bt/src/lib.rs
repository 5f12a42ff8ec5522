//! Behavior Tree runtime built on `ai-core`.
//!
//! Trees are immutable assets (`BehaviorTree`) flattened in pre-order; every entity running a
//! tree owns a `BtAgent` whose statuses, service timers and scratch values live in arena lists.
//! Each tick the engine processes decorator aborts, re-validates dynamic composites, ticks
//! services and then walks the tree from its cursor.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod agent;
pub mod builtin;
pub mod error;
pub mod logic;
pub mod policy;
pub mod tree;
pub mod yaml;

pub use agent::BtAgent;
pub use builtin::{
    BlackboardCondition, ConditionLeaf, Fail, FnCondition, FunctionCondition, SetBlackboard,
    SetBlackboardService, Succeed, Wait,
};
pub use error::BtError;
pub use logic::{BtContext, DecoratorLogic, LeafLogic, ServiceLogic};
pub use policy::BtPolicy;
pub use tree::{
    AbortMode, BehaviorTree, BtNode, CompositeData, CompositeMode, DecoratorData, LeafData, NodeId,
    NodeKind, NodeSpec, ServiceSlot,
};
pub use yaml::{NodeDefinition, NodeRegistry, NodeType, ServiceDefinition, TreeDefinition};
