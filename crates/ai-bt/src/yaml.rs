//! YAML tree definitions.
//!
//! Nodes are declared by name and reference their children by name. Leaf, decorator and service
//! logic is looked up in a `NodeRegistry` by type name; each factory parses its own `params`.
//!
//! ```yaml
//! name: guard
//! root: main
//! nodes:
//!   main: { type: selector, children: [flee, idle] }
//!   flee: { type: decorator, logic: blackboard_condition, abort: lower_priority,
//!           params: { key: 1, value: !bool true }, child: run }
//!   run: { type: leaf, logic: wait, params: { seconds: 2.0 } }
//!   idle: { type: leaf, logic: succeed }
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use ai_core::{AiFunction, AssetId, BlackboardValue, CompareOp, Frame, FP};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::builtin::{
    BlackboardCondition, ConditionLeaf, Fail, FunctionCondition, SetBlackboard,
    SetBlackboardService, Succeed, Wait,
};
use crate::error::BtError;
use crate::logic::{DecoratorLogic, LeafLogic, ServiceLogic};
use crate::tree::{AbortMode, BehaviorTree, NodeSpec};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    Sequence,
    Selector,
    Decorator,
    Leaf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceDefinition {
    pub logic: String,
    #[serde(default)]
    pub params: serde_yaml::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDefinition {
    #[serde(rename = "type")]
    pub kind: NodeType,
    #[serde(default)]
    pub children: Vec<String>,
    #[serde(default)]
    pub child: Option<String>,
    #[serde(default)]
    pub dynamic: bool,
    #[serde(default)]
    pub abort: AbortMode,
    #[serde(default)]
    pub logic: Option<String>,
    #[serde(default)]
    pub params: serde_yaml::Value,
    #[serde(default)]
    pub services: Vec<ServiceDefinition>,
}

impl NodeDefinition {
    fn references(&self) -> Vec<&String> {
        match self.kind {
            NodeType::Sequence | NodeType::Selector => self.children.iter().collect(),
            NodeType::Decorator => self.child.iter().collect(),
            NodeType::Leaf => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeDefinition {
    pub name: String,
    pub root: String,
    pub nodes: BTreeMap<String, NodeDefinition>,
}

type Factory<T> = Box<dyn Fn(serde_yaml::Value) -> Result<T, serde_yaml::Error>>;

/// Maps logic type names to factories that parse node parameters.
pub struct NodeRegistry<F: Frame> {
    leaves: BTreeMap<String, Factory<Box<dyn LeafLogic<F>>>>,
    decorators: BTreeMap<String, Factory<Box<dyn DecoratorLogic<F>>>>,
    services: BTreeMap<String, Factory<Box<dyn ServiceLogic<F>>>>,
}

impl<F: Frame> Default for NodeRegistry<F> {
    fn default() -> Self {
        Self {
            leaves: BTreeMap::new(),
            decorators: BTreeMap::new(),
            services: BTreeMap::new(),
        }
    }
}

fn parse<P: DeserializeOwned>(params: serde_yaml::Value) -> Result<P, serde_yaml::Error> {
    let params = match params {
        serde_yaml::Value::Null => serde_yaml::Value::Mapping(serde_yaml::Mapping::new()),
        other => other,
    };
    serde_yaml::from_value(params)
}

impl<F: Frame> NodeRegistry<F> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_leaf<P, L>(&mut self, name: impl Into<String>, make: impl Fn(P) -> L + 'static)
    where
        P: DeserializeOwned,
        L: LeafLogic<F>,
    {
        self.leaves.insert(
            name.into(),
            Box::new(move |params| Ok(Box::new(make(parse(params)?)) as Box<dyn LeafLogic<F>>)),
        );
    }

    pub fn register_decorator<P, D>(&mut self, name: impl Into<String>, make: impl Fn(P) -> D + 'static)
    where
        P: DeserializeOwned,
        D: DecoratorLogic<F>,
    {
        self.decorators.insert(
            name.into(),
            Box::new(move |params| {
                Ok(Box::new(make(parse(params)?)) as Box<dyn DecoratorLogic<F>>)
            }),
        );
    }

    pub fn register_service<P, S>(&mut self, name: impl Into<String>, make: impl Fn(P) -> S + 'static)
    where
        P: DeserializeOwned,
        S: ServiceLogic<F>,
    {
        self.services.insert(
            name.into(),
            Box::new(move |params| Ok(Box::new(make(parse(params)?)) as Box<dyn ServiceLogic<F>>)),
        );
    }

    /// Registry preloaded with the built-in logic types.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register_leaf("wait", |p: WaitParams| match p.key {
            Some(key) => Wait::new(AiFunction::Read(key)),
            None => Wait::seconds(FP::from_f64(p.seconds)),
        });
        registry.register_leaf("succeed", |_: Empty| Succeed);
        registry.register_leaf("fail", |_: Empty| Fail);
        registry.register_leaf("set_blackboard", |p: WriteParams| {
            SetBlackboard::new(p.key, AiFunction::Const(p.value))
        });
        registry.register_leaf("condition", |p: ConditionParams| ConditionLeaf::new(p.condition));
        registry.register_decorator("blackboard_condition", |p: CompareParams| {
            BlackboardCondition::new(p.key, p.op, AiFunction::Const(p.value))
        });
        registry.register_decorator("condition", |p: ConditionParams| {
            FunctionCondition::new(p.condition)
        });
        registry.register_service("set_blackboard", |p: ServiceWriteParams| {
            SetBlackboardService::new(p.key, AiFunction::Const(p.value))
                .every(FP::from_f64(p.interval))
        });
        registry
    }
}

#[derive(Deserialize)]
struct Empty {}

#[derive(Deserialize)]
struct WaitParams {
    #[serde(default)]
    seconds: f64,
    #[serde(default)]
    key: Option<u64>,
}

#[derive(Deserialize)]
struct WriteParams {
    key: u64,
    value: BlackboardValue,
}

#[derive(Deserialize)]
struct ServiceWriteParams {
    key: u64,
    value: BlackboardValue,
    #[serde(default)]
    interval: f64,
}

#[derive(Deserialize)]
struct ConditionParams {
    condition: AiFunction,
}

fn default_op() -> CompareOp {
    CompareOp::Eq
}

#[derive(Deserialize)]
struct CompareParams {
    key: u64,
    #[serde(default = "default_op")]
    op: CompareOp,
    value: BlackboardValue,
}

impl TreeDefinition {
    pub fn from_yaml_str(content: &str) -> Result<Self, BtError> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn load(path: &Path) -> Result<Self, BtError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Checks that the definition describes a single tree: every reference resolves, no node has
    /// two parents, there are no cycles, every node is reachable and no composite or decorator is
    /// childless.
    pub fn validate(&self) -> Result<(), BtError> {
        if !self.nodes.contains_key(&self.root) {
            return Err(BtError::MissingRoot {
                root: self.root.clone(),
            });
        }

        let mut parents: BTreeMap<&String, &String> = BTreeMap::new();
        for (name, node) in &self.nodes {
            match node.kind {
                NodeType::Sequence | NodeType::Selector if node.children.is_empty() => {
                    return Err(BtError::EmptyComposite { node: name.clone() });
                }
                NodeType::Decorator if node.child.is_none() => {
                    return Err(BtError::DecoratorWithoutChild { node: name.clone() });
                }
                _ => {}
            }
            for child in node.references() {
                if !self.nodes.contains_key(child) {
                    return Err(BtError::UnknownNode {
                        node: child.clone(),
                        parent: name.clone(),
                    });
                }
                if let Some(first) = parents.insert(child, name) {
                    return Err(BtError::SharedNode {
                        node: child.clone(),
                        first: first.clone(),
                        second: name.clone(),
                    });
                }
            }
        }

        if parents.contains_key(&self.root) {
            return Err(BtError::Cycle {
                node: self.root.clone(),
            });
        }

        let mut reached = BTreeSet::new();
        let mut stack = vec![&self.root];
        while let Some(name) = stack.pop() {
            if !reached.insert(name) {
                continue;
            }
            if let Some(node) = self.nodes.get(name) {
                stack.extend(node.references());
            }
        }

        for name in self.nodes.keys() {
            if reached.contains(name) {
                continue;
            }
            // With one parent per node, an unreached node either hangs off a cycle or is orphaned.
            let mut seen = BTreeSet::new();
            let mut current = name;
            while let Some(&parent) = parents.get(current) {
                if !seen.insert(parent) {
                    return Err(BtError::Cycle { node: name.clone() });
                }
                current = parent;
            }
            return Err(BtError::Unreachable { node: name.clone() });
        }
        Ok(())
    }

    /// Validates the definition and compiles it with logic from `registry`.
    pub fn build<F: Frame>(&self, id: AssetId, registry: &NodeRegistry<F>) -> Result<BehaviorTree<F>, BtError> {
        let result = self
            .validate()
            .and_then(|()| self.spec(&self.root, registry))
            .and_then(|root| BehaviorTree::build(id, self.name.clone(), root));
        if let Err(err) = &result {
            tracing::error!(tree = %self.name, error = %err, "tree definition rejected");
        }
        result
    }

    fn spec<F: Frame>(&self, name: &String, registry: &NodeRegistry<F>) -> Result<NodeSpec<F>, BtError> {
        let node = self.nodes.get(name).ok_or_else(|| BtError::UnknownNode {
            node: name.clone(),
            parent: self.root.clone(),
        })?;
        let logic_name = || node.logic.clone().unwrap_or_default();
        let invalid = |source| BtError::InvalidParams {
            node: name.clone(),
            source,
        };

        match node.kind {
            NodeType::Sequence | NodeType::Selector => {
                let children = node
                    .children
                    .iter()
                    .map(|child| self.spec(child, registry))
                    .collect::<Result<Vec<_>, _>>()?;
                let spec = if node.kind == NodeType::Sequence {
                    NodeSpec::sequence(name.clone(), children)
                } else {
                    NodeSpec::selector(name.clone(), children)
                };
                Ok(if node.dynamic { spec.dynamic() } else { spec })
            }
            NodeType::Decorator => {
                let factory = registry
                    .decorators
                    .get(&logic_name())
                    .ok_or_else(|| BtError::UnknownLogic {
                        node: name.clone(),
                        logic: logic_name(),
                    })?;
                let logic = factory(node.params.clone()).map_err(invalid)?;
                let child_name = node.child.as_ref().ok_or_else(|| BtError::DecoratorWithoutChild {
                    node: name.clone(),
                })?;
                let child = self.spec(child_name, registry)?;
                Ok(NodeSpec::Decorator {
                    name: name.clone(),
                    abort: node.abort,
                    logic,
                    child: Box::new(child),
                })
            }
            NodeType::Leaf => {
                let factory = registry.leaves.get(&logic_name()).ok_or_else(|| BtError::UnknownLogic {
                    node: name.clone(),
                    logic: logic_name(),
                })?;
                let logic = factory(node.params.clone()).map_err(invalid)?;
                let mut services = Vec::with_capacity(node.services.len());
                for service in &node.services {
                    let factory = registry.services.get(&service.logic).ok_or_else(|| {
                        BtError::UnknownLogic {
                            node: name.clone(),
                            logic: service.logic.clone(),
                        }
                    })?;
                    services.push(factory(service.params.clone()).map_err(invalid)?);
                }
                Ok(NodeSpec::Leaf {
                    name: name.clone(),
                    logic,
                    services,
                })
            }
        }
    }
}
