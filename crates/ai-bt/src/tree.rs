//! Immutable behavior-tree assets.
//!
//! A tree is flattened in pre-order: node `0` is the root, every subtree occupies a contiguous
//! id range, and a smaller id means a higher priority. Per-agent state never lives here.

use ai_core::{AssetId, Frame};
use serde::{Deserialize, Serialize};

use crate::error::BtError;
use crate::logic::{DecoratorLogic, LeafLogic, ServiceLogic};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct NodeId(pub u16);

impl NodeId {
    pub const ROOT: NodeId = NodeId(0);

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompositeMode {
    /// Runs children in order; fails on the first failure.
    Sequence,
    /// Runs children in order; succeeds on the first success.
    Selector,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbortMode {
    #[default]
    None,
    #[serde(rename = "self")]
    SelfOnly,
    LowerPriority,
    Both,
}

impl AbortMode {
    pub fn aborts_self(self) -> bool {
        matches!(self, AbortMode::SelfOnly | AbortMode::Both)
    }

    pub fn aborts_lower_priority(self) -> bool {
        matches!(self, AbortMode::LowerPriority | AbortMode::Both)
    }
}

#[derive(Debug, Clone)]
pub struct CompositeData {
    pub mode: CompositeMode,
    pub children: Vec<NodeId>,
    pub dynamic: bool,
    pub(crate) scratch_slot: u32,
}

pub struct DecoratorData<F: Frame> {
    pub child: NodeId,
    pub abort: AbortMode,
    pub logic: Box<dyn DecoratorLogic<F>>,
}

pub struct LeafData<F: Frame> {
    pub logic: Box<dyn LeafLogic<F>>,
    pub services: Vec<ServiceSlot>,
}

/// Index of a service in the tree-wide service table (and in each agent's wake-time list).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ServiceSlot(pub u16);

pub enum NodeKind<F: Frame> {
    Root { child: NodeId },
    Composite(CompositeData),
    Decorator(DecoratorData<F>),
    Leaf(LeafData<F>),
}

pub struct BtNode<F: Frame> {
    pub name: String,
    pub parent: Option<NodeId>,
    pub index_in_parent: u16,
    /// One past the last node id of this node's subtree.
    pub subtree_end: u16,
    pub(crate) scratch_offset: u32,
    pub(crate) scratch_len: u32,
    pub kind: NodeKind<F>,
}

pub(crate) struct ServiceDef<F: Frame> {
    pub(crate) leaf: NodeId,
    pub(crate) logic: Box<dyn ServiceLogic<F>>,
}

/// Nested description of a tree, flattened by `BehaviorTree::build`.
pub enum NodeSpec<F: Frame> {
    Composite {
        name: String,
        mode: CompositeMode,
        dynamic: bool,
        children: Vec<NodeSpec<F>>,
    },
    Decorator {
        name: String,
        abort: AbortMode,
        logic: Box<dyn DecoratorLogic<F>>,
        child: Box<NodeSpec<F>>,
    },
    Leaf {
        name: String,
        logic: Box<dyn LeafLogic<F>>,
        services: Vec<Box<dyn ServiceLogic<F>>>,
    },
}

impl<F: Frame> NodeSpec<F> {
    pub fn sequence(name: impl Into<String>, children: Vec<NodeSpec<F>>) -> Self {
        NodeSpec::Composite {
            name: name.into(),
            mode: CompositeMode::Sequence,
            dynamic: false,
            children,
        }
    }

    pub fn selector(name: impl Into<String>, children: Vec<NodeSpec<F>>) -> Self {
        NodeSpec::Composite {
            name: name.into(),
            mode: CompositeMode::Selector,
            dynamic: false,
            children,
        }
    }

    /// Marks a composite for per-tick re-validation of the decorators above it.
    pub fn dynamic(mut self) -> Self {
        if let NodeSpec::Composite { dynamic, .. } = &mut self {
            *dynamic = true;
        }
        self
    }

    pub fn decorator(
        name: impl Into<String>,
        abort: AbortMode,
        logic: impl DecoratorLogic<F>,
        child: NodeSpec<F>,
    ) -> Self {
        NodeSpec::Decorator {
            name: name.into(),
            abort,
            logic: Box::new(logic),
            child: Box::new(child),
        }
    }

    pub fn leaf(name: impl Into<String>, logic: impl LeafLogic<F>) -> Self {
        NodeSpec::Leaf {
            name: name.into(),
            logic: Box::new(logic),
            services: Vec::new(),
        }
    }

    pub fn with_service(mut self, service: impl ServiceLogic<F>) -> Self {
        if let NodeSpec::Leaf { services, .. } = &mut self {
            services.push(Box::new(service));
        }
        self
    }

    pub fn name(&self) -> &str {
        match self {
            NodeSpec::Composite { name, .. }
            | NodeSpec::Decorator { name, .. }
            | NodeSpec::Leaf { name, .. } => name,
        }
    }
}

/// Compiled, immutable tree shared by every agent that runs it.
pub struct BehaviorTree<F: Frame> {
    id: AssetId,
    name: String,
    nodes: Vec<BtNode<F>>,
    services: Vec<ServiceDef<F>>,
    scratch_len: u32,
}

impl<F: Frame> BehaviorTree<F> {
    pub const MAX_NODES: usize = u16::MAX as usize;

    pub fn build(id: AssetId, name: impl Into<String>, root: NodeSpec<F>) -> Result<Self, BtError> {
        let name = name.into();
        let mut tree = Self {
            id,
            name: name.clone(),
            nodes: Vec::new(),
            services: Vec::new(),
            scratch_len: 0,
        };
        tree.nodes.push(BtNode {
            name,
            parent: None,
            index_in_parent: 0,
            subtree_end: 0,
            scratch_offset: 0,
            scratch_len: 0,
            kind: NodeKind::Root { child: NodeId(1) },
        });
        tree.flatten(root, NodeId::ROOT, 0)?;
        let end = tree.nodes.len() as u16;
        tree.nodes[0].subtree_end = end;

        tracing::debug!(
            tree = %tree.name,
            nodes = tree.nodes.len(),
            services = tree.services.len(),
            scratch = tree.scratch_len,
            "behavior tree built"
        );
        Ok(tree)
    }

    fn flatten(&mut self, spec: NodeSpec<F>, parent: NodeId, index_in_parent: u16) -> Result<NodeId, BtError> {
        if self.nodes.len() >= Self::MAX_NODES {
            return Err(BtError::TooManyNodes {
                count: self.nodes.len() + 1,
                max: Self::MAX_NODES,
            });
        }
        let id = NodeId(self.nodes.len() as u16);

        match spec {
            NodeSpec::Composite {
                name,
                mode,
                dynamic,
                children,
            } => {
                if children.is_empty() {
                    tracing::error!(node = %name, "composite without children");
                    return Err(BtError::EmptyComposite { node: name });
                }
                let scratch_slot = self.reserve_scratch(1);
                self.push(name, parent, index_in_parent, scratch_slot, 1, NodeKind::Composite(CompositeData {
                    mode,
                    children: Vec::new(),
                    dynamic,
                    scratch_slot,
                }));
                let mut ids = Vec::with_capacity(children.len());
                for (i, child) in children.into_iter().enumerate() {
                    ids.push(self.flatten(child, id, i as u16)?);
                }
                if let NodeKind::Composite(data) = &mut self.nodes[id.index()].kind {
                    data.children = ids;
                }
            }
            NodeSpec::Decorator {
                name,
                abort,
                logic,
                child,
            } => {
                self.push(name, parent, index_in_parent, 0, 0, NodeKind::Decorator(DecoratorData {
                    child: NodeId(id.0 + 1),
                    abort,
                    logic,
                }));
                self.flatten(*child, id, 0)?;
            }
            NodeSpec::Leaf {
                name,
                logic,
                services,
            } => {
                let slots = logic.scratch_slots();
                let offset = self.reserve_scratch(slots);
                let mut service_slots = Vec::with_capacity(services.len());
                for service in services {
                    service_slots.push(ServiceSlot(self.services.len() as u16));
                    self.services.push(ServiceDef { leaf: id, logic: service });
                }
                self.push(name, parent, index_in_parent, offset, slots, NodeKind::Leaf(LeafData {
                    logic,
                    services: service_slots,
                }));
            }
        }

        let end = self.nodes.len() as u16;
        self.nodes[id.index()].subtree_end = end;
        Ok(id)
    }

    fn reserve_scratch(&mut self, slots: u32) -> u32 {
        let offset = self.scratch_len;
        self.scratch_len += slots;
        offset
    }

    fn push(
        &mut self,
        name: String,
        parent: NodeId,
        index_in_parent: u16,
        scratch_offset: u32,
        scratch_len: u32,
        kind: NodeKind<F>,
    ) {
        self.nodes.push(BtNode {
            name,
            parent: Some(parent),
            index_in_parent,
            subtree_end: 0,
            scratch_offset,
            scratch_len,
            kind,
        });
    }

    pub fn id(&self) -> AssetId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn service_count(&self) -> usize {
        self.services.len()
    }

    pub fn scratch_len(&self) -> usize {
        self.scratch_len as usize
    }

    pub fn node(&self, id: NodeId) -> Option<&BtNode<F>> {
        self.nodes.get(id.index())
    }

    pub fn nodes(&self) -> &[BtNode<F>] {
        &self.nodes
    }

    /// Looks a node up by name (first match in pre-order).
    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.nodes
            .iter()
            .position(|n| n.name == name)
            .map(|i| NodeId(i as u16))
    }

    pub(crate) fn services(&self) -> &[ServiceDef<F>] {
        &self.services
    }

    pub(crate) fn subtree(&self, id: NodeId) -> std::ops::Range<usize> {
        id.index()..self.nodes[id.index()].subtree_end as usize
    }

    /// Nearest ancestor composite of `id` and the index of the branch containing `id`.
    pub(crate) fn enclosing_composite(&self, id: NodeId) -> Option<(NodeId, usize)> {
        let mut child = id;
        let mut parent = self.nodes[id.index()].parent;
        while let Some(p) = parent {
            let node = &self.nodes[p.index()];
            if let NodeKind::Composite(_) = node.kind {
                return Some((p, self.nodes[child.index()].index_in_parent as usize));
            }
            child = p;
            parent = node.parent;
        }
        None
    }

    /// Decorators directly above `id`, nearest first.
    pub(crate) fn decorator_chain(&self, id: NodeId) -> Vec<NodeId> {
        let mut chain = Vec::new();
        let mut parent = self.nodes[id.index()].parent;
        while let Some(p) = parent {
            match self.nodes[p.index()].kind {
                NodeKind::Decorator(_) => chain.push(p),
                _ => break,
            }
            parent = self.nodes[p.index()].parent;
        }
        chain
    }

    /// `(key, decorator)` pairs for every decorator with an abort mode.
    pub fn abort_observers(&self) -> Vec<(u64, NodeId)> {
        let mut out = Vec::new();
        for (i, node) in self.nodes.iter().enumerate() {
            if let NodeKind::Decorator(data) = &node.kind {
                if data.abort != AbortMode::None {
                    for key in data.logic.observed_keys() {
                        out.push((key, NodeId(i as u16)));
                    }
                }
            }
        }
        out
    }
}
