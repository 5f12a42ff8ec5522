//! Per-agent behavior-tree state and the tick engine.

use std::any::Any;
use std::sync::Arc;

use ai_core::{
    AgentId, AiObserver, Blackboard, BtConfig, Frame, FunctionContext, ListHandle, NodeStatus,
    NullObserver, ObserverId, FP,
};

use crate::error::BtError;
use crate::logic::BtContext;
use crate::tree::{BehaviorTree, CompositeMode, NodeId, NodeKind, ServiceSlot};

type NodeMemory = Option<Box<dyn Any>>;

/// Arena lists owned by one agent. All are allocated in `BtAgent::init` and freed exactly once in
/// `BtAgent::free`.
#[derive(Debug, Clone, Copy)]
struct AgentLists {
    statuses: ListHandle<NodeStatus>,
    service_wake: ListHandle<FP>,
    scratch: ListHandle<i64>,
    active_services: ListHandle<ServiceSlot>,
    active_dynamic: ListHandle<NodeId>,
    memory: ListHandle<NodeMemory>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Descend(NodeId),
    Update(NodeId),
    Ascend { child: NodeId, status: NodeStatus },
}

impl Step {
    fn node(self) -> NodeId {
        match self {
            Step::Descend(node) | Step::Update(node) => node,
            Step::Ascend { child, .. } => child,
        }
    }
}

/// Execution state of one entity running one tree.
pub struct BtAgent<F: Frame> {
    tree: Arc<BehaviorTree<F>>,
    config: BtConfig,
    lists: Option<AgentLists>,
    cursor: Option<NodeId>,
    resume: Option<Step>,
    last: NodeStatus,
}

impl<F: Frame> BtAgent<F> {
    /// Allocates the agent's lists and node memory and registers its abort observers.
    ///
    /// On error nothing stays allocated.
    pub fn init(
        tree: Arc<BehaviorTree<F>>,
        config: BtConfig,
        frame: &mut F,
        entity: F::Entity,
        blackboard: &mut Blackboard,
    ) -> Result<Self, BtError> {
        let node_count = tree.node_count();
        let lists = {
            let arena = frame.lists_mut();
            AgentLists {
                statuses: arena.allocate_filled(node_count, NodeStatus::Inactive),
                service_wake: arena.allocate_filled(tree.service_count(), FP::ZERO),
                scratch: arena.allocate_filled(tree.scratch_len(), 0i64),
                active_services: arena.allocate(tree.service_count()),
                active_dynamic: arena.allocate(0),
                memory: arena.allocate_with(node_count, |_| None),
            }
        };
        let mut agent = Self {
            tree,
            config,
            lists: Some(lists),
            cursor: None,
            resume: None,
            last: NodeStatus::Inactive,
        };

        if let Err(err) = agent.init_memory(frame, entity, blackboard) {
            tracing::error!(tree = %agent.tree.name(), error = %err, "behavior tree agent init failed");
            let _ = agent.free(frame, entity, blackboard);
            return Err(err);
        }
        for (key, node) in agent.tree.abort_observers() {
            blackboard.observe(key, ObserverId(node.0 as u32));
        }

        tracing::debug!(
            entity = entity.stable_id(),
            tree = %agent.tree.name(),
            nodes = node_count,
            "behavior tree agent initialized"
        );
        Ok(agent)
    }

    fn init_memory(
        &mut self,
        frame: &mut F,
        entity: F::Entity,
        blackboard: &mut Blackboard,
    ) -> Result<(), BtError> {
        let lists = self.lists()?;
        let actual = frame.lists().get(lists.statuses)?.len();
        if actual != self.tree.node_count() {
            return Err(BtError::StatusSizeMismatch {
                expected: self.tree.node_count(),
                actual,
            });
        }
        for (i, node) in self.tree.nodes().iter().enumerate() {
            if let NodeKind::Leaf(leaf) = &node.kind {
                if let Some(memory) = leaf.logic.on_init(frame, entity, blackboard)? {
                    frame.lists_mut().get_mut(lists.memory)?[i] = Some(memory);
                }
            }
        }
        Ok(())
    }

    /// Releases everything `init` allocated. A second call is a no-op.
    pub fn free(
        &mut self,
        frame: &mut F,
        entity: F::Entity,
        blackboard: &mut Blackboard,
    ) -> Result<(), BtError> {
        let Some(lists) = self.lists else {
            return Ok(());
        };

        // Running leaves get their exit callback before their lists go away.
        let tree = Arc::clone(&self.tree);
        let mut null = NullObserver;
        {
            let mut exec = Exec {
                tree: &tree,
                lists,
                frame: &mut *frame,
                entity,
                blackboard: &mut *blackboard,
                observer: &mut null,
                cursor: &mut self.cursor,
            };
            if let Err(err) = exec.abort_subtree(NodeId::ROOT) {
                tracing::warn!(error = %err, "abort during teardown failed");
            }
        }
        self.lists = None;
        self.cursor = None;
        self.resume = None;

        let mut result = Ok(());
        for (i, node) in tree.nodes().iter().enumerate() {
            if let NodeKind::Leaf(leaf) = &node.kind {
                let memory = match frame.lists_mut().get_mut(lists.memory) {
                    Ok(list) => list.get_mut(i).and_then(Option::take),
                    Err(_) => None,
                };
                if let Some(memory) = memory {
                    if let Err(err) = leaf.logic.on_free(frame, entity, blackboard, memory) {
                        result = result.and(Err(err.into()));
                    }
                }
            }
        }
        for (_, node) in tree.abort_observers() {
            blackboard.unobserve(ObserverId(node.0 as u32));
        }

        let arena = frame.lists_mut();
        let frees = [
            arena.free(lists.statuses),
            arena.free(lists.service_wake),
            arena.free(lists.scratch),
            arena.free(lists.active_services),
            arena.free(lists.active_dynamic),
            arena.free(lists.memory),
        ];
        for outcome in frees {
            if let Err(err) = outcome {
                result = result.and(Err(err.into()));
            }
        }

        tracing::debug!(entity = entity.stable_id(), tree = %tree.name(), "behavior tree agent freed");
        result
    }

    fn lists(&self) -> Result<AgentLists, BtError> {
        self.lists.ok_or_else(|| {
            BtError::Ai(ai_core::AiError::invalid_asset(
                self.tree.name(),
                "agent used after free",
            ))
        })
    }

    pub fn tree(&self) -> &Arc<BehaviorTree<F>> {
        &self.tree
    }

    pub fn cursor(&self) -> Option<NodeId> {
        self.cursor
    }

    pub fn is_initialized(&self) -> bool {
        self.lists.is_some()
    }

    /// Result of the last tick.
    pub fn last_status(&self) -> NodeStatus {
        self.last
    }

    pub fn status(&self, frame: &F, node: NodeId) -> NodeStatus {
        self.lists
            .and_then(|lists| frame.lists().get(lists.statuses).ok())
            .and_then(|list| list.get(node.index()).copied())
            .unwrap_or_default()
    }

    /// Snapshot of every node status, indexed by node id.
    pub fn statuses(&self, frame: &F) -> Vec<NodeStatus> {
        self.lists
            .and_then(|lists| frame.lists().get(lists.statuses).ok())
            .cloned()
            .unwrap_or_default()
    }

    /// Aborts whatever is running and moves the cursor to `node`. The path from the root down to
    /// `node` is entered without evaluating decorators on the next tick.
    pub fn force_cursor(
        &mut self,
        frame: &mut F,
        entity: F::Entity,
        blackboard: &mut Blackboard,
        node: NodeId,
    ) -> Result<(), BtError> {
        if node.index() >= self.tree.node_count() {
            tracing::warn!(node = node.0, tree = %self.tree.name(), "forced cursor is out of range");
            return Ok(());
        }
        self.reset(frame, entity, blackboard)?;
        self.cursor = Some(node);
        tracing::debug!(entity = entity.stable_id(), node = node.0, "cursor forced");
        Ok(())
    }

    /// Aborts whatever is running; the next tick starts again at the root.
    pub fn reset(
        &mut self,
        frame: &mut F,
        entity: F::Entity,
        blackboard: &mut Blackboard,
    ) -> Result<(), BtError> {
        let lists = self.lists()?;
        let tree = Arc::clone(&self.tree);
        let mut null = NullObserver;
        let mut exec = Exec {
            tree: &tree,
            lists,
            frame,
            entity,
            blackboard,
            observer: &mut null,
            cursor: &mut self.cursor,
        };
        exec.abort_subtree(NodeId::ROOT)?;
        exec.clear_statuses(NodeId::ROOT)?;
        *exec.cursor = None;
        self.resume = None;
        Ok(())
    }

    pub fn tick(
        &mut self,
        frame: &mut F,
        entity: F::Entity,
        blackboard: &mut Blackboard,
        observer: &mut dyn AiObserver,
    ) -> Result<NodeStatus, BtError> {
        let lists = self.lists()?;
        let actual = frame.lists().get(lists.statuses)?.len();
        if actual != self.tree.node_count() {
            return Err(BtError::StatusSizeMismatch {
                expected: self.tree.node_count(),
                actual,
            });
        }

        let tree = Arc::clone(&self.tree);
        let max_steps = self.config.max_steps_per_tick.max(1);
        let mut exec = Exec {
            tree: &tree,
            lists,
            frame,
            entity,
            blackboard,
            observer,
            cursor: &mut self.cursor,
        };

        exec.tick_services()?;
        let mut pending = exec.process_reactions()?;
        if let Some(step) = exec.revalidate_dynamic()? {
            pending = Some(step);
        }

        let resume = self.resume.take();
        let mut step = match pending {
            Some(pending) => {
                // Whatever was in flight is superseded; nothing may stay Running under it.
                if let Some(stale) = resume.or(exec.running_cursor()?) {
                    exec.abandon(stale, pending)?;
                }
                pending
            }
            None => match resume {
                Some(step) => step,
                None => exec.start_step()?,
            },
        };

        let mut steps = 0u32;
        let status = loop {
            if steps >= max_steps {
                tracing::trace!(tree = %tree.name(), "step budget exhausted");
                self.resume = Some(step);
                break NodeStatus::Running;
            }
            steps += 1;
            let flow = exec.step(step)?;
            // Writes made by the step react before anything else runs.
            let reaction = exec.process_reactions()?;
            match (flow, reaction) {
                (Flow::Next(next), Some(pending)) => {
                    exec.abandon(next, pending)?;
                    step = pending;
                }
                (Flow::Done(_), Some(pending)) => {
                    if let Some(stale) = exec.running_cursor()? {
                        exec.abandon(stale, pending)?;
                    }
                    step = pending;
                }
                (Flow::Next(next), None) => step = next,
                (Flow::Done(status), None) => break status,
            }
        };

        self.last = status;
        Ok(status)
    }
}

enum Flow {
    Next(Step),
    Done(NodeStatus),
}

struct Exec<'a, F: Frame> {
    tree: &'a BehaviorTree<F>,
    lists: AgentLists,
    frame: &'a mut F,
    entity: F::Entity,
    blackboard: &'a mut Blackboard,
    observer: &'a mut dyn AiObserver,
    cursor: &'a mut Option<NodeId>,
}

impl<'a, F: Frame> Exec<'a, F> {
    fn tick_id(&self) -> u64 {
        self.frame.tick()
    }

    fn eid(&self) -> u64 {
        self.entity.stable_id()
    }

    fn status(&self, node: NodeId) -> Result<NodeStatus, BtError> {
        Ok(self
            .frame
            .lists()
            .get(self.lists.statuses)?
            .get(node.index())
            .copied()
            .unwrap_or_default())
    }

    fn set_status(&mut self, node: NodeId, status: NodeStatus) -> Result<(), BtError> {
        if let Some(slot) = self
            .frame
            .lists_mut()
            .get_mut(self.lists.statuses)?
            .get_mut(node.index())
        {
            *slot = status;
        }
        Ok(())
    }

    fn clear_statuses(&mut self, node: NodeId) -> Result<(), BtError> {
        let range = self.tree.subtree(node);
        let statuses = self.frame.lists_mut().get_mut(self.lists.statuses)?;
        for status in &mut statuses[range] {
            *status = NodeStatus::Inactive;
        }
        Ok(())
    }

    fn composite_child(&self, composite: NodeId) -> Result<usize, BtError> {
        let slot = self.tree.nodes()[composite.index()].scratch_offset as usize;
        Ok(self
            .frame
            .lists()
            .get(self.lists.scratch)?
            .get(slot)
            .copied()
            .unwrap_or_default() as usize)
    }

    fn set_composite_child(&mut self, composite: NodeId, index: usize) -> Result<(), BtError> {
        let slot = self.tree.nodes()[composite.index()].scratch_offset as usize;
        if let Some(value) = self.frame.lists_mut().get_mut(self.lists.scratch)?.get_mut(slot) {
            *value = index as i64;
        }
        Ok(())
    }

    fn check_decorator(&mut self, node: NodeId) -> bool {
        let passed = match &self.tree.nodes()[node.index()].kind {
            NodeKind::Decorator(data) => {
                let cx = FunctionContext::new(&*self.frame, self.entity, &*self.blackboard);
                data.logic.check(&cx)
            }
            _ => true,
        };
        let (tick, eid) = (self.tick_id(), self.eid());
        self.observer.decorator_checked(tick, eid, node.0 as u32, passed);
        passed
    }

    /// Runs `f` with a leaf context for `node`, lending it the node's memory for the call.
    fn with_leaf_context<R>(
        &mut self,
        node: NodeId,
        f: impl FnOnce(&mut BtContext<'_, F>) -> R,
    ) -> Result<R, BtError> {
        let mut memory = self.frame.lists_mut().get_mut(self.lists.memory)?[node.index()].take();
        let data = &self.tree.nodes()[node.index()];
        let result = {
            let mut cx = BtContext {
                frame: &mut *self.frame,
                entity: self.entity,
                blackboard: &mut *self.blackboard,
                observer: &mut *self.observer,
                node,
                scratch: self.lists.scratch,
                scratch_offset: data.scratch_offset,
                scratch_len: data.scratch_len,
                memory: memory.as_deref_mut(),
            };
            f(&mut cx)
        };
        if memory.is_some() {
            self.frame.lists_mut().get_mut(self.lists.memory)?[node.index()] = memory;
        }
        Ok(result)
    }

    fn enter(&mut self, node: NodeId) -> Result<(), BtError> {
        self.set_status(node, NodeStatus::Running)?;
        let (tick, eid) = (self.tick_id(), self.eid());
        self.observer.node_entered(tick, eid, node.0 as u32);
        tracing::trace!(entity = eid, node = node.0, "bt node entered");

        let tree = self.tree;
        match &tree.nodes()[node.index()].kind {
            NodeKind::Composite(data) => {
                let first = node.index() + 1;
                let end = tree.nodes()[node.index()].subtree_end as usize;
                let statuses = self.frame.lists_mut().get_mut(self.lists.statuses)?;
                for status in &mut statuses[first..end] {
                    *status = NodeStatus::Inactive;
                }
                self.set_composite_child(node, 0)?;
                if data.dynamic {
                    let active = self.frame.lists_mut().get_mut(self.lists.active_dynamic)?;
                    if !active.contains(&node) {
                        active.push(node);
                        active.sort_unstable();
                    }
                }
            }
            NodeKind::Leaf(leaf) => {
                self.with_leaf_context(node, |cx| leaf.logic.on_enter(cx))?;
                for &slot in &leaf.services {
                    let now = self.frame.time();
                    {
                        let active = self.frame.lists_mut().get_mut(self.lists.active_services)?;
                        if !active.contains(&slot) {
                            active.push(slot);
                            active.sort_unstable();
                        }
                    }
                    self.frame.lists_mut().get_mut(self.lists.service_wake)?[slot.0 as usize] = now;
                }
            }
            NodeKind::Root { .. } | NodeKind::Decorator(_) => {}
        }
        Ok(())
    }

    fn exit(&mut self, node: NodeId, status: NodeStatus) -> Result<(), BtError> {
        self.set_status(node, status)?;
        let (tick, eid) = (self.tick_id(), self.eid());
        self.observer.node_exited(tick, eid, node.0 as u32, status);
        tracing::trace!(entity = eid, node = node.0, ?status, "bt node exited");

        let tree = self.tree;
        match &tree.nodes()[node.index()].kind {
            NodeKind::Leaf(leaf) => {
                self.with_leaf_context(node, |cx| leaf.logic.on_exit(cx, status))?;
                let active = self.frame.lists_mut().get_mut(self.lists.active_services)?;
                active.retain(|slot| !leaf.services.contains(slot));
            }
            NodeKind::Composite(data) if data.dynamic => {
                let active = self.frame.lists_mut().get_mut(self.lists.active_dynamic)?;
                active.retain(|n| *n != node);
            }
            _ => {}
        }
        if *self.cursor == Some(node) {
            *self.cursor = None;
        }
        Ok(())
    }

    /// Aborts every Running node in `node`'s subtree, deepest first. Nodes already finished or
    /// already aborted are left alone.
    fn abort_subtree(&mut self, node: NodeId) -> Result<(), BtError> {
        for index in self.tree.subtree(node).rev() {
            let id = NodeId(index as u16);
            if self.status(id)? == NodeStatus::Running {
                self.exit(id, NodeStatus::Abort)?;
            }
        }
        if let Some(cursor) = *self.cursor {
            if self.tree.subtree(node).contains(&cursor.index()) {
                *self.cursor = None;
            }
        }
        Ok(())
    }

    fn tick_services(&mut self) -> Result<(), BtError> {
        let active = self.frame.lists().get(self.lists.active_services)?.clone();
        for slot in active {
            let now = self.frame.time();
            let wake = self.frame.lists().get(self.lists.service_wake)?[slot.0 as usize];
            if wake > now {
                continue;
            }
            let tree = self.tree;
            let service = &tree.services()[slot.0 as usize];
            self.with_leaf_context(service.leaf, |cx| service.logic.update(cx))?;
            let next = now + service.logic.interval();
            self.frame.lists_mut().get_mut(self.lists.service_wake)?[slot.0 as usize] = next;
        }
        Ok(())
    }

    /// The Running leaf the cursor rests on, as the step that would resume it.
    fn running_cursor(&self) -> Result<Option<Step>, BtError> {
        let Some(cursor) = *self.cursor else {
            return Ok(None);
        };
        let is_leaf = matches!(self.tree.nodes()[cursor.index()].kind, NodeKind::Leaf(_));
        if is_leaf && self.status(cursor)? == NodeStatus::Running {
            Ok(Some(Step::Update(cursor)))
        } else {
            Ok(None)
        }
    }

    /// Drops `stale` in favour of `next`: aborts the highest ancestor of the stale position whose
    /// subtree does not contain where execution continues.
    fn abandon(&mut self, stale: Step, next: Step) -> Result<(), BtError> {
        let target = next.node().index();
        let mut node = stale.node();
        let mut top = None;
        while !self.tree.subtree(node).contains(&target) {
            top = Some(node);
            match self.tree.nodes()[node.index()].parent {
                Some(parent) => node = parent,
                None => break,
            }
        }
        if let Some(top) = top {
            self.abort_subtree(top)?;
        }
        Ok(())
    }

    /// Re-checks abortable decorators whose observed keys changed since the last check.
    fn process_reactions(&mut self) -> Result<Option<Step>, BtError> {
        let tree = self.tree;
        let mut pending = None;
        for ObserverId(raw) in self.blackboard.take_reactions() {
            let id = NodeId(raw as u16);
            let Some(NodeKind::Decorator(data)) = tree.node(id).map(|n| &n.kind) else {
                continue;
            };
            let status = self.status(id)?;
            if status == NodeStatus::Abort {
                continue;
            }
            let abort = data.abort;

            if abort.aborts_self() && status == NodeStatus::Running {
                if !self.check_decorator(id) {
                    tracing::debug!(entity = self.eid(), node = id.0, "self abort");
                    self.abort_subtree(data.child)?;
                    self.exit(id, NodeStatus::Failure)?;
                    pending = Some(Step::Ascend {
                        child: id,
                        status: NodeStatus::Failure,
                    });
                }
                continue;
            }

            if abort.aborts_lower_priority() && status != NodeStatus::Running {
                let Some((composite, branch)) = tree.enclosing_composite(id) else {
                    continue;
                };
                if self.status(composite)? != NodeStatus::Running {
                    continue;
                }
                let running = self.composite_child(composite)?;
                if running <= branch || !self.check_decorator(id) {
                    continue;
                }
                tracing::debug!(
                    entity = self.eid(),
                    node = id.0,
                    composite = composite.0,
                    branch,
                    "lower priority abort"
                );
                self.abort_lower_priority(composite, branch)?;
                let target = self.composite_children(composite)[branch];
                pending = Some(Step::Descend(target));
            }
        }
        Ok(pending)
    }

    fn composite_children(&self, composite: NodeId) -> &'a [NodeId] {
        let tree = self.tree;
        match &tree.nodes()[composite.index()].kind {
            NodeKind::Composite(data) => &data.children,
            _ => &[],
        }
    }

    /// Cancels the children of `composite` after `branch` that are Running or Inactive and
    /// rewinds the composite to `branch`.
    fn abort_lower_priority(&mut self, composite: NodeId, branch: usize) -> Result<(), BtError> {
        let children = self.composite_children(composite);
        for &child in &children[branch + 1..] {
            match self.status(child)? {
                NodeStatus::Running => {
                    self.abort_subtree(child)?;
                }
                NodeStatus::Inactive => self.set_status(child, NodeStatus::Abort)?,
                _ => {}
            }
        }
        self.set_composite_child(composite, branch)?;
        Ok(())
    }

    /// Re-validates the decorator chain above every active dynamic composite.
    fn revalidate_dynamic(&mut self) -> Result<Option<Step>, BtError> {
        let active = self.frame.lists().get(self.lists.active_dynamic)?.clone();
        for composite in active {
            if self.status(composite)? != NodeStatus::Running {
                continue;
            }
            let chain = self.tree.decorator_chain(composite);
            let Some(&topmost) = chain.last() else {
                continue;
            };
            let mut valid = true;
            for &decorator in &chain {
                if !self.check_decorator(decorator) {
                    valid = false;
                    break;
                }
            }
            if valid {
                continue;
            }
            tracing::debug!(entity = self.eid(), composite = composite.0, "dynamic composite invalidated");
            // Restart from the topmost decorator, which re-runs the entry checks.
            self.abort_subtree(topmost)?;
            self.frame
                .lists_mut()
                .get_mut(self.lists.active_dynamic)?
                .retain(|n| *n != composite);
            return Ok(Some(Step::Descend(topmost)));
        }
        Ok(None)
    }

    fn start_step(&mut self) -> Result<Step, BtError> {
        let Some(cursor) = *self.cursor else {
            return Ok(Step::Descend(NodeId::ROOT));
        };
        if self.status(cursor)? == NodeStatus::Running {
            if let NodeKind::Leaf(_) = self.tree.nodes()[cursor.index()].kind {
                return Ok(Step::Update(cursor));
            }
        }
        // Forced cursor: enter the ancestors it needs without evaluating them.
        let mut path = Vec::new();
        let mut parent = self.tree.nodes()[cursor.index()].parent;
        let mut child = cursor;
        while let Some(p) = parent {
            path.push((p, child));
            child = p;
            parent = self.tree.nodes()[p.index()].parent;
        }
        for (ancestor, child) in path.into_iter().rev() {
            if self.status(ancestor)? != NodeStatus::Running {
                self.enter(ancestor)?;
            }
            if let NodeKind::Composite(_) = self.tree.nodes()[ancestor.index()].kind {
                let index = self.tree.nodes()[child.index()].index_in_parent as usize;
                self.set_composite_child(ancestor, index)?;
            }
        }
        Ok(Step::Descend(cursor))
    }

    fn step(&mut self, step: Step) -> Result<Flow, BtError> {
        let tree = self.tree;
        match step {
            Step::Descend(node) => match &tree.nodes()[node.index()].kind {
                NodeKind::Root { child } => {
                    if self.status(node)? != NodeStatus::Running {
                        self.enter(node)?;
                    }
                    Ok(Flow::Next(Step::Descend(*child)))
                }
                NodeKind::Composite(data) => {
                    self.enter(node)?;
                    Ok(Flow::Next(Step::Descend(data.children[0])))
                }
                NodeKind::Decorator(data) => {
                    if self.check_decorator(node) {
                        self.enter(node)?;
                        Ok(Flow::Next(Step::Descend(data.child)))
                    } else {
                        // Never entered, so observers only see the failed check.
                        self.set_status(node, NodeStatus::Failure)?;
                        if *self.cursor == Some(node) {
                            *self.cursor = None;
                        }
                        Ok(Flow::Next(Step::Ascend {
                            child: node,
                            status: NodeStatus::Failure,
                        }))
                    }
                }
                NodeKind::Leaf(_) => {
                    self.enter(node)?;
                    Ok(Flow::Next(Step::Update(node)))
                }
            },
            Step::Update(node) => {
                let NodeKind::Leaf(leaf) = &tree.nodes()[node.index()].kind else {
                    return Ok(Flow::Next(Step::Descend(node)));
                };
                let status = self.with_leaf_context(node, |cx| leaf.logic.on_update(cx))?;
                match status {
                    NodeStatus::Running => {
                        *self.cursor = Some(node);
                        Ok(Flow::Done(NodeStatus::Running))
                    }
                    NodeStatus::Success | NodeStatus::Failure => {
                        self.exit(node, status)?;
                        Ok(Flow::Next(Step::Ascend { child: node, status }))
                    }
                    NodeStatus::Inactive | NodeStatus::Abort => {
                        self.exit(node, NodeStatus::Failure)?;
                        Ok(Flow::Next(Step::Ascend {
                            child: node,
                            status: NodeStatus::Failure,
                        }))
                    }
                }
            }
            Step::Ascend { child, status } => {
                let status = match status {
                    NodeStatus::Success => NodeStatus::Success,
                    _ => NodeStatus::Failure,
                };
                let Some(parent) = tree.nodes()[child.index()].parent else {
                    return self.complete(status);
                };
                match &tree.nodes()[parent.index()].kind {
                    NodeKind::Root { .. } => self.complete(status),
                    NodeKind::Composite(data) => {
                        let index = tree.nodes()[child.index()].index_in_parent as usize;
                        let finished = match (data.mode, status) {
                            (CompositeMode::Sequence, NodeStatus::Failure) => Some(NodeStatus::Failure),
                            (CompositeMode::Selector, NodeStatus::Success) => Some(NodeStatus::Success),
                            _ if index + 1 >= data.children.len() => Some(status),
                            _ => None,
                        };
                        match finished {
                            Some(result) => {
                                self.exit(parent, result)?;
                                Ok(Flow::Next(Step::Ascend {
                                    child: parent,
                                    status: result,
                                }))
                            }
                            None => {
                                self.set_composite_child(parent, index + 1)?;
                                Ok(Flow::Next(Step::Descend(data.children[index + 1])))
                            }
                        }
                    }
                    NodeKind::Decorator(data) => {
                        let mut result = status;
                        if data.abort.aborts_self() && !self.check_decorator(parent) {
                            result = NodeStatus::Failure;
                        }
                        self.exit(parent, result)?;
                        Ok(Flow::Next(Step::Ascend {
                            child: parent,
                            status: result,
                        }))
                    }
                    NodeKind::Leaf(_) => Ok(Flow::Done(NodeStatus::Failure)),
                }
            }
        }
    }

    /// The root's child finished: close the cycle and start over at the root next tick.
    fn complete(&mut self, status: NodeStatus) -> Result<Flow, BtError> {
        self.exit(NodeId::ROOT, status)?;
        let (tick, eid) = (self.tick_id(), self.eid());
        self.observer.tree_completed(tick, eid, status);
        tracing::trace!(entity = eid, ?status, "behavior tree completed");

        self.clear_statuses(NodeId::ROOT)?;
        self.frame.lists_mut().get_mut(self.lists.active_services)?.clear();
        self.frame.lists_mut().get_mut(self.lists.active_dynamic)?.clear();
        *self.cursor = None;
        Ok(Flow::Done(status))
    }
}
