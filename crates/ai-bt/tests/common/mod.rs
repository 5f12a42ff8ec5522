#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use ai_bt::{BehaviorTree, BtAgent, BtContext, LeafLogic, NodeSpec, ServiceLogic};
use ai_core::{AssetId, Blackboard, BtConfig, NodeStatus, SimFrame, FP};

pub type Log = Rc<RefCell<Vec<String>>>;

pub fn log() -> Log {
    Rc::new(RefCell::new(Vec::new()))
}

pub fn entries(log: &Log) -> Vec<String> {
    log.borrow().clone()
}

/// Leaf that records its callbacks and always reports `result`.
pub struct Record {
    pub name: &'static str,
    pub log: Log,
    pub result: NodeStatus,
}

impl Record {
    pub fn leaf(name: &'static str, log: &Log, result: NodeStatus) -> NodeSpec<SimFrame> {
        NodeSpec::leaf(
            name,
            Record {
                name,
                log: Rc::clone(log),
                result,
            },
        )
    }
}

impl LeafLogic<SimFrame> for Record {
    fn on_enter(&self, _cx: &mut BtContext<'_, SimFrame>) {
        self.log.borrow_mut().push(format!("{}:enter", self.name));
    }

    fn on_update(&self, _cx: &mut BtContext<'_, SimFrame>) -> NodeStatus {
        self.log.borrow_mut().push(format!("{}:update", self.name));
        self.result
    }

    fn on_exit(&self, _cx: &mut BtContext<'_, SimFrame>, status: NodeStatus) {
        self.log
            .borrow_mut()
            .push(format!("{}:exit:{status:?}", self.name));
    }
}

/// Leaf that stays Running for `ticks` updates, then succeeds.
pub struct Steps {
    pub name: &'static str,
    pub log: Log,
    pub ticks: i64,
}

impl Steps {
    pub fn leaf(name: &'static str, log: &Log, ticks: i64) -> NodeSpec<SimFrame> {
        NodeSpec::leaf(
            name,
            Steps {
                name,
                log: Rc::clone(log),
                ticks,
            },
        )
    }
}

impl LeafLogic<SimFrame> for Steps {
    fn scratch_slots(&self) -> u32 {
        1
    }

    fn on_enter(&self, cx: &mut BtContext<'_, SimFrame>) {
        self.log.borrow_mut().push(format!("{}:enter", self.name));
        cx.set_scratch(0, self.ticks);
    }

    fn on_update(&self, cx: &mut BtContext<'_, SimFrame>) -> NodeStatus {
        self.log.borrow_mut().push(format!("{}:update", self.name));
        let left = cx.scratch(0);
        if left <= 0 {
            return NodeStatus::Success;
        }
        cx.set_scratch(0, left - 1);
        NodeStatus::Running
    }

    fn on_exit(&self, _cx: &mut BtContext<'_, SimFrame>, status: NodeStatus) {
        self.log
            .borrow_mut()
            .push(format!("{}:exit:{status:?}", self.name));
    }
}

/// Service that logs the simulation time of every update.
pub struct Pulse {
    pub log: Log,
    pub interval: FP,
}

impl ServiceLogic<SimFrame> for Pulse {
    fn interval(&self) -> FP {
        self.interval
    }

    fn update(&self, cx: &mut BtContext<'_, SimFrame>) {
        self.log
            .borrow_mut()
            .push(format!("pulse@{}", cx.time().to_int()));
    }
}

pub fn tree(root: NodeSpec<SimFrame>) -> Arc<BehaviorTree<SimFrame>> {
    Arc::new(BehaviorTree::build(AssetId(1), "test", root).unwrap())
}

pub fn agent(
    tree: &Arc<BehaviorTree<SimFrame>>,
    frame: &mut SimFrame,
    bb: &mut Blackboard,
) -> BtAgent<SimFrame> {
    BtAgent::init(Arc::clone(tree), BtConfig::default(), frame, 1, bb).unwrap()
}
