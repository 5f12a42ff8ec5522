#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::Arc;

use ai_core::{AiFunction, AssetId, BbKey, Blackboard, FunctionContext, SimFrame, FP};
use ai_goap::{
    GoapActionDef, GoapActionLogic, GoapActionStatus, GoapAsset, GoapContext, GoapFact,
    GoapGoalDef, GoapState,
};

pub type Log = Rc<RefCell<Vec<String>>>;

pub fn log() -> Log {
    Rc::new(RefCell::new(Vec::new()))
}

pub fn entries(log: &Log) -> Vec<String> {
    log.borrow().clone()
}

pub const THREAT_VISIBLE: GoapFact = GoapFact(0);
pub const IN_RANGE: GoapFact = GoapFact(1);
pub const THREAT_ELIMINATED: GoapFact = GoapFact(2);

pub const VISIBLE_KEY: BbKey<bool> = BbKey::new(10);
pub const IN_RANGE_KEY: BbKey<bool> = BbKey::new(11);

/// Action that logs its hooks, stays `Continue` for `ticks` updates and then reports `outcome`.
///
/// The countdown lives in the logic itself, so one instance serves one agent.
pub struct Scripted {
    pub name: &'static str,
    pub log: Log,
    pub ticks: u32,
    pub outcome: GoapActionStatus,
    remaining: Cell<u32>,
}

impl Scripted {
    pub fn new(name: &'static str, log: &Log, ticks: u32) -> Self {
        Self {
            name,
            log: Rc::clone(log),
            ticks,
            outcome: GoapActionStatus::IsDone,
            remaining: Cell::new(ticks),
        }
    }

    pub fn failing(mut self) -> Self {
        self.outcome = GoapActionStatus::IsFailed;
        self
    }

    pub fn action(name: &'static str, log: &Log, ticks: u32) -> GoapActionDef<SimFrame> {
        GoapActionDef::new(name, Scripted::new(name, log, ticks))
    }
}

impl GoapActionLogic<SimFrame> for Scripted {
    fn activate(&self, _cx: &mut GoapContext<'_, SimFrame>) {
        self.remaining.set(self.ticks);
        self.log.borrow_mut().push(format!("{}:activate", self.name));
    }

    fn update(&self, _cx: &mut GoapContext<'_, SimFrame>) -> GoapActionStatus {
        self.log.borrow_mut().push(format!("{}:update", self.name));
        match self.remaining.get() {
            0 => self.outcome,
            n => {
                self.remaining.set(n - 1);
                GoapActionStatus::Continue
            }
        }
    }

    fn deactivate(&self, _cx: &mut GoapContext<'_, SimFrame>) {
        self.log.borrow_mut().push(format!("{}:deactivate", self.name));
    }
}

/// Writes `true` to a blackboard key when it completes.
pub struct Raise {
    pub key: BbKey<bool>,
}

impl GoapActionLogic<SimFrame> for Raise {
    fn update(&self, cx: &mut GoapContext<'_, SimFrame>) -> GoapActionStatus {
        match cx.blackboard.set(self.key, true) {
            Ok(_) => GoapActionStatus::IsDone,
            Err(_) => GoapActionStatus::IsFailed,
        }
    }
}

/// Rejects itself from planning while `key` is `true`.
pub struct Vetoed {
    pub key: BbKey<bool>,
}

impl GoapActionLogic<SimFrame> for Vetoed {
    fn validate_action(&self, cx: &FunctionContext<'_, SimFrame>, cost: FP) -> Option<FP> {
        if cx.blackboard.get(self.key) {
            None
        } else {
            Some(cost)
        }
    }

    fn update(&self, _cx: &mut GoapContext<'_, SimFrame>) -> GoapActionStatus {
        GoapActionStatus::IsDone
    }
}

pub fn cost(value: i32) -> AiFunction {
    AiFunction::fp(FP::from_int(value))
}

/// `1` while `key` reads `true`, `0` otherwise.
pub fn relevant_while(key: BbKey<bool>) -> AiFunction {
    AiFunction::Select {
        condition: Box::new(AiFunction::read(key.id())),
        then: Box::new(AiFunction::fp(FP::ONE)),
        otherwise: Box::new(AiFunction::fp(FP::ZERO)),
    }
}

/// The "eliminate threat" asset: Approach (cost 2) puts the agent in range, Attack (cost 1,
/// needs range) eliminates the threat.
pub fn combat(log: &Log) -> Arc<GoapAsset<SimFrame>> {
    let asset = GoapAsset::builder(AssetId(20), "combat")
        .goal(
            GoapGoalDef::new("eliminate threat")
                .with_relevancy(relevant_while(VISIBLE_KEY))
                .with_target(THREAT_ELIMINATED, 1),
        )
        .action(
            Scripted::action("approach", log, 0)
                .with_effect(IN_RANGE, 1)
                .with_cost(cost(2)),
        )
        .action(
            Scripted::action("attack", log, 1)
                .with_condition(IN_RANGE, 1)
                .with_effect(THREAT_ELIMINATED, 1)
                .with_cost(cost(1)),
        )
        .bind(THREAT_VISIBLE, VISIBLE_KEY.id())
        .bind(IN_RANGE, IN_RANGE_KEY.id())
        .build()
        .unwrap();
    Arc::new(asset)
}

pub fn combat_blackboard(visible: bool, in_range: bool) -> Blackboard {
    let mut bb = Blackboard::new();
    bb.register(VISIBLE_KEY, visible).unwrap();
    bb.register(IN_RANGE_KEY, in_range).unwrap();
    bb
}

pub fn state(facts: &[(GoapFact, i32)]) -> GoapState {
    facts.iter().copied().collect()
}
