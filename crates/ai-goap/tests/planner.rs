mod common;

use ai_core::{AssetId, Blackboard, BbKey, FunctionContext, GoapConfig, SimFrame, FP};
use ai_goap::{
    GoapActionDef, GoapActionLogic, GoapActionStatus, GoapAsset, GoapContext, GoapFact,
    GoapGoalDef, GoapPlanner, GoapState, InstantAction, PlanOutcome,
};
use common::{combat, cost, log, state, Vetoed, IN_RANGE, THREAT_ELIMINATED, THREAT_VISIBLE};

const HAS_KEY: GoapFact = GoapFact(1);
const DOOR_OPEN: GoapFact = GoapFact(2);
const INSIDE: GoapFact = GoapFact(3);

const LOCKDOWN: BbKey<bool> = BbKey::new(5);

fn plan(
    asset: &GoapAsset<SimFrame>,
    planner: &GoapPlanner,
    bb: &Blackboard,
    start: &GoapState,
    target: &GoapState,
) -> PlanOutcome {
    let frame = SimFrame::default();
    let cx = FunctionContext::new(&frame, 1, bb);
    planner.plan(asset, &cx, start, target)
}

fn names(asset: &GoapAsset<SimFrame>, outcome: &PlanOutcome) -> Vec<String> {
    outcome
        .plan()
        .unwrap()
        .actions
        .iter()
        .map(|&a| asset.action(a).unwrap().name.clone())
        .collect()
}

#[test]
fn approaches_before_attacking_when_out_of_range() {
    let log = log();
    let asset = combat(&log);
    let target = asset.goals()[0].target.clone();
    let bb = Blackboard::new();

    let out_of_range = plan(
        &asset,
        &GoapPlanner::default(),
        &bb,
        &state(&[(THREAT_VISIBLE, 1), (IN_RANGE, 0)]),
        &target,
    );
    assert_eq!(names(&asset, &out_of_range), vec!["approach", "attack"]);
    assert_eq!(out_of_range.plan().unwrap().cost, FP::from_int(3));

    let in_range = plan(
        &asset,
        &GoapPlanner::default(),
        &bb,
        &state(&[(THREAT_VISIBLE, 1), (IN_RANGE, 1)]),
        &target,
    );
    assert_eq!(names(&asset, &in_range), vec!["attack"]);
    assert_eq!(in_range.plan().unwrap().cost, FP::ONE);
}

#[test]
fn satisfied_target_yields_an_empty_plan() {
    let asset = combat(&log());
    let outcome = plan(
        &asset,
        &GoapPlanner::default(),
        &Blackboard::new(),
        &state(&[(THREAT_ELIMINATED, 1)]),
        &state(&[(THREAT_ELIMINATED, 1)]),
    );
    let found = outcome.plan().unwrap();
    assert!(found.actions.is_empty());
    assert_eq!(found.cost, FP::ZERO);
}

fn house() -> GoapAsset<SimFrame> {
    GoapAsset::builder(AssetId(2), "house")
        .goal(GoapGoalDef::new("enter").with_target(INSIDE, 1))
        .action(
            GoapActionDef::new("smash_door", InstantAction)
                .with_effect(DOOR_OPEN, 1)
                .with_cost(cost(5)),
        )
        .action(
            GoapActionDef::new("fetch_key", Vetoed { key: LOCKDOWN })
                .with_effect(HAS_KEY, 1)
                .with_cost(cost(1)),
        )
        .action(
            GoapActionDef::new("unlock_door", InstantAction)
                .with_condition(HAS_KEY, 1)
                .with_effect(DOOR_OPEN, 1)
                .with_cost(cost(1)),
        )
        .action(
            GoapActionDef::new("walk_in", InstantAction)
                .with_condition(DOOR_OPEN, 1)
                .with_effect(INSIDE, 1),
        )
        .build()
        .unwrap()
}

#[test]
fn cheapest_route_wins_over_shorter_route() {
    let asset = house();
    let mut bb = Blackboard::new();
    bb.register(LOCKDOWN, false).unwrap();

    let outcome = plan(
        &asset,
        &GoapPlanner::default(),
        &bb,
        &GoapState::new(),
        &state(&[(INSIDE, 1)]),
    );
    assert_eq!(names(&asset, &outcome), vec!["fetch_key", "unlock_door", "walk_in"]);
    assert_eq!(outcome.plan().unwrap().cost, FP::from_int(3));
}

#[test]
fn vetoed_action_falls_back_to_the_expensive_route() {
    let asset = house();
    let mut bb = Blackboard::new();
    bb.register(LOCKDOWN, true).unwrap();

    let outcome = plan(
        &asset,
        &GoapPlanner::default(),
        &bb,
        &GoapState::new(),
        &state(&[(INSIDE, 1)]),
    );
    assert_eq!(names(&asset, &outcome), vec!["smash_door", "walk_in"]);
    assert_eq!(outcome.plan().unwrap().cost, FP::from_int(6));
}

#[test]
fn equal_costs_follow_declaration_order() {
    let asset: GoapAsset<SimFrame> = GoapAsset::builder(AssetId(3), "ties")
        .goal(GoapGoalDef::new("open").with_target(DOOR_OPEN, 1))
        .action(GoapActionDef::new("kick", InstantAction).with_effect(DOOR_OPEN, 1))
        .action(GoapActionDef::new("push", InstantAction).with_effect(DOOR_OPEN, 1))
        .build()
        .unwrap();

    for _ in 0..3 {
        let outcome = plan(
            &asset,
            &GoapPlanner::default(),
            &Blackboard::new(),
            &GoapState::new(),
            &state(&[(DOOR_OPEN, 1)]),
        );
        assert_eq!(names(&asset, &outcome), vec!["kick"]);
    }
}

/// Refuses any regressed state that still needs a key.
struct NoKeys;

impl GoapActionLogic<SimFrame> for NoKeys {
    fn validate_plan_state(&self, required: &GoapState) -> bool {
        required.get(HAS_KEY).is_none()
    }

    fn update(&self, _cx: &mut GoapContext<'_, SimFrame>) -> GoapActionStatus {
        GoapActionStatus::IsDone
    }
}

#[test]
fn plan_state_veto_prunes_the_branch() {
    let asset: GoapAsset<SimFrame> = GoapAsset::builder(AssetId(4), "keys")
        .goal(GoapGoalDef::new("open").with_target(DOOR_OPEN, 1))
        .action(
            GoapActionDef::new("unlock", NoKeys)
                .with_condition(HAS_KEY, 1)
                .with_effect(DOOR_OPEN, 1),
        )
        .action(GoapActionDef::new("fetch_key", InstantAction).with_effect(HAS_KEY, 1))
        .build()
        .unwrap();

    let outcome = plan(
        &asset,
        &GoapPlanner::default(),
        &Blackboard::new(),
        &GoapState::new(),
        &state(&[(DOOR_OPEN, 1)]),
    );
    assert_eq!(outcome, PlanOutcome::NoPlan);
}

#[test]
fn unreachable_target_reports_no_plan() {
    let asset = house();
    let outcome = plan(
        &asset,
        &GoapPlanner::default(),
        &Blackboard::new(),
        &GoapState::new(),
        &state(&[(GoapFact(99), 1)]),
    );
    assert_eq!(outcome, PlanOutcome::NoPlan);
}

#[test]
fn search_limits_bound_the_planner() {
    let asset = house();
    let mut bb = Blackboard::new();
    bb.register(LOCKDOWN, false).unwrap();
    let target = state(&[(INSIDE, 1)]);

    let tight = GoapPlanner::new(GoapConfig {
        max_expansions: 1,
        max_plan_length: 16,
    });
    assert_eq!(
        plan(&asset, &tight, &bb, &GoapState::new(), &target),
        PlanOutcome::Exhausted
    );

    // Two steps only reach smash_door -> walk_in.
    let short = GoapPlanner::new(GoapConfig {
        max_expansions: 4096,
        max_plan_length: 2,
    });
    let outcome = plan(&asset, &short, &bb, &GoapState::new(), &target);
    assert_eq!(names(&asset, &outcome), vec!["smash_door", "walk_in"]);

    let single = GoapPlanner::new(GoapConfig {
        max_expansions: 4096,
        max_plan_length: 1,
    });
    assert_eq!(
        plan(&asset, &single, &bb, &GoapState::new(), &target),
        PlanOutcome::NoPlan
    );
}

#[test]
fn negative_costs_clamp_to_zero() {
    let asset: GoapAsset<SimFrame> = GoapAsset::builder(AssetId(5), "free")
        .goal(GoapGoalDef::new("open").with_target(DOOR_OPEN, 1))
        .action(
            GoapActionDef::new("kick", InstantAction)
                .with_effect(DOOR_OPEN, 1)
                .with_cost(cost(-4)),
        )
        .build()
        .unwrap();

    let outcome = plan(
        &asset,
        &GoapPlanner::default(),
        &Blackboard::new(),
        &GoapState::new(),
        &state(&[(DOOR_OPEN, 1)]),
    );
    assert_eq!(outcome.plan().unwrap().cost, FP::ZERO);
}
