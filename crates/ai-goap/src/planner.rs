//! Backward uniform-cost search.
//!
//! Search nodes are the facts still required before the remaining suffix of the plan can run.
//! The root requires the goal's target; an action is relevant when its effects produce at least
//! one required fact without contradicting another, and regressing through it replaces the facts
//! it produces with its conditions. A node is a solution once the start state satisfies it.

use core::cmp::Ordering;
use std::collections::{BTreeMap, BinaryHeap};

use ai_core::{Frame, FunctionContext, GoapConfig, FP};

use crate::asset::GoapAsset;
use crate::state::GoapState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    /// Action indices in execution order.
    pub actions: Vec<u16>,
    pub cost: FP,
    pub expansions: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanOutcome {
    Found(Plan),
    NoPlan,
    /// The expansion budget ran out before a plan was found.
    Exhausted,
}

impl PlanOutcome {
    pub fn plan(&self) -> Option<&Plan> {
        match self {
            PlanOutcome::Found(plan) => Some(plan),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GoapPlanner {
    config: GoapConfig,
}

struct SearchNode {
    required: GoapState,
    parent: Option<usize>,
    action: u16,
    depth: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct OpenNode {
    cost: FP,
    tie: u64,
    node: usize,
}

impl Ord for OpenNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed: BinaryHeap pops the cheapest, earliest-inserted node first.
        other
            .cost
            .cmp(&self.cost)
            .then_with(|| other.tie.cmp(&self.tie))
    }
}

impl PartialOrd for OpenNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl GoapPlanner {
    pub fn new(config: GoapConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> GoapConfig {
        self.config
    }

    /// Cheapest action sequence that takes `start` to a state satisfying `target`. Equal-cost
    /// plans are ordered by action declaration order.
    pub fn plan<F: Frame>(
        &self,
        asset: &GoapAsset<F>,
        cx: &FunctionContext<'_, F>,
        start: &GoapState,
        target: &GoapState,
    ) -> PlanOutcome {
        if start.satisfies(target) {
            return PlanOutcome::Found(Plan {
                actions: Vec::new(),
                cost: FP::ZERO,
                expansions: 0,
            });
        }

        // Costs and contextual vetoes are evaluated once per search.
        let costs: Vec<Option<FP>> = asset
            .actions()
            .iter()
            .map(|action| {
                let base = action.cost.resolve_fp(cx).max(FP::ZERO);
                action
                    .logic
                    .validate_action(cx, base)
                    .map(|cost| cost.max(FP::ZERO))
            })
            .collect();

        let mut nodes = vec![SearchNode {
            required: target.clone(),
            parent: None,
            action: 0,
            depth: 0,
        }];
        let mut best: BTreeMap<GoapState, FP> = BTreeMap::new();
        best.insert(target.clone(), FP::ZERO);
        let mut open = BinaryHeap::new();
        open.push(OpenNode {
            cost: FP::ZERO,
            tie: 0,
            node: 0,
        });
        let mut tie: u64 = 1;
        let mut expansions: u32 = 0;

        while let Some(current) = open.pop() {
            let required = nodes[current.node].required.clone();
            let depth = nodes[current.node].depth;
            if best.get(&required).is_some_and(|b| *b < current.cost) {
                continue; // stale heap entry
            }

            if start.satisfies(&required) {
                let mut actions = Vec::with_capacity(depth as usize);
                let mut index = current.node;
                while let Some(parent) = nodes[index].parent {
                    actions.push(nodes[index].action);
                    index = parent;
                }
                tracing::trace!(
                    asset = %asset.name(),
                    expansions,
                    length = actions.len(),
                    "goap plan found"
                );
                return PlanOutcome::Found(Plan {
                    actions,
                    cost: current.cost,
                    expansions,
                });
            }

            expansions += 1;
            if expansions > self.config.max_expansions {
                tracing::debug!(asset = %asset.name(), expansions, "goap search budget exhausted");
                return PlanOutcome::Exhausted;
            }
            if depth >= self.config.max_plan_length {
                continue;
            }

            for (index, action) in asset.actions().iter().enumerate() {
                let Some(cost) = costs[index] else {
                    continue;
                };
                let produces = action
                    .effects
                    .iter()
                    .any(|(fact, value)| required.get(fact) == Some(value));
                if !produces || required.conflicts(&action.effects) {
                    continue;
                }

                let mut next: GoapState = required
                    .iter()
                    .filter(|(fact, _)| action.effects.get(*fact).is_none())
                    .collect();
                if next.conflicts(&action.conditions) {
                    continue;
                }
                next.apply(&action.conditions);
                if !action.logic.validate_plan_state(&next) {
                    continue;
                }

                let g = current.cost + cost;
                if best.get(&next).is_some_and(|b| *b <= g) {
                    continue;
                }
                best.insert(next.clone(), g);
                nodes.push(SearchNode {
                    required: next,
                    parent: Some(current.node),
                    action: index as u16,
                    depth: depth + 1,
                });
                open.push(OpenNode {
                    cost: g,
                    tie,
                    node: nodes.len() - 1,
                });
                tie += 1;
            }
        }

        PlanOutcome::NoPlan
    }
}
