//! Goal and action assets.

use std::collections::{BTreeMap, BTreeSet};

use ai_core::{AiFunction, AiObserver, AssetId, Blackboard, Frame, FunctionContext, FP};

use crate::error::GoapError;
use crate::state::{GoapFact, GoapState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoapActionStatus {
    Continue,
    IsDone,
    IsFailed,
}

/// What an action's runtime hooks see.
pub struct GoapContext<'a, F: Frame> {
    pub frame: &'a mut F,
    pub entity: F::Entity,
    pub blackboard: &'a mut Blackboard,
    pub observer: &'a mut dyn AiObserver,
    pub(crate) action: u16,
}

impl<'a, F: Frame> GoapContext<'a, F> {
    /// Index of the action in its asset.
    pub fn action(&self) -> u16 {
        self.action
    }

    pub fn time(&self) -> FP {
        self.frame.time()
    }

    pub fn functions(&self) -> FunctionContext<'_, F> {
        FunctionContext::new(&*self.frame, self.entity, &*self.blackboard)
    }
}

/// Runtime behavior of an action. Shared by every agent using the asset.
pub trait GoapActionLogic<F: Frame>: 'static {
    /// Contextual veto and cost adjustment, evaluated once per planning cycle. `None` removes the
    /// action from this search.
    fn validate_action(&self, _cx: &FunctionContext<'_, F>, cost: FP) -> Option<FP> {
        Some(cost)
    }

    /// Veto for a regressed search state: the facts still required before this action runs.
    fn validate_plan_state(&self, _required: &GoapState) -> bool {
        true
    }

    fn activate(&self, _cx: &mut GoapContext<'_, F>) {}

    fn update(&self, cx: &mut GoapContext<'_, F>) -> GoapActionStatus;

    fn deactivate(&self, _cx: &mut GoapContext<'_, F>) {}
}

/// Action logic that completes on its first update.
#[derive(Debug, Clone, Copy, Default)]
pub struct InstantAction;

impl<F: Frame> GoapActionLogic<F> for InstantAction {
    fn update(&self, _cx: &mut GoapContext<'_, F>) -> GoapActionStatus {
        GoapActionStatus::IsDone
    }
}

pub struct GoapActionDef<F: Frame> {
    pub name: String,
    pub conditions: GoapState,
    pub effects: GoapState,
    pub cost: AiFunction,
    pub interruptible: bool,
    pub logic: Box<dyn GoapActionLogic<F>>,
}

impl<F: Frame> GoapActionDef<F> {
    pub fn new(name: impl Into<String>, logic: impl GoapActionLogic<F>) -> Self {
        Self {
            name: name.into(),
            conditions: GoapState::new(),
            effects: GoapState::new(),
            cost: AiFunction::fp(FP::ONE),
            interruptible: false,
            logic: Box::new(logic),
        }
    }

    pub fn with_condition(mut self, fact: GoapFact, value: i32) -> Self {
        self.conditions.set(fact, value);
        self
    }

    pub fn with_effect(mut self, fact: GoapFact, value: i32) -> Self {
        self.effects.set(fact, value);
        self
    }

    pub fn with_cost(mut self, cost: AiFunction) -> Self {
        self.cost = cost;
        self
    }

    pub fn interruptible(mut self, interruptible: bool) -> Self {
        self.interruptible = interruptible;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GoapGoalDef {
    pub name: String,
    pub relevancy: AiFunction,
    pub target: GoapState,
    /// When set, the goal counts as finished while this resolves to `true`; otherwise it is
    /// finished while the current state satisfies `target`.
    pub finish: Option<AiFunction>,
}

impl GoapGoalDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            relevancy: AiFunction::fp(FP::ONE),
            target: GoapState::new(),
            finish: None,
        }
    }

    pub fn with_relevancy(mut self, relevancy: AiFunction) -> Self {
        self.relevancy = relevancy;
        self
    }

    pub fn with_target(mut self, fact: GoapFact, value: i32) -> Self {
        self.target.set(fact, value);
        self
    }

    pub fn with_finish(mut self, finish: AiFunction) -> Self {
        self.finish = Some(finish);
        self
    }

    pub fn is_finished<F: Frame>(&self, cx: &FunctionContext<'_, F>, state: &GoapState) -> bool {
        match &self.finish {
            Some(finish) => finish.resolve_bool(cx),
            None => state.satisfies(&self.target),
        }
    }
}

/// Validated goal/action set. Built with `GoapAsset::builder`.
pub struct GoapAsset<F: Frame> {
    id: AssetId,
    name: String,
    goals: Vec<GoapGoalDef>,
    actions: Vec<GoapActionDef<F>>,
    bindings: BTreeMap<GoapFact, u64>,
    initial: GoapState,
    default_goal: Option<usize>,
}

impl<F: Frame> GoapAsset<F> {
    pub const MAX_ACTIONS: usize = u16::MAX as usize;

    pub fn builder(id: AssetId, name: impl Into<String>) -> GoapAssetBuilder<F> {
        GoapAssetBuilder {
            id,
            name: name.into(),
            goals: Vec::new(),
            actions: Vec::new(),
            bindings: BTreeMap::new(),
            initial: GoapState::new(),
            default_goal: None,
        }
    }

    pub fn id(&self) -> AssetId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn goals(&self) -> &[GoapGoalDef] {
        &self.goals
    }

    pub fn goal(&self, index: usize) -> Option<&GoapGoalDef> {
        self.goals.get(index)
    }

    pub fn actions(&self) -> &[GoapActionDef<F>] {
        &self.actions
    }

    pub fn action(&self, index: u16) -> Option<&GoapActionDef<F>> {
        self.actions.get(index as usize)
    }

    pub fn find_action(&self, name: &str) -> Option<u16> {
        self.actions
            .iter()
            .position(|a| a.name == name)
            .map(|i| i as u16)
    }

    pub fn find_goal(&self, name: &str) -> Option<usize> {
        self.goals.iter().position(|g| g.name == name)
    }

    /// Facts refreshed from the blackboard every planning cycle.
    pub fn bindings(&self) -> &BTreeMap<GoapFact, u64> {
        &self.bindings
    }

    /// World state a fresh agent starts with.
    pub fn initial_state(&self) -> &GoapState {
        &self.initial
    }

    pub fn default_goal(&self) -> Option<usize> {
        self.default_goal
    }
}

pub struct GoapAssetBuilder<F: Frame> {
    id: AssetId,
    name: String,
    goals: Vec<GoapGoalDef>,
    actions: Vec<GoapActionDef<F>>,
    bindings: BTreeMap<GoapFact, u64>,
    initial: GoapState,
    default_goal: Option<String>,
}

impl<F: Frame> GoapAssetBuilder<F> {
    pub fn goal(mut self, goal: GoapGoalDef) -> Self {
        self.goals.push(goal);
        self
    }

    pub fn action(mut self, action: GoapActionDef<F>) -> Self {
        self.actions.push(action);
        self
    }

    /// Reads `fact` from blackboard key `key` (a `bool` or `i32`) at every planning cycle.
    pub fn bind(mut self, fact: GoapFact, key: u64) -> Self {
        self.bindings.insert(fact, key);
        self
    }

    pub fn initial_state(mut self, state: GoapState) -> Self {
        self.initial = state;
        self
    }

    /// Goal tried when no relevant goal can be planned.
    pub fn default_goal(mut self, name: impl Into<String>) -> Self {
        self.default_goal = Some(name.into());
        self
    }

    pub fn build(self) -> Result<GoapAsset<F>, GoapError> {
        let result = self.validate();
        if let Err(err) = &result {
            tracing::error!(asset = %self.name, error = %err, "goap asset rejected");
        }
        let default_goal = result?;

        tracing::debug!(
            asset = %self.name,
            goals = self.goals.len(),
            actions = self.actions.len(),
            "goap asset built"
        );
        Ok(GoapAsset {
            id: self.id,
            name: self.name,
            goals: self.goals,
            actions: self.actions,
            bindings: self.bindings,
            initial: self.initial,
            default_goal,
        })
    }

    fn validate(&self) -> Result<Option<usize>, GoapError> {
        if self.goals.is_empty() {
            return Err(GoapError::NoGoals {
                asset: self.name.clone(),
            });
        }
        if self.actions.len() > GoapAsset::<F>::MAX_ACTIONS {
            return Err(GoapError::TooManyActions {
                count: self.actions.len(),
                max: GoapAsset::<F>::MAX_ACTIONS,
            });
        }

        let mut names = BTreeSet::new();
        for goal in &self.goals {
            if !names.insert(goal.name.as_str()) {
                return Err(GoapError::Duplicate {
                    kind: "goal",
                    name: goal.name.clone(),
                });
            }
            if goal.target.is_empty() {
                return Err(GoapError::EmptyTarget {
                    goal: goal.name.clone(),
                });
            }
        }

        let mut names = BTreeSet::new();
        for action in &self.actions {
            if !names.insert(action.name.as_str()) {
                return Err(GoapError::Duplicate {
                    kind: "action",
                    name: action.name.clone(),
                });
            }
            if action.effects.is_empty() {
                return Err(GoapError::NoEffects {
                    action: action.name.clone(),
                });
            }
        }

        match &self.default_goal {
            None => Ok(None),
            Some(name) => self
                .goals
                .iter()
                .position(|g| &g.name == name)
                .map(Some)
                .ok_or_else(|| GoapError::UnknownDefaultGoal { name: name.clone() }),
        }
    }
}
