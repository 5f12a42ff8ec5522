//! Per-agent GOAP runtime: goal selection, planning and action execution.

use std::sync::Arc;

use ai_core::{
    AgentId, AiObserver, Blackboard, BlackboardTag, BlackboardValue, Frame, FunctionContext,
    GoapConfig, ListHandle, NodeStatus, NullObserver, FP,
};

use crate::asset::{GoapActionStatus, GoapAsset, GoapContext};
use crate::error::GoapError;
use crate::planner::{GoapPlanner, PlanOutcome};
use crate::state::GoapState;

/// Planning and execution state of one entity.
///
/// The current plan lives in an arena list allocated by `init` and released by `free`.
pub struct GoapAgent<F: Frame> {
    asset: Arc<GoapAsset<F>>,
    planner: GoapPlanner,
    plan: Option<ListHandle<u16>>,
    world: GoapState,
    goal: Option<usize>,
    step: usize,
    active: Option<u16>,
    replan: bool,
    idle: bool,
}

impl<F: Frame> GoapAgent<F> {
    /// Checks the asset's fact bindings against `blackboard` and allocates the plan list.
    pub fn init(
        asset: Arc<GoapAsset<F>>,
        config: GoapConfig,
        frame: &mut F,
        entity: F::Entity,
        blackboard: &Blackboard,
    ) -> Result<Self, GoapError> {
        for (&fact, &key) in asset.bindings() {
            match blackboard.tag_of(key) {
                Some(BlackboardTag::Bool) | Some(BlackboardTag::Int) => {}
                _ => {
                    tracing::error!(asset = %asset.name(), fact = fact.0, key, "invalid fact binding");
                    return Err(GoapError::InvalidBinding { fact, key });
                }
            }
        }

        let plan = frame
            .lists_mut()
            .allocate(config.max_plan_length as usize);
        tracing::debug!(
            entity = entity.stable_id(),
            asset = %asset.name(),
            "goap agent initialized"
        );
        Ok(Self {
            world: asset.initial_state().clone(),
            asset,
            planner: GoapPlanner::new(config),
            plan: Some(plan),
            goal: None,
            step: 0,
            active: None,
            replan: true,
            idle: false,
        })
    }

    /// Deactivates the running action and releases the plan list. A second call is a no-op.
    pub fn free(
        &mut self,
        frame: &mut F,
        entity: F::Entity,
        blackboard: &mut Blackboard,
    ) -> Result<(), GoapError> {
        let Some(plan) = self.plan else {
            return Ok(());
        };
        self.stop_action(frame, entity, blackboard, &mut NullObserver);
        self.plan = None;
        self.goal = None;
        frame.lists_mut().free(plan)?;
        tracing::debug!(entity = entity.stable_id(), asset = %self.asset.name(), "goap agent freed");
        Ok(())
    }

    pub fn asset(&self) -> &Arc<GoapAsset<F>> {
        &self.asset
    }

    pub fn is_initialized(&self) -> bool {
        self.plan.is_some()
    }

    pub fn goal(&self) -> Option<usize> {
        self.goal
    }

    pub fn active_action(&self) -> Option<u16> {
        self.active
    }

    /// Facts owned by the agent (effects of completed actions and the asset's initial state).
    pub fn world(&self) -> &GoapState {
        &self.world
    }

    /// Remaining plan, including the running action.
    pub fn plan(&self, frame: &F) -> Vec<u16> {
        self.plan
            .and_then(|plan| frame.lists().get(plan).ok())
            .map(|plan| plan.iter().skip(self.step).copied().collect())
            .unwrap_or_default()
    }

    /// Agent facts overlaid with the facts bound to blackboard keys.
    pub fn current_state(&self, blackboard: &Blackboard) -> GoapState {
        let mut state = self.world.clone();
        for (&fact, &key) in self.asset.bindings() {
            match blackboard.value(key) {
                Some(BlackboardValue::Bool(value)) => state.set(fact, value as i32),
                Some(BlackboardValue::Int(value)) => state.set(fact, value),
                _ => {}
            }
        }
        state
    }

    /// Plans again at the next update; the running action keeps running until then.
    pub fn request_replan(&mut self) {
        self.replan = true;
    }

    /// Deactivates the running action and plans again at the next update.
    pub fn stop(
        &mut self,
        frame: &mut F,
        entity: F::Entity,
        blackboard: &mut Blackboard,
        observer: &mut dyn AiObserver,
    ) {
        self.stop_action(frame, entity, blackboard, observer);
        self.replan = true;
    }

    /// Runs one planning/execution cycle.
    ///
    /// `Success` once the selected goal is reached, `Failure` when nothing can be planned or an
    /// action fails, `Running` otherwise.
    pub fn update(
        &mut self,
        frame: &mut F,
        entity: F::Entity,
        blackboard: &mut Blackboard,
        observer: &mut dyn AiObserver,
    ) -> Result<NodeStatus, GoapError> {
        let handle = self.plan.ok_or_else(|| {
            GoapError::Ai(ai_core::AiError::invalid_asset(
                self.asset.name(),
                "agent used after free",
            ))
        })?;
        let state = self.current_state(blackboard);

        if let (Some(goal), false) = (self.goal, self.replan) {
            let (finished, interrupt) = {
                let cx = FunctionContext::new(&*frame, entity, &*blackboard);
                let finished = self
                    .asset
                    .goal(goal)
                    .is_some_and(|def| def.is_finished(&cx, &state));
                (finished, !finished && self.outranked(&cx, &state, goal))
            };
            if finished {
                tracing::debug!(entity = entity.stable_id(), goal, "goap goal finished");
                self.stop_action(frame, entity, blackboard, observer);
                self.goal = None;
                self.replan = true;
                return Ok(NodeStatus::Success);
            }
            if interrupt {
                tracing::debug!(entity = entity.stable_id(), goal, "goap plan interrupted");
                self.stop_action(frame, entity, blackboard, observer);
                self.replan = true;
            }
        }

        if self.replan || self.goal.is_none() {
            self.stop_action(frame, entity, blackboard, observer);
            if !self.select_and_plan(frame, entity, blackboard, observer, &state, handle)? {
                return Ok(NodeStatus::Failure);
            }
        }

        loop {
            let Some(action) = frame.lists().get(handle)?.get(self.step).copied() else {
                tracing::debug!(entity = entity.stable_id(), goal = ?self.goal, "goap goal reached");
                self.goal = None;
                self.replan = true;
                return Ok(NodeStatus::Success);
            };
            if self.active != Some(action) {
                self.activate(action, frame, entity, blackboard, observer);
            }

            let asset = Arc::clone(&self.asset);
            let Some(def) = asset.action(action) else {
                return Ok(NodeStatus::Failure);
            };
            let status = {
                let mut cx = GoapContext {
                    frame: &mut *frame,
                    entity,
                    blackboard: &mut *blackboard,
                    observer: &mut *observer,
                    action,
                };
                def.logic.update(&mut cx)
            };

            match status {
                GoapActionStatus::Continue => return Ok(NodeStatus::Running),
                GoapActionStatus::IsDone => {
                    self.world.apply(&def.effects);
                    self.stop_action(frame, entity, blackboard, observer);
                    self.step += 1;
                }
                GoapActionStatus::IsFailed => {
                    tracing::debug!(
                        entity = entity.stable_id(),
                        action = %def.name,
                        "goap action failed, replanning"
                    );
                    self.stop_action(frame, entity, blackboard, observer);
                    frame.lists_mut().get_mut(handle)?.clear();
                    self.step = 0;
                    self.goal = None;
                    self.replan = true;
                    return Ok(NodeStatus::Failure);
                }
            }
        }
    }

    /// Relevant, unfinished goals by descending relevancy; declaration order breaks ties.
    fn ranked_goals(&self, cx: &FunctionContext<'_, F>, state: &GoapState) -> Vec<(usize, FP)> {
        let mut ranked: Vec<(usize, FP)> = self
            .asset
            .goals()
            .iter()
            .enumerate()
            .filter(|(_, goal)| !goal.is_finished(cx, state))
            .map(|(index, goal)| (index, goal.relevancy.resolve_fp(cx)))
            .filter(|(_, relevancy)| *relevancy > FP::ZERO)
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked
    }

    /// Whether a more relevant goal with a reachable plan now beats `goal`, so the running action
    /// may be abandoned. Goals that cannot be planned never interrupt.
    fn outranked(&self, cx: &FunctionContext<'_, F>, state: &GoapState, goal: usize) -> bool {
        let interruptible = match self.active.and_then(|a| self.asset.action(a)) {
            Some(action) => action.interruptible,
            None => true,
        };
        if !interruptible {
            return false;
        }
        let current = self
            .asset
            .goal(goal)
            .map(|def| def.relevancy.resolve_fp(cx))
            .unwrap_or(FP::ZERO);
        self.ranked_goals(cx, state)
            .into_iter()
            .take_while(|&(_, relevancy)| relevancy > current)
            .filter(|&(other, _)| other != goal)
            .any(|(other, _)| {
                self.asset.goal(other).is_some_and(|def| {
                    matches!(
                        self.planner.plan(&self.asset, cx, state, &def.target),
                        PlanOutcome::Found(_)
                    )
                })
            })
    }

    fn select_and_plan(
        &mut self,
        frame: &mut F,
        entity: F::Entity,
        blackboard: &Blackboard,
        observer: &mut dyn AiObserver,
        state: &GoapState,
        handle: ListHandle<u16>,
    ) -> Result<bool, GoapError> {
        self.replan = false;
        self.goal = None;
        self.step = 0;

        let chosen = {
            let cx = FunctionContext::new(&*frame, entity, blackboard);
            let mut candidates: Vec<usize> = self
                .ranked_goals(&cx, state)
                .into_iter()
                .map(|(goal, _)| goal)
                .collect();
            if let Some(default) = self.asset.default_goal() {
                let finished = self
                    .asset
                    .goal(default)
                    .is_some_and(|def| def.is_finished(&cx, state));
                if !finished && !candidates.contains(&default) {
                    candidates.push(default);
                }
            }

            let mut chosen = None;
            for goal in candidates {
                let Some(def) = self.asset.goal(goal) else {
                    continue;
                };
                match self.planner.plan(&self.asset, &cx, state, &def.target) {
                    PlanOutcome::Found(plan) => {
                        chosen = Some((goal, plan));
                        break;
                    }
                    PlanOutcome::NoPlan | PlanOutcome::Exhausted => {
                        tracing::trace!(entity = entity.stable_id(), goal = %def.name, "no plan for goal");
                    }
                }
            }
            chosen
        };

        let tick = frame.tick();
        let eid = entity.stable_id();
        let Some((goal, plan)) = chosen else {
            frame.lists_mut().get_mut(handle)?.clear();
            observer.no_plan(tick, eid);
            if !self.idle {
                tracing::warn!(entity = eid, asset = %self.asset.name(), "no goal can be planned, idling");
            }
            self.idle = true;
            return Ok(false);
        };
        self.idle = false;

        let list = frame.lists_mut().get_mut(handle)?;
        list.clear();
        list.extend_from_slice(&plan.actions);
        self.goal = Some(goal);

        let actions: Vec<u32> = plan.actions.iter().map(|&a| a as u32).collect();
        observer.goal_selected(tick, eid, goal as u32);
        observer.plan_found(tick, eid, goal as u32, &actions);
        tracing::debug!(
            entity = eid,
            goal,
            length = actions.len(),
            cost = plan.cost.to_f64(),
            expansions = plan.expansions,
            "goap plan selected"
        );
        Ok(true)
    }

    fn activate(
        &mut self,
        action: u16,
        frame: &mut F,
        entity: F::Entity,
        blackboard: &mut Blackboard,
        observer: &mut dyn AiObserver,
    ) {
        let asset = Arc::clone(&self.asset);
        let Some(def) = asset.action(action) else {
            return;
        };
        self.active = Some(action);
        observer.action_activated(frame.tick(), entity.stable_id(), action as u32);
        tracing::trace!(entity = entity.stable_id(), action = %def.name, "goap action activated");
        let mut cx = GoapContext {
            frame,
            entity,
            blackboard,
            observer,
            action,
        };
        def.logic.activate(&mut cx);
    }

    fn stop_action(
        &mut self,
        frame: &mut F,
        entity: F::Entity,
        blackboard: &mut Blackboard,
        observer: &mut dyn AiObserver,
    ) {
        let Some(action) = self.active.take() else {
            return;
        };
        let asset = Arc::clone(&self.asset);
        let Some(def) = asset.action(action) else {
            return;
        };
        let tick = frame.tick();
        {
            let mut cx = GoapContext {
                frame: &mut *frame,
                entity,
                blackboard: &mut *blackboard,
                observer: &mut *observer,
                action,
            };
            def.logic.deactivate(&mut cx);
        }
        observer.action_deactivated(tick, entity.stable_id(), action as u32);
        tracing::trace!(entity = entity.stable_id(), action = %def.name, "goap action deactivated");
    }
}
