use std::cell::RefCell;
use std::rc::Rc;

use ai_core::{
    tick_brains, AgentCommand, AiError, AiObserver, BbKey, Blackboard, Brain, BrainConfig, Frame,
    ListHandle, NullObserver, Policy, Signal, SignalBridge, SignalKind, SignalRoute, SimFrame, FP,
};

const TICKS: BbKey<i32> = BbKey::new(1);
const STUNNED: BbKey<bool> = BbKey::new(2);

#[derive(Default)]
struct CountingPolicy {
    timers: Option<ListHandle<FP>>,
    commands: Rc<RefCell<Vec<AgentCommand>>>,
    fail_init: bool,
}

impl Policy<SimFrame> for CountingPolicy {
    fn init(&mut self, frame: &mut SimFrame, _entity: u64, bb: &mut Blackboard) -> Result<(), AiError> {
        if self.fail_init {
            return Err(AiError::invalid_asset("counting", "refused"));
        }
        bb.register(TICKS, 0)?;
        self.timers = Some(frame.lists_mut().allocate_filled(4, FP::ZERO));
        Ok(())
    }

    fn tick(&mut self, _frame: &mut SimFrame, _entity: u64, bb: &mut Blackboard, _observer: &mut dyn AiObserver) {
        let n = bb.get(TICKS);
        let _ = bb.set(TICKS, n + 1);
    }

    fn command(&mut self, _frame: &mut SimFrame, _entity: u64, _bb: &mut Blackboard, command: AgentCommand) {
        self.commands.borrow_mut().push(command);
    }

    fn free(&mut self, frame: &mut SimFrame, _entity: u64, _bb: &mut Blackboard) -> Result<(), AiError> {
        if let Some(handle) = self.timers.take() {
            frame.lists_mut().free(handle)?;
        }
        Ok(())
    }
}

#[test]
fn think_decimation_skips_ticks() {
    let mut frame = SimFrame::default();
    let brain = Brain::spawn(&mut frame, 3, Blackboard::new(), Box::new(CountingPolicy::default()))
        .unwrap()
        .with_config(BrainConfig {
            think_every_ticks: 2,
            think_offset_ticks: 0,
        });
    let mut brains = vec![brain];
    for _ in 0..6 {
        tick_brains(&mut frame, &mut brains, &mut NullObserver);
        frame.advance();
    }
    assert_eq!(brains[0].blackboard.get(TICKS), 3);

    let brain = brains.pop().unwrap();
    brain.despawn(&mut frame).unwrap();
    assert_eq!(frame.lists().live(), 0);
}

#[test]
fn deterministic_offsets_spread_agents() {
    let a = BrainConfig::deterministic(4u64, 3);
    let b = BrainConfig::deterministic(5u64, 3);
    assert_ne!(a.think_offset_ticks, b.think_offset_ticks);
    assert_eq!((0..9).filter(|t| a.should_think(*t)).count(), 3);
}

#[test]
fn failed_init_allocates_nothing() {
    let mut frame = SimFrame::default();
    let policy = CountingPolicy {
        fail_init: true,
        ..CountingPolicy::default()
    };
    assert!(Brain::spawn(&mut frame, 1, Blackboard::new(), Box::new(policy)).is_err());
    assert_eq!(frame.lists().allocations(), 0);
}

#[test]
fn spawn_despawn_cycles_do_not_leak() {
    let mut frame = SimFrame::default();
    for i in 0..10_000u64 {
        let mut brain =
            Brain::spawn(&mut frame, i, Blackboard::new(), Box::new(CountingPolicy::default())).unwrap();
        brain.tick(&mut frame, &mut NullObserver);
        brain.despawn(&mut frame).unwrap();
    }
    assert_eq!(frame.lists().live(), 0);
    assert_eq!(frame.lists().allocations(), 10_000);
    assert_eq!(frame.lists().allocations(), frame.lists().frees());
}

#[test]
fn signals_write_blackboard_and_deliver_commands() {
    let mut frame = SimFrame::default();
    let mut bb = Blackboard::new();
    bb.register(STUNNED, false).unwrap();
    let commands = Rc::new(RefCell::new(Vec::new()));
    let policy = CountingPolicy {
        commands: Rc::clone(&commands),
        ..CountingPolicy::default()
    };
    let mut brain = Brain::spawn(&mut frame, 1, bb, Box::new(policy)).unwrap();

    let stun = SignalKind(10);
    let bridge = SignalBridge::new()
        .route(stun, SignalRoute::WritePayload { key: STUNNED.id() })
        .route(stun, SignalRoute::Command(AgentCommand::ResetTree));

    brain.signal(
        &mut frame,
        &bridge,
        &Signal::new(stun).with_payload(true.into()),
    );
    assert!(brain.blackboard.get(STUNNED));
    assert_eq!(*commands.borrow(), vec![AgentCommand::ResetTree]);

    // Unknown kinds are ignored.
    brain.signal(&mut frame, &bridge, &Signal::new(SignalKind(99)));
    assert_eq!(commands.borrow().len(), 1);
    brain.despawn(&mut frame).unwrap();
}
