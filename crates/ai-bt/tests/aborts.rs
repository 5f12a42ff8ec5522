mod common;

use std::sync::Arc;

use ai_bt::{AbortMode, BlackboardCondition, BtAgent, NodeId, NodeSpec, SetBlackboard};
use ai_core::{AiFunction, BbKey, Blackboard, BtConfig, Frame, NodeStatus, NullObserver, SimFrame};
use ai_tools::TraceRecorder;
use common::{agent, entries, log, tree, Record};

const ARMED: BbKey<bool> = BbKey::new(1);
const DANGER: BbKey<bool> = BbKey::new(2);
const GO: BbKey<bool> = BbKey::new(3);

#[test]
fn self_abort_exits_leaf_and_fails_in_the_same_tick() {
    let log = log();
    let tree = tree(NodeSpec::decorator(
        "guard",
        AbortMode::SelfOnly,
        BlackboardCondition::is_true(ARMED.id()),
        Record::leaf("work", &log, NodeStatus::Running),
    ));
    let mut frame = SimFrame::default();
    let mut bb = Blackboard::new();
    bb.register(ARMED, true).unwrap();
    let mut agent = agent(&tree, &mut frame, &mut bb);

    assert_eq!(
        agent.tick(&mut frame, 1, &mut bb, &mut NullObserver).unwrap(),
        NodeStatus::Running
    );
    frame.advance();

    bb.set(ARMED, false).unwrap();
    let mut recorder: TraceRecorder = TraceRecorder::default();
    let status = agent.tick(&mut frame, 1, &mut bb, &mut recorder).unwrap();

    assert_eq!(status, NodeStatus::Failure);
    assert_eq!(
        entries(&log),
        vec!["work:enter", "work:update", "work:exit:Abort"]
    );
    let exits: Vec<(u64, u64)> = recorder
        .sink()
        .with_tag("bt.node.exit")
        .map(|e| (e.a, e.b))
        .collect();
    assert_eq!(
        exits,
        vec![
            (2, NodeStatus::Abort.code()),
            (1, NodeStatus::Failure.code()),
            (0, NodeStatus::Failure.code()),
        ]
    );
    agent.free(&mut frame, 1, &mut bb).unwrap();
}

#[test]
fn write_inside_the_guarded_subtree_aborts_in_the_same_tick() {
    let log = log();
    // root 0, guard 1, body 2, disarm 3, work 4
    let tree = tree(NodeSpec::decorator(
        "guard",
        AbortMode::SelfOnly,
        BlackboardCondition::is_true(ARMED.id()),
        NodeSpec::sequence(
            "body",
            vec![
                NodeSpec::leaf("disarm", SetBlackboard::new(ARMED.id(), AiFunction::bool(false))),
                Record::leaf("work", &log, NodeStatus::Running),
            ],
        ),
    ));
    let mut frame = SimFrame::default();
    let mut bb = Blackboard::new();
    bb.register(ARMED, true).unwrap();
    let mut agent = agent(&tree, &mut frame, &mut bb);
    let mut recorder: TraceRecorder = TraceRecorder::default();

    let status = agent.tick(&mut frame, 1, &mut bb, &mut recorder).unwrap();

    assert_eq!(status, NodeStatus::Failure);
    assert!(entries(&log).is_empty());
    assert_eq!(agent.cursor(), None);
    let exits: Vec<(u64, u64)> = recorder
        .sink()
        .with_tag("bt.node.exit")
        .map(|e| (e.a, e.b))
        .collect();
    assert_eq!(
        exits,
        vec![
            (3, NodeStatus::Success.code()),
            (2, NodeStatus::Abort.code()),
            (1, NodeStatus::Failure.code()),
            (0, NodeStatus::Failure.code()),
        ]
    );
    agent.free(&mut frame, 1, &mut bb).unwrap();
}

#[test]
fn unchanged_write_does_not_trigger_an_abort() {
    let log = log();
    let tree = tree(NodeSpec::decorator(
        "guard",
        AbortMode::SelfOnly,
        BlackboardCondition::is_true(ARMED.id()),
        Record::leaf("work", &log, NodeStatus::Running),
    ));
    let mut frame = SimFrame::default();
    let mut bb = Blackboard::new();
    bb.register(ARMED, true).unwrap();
    let mut agent = agent(&tree, &mut frame, &mut bb);

    agent.tick(&mut frame, 1, &mut bb, &mut NullObserver).unwrap();
    assert!(!bb.set(ARMED, true).unwrap());
    assert_eq!(
        agent.tick(&mut frame, 1, &mut bb, &mut NullObserver).unwrap(),
        NodeStatus::Running
    );
    assert!(!entries(&log).iter().any(|e| e.contains("exit")));
    agent.free(&mut frame, 1, &mut bb).unwrap();
}

#[test]
fn lower_priority_abort_preempts_running_sibling() {
    let log = log();
    // root 0, main 1, flee 2, run 3, idle 4
    let tree = tree(NodeSpec::selector(
        "main",
        vec![
            NodeSpec::decorator(
                "flee",
                AbortMode::LowerPriority,
                BlackboardCondition::is_true(DANGER.id()),
                Record::leaf("run", &log, NodeStatus::Running),
            ),
            Record::leaf("idle", &log, NodeStatus::Running),
        ],
    ));
    let mut frame = SimFrame::default();
    let mut bb = Blackboard::new();
    bb.register(DANGER, false).unwrap();
    let mut agent = agent(&tree, &mut frame, &mut bb);

    agent.tick(&mut frame, 1, &mut bb, &mut NullObserver).unwrap();
    assert_eq!(agent.cursor(), Some(NodeId(4)));

    bb.set(DANGER, true).unwrap();
    frame.advance();
    agent.tick(&mut frame, 1, &mut bb, &mut NullObserver).unwrap();

    assert_eq!(
        entries(&log),
        vec![
            "idle:enter",
            "idle:update",
            "idle:exit:Abort",
            "run:enter",
            "run:update",
        ]
    );
    assert_eq!(agent.cursor(), Some(NodeId(3)));
    assert_eq!(agent.status(&frame, NodeId(4)), NodeStatus::Abort);
    agent.free(&mut frame, 1, &mut bb).unwrap();
}

#[test]
fn lower_priority_abort_spares_completed_siblings() {
    let log = log();
    // root 0, main 1, prep 2, gate 3, mark 4, work 5, later 6
    let tree = tree(NodeSpec::sequence(
        "main",
        vec![
            Record::leaf("prep", &log, NodeStatus::Success),
            NodeSpec::decorator(
                "gate",
                AbortMode::LowerPriority,
                BlackboardCondition::is_true(GO.id()),
                Record::leaf("mark", &log, NodeStatus::Success),
            ),
            Record::leaf("work", &log, NodeStatus::Running),
            Record::leaf("later", &log, NodeStatus::Running),
        ],
    ));
    let mut frame = SimFrame::default();
    let mut bb = Blackboard::new();
    bb.register(GO, true).unwrap();
    let mut agent = agent(&tree, &mut frame, &mut bb);

    agent.tick(&mut frame, 1, &mut bb, &mut NullObserver).unwrap();
    assert_eq!(agent.cursor(), Some(NodeId(5)));

    // A failing re-check leaves everything alone.
    bb.set(GO, false).unwrap();
    frame.advance();
    agent.tick(&mut frame, 1, &mut bb, &mut NullObserver).unwrap();
    assert_eq!(agent.status(&frame, NodeId(5)), NodeStatus::Running);

    bb.set(GO, true).unwrap();
    frame.advance();
    agent.tick(&mut frame, 1, &mut bb, &mut NullObserver).unwrap();

    assert_eq!(agent.status(&frame, NodeId(2)), NodeStatus::Success);
    assert_eq!(agent.status(&frame, NodeId(3)), NodeStatus::Success);
    assert_eq!(agent.status(&frame, NodeId(5)), NodeStatus::Running);
    assert_eq!(agent.status(&frame, NodeId(6)), NodeStatus::Abort);
    assert_eq!(
        entries(&log).iter().filter(|e| *e == "prep:enter").count(),
        1
    );
    assert_eq!(
        entries(&log).iter().filter(|e| *e == "mark:enter").count(),
        2
    );
    assert!(entries(&log).contains(&"work:exit:Abort".to_string()));
    assert!(!entries(&log).iter().any(|e| e.starts_with("later:")));
    agent.free(&mut frame, 1, &mut bb).unwrap();
}

#[test]
fn abort_is_idempotent() {
    let log = log();
    let tree = tree(NodeSpec::sequence(
        "main",
        vec![Record::leaf("work", &log, NodeStatus::Running)],
    ));
    let mut frame = SimFrame::default();
    let mut bb = Blackboard::new();
    let mut agent = agent(&tree, &mut frame, &mut bb);

    agent.tick(&mut frame, 1, &mut bb, &mut NullObserver).unwrap();
    agent.reset(&mut frame, 1, &mut bb).unwrap();
    agent.reset(&mut frame, 1, &mut bb).unwrap();
    agent.free(&mut frame, 1, &mut bb).unwrap();
    agent.free(&mut frame, 1, &mut bb).unwrap();

    assert_eq!(
        entries(&log),
        vec!["work:enter", "work:update", "work:exit:Abort"]
    );
    assert_eq!(frame.lists().live(), 0);
}

#[test]
fn dynamic_composite_restarts_at_topmost_decorator() {
    let log = log();
    // root 0, main 1, outer 2, gate 3, body 4, run 5, fallback 6
    let tree = tree(NodeSpec::selector(
        "main",
        vec![
            NodeSpec::decorator(
                "outer",
                AbortMode::None,
                BlackboardCondition::is_true(ARMED.id()),
                NodeSpec::decorator(
                    "gate",
                    AbortMode::None,
                    BlackboardCondition::is_true(GO.id()),
                    NodeSpec::sequence(
                        "body",
                        vec![Record::leaf("run", &log, NodeStatus::Running)],
                    )
                    .dynamic(),
                ),
            ),
            Record::leaf("fallback", &log, NodeStatus::Running),
        ],
    ));
    let mut frame = SimFrame::default();
    let mut bb = Blackboard::new();
    bb.register(ARMED, true).unwrap();
    bb.register(GO, true).unwrap();
    let mut agent = agent(&tree, &mut frame, &mut bb);

    agent.tick(&mut frame, 1, &mut bb, &mut NullObserver).unwrap();
    frame.advance();
    agent.tick(&mut frame, 1, &mut bb, &mut NullObserver).unwrap();
    assert_eq!(agent.cursor(), Some(NodeId(5)));

    // No abort mode on either decorator: only the dynamic re-validation notices.
    bb.set(GO, false).unwrap();
    frame.advance();
    let mut recorder: TraceRecorder = TraceRecorder::default();
    agent.tick(&mut frame, 1, &mut bb, &mut recorder).unwrap();

    assert_eq!(agent.cursor(), Some(NodeId(6)));
    assert_eq!(
        entries(&log),
        vec![
            "run:enter",
            "run:update",
            "run:update",
            "run:exit:Abort",
            "fallback:enter",
            "fallback:update",
        ]
    );
    // Re-validation stops at `gate`; re-entry starts at `outer`, so it is checked again.
    let checks: Vec<(u64, u64)> = recorder
        .sink()
        .with_tag("bt.decorator.check")
        .map(|e| (e.a, e.b))
        .collect();
    assert_eq!(checks, vec![(3, 0), (2, 1), (3, 0)]);
    agent.free(&mut frame, 1, &mut bb).unwrap();
}

#[test]
fn abort_discards_a_partly_descended_branch() {
    let log = log();
    // root 0, main 1, flee 2, run 3, chores 4, sweep 5, dust 6, nap 7
    let tree = tree(NodeSpec::selector(
        "main",
        vec![
            NodeSpec::decorator(
                "flee",
                AbortMode::LowerPriority,
                BlackboardCondition::is_true(DANGER.id()),
                Record::leaf("run", &log, NodeStatus::Running),
            ),
            NodeSpec::sequence(
                "chores",
                vec![
                    Record::leaf("sweep", &log, NodeStatus::Success),
                    Record::leaf("dust", &log, NodeStatus::Success),
                    Record::leaf("nap", &log, NodeStatus::Running),
                ],
            ),
        ],
    ));
    let mut frame = SimFrame::default();
    let mut bb = Blackboard::new();
    bb.register(DANGER, false).unwrap();
    let config = BtConfig {
        max_steps_per_tick: 5,
    };
    let mut agent = BtAgent::init(Arc::clone(&tree), config, &mut frame, 1, &mut bb).unwrap();

    // Budget runs out right after `chores` is entered.
    assert_eq!(
        agent.tick(&mut frame, 1, &mut bb, &mut NullObserver).unwrap(),
        NodeStatus::Running
    );
    assert_eq!(agent.status(&frame, NodeId(4)), NodeStatus::Running);
    assert!(entries(&log).is_empty());

    bb.set(DANGER, true).unwrap();
    frame.advance();
    agent.tick(&mut frame, 1, &mut bb, &mut NullObserver).unwrap();

    assert_eq!(entries(&log), vec!["run:enter", "run:update"]);
    assert_eq!(agent.cursor(), Some(NodeId(3)));
    assert_eq!(agent.status(&frame, NodeId(4)), NodeStatus::Abort);
    let running: Vec<usize> = agent
        .statuses(&frame)
        .iter()
        .enumerate()
        .filter(|(_, status)| **status == NodeStatus::Running)
        .map(|(i, _)| i)
        .collect();
    assert_eq!(running, vec![0, 1, 2, 3]);
    agent.free(&mut frame, 1, &mut bb).unwrap();
}

#[test]
fn failed_entry_check_reports_no_exit() {
    let log = log();
    // root 0, main 1, gate 2, blocked 3, idle 4
    let tree = tree(NodeSpec::selector(
        "main",
        vec![
            NodeSpec::decorator(
                "gate",
                AbortMode::None,
                BlackboardCondition::is_true(GO.id()),
                Record::leaf("blocked", &log, NodeStatus::Running),
            ),
            Record::leaf("idle", &log, NodeStatus::Running),
        ],
    ));
    let mut frame = SimFrame::default();
    let mut bb = Blackboard::new();
    bb.register(GO, false).unwrap();
    let mut agent = agent(&tree, &mut frame, &mut bb);
    let mut recorder: TraceRecorder = TraceRecorder::default();

    agent.tick(&mut frame, 1, &mut bb, &mut recorder).unwrap();

    let trace = recorder.sink();
    let checks: Vec<(u64, u64)> = trace
        .with_tag("bt.decorator.check")
        .map(|e| (e.a, e.b))
        .collect();
    assert_eq!(checks, vec![(2, 0)]);
    assert!(!trace.with_tag("bt.node.enter").any(|e| e.a == 2));
    assert!(!trace.with_tag("bt.node.exit").any(|e| e.a == 2));
    assert_eq!(agent.status(&frame, NodeId(2)), NodeStatus::Failure);
    assert_eq!(agent.cursor(), Some(NodeId(4)));
    agent.free(&mut frame, 1, &mut bb).unwrap();
}
