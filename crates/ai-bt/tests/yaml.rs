use std::sync::Arc;

use ai_bt::{BtAgent, BtError, NodeRegistry, TreeDefinition};
use ai_core::{AssetId, BbKey, Blackboard, BtConfig, NodeStatus, NullObserver, SimFrame};

const DANGER: BbKey<bool> = BbKey::new(1);
const FLED: BbKey<i32> = BbKey::new(2);

const GUARD: &str = r#"
name: guard
root: main
nodes:
  main: { type: selector, children: [flee, idle] }
  flee:
    type: decorator
    logic: blackboard_condition
    abort: lower_priority
    params: { key: 1, value: !bool true }
    child: run
  run:
    type: sequence
    children: [mark, hide]
  mark: { type: leaf, logic: set_blackboard, params: { key: 2, value: !int 1 } }
  hide: { type: leaf, logic: wait, params: { seconds: 2.0 } }
  idle:
    type: leaf
    logic: wait
    params: { seconds: 100.0 }
    services:
      - logic: set_blackboard
        params: { key: 2, value: !int 0, interval: 1.0 }
"#;

fn build(yaml: &str) -> Result<ai_bt::BehaviorTree<SimFrame>, BtError> {
    let registry = NodeRegistry::with_builtins();
    TreeDefinition::from_yaml_str(yaml)?.build(AssetId(9), &registry)
}

#[test]
fn yaml_tree_builds_and_runs() {
    let tree = Arc::new(build(GUARD).unwrap());
    assert_eq!(tree.name(), "guard");
    assert_eq!(tree.node_count(), 7);
    assert_eq!(tree.service_count(), 1);

    let mut frame = SimFrame::default();
    let mut bb = Blackboard::new();
    bb.register(DANGER, false).unwrap();
    bb.register(FLED, 0).unwrap();
    let mut agent =
        BtAgent::init(Arc::clone(&tree), BtConfig::default(), &mut frame, 1, &mut bb).unwrap();

    agent.tick(&mut frame, 1, &mut bb, &mut NullObserver).unwrap();
    assert_eq!(agent.cursor(), tree.find("idle"));

    bb.set(DANGER, true).unwrap();
    frame.advance();
    agent.tick(&mut frame, 1, &mut bb, &mut NullObserver).unwrap();
    assert_eq!(agent.cursor(), tree.find("hide"));
    assert_eq!(bb.get(FLED), 1);

    // `hide` waits until t=3, then the whole tree succeeds.
    for _ in 0..2 {
        frame.advance();
        agent.tick(&mut frame, 1, &mut bb, &mut NullObserver).unwrap();
    }
    assert_eq!(agent.last_status(), NodeStatus::Success);
    agent.free(&mut frame, 1, &mut bb).unwrap();
}

#[test]
fn missing_root_is_rejected() {
    let err = build("{ name: t, root: main, nodes: { a: { type: leaf, logic: succeed } } }")
        .err()
        .unwrap();
    assert!(matches!(err, BtError::MissingRoot { .. }));
}

#[test]
fn empty_composite_is_rejected() {
    let err = build("{ name: t, root: main, nodes: { main: { type: sequence, children: [] } } }")
        .err()
        .unwrap();
    assert!(matches!(err, BtError::EmptyComposite { node } if node == "main"));
}

#[test]
fn unknown_child_is_rejected() {
    let err = build("{ name: t, root: main, nodes: { main: { type: selector, children: [ghost] } } }")
        .err()
        .unwrap();
    assert!(matches!(err, BtError::UnknownNode { node, .. } if node == "ghost"));
}

#[test]
fn shared_node_is_rejected() {
    let yaml = r#"
name: t
root: main
nodes:
  main: { type: selector, children: [a, b] }
  a: { type: decorator, logic: condition, params: { condition: !read 1 }, child: leaf }
  b: { type: decorator, logic: condition, params: { condition: !read 1 }, child: leaf }
  leaf: { type: leaf, logic: succeed }
"#;
    let err = build(yaml).err().unwrap();
    assert!(matches!(err, BtError::SharedNode { node, .. } if node == "leaf"));
}

#[test]
fn cycles_are_rejected() {
    let yaml = r#"
name: t
root: main
nodes:
  main: { type: leaf, logic: succeed }
  x: { type: decorator, logic: condition, params: { condition: !read 1 }, child: y }
  y: { type: decorator, logic: condition, params: { condition: !read 1 }, child: x }
"#;
    let err = build(yaml).err().unwrap();
    assert!(matches!(err, BtError::Cycle { .. }));

    let yaml = r#"
name: t
root: main
nodes:
  main: { type: decorator, logic: condition, params: { condition: !read 1 }, child: main }
"#;
    let err = build(yaml).err().unwrap();
    assert!(matches!(err, BtError::Cycle { node } if node == "main"));
}

#[test]
fn unreachable_nodes_are_rejected() {
    let yaml = r#"
name: t
root: main
nodes:
  main: { type: leaf, logic: succeed }
  orphan: { type: leaf, logic: fail }
"#;
    let err = build(yaml).err().unwrap();
    assert!(matches!(err, BtError::Unreachable { node } if node == "orphan"));
}

#[test]
fn unknown_logic_and_bad_params_are_rejected() {
    let err = build("{ name: t, root: main, nodes: { main: { type: leaf, logic: dance } } }")
        .err()
        .unwrap();
    assert!(matches!(err, BtError::UnknownLogic { logic, .. } if logic == "dance"));

    let err = build(
        "{ name: t, root: main, nodes: { main: { type: leaf, logic: set_blackboard, params: { key: 1 } } } }",
    )
    .err()
    .unwrap();
    assert!(matches!(err, BtError::InvalidParams { node, .. } if node == "main"));
}

#[test]
fn decorator_without_child_is_rejected() {
    let err = build(
        "{ name: t, root: main, nodes: { main: { type: decorator, logic: condition, params: { condition: !read 1 } } } }",
    )
    .err()
    .unwrap();
    assert!(matches!(err, BtError::DecoratorWithoutChild { .. }));
}

#[test]
fn malformed_yaml_is_a_yaml_error() {
    let err = TreeDefinition::from_yaml_str("name: [").err().unwrap();
    assert!(matches!(err, BtError::Yaml(_)));
}
