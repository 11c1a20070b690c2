#![forbid(unsafe_code)]

use super::*;
use crate::content::{Content, ContentSchema, FieldType, FieldValue};
use crate::memory::MemoryStore;
use crate::model::{ChildrenQuery, Interval, MoveTarget, Placement};

fn schema() -> ContentSchema {
    ContentSchema::try_new([("name", FieldType::Text), ("org_unit", FieldType::Integer)])
        .expect("schema should be valid")
}

fn engine() -> NestedSetEngine<MemoryStore> {
    NestedSetEngine::new(MemoryStore::new(schema()))
}

fn named(name: &str) -> Content {
    let mut content = Content::new();
    content.insert("name".to_string(), FieldValue::from(name));
    content
}

fn interval_of(engine: &NestedSetEngine<MemoryStore>, id: NodeId) -> (i64, i64) {
    let node = engine
        .get(id)
        .expect("read should succeed")
        .expect("node should exist");
    (node.interval.lft, node.interval.rgt)
}

fn ids(nodes: &[Node]) -> Vec<NodeId> {
    nodes.iter().map(|node| node.id).collect()
}

fn assert_valid(engine: &NestedSetEngine<MemoryStore>) {
    let violations = engine.verify().expect("verify should read");
    assert!(violations.is_empty(), "violations: {violations:?}");
}

/// R(A(A1, A2), B, C(C1))
struct Org {
    engine: NestedSetEngine<MemoryStore>,
    r: NodeId,
    a: NodeId,
    a1: NodeId,
    a2: NodeId,
    b: NodeId,
    c: NodeId,
    c1: NodeId,
}

fn org() -> Org {
    let mut engine = engine();
    let r = engine.insert(named("R"), Placement::Root).expect("root");
    let a = engine
        .insert(named("A"), Placement::FirstChildOf(r))
        .expect("A");
    let b = engine.insert(named("B"), Placement::After(a)).expect("B");
    let c = engine.insert(named("C"), Placement::After(b)).expect("C");
    let a1 = engine
        .insert(named("A1"), Placement::FirstChildOf(a))
        .expect("A1");
    let a2 = engine.insert(named("A2"), Placement::After(a1)).expect("A2");
    let c1 = engine
        .insert(named("C1"), Placement::FirstChildOf(c))
        .expect("C1");
    assert_valid(&engine);
    Org {
        engine,
        r,
        a,
        a1,
        a2,
        b,
        c,
        c1,
    }
}

#[test]
fn insert_root_then_children_in_order() {
    let mut engine = engine();
    let r = engine.insert(named("R"), Placement::Root).expect("root");
    assert_eq!(interval_of(&engine, r), (1, 2));

    let a = engine
        .insert(named("A"), Placement::FirstChildOf(r))
        .expect("A");
    assert_eq!(interval_of(&engine, a), (2, 3));
    assert_eq!(interval_of(&engine, r), (1, 4));

    let b = engine.insert(named("B"), Placement::After(a)).expect("B");
    assert_eq!(interval_of(&engine, b), (4, 5));
    assert_eq!(interval_of(&engine, r), (1, 6));

    let children = engine
        .children(&[r], ChildrenQuery::default())
        .expect("children");
    assert_eq!(ids(&children), vec![a, b]);
    assert_eq!(
        engine.get(b).expect("get").expect("B").parent_id,
        Some(r),
        "a node placed after a sibling shares the sibling's parent"
    );
    assert_valid(&engine);
}

#[test]
fn move_under_sibling_then_delete_parent() {
    let mut engine = engine();
    let r = engine.insert(named("R"), Placement::Root).expect("root");
    let a = engine
        .insert(named("A"), Placement::FirstChildOf(r))
        .expect("A");
    let b = engine.insert(named("B"), Placement::After(a)).expect("B");

    engine
        .move_node(b, MoveTarget::FirstChildOf(a))
        .expect("move B under A");
    assert_eq!(interval_of(&engine, r), (1, 6));
    assert_eq!(interval_of(&engine, a), (2, 5));
    assert_eq!(interval_of(&engine, b), (3, 4));
    assert!(engine.is_descendant_of(b, r).expect("read"));
    assert!(engine.is_descendant_of(b, a).expect("read"));
    assert_valid(&engine);

    let removed = engine.delete(a).expect("delete A");
    assert_eq!(removed, 2);
    assert_eq!(interval_of(&engine, r), (1, 2));
    assert!(
        engine
            .children(&[r], ChildrenQuery::default())
            .expect("children")
            .is_empty()
    );
    assert_eq!(engine.get(b).expect("get"), None);
    assert_valid(&engine);
}

#[test]
fn insert_rejects_unknown_anchor_and_root_sibling() {
    let mut engine = engine();
    let r = engine.insert(named("R"), Placement::Root).expect("root");

    let err = engine
        .insert(named("X"), Placement::FirstChildOf(NodeId::new(99)))
        .expect_err("unknown parent");
    assert!(matches!(err, TreeError::NotFound(id) if id == NodeId::new(99)));

    let err = engine
        .insert(named("X"), Placement::After(NodeId::new(42)))
        .expect_err("unknown sibling");
    assert_eq!(err.code(), "NOT_FOUND");

    let err = engine
        .insert(named("X"), Placement::After(r))
        .expect_err("sibling of the root");
    assert_eq!(err.code(), "INVALID_INPUT");
    assert_eq!(engine.len().expect("len"), 1);
}

#[test]
fn insert_validates_content_before_writing() {
    let mut engine = engine();
    let r = engine.insert(named("R"), Placement::Root).expect("root");

    let mut bad = Content::new();
    bad.insert("org_unit".to_string(), FieldValue::from("not a number"));
    let err = engine
        .insert(bad, Placement::FirstChildOf(r))
        .expect_err("mistyped content");
    assert_eq!(err.code(), "INVALID_INPUT");
    assert_eq!(interval_of(&engine, r), (1, 2));
}

#[test]
fn self_targeted_moves_change_nothing() {
    let mut org = org();
    let before = org.engine.store().reader().fetch_all().expect("rows");

    org.engine
        .move_node(org.a, MoveTarget::FirstChildOf(org.a))
        .expect("move under itself is a no-op");
    org.engine
        .move_node(org.a, MoveTarget::After(org.a))
        .expect("move after itself is a no-op");

    let after = org.engine.store().reader().fetch_all().expect("rows");
    assert_eq!(before, after);
}

#[test]
fn moving_under_any_descendant_is_a_cycle() {
    let mut org = org();
    let before = org.engine.store().reader().fetch_all().expect("rows");

    for node in before.clone() {
        for candidate in &before {
            if !candidate.is_descendant_of(&node) {
                continue;
            }
            let err = org
                .engine
                .move_node(node.id, MoveTarget::FirstChildOf(candidate.id))
                .expect_err("descendant target must be rejected");
            assert!(
                matches!(err, TreeError::Cycle { node: n, target: t } if n == node.id && t == candidate.id),
                "unexpected error {err:?}"
            );
        }
    }

    let err = org
        .engine
        .move_node(org.a, MoveTarget::After(org.a1))
        .expect_err("placing A beside its own child");
    assert_eq!(err.code(), "CYCLE");

    let after = org.engine.store().reader().fetch_all().expect("rows");
    assert_eq!(before, after, "rejected moves must not write");
}

#[test]
fn move_subtree_right_and_back_left() {
    let mut org = org();
    let engine = &mut org.engine;

    engine
        .move_node(org.a, MoveTarget::After(org.c))
        .expect("move A after C");
    assert_valid(engine);
    assert_eq!(
        ids(&engine.children(&[org.r], ChildrenQuery::default()).expect("children")),
        vec![org.b, org.c, org.a]
    );
    assert_eq!(interval_of(engine, org.a).1 - interval_of(engine, org.a).0, 5);
    assert_eq!(
        ids(&engine.children(&[org.a], ChildrenQuery::default()).expect("children")),
        vec![org.a1, org.a2],
        "descendants travel with the subtree"
    );

    engine
        .move_node(org.a, MoveTarget::FirstChildOf(org.r))
        .expect("move A back to the front");
    assert_valid(engine);
    assert_eq!(
        ids(&engine.children(&[org.r], ChildrenQuery::default()).expect("children")),
        vec![org.a, org.b, org.c]
    );
    assert_eq!(interval_of(engine, org.a), (2, 7));
}

#[test]
fn move_into_deeper_branch_keeps_counts() {
    let mut org = org();
    let engine = &mut org.engine;
    let width_before = Interval::new(interval_of(engine, org.a).0, interval_of(engine, org.a).1)
        .width();
    let total_before = engine.len().expect("len");

    engine
        .move_node(org.a, MoveTarget::FirstChildOf(org.c1))
        .expect("move A under C1");
    assert_valid(engine);

    let (lft, rgt) = interval_of(engine, org.a);
    assert_eq!(Interval::new(lft, rgt).width(), width_before);
    assert_eq!(engine.len().expect("len"), total_before);
    assert_eq!(engine.depth(org.a2).expect("depth"), Some(4));
    assert_eq!(
        ids(&engine.path(org.a2).expect("path")),
        vec![org.r, org.c, org.c1, org.a, org.a2]
    );
}

#[test]
fn move_after_own_parent_lifts_node_one_level() {
    let mut org = org();
    let engine = &mut org.engine;

    engine
        .move_node(org.a1, MoveTarget::After(org.a))
        .expect("move A1 after A");
    assert_valid(engine);
    assert_eq!(engine.parent(org.a1).expect("parent").map(|n| n.id), Some(org.r));
    assert_eq!(
        engine.next_sibling(org.a).expect("sibling").map(|n| n.id),
        Some(org.a1)
    );
    assert_eq!(
        ids(&engine.children(&[org.a], ChildrenQuery::default()).expect("children")),
        vec![org.a2]
    );
}

#[test]
fn move_nodes_reports_each_failure_and_keeps_successes() {
    let mut org = org();
    let missing = NodeId::new(500);

    let err = org
        .engine
        .move_nodes(&[org.b, missing, org.a], MoveTarget::FirstChildOf(org.a1))
        .expect_err("two of three moves must fail");
    let TreeError::Aggregate(failures) = err else {
        panic!("expected aggregate error");
    };
    assert_eq!(failures.len(), 2);
    assert_eq!(failures[0].0, missing);
    assert_eq!(failures[0].1.code(), "NOT_FOUND");
    assert_eq!(failures[1].0, org.a);
    assert_eq!(failures[1].1.code(), "CYCLE");

    assert_eq!(
        org.engine.parent(org.b).expect("parent").map(|n| n.id),
        Some(org.a1),
        "the successful move stays applied"
    );
    assert_valid(&org.engine);
}

#[test]
fn delete_leaf_and_unknown() {
    let mut org = org();
    let before = org.engine.len().expect("len");

    assert_eq!(org.engine.delete(org.a2).expect("delete A2"), 1);
    assert_eq!(org.engine.len().expect("len"), before - 1);
    assert_valid(&org.engine);

    let err = org.engine.delete(org.a2).expect_err("already gone");
    assert!(matches!(err, TreeError::NotFound(id) if id == org.a2));
}

#[test]
fn delete_subtree_shrinks_by_subtree_size() {
    let mut org = org();
    let (lft, rgt) = interval_of(&org.engine, org.a);
    let width = Interval::new(lft, rgt).width();
    let before = org.engine.len().expect("len");

    let removed = org.engine.delete(org.a).expect("delete A");
    assert_eq!(removed as i64, width);
    assert_eq!(org.engine.len().expect("len") as i64, before as i64 - width);
    assert_valid(&org.engine);
    assert_eq!(interval_of(&org.engine, org.b), (2, 3));
    assert_eq!(interval_of(&org.engine, org.r), (1, 8));
}

#[test]
fn path_and_depth_agree() {
    let org = org();
    for id in [org.r, org.a, org.a1, org.a2, org.b, org.c, org.c1] {
        let path = org.engine.path(id).expect("path");
        let depth = org.engine.depth(id).expect("depth").expect("known node");
        assert_eq!(path.len(), depth + 1);
        assert_eq!(path.first().map(|n| n.id), Some(org.r));
        assert_eq!(path.last().map(|n| n.id), Some(id));
    }
    assert_eq!(org.engine.depth(org.r).expect("depth"), Some(0));
    assert!(org.engine.path(NodeId::new(77)).expect("path").is_empty());
    assert_eq!(org.engine.depth(NodeId::new(77)).expect("depth"), None);
}

#[test]
fn children_levels_and_first_only() {
    let org = org();
    let engine = &org.engine;

    let two_levels = engine
        .children(&[org.r], ChildrenQuery::levels(2))
        .expect("children");
    assert_eq!(
        ids(&two_levels),
        vec![org.a, org.b, org.c, org.a1, org.a2, org.c1]
    );

    let deep = engine
        .children(&[org.r], ChildrenQuery::levels(10))
        .expect("children");
    assert_eq!(deep.len(), 6, "expansion stops once a level is empty");

    let firsts = engine
        .children(&[org.r, org.b, org.c], ChildrenQuery::first_only())
        .expect("first children");
    assert_eq!(ids(&firsts), vec![org.a, org.c1]);

    let many = engine
        .children(&[org.a, org.c], ChildrenQuery::default())
        .expect("children of many");
    assert_eq!(ids(&many), vec![org.a1, org.a2, org.c1]);
}

#[test]
fn siblings_stay_within_parent() {
    let org = org();
    let engine = &org.engine;

    assert_eq!(engine.next_sibling(org.a).expect("next").map(|n| n.id), Some(org.b));
    assert_eq!(
        engine.previous_sibling(org.c).expect("prev").map(|n| n.id),
        Some(org.b)
    );
    assert_eq!(engine.next_sibling(org.c).expect("next"), None);
    assert_eq!(engine.previous_sibling(org.a).expect("prev"), None);
    assert_eq!(engine.next_sibling(org.a2).expect("next"), None);
    assert_eq!(engine.previous_sibling(org.c1).expect("prev"), None);
    assert_eq!(engine.next_sibling(org.r).expect("next"), None);
    assert_eq!(engine.next_sibling(NodeId::new(404)).expect("next"), None);
}

#[test]
fn descendant_test_is_strict() {
    let org = org();
    let engine = &org.engine;
    assert!(engine.is_descendant_of(org.a2, org.r).expect("read"));
    assert!(engine.is_descendant_of(org.a2, org.a).expect("read"));
    assert!(!engine.is_descendant_of(org.a, org.a).expect("read"));
    assert!(!engine.is_descendant_of(org.a, org.a2).expect("read"));
    assert!(!engine.is_descendant_of(org.b, org.a).expect("read"));
    assert!(!engine.is_descendant_of(NodeId::new(404), org.r).expect("read"));
}

#[test]
fn id_by_path_walks_names() {
    let org = org();
    let engine = &org.engine;

    assert_eq!(
        engine.id_by_path("/R/A/A2", None, "name", "/").expect("resolve"),
        Some(org.a2)
    );
    assert_eq!(
        engine.id_by_path("R/C", None, "name", "/").expect("resolve"),
        Some(org.c)
    );
    assert_eq!(
        engine.id_by_path("/", None, "name", "/").expect("resolve"),
        Some(org.r)
    );
    assert_eq!(
        engine.id_by_path("C1", Some(org.c), "name", "/").expect("resolve"),
        Some(org.c1)
    );
    assert_eq!(
        engine.id_by_path("/", Some(org.c), "name", "/").expect("resolve"),
        Some(org.c)
    );
    assert_eq!(
        engine.id_by_path("A1", Some(org.c), "name", "/").expect("resolve"),
        None,
        "lookups stay below the start node"
    );
    assert_eq!(
        engine.id_by_path("R::A::A1", None, "name", "::").expect("resolve"),
        Some(org.a1)
    );
    assert_eq!(
        engine.id_by_path("/R/Z", None, "name", "/").expect("resolve"),
        None
    );

    let err = engine
        .id_by_path("/R", None, "name", "")
        .expect_err("empty separator");
    assert_eq!(err.code(), "INVALID_INPUT");
    let err = engine
        .id_by_path("/R", None, "title", "/")
        .expect_err("unknown field");
    assert_eq!(err.code(), "INVALID_INPUT");
}

#[test]
fn id_by_path_takes_leftmost_duplicate() {
    let mut org = org();
    let twin = org
        .engine
        .insert(named("B"), Placement::After(org.c))
        .expect("second B");
    assert_ne!(twin, org.b);
    assert_eq!(
        org.engine.id_by_path("/R/B", None, "name", "/").expect("resolve"),
        Some(org.b)
    );
}

#[test]
fn path_string_and_find_by_content() {
    let mut org = org();
    assert_eq!(
        org.engine
            .path_string(org.a2, "name", "/")
            .expect("path string"),
        Some("R/A/A2".to_string())
    );

    let mut code = Content::new();
    code.insert("org_unit".to_string(), FieldValue::Integer(50000123));
    org.engine.update(org.c1, &code).expect("update");

    let found = org
        .engine
        .find_by_content("org_unit", &FieldValue::Integer(50000123))
        .expect("lookup")
        .expect("node with org unit");
    assert_eq!(found.id, org.c1);
    assert_eq!(found.content.get("name"), Some(&FieldValue::from("C1")));
    assert_eq!(
        org.engine
            .find_by_content("org_unit", &FieldValue::Integer(1))
            .expect("lookup"),
        None
    );
}

#[test]
fn update_overwrites_fields_and_reports_missing() {
    let mut org = org();
    let mut rename = Content::new();
    rename.insert("name".to_string(), FieldValue::from("Alpha"));
    rename.insert("org_unit".to_string(), FieldValue::Integer(7));
    org.engine.update(org.a, &rename).expect("update A");

    let a = org.engine.get(org.a).expect("get").expect("A");
    assert_eq!(a.content, rename);
    assert_eq!(interval_of(&org.engine, org.a), (2, 7));

    let mut clear = Content::new();
    clear.insert("org_unit".to_string(), FieldValue::Null);
    org.engine.update(org.a, &clear).expect("clear org unit");
    let a = org.engine.get(org.a).expect("get").expect("A");
    assert_eq!(a.content.get("org_unit"), None);

    let err = org
        .engine
        .update(NodeId::new(999), &rename)
        .expect_err("unknown node");
    assert_eq!(err.code(), "NOT_FOUND");
    let err = org
        .engine
        .update(NodeId::new(999), &Content::new())
        .expect_err("unknown node with empty content");
    assert_eq!(err.code(), "NOT_FOUND");
}

#[test]
fn subtree_reports_relative_depth() {
    let org = org();
    let branch = org.engine.subtree(org.r, None).expect("subtree");
    let shape = branch
        .iter()
        .map(|entry| (entry.node.id, entry.depth))
        .collect::<Vec<_>>();
    assert_eq!(
        shape,
        vec![
            (org.r, 0),
            (org.a, 1),
            (org.a1, 2),
            (org.a2, 2),
            (org.b, 1),
            (org.c, 1),
            (org.c1, 2),
        ]
    );

    let shallow = org.engine.subtree(org.r, Some(1)).expect("subtree");
    assert_eq!(shallow.len(), 4);
    let only_c = org.engine.subtree(org.c, Some(0)).expect("subtree");
    assert_eq!(only_c.len(), 1);
    assert!(org.engine.subtree(NodeId::new(404), None).expect("subtree").is_empty());
}

#[test]
fn root_and_parent_lookups() {
    let org = org();
    assert_eq!(org.engine.root().expect("root").map(|n| n.id), Some(org.r));
    assert_eq!(org.engine.parent(org.r).expect("parent"), None);
    assert_eq!(org.engine.parent(org.c1).expect("parent").map(|n| n.id), Some(org.c));
    assert!(engine().root().expect("root").is_none());
    assert!(engine().is_empty().expect("empty"));
}

#[test]
fn failed_transaction_body_leaves_rows_untouched() {
    let mut org = org();
    let before = org.engine.store().reader().fetch_all().expect("rows");

    let mut store = org.engine.into_store();
    let err = store
        .with_transaction(|tx| {
            open_gap(tx, 3, 4)?;
            tx.delete_rows_in_interval(Interval::new(1, 100))?;
            Err::<(), _>(TreeError::store("disk full"))
        })
        .expect_err("body failure must surface");
    assert_eq!(err.code(), "STORE");

    let after = store.reader().fetch_all().expect("rows");
    assert_eq!(before, after);
}

#[test]
fn verify_reports_corruption() {
    let node = |id: i64, parent: Option<i64>, lft: i64, rgt: i64| Node {
        id: NodeId::new(id),
        parent_id: parent.map(NodeId::new),
        interval: Interval::new(lft, rgt),
        content: Content::new(),
    };
    // Half-applied shift: B's lft moved, its rgt did not.
    let rows = vec![node(1, None, 1, 6), node(2, Some(1), 2, 5), node(3, Some(1), 4, 5)];
    let engine = NestedSetEngine::new(MemoryStore::from_rows(schema(), rows));
    let violations = engine.verify().expect("verify");

    assert!(violations.contains(&Violation::DuplicateBoundary { value: 5 }));
    assert!(violations.contains(&Violation::MissingBoundary { value: 3 }));
    assert!(
        !violations
            .iter()
            .any(|v| matches!(v, Violation::EmptyInterval { .. }))
    );
    assert!(violations.iter().any(|v| matches!(
        v,
        Violation::ParentMismatch { id, .. } if *id == NodeId::new(3)
    )));

    let two_roots = vec![node(1, None, 1, 2), node(2, None, 3, 4)];
    let engine = NestedSetEngine::new(MemoryStore::from_rows(schema(), two_roots));
    let violations = engine.verify().expect("verify");
    assert!(violations.contains(&Violation::RootCount { count: 2 }));
    assert!(violations.contains(&Violation::RootNotFirst {
        id: NodeId::new(2),
        lft: 3
    }));
}

/// Small deterministic generator so the sequence is reproducible without extra crates.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self, bound: usize) -> usize {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        ((self.0 >> 33) as usize) % bound.max(1)
    }
}

#[test]
fn random_mutation_sequence_preserves_invariants() {
    let mut engine = engine();
    let root = engine.insert(named("root"), Placement::Root).expect("root");
    let mut rng = Lcg(0x5eed);

    for step in 0..300 {
        let rows = engine.store().reader().fetch_all().expect("rows");
        let pick = |rng: &mut Lcg| rows[rng.next(rows.len())].clone();
        let total = rows.len();

        match rng.next(10) {
            0..=4 => {
                let anchor = pick(&mut rng);
                let placement = if anchor.is_root() || rng.next(2) == 0 {
                    Placement::FirstChildOf(anchor.id)
                } else {
                    Placement::After(anchor.id)
                };
                engine
                    .insert(named(&format!("n{step}")), placement)
                    .expect("insert");
                assert_eq!(engine.len().expect("len"), total + 1);
            }
            5..=7 => {
                let node = pick(&mut rng);
                let anchor = pick(&mut rng);
                let target = if anchor.is_root() || rng.next(2) == 0 {
                    MoveTarget::FirstChildOf(anchor.id)
                } else {
                    MoveTarget::After(anchor.id)
                };
                let width = node.interval.width();
                match engine.move_node(node.id, target) {
                    Ok(()) => {
                        let moved = engine.get(node.id).expect("get").expect("moved node");
                        assert_eq!(moved.interval.width(), width);
                    }
                    Err(TreeError::Cycle { .. }) => {
                        let parent_of_anchor = match target {
                            MoveTarget::FirstChildOf(_) => anchor.clone(),
                            MoveTarget::After(_) => engine
                                .get(anchor.parent_id.expect("non-root sibling"))
                                .expect("get")
                                .expect("parent"),
                        };
                        assert!(
                            parent_of_anchor.id == node.id
                                || parent_of_anchor.is_descendant_of(&node)
                        );
                    }
                    Err(err) => panic!("unexpected move failure at step {step}: {err}"),
                }
                assert_eq!(engine.len().expect("len"), total);
            }
            _ => {
                let node = pick(&mut rng);
                if node.id == root {
                    continue;
                }
                let removed = engine.delete(node.id).expect("delete");
                assert_eq!(removed as i64, node.interval.width());
                assert_eq!(engine.len().expect("len"), total - removed);
            }
        }

        let violations = engine.verify().expect("verify");
        assert!(violations.is_empty(), "step {step}: {violations:?}");
    }
}
