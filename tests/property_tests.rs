//! Property-based tests for trackgraph using proptest.
//!
//! These tests verify invariants that must hold for all possible inputs,
//! including cyclic graphs, finding edge cases that unit tests might miss.

use std::collections::HashMap;

use proptest::prelude::*;

use trackgraph::db::schema::initialize_database;
use trackgraph::error::TrackGraphError;
use trackgraph::graph::course_set::{CourseSetBounds, CourseSetSpec};
use trackgraph::graph::store::RequirementStore;
use trackgraph::graph::traversal::{RequirementTraversal, TraversalRecord, TraversalStrategy};
use trackgraph::types::{
    DegreeType, ExtraData, NodeId, NodeKind, NodePayload, Track, University,
};

// ---------------------------------------------------------------------------
// Strategy helpers
// ---------------------------------------------------------------------------

fn arb_node_kind() -> impl Strategy<Value = NodeKind> {
    prop_oneof![Just(NodeKind::Root), Just(NodeKind::Leaf), Just(NodeKind::Or)]
}

fn arb_strategy() -> impl Strategy<Value = TraversalStrategy> {
    prop_oneof![
        Just(TraversalStrategy::Worklist),
        Just(TraversalStrategy::RecursiveCte)
    ]
}

fn arb_bound() -> impl Strategy<Value = Option<u32>> {
    prop::option::of(0u32..20)
}

/// A graph of `n` nodes as an edge list over indices `0..n`. Index 0 is the
/// root; self-loops are filtered out, duplicates and cycles are kept.
fn arb_graph() -> impl Strategy<Value = (usize, Vec<(usize, usize)>)> {
    (2usize..8).prop_flat_map(|n| {
        let edges = prop::collection::vec((0..n, 0..n), 0..14)
            .prop_map(|pairs| pairs.into_iter().filter(|(a, b)| a != b).collect::<Vec<_>>());
        (Just(n), edges)
    })
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

fn empty_store() -> RequirementStore {
    let conn = initialize_database(":memory:").unwrap();
    let store = RequirementStore::from_connection(conn);
    store
        .upsert_university(&University {
            id: 1,
            name: "Prop U".into(),
            extra_data: ExtraData::new(),
        })
        .unwrap();
    store
        .upsert_track(&Track {
            id: "t".into(),
            university_id: 1,
            degree: DegreeType::Bachelors,
            extra_data: ExtraData::new(),
        })
        .unwrap();
    store
}

/// Materialize a graph: node 0 is the track root, the rest are OR nodes.
fn build_graph(n: usize, edges: &[(usize, usize)]) -> (RequirementStore, Vec<NodeId>) {
    let store = empty_store();
    let mut ids = Vec::with_capacity(n);
    for i in 0..n {
        let payload = if i == 0 {
            NodePayload::Root { track_id: "t".into() }
        } else {
            NodePayload::Or
        };
        ids.push(store.create_node(1, payload).unwrap().id);
    }
    for &(a, b) in edges {
        store.add_edge(ids[a], ids[b]).unwrap();
    }
    (store, ids)
}

fn out_degrees(store: &RequirementStore, ids: &[NodeId]) -> HashMap<NodeId, usize> {
    ids.iter()
        .map(|&id| (id, store.children_of(id).unwrap().len()))
        .collect()
}

fn sorted_triples(records: &[TraversalRecord]) -> Vec<(NodeId, u32, Option<NodeId>)> {
    let mut t: Vec<_> = records
        .iter()
        .map(|r| (r.node.id, r.distance, r.parent_id))
        .collect();
    t.sort();
    t
}

// ---------------------------------------------------------------------------
// Enum round-trips
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    #[test]
    fn node_kind_roundtrip(kind in arb_node_kind()) {
        let recovered = NodeKind::from_str_loose(kind.as_str());
        prop_assert_eq!(recovered, Some(kind));
        prop_assert_eq!(format!("{}", kind), kind.as_str());
    }

    #[test]
    fn strategy_roundtrip(strategy in arb_strategy()) {
        let upper = strategy.as_str().to_uppercase();
        prop_assert_eq!(TraversalStrategy::from_str_loose(&upper), Some(strategy));
    }
}

// ---------------------------------------------------------------------------
// Course-set bounds
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn resolved_bounds_are_ordered_or_rejected(
        min_size in arb_bound(),
        max_size in arb_bound(),
        min_credits in arb_bound(),
        max_credits in arb_bound(),
    ) {
        let spec = CourseSetSpec::default()
            .subset_size(min_size, max_size)
            .credits(min_credits, max_credits);
        let size_ok = min_size.unwrap_or(0) <= max_size.unwrap_or(u32::MAX);
        let credits_ok = min_credits.unwrap_or(0) <= max_credits.unwrap_or(u32::MAX);

        match CourseSetBounds::resolve(&spec) {
            Ok(bounds) => {
                prop_assert!(size_ok && credits_ok);
                prop_assert!(bounds.min_subset_size <= bounds.max_subset_size);
                prop_assert!(bounds.min_credits <= bounds.max_credits);
            }
            Err(TrackGraphError::InvalidConstraint(_)) => {
                prop_assert!(!(size_ok && credits_ok));
            }
            Err(other) => {
                prop_assert!(false, "unexpected error: {}", other);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Edge insertion
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn add_edge_is_idempotent((n, edges) in arb_graph()) {
        let (store, ids) = build_graph(n, &edges);
        for &(a, b) in &edges {
            prop_assert!(!store.add_edge(ids[a], ids[b]).unwrap());
        }
        for &id in &ids {
            let mut children: Vec<NodeId> =
                store.children_of(id).unwrap().iter().map(|c| c.id).collect();
            let total = children.len();
            children.sort_unstable();
            children.dedup();
            prop_assert_eq!(children.len(), total, "duplicate child under {}", id);
        }
    }

    #[test]
    fn self_loops_are_always_rejected(n in 2usize..6, pick in 0usize..6) {
        let (store, ids) = build_graph(n, &[]);
        let id = ids[pick % n];
        let is_self_loop = matches!(store.add_edge(id, id), Err(TrackGraphError::SelfLoop(x)) if x == id);
        prop_assert!(is_self_loop);
        prop_assert!(store.children_of(id).unwrap().is_empty());
    }
}

// ---------------------------------------------------------------------------
// Traversal
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn no_record_exceeds_max_depth(
        (n, edges) in arb_graph(),
        depth in 0i64..6,
        strategy in arb_strategy(),
    ) {
        let (store, _) = build_graph(n, &edges);
        let records = RequirementTraversal::new(&store)
            .traverse_with(strategy, 1, "t", depth)
            .unwrap();
        prop_assert!(!records.is_empty());
        prop_assert!(records.iter().all(|r| i64::from(r.distance) <= depth));
    }

    #[test]
    fn parent_is_the_predecessor_one_hop_closer(
        (n, edges) in arb_graph(),
        depth in 0i64..6,
    ) {
        let (store, ids) = build_graph(n, &edges);
        let records = RequirementTraversal::new(&store).traverse(1, "t", depth).unwrap();

        for record in &records {
            match record.parent_id {
                None => {
                    prop_assert_eq!(record.distance, 0);
                    prop_assert_eq!(record.node.id, ids[0]);
                }
                Some(parent) => {
                    prop_assert!(record.distance >= 1);
                    let children: Vec<NodeId> =
                        store.children_of(parent).unwrap().iter().map(|c| c.id).collect();
                    prop_assert!(children.contains(&record.node.id));
                    prop_assert!(records
                        .iter()
                        .any(|p| p.node.id == parent && p.distance + 1 == record.distance));
                }
            }
        }
    }

    #[test]
    fn one_record_per_traversed_edge(
        (n, edges) in arb_graph(),
        depth in 0i64..6,
    ) {
        let (store, ids) = build_graph(n, &edges);
        let degree = out_degrees(&store, &ids);
        let records = RequirementTraversal::new(&store).traverse(1, "t", depth).unwrap();

        for level in 0..depth as u32 {
            let expected: usize = records
                .iter()
                .filter(|r| r.distance == level)
                .map(|r| degree[&r.node.id])
                .sum();
            let actual = records.iter().filter(|r| r.distance == level + 1).count();
            prop_assert_eq!(actual, expected, "level {}", level + 1);
        }
    }

    #[test]
    fn worklist_output_is_breadth_first((n, edges) in arb_graph(), depth in 0i64..6) {
        let (store, _) = build_graph(n, &edges);
        let records = RequirementTraversal::new(&store).traverse(1, "t", depth).unwrap();
        prop_assert!(records.windows(2).all(|w| w[0].distance <= w[1].distance));
    }

    #[test]
    fn strategies_produce_the_same_multiset((n, edges) in arb_graph(), depth in 0i64..6) {
        let (store, _) = build_graph(n, &edges);
        let traversal = RequirementTraversal::new(&store);
        let worklist = traversal
            .traverse_with(TraversalStrategy::Worklist, 1, "t", depth)
            .unwrap();
        let cte = traversal
            .traverse_with(TraversalStrategy::RecursiveCte, 1, "t", depth)
            .unwrap();
        prop_assert_eq!(sorted_triples(&worklist), sorted_triples(&cte));
    }
}
