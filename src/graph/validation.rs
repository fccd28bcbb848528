//! Structural checks over a university's requirement graph.
//!
//! Writes accept any shape short of a self-loop, so cycles, duplicate roots
//! and empty alternatives can all be stored. [`validate_university`]
//! reports them without modifying anything.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::Serialize;

use crate::error::Result;
use crate::graph::store::RequirementStore;
use crate::types::{NodeId, NodeKind, UniversityId};

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// A strongly connected component of two or more nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleInfo {
    /// Member node ids, ascending.
    pub node_ids: Vec<NodeId>,
    pub size: usize,
}

/// A track anchored by more than one root node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateRoot {
    pub track_id: String,
    /// Root node ids, oldest first.
    pub node_ids: Vec<NodeId>,
}

/// Findings for one university.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub university_id: UniversityId,
    pub cycles: Vec<CycleInfo>,
    pub duplicate_roots: Vec<DuplicateRoot>,
    /// OR nodes with no alternatives; such a requirement can never be met.
    pub childless_or_nodes: Vec<NodeId>,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.cycles.is_empty() && self.duplicate_roots.is_empty() && self.childless_or_nodes.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Checks
// ---------------------------------------------------------------------------

/// Run every structural check for `university_id`.
pub fn validate_university(
    store: &RequirementStore,
    university_id: UniversityId,
) -> Result<ValidationReport> {
    store.require_university(university_id)?;

    let nodes = store.nodes_for_university(university_id)?;
    let edges = store.edges_for_university(university_id)?;

    let mut adj: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
    for edge in &edges {
        adj.entry(edge.from_node_id).or_default().push(edge.to_node_id);
    }

    let node_ids: Vec<NodeId> = nodes.iter().map(|n| n.id).collect();
    let mut cycles = strongly_connected(&node_ids, &adj)
        .into_iter()
        .filter(|scc| scc.len() >= 2)
        .map(|mut scc| {
            scc.sort_unstable();
            CycleInfo {
                size: scc.len(),
                node_ids: scc,
            }
        })
        .collect::<Vec<_>>();
    cycles.sort_by(|a, b| a.node_ids.cmp(&b.node_ids));

    let mut roots_by_track: BTreeMap<&str, Vec<NodeId>> = BTreeMap::new();
    for node in &nodes {
        if let Some(track_id) = node.track_id() {
            roots_by_track.entry(track_id).or_default().push(node.id);
        }
    }
    let duplicate_roots = roots_by_track
        .into_iter()
        .filter(|(_, ids)| ids.len() > 1)
        .map(|(track_id, node_ids)| DuplicateRoot {
            track_id: track_id.to_string(),
            node_ids,
        })
        .collect::<Vec<_>>();

    let childless_or_nodes = nodes
        .iter()
        .filter(|n| n.kind() == NodeKind::Or && !adj.contains_key(&n.id))
        .map(|n| n.id)
        .collect::<Vec<_>>();

    let report = ValidationReport {
        university_id,
        cycles,
        duplicate_roots,
        childless_or_nodes,
    };
    if report.is_clean() {
        tracing::debug!(university_id, nodes = nodes.len(), "requirement graph is clean");
    } else {
        tracing::warn!(
            university_id,
            cycles = report.cycles.len(),
            duplicate_roots = report.duplicate_roots.len(),
            childless_or_nodes = report.childless_or_nodes.len(),
            "requirement graph has structural problems"
        );
    }
    Ok(report)
}

// ---------------------------------------------------------------------------
// Tarjan's SCC
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Tarjan {
    index_counter: u32,
    index: HashMap<NodeId, u32>,
    lowlink: HashMap<NodeId, u32>,
    on_stack: HashSet<NodeId>,
    stack: Vec<NodeId>,
    sccs: Vec<Vec<NodeId>>,
}

impl Tarjan {
    /// Iterative strong-connect from `start`. Each frame holds a node and
    /// the position of the next child to visit, so depth is bounded by heap
    /// memory rather than the thread stack.
    fn strong_connect(&mut self, start: NodeId, adj: &HashMap<NodeId, Vec<NodeId>>) {
        let mut frames: Vec<(NodeId, usize)> = vec![(start, 0)];
        self.visit(start);

        while let Some(frame) = frames.last_mut() {
            let v = frame.0;
            let children = adj.get(&v).map(Vec::as_slice).unwrap_or_default();
            if let Some(&w) = children.get(frame.1) {
                frame.1 += 1;
                if !self.index.contains_key(&w) {
                    self.visit(w);
                    frames.push((w, 0));
                } else if self.on_stack.contains(&w) {
                    let w_idx = self.index[&w];
                    self.lower(v, w_idx);
                }
                continue;
            }

            frames.pop();
            let v_low = self.lowlink[&v];
            if let Some(&(parent, _)) = frames.last() {
                self.lower(parent, v_low);
            }
            if v_low == self.index[&v] {
                let mut scc = Vec::new();
                while let Some(w) = self.stack.pop() {
                    self.on_stack.remove(&w);
                    scc.push(w);
                    if w == v {
                        break;
                    }
                }
                self.sccs.push(scc);
            }
        }
    }

    fn visit(&mut self, v: NodeId) {
        self.index.insert(v, self.index_counter);
        self.lowlink.insert(v, self.index_counter);
        self.index_counter += 1;
        self.stack.push(v);
        self.on_stack.insert(v);
    }

    fn lower(&mut self, v: NodeId, candidate: u32) {
        if let Some(low) = self.lowlink.get_mut(&v) {
            if candidate < *low {
                *low = candidate;
            }
        }
    }
}

/// All strongly connected components, singletons included.
fn strongly_connected(nodes: &[NodeId], adj: &HashMap<NodeId, Vec<NodeId>>) -> Vec<Vec<NodeId>> {
    let mut tarjan = Tarjan::default();
    for &node in nodes {
        if !tarjan.index.contains_key(&node) {
            tarjan.strong_connect(node, adj);
        }
    }
    tarjan.sccs
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TrackGraphError;
    use crate::graph::store::tests::{seed_university, setup};
    use crate::types::NodePayload;

    fn or_node(store: &RequirementStore) -> NodeId {
        store.create_node(1, NodePayload::Or).unwrap().id
    }

    fn root(store: &RequirementStore, track: &str) -> NodeId {
        store
            .create_node(1, NodePayload::Root { track_id: track.into() })
            .unwrap()
            .id
    }

    fn leaf(store: &RequirementStore, course: &str) -> NodeId {
        let set = store.singleton_course_set(1, course).unwrap();
        store
            .create_node(1, NodePayload::Leaf { course_set_id: set.id })
            .unwrap()
            .id
    }

    #[test]
    fn well_formed_graph_is_clean() {
        let store = setup();
        seed_university(&store, 1, &["t"], &["C1", "C2"]);
        let r = root(&store, "t");
        let alt = or_node(&store);
        let a = leaf(&store, "C1");
        let b = leaf(&store, "C2");
        store.add_edge(r, alt).unwrap();
        store.add_edge(alt, a).unwrap();
        store.add_edge(alt, b).unwrap();

        let report = validate_university(&store, 1).unwrap();
        assert!(report.is_clean(), "{report:?}");
    }

    #[test]
    fn diamond_is_not_a_cycle() {
        let store = setup();
        seed_university(&store, 1, &["t"], &["X"]);
        let r = root(&store, "t");
        let p1 = or_node(&store);
        let p2 = or_node(&store);
        let x = leaf(&store, "X");
        for (from, to) in [(r, p1), (r, p2), (p1, x), (p2, x)] {
            store.add_edge(from, to).unwrap();
        }
        assert!(validate_university(&store, 1).unwrap().cycles.is_empty());
    }

    #[test]
    fn mutual_edges_form_a_cycle() {
        let store = setup();
        seed_university(&store, 1, &["t"], &[]);
        let r = root(&store, "t");
        let a = or_node(&store);
        let b = or_node(&store);
        store.add_edge(r, a).unwrap();
        store.add_edge(a, b).unwrap();
        store.add_edge(b, a).unwrap();

        let report = validate_university(&store, 1).unwrap();
        assert_eq!(
            report.cycles,
            vec![CycleInfo {
                node_ids: vec![a, b],
                size: 2
            }]
        );
        assert!(!report.is_clean());
    }

    #[test]
    fn independent_cycles_are_reported_separately() {
        let store = setup();
        seed_university(&store, 1, &[], &[]);
        let a = or_node(&store);
        let b = or_node(&store);
        let c = or_node(&store);
        let d = or_node(&store);
        let e = or_node(&store);
        for (from, to) in [(a, b), (b, a), (c, d), (d, e), (e, c)] {
            store.add_edge(from, to).unwrap();
        }

        let report = validate_university(&store, 1).unwrap();
        assert_eq!(report.cycles.len(), 2);
        assert_eq!(report.cycles[0].node_ids, vec![a, b]);
        assert_eq!(report.cycles[1].node_ids, vec![c, d, e]);
    }

    #[test]
    fn duplicate_roots_are_reported_oldest_first() {
        let store = setup();
        seed_university(&store, 1, &["t", "u"], &["C"]);
        let r1 = root(&store, "t");
        let r2 = root(&store, "t");
        let u = root(&store, "u");
        let l = leaf(&store, "C");
        for from in [r1, r2, u] {
            store.add_edge(from, l).unwrap();
        }

        let report = validate_university(&store, 1).unwrap();
        assert_eq!(
            report.duplicate_roots,
            vec![DuplicateRoot {
                track_id: "t".into(),
                node_ids: vec![r1, r2]
            }]
        );
    }

    #[test]
    fn childless_or_node_is_reported() {
        let store = setup();
        seed_university(&store, 1, &["t"], &[]);
        let r = root(&store, "t");
        let empty = or_node(&store);
        store.add_edge(r, empty).unwrap();

        let report = validate_university(&store, 1).unwrap();
        assert_eq!(report.childless_or_nodes, vec![empty]);
    }

    #[test]
    fn other_universities_do_not_leak_into_report() {
        let store = setup();
        seed_university(&store, 1, &[], &[]);
        seed_university(&store, 2, &[], &[]);
        store.create_node(2, NodePayload::Or).unwrap();

        let report = validate_university(&store, 1).unwrap();
        assert!(report.is_clean());
        assert_eq!(validate_university(&store, 2).unwrap().childless_or_nodes.len(), 1);
    }

    #[test]
    fn very_long_chain_does_not_exhaust_the_stack() {
        const LEN: NodeId = 200_000;
        let mut adj: HashMap<NodeId, Vec<NodeId>> = (1..LEN).map(|i| (i, vec![i + 1])).collect();
        adj.insert(LEN, vec![1]);
        let nodes: Vec<NodeId> = (1..=LEN).collect();

        let sccs = strongly_connected(&nodes, &adj);
        assert_eq!(sccs.len(), 1);
        assert_eq!(sccs[0].len(), LEN as usize);
    }

    #[test]
    fn tail_into_cycle_splits_into_components() {
        let adj: HashMap<NodeId, Vec<NodeId>> =
            [(1, vec![2]), (2, vec![3]), (3, vec![4]), (4, vec![2])].into_iter().collect();
        let mut sccs = strongly_connected(&[1, 2, 3, 4], &adj);
        for scc in &mut sccs {
            scc.sort_unstable();
        }
        sccs.sort();
        assert_eq!(sccs, vec![vec![1], vec![2, 3, 4]]);
    }

    #[test]
    fn unknown_university_is_an_error() {
        let store = setup();
        let err = validate_university(&store, 42).unwrap_err();
        assert!(matches!(err, TrackGraphError::UnknownUniversity(42)), "{err}");
    }

    #[test]
    fn empty_university_is_clean() {
        let store = setup();
        seed_university(&store, 1, &[], &[]);
        assert!(validate_university(&store, 1).unwrap().is_clean());
    }
}
