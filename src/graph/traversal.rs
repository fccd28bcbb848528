//! Bounded-depth traversal of a track's requirement graph.
//!
//! Starting at the track's root, every node reachable within `max_depth`
//! hops is emitted once per incoming edge traversed, annotated with its
//! distance from the root and the parent it was reached through. The output
//! is a multiset: a requirement shared by two reachable parents appears
//! twice.
//!
//! Two interchangeable strategies produce the same multiset:
//! - [`TraversalStrategy::Worklist`]: iterative FIFO expansion in Rust,
//!   with per-call memoisation of child lists. Output order is
//!   breadth-first, and within a level follows edge insertion order.
//! - [`TraversalStrategy::RecursiveCte`]: a single SQLite
//!   `WITH RECURSIVE ... UNION ALL` query. Output is ordered by distance;
//!   order within a level is unspecified.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, VecDeque};

use rusqlite::params;
use serde::{Deserialize, Serialize};

use crate::db::converters::row_to_node;
use crate::error::{Result, TrackGraphError};
use crate::graph::store::RequirementStore;
use crate::types::{NodeId, RequirementNode, UniversityId};

/// Depth used when the caller does not specify one.
pub const DEFAULT_MAX_DEPTH: i64 = 10;

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// One occurrence of a node in a traversal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraversalRecord {
    pub node: RequirementNode,
    /// Number of edges on the path that produced this occurrence.
    pub distance: u32,
    /// Immediate predecessor on that path; `None` for the root.
    pub parent_id: Option<NodeId>,
}

/// How a traversal is executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraversalStrategy {
    #[default]
    Worklist,
    RecursiveCte,
}

impl TraversalStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Worklist => "worklist",
            Self::RecursiveCte => "recursive_cte",
        }
    }

    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "worklist" | "bfs" => Some(Self::Worklist),
            "recursive_cte" | "cte" | "sql" => Some(Self::RecursiveCte),
            _ => None,
        }
    }
}

impl std::fmt::Display for TraversalStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// SQL
// ---------------------------------------------------------------------------

const TRAVERSE_TRACK_SQL: &str = "\
WITH RECURSIVE walk(node_id, distance, parent_id) AS (
    -- Base: every root bound to the track
    SELECT node_id, 0, NULL
    FROM requirement_nodes
    WHERE university_id = ?1 AND node_type = 'root' AND track_id = ?2

    UNION ALL

    -- Recursive: one row per outgoing edge, duplicates kept
    SELECT e.to_node_id, w.distance + 1, w.node_id
    FROM walk w
    JOIN requirement_edges e ON e.from_node_id = w.node_id
    WHERE w.distance < ?3
)
SELECT n.*, w.distance AS distance, w.parent_id AS parent_id
FROM walk w
JOIN requirement_nodes n ON n.node_id = w.node_id
ORDER BY w.distance";

/// Reject negative depths and depths that do not fit a hop counter.
fn validate_depth(max_depth: i64) -> Result<u32> {
    u32::try_from(max_depth).map_err(|_| {
        TrackGraphError::InvalidArgument(format!(
            "max_depth must be between 0 and {}, got {max_depth}",
            u32::MAX
        ))
    })
}

// ---------------------------------------------------------------------------
// RequirementTraversal
// ---------------------------------------------------------------------------

/// Read-only traversal bound to a store.
pub struct RequirementTraversal<'a> {
    store: &'a RequirementStore,
}

impl<'a> RequirementTraversal<'a> {
    /// Create a new traversal bound to the given store.
    pub fn new(store: &'a RequirementStore) -> Self {
        Self { store }
    }

    /// Walk the track's requirement graph with the default strategy.
    ///
    /// A track without a root yields an empty sequence, not an error.
    /// `max_depth < 0` fails with [`TrackGraphError::InvalidArgument`].
    pub fn traverse(
        &self,
        university_id: UniversityId,
        track_id: &str,
        max_depth: i64,
    ) -> Result<Vec<TraversalRecord>> {
        self.traverse_with(TraversalStrategy::Worklist, university_id, track_id, max_depth)
    }

    /// Walk the track's requirement graph with an explicit strategy.
    pub fn traverse_with(
        &self,
        strategy: TraversalStrategy,
        university_id: UniversityId,
        track_id: &str,
        max_depth: i64,
    ) -> Result<Vec<TraversalRecord>> {
        let depth = validate_depth(max_depth)?;
        let records = match strategy {
            TraversalStrategy::Worklist => self.worklist(university_id, track_id, depth)?,
            TraversalStrategy::RecursiveCte => self.recursive_cte(university_id, track_id, depth)?,
        };
        tracing::debug!(
            university_id,
            track_id,
            max_depth = depth,
            %strategy,
            records = records.len(),
            "traversed track"
        );
        Ok(records)
    }

    // -------------------------------------------------------------------
    // Worklist
    // -------------------------------------------------------------------

    fn worklist(
        &self,
        university_id: UniversityId,
        track_id: &str,
        depth: u32,
    ) -> Result<Vec<TraversalRecord>> {
        let roots = self.store.roots_for(university_id, track_id)?;
        if roots.is_empty() {
            return Ok(Vec::new());
        }

        let mut queue: VecDeque<TraversalRecord> = roots
            .into_iter()
            .map(|node| TraversalRecord {
                node,
                distance: 0,
                parent_id: None,
            })
            .collect();
        let mut children_by_parent: HashMap<NodeId, Vec<RequirementNode>> = HashMap::new();
        let mut records = Vec::new();
        let mut truncated = 0usize;

        while let Some(record) = queue.pop_front() {
            let node_id = record.node.id;
            let children = match children_by_parent.entry(node_id) {
                Entry::Occupied(entry) => entry.into_mut(),
                Entry::Vacant(entry) => entry.insert(self.store.children_of(node_id)?),
            };

            if record.distance < depth {
                for child in children.iter() {
                    queue.push_back(TraversalRecord {
                        node: child.clone(),
                        distance: record.distance + 1,
                        parent_id: Some(node_id),
                    });
                }
            } else if !children.is_empty() {
                truncated += 1;
            }

            records.push(record);
        }

        if truncated > 0 {
            tracing::warn!(
                university_id,
                track_id,
                max_depth = depth,
                truncated,
                "traversal stopped at max_depth with unexpanded children; \
                 the graph may be cyclic or deeper than the bound"
            );
        }

        Ok(records)
    }

    // -------------------------------------------------------------------
    // Recursive CTE
    // -------------------------------------------------------------------

    fn recursive_cte(
        &self,
        university_id: UniversityId,
        track_id: &str,
        depth: u32,
    ) -> Result<Vec<TraversalRecord>> {
        let mut stmt = self.store.conn.prepare_cached(TRAVERSE_TRACK_SQL)?;
        let rows = stmt.query_and_then(params![university_id, track_id, depth], |row| {
            let node = row_to_node(row)?;
            let distance: u32 = row.get("distance")?;
            let parent_id: Option<NodeId> = row.get("parent_id")?;
            Ok::<_, TrackGraphError>(TraversalRecord {
                node,
                distance,
                parent_id,
            })
        })?;

        rows.collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
