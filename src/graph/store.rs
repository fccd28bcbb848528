//! SQLite CRUD layer for requirement graphs.
//!
//! Uses `rusqlite` with `prepare_cached` for automatic statement caching.
//! Nodes never reference each other directly: the single
//! `requirement_edges` relation, indexed by both endpoints, answers both
//! `children_of` and `parents_of`.

use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;

use crate::db::converters::{
    extra_data_to_sql, row_to_course, row_to_course_set, row_to_edge, row_to_node, row_to_track,
    row_to_university,
};
use crate::db::schema::initialize_database;
use crate::error::{Result, TrackGraphError};
use crate::types::{
    Course, CourseSet, CourseSetId, ExtraData, NodeId, NodePayload, RequirementEdge,
    RequirementNode, Track, University, UniversityId,
};

// ---------------------------------------------------------------------------
// GraphStats
// ---------------------------------------------------------------------------

/// Row counts for every stored entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GraphStats {
    pub universities: usize,
    pub courses: usize,
    pub tracks: usize,
    pub course_sets: usize,
    pub nodes: usize,
    pub edges: usize,
}

// ---------------------------------------------------------------------------
// RequirementStore
// ---------------------------------------------------------------------------

/// Typed CRUD wrapper around the trackgraph SQLite database.
///
/// Every query goes through [`Connection::prepare_cached`], so the first
/// call compiles the statement and later calls reuse it. Writes are visible
/// to the next read on the same store immediately.
pub struct RequirementStore {
    pub conn: Connection,
}

impl std::fmt::Debug for RequirementStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequirementStore").finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// SQL constants
// ---------------------------------------------------------------------------

const UPSERT_UNIVERSITY_SQL: &str = "\
INSERT INTO universities (id, name, extra_data)
VALUES (?1, ?2, ?3)
ON CONFLICT(id) DO UPDATE SET
  name = excluded.name,
  extra_data = excluded.extra_data";

const UPSERT_COURSE_SQL: &str = "\
INSERT INTO courses (university_id, id, credits, extra_data)
VALUES (?1, ?2, ?3, ?4)
ON CONFLICT(university_id, id) DO UPDATE SET
  credits = excluded.credits,
  extra_data = excluded.extra_data";

const UPSERT_TRACK_SQL: &str = "\
INSERT INTO tracks (university_id, id, degree, extra_data)
VALUES (?1, ?2, ?3, ?4)
ON CONFLICT(university_id, id) DO UPDATE SET
  degree = excluded.degree,
  extra_data = excluded.extra_data";

const INSERT_NODE_SQL: &str = "\
INSERT INTO requirement_nodes (university_id, node_type, track_id, course_set_id, extra_data)
VALUES (?1, ?2, ?3, ?4, ?5)";

const INSERT_EDGE_SQL: &str = "\
INSERT INTO requirement_edges (from_node_id, to_node_id)
VALUES (?1, ?2)
ON CONFLICT(from_node_id, to_node_id) DO NOTHING";

// Edge rowid order is insertion order, which is the documented
// intra-level order of a traversal.
const CHILDREN_SQL: &str = "\
SELECT n.* FROM requirement_edges e
JOIN requirement_nodes n ON n.node_id = e.to_node_id
WHERE e.from_node_id = ?1
ORDER BY e.rowid";

const PARENTS_SQL: &str = "\
SELECT n.* FROM requirement_edges e
JOIN requirement_nodes n ON n.node_id = e.from_node_id
WHERE e.to_node_id = ?1
ORDER BY e.rowid";

const ROOTS_FOR_TRACK_SQL: &str = "\
SELECT * FROM requirement_nodes
WHERE university_id = ?1 AND node_type = 'root' AND track_id = ?2
ORDER BY node_id";

const EDGES_FOR_UNIVERSITY_SQL: &str = "\
SELECT e.from_node_id, e.to_node_id FROM requirement_edges e
JOIN requirement_nodes n ON n.node_id = e.from_node_id
WHERE n.university_id = ?1
ORDER BY e.rowid";

// ---------------------------------------------------------------------------
// Implementation
// ---------------------------------------------------------------------------

impl RequirementStore {
    /// Open (or create) the database at `db_path`, apply the schema, and
    /// return a ready-to-use store.
    pub fn new(db_path: &str) -> Result<Self> {
        let conn = initialize_database(db_path)?;
        Ok(Self { conn })
    }

    /// Wrap an already-open connection. The caller is responsible for
    /// having applied the schema (see [`initialize_database`]).
    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }

    /// Run `f` inside a transaction, committing on success. When a
    /// transaction is already open on this connection, `f` joins it instead
    /// of starting a nested one.
    pub fn in_transaction<T>(&self, f: impl FnOnce() -> Result<T>) -> Result<T> {
        if !self.conn.is_autocommit() {
            return f();
        }
        let tx = self.conn.unchecked_transaction()?;
        let value = f()?;
        tx.commit()?;
        Ok(value)
    }

    // -------------------------------------------------------------------
    // Catalog entities
    // -------------------------------------------------------------------

    /// Insert or update a university.
    pub fn upsert_university(&self, university: &University) -> Result<()> {
        let mut stmt = self.conn.prepare_cached(UPSERT_UNIVERSITY_SQL)?;
        stmt.execute(params![
            university.id,
            university.name,
            extra_data_to_sql(&university.extra_data)?,
        ])?;
        Ok(())
    }

    pub fn get_university(&self, id: UniversityId) -> Result<Option<University>> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT * FROM universities WHERE id = ?1")?;
        let mut rows = stmt.query_and_then(params![id], row_to_university)?;
        rows.next().transpose()
    }

    /// Fail with [`TrackGraphError::UnknownUniversity`] unless `id` is registered.
    pub(crate) fn require_university(&self, id: UniversityId) -> Result<()> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT 1 FROM universities WHERE id = ?1")?;
        let found: Option<i64> = stmt.query_row(params![id], |row| row.get(0)).optional()?;
        match found {
            Some(_) => Ok(()),
            None => Err(TrackGraphError::UnknownUniversity(id)),
        }
    }

    /// Insert or update a course. The owning university must exist.
    pub fn upsert_course(&self, course: &Course) -> Result<()> {
        self.require_university(course.university_id)?;
        let mut stmt = self.conn.prepare_cached(UPSERT_COURSE_SQL)?;
        stmt.execute(params![
            course.university_id,
            course.id,
            course.credits,
            extra_data_to_sql(&course.extra_data)?,
        ])?;
        Ok(())
    }

    pub fn get_course(&self, university_id: UniversityId, course_id: &str) -> Result<Option<Course>> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT * FROM courses WHERE university_id = ?1 AND id = ?2")?;
        let mut rows = stmt.query_and_then(params![university_id, course_id], row_to_course)?;
        rows.next().transpose()
    }

    /// Insert or update a track. The owning university must exist.
    pub fn upsert_track(&self, track: &Track) -> Result<()> {
        self.require_university(track.university_id)?;
        let mut stmt = self.conn.prepare_cached(UPSERT_TRACK_SQL)?;
        stmt.execute(params![
            track.university_id,
            track.id,
            track.degree.as_str(),
            extra_data_to_sql(&track.extra_data)?,
        ])?;
        Ok(())
    }

    pub fn get_track(&self, university_id: UniversityId, track_id: &str) -> Result<Option<Track>> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT * FROM tracks WHERE university_id = ?1 AND id = ?2")?;
        let mut rows = stmt.query_and_then(params![university_id, track_id], row_to_track)?;
        rows.next().transpose()
    }

    /// Look up a course set within a university. A set that exists under a
    /// different university is reported as missing.
    pub fn get_course_set(
        &self,
        university_id: UniversityId,
        set_id: CourseSetId,
    ) -> Result<Option<CourseSet>> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT * FROM course_sets WHERE university_id = ?1 AND id = ?2")?;
        let mut rows = stmt.query_and_then(params![university_id, set_id], row_to_course_set)?;
        rows.next().transpose()
    }

    // -------------------------------------------------------------------
    // Nodes
    // -------------------------------------------------------------------

    /// Create a requirement node with empty metadata.
    pub fn create_node(
        &self,
        university_id: UniversityId,
        payload: NodePayload,
    ) -> Result<RequirementNode> {
        self.create_node_with_extra(university_id, payload, ExtraData::new())
    }

    /// Create a requirement node, allocating a fresh identifier.
    ///
    /// Root payloads must reference a track and leaf payloads a course set
    /// of the same university.
    pub fn create_node_with_extra(
        &self,
        university_id: UniversityId,
        payload: NodePayload,
        extra_data: ExtraData,
    ) -> Result<RequirementNode> {
        self.require_university(university_id)?;

        let (track_id, course_set_id) = match &payload {
            NodePayload::Root { track_id } => {
                if self.get_track(university_id, track_id)?.is_none() {
                    return Err(TrackGraphError::UnknownTrack {
                        university_id,
                        track_id: track_id.clone(),
                    });
                }
                (Some(track_id.as_str()), None)
            }
            NodePayload::Leaf { course_set_id } => {
                if self.get_course_set(university_id, *course_set_id)?.is_none() {
                    return Err(TrackGraphError::UnknownCourseSet {
                        university_id,
                        course_set_id: *course_set_id,
                    });
                }
                (None, Some(*course_set_id))
            }
            NodePayload::Or => (None, None),
        };

        let mut stmt = self.conn.prepare_cached(INSERT_NODE_SQL)?;
        stmt.execute(params![
            university_id,
            payload.kind().as_str(),
            track_id,
            course_set_id,
            extra_data_to_sql(&extra_data)?,
        ])?;
        let id = self.conn.last_insert_rowid();
        tracing::debug!(node_id = id, kind = %payload.kind(), university_id, "created requirement node");

        Ok(RequirementNode {
            id,
            university_id,
            payload,
            extra_data,
        })
    }

    /// Retrieve a single node by its ID, or `None` if it doesn't exist.
    pub fn get_node(&self, id: NodeId) -> Result<Option<RequirementNode>> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT * FROM requirement_nodes WHERE node_id = ?1")?;
        let mut rows = stmt.query_and_then(params![id], row_to_node)?;
        rows.next().transpose()
    }

    /// Like [`get_node`](Self::get_node) but a missing node is an error.
    pub fn require_node(&self, id: NodeId) -> Result<RequirementNode> {
        self.get_node(id)?.ok_or(TrackGraphError::UnknownNode(id))
    }

    /// Every node owned by a university, in creation order.
    pub fn nodes_for_university(&self, university_id: UniversityId) -> Result<Vec<RequirementNode>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT * FROM requirement_nodes WHERE university_id = ?1 ORDER BY node_id",
        )?;
        let rows = stmt.query_and_then(params![university_id], row_to_node)?;
        rows.collect()
    }

    // -------------------------------------------------------------------
    // Edges
    // -------------------------------------------------------------------

    /// Link `from` (parent) to `to` (child).
    ///
    /// Returns `true` if a new edge was stored and `false` if the edge
    /// already existed; linking the same pair twice never creates a
    /// multi-edge.
    pub fn add_edge(&self, from: NodeId, to: NodeId) -> Result<bool> {
        if from == to {
            return Err(TrackGraphError::SelfLoop(from));
        }
        let parent = self.require_node(from)?;
        let child = self.require_node(to)?;
        if parent.university_id != child.university_id {
            return Err(TrackGraphError::CrossUniversity {
                from,
                to,
                from_university: parent.university_id,
                to_university: child.university_id,
            });
        }

        let mut stmt = self.conn.prepare_cached(INSERT_EDGE_SQL)?;
        let inserted = stmt.execute(params![from, to])? > 0;
        if inserted {
            tracing::debug!(from, to, "linked requirement nodes");
        } else {
            tracing::debug!(from, to, "edge already present, nothing to do");
        }
        Ok(inserted)
    }

    /// Direct children of `node_id`, in edge insertion order.
    pub fn children_of(&self, node_id: NodeId) -> Result<Vec<RequirementNode>> {
        let mut stmt = self.conn.prepare_cached(CHILDREN_SQL)?;
        let rows = stmt.query_and_then(params![node_id], row_to_node)?;
        rows.collect()
    }

    /// Direct parents of `node_id`, in edge insertion order.
    pub fn parents_of(&self, node_id: NodeId) -> Result<Vec<RequirementNode>> {
        let mut stmt = self.conn.prepare_cached(PARENTS_SQL)?;
        let rows = stmt.query_and_then(params![node_id], row_to_node)?;
        rows.collect()
    }

    /// Every edge whose endpoints belong to `university_id`.
    pub fn edges_for_university(&self, university_id: UniversityId) -> Result<Vec<RequirementEdge>> {
        let mut stmt = self.conn.prepare_cached(EDGES_FOR_UNIVERSITY_SQL)?;
        let rows = stmt.query_and_then(params![university_id], row_to_edge)?;
        rows.collect()
    }

    // -------------------------------------------------------------------
    // Roots
    // -------------------------------------------------------------------

    /// The root node anchoring `track_id`, or `None` if none was created.
    ///
    /// One root per track is a convention, not a constraint; when several
    /// exist the oldest wins.
    pub fn root_for(
        &self,
        university_id: UniversityId,
        track_id: &str,
    ) -> Result<Option<RequirementNode>> {
        Ok(self.roots_for(university_id, track_id)?.into_iter().next())
    }

    /// Every root node bound to `track_id`, oldest first.
    pub fn roots_for(
        &self,
        university_id: UniversityId,
        track_id: &str,
    ) -> Result<Vec<RequirementNode>> {
        let mut stmt = self.conn.prepare_cached(ROOTS_FOR_TRACK_SQL)?;
        let rows = stmt.query_and_then(params![university_id, track_id], row_to_node)?;
        rows.collect()
    }

    // -------------------------------------------------------------------
    // Aggregate counts
    // -------------------------------------------------------------------

    fn count_rows(&self, sql: &str) -> Result<usize> {
        let mut stmt = self.conn.prepare_cached(sql)?;
        let count: i64 = stmt.query_row([], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Get row counts for every table.
    pub fn get_stats(&self) -> Result<GraphStats> {
        Ok(GraphStats {
            universities: self.count_rows("SELECT count(*) FROM universities")?,
            courses: self.count_rows("SELECT count(*) FROM courses")?,
            tracks: self.count_rows("SELECT count(*) FROM tracks")?,
            course_sets: self.count_rows("SELECT count(*) FROM course_sets")?,
            nodes: self.count_rows("SELECT count(*) FROM requirement_nodes")?,
            edges: self.count_rows("SELECT count(*) FROM requirement_edges")?,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
