//! SQLite schema initialization for trackgraph.
//!
//! One table per persisted entity. The requirement graph is a node table
//! plus a single edge table indexed in both directions, so parents and
//! children are read from the same relation.

use rusqlite::Connection;

// ---------------------------------------------------------------------------
// DDL constants, one statement per constant so a failing statement is easy
// to identify.
// ---------------------------------------------------------------------------

const CREATE_UNIVERSITIES: &str = "\
CREATE TABLE IF NOT EXISTS universities (
  id INTEGER PRIMARY KEY,
  name TEXT NOT NULL,
  extra_data TEXT NOT NULL DEFAULT '{}'
)";

const CREATE_COURSES: &str = "\
CREATE TABLE IF NOT EXISTS courses (
  university_id INTEGER NOT NULL REFERENCES universities(id),
  id TEXT NOT NULL,
  credits INTEGER NOT NULL DEFAULT 0,
  extra_data TEXT NOT NULL DEFAULT '{}',
  PRIMARY KEY (university_id, id)
)";

const CREATE_TRACKS: &str = "\
CREATE TABLE IF NOT EXISTS tracks (
  university_id INTEGER NOT NULL REFERENCES universities(id),
  id TEXT NOT NULL,
  degree TEXT NOT NULL,
  extra_data TEXT NOT NULL DEFAULT '{}',
  PRIMARY KEY (university_id, id)
)";

const CREATE_COURSE_SETS: &str = "\
CREATE TABLE IF NOT EXISTS course_sets (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  university_id INTEGER NOT NULL REFERENCES universities(id),
  min_subset_size INTEGER NOT NULL,
  max_subset_size INTEGER NOT NULL,
  min_credits INTEGER NOT NULL,
  max_credits INTEGER NOT NULL,
  extra_data TEXT NOT NULL DEFAULT '{}',
  UNIQUE (university_id, id),
  CHECK (min_subset_size <= max_subset_size AND min_credits <= max_credits)
)";

const CREATE_COURSE_SET_MEMBERSHIPS: &str = "\
CREATE TABLE IF NOT EXISTS course_set_memberships (
  university_id INTEGER NOT NULL,
  set_id INTEGER NOT NULL,
  course_id TEXT NOT NULL,
  extra_data TEXT NOT NULL DEFAULT '{}',
  PRIMARY KEY (university_id, set_id, course_id),
  FOREIGN KEY (university_id, set_id) REFERENCES course_sets(university_id, id),
  FOREIGN KEY (university_id, course_id) REFERENCES courses(university_id, id)
)";

const CREATE_REQUIREMENT_NODES: &str = "\
CREATE TABLE IF NOT EXISTS requirement_nodes (
  node_id INTEGER PRIMARY KEY AUTOINCREMENT,
  university_id INTEGER NOT NULL REFERENCES universities(id),
  node_type TEXT NOT NULL,
  track_id TEXT,
  course_set_id INTEGER,
  extra_data TEXT NOT NULL DEFAULT '{}',
  FOREIGN KEY (university_id, track_id) REFERENCES tracks(university_id, id),
  FOREIGN KEY (university_id, course_set_id) REFERENCES course_sets(university_id, id),
  CHECK (
    (node_type = 'root' AND track_id IS NOT NULL AND course_set_id IS NULL)
    OR (node_type = 'leaf' AND course_set_id IS NOT NULL AND track_id IS NULL)
    OR (node_type = 'or' AND track_id IS NULL AND course_set_id IS NULL)
  )
)";

const CREATE_REQUIREMENT_EDGES: &str = "\
CREATE TABLE IF NOT EXISTS requirement_edges (
  from_node_id INTEGER NOT NULL REFERENCES requirement_nodes(node_id),
  to_node_id INTEGER NOT NULL REFERENCES requirement_nodes(node_id),
  PRIMARY KEY (from_node_id, to_node_id),
  CONSTRAINT no_self_loops CHECK (from_node_id != to_node_id)
)";

// Indexes ----------------------------------------------------------------

const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_courses_university ON courses(university_id)",
    "CREATE INDEX IF NOT EXISTS idx_memberships_set ON course_set_memberships(set_id)",
    "CREATE INDEX IF NOT EXISTS idx_nodes_university ON requirement_nodes(university_id)",
    "CREATE INDEX IF NOT EXISTS idx_nodes_track ON requirement_nodes(university_id, track_id)",
    "CREATE INDEX IF NOT EXISTS idx_edges_from ON requirement_edges(from_node_id)",
    "CREATE INDEX IF NOT EXISTS idx_edges_to ON requirement_edges(to_node_id)",
];

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Open (or create) the SQLite database at `db_path` and apply the full
/// trackgraph schema.
///
/// The returned connection has WAL mode, foreign keys, and synchronous
/// NORMAL already configured. Pass `":memory:"` for a throwaway database.
///
/// # Errors
///
/// Returns a `rusqlite::Error` if the database cannot be opened or any DDL
/// statement fails.
pub fn initialize_database(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;

    // -- Pragmas ----------------------------------------------------------
    conn.pragma_update(None, "journal_mode", "WAL")?;
    // Catalog references (track, course set, course) are declared as
    // composite foreign keys; enforce them.
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;

    // -- Tables -----------------------------------------------------------
    conn.execute_batch(CREATE_UNIVERSITIES)?;
    conn.execute_batch(CREATE_COURSES)?;
    conn.execute_batch(CREATE_TRACKS)?;
    conn.execute_batch(CREATE_COURSE_SETS)?;
    conn.execute_batch(CREATE_COURSE_SET_MEMBERSHIPS)?;
    conn.execute_batch(CREATE_REQUIREMENT_NODES)?;
    conn.execute_batch(CREATE_REQUIREMENT_EDGES)?;

    // -- Indexes ----------------------------------------------------------
    for ddl in CREATE_INDEXES {
        conn.execute_batch(ddl)?;
    }

    tracing::debug!("schema applied to {db_path}");
    Ok(conn)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
