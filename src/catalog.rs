//! Catalog facade: the narrow surface importers and query servers use.
//!
//! Importers register universities, courses and tracks, then build course
//! sets and requirement nodes, link them, and attach each track's root. Query
//! servers call [`Catalog::query`] and serialize the records. Multi-step
//! builds run in a single SQLite transaction, so a failed build leaves no
//! partial rows behind.

use std::path::Path;

use crate::config::{resolve_db_path, TrackGraphConfig, TraversalSettings};
use crate::error::{Result, TrackGraphError};
use crate::graph::course_set::CourseSetSpec;
use crate::graph::store::RequirementStore;
use crate::graph::traversal::{RequirementTraversal, TraversalRecord};
use crate::graph::validation::{validate_university, ValidationReport};
use crate::types::{
    Course, CourseSet, NodeId, NodePayload, RequirementNode, Track, University, UniversityId,
};

const IN_MEMORY: &str = ":memory:";

/// A requirement store plus the traversal defaults applied to queries.
#[derive(Debug)]
pub struct Catalog {
    store: RequirementStore,
    settings: TraversalSettings,
}

impl Catalog {
    /// Open the database named by `config`, creating parent directories and
    /// applying the schema as needed.
    pub fn open(config: &TrackGraphConfig) -> Result<Self> {
        config.validate()?;
        let path = resolve_db_path(config)?;
        let path_str = path.to_str().ok_or_else(|| {
            TrackGraphError::Config(format!("database path is not valid UTF-8: {}", path.display()))
        })?;

        if path_str != IN_MEMORY {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
        }

        let store = RequirementStore::new(path_str)?;
        tracing::info!(db = path_str, strategy = %config.traversal.strategy, "opened catalog");
        Ok(Self::new(store, config.traversal))
    }

    /// Open a catalog on an explicit database path with default settings.
    pub fn open_path(db_path: &Path) -> Result<Self> {
        let mut config = TrackGraphConfig::default();
        config.database.path = Some(db_path.to_path_buf());
        Self::open(&config)
    }

    pub fn new(store: RequirementStore, settings: TraversalSettings) -> Self {
        Self { store, settings }
    }

    pub fn store(&self) -> &RequirementStore {
        &self.store
    }

    pub fn settings(&self) -> TraversalSettings {
        self.settings
    }

    // -------------------------------------------------------------------
    // Registration
    // -------------------------------------------------------------------

    pub fn register_university(&self, university: &University) -> Result<()> {
        self.store.upsert_university(university)
    }

    pub fn register_course(&self, course: &Course) -> Result<()> {
        self.store.upsert_course(course)
    }

    pub fn register_track(&self, track: &Track) -> Result<()> {
        self.store.upsert_track(track)
    }

    // -------------------------------------------------------------------
    // Building
    // -------------------------------------------------------------------

    /// Create a course set and all of its memberships, or nothing.
    pub fn build_course_set<I, S>(
        &self,
        university_id: UniversityId,
        spec: &CourseSetSpec,
        course_ids: I,
    ) -> Result<CourseSet>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.store.in_transaction(|| {
            let set = self.store.create_course_set(university_id, spec)?;
            for course_id in course_ids {
                self.store.add_member(&set, course_id.as_ref())?;
            }
            Ok(set)
        })
    }

    /// A mandatory single course.
    pub fn build_singleton(&self, university_id: UniversityId, course_id: &str) -> Result<CourseSet> {
        self.store.singleton_course_set(university_id, course_id)
    }

    pub fn build_node(&self, university_id: UniversityId, payload: NodePayload) -> Result<RequirementNode> {
        self.store.create_node(university_id, payload)
    }

    /// Add a parent → child edge. Returns `false` if it already existed.
    pub fn link(&self, parent: NodeId, child: NodeId) -> Result<bool> {
        self.store.add_edge(parent, child)
    }

    /// Bind `node` as the root of `track_id`. The node must be a root built
    /// for that track in the same university, and the track must not already
    /// be anchored by a different root. Attaching the current root again is
    /// a no-op. Returns the root, which [`RequirementStore::root_for`] now
    /// resolves to.
    pub fn attach_root(
        &self,
        university_id: UniversityId,
        track_id: &str,
        node: NodeId,
    ) -> Result<RequirementNode> {
        if self.store.get_track(university_id, track_id)?.is_none() {
            return Err(TrackGraphError::UnknownTrack {
                university_id,
                track_id: track_id.to_string(),
            });
        }
        let root = self.store.require_node(node)?;
        let invalid = |reason: String| TrackGraphError::InvalidRoot {
            node_id: node,
            track_id: track_id.to_string(),
            reason,
        };

        if root.university_id != university_id {
            return Err(invalid(format!("node belongs to university {}", root.university_id)));
        }
        match root.track_id() {
            Some(bound) if bound == track_id => {}
            Some(bound) => return Err(invalid(format!("node is the root of track {bound}"))),
            None => return Err(invalid(format!("node is a {} node", root.kind()))),
        }
        if let Some(existing) = self.store.root_for(university_id, track_id)? {
            if existing.id != root.id {
                return Err(invalid(format!("track is already rooted at node {}", existing.id)));
            }
        }

        tracing::debug!(university_id, track_id, node, "attached track root");
        Ok(root)
    }

    // -------------------------------------------------------------------
    // Querying
    // -------------------------------------------------------------------

    /// Requirement structure of a track. `None` uses the configured default
    /// depth. An empty result means the track has no requirements.
    pub fn query(
        &self,
        university_id: UniversityId,
        track_id: &str,
        max_depth: Option<i64>,
    ) -> Result<Vec<TraversalRecord>> {
        let depth = max_depth.unwrap_or(self.settings.default_max_depth);
        RequirementTraversal::new(&self.store).traverse_with(
            self.settings.strategy,
            university_id,
            track_id,
            depth,
        )
    }

    pub fn validate(&self, university_id: UniversityId) -> Result<ValidationReport> {
        validate_university(&self.store, university_id)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
