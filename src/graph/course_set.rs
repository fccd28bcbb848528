//! Course-set constraints: "choose a subset of these courses under size and
//! credit bounds".
//!
//! Bounds are validated here; membership is stored through
//! [`RequirementStore`]. Nothing in this module decides whether a given
//! selection of courses satisfies a set.

use rusqlite::params;

use crate::db::converters::{extra_data_to_sql, row_to_membership};
use crate::error::{Result, TrackGraphError};
use crate::graph::store::RequirementStore;
use crate::types::{CourseSet, CourseSetId, CourseSetMembership, ExtraData, UniversityId, UNBOUNDED};

// ---------------------------------------------------------------------------
// CourseSetSpec
// ---------------------------------------------------------------------------

/// Requested bounds for a new course set. Unset minimums default to 0 and
/// unset maximums to [`UNBOUNDED`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CourseSetSpec {
    pub min_subset_size: Option<u32>,
    pub max_subset_size: Option<u32>,
    pub min_credits: Option<u32>,
    pub max_credits: Option<u32>,
    pub extra_data: ExtraData,
}

impl CourseSetSpec {
    /// Exactly `n` members must be chosen.
    pub fn exactly(n: u32) -> Self {
        Self {
            min_subset_size: Some(n),
            max_subset_size: Some(n),
            ..Self::default()
        }
    }

    pub fn subset_size(mut self, min: Option<u32>, max: Option<u32>) -> Self {
        self.min_subset_size = min;
        self.max_subset_size = max;
        self
    }

    pub fn credits(mut self, min: Option<u32>, max: Option<u32>) -> Self {
        self.min_credits = min;
        self.max_credits = max;
        self
    }

    pub fn with_extra_data(mut self, extra_data: ExtraData) -> Self {
        self.extra_data = extra_data;
        self
    }
}

// ---------------------------------------------------------------------------
// CourseSetBounds
// ---------------------------------------------------------------------------

/// Fully resolved, validated bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CourseSetBounds {
    pub min_subset_size: u32,
    pub max_subset_size: u32,
    pub min_credits: u32,
    pub max_credits: u32,
}

impl CourseSetBounds {
    /// Apply defaults and check `min <= max` for both subset size and credits.
    pub fn resolve(spec: &CourseSetSpec) -> Result<Self> {
        let bounds = Self {
            min_subset_size: spec.min_subset_size.unwrap_or(0),
            max_subset_size: spec.max_subset_size.unwrap_or(UNBOUNDED),
            min_credits: spec.min_credits.unwrap_or(0),
            max_credits: spec.max_credits.unwrap_or(UNBOUNDED),
        };
        if bounds.min_subset_size > bounds.max_subset_size {
            return Err(TrackGraphError::InvalidConstraint(format!(
                "min_subset_size {} exceeds max_subset_size {}",
                bounds.min_subset_size, bounds.max_subset_size
            )));
        }
        if bounds.min_credits > bounds.max_credits {
            return Err(TrackGraphError::InvalidConstraint(format!(
                "min_credits {} exceeds max_credits {}",
                bounds.min_credits, bounds.max_credits
            )));
        }
        Ok(bounds)
    }
}

// ---------------------------------------------------------------------------
// SQL constants
// ---------------------------------------------------------------------------

const INSERT_COURSE_SET_SQL: &str = "\
INSERT INTO course_sets (university_id, min_subset_size, max_subset_size, min_credits, max_credits, extra_data)
VALUES (?1, ?2, ?3, ?4, ?5, ?6)";

const INSERT_MEMBERSHIP_SQL: &str = "\
INSERT INTO course_set_memberships (university_id, set_id, course_id, extra_data)
VALUES (?1, ?2, ?3, ?4)
ON CONFLICT(university_id, set_id, course_id) DO NOTHING";

const MEMBERS_SQL: &str = "\
SELECT * FROM course_set_memberships
WHERE university_id = ?1 AND set_id = ?2
ORDER BY rowid";

// ---------------------------------------------------------------------------
// Store operations
// ---------------------------------------------------------------------------

impl RequirementStore {
    /// Create an empty course set scoped to `university_id`.
    pub fn create_course_set(
        &self,
        university_id: UniversityId,
        spec: &CourseSetSpec,
    ) -> Result<CourseSet> {
        let bounds = CourseSetBounds::resolve(spec)?;
        self.require_university(university_id)?;

        let mut stmt = self.conn.prepare_cached(INSERT_COURSE_SET_SQL)?;
        stmt.execute(params![
            university_id,
            bounds.min_subset_size,
            bounds.max_subset_size,
            bounds.min_credits,
            bounds.max_credits,
            extra_data_to_sql(&spec.extra_data)?,
        ])?;
        let id = self.conn.last_insert_rowid();
        tracing::debug!(course_set_id = id, university_id, "created course set");

        Ok(CourseSet {
            id,
            university_id,
            min_subset_size: bounds.min_subset_size,
            max_subset_size: bounds.max_subset_size,
            min_credits: bounds.min_credits,
            max_credits: bounds.max_credits,
            extra_data: spec.extra_data.clone(),
        })
    }

    /// Add `course_id` to a set with empty membership metadata.
    pub fn add_member(&self, set: &CourseSet, course_id: &str) -> Result<CourseSetMembership> {
        self.add_member_with_extra(set, course_id, ExtraData::new())
    }

    /// Add `course_id` to a set. The course must belong to the set's
    /// university and must not already be a member.
    pub fn add_member_with_extra(
        &self,
        set: &CourseSet,
        course_id: &str,
        extra_data: ExtraData,
    ) -> Result<CourseSetMembership> {
        if self.get_course_set(set.university_id, set.id)?.is_none() {
            return Err(TrackGraphError::UnknownCourseSet {
                university_id: set.university_id,
                course_set_id: set.id,
            });
        }
        if self.get_course(set.university_id, course_id)?.is_none() {
            return Err(TrackGraphError::UnknownCourse {
                university_id: set.university_id,
                course_id: course_id.to_string(),
            });
        }

        let mut stmt = self.conn.prepare_cached(INSERT_MEMBERSHIP_SQL)?;
        let inserted = stmt.execute(params![
            set.university_id,
            set.id,
            course_id,
            extra_data_to_sql(&extra_data)?,
        ])?;
        if inserted == 0 {
            return Err(TrackGraphError::DuplicateMembership {
                set_id: set.id,
                course_id: course_id.to_string(),
            });
        }

        Ok(CourseSetMembership {
            university_id: set.university_id,
            set_id: set.id,
            course_id: course_id.to_string(),
            extra_data,
        })
    }

    /// A set holding exactly `course_id`, with `min = max = 1`: "this course
    /// is mandatory". Created atomically.
    pub fn singleton_course_set(
        &self,
        university_id: UniversityId,
        course_id: &str,
    ) -> Result<CourseSet> {
        self.in_transaction(|| {
            let set = self.create_course_set(university_id, &CourseSetSpec::exactly(1))?;
            self.add_member(&set, course_id)?;
            Ok(set)
        })
    }

    /// Memberships of a set, in insertion order.
    pub fn members_of(
        &self,
        university_id: UniversityId,
        set_id: CourseSetId,
    ) -> Result<Vec<CourseSetMembership>> {
        let mut stmt = self.conn.prepare_cached(MEMBERS_SQL)?;
        let rows = stmt.query_and_then(params![university_id, set_id], row_to_membership)?;
        rows.collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
