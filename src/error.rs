//! Error type shared by every trackgraph module.

use thiserror::Error;

use crate::types::{CourseSetId, NodeId, UniversityId};

/// Everything that can go wrong while building or querying a requirement graph.
#[derive(Debug, Error)]
pub enum TrackGraphError {
    /// Malformed min/max bounds on a course set.
    #[error("invalid course-set constraint: {0}")]
    InvalidConstraint(String),

    #[error("course {course_id} is already a member of course set {set_id}")]
    DuplicateMembership { set_id: CourseSetId, course_id: String },

    #[error("unknown university {0}")]
    UnknownUniversity(UniversityId),

    #[error("unknown track {track_id} in university {university_id}")]
    UnknownTrack {
        university_id: UniversityId,
        track_id: String,
    },

    #[error("unknown course set {course_set_id} in university {university_id}")]
    UnknownCourseSet {
        university_id: UniversityId,
        course_set_id: CourseSetId,
    },

    #[error("unknown course {course_id} in university {university_id}")]
    UnknownCourse {
        university_id: UniversityId,
        course_id: String,
    },

    #[error("unknown requirement node {0}")]
    UnknownNode(NodeId),

    #[error("edge from node {0} to itself is not allowed")]
    SelfLoop(NodeId),

    #[error(
        "cannot link node {from} (university {from_university}) \
         to node {to} (university {to_university})"
    )]
    CrossUniversity {
        from: NodeId,
        to: NodeId,
        from_university: UniversityId,
        to_university: UniversityId,
    },

    /// `attach_root` was given a node that cannot anchor the track.
    #[error("node {node_id} cannot be the root of track {track_id}: {reason}")]
    InvalidRoot {
        node_id: NodeId,
        track_id: String,
        reason: String,
    },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A stored row could not be mapped back to a domain record.
    #[error("corrupt record: {0}")]
    Corrupt(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl TrackGraphError {
    /// Whether the error was caused by the caller's input rather than by
    /// storage or environment. A serving layer reports these as bad requests.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidConstraint(_)
                | Self::DuplicateMembership { .. }
                | Self::UnknownUniversity(_)
                | Self::UnknownTrack { .. }
                | Self::UnknownCourseSet { .. }
                | Self::UnknownCourse { .. }
                | Self::UnknownNode(_)
                | Self::SelfLoop(_)
                | Self::CrossUniversity { .. }
                | Self::InvalidRoot { .. }
                | Self::InvalidArgument(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, TrackGraphError>;
