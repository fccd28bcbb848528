//! Core domain types for trackgraph.
//!
//! Catalog entities (universities, courses, tracks), course sets and their
//! memberships, and the requirement graph itself (nodes and edges).

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

pub type UniversityId = i64;
pub type NodeId = i64;
pub type CourseSetId = i64;

/// Free-form, university-specific metadata attached to most records.
pub type ExtraData = serde_json::Map<String, serde_json::Value>;

/// Upper bound used for course-set limits the caller left unset.
pub const UNBOUNDED: u32 = u32::MAX;

// ---------------------------------------------------------------------------
// Catalog entities
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct University {
    pub id: UniversityId,
    pub name: String,
    #[serde(default)]
    pub extra_data: ExtraData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    /// Unique within the owning university (e.g. "67101").
    pub id: String,
    pub university_id: UniversityId,
    pub credits: u32,
    #[serde(default)]
    pub extra_data: ExtraData,
}

/// Degree granted by a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DegreeType {
    Bachelors,
    Masters,
    Doctoral,
}

impl DegreeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bachelors => "bachelors",
            Self::Masters => "masters",
            Self::Doctoral => "doctoral",
        }
    }

    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "bachelors" | "bachelor" | "ba" | "bsc" => Some(Self::Bachelors),
            "masters" | "master" | "ma" | "msc" => Some(Self::Masters),
            "doctoral" | "doctorate" | "phd" => Some(Self::Doctoral),
            _ => None,
        }
    }
}

impl std::fmt::Display for DegreeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A published degree path within a university.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    /// Unique within the owning university (e.g. "23010").
    pub id: String,
    pub university_id: UniversityId,
    pub degree: DegreeType,
    #[serde(default)]
    pub extra_data: ExtraData,
}

// ---------------------------------------------------------------------------
// Course sets
// ---------------------------------------------------------------------------

/// A constrained collection of courses: choose between `min_subset_size`
/// and `max_subset_size` members whose credits sum to within
/// `[min_credits, max_credits]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseSet {
    pub id: CourseSetId,
    pub university_id: UniversityId,
    pub min_subset_size: u32,
    pub max_subset_size: u32,
    pub min_credits: u32,
    pub max_credits: u32,
    #[serde(default)]
    pub extra_data: ExtraData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseSetMembership {
    pub university_id: UniversityId,
    pub set_id: CourseSetId,
    pub course_id: String,
    #[serde(default)]
    pub extra_data: ExtraData,
}

// ---------------------------------------------------------------------------
// NodeKind
// ---------------------------------------------------------------------------

/// Discriminant of a requirement node, stored in the `node_type` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Root,
    Leaf,
    Or,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Root => "root",
            Self::Leaf => "leaf",
            Self::Or => "or",
        }
    }

    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s {
            "root" => Some(Self::Root),
            "leaf" | "course_set" => Some(Self::Leaf),
            "or" => Some(Self::Or),
            _ => None,
        }
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// NodePayload / RequirementNode
// ---------------------------------------------------------------------------

/// Variant-specific data of a requirement node.
///
/// Children of `Root` and `Leaf` nodes are all required; children of an
/// `Or` node are alternatives.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodePayload {
    /// Entry point of a track's requirement graph.
    Root { track_id: String },
    /// Satisfied by satisfying the referenced course set.
    Leaf { course_set_id: CourseSetId },
    Or,
}

impl NodePayload {
    pub fn kind(&self) -> NodeKind {
        match self {
            Self::Root { .. } => NodeKind::Root,
            Self::Leaf { .. } => NodeKind::Leaf,
            Self::Or => NodeKind::Or,
        }
    }
}

/// One vertex of a requirement graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequirementNode {
    pub id: NodeId,
    pub university_id: UniversityId,
    #[serde(flatten)]
    pub payload: NodePayload,
    #[serde(default)]
    pub extra_data: ExtraData,
}

impl RequirementNode {
    pub fn kind(&self) -> NodeKind {
        self.payload.kind()
    }

    /// The track this node anchors, for root nodes.
    pub fn track_id(&self) -> Option<&str> {
        match &self.payload {
            NodePayload::Root { track_id } => Some(track_id),
            _ => None,
        }
    }

    /// The wrapped course set, for leaf nodes.
    pub fn course_set_id(&self) -> Option<CourseSetId> {
        match self.payload {
            NodePayload::Leaf { course_set_id } => Some(course_set_id),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// RequirementEdge
// ---------------------------------------------------------------------------

/// `to` is a component of `from`: satisfying the child feeds the parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequirementEdge {
    pub from_node_id: NodeId,
    pub to_node_id: NodeId,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_kind_roundtrip() {
        for kind in [NodeKind::Root, NodeKind::Leaf, NodeKind::Or] {
            assert_eq!(NodeKind::from_str_loose(kind.as_str()), Some(kind));
            assert_eq!(format!("{kind}"), kind.as_str());
        }
        assert_eq!(NodeKind::from_str_loose("and"), None);
    }

    #[test]
    fn degree_type_loose_parsing() {
        assert_eq!(DegreeType::from_str_loose(" BSc "), Some(DegreeType::Bachelors));
        assert_eq!(DegreeType::from_str_loose("PhD"), Some(DegreeType::Doctoral));
        assert_eq!(DegreeType::from_str_loose("diploma"), None);
    }

    #[test]
    fn payload_kind_matches_variant() {
        let root = NodePayload::Root {
            track_id: "23010".into(),
        };
        assert_eq!(root.kind(), NodeKind::Root);
        assert_eq!(NodePayload::Leaf { course_set_id: 4 }.kind(), NodeKind::Leaf);
        assert_eq!(NodePayload::Or.kind(), NodeKind::Or);
    }

    #[test]
    fn node_serializes_flat_with_kind_tag() {
        let node = RequirementNode {
            id: 7,
            university_id: 1,
            payload: NodePayload::Leaf { course_set_id: 3 },
            extra_data: ExtraData::new(),
        };
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["kind"], "leaf");
        assert_eq!(json["course_set_id"], 3);
        assert_eq!(json["id"], 7);

        let back: RequirementNode = serde_json::from_value(json).unwrap();
        assert_eq!(back, node);
    }

    #[test]
    fn accessors_only_answer_for_their_variant() {
        let node = RequirementNode {
            id: 1,
            university_id: 1,
            payload: NodePayload::Root {
                track_id: "t".into(),
            },
            extra_data: ExtraData::new(),
        };
        assert_eq!(node.track_id(), Some("t"));
        assert_eq!(node.course_set_id(), None);
    }
}
