//! Row-to-record conversion for the trackgraph tables.
//!
//! Every converter reads columns by name, so callers may select extra
//! columns (e.g. traversal annotations) alongside the entity's own.

use rusqlite::Row;

use crate::error::{Result, TrackGraphError};
use crate::types::{
    Course, CourseSet, CourseSetMembership, DegreeType, ExtraData, NodeKind, NodePayload,
    RequirementEdge, RequirementNode, Track, University,
};

/// Parse the JSON text stored in an `extra_data` column.
pub fn parse_extra_data(raw: &str) -> Result<ExtraData> {
    if raw.trim().is_empty() {
        return Ok(ExtraData::new());
    }
    Ok(serde_json::from_str(raw)?)
}

/// Serialize metadata for an `extra_data` column.
pub fn extra_data_to_sql(extra: &ExtraData) -> Result<String> {
    Ok(serde_json::to_string(extra)?)
}

fn extra_data_column(row: &Row<'_>) -> Result<ExtraData> {
    let raw: String = row.get("extra_data")?;
    parse_extra_data(&raw)
}

pub fn row_to_university(row: &Row<'_>) -> Result<University> {
    Ok(University {
        id: row.get("id")?,
        name: row.get("name")?,
        extra_data: extra_data_column(row)?,
    })
}

pub fn row_to_course(row: &Row<'_>) -> Result<Course> {
    Ok(Course {
        id: row.get("id")?,
        university_id: row.get("university_id")?,
        credits: row.get("credits")?,
        extra_data: extra_data_column(row)?,
    })
}

pub fn row_to_track(row: &Row<'_>) -> Result<Track> {
    let degree: String = row.get("degree")?;
    let degree = DegreeType::from_str_loose(&degree)
        .ok_or_else(|| TrackGraphError::Corrupt(format!("unknown degree type '{degree}'")))?;
    Ok(Track {
        id: row.get("id")?,
        university_id: row.get("university_id")?,
        degree,
        extra_data: extra_data_column(row)?,
    })
}

pub fn row_to_course_set(row: &Row<'_>) -> Result<CourseSet> {
    Ok(CourseSet {
        id: row.get("id")?,
        university_id: row.get("university_id")?,
        min_subset_size: row.get("min_subset_size")?,
        max_subset_size: row.get("max_subset_size")?,
        min_credits: row.get("min_credits")?,
        max_credits: row.get("max_credits")?,
        extra_data: extra_data_column(row)?,
    })
}

pub fn row_to_membership(row: &Row<'_>) -> Result<CourseSetMembership> {
    Ok(CourseSetMembership {
        university_id: row.get("university_id")?,
        set_id: row.get("set_id")?,
        course_id: row.get("course_id")?,
        extra_data: extra_data_column(row)?,
    })
}

/// Rebuild a [`RequirementNode`] from its discriminant and payload columns.
pub fn row_to_node(row: &Row<'_>) -> Result<RequirementNode> {
    let id: i64 = row.get("node_id")?;
    let node_type: String = row.get("node_type")?;
    let kind = NodeKind::from_str_loose(&node_type).ok_or_else(|| {
        TrackGraphError::Corrupt(format!("node {id} has unknown node_type '{node_type}'"))
    })?;

    let payload = match kind {
        NodeKind::Root => {
            let track_id: Option<String> = row.get("track_id")?;
            NodePayload::Root {
                track_id: track_id.ok_or_else(|| {
                    TrackGraphError::Corrupt(format!("root node {id} has no track_id"))
                })?,
            }
        }
        NodeKind::Leaf => {
            let course_set_id: Option<i64> = row.get("course_set_id")?;
            NodePayload::Leaf {
                course_set_id: course_set_id.ok_or_else(|| {
                    TrackGraphError::Corrupt(format!("leaf node {id} has no course_set_id"))
                })?,
            }
        }
        NodeKind::Or => NodePayload::Or,
    };

    Ok(RequirementNode {
        id,
        university_id: row.get("university_id")?,
        payload,
        extra_data: extra_data_column(row)?,
    })
}

pub fn row_to_edge(row: &Row<'_>) -> Result<RequirementEdge> {
    Ok(RequirementEdge {
        from_node_id: row.get("from_node_id")?,
        to_node_id: row.get("to_node_id")?,
    })
}
