//! Graph layer: SQLite-backed requirement store, course-set constraints,
//! bounded traversal, and structural validation.

pub mod course_set;
pub mod store;
pub mod traversal;
pub mod validation;
