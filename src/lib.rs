//! trackgraph: degree-requirement graphs.
//!
//! Stores course-set constraints and the requirement graph of each degree
//! track in SQLite, and answers bounded-depth traversal queries over it.

pub mod catalog;
pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod graph;
pub mod observability;
pub mod types;
