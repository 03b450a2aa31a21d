//! FILENAME: src/error.rs
//! Error types for the pivot pipeline.
//!
//! Every error is raised at step-construction time. Applying a pipeline
//! never fails: malformed per-row values are excluded by the null-like
//! filter (see `value`) instead of raising.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PivotError {
    #[error("Invalid field path: '{0}'")]
    InvalidFieldPath(String),

    #[error("Unknown aggregation function: '{0}'")]
    UnknownAggregation(String),
}
