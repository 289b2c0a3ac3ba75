//! Error types for generation domain values.

use super::{GenerationStatus, GenerationTaskId};
use thiserror::Error;

/// Errors returned by generation task state changes.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GenerationDomainError {
    /// The requested status change is not a forward lifecycle step.
    #[error("invalid status transition for task {task_id}: {from} -> {to}")]
    InvalidStateTransition {
        /// Task being changed.
        task_id: GenerationTaskId,
        /// Current status.
        from: GenerationStatus,
        /// Rejected target status.
        to: GenerationStatus,
    },
}

/// Error returned while parsing a task status from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown generation status: {0}")]
pub struct ParseGenerationStatusError(pub String);

/// Error returned while parsing a request or stored parameter.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid {parameter}: {value}")]
pub struct ParseParameterError {
    /// Parameter name.
    pub parameter: &'static str,
    /// Rejected value.
    pub value: String,
}

impl ParseParameterError {
    /// Creates a parameter error.
    #[must_use]
    pub fn new(parameter: &'static str, value: &str) -> Self {
        Self {
            parameter,
            value: value.to_owned(),
        }
    }
}
