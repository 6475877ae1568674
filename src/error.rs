//! Error taxonomy for the report pipeline.
//!
//! Worker-level errors are always contained by `WorkerRunner::execute`;
//! `PipelineError` is the only class that reaches the orchestrator boundary,
//! where it is converted into the safety-net document.

use std::time::Duration;

use thiserror::Error;

use crate::models::WorkerStatus;

/// Errors raised by a text-generation backend.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("template error: {0}")]
    Template(#[from] minijinja::Error),

    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

/// Failures a single worker can run into while producing its section.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("input validation failed for worker '{worker}'")]
    InputValidation { worker: String },

    #[error("worker '{worker}' timed out after {}s", .timeout.as_secs_f32())]
    Timeout { worker: String, timeout: Duration },

    #[error("generation failed: {0}")]
    Generation(String),

    #[error("worker panicked: {0}")]
    Panicked(String),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Failures that abort the normal pipeline and trigger the safety net.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("context preparation failed: {0}")]
    Context(String),

    #[error("document composition failed: {0}")]
    Composition(String),

    #[error("dispatch failed: {0}")]
    Dispatch(String),
}

/// Attempted an edge that is not in the worker status transition table.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("illegal worker status transition {from:?} -> {to:?}")]
pub struct StatusTransitionError {
    pub from: WorkerStatus,
    pub to: WorkerStatus,
}
