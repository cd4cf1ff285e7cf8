//! Boundary error taxonomy (spec.md §6/§7).
//!
//! Validation errors abort a run before any computation. Propagator errors
//! abort only the affected (satellite, target) pair. Invariant failures are
//! bugs and carry the violating record verbatim.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PlanError {
    #[error("invalid TLE for satellite '{satellite_id}': {reason}")]
    InvalidTle { satellite_id: String, reason: String },

    #[error("invalid target '{target_id}': {reason}")]
    InvalidTarget { target_id: String, reason: String },

    #[error("invalid horizon: {reason}")]
    InvalidHorizon { reason: String },

    #[error("invalid scheduler config field '{field}': {reason}")]
    SchedulerConfigInvalid { field: String, reason: String },

    #[error("propagator error for satellite '{satellite_id}': {reason}")]
    PropagatorError { satellite_id: String, reason: String },

    #[error("run cancelled")]
    RunCancelled,

    #[error("internal error: {message}")]
    InternalError {
        message: String,
        details: Vec<String>,
    },
}

impl PlanError {
    pub fn kind(&self) -> &'static str {
        match self {
            PlanError::InvalidTle { .. } => "INVALID_TLE",
            PlanError::InvalidTarget { .. } => "INVALID_TARGET",
            PlanError::InvalidHorizon { .. } => "INVALID_HORIZON",
            PlanError::SchedulerConfigInvalid { .. } => "SCHEDULER_CONFIG_INVALID",
            PlanError::PropagatorError { .. } => "PROPAGATOR_ERROR",
            PlanError::RunCancelled => "RUN_CANCELLED",
            PlanError::InternalError { .. } => "INTERNAL_ERROR",
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        PlanError::InternalError {
            message: message.into(),
            details: Vec::new(),
        }
    }

    pub fn internal_with_details(message: impl Into<String>, details: Vec<String>) -> Self {
        PlanError::InternalError {
            message: message.into(),
            details,
        }
    }
}

pub type PlanResult<T> = Result<T, PlanError>;

/// Per-propagation failure kind, counted rather than surfaced (spec.md §4.1).
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PropagatorError {
    #[error("TLE epoch unusable: {0}")]
    UnusableEpoch(String),
    #[error("requested time outside the predictor's stable window: {0}")]
    UnstableWindow(String),
    #[error("sgp4 propagation failed: {0}")]
    Sgp4(String),
}
