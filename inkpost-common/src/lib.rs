//! Shared types and utilities for the Inkpost workspace.
//!
//! This crate defines the common error taxonomy and the centralised
//! tracing/logging initialiser used by every binary and integration test.
//! It is intentionally lightweight so all workspace crates can depend on it
//! without heavy transitive costs.
//!
//! - [`InkpostError`] and [`Result`]: shared error handling
//! - [`observability`]: tracing setup with a rolling file sink

use std::path::PathBuf;

pub mod observability;

/// Error types used across the Inkpost system.
///
/// Per-item publishing failures are deliberately *not* modelled here: the
/// batch pipeline records those in its durable log and keeps going. These
/// variants cover the conditions that abort a run or a step outright.
#[derive(thiserror::Error, Debug)]
pub enum InkpostError {
    /// The browser driver reported an error.
    #[error("driver error: {0}")]
    Driver(#[from] anyhow::Error),

    /// Configuration was incomplete or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// A required precondition (work directory, platform entry) was unmet.
    /// Raised before any work item is attempted.
    #[error("precondition failed: {0}")]
    Precondition(String),

    /// A bounded wait elapsed without the expected condition. Diagnostic
    /// artifacts, if captured, are referenced by path.
    #[error("timed out waiting for {what}")]
    Timeout {
        what: String,
        diagnostics: Option<PathBuf>,
    },

    /// The run was interrupted by the user.
    #[error("cancelled")]
    Cancelled,
}

impl InkpostError {
    pub fn precondition(msg: impl Into<String>) -> Self {
        Self::Precondition(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

/// Convenient alias for results that use [`InkpostError`].
pub type Result<T> = std::result::Result<T, InkpostError>;
