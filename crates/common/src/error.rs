//! Error types shared across Retrack crates.

use std::path::PathBuf;

/// Top-level error type for Retrack operations.
#[derive(Debug, thiserror::Error)]
pub enum RetrackError {
    /// A clip references a resource that is absent from the resource
    /// table or whose source file does not exist on disk.
    #[error("Resource missing: {resource_id} ({detail})")]
    ResourceMissing { resource_id: String, detail: String },

    /// A processing-engine primitive failed (extraction, render,
    /// concat, mix, export).
    #[error("Engine error: {message}")]
    Engine { message: String },

    /// A rendered segment still deviates beyond the hard ceiling after
    /// pad/trim correction. This points at a planner bug, not engine
    /// imprecision, and is fatal for the run.
    #[error(
        "Unrecoverable drift on clip {clip_index}: expected {expected_secs:.3}s, got {actual_secs:.3}s"
    )]
    DriftUnrecoverable {
        clip_index: usize,
        expected_secs: f64,
        actual_secs: f64,
    },

    #[error("EDL error: {message}")]
    Edl { message: String },

    #[error("Enhancement error: {message}")]
    Enhancement { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using RetrackError.
pub type RetrackResult<T> = Result<T, RetrackError>;

impl RetrackError {
    pub fn resource_missing(resource_id: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::ResourceMissing {
            resource_id: resource_id.into(),
            detail: detail.into(),
        }
    }

    pub fn engine(msg: impl Into<String>) -> Self {
        Self::Engine {
            message: msg.into(),
        }
    }

    pub fn edl(msg: impl Into<String>) -> Self {
        Self::Edl {
            message: msg.into(),
        }
    }

    pub fn enhancement(msg: impl Into<String>) -> Self {
        Self::Enhancement {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Whether this error may be absorbed at single-clip granularity by
    /// substituting silence of the clip's target duration.
    pub fn is_clip_recoverable(&self) -> bool {
        matches!(
            self,
            Self::ResourceMissing { .. } | Self::Engine { .. } | Self::FileNotFound { .. }
        )
    }
}
