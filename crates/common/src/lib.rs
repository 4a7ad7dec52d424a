//! Retrack Common Utilities
//!
//! Shared infrastructure for all Retrack crates:
//! - Error types and result aliases
//! - Render settings (sample rate, fades, drift tolerances)
//! - Tracing/logging initialization

pub mod error;
pub mod logging;
pub mod settings;

pub use error::*;
pub use settings::*;
