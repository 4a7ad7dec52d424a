//! Retrack Speech Enhancement
//!
//! Optional post-processing step that hands the rebuilt stream to an
//! external enhancement tool. The tool is user-configured (any command
//! with `{input}` and `{output}` placeholders), bounded by a timeout,
//! and speaks a small exit-code contract so failures stay diagnosable.
//!
//! Enhancement is always best-effort: every failure here is typed so
//! the caller can fall back to the unenhanced stream explicitly.

pub mod enhancer;

pub use enhancer::*;
