//! Retrack Audio Engine
//!
//! The contract between the reconstruction core and the external audio
//! processor, plus the default ffmpeg-backed implementation.
//!
//! The core never shells out directly: it issues the primitive
//! operations of [`AudioEngine`] (extract, render, silence, concat,
//! mix, export) and treats each invocation as atomic — it either fully
//! produces a handle or fails.

pub mod ffmpeg;
pub mod ops;

pub use ffmpeg::*;
pub use ops::*;
