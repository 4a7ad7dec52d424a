//! Retrack EDL Model
//!
//! Defines the edit decision list consumed by the reconstruction core:
//! - **Resources:** immutable references to source media files
//! - **Clips:** placements of source-media windows onto the timeline
//! - **Tracks:** ordered clip sequences with a primary/secondary role
//! - **Document:** the serialized EDL file with load/save and validation
//!
//! All times are expressed in seconds from timeline zero. Speed factors
//! are always derived from the source and timeline windows, never stored.

pub mod clip;
pub mod document;
pub mod resource;
pub mod track;

pub use clip::*;
pub use document::*;
pub use resource::*;
pub use track::*;
