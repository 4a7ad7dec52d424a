//! Retrack Reconstruction Core
//!
//! Rebuilds a project's audio track from its edit decision list:
//!
//! 1. **Planner** — per clip, a pure processing recipe (trim window,
//!    bounded speed-step chain, click-suppression fades).
//! 2. **Renderer** — executes recipes against the engine with a
//!    single-flight extraction cache and mandatory drift correction.
//! 3. **Assembler** — sequences segments and synthesized silence into
//!    one continuous primary stream.
//! 4. **Mixer** — overlays secondary-track segments at their absolute
//!    offsets, additively and without normalization.
//!
//! [`pipeline::rebuild_timeline`] drives the whole flow: primary clips
//! render in parallel on the blocking pool, assembly and mixing are the
//! sequential tail of the pipeline.

pub mod assembler;
pub mod cache;
pub mod mixer;
pub mod pipeline;
pub mod planner;
pub mod renderer;
pub mod report;

pub use pipeline::*;
pub use planner::*;
pub use report::*;
