//! Segment rendering: recipe execution with drift correction.

use std::path::Path;

use retrack_common::{RenderSettings, RetrackError, RetrackResult};
use retrack_engine::{AudioEngine, AudioHandle};

use crate::cache::SourceCache;
use crate::planner::ClipRecipe;

/// A rendered, fixed-duration segment ready for assembly or mixing.
#[derive(Debug, Clone)]
pub struct RenderedSegment {
    pub handle: AudioHandle,
    pub duration_secs: f64,
    /// Whether drift correction had to re-request the segment.
    pub corrected: bool,
}

/// Executes one recipe against the engine.
pub struct SegmentRenderer<'a> {
    engine: &'a dyn AudioEngine,
    cache: &'a SourceCache,
    settings: &'a RenderSettings,
}

impl<'a> SegmentRenderer<'a> {
    pub fn new(
        engine: &'a dyn AudioEngine,
        cache: &'a SourceCache,
        settings: &'a RenderSettings,
    ) -> Self {
        Self {
            engine,
            cache,
            settings,
        }
    }

    pub fn settings(&self) -> &RenderSettings {
        self.settings
    }

    /// Render one clip's recipe. `source_path` is the resolved resource
    /// path; silence recipes ignore it (and never trigger extraction).
    ///
    /// Chained speed steps accumulate rounding error, so any candidate
    /// whose measured duration deviates beyond the correction tolerance
    /// is re-requested with an exact pad-or-trim. Deviation that
    /// survives correction is a planner bug and aborts the run.
    pub fn render(
        &self,
        clip_index: usize,
        recipe: &ClipRecipe,
        source_path: Option<&Path>,
    ) -> RetrackResult<RenderedSegment> {
        match recipe {
            ClipRecipe::Silence { duration_secs } => {
                let handle = self.engine.silence(*duration_secs)?;
                Ok(RenderedSegment {
                    handle,
                    duration_secs: *duration_secs,
                    corrected: false,
                })
            }
            ClipRecipe::Source {
                resource_id,
                target_secs,
                spec,
            } => {
                let source_path = source_path.ok_or_else(|| {
                    RetrackError::resource_missing(resource_id.clone(), "no resolved source path")
                })?;

                let source = self
                    .cache
                    .get_or_extract(resource_id, source_path, self.engine)?;
                let mut candidate = self.engine.render(&source, spec)?;
                let mut corrected = false;

                let mut actual = self.engine.measure_duration(&candidate)?;
                if (actual - target_secs).abs() > self.settings.drift_correct_secs {
                    tracing::debug!(
                        clip_index,
                        target_secs,
                        actual_secs = actual,
                        "Correcting segment drift"
                    );
                    candidate = self.engine.pad_or_trim(&candidate, *target_secs)?;
                    actual = self.engine.measure_duration(&candidate)?;
                    corrected = true;
                }

                if (actual - target_secs).abs() > self.settings.drift_fail_secs {
                    return Err(RetrackError::DriftUnrecoverable {
                        clip_index,
                        expected_secs: *target_secs,
                        actual_secs: actual,
                    });
                }

                Ok(RenderedSegment {
                    handle: candidate,
                    duration_secs: *target_secs,
                    corrected,
                })
            }
        }
    }
}
