//! Clip transform planning: the pure half of segment rendering.
//!
//! Given a clip, compute the exact recipe the renderer must execute —
//! trim window, chained speed steps, fade placement — without touching
//! the engine. Planning is deterministic and fully unit-testable.

use retrack_common::RenderSettings;
use retrack_edl::{Clip, SPEED_UNITY_EPSILON};
use retrack_engine::{FadeSpec, RenderSpec, TrimWindow};

/// Lower bound of the pitch-preserving speed primitive's domain.
pub const SPEED_STEP_MIN: f64 = 0.5;

/// Upper bound of the pitch-preserving speed primitive's domain.
pub const SPEED_STEP_MAX: f64 = 2.0;

/// What the renderer must produce for one clip.
#[derive(Debug, Clone, PartialEq)]
pub enum ClipRecipe {
    /// Synthesized silence; no source extraction.
    Silence { duration_secs: f64 },

    /// Extract the resource once, then trim + speed chain + fades in a
    /// single filtered pass.
    Source {
        resource_id: String,
        /// The clip's timeline duration, which the rendered segment
        /// must match within the drift tolerance.
        target_secs: f64,
        spec: RenderSpec,
    },
}

impl ClipRecipe {
    /// The duration the rendered segment is expected to have.
    pub fn target_secs(&self) -> f64 {
        match self {
            Self::Silence { duration_secs } => *duration_secs,
            Self::Source { target_secs, .. } => *target_secs,
        }
    }

    pub fn is_silence(&self) -> bool {
        matches!(self, Self::Silence { .. })
    }
}

/// Compute the processing recipe for one clip.
///
/// Mute clips need no source audio at all. Everything else gets a
/// fade-in and fade-out sized by [`RenderSettings::fade_for`], with the
/// fade-out placed in post-speed-adjustment time.
pub fn plan_clip(clip: &Clip, settings: &RenderSettings) -> ClipRecipe {
    if clip.mute {
        return ClipRecipe::Silence {
            duration_secs: clip.timeline_secs,
        };
    }

    let speed = clip.speed_factor();
    let fade_secs = settings.fade_for(clip.timeline_secs);

    // The fade-out start is relative to the rendered (post-speed)
    // duration, not the raw source window.
    let post_speed_secs = if speed > 0.0 {
        clip.source_secs / speed
    } else {
        clip.source_secs
    };
    let fade_out_start = (post_speed_secs - fade_secs).max(0.0);

    ClipRecipe::Source {
        resource_id: clip.resource_id.clone(),
        target_secs: clip.timeline_secs,
        spec: RenderSpec {
            trim: TrimWindow {
                start_secs: clip.source_start_secs,
                duration_secs: clip.source_secs,
            },
            speed_chain: decompose_speed(speed),
            fade_in_secs: fade_secs,
            fade_out: FadeSpec {
                start_secs: fade_out_start,
                duration_secs: fade_secs,
            },
        },
    }
}

/// Decompose a speed factor into a chain of steps, each within
/// `[SPEED_STEP_MIN, SPEED_STEP_MAX]`, whose product equals the factor.
///
/// Boundary steps (2.0 or 0.5) come first, so the trailing remainder is
/// the only non-power-of-two step and numeric error stays bounded to
/// one step. Unity speed yields an empty chain.
pub fn decompose_speed(speed: f64) -> Vec<f64> {
    if (speed - 1.0).abs() <= SPEED_UNITY_EPSILON {
        return vec![];
    }

    let mut steps = vec![];
    let mut remaining = speed;
    while remaining > SPEED_STEP_MAX {
        steps.push(SPEED_STEP_MAX);
        remaining /= SPEED_STEP_MAX;
    }
    while remaining < SPEED_STEP_MIN {
        steps.push(SPEED_STEP_MIN);
        remaining /= SPEED_STEP_MIN;
    }
    if (remaining - 1.0).abs() > SPEED_UNITY_EPSILON {
        steps.push(remaining);
    }

    steps
}
