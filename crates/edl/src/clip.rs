//! Clips: placements of source-media windows onto the timeline.

use serde::{Deserialize, Serialize};

/// Speed factors closer to unity than this are treated as 1.0.
pub const SPEED_UNITY_EPSILON: f64 = 0.001;

/// One EDL entry: a time-window of a resource placed onto a track.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Clip {
    /// Human-readable label (for logs and reports).
    #[serde(default)]
    pub title: String,

    /// Identifier of the resource this clip plays.
    pub resource_id: String,

    /// Absolute offset from timeline zero, in seconds.
    pub timeline_start_secs: f64,

    /// Target duration on the timeline, in seconds.
    pub timeline_secs: f64,

    /// Start of the slice of the resource to use, pre-speed-adjustment.
    pub source_start_secs: f64,

    /// Duration of the source slice, pre-speed-adjustment.
    pub source_secs: f64,

    /// Muted clips contribute silence of `timeline_secs`.
    #[serde(default)]
    pub mute: bool,
}

impl Clip {
    /// Ratio of source-window duration to timeline duration.
    ///
    /// Always derived from the two stored windows so the ratio can never
    /// drift from the durations it was computed from. Degenerate windows
    /// fall back to unity.
    pub fn speed_factor(&self) -> f64 {
        if self.source_secs > 0.0 && self.timeline_secs > 0.0 {
            self.source_secs / self.timeline_secs
        } else {
            1.0
        }
    }

    /// Whether this clip plays at a non-unity speed.
    pub fn is_speed_adjusted(&self) -> bool {
        (self.speed_factor() - 1.0).abs() > SPEED_UNITY_EPSILON
    }

    /// Timeline position where this clip ends.
    pub fn timeline_end_secs(&self) -> f64 {
        self.timeline_start_secs + self.timeline_secs
    }
}
