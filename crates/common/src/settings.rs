//! Render settings.
//!
//! Every numeric constant that shapes the rebuilt audio (sample rate,
//! fades, drift tolerances) is threaded explicitly through this struct
//! rather than living as ambient module constants.

use serde::{Deserialize, Serialize};

/// Parameters controlling audio timeline reconstruction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    /// Canonical output sample rate in Hz.
    pub sample_rate: u32,

    /// Canonical output channel count.
    pub channels: u32,

    /// Default micro-fade length at each cut boundary, in seconds.
    /// Shrunk per clip when the clip is too short to hold two fades.
    pub default_fade_secs: f64,

    /// Duration deviation above which a rendered segment is re-requested
    /// with an explicit pad-or-trim to exact length.
    pub drift_correct_secs: f64,

    /// Duration deviation that remains after correction and aborts the
    /// run. Deliberately much larger than `drift_correct_secs`.
    pub drift_fail_secs: f64,

    /// Minimum gap between consecutive clips that gets filled with
    /// synthesized silence. Sub-epsilon gaps are ignored.
    pub gap_epsilon_secs: f64,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            channels: 2,
            default_fade_secs: 0.005,
            drift_correct_secs: 0.002,
            drift_fail_secs: 0.050,
            gap_epsilon_secs: 0.0005,
        }
    }
}

impl RenderSettings {
    /// Effective fade length for a clip of the given timeline duration.
    ///
    /// Fades never overlap: when four default fades do not fit, the fade
    /// shrinks to a quarter of the clip.
    pub fn fade_for(&self, timeline_secs: f64) -> f64 {
        if timeline_secs < self.default_fade_secs * 4.0 {
            timeline_secs / 4.0
        } else {
            self.default_fade_secs
        }
    }
}
