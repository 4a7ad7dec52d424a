//! Per-run diagnostics: what happened to every clip, and how close the
//! rebuilt stream landed to the declared timeline duration.

use serde::{Deserialize, Serialize};

/// How one clip was realized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClipOutcome {
    /// Rendered from its source window.
    Rendered {
        /// Whether drift correction re-requested the segment.
        corrected: bool,
    },
    /// Mute clip realized as silence (no extraction).
    Muted,
    /// Recoverable failure; silence of the target duration substituted.
    SilenceSubstituted { reason: String },
    /// Secondary clip dropped after a recoverable failure; secondary
    /// audio never blocks primary reconstruction.
    Skipped { reason: String },
}

/// One clip's entry in the run report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClipReport {
    pub track: String,
    pub clip_index: usize,
    #[serde(default)]
    pub title: String,
    pub resource_id: String,
    pub target_secs: f64,
    pub outcome: ClipOutcome,
}

/// Summary of a full reconstruction run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RebuildReport {
    /// When the run finished.
    pub generated_at: chrono::DateTime<chrono::Utc>,

    /// Primary-track clips processed.
    pub clips_processed: usize,
    pub muted_clips: usize,
    pub speed_adjusted_clips: usize,
    /// Clips replaced by silence after a recoverable failure.
    pub substitutions: usize,

    pub secondary_clips_mixed: usize,
    pub secondary_clips_skipped: usize,
    pub gaps_filled: usize,

    /// Authoritative primary-track total duration.
    pub expected_secs: f64,
    /// Measured duration of the final composite.
    pub measured_secs: f64,

    pub clips: Vec<ClipReport>,
}

impl RebuildReport {
    /// Absolute deviation between measured and expected duration, in
    /// milliseconds.
    pub fn delta_ms(&self) -> f64 {
        (self.measured_secs - self.expected_secs).abs() * 1000.0
    }

    /// "ok" when the deviation is under `tolerance_secs`, else "warn".
    pub fn verdict(&self, tolerance_secs: f64) -> &'static str {
        if self.delta_ms() < tolerance_secs * 1000.0 {
            "ok"
        } else {
            "warn"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(expected: f64, measured: f64) -> RebuildReport {
        RebuildReport {
            generated_at: chrono::Utc::now(),
            clips_processed: 1,
            muted_clips: 0,
            speed_adjusted_clips: 0,
            substitutions: 0,
            secondary_clips_mixed: 0,
            secondary_clips_skipped: 0,
            gaps_filled: 0,
            expected_secs: expected,
            measured_secs: measured,
            clips: vec![],
        }
    }

    #[test]
    fn test_verdict_ok_within_tolerance() {
        assert_eq!(report(10.0, 10.01).verdict(0.05), "ok");
    }

    #[test]
    fn test_verdict_warn_beyond_tolerance() {
        assert_eq!(report(10.0, 10.2).verdict(0.05), "warn");
    }

    #[test]
    fn test_outcome_serialization_is_tagged() {
        let json = serde_json::to_string(&ClipOutcome::SilenceSubstituted {
            reason: "resource missing".to_string(),
        })
        .unwrap();
        assert!(json.contains("\"kind\":\"silence_substituted\""));
    }
}
