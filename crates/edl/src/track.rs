//! Tracks: ordered clip sequences with a primary/secondary role.

use serde::{Deserialize, Serialize};

use crate::clip::Clip;

/// Role a track plays during reconstruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackRole {
    /// Drives the authoritative total duration; gaps between its clips
    /// are filled with silence.
    Primary,
    /// Independent overlay mixed on top of the assembled primary stream
    /// at absolute offsets.
    Secondary,
}

/// An ordered sequence of non-overlapping clips.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Track {
    /// Human-readable label.
    #[serde(default)]
    pub title: String,

    /// Primary or secondary role.
    pub role: TrackRole,

    /// Track-level mute. A muted track contributes nothing.
    #[serde(default)]
    pub mute: bool,

    /// Clips, sorted ascending by timeline start before processing.
    pub clips: Vec<Clip>,
}

impl Track {
    /// Sort clips ascending by timeline start. Processing assumes this
    /// ordering; it is applied once when the EDL is loaded.
    pub fn sort_clips(&mut self) {
        self.clips
            .sort_by(|a, b| a.timeline_start_secs.total_cmp(&b.timeline_start_secs));
    }

    /// Timeline position where the last clip ends, or zero for an empty
    /// track. Assumes clips are sorted.
    pub fn end_secs(&self) -> f64 {
        self.clips
            .last()
            .map(|c| c.timeline_end_secs())
            .unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clip_at(start: f64) -> Clip {
        Clip {
            title: String::new(),
            resource_id: "res".to_string(),
            timeline_start_secs: start,
            timeline_secs: 1.0,
            source_start_secs: 0.0,
            source_secs: 1.0,
            mute: false,
        }
    }

    #[test]
    fn test_sort_clips_orders_by_timeline_start() {
        let mut track = Track {
            title: String::new(),
            role: TrackRole::Primary,
            mute: false,
            clips: vec![clip_at(5.0), clip_at(0.0), clip_at(2.5)],
        };
        track.sort_clips();
        let starts: Vec<f64> = track.clips.iter().map(|c| c.timeline_start_secs).collect();
        assert_eq!(starts, vec![0.0, 2.5, 5.0]);
    }

    #[test]
    fn test_end_secs_after_sort() {
        let mut track = Track {
            title: String::new(),
            role: TrackRole::Primary,
            mute: false,
            clips: vec![clip_at(3.0), clip_at(0.0)],
        };
        track.sort_clips();
        assert!((track.end_secs() - 4.0).abs() < 1e-12);
    }
}
