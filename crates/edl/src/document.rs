//! The serialized EDL document and its loader.
//!
//! The EDL file is the contract with whatever authored the edit: a JSON
//! document listing resources and tracks. Loading normalizes clip order
//! and enforces the structural invariants the reconstruction core
//! depends on.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::clip::Clip;
use crate::resource::{Resource, ResourceTable};
use crate::track::{Track, TrackRole};

/// Top-level EDL file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edl {
    /// Schema version.
    pub version: String,

    /// Human-readable project name.
    #[serde(default)]
    pub name: String,

    /// Declared total duration of the primary timeline in seconds.
    /// When absent, the end of the last primary clip is authoritative.
    #[serde(default)]
    pub total_secs: Option<f64>,

    /// Source media referenced by clips.
    pub resources: Vec<Resource>,

    /// Tracks in authored order. Exactly one must be primary.
    pub tracks: Vec<Track>,
}

impl Edl {
    /// The primary track. Valid EDLs have exactly one; [`Edl::validate`]
    /// enforces this before the core runs.
    pub fn primary_track(&self) -> Option<&Track> {
        self.tracks.iter().find(|t| t.role == TrackRole::Primary)
    }

    /// Non-muted secondary tracks, in authored order.
    pub fn secondary_tracks(&self) -> impl Iterator<Item = &Track> {
        self.tracks
            .iter()
            .filter(|t| t.role == TrackRole::Secondary && !t.mute)
    }

    /// Authoritative total duration of the timeline: the declared value
    /// when present, otherwise the end of the last primary clip.
    pub fn total_secs(&self) -> f64 {
        match self.total_secs {
            Some(total) if total > 0.0 => total,
            _ => self.primary_track().map(|t| t.end_secs()).unwrap_or(0.0),
        }
    }

    /// Check structural invariants.
    pub fn validate(&self) -> Result<(), EdlError> {
        let primary_count = self
            .tracks
            .iter()
            .filter(|t| t.role == TrackRole::Primary)
            .count();
        if primary_count != 1 {
            return Err(EdlError::ValidationError {
                message: format!("expected exactly one primary track, found {primary_count}"),
            });
        }

        for track in &self.tracks {
            for (i, clip) in track.clips.iter().enumerate() {
                if clip.timeline_secs <= 0.0 {
                    return Err(EdlError::ValidationError {
                        message: format!(
                            "clip {i} on track '{}' has non-positive timeline duration",
                            track.title
                        ),
                    });
                }
                if !clip.mute && clip.source_secs <= 0.0 {
                    return Err(EdlError::ValidationError {
                        message: format!(
                            "non-mute clip {i} on track '{}' has non-positive source window",
                            track.title
                        ),
                    });
                }
            }
        }

        Ok(())
    }

    /// Sort every track's clips ascending by timeline start.
    pub fn normalize(&mut self) {
        for track in &mut self.tracks {
            track.sort_clips();
        }
    }

    /// Count of mute clips on the primary track.
    pub fn muted_clip_count(&self) -> usize {
        self.primary_track()
            .map(|t| t.clips.iter().filter(|c| c.mute).count())
            .unwrap_or(0)
    }

    /// Count of speed-adjusted clips on the primary track.
    pub fn speed_adjusted_clip_count(&self) -> usize {
        self.primary_track()
            .map(|t| t.clips.iter().filter(|c| c.is_speed_adjusted()).count())
            .unwrap_or(0)
    }
}

/// An EDL loaded from disk, with its resource table built and clips
/// normalized.
#[derive(Debug, Clone)]
pub struct LoadedEdl {
    /// Path the document was loaded from.
    pub path: PathBuf,

    /// Directory used to resolve relative resource paths.
    pub base_dir: PathBuf,

    /// The validated document.
    pub edl: Edl,

    /// Resource lookup table.
    pub resources: ResourceTable,
}

impl LoadedEdl {
    /// Load, validate, and normalize an EDL file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, EdlError> {
        let path = path.as_ref().to_path_buf();

        let content = std::fs::read_to_string(&path).map_err(|e| EdlError::IoError {
            path: path.clone(),
            source: e,
        })?;

        let mut edl: Edl = serde_json::from_str(&content).map_err(|e| EdlError::ParseError {
            path: path.clone(),
            source: e,
        })?;

        edl.validate()?;
        edl.normalize();

        let base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let resources = ResourceTable::new(edl.resources.iter().cloned());

        Ok(Self {
            path,
            base_dir,
            edl,
            resources,
        })
    }

    /// Save the document back to its original path.
    pub fn save(&self) -> Result<(), EdlError> {
        let json = serde_json::to_string_pretty(&self.edl).map_err(|e| EdlError::ParseError {
            path: self.path.clone(),
            source: e,
        })?;
        std::fs::write(&self.path, json).map_err(|e| EdlError::IoError {
            path: self.path.clone(),
            source: e,
        })
    }
}

/// Errors that can occur when working with EDL documents.
#[derive(Debug, thiserror::Error)]
pub enum EdlError {
    #[error("I/O error at {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Parse error in {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Invalid EDL: {message}")]
    ValidationError { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clip(start: f64, timeline: f64, source: f64, mute: bool) -> Clip {
        Clip {
            title: String::new(),
            resource_id: "res-a".to_string(),
            timeline_start_secs: start,
            timeline_secs: timeline,
            source_start_secs: 0.0,
            source_secs: source,
            mute,
        }
    }

    fn sample_edl() -> Edl {
        Edl {
            version: "1.0".to_string(),
            name: "sample".to_string(),
            total_secs: None,
            resources: vec![Resource {
                id: "res-a".to_string(),
                path: PathBuf::from("take1.mp4"),
                duration_secs: 60.0,
            }],
            tracks: vec![Track {
                title: "video".to_string(),
                role: TrackRole::Primary,
                mute: false,
                clips: vec![clip(0.0, 2.0, 2.0, false), clip(3.0, 2.0, 4.0, false)],
            }],
        }
    }

    #[test]
    fn test_total_secs_derived_from_last_primary_clip() {
        let edl = sample_edl();
        assert!((edl.total_secs() - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_declared_total_wins_over_derivation() {
        let mut edl = sample_edl();
        edl.total_secs = Some(7.5);
        assert!((edl.total_secs() - 7.5).abs() < 1e-12);
    }

    #[test]
    fn test_validate_rejects_zero_primary_tracks() {
        let mut edl = sample_edl();
        edl.tracks[0].role = TrackRole::Secondary;
        assert!(edl.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_two_primary_tracks() {
        let mut edl = sample_edl();
        let extra = edl.tracks[0].clone();
        edl.tracks.push(extra);
        assert!(edl.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_source_window_on_live_clip() {
        let mut edl = sample_edl();
        edl.tracks[0].clips[0].source_secs = 0.0;
        assert!(edl.validate().is_err());
    }

    #[test]
    fn test_validate_allows_zero_source_window_on_mute_clip() {
        let mut edl = sample_edl();
        edl.tracks[0].clips[0].source_secs = 0.0;
        edl.tracks[0].clips[0].mute = true;
        assert!(edl.validate().is_ok());
    }

    #[test]
    fn test_speed_adjusted_count() {
        let edl = sample_edl();
        // Second clip compresses 4s of source into 2s.
        assert_eq!(edl.speed_adjusted_clip_count(), 1);
        assert_eq!(edl.muted_clip_count(), 0);
    }

    #[test]
    fn test_document_roundtrip() {
        let edl = sample_edl();
        let json = serde_json::to_string_pretty(&edl).unwrap();
        let parsed: Edl = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.tracks.len(), 1);
        assert_eq!(parsed.resources[0].id, "res-a");
    }
}
