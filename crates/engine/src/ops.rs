//! Engine contract: handles, render specifications, and the
//! [`AudioEngine`] trait.

use std::path::{Path, PathBuf};

use retrack_common::RetrackResult;
use serde::{Deserialize, Serialize};

/// Opaque reference to a piece of rendered audio held by the engine.
///
/// For the ffmpeg backend this is a WAV file in the engine's work
/// directory; other backends may use different storage.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AudioHandle {
    path: PathBuf,
}

impl AudioHandle {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// The slice of source audio a render starts from, pre-speed-adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrimWindow {
    pub start_secs: f64,
    pub duration_secs: f64,
}

/// Fade-out placement in post-speed-adjustment time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FadeSpec {
    /// Offset of the fade-out start relative to the rendered segment.
    pub start_secs: f64,
    pub duration_secs: f64,
}

/// A complete, declarative render request: trim window, chained speed
/// steps, and click-suppression fades. Produced by the planner,
/// evaluated once by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderSpec {
    pub trim: TrimWindow,

    /// Ordered pitch-preserving speed steps. Each step is within the
    /// primitive's domain of `[0.5, 2.0]`; their product is the clip's
    /// speed factor. Empty for unity speed.
    pub speed_chain: Vec<f64>,

    /// Fade-in length at the start of the segment.
    pub fade_in_secs: f64,

    /// Fade-out window at the end of the segment.
    pub fade_out: FadeSpec,
}

/// Output container for the final export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Wav,
    M4a,
    Flac,
}

impl ExportFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "wav" => Some(Self::Wav),
            "m4a" => Some(Self::M4a),
            "flac" => Some(Self::Flac),
            _ => None,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Wav => "wav",
            Self::M4a => "m4a",
            Self::Flac => "flac",
        }
    }
}

/// Primitive operations the reconstruction core requires from the
/// external audio processor.
///
/// Implementations must be safe to call concurrently; every operation
/// is atomic from the caller's point of view.
pub trait AudioEngine: Send + Sync {
    /// Decode a source media file's audio into an engine handle at the
    /// canonical sample rate and channel layout.
    fn extract_audio(&self, source: &Path) -> RetrackResult<AudioHandle>;

    /// Measure a handle's actual duration in seconds.
    fn measure_duration(&self, handle: &AudioHandle) -> RetrackResult<f64>;

    /// Apply trim + speed chain + fades in one filtered pass.
    fn render(&self, source: &AudioHandle, spec: &RenderSpec) -> RetrackResult<AudioHandle>;

    /// Pad or trim a handle to an exact duration.
    fn pad_or_trim(&self, handle: &AudioHandle, exact_secs: f64) -> RetrackResult<AudioHandle>;

    /// Synthesize silence of the given duration.
    fn silence(&self, duration_secs: f64) -> RetrackResult<AudioHandle>;

    /// Concatenate segments sample-exactly, in order.
    fn concat(&self, handles: &[AudioHandle]) -> RetrackResult<AudioHandle>;

    /// Additively mix `overlay` onto `base`, delayed by `delay_secs`,
    /// without normalizing. The result keeps `base`'s duration.
    fn mix_additive(
        &self,
        base: &AudioHandle,
        overlay: &AudioHandle,
        delay_secs: f64,
    ) -> RetrackResult<AudioHandle>;

    /// Encode a handle into the target container at `output`.
    fn export(
        &self,
        handle: &AudioHandle,
        output: &Path,
        format: ExportFormat,
    ) -> RetrackResult<()>;

    /// Check if this engine is usable on the current system.
    fn is_available(&self) -> bool;

    /// Engine name for logs.
    fn name(&self) -> &str;
}
