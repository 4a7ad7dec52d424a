//! Multi-track mixing: secondary overlays onto the assembled primary.
//!
//! Each secondary clip's segment is mixed into the running composite at
//! its absolute timeline offset, one engine call per overlay, so peak
//! memory stays bounded to a single composite. Overlays are additive and
//! never normalized: simultaneous tracks are a deliberate authoring
//! choice, not a mistake to attenuate.

use retrack_engine::{AudioEngine, AudioHandle};

/// One secondary segment awaiting mixing.
#[derive(Debug, Clone)]
pub struct Overlay {
    /// Label for logs (track + clip title).
    pub label: String,
    /// Absolute timeline offset, applied as a delay on the segment.
    pub delay_secs: f64,
    pub handle: AudioHandle,
}

/// Outcome counts for one mixing pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct MixStats {
    pub mixed: usize,
    pub skipped: usize,
}

/// Fold overlays into `base`, skipping failures.
///
/// Secondary audio is supplementary: a failed mix is logged and skipped,
/// never allowed to abort primary reconstruction.
pub fn mix_overlays(
    engine: &dyn AudioEngine,
    base: AudioHandle,
    overlays: &[Overlay],
) -> (AudioHandle, MixStats) {
    let mut composite = base;
    let mut stats = MixStats::default();

    for overlay in overlays {
        match engine.mix_additive(&composite, &overlay.handle, overlay.delay_secs) {
            Ok(next) => {
                composite = next;
                stats.mixed += 1;
            }
            Err(e) => {
                tracing::warn!(
                    label = %overlay.label,
                    delay_secs = overlay.delay_secs,
                    error = %e,
                    "Skipping secondary overlay that failed to mix"
                );
                stats.skipped += 1;
            }
        }
    }

    (composite, stats)
}
