//! Timeline assembly: segments plus gap silence, concatenated in order.

use retrack_common::{RenderSettings, RetrackResult};
use retrack_engine::{AudioEngine, AudioHandle};

/// A rendered segment placed at an absolute timeline position.
#[derive(Debug, Clone)]
pub struct PlacedSegment {
    pub start_secs: f64,
    pub duration_secs: f64,
    pub handle: AudioHandle,
}

/// One element of the concatenation order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Piece {
    /// Synthesized silence of the given length.
    Gap { duration_secs: f64 },
    /// Index into the placed-segment slice.
    Segment { index: usize },
}

/// The assembled primary stream.
#[derive(Debug, Clone)]
pub struct AssembledTimeline {
    pub handle: AudioHandle,
    /// End position of the last clip: the sum of all segment and gap
    /// durations by construction.
    pub duration_secs: f64,
    pub gap_count: usize,
}

/// Walk placed segments in timeline order and decide where gap silence
/// goes. Pure; the engine is only involved in [`assemble`].
///
/// Gaps smaller than `gap_epsilon_secs` are ignored, so a zero-length
/// gap never alters the output.
pub fn layout_pieces(segments: &[PlacedSegment], gap_epsilon_secs: f64) -> Vec<Piece> {
    let mut pieces = Vec::with_capacity(segments.len());
    let mut current_secs = 0.0;

    for (index, segment) in segments.iter().enumerate() {
        let gap = segment.start_secs - current_secs;
        if gap > gap_epsilon_secs {
            pieces.push(Piece::Gap { duration_secs: gap });
        }
        pieces.push(Piece::Segment { index });
        current_secs = segment.start_secs + segment.duration_secs;
    }

    pieces
}

/// Concatenate segments and gap silence into one continuous stream.
///
/// No trailing fill is added after the last clip; enforcing the
/// authoritative total duration is the caller's job.
pub fn assemble(
    engine: &dyn AudioEngine,
    segments: &[PlacedSegment],
    settings: &RenderSettings,
) -> RetrackResult<AssembledTimeline> {
    let pieces = layout_pieces(segments, settings.gap_epsilon_secs);

    let mut handles = Vec::with_capacity(pieces.len());
    let mut gap_count = 0;
    for piece in &pieces {
        match piece {
            Piece::Gap { duration_secs } => {
                tracing::debug!(gap_secs = duration_secs, "Filling timeline gap with silence");
                handles.push(engine.silence(*duration_secs)?);
                gap_count += 1;
            }
            Piece::Segment { index } => handles.push(segments[*index].handle.clone()),
        }
    }

    let handle = engine.concat(&handles)?;
    let duration_secs = segments
        .last()
        .map(|s| s.start_secs + s.duration_secs)
        .unwrap_or(0.0);

    Ok(AssembledTimeline {
        handle,
        duration_secs,
        gap_count,
    })
}
