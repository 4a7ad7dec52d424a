//! End-to-end reconstruction: plan, render (parallel), assemble, mix.

use std::path::PathBuf;
use std::sync::Arc;

use retrack_common::{RenderSettings, RetrackError, RetrackResult};
use retrack_edl::{Clip, LoadedEdl, Track};
use retrack_engine::{AudioEngine, AudioHandle};

use crate::assembler::{assemble, PlacedSegment};
use crate::cache::SourceCache;
use crate::mixer::{mix_overlays, Overlay};
use crate::planner::plan_clip;
use crate::renderer::{RenderedSegment, SegmentRenderer};
use crate::report::{ClipOutcome, ClipReport, RebuildReport};

/// The terminal artifact of a run: the composite stream plus the
/// per-clip diagnostics the write-back side needs.
#[derive(Debug, Clone)]
pub struct RebuildOutput {
    pub timeline: AudioHandle,
    pub report: RebuildReport,
}

/// Rebuild the audio timeline described by a loaded EDL.
///
/// Primary-track clips render concurrently on the blocking pool (each
/// engine call is a subprocess); the extraction cache single-flights
/// shared resources. Assembly and mixing run sequentially afterwards.
///
/// Per-clip resource and engine failures are absorbed as silence
/// substitutions so one bad source file cannot abort the run;
/// unrecoverable drift is surfaced as a hard error.
pub async fn rebuild_timeline(
    engine: Arc<dyn AudioEngine>,
    loaded: &LoadedEdl,
    settings: &RenderSettings,
) -> RetrackResult<RebuildOutput> {
    let edl = &loaded.edl;
    let primary = edl
        .primary_track()
        .ok_or_else(|| RetrackError::edl("EDL has no primary track"))?;
    if primary.clips.is_empty() {
        return Err(RetrackError::edl("primary track has no clips"));
    }

    let total_secs = edl.total_secs();
    if total_secs <= 0.0 {
        return Err(RetrackError::edl("timeline resolved to zero duration"));
    }

    tracing::info!(
        engine = engine.name(),
        clips = primary.clips.len(),
        muted = edl.muted_clip_count(),
        speed_adjusted = edl.speed_adjusted_clip_count(),
        total_secs,
        "Starting audio timeline reconstruction"
    );

    let cache = Arc::new(SourceCache::new());

    // Stage 1: primary clips, embarrassingly parallel.
    let mut tasks = Vec::with_capacity(primary.clips.len());
    for (index, clip) in primary.clips.iter().enumerate() {
        tasks.push(spawn_clip_render(
            Arc::clone(&engine),
            Arc::clone(&cache),
            settings.clone(),
            loaded,
            primary,
            clip,
            index,
        ));
    }

    let mut segments = Vec::with_capacity(tasks.len());
    let mut clip_reports = Vec::with_capacity(tasks.len());
    for (clip, task) in primary.clips.iter().zip(tasks) {
        let (segment, report) = task
            .await
            .map_err(|e| RetrackError::engine(format!("render task panicked: {e}")))??;
        segments.push(PlacedSegment {
            start_secs: clip.timeline_start_secs,
            duration_secs: segment.duration_secs,
            handle: segment.handle,
        });
        clip_reports.push(report);
    }

    // Stage 2: sequential assembly of the primary stream.
    let assembled = assemble(engine.as_ref(), &segments, settings)?;
    let mut timeline = assembled.handle;

    // The primary track's declared total is authoritative; top up the
    // stream when the last clip ends short of it.
    if (total_secs - assembled.duration_secs).abs() > settings.gap_epsilon_secs {
        tracing::debug!(
            assembled_secs = assembled.duration_secs,
            total_secs,
            "Padding assembled stream to declared total duration"
        );
        timeline = engine.pad_or_trim(&timeline, total_secs)?;
    }

    // Stage 3: secondary overlays, rendered sequentially (clip counts
    // are small) and folded onto the composite one at a time.
    let renderer = SegmentRenderer::new(engine.as_ref(), &cache, settings);
    let mut overlays = Vec::new();
    for track in edl.secondary_tracks() {
        for (index, clip) in track.clips.iter().enumerate() {
            match render_secondary_clip(&renderer, loaded, track, clip, index) {
                Ok(segment) => overlays.push(Overlay {
                    label: clip_label(track, clip, index),
                    delay_secs: clip.timeline_start_secs,
                    handle: segment.handle,
                }),
                Err(e) if e.is_clip_recoverable() => {
                    tracing::warn!(
                        track = %track.title,
                        clip = index,
                        error = %e,
                        "Skipping secondary clip"
                    );
                    clip_reports.push(ClipReport {
                        track: track.title.clone(),
                        clip_index: index,
                        title: clip.title.clone(),
                        resource_id: clip.resource_id.clone(),
                        target_secs: clip.timeline_secs,
                        outcome: ClipOutcome::Skipped {
                            reason: e.to_string(),
                        },
                    });
                }
                Err(e) => return Err(e),
            }
        }
    }

    let (timeline, mix_stats) = mix_overlays(engine.as_ref(), timeline, &overlays);

    // Stage 4: verification.
    let measured_secs = match engine.measure_duration(&timeline) {
        Ok(secs) => secs,
        Err(e) => {
            tracing::warn!(error = %e, "Could not measure final stream, assuming declared total");
            total_secs
        }
    };

    let substitutions = clip_reports
        .iter()
        .filter(|r| matches!(r.outcome, ClipOutcome::SilenceSubstituted { .. }))
        .count();
    let muted_clips = clip_reports
        .iter()
        .filter(|r| r.outcome == ClipOutcome::Muted)
        .count();
    let skipped = mix_stats.skipped
        + clip_reports
            .iter()
            .filter(|r| matches!(r.outcome, ClipOutcome::Skipped { .. }))
            .count();

    let report = RebuildReport {
        generated_at: chrono::Utc::now(),
        clips_processed: primary.clips.len(),
        muted_clips,
        speed_adjusted_clips: edl.speed_adjusted_clip_count(),
        substitutions,
        secondary_clips_mixed: mix_stats.mixed,
        secondary_clips_skipped: skipped,
        gaps_filled: assembled.gap_count,
        expected_secs: total_secs,
        measured_secs,
        clips: clip_reports,
    };

    tracing::info!(
        measured_secs,
        expected_secs = total_secs,
        delta_ms = report.delta_ms(),
        substitutions,
        gaps = report.gaps_filled,
        secondary_mixed = report.secondary_clips_mixed,
        verdict = report.verdict(settings.drift_fail_secs),
        "Reconstruction finished"
    );

    Ok(RebuildOutput { timeline, report })
}

/// Resolve a clip's source file, distinguishing "unknown id" from
/// "file not on disk" in the error detail.
fn resolve_clip_source(loaded: &LoadedEdl, clip: &Clip) -> RetrackResult<PathBuf> {
    let path = loaded
        .resources
        .resolve_path(&clip.resource_id, &loaded.base_dir)
        .ok_or_else(|| {
            RetrackError::resource_missing(&clip.resource_id, "not in resource table")
        })?;
    if !path.exists() {
        return Err(RetrackError::resource_missing(
            &clip.resource_id,
            format!("source file missing: {}", path.display()),
        ));
    }
    Ok(path)
}

fn clip_label(track: &Track, clip: &Clip, index: usize) -> String {
    if clip.title.is_empty() {
        format!("{}#{index}", track.title)
    } else {
        format!("{}#{index} ({})", track.title, clip.title)
    }
}

type ClipRenderResult = RetrackResult<(RenderedSegment, ClipReport)>;

/// Render one primary clip on the blocking pool, absorbing recoverable
/// failures as silence substitutions.
fn spawn_clip_render(
    engine: Arc<dyn AudioEngine>,
    cache: Arc<SourceCache>,
    settings: RenderSettings,
    loaded: &LoadedEdl,
    track: &Track,
    clip: &Clip,
    index: usize,
) -> tokio::task::JoinHandle<ClipRenderResult> {
    // Track-level mute silences every clip on the track.
    let mut clip = clip.clone();
    clip.mute = clip.mute || track.mute;

    let source = if clip.mute {
        Ok(None)
    } else {
        resolve_clip_source(loaded, &clip).map(Some)
    };
    let track_title = track.title.clone();

    tokio::task::spawn_blocking(move || {
        let renderer = SegmentRenderer::new(engine.as_ref(), &cache, &settings);
        let recipe = plan_clip(&clip, &settings);

        let rendered = match source {
            Ok(source) => renderer.render(index, &recipe, source.as_deref()),
            Err(e) => Err(e),
        };

        let (segment, outcome) = match rendered {
            Ok(segment) => {
                let outcome = if clip.mute {
                    ClipOutcome::Muted
                } else {
                    ClipOutcome::Rendered {
                        corrected: segment.corrected,
                    }
                };
                (segment, outcome)
            }
            Err(e) if e.is_clip_recoverable() => {
                tracing::warn!(
                    track = %track_title,
                    clip = index,
                    error = %e,
                    "Substituting silence for failed clip"
                );
                let handle = engine.silence(clip.timeline_secs)?;
                (
                    RenderedSegment {
                        handle,
                        duration_secs: clip.timeline_secs,
                        corrected: false,
                    },
                    ClipOutcome::SilenceSubstituted {
                        reason: e.to_string(),
                    },
                )
            }
            Err(e) => return Err(e),
        };

        Ok((
            segment,
            ClipReport {
                track: track_title,
                clip_index: index,
                title: clip.title.clone(),
                resource_id: clip.resource_id.clone(),
                target_secs: clip.timeline_secs,
                outcome,
            },
        ))
    })
}

/// Render one secondary clip through the shared cache and renderer.
fn render_secondary_clip(
    renderer: &SegmentRenderer<'_>,
    loaded: &LoadedEdl,
    track: &Track,
    clip: &Clip,
    index: usize,
) -> RetrackResult<RenderedSegment> {
    let mut clip = clip.clone();
    clip.mute = clip.mute || track.mute;

    let source = if clip.mute {
        None
    } else {
        Some(resolve_clip_source(loaded, &clip)?)
    };

    let recipe = plan_clip(&clip, renderer.settings());
    renderer.render(index, &recipe, source.as_deref())
}
