//! End-to-end reconstruction scenarios against an in-memory engine.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use retrack_common::{RenderSettings, RetrackError, RetrackResult};
use retrack_edl::{Clip, Edl, LoadedEdl, Resource, ResourceTable, Track, TrackRole};
use retrack_engine::{AudioEngine, AudioHandle, ExportFormat, RenderSpec};
use retrack_rebuild::pipeline::rebuild_timeline;
use retrack_rebuild::report::ClipOutcome;

/// In-memory engine: handles are synthetic ids, durations are tracked
/// exactly, and every primitive call is counted.
#[derive(Default)]
struct MockEngine {
    next_id: AtomicU64,
    durations: Mutex<HashMap<PathBuf, f64>>,
    extract_calls: Mutex<Vec<PathBuf>>,
    mix_delays: Mutex<Vec<f64>>,
    /// Extra seconds added to every rendered candidate, simulating
    /// atempo rounding error.
    render_drift_secs: f64,
    /// When false, `pad_or_trim` leaves the duration unchanged, so
    /// drift survives correction.
    pad_exact: bool,
}

impl MockEngine {
    fn new() -> Self {
        Self {
            pad_exact: true,
            ..Self::default()
        }
    }

    fn with_drift(drift_secs: f64, pad_exact: bool) -> Self {
        Self {
            render_drift_secs: drift_secs,
            pad_exact,
            ..Self::new()
        }
    }

    fn make_handle(&self, duration_secs: f64) -> AudioHandle {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        let path = PathBuf::from(format!("/mock/{n}.wav"));
        self.durations
            .lock()
            .unwrap()
            .insert(path.clone(), duration_secs);
        AudioHandle::new(path)
    }

    fn duration_of(&self, handle: &AudioHandle) -> f64 {
        *self
            .durations
            .lock()
            .unwrap()
            .get(handle.path())
            .expect("unknown mock handle")
    }

    fn extract_count(&self) -> usize {
        self.extract_calls.lock().unwrap().len()
    }
}

impl AudioEngine for MockEngine {
    fn extract_audio(&self, source: &Path) -> RetrackResult<AudioHandle> {
        self.extract_calls.lock().unwrap().push(source.to_path_buf());
        // Sources are plenty long for any trim window in these tests.
        Ok(self.make_handle(600.0))
    }

    fn measure_duration(&self, handle: &AudioHandle) -> RetrackResult<f64> {
        Ok(self.duration_of(handle))
    }

    fn render(&self, _source: &AudioHandle, spec: &RenderSpec) -> RetrackResult<AudioHandle> {
        // Empty chain means unity speed; product of an empty iterator is 1.
        let speed: f64 = spec.speed_chain.iter().product();
        let rendered = spec.trim.duration_secs / speed + self.render_drift_secs;
        Ok(self.make_handle(rendered))
    }

    fn pad_or_trim(&self, handle: &AudioHandle, exact_secs: f64) -> RetrackResult<AudioHandle> {
        if self.pad_exact {
            Ok(self.make_handle(exact_secs))
        } else {
            Ok(self.make_handle(self.duration_of(handle)))
        }
    }

    fn silence(&self, duration_secs: f64) -> RetrackResult<AudioHandle> {
        Ok(self.make_handle(duration_secs))
    }

    fn concat(&self, handles: &[AudioHandle]) -> RetrackResult<AudioHandle> {
        let total = handles.iter().map(|h| self.duration_of(h)).sum();
        Ok(self.make_handle(total))
    }

    fn mix_additive(
        &self,
        base: &AudioHandle,
        _overlay: &AudioHandle,
        delay_secs: f64,
    ) -> RetrackResult<AudioHandle> {
        self.mix_delays.lock().unwrap().push(delay_secs);
        // duration=first semantics: the composite keeps the base length.
        Ok(self.make_handle(self.duration_of(base)))
    }

    fn export(&self, _: &AudioHandle, _: &Path, _: ExportFormat) -> RetrackResult<()> {
        Ok(())
    }

    fn is_available(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "mock"
    }
}

fn clip(
    resource_id: &str,
    start: f64,
    timeline: f64,
    source_start: f64,
    source: f64,
    mute: bool,
) -> Clip {
    Clip {
        title: String::new(),
        resource_id: resource_id.to_string(),
        timeline_start_secs: start,
        timeline_secs: timeline,
        source_start_secs: source_start,
        source_secs: source,
        mute,
    }
}

/// Build a LoadedEdl whose resources point at real (empty) files under a
/// scratch directory, so source resolution succeeds.
fn loaded_edl(name: &str, resource_ids: &[&str], tracks: Vec<Track>) -> LoadedEdl {
    let dir = std::env::temp_dir().join(format!("retrack_test_{name}"));
    std::fs::create_dir_all(&dir).unwrap();

    let resources: Vec<Resource> = resource_ids
        .iter()
        .map(|id| {
            let path = dir.join(format!("{id}.mp4"));
            std::fs::write(&path, b"stub").unwrap();
            Resource {
                id: id.to_string(),
                path,
                duration_secs: 600.0,
            }
        })
        .collect();

    let mut edl = Edl {
        version: "1.0".to_string(),
        name: name.to_string(),
        total_secs: None,
        resources: resources.clone(),
        tracks,
    };
    edl.validate().unwrap();
    edl.normalize();

    LoadedEdl {
        path: dir.join("edl.json"),
        base_dir: dir,
        resources: ResourceTable::new(resources),
        edl,
    }
}

fn primary(clips: Vec<Clip>) -> Track {
    Track {
        title: "video".to_string(),
        role: TrackRole::Primary,
        mute: false,
        clips,
    }
}

fn secondary(clips: Vec<Clip>) -> Track {
    Track {
        title: "music".to_string(),
        role: TrackRole::Secondary,
        mute: false,
        clips,
    }
}

#[tokio::test]
async fn scenario_clips_gap_and_speed_assemble_to_declared_duration() {
    // [0,2) at 1x, gap [2,3), [3,5) compressing 4s of source into 2s.
    let loaded = loaded_edl(
        "scenario_a",
        &["res-r"],
        vec![primary(vec![
            clip("res-r", 0.0, 2.0, 0.0, 2.0, false),
            clip("res-r", 3.0, 2.0, 10.0, 4.0, false),
        ])],
    );
    let engine = Arc::new(MockEngine::new());

    let output = rebuild_timeline(engine.clone(), &loaded, &RenderSettings::default())
        .await
        .unwrap();

    assert!((output.report.measured_secs - 5.0).abs() < 1e-9);
    assert_eq!(output.report.gaps_filled, 1);
    assert_eq!(output.report.speed_adjusted_clips, 1);
    // Both clips share one resource: one extraction.
    assert_eq!(engine.extract_count(), 1);
}

#[tokio::test]
async fn scenario_mute_clip_renders_silence_without_extraction() {
    let loaded = loaded_edl(
        "scenario_b",
        &["res-r"],
        vec![primary(vec![clip("res-r", 0.0, 1.5, 0.0, 1.5, true)])],
    );
    let engine = Arc::new(MockEngine::new());

    let output = rebuild_timeline(engine.clone(), &loaded, &RenderSettings::default())
        .await
        .unwrap();

    assert!((output.report.measured_secs - 1.5).abs() < 1e-9);
    assert_eq!(output.report.muted_clips, 1);
    assert_eq!(engine.extract_count(), 0);
    assert_eq!(output.report.clips[0].outcome, ClipOutcome::Muted);
}

#[tokio::test]
async fn scenario_secondary_overlay_keeps_primary_duration() {
    // Primary spans 20s; one secondary clip at offset 10s, 3s long.
    let mut loaded = loaded_edl(
        "scenario_c",
        &["res-p", "res-s"],
        vec![
            primary(vec![clip("res-p", 0.0, 18.0, 0.0, 18.0, false)]),
            secondary(vec![clip("res-s", 10.0, 3.0, 0.0, 3.0, false)]),
        ],
    );
    loaded.edl.total_secs = Some(20.0);
    let engine = Arc::new(MockEngine::new());

    let output = rebuild_timeline(engine.clone(), &loaded, &RenderSettings::default())
        .await
        .unwrap();

    assert!((output.report.measured_secs - 20.0).abs() < 1e-9);
    assert_eq!(output.report.secondary_clips_mixed, 1);
    assert_eq!(engine.mix_delays.lock().unwrap().as_slice(), &[10.0]);
}

#[tokio::test]
async fn shared_resource_extracted_once_across_parallel_renders() {
    let clips: Vec<Clip> = (0..16)
        .map(|i| clip("res-shared", i as f64 * 2.0, 2.0, i as f64 * 3.0, 2.0, false))
        .collect();
    let loaded = loaded_edl("shared_resource", &["res-shared"], vec![primary(clips)]);
    let engine = Arc::new(MockEngine::new());

    rebuild_timeline(engine.clone(), &loaded, &RenderSettings::default())
        .await
        .unwrap();

    assert_eq!(engine.extract_count(), 1);
}

#[tokio::test]
async fn drift_beyond_tolerance_is_corrected() {
    // 10 ms of drift exceeds the 2 ms correction tolerance but stays
    // under the 50 ms ceiling after the exact pad.
    let loaded = loaded_edl(
        "drift_corrected",
        &["res-r"],
        vec![primary(vec![clip("res-r", 0.0, 2.0, 0.0, 4.0, false)])],
    );
    let engine = Arc::new(MockEngine::with_drift(0.010, true));

    let output = rebuild_timeline(engine, &loaded, &RenderSettings::default())
        .await
        .unwrap();

    assert!((output.report.measured_secs - 2.0).abs() < 1e-9);
    assert_eq!(
        output.report.clips[0].outcome,
        ClipOutcome::Rendered { corrected: true }
    );
}

#[tokio::test]
async fn unrecoverable_drift_aborts_the_run() {
    let loaded = loaded_edl(
        "drift_fatal",
        &["res-r"],
        vec![primary(vec![clip("res-r", 0.0, 2.0, 0.0, 4.0, false)])],
    );
    // Drift beyond the hard ceiling that pad_or_trim fails to remove.
    let engine = Arc::new(MockEngine::with_drift(0.2, false));

    let err = rebuild_timeline(engine, &loaded, &RenderSettings::default())
        .await
        .unwrap_err();

    assert!(matches!(err, RetrackError::DriftUnrecoverable { .. }));
}

#[tokio::test]
async fn missing_resource_substitutes_silence_and_continues() {
    // "res-gone" is referenced by a clip but absent from the table.
    let loaded = loaded_edl(
        "missing_resource",
        &["res-good"],
        vec![primary(vec![
            clip("res-good", 0.0, 2.0, 0.0, 2.0, false),
            clip("res-gone", 2.0, 3.0, 0.0, 3.0, false),
        ])],
    );

    let engine = Arc::new(MockEngine::new());
    let output = rebuild_timeline(engine, &loaded, &RenderSettings::default())
        .await
        .unwrap();

    assert!((output.report.measured_secs - 5.0).abs() < 1e-9);
    assert_eq!(output.report.substitutions, 1);
    assert!(matches!(
        output.report.clips[1].outcome,
        ClipOutcome::SilenceSubstituted { .. }
    ));
}

#[tokio::test]
async fn failed_secondary_clip_is_skipped_not_fatal() {
    let loaded = loaded_edl(
        "secondary_skip",
        &["res-p"],
        vec![
            primary(vec![clip("res-p", 0.0, 10.0, 0.0, 10.0, false)]),
            secondary(vec![clip("res-gone", 1.0, 2.0, 0.0, 2.0, false)]),
        ],
    );

    let engine = Arc::new(MockEngine::new());
    let output = rebuild_timeline(engine, &loaded, &RenderSettings::default())
        .await
        .unwrap();

    assert!((output.report.measured_secs - 10.0).abs() < 1e-9);
    assert_eq!(output.report.secondary_clips_mixed, 0);
    assert_eq!(output.report.secondary_clips_skipped, 1);
}

#[tokio::test]
async fn muted_secondary_track_contributes_nothing() {
    let loaded = loaded_edl(
        "secondary_muted",
        &["res-p", "res-s"],
        vec![
            primary(vec![clip("res-p", 0.0, 6.0, 0.0, 6.0, false)]),
            Track {
                mute: true,
                ..secondary(vec![clip("res-s", 1.0, 2.0, 0.0, 2.0, false)])
            },
        ],
    );
    let engine = Arc::new(MockEngine::new());

    let output = rebuild_timeline(engine.clone(), &loaded, &RenderSettings::default())
        .await
        .unwrap();

    assert_eq!(output.report.secondary_clips_mixed, 0);
    assert!(engine.mix_delays.lock().unwrap().is_empty());
}

#[tokio::test]
async fn empty_primary_track_is_a_whole_run_failure() {
    let loaded = loaded_edl("empty_primary", &["res-r"], vec![primary(vec![])]);
    let engine = Arc::new(MockEngine::new());

    let err = rebuild_timeline(engine, &loaded, &RenderSettings::default())
        .await
        .unwrap_err();

    assert!(matches!(err, RetrackError::Edl { .. }));
}
