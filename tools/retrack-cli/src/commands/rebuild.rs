//! Rebuild an audio timeline from an EDL.

use std::path::PathBuf;
use std::sync::Arc;

use retrack_edl::LoadedEdl;
use retrack_engine::{AudioEngine, ExportFormat, FfmpegEngine};
use retrack_enhance::{enhance, EnhanceConfig, EnhanceFailure, EnhanceOutcome};
use retrack_rebuild::pipeline::rebuild_timeline;

pub struct RebuildArgs {
    pub edl: PathBuf,
    pub output: Option<PathBuf>,
    pub format: String,
    pub fade_ms: f64,
    pub skip_enhance: bool,
    pub enhance_cmd: Option<String>,
    pub enhance_timeout_secs: u64,
    pub keep_workdir: bool,
}

pub async fn run(args: RebuildArgs) -> anyhow::Result<()> {
    let loaded = LoadedEdl::load(&args.edl)
        .map_err(|e| anyhow::anyhow!("Failed to load EDL: {e}"))?;

    let format = ExportFormat::parse(&args.format)
        .ok_or_else(|| anyhow::anyhow!("Unknown format: {}. Use: wav, m4a, flac", args.format))?;

    let mut settings = retrack_common::RenderSettings::default();
    settings.default_fade_secs = args.fade_ms / 1000.0;

    let output = args.output.clone().unwrap_or_else(|| {
        let stem = args
            .edl
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "timeline".to_string());
        loaded
            .base_dir
            .join(format!("{stem}.rebuilt.{}", format.extension()))
    });

    let work_dir = std::env::temp_dir().join(format!("retrack-work-{}", std::process::id()));
    let engine = FfmpegEngine::new(&work_dir, settings.sample_rate, settings.channels)
        .map_err(|e| anyhow::anyhow!("Failed to set up work directory: {e}"))?;
    if !engine.is_available() {
        anyhow::bail!("ffmpeg/ffprobe not found on PATH; run `retrack check`");
    }
    let engine: Arc<dyn AudioEngine> = Arc::new(engine);

    println!("Rebuilding audio timeline: {}", loaded.edl.name);
    println!("  EDL: {}", args.edl.display());
    println!("  Output: {}", output.display());

    let result = rebuild_timeline(Arc::clone(&engine), &loaded, &settings).await;
    let rebuilt = match result {
        Ok(rebuilt) => rebuilt,
        Err(e) => {
            cleanup_workdir(&work_dir, args.keep_workdir);
            return Err(anyhow::anyhow!("Reconstruction failed: {e}"));
        }
    };

    engine
        .export(&rebuilt.timeline, &output, format)
        .map_err(|e| anyhow::anyhow!("Export failed: {e}"))?;

    let report = &rebuilt.report;
    println!(
        "  Clips: {} ({} muted, {} speed-adjusted, {} substituted)",
        report.clips_processed,
        report.muted_clips,
        report.speed_adjusted_clips,
        report.substitutions
    );
    println!(
        "  Gaps filled: {}, secondary mixed: {} (skipped: {})",
        report.gaps_filled, report.secondary_clips_mixed, report.secondary_clips_skipped
    );
    println!(
        "  Duration: {:.3}s measured vs {:.3}s expected ({:.1}ms off, {})",
        report.measured_secs,
        report.expected_secs,
        report.delta_ms(),
        report.verdict(settings.drift_fail_secs)
    );

    let report_path = PathBuf::from(format!("{}.report.json", output.display()));
    std::fs::write(&report_path, serde_json::to_string_pretty(report)?)?;
    println!("  Report: {}", report_path.display());

    // A successful enhancement supersedes the plain export as the
    // final artifact; the plain export stays on disk as the fallback.
    let final_artifact = if args.skip_enhance {
        output.clone()
    } else {
        run_enhancement(&args, &output, format).unwrap_or_else(|| output.clone())
    };

    cleanup_workdir(&work_dir, args.keep_workdir);
    println!("Rebuild complete: {}", final_artifact.display());
    Ok(())
}

/// Run the optional enhancement step, returning the enhanced file on
/// success. Failures never fail the rebuild; the unenhanced output
/// always survives as the fallback.
fn run_enhancement(
    args: &RebuildArgs,
    output: &std::path::Path,
    format: ExportFormat,
) -> Option<PathBuf> {
    let config = EnhanceConfig {
        command: args.enhance_cmd.clone().unwrap_or_default(),
        timeout_secs: args.enhance_timeout_secs,
        ..EnhanceConfig::default()
    };

    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "timeline".to_string());
    let enhanced = output.with_file_name(format!("{stem}.enhanced.{}", format.extension()));

    match enhance(output, &enhanced, &config) {
        Ok(EnhanceOutcome::Enhanced) => {
            println!("  Enhanced: {}", enhanced.display());
            Some(enhanced)
        }
        Ok(EnhanceOutcome::Reused) => {
            println!("  Enhanced (reused previous run): {}", enhanced.display());
            Some(enhanced)
        }
        Err(EnhanceFailure::Unavailable(reason)) => {
            println!("  Enhancement skipped: {reason}");
            None
        }
        Err(e) => {
            println!("  Enhancement failed: {e}");
            println!("  Falling back to unenhanced output: {}", output.display());
            None
        }
    }
}

fn cleanup_workdir(work_dir: &std::path::Path, keep: bool) {
    if keep {
        println!("  Work directory kept: {}", work_dir.display());
    } else if let Err(e) = std::fs::remove_dir_all(work_dir) {
        tracing::warn!(dir = %work_dir.display(), error = %e, "Could not remove work directory");
    }
}
