//! Ffmpeg-backed implementation of the engine contract.
//!
//! Every primitive shells out to `ffmpeg`/`ffprobe` with intermediate
//! WAV files in a private work directory. Filter choices: `atempo` for
//! pitch-preserving speed steps, `afade` for click suppression,
//! `anullsrc` for silence, the concat demuxer with stream copy for
//! sample-exact joins, and `adelay` + non-normalizing `amix` for
//! overlays.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::atomic::{AtomicU64, Ordering};

use retrack_common::{RetrackError, RetrackResult};

use crate::ops::{AudioEngine, AudioHandle, ExportFormat, RenderSpec};

/// Subprocess-based engine using ffmpeg and ffprobe.
pub struct FfmpegEngine {
    work_dir: PathBuf,
    sample_rate: u32,
    channels: u32,
    counter: AtomicU64,
}

impl FfmpegEngine {
    /// Create an engine writing intermediates under `work_dir` (created
    /// if missing) at the given canonical sample rate and channel count.
    pub fn new(work_dir: impl Into<PathBuf>, sample_rate: u32, channels: u32) -> RetrackResult<Self> {
        let work_dir = work_dir.into();
        std::fs::create_dir_all(&work_dir)?;
        Ok(Self {
            work_dir,
            sample_rate,
            channels,
            counter: AtomicU64::new(0),
        })
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    fn next_path(&self, label: &str) -> PathBuf {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        self.work_dir.join(format!("{label}_{n:05}.wav"))
    }

    fn channel_layout(&self) -> &'static str {
        if self.channels == 1 {
            "mono"
        } else {
            "stereo"
        }
    }

    /// Run one ffmpeg invocation, folding stderr into the error on
    /// failure.
    fn run_ffmpeg(&self, args: &[String], context: &str) -> RetrackResult<()> {
        tracing::debug!(?args, context, "Running ffmpeg");
        let output = Command::new("ffmpeg")
            .args(["-hide_banner", "-loglevel", "error", "-y"])
            .args(args)
            .output()
            .map_err(|e| RetrackError::engine(format!("failed to start ffmpeg ({context}): {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RetrackError::engine(format!(
                "ffmpeg {context} failed (status {}): {}",
                output.status,
                stderr.trim()
            )));
        }

        Ok(())
    }

    fn output_args(&self, out: &Path) -> Vec<String> {
        vec![
            "-ar".to_string(),
            self.sample_rate.to_string(),
            "-ac".to_string(),
            self.channels.to_string(),
            "-f".to_string(),
            "wav".to_string(),
            out.display().to_string(),
        ]
    }
}

/// Build the `-af` filter string for a render spec.
fn build_render_filter(spec: &RenderSpec) -> String {
    let mut filters: Vec<String> = spec
        .speed_chain
        .iter()
        .map(|step| format!("atempo={step:.6}"))
        .collect();

    filters.push(format!("afade=t=in:d={:.6}", spec.fade_in_secs));
    filters.push(format!(
        "afade=t=out:st={:.6}:d={:.6}",
        spec.fade_out.start_secs, spec.fade_out.duration_secs
    ));

    filters.join(",")
}

/// Build the `adelay` spec: one delay value per output channel.
fn build_delay_spec(delay_ms: i64, channels: u32) -> String {
    let ms = delay_ms.to_string();
    vec![ms; channels.max(1) as usize].join("|")
}

impl AudioEngine for FfmpegEngine {
    fn extract_audio(&self, source: &Path) -> RetrackResult<AudioHandle> {
        let out = self.next_path("source");
        tracing::info!(source = %source.display(), "Extracting source audio");

        let mut args = vec![
            "-i".to_string(),
            source.display().to_string(),
            "-vn".to_string(),
        ];
        args.extend(self.output_args(&out));
        self.run_ffmpeg(&args, "extract")?;
        Ok(AudioHandle::new(out))
    }

    fn measure_duration(&self, handle: &AudioHandle) -> RetrackResult<f64> {
        let output = Command::new("ffprobe")
            .args([
                "-hide_banner",
                "-loglevel",
                "error",
                "-show_entries",
                "format=duration",
                "-of",
                "default=noprint_wrappers=1:nokey=1",
            ])
            .arg(handle.path())
            .output()
            .map_err(|e| RetrackError::engine(format!("failed to start ffprobe: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RetrackError::engine(format!(
                "ffprobe failed on {}: {}",
                handle.path().display(),
                stderr.trim()
            )));
        }

        let raw = String::from_utf8_lossy(&output.stdout);
        raw.trim().parse::<f64>().map_err(|_| {
            RetrackError::engine(format!(
                "ffprobe returned unparseable duration for {}: {raw:?}",
                handle.path().display()
            ))
        })
    }

    fn render(&self, source: &AudioHandle, spec: &RenderSpec) -> RetrackResult<AudioHandle> {
        let out = self.next_path("segment");
        let filter = build_render_filter(spec);

        let mut args = vec![
            "-ss".to_string(),
            format!("{:.6}", spec.trim.start_secs),
            "-t".to_string(),
            format!("{:.6}", spec.trim.duration_secs),
            "-i".to_string(),
            source.path().display().to_string(),
            "-af".to_string(),
            filter,
        ];
        args.extend(self.output_args(&out));
        self.run_ffmpeg(&args, "render")?;
        Ok(AudioHandle::new(out))
    }

    fn pad_or_trim(&self, handle: &AudioHandle, exact_secs: f64) -> RetrackResult<AudioHandle> {
        let out = self.next_path("adjusted");
        let mut args = vec![
            "-i".to_string(),
            handle.path().display().to_string(),
            "-af".to_string(),
            format!("apad=whole_dur={exact_secs:.6},atrim=0:{exact_secs:.6}"),
        ];
        args.extend(self.output_args(&out));
        self.run_ffmpeg(&args, "pad_or_trim")?;
        Ok(AudioHandle::new(out))
    }

    fn silence(&self, duration_secs: f64) -> RetrackResult<AudioHandle> {
        let out = self.next_path("silence");
        let mut args = vec![
            "-f".to_string(),
            "lavfi".to_string(),
            "-i".to_string(),
            format!(
                "anullsrc=r={}:cl={}",
                self.sample_rate,
                self.channel_layout()
            ),
            "-t".to_string(),
            format!("{duration_secs:.6}"),
        ];
        args.extend(self.output_args(&out));
        self.run_ffmpeg(&args, "silence")?;
        Ok(AudioHandle::new(out))
    }

    fn concat(&self, handles: &[AudioHandle]) -> RetrackResult<AudioHandle> {
        let out = self.next_path("concat");
        let list_path = self.work_dir.join(format!(
            "concat_{:05}.txt",
            self.counter.fetch_add(1, Ordering::Relaxed)
        ));

        let mut list = String::new();
        for handle in handles {
            let escaped = handle.path().display().to_string().replace('\'', "'\\''");
            list.push_str(&format!("file '{escaped}'\n"));
        }
        std::fs::write(&list_path, list)?;

        // Stream copy keeps the join sample-exact; all inputs already
        // share the canonical rate and layout.
        let args = vec![
            "-f".to_string(),
            "concat".to_string(),
            "-safe".to_string(),
            "0".to_string(),
            "-i".to_string(),
            list_path.display().to_string(),
            "-c".to_string(),
            "copy".to_string(),
            out.display().to_string(),
        ];
        self.run_ffmpeg(&args, "concat")?;
        Ok(AudioHandle::new(out))
    }

    fn mix_additive(
        &self,
        base: &AudioHandle,
        overlay: &AudioHandle,
        delay_secs: f64,
    ) -> RetrackResult<AudioHandle> {
        let out = self.next_path("mix");
        let delay_ms = (delay_secs * 1000.0).round() as i64;
        let filter = format!(
            "[1:a]adelay={}[delayed];[0:a][delayed]amix=inputs=2:duration=first:normalize=0",
            build_delay_spec(delay_ms, self.channels)
        );

        let mut args = vec![
            "-i".to_string(),
            base.path().display().to_string(),
            "-i".to_string(),
            overlay.path().display().to_string(),
            "-filter_complex".to_string(),
            filter,
        ];
        args.extend(self.output_args(&out));
        self.run_ffmpeg(&args, "mix_additive")?;
        Ok(AudioHandle::new(out))
    }

    fn export(
        &self,
        handle: &AudioHandle,
        output: &Path,
        format: ExportFormat,
    ) -> RetrackResult<()> {
        if let Some(parent) = output.parent() {
            std::fs::create_dir_all(parent)?;
        }

        match format {
            ExportFormat::Wav => {
                std::fs::copy(handle.path(), output)?;
                Ok(())
            }
            ExportFormat::M4a => self.run_ffmpeg(
                &[
                    "-i".to_string(),
                    handle.path().display().to_string(),
                    "-c:a".to_string(),
                    "aac".to_string(),
                    "-b:a".to_string(),
                    "192k".to_string(),
                    output.display().to_string(),
                ],
                "export m4a",
            ),
            ExportFormat::Flac => self.run_ffmpeg(
                &[
                    "-i".to_string(),
                    handle.path().display().to_string(),
                    "-c:a".to_string(),
                    "flac".to_string(),
                    output.display().to_string(),
                ],
                "export flac",
            ),
        }
    }

    fn is_available(&self) -> bool {
        command_exists("ffmpeg") && command_exists("ffprobe")
    }

    fn name(&self) -> &str {
        "ffmpeg"
    }
}

/// Check whether a binary is resolvable on PATH.
pub fn command_exists(binary: &str) -> bool {
    Command::new("sh")
        .arg("-c")
        .arg(format!("command -v {binary} >/dev/null 2>&1"))
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}
