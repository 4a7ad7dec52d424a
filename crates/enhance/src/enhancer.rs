//! External enhancement command runner.
//!
//! The tool's exit-code contract: 0 success, 2 authentication missing,
//! 3 session expired, anything else a processing error. Stderr is
//! captured to a log file next to the output so a failed run leaves
//! something to read.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Configuration for the external enhancement step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnhanceConfig {
    /// Command template with `{input}` and `{output}` placeholders,
    /// split on whitespace. Empty means no tool is configured.
    pub command: String,

    /// Hard wall-clock limit for one run.
    pub timeout_secs: u64,

    /// Reuse an already-present output file instead of re-running.
    pub reuse_existing: bool,
}

impl Default for EnhanceConfig {
    fn default() -> Self {
        Self {
            command: String::new(),
            // Enhancement tools upload and re-download the whole
            // stream; long projects legitimately take minutes.
            timeout_secs: 900,
            reuse_existing: true,
        }
    }
}

/// How the enhanced file came to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnhanceOutcome {
    /// The tool ran and produced the output.
    Enhanced,
    /// A previous run's output was reused.
    Reused,
}

/// Typed enhancement failures. Callers match on these to decide what to
/// tell the user before falling back to the unenhanced stream.
#[derive(Debug, thiserror::Error)]
pub enum EnhanceFailure {
    #[error("enhancement tool unavailable: {0}")]
    Unavailable(String),

    #[error("enhancement authentication missing (tool exit code 2); log in to the tool and retry")]
    AuthMissing,

    #[error("enhancement session expired (tool exit code 3); re-authenticate and retry")]
    SessionExpired,

    #[error("enhancement failed: {0}")]
    Processing(String),

    #[error("enhancement timed out after {0}s")]
    TimedOut(u64),
}

/// Run the configured enhancement tool on `input`, producing `output`.
pub fn enhance(
    input: &Path,
    output: &Path,
    config: &EnhanceConfig,
) -> Result<EnhanceOutcome, EnhanceFailure> {
    if config.command.trim().is_empty() {
        return Err(EnhanceFailure::Unavailable(
            "no enhancement command configured".to_string(),
        ));
    }
    if !input.exists() {
        return Err(EnhanceFailure::Processing(format!(
            "input file missing: {}",
            input.display()
        )));
    }

    if config.reuse_existing && output.exists() {
        tracing::info!(output = %output.display(), "Reusing existing enhanced file");
        return Ok(EnhanceOutcome::Reused);
    }

    let argv = build_argv(&config.command, input, output);
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| EnhanceFailure::Unavailable("empty enhancement command".to_string()))?;

    tracing::info!(
        tool = %program,
        input = %input.display(),
        output = %output.display(),
        timeout_secs = config.timeout_secs,
        "Running enhancement tool"
    );

    let log_path = stderr_log_path(output);
    let stderr = File::create(&log_path)
        .map(Stdio::from)
        .unwrap_or_else(|_| Stdio::null());

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(stderr)
        .spawn()
        .map_err(|e| EnhanceFailure::Unavailable(format!("failed to start {program}: {e}")))?;

    let deadline = Instant::now() + Duration::from_secs(config.timeout_secs);
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) if Instant::now() >= deadline => {
                // Past the deadline; the tool is presumed hung.
                let _ = child.kill();
                let _ = child.wait();
                return Err(EnhanceFailure::TimedOut(config.timeout_secs));
            }
            Ok(None) => std::thread::sleep(POLL_INTERVAL),
            Err(e) => {
                return Err(EnhanceFailure::Processing(format!(
                    "could not poll enhancement tool: {e}"
                )))
            }
        }
    };

    match status.code() {
        Some(0) => {
            if !output.exists() {
                return Err(EnhanceFailure::Processing(format!(
                    "tool reported success but produced no output: {}",
                    output.display()
                )));
            }
            tracing::info!(output = %output.display(), "Enhancement complete");
            Ok(EnhanceOutcome::Enhanced)
        }
        Some(2) => Err(EnhanceFailure::AuthMissing),
        Some(3) => Err(EnhanceFailure::SessionExpired),
        Some(code) => Err(EnhanceFailure::Processing(format!(
            "tool exited with code {code}{}",
            stderr_tail(&log_path)
        ))),
        None => Err(EnhanceFailure::Processing(
            "tool terminated by signal".to_string(),
        )),
    }
}

/// Split the command template and substitute placeholders per token, so
/// templates like `--out={output}` work.
fn build_argv(template: &str, input: &Path, output: &Path) -> Vec<String> {
    template
        .split_whitespace()
        .map(|token| {
            token
                .replace("{input}", &input.to_string_lossy())
                .replace("{output}", &output.to_string_lossy())
        })
        .collect()
}

fn stderr_log_path(output: &Path) -> PathBuf {
    let mut name = output
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "enhance".to_string());
    name.push_str(".enhance.log");
    output.with_file_name(name)
}

/// Last line of the stderr log, formatted for appending to an error.
fn stderr_tail(log_path: &Path) -> String {
    match std::fs::read_to_string(log_path) {
        Ok(content) => match content.lines().rev().find(|l| !l.trim().is_empty()) {
            Some(line) => format!(": {}", line.trim()),
            None => String::new(),
        },
        Err(_) => String::new(),
    }
}
