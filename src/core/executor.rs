// src/core/executor.rs

use std::fmt;
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tracing::{error, info};

use crate::config::Config;
use crate::core::catalog::resolve_command;
use crate::core::models::{OutcomeStatus, ScanOutcome, ToolId};

// Restrictive allow-list for targets: a bare domain and nothing else. This is
// the injection barrier. The target lands verbatim inside a shell command,
// so shell metacharacters, whitespace and quoting must never get through.
static TARGET_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9.-]+$").expect("target pattern is a valid regex"));

// Crash signatures an external tool can only communicate through its output
// stream. These are the one place free-text matching is legitimate; every
// other failure class is carried as a structured variant.
const PANIC_MARKER: &str = "panic:";
const SEGFAULT_MARKER: &str = "SIGSEGV";

/// Validation failures of the execution service. Both variants are rejected
/// before any subprocess is spawned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecError {
    /// Target was empty or contained characters outside `[A-Za-z0-9.-]`.
    InvalidTarget,
    /// The requested tool id is not in the catalog.
    UnsupportedTool(String),
}

impl fmt::Display for ExecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecError::InvalidTarget => write!(f, "Invalid domain format"),
            ExecError::UnsupportedTool(id) => write!(f, "Tool '{id}' not supported"),
        }
    }
}

impl std::error::Error for ExecError {}

/// Checks a target against the domain allow-list.
pub fn validate_target(target: &str) -> bool {
    !target.is_empty() && TARGET_PATTERN.is_match(target)
}

/// Runs one tool against one target and classifies the result.
///
/// Rejects bad input before spawning anything; after the spawn every failure
/// mode (non-zero exit, timeout, signal, crash signature) is folded into a
/// `ScanOutcome` so the service keeps serving regardless of what the tool
/// did. The resolved command and outcome class are logged before returning.
///
/// # Arguments
/// * `tool_id` - Raw tool identifier from the request; parsed against the catalog.
/// * `target` - The domain to scan, validated against the allow-list first.
/// * `config` - Supplies the wall-clock timeout and output capture cap.
///
/// # Returns
/// `Ok(ScanOutcome)` for anything that reached a subprocess, `Err(ExecError)`
/// for requests rejected up front.
pub async fn execute_tool(
    tool_id: &str,
    target: &str,
    config: &Config,
) -> Result<ScanOutcome, ExecError> {
    if !validate_target(target) {
        return Err(ExecError::InvalidTarget);
    }
    let tool: ToolId = tool_id
        .parse()
        .map_err(|_| ExecError::UnsupportedTool(tool_id.to_string()))?;

    let command = resolve_command(tool, target);
    info!(tool = %tool, command = %command, "executing tool");

    let outcome = run_command(&command, config.exec_timeout, config.output_cap_bytes).await;
    match outcome.status {
        OutcomeStatus::Completed => info!(tool = %tool, "tool completed"),
        _ => error!(tool = %tool, status = %outcome.status, "tool failed"),
    }
    Ok(outcome)
}

/// Spawns a shell command and classifies its exit.
///
/// The command runs under `/bin/bash -c` with a hard timeout; on expiry the
/// child is killed and whatever it already wrote is kept, so a timed-out
/// tool still reports its partial stdout/stderr alongside the timeout
/// message. Both output streams are read concurrently with a byte cap per
/// stream; past the cap the reader keeps draining the pipe (so the child
/// never blocks) but discards the excess and marks the kept text as
/// truncated.
pub(crate) async fn run_command(command: &str, timeout: Duration, cap: usize) -> ScanOutcome {
    let spawned = Command::new("/bin/bash")
        .arg("-c")
        .arg(command)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn();

    let mut child = match spawned {
        Ok(child) => child,
        Err(e) => {
            error!(command = %command, error = %e, "failed to spawn command");
            return ScanOutcome {
                status: OutcomeStatus::Failed,
                output: format!("Failed to spawn command: {e}"),
            };
        }
    };

    let stdout_pipe = child.stdout.take();
    let stderr_pipe = child.stderr.take();

    // The readers write into shared sinks and run as their own tasks, so the
    // bytes collected before a timeout survive the kill. They also have to
    // run alongside wait(), or a child that fills its pipe would deadlock.
    let stdout_sink = Arc::new(Mutex::new(CappedRead::default()));
    let stderr_sink = Arc::new(Mutex::new(CappedRead::default()));
    let stdout_task = tokio::spawn(read_capped(stdout_pipe, cap, Arc::clone(&stdout_sink)));
    let stderr_task = tokio::spawn(read_capped(stderr_pipe, cap, Arc::clone(&stderr_sink)));

    let status = tokio::time::timeout(timeout, child.wait()).await;
    if status.is_err() {
        let _ = child.kill().await;
    }
    let (stdout, stderr) = tokio::join!(
        collect_capture(stdout_task, stdout_sink),
        collect_capture(stderr_task, stderr_sink),
    );
    let stdout = stdout.into_text(cap);
    let stderr = stderr.into_text(cap);

    match status {
        Ok(Ok(exit)) if exit.success() => classify_success(stdout, stderr),
        Ok(Ok(exit)) => classify_failure(
            command,
            &stdout,
            &stderr,
            &format!("Command failed with {exit}"),
        ),
        Ok(Err(e)) => classify_failure(
            command,
            &stdout,
            &stderr,
            &format!("Failed to collect command status: {e}"),
        ),
        Err(_) => {
            let mut message = format!("Command timed out after {}s: {command}", timeout.as_secs());
            if !stderr.is_empty() {
                message = format!("{stderr}\n{message}");
            }
            // The timeout note rides in the stderr position so the combined
            // failure text stays stdout first, diagnostics after.
            classify_failure(command, &stdout, &message, &message)
        }
    }
}

// How long to wait for the readers to reach EOF after the child exited or
// was killed. Orphaned grandchildren can keep a pipe open past the kill;
// after the grace the readers are aborted and the partial capture is kept.
const DRAIN_GRACE: Duration = Duration::from_secs(2);

#[derive(Default)]
struct CappedRead {
    bytes: Vec<u8>,
    truncated: bool,
}

impl CappedRead {
    fn into_text(self, cap: usize) -> String {
        let mut text = String::from_utf8_lossy(&self.bytes).into_owned();
        if self.truncated {
            text.push_str(&format!("\n[output truncated at {cap} bytes]"));
        }
        text
    }
}

// Reads a child stream to EOF into the shared sink, keeping at most `cap`
// bytes. Once the cap is hit the loop keeps reading (the pipe must be
// drained) but stops buffering.
async fn read_capped<R>(stream: Option<R>, cap: usize, sink: Arc<Mutex<CappedRead>>)
where
    R: AsyncRead + Unpin,
{
    let Some(mut stream) = stream else {
        return;
    };

    let mut chunk = [0u8; 8192];
    loop {
        match stream.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => {
                let Ok(mut captured) = sink.lock() else {
                    break;
                };
                if captured.truncated {
                    continue;
                }
                let room = cap.saturating_sub(captured.bytes.len());
                if n >= room {
                    captured.bytes.extend_from_slice(&chunk[..room]);
                    captured.truncated = true;
                } else {
                    captured.bytes.extend_from_slice(&chunk[..n]);
                }
            }
            Err(_) => break,
        }
    }
}

// Takes what a reader task has collected, waiting at most DRAIN_GRACE for
// it to see EOF before aborting it and settling for the partial capture.
async fn collect_capture(
    mut task: tokio::task::JoinHandle<()>,
    sink: Arc<Mutex<CappedRead>>,
) -> CappedRead {
    if tokio::time::timeout(DRAIN_GRACE, &mut task).await.is_err() {
        task.abort();
    }
    match sink.lock() {
        Ok(mut captured) => std::mem::take(&mut *captured),
        Err(_) => CappedRead::default(),
    }
}

// Success path: prefer stdout, fall back to stderr (some tools log useful
// summaries there), then a fixed placeholder.
fn classify_success(stdout: String, stderr: String) -> ScanOutcome {
    let output = if !stdout.is_empty() {
        stdout
    } else if !stderr.is_empty() {
        stderr
    } else {
        "Scan completed with no output".to_string()
    };
    ScanOutcome {
        status: OutcomeStatus::Completed,
        output,
    }
}

// Failure path: keep everything the tool said, stdout first. A crash
// signature in the capture upgrades the message to the critical format so
// the operator sees the exact command and remediation steps instead of a
// bare stack dump.
fn classify_failure(command: &str, stdout: &str, stderr: &str, failure: &str) -> ScanOutcome {
    let detail = if stderr.is_empty() { failure } else { stderr };
    let combined = format!("{stdout}\n{detail}");

    let output = if combined.contains(PANIC_MARKER) || combined.contains(SEGFAULT_MARKER) {
        critical_failure_message(command, &combined)
    } else {
        combined
    };
    ScanOutcome {
        status: OutcomeStatus::Failed,
        output,
    }
}

fn critical_failure_message(command: &str, captured: &str) -> String {
    format!(
        "[CRITICAL] External tool crashed while executing:\n\n    {command}\n\n\
         The process died with a crash signature (interpreter panic or segmentation fault).\n\
         Verify the tool is installed correctly and up to date, confirm it accepts the flags\n\
         above, and rerun the command manually to reproduce the crash.\n\n\
         --- captured output ---\n{captured}"
    )
}
