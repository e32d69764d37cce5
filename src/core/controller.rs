// src/core/controller.rs

use std::fmt;
use std::time::Instant;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use tracing::{info, warn};
use url::Url;

use crate::core::catalog::{self, AVAILABLE_TOOLS};
use crate::core::models::{
    LogEntry, LogLevel, OutcomeStatus, ScanOutcome, ScanResult, ScanSession, ScanStatus,
    ToolDescriptor, ToolId,
};

// --- Transport Boundary ---

/// Failure to obtain any reply from the execution service. Distinct from the
/// service reporting a tool failure: that comes back as a `ScanOutcome`.
#[derive(Debug, Clone)]
pub enum TransportError {
    /// Connection refused, DNS failure, timeout: the service was unreachable.
    Connect(String),
    /// The service answered with something that is not a scan outcome.
    UnexpectedResponse(String),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Connect(detail) => write!(f, "connection failed: {detail}"),
            TransportError::UnexpectedResponse(detail) => {
                write!(f, "unexpected response: {detail}")
            }
        }
    }
}

impl std::error::Error for TransportError {}

/// The one operation the controller needs from the execution service.
/// Production uses [`HttpExecClient`]; tests substitute an in-memory fake.
#[async_trait]
pub trait ExecTransport: Send + Sync {
    async fn execute(&self, tool_id: ToolId, target: &str) -> Result<ScanOutcome, TransportError>;
}

/// HTTP client for the execution service's `POST /api/scan` endpoint.
pub struct HttpExecClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpExecClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl ExecTransport for HttpExecClient {
    async fn execute(&self, tool_id: ToolId, target: &str) -> Result<ScanOutcome, TransportError> {
        let url = format!("{}/api/scan", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&json!({ "toolId": tool_id.to_string(), "target": target }))
            .send()
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;

        // Validation rejections arrive as HTTP 400 with a structured body, so
        // the body is parsed regardless of the status code; only an
        // undecodable reply counts as a transport failure.
        let status = response.status();
        response
            .json::<ScanOutcome>()
            .await
            .map_err(|e| TransportError::UnexpectedResponse(format!("server returned {status}: {e}")))
    }
}

// --- Controller ---

/// Protocol violations of the scan controller. Both leave the current
/// session untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerError {
    /// A scan is already running; re-scan requests are rejected, never
    /// interleaved.
    ScanInProgress,
    /// The target was empty after normalization.
    EmptyTarget,
}

impl fmt::Display for ControllerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControllerError::ScanInProgress => write!(f, "a scan is already in progress"),
            ControllerError::EmptyTarget => write!(f, "target domain is empty"),
        }
    }
}

impl std::error::Error for ControllerError {}

/// Drives one sequential scan at a time against a single target.
///
/// The controller owns the session state exclusively for the duration of a
/// scan: each step produces a finalized result record that replaces the
/// pending entry for that tool, and nothing mutates a result after it
/// reaches a terminal status. Tools run strictly one after another; tool
/// *n+1* is never dispatched before tool *n*'s outcome is recorded.
pub struct ScanController<T: ExecTransport> {
    transport: T,
    service_url: String,
    tools: Vec<ToolDescriptor>,
    session: ScanSession,
}

impl<T: ExecTransport> ScanController<T> {
    /// Creates a controller with the full catalog (all tools disabled).
    pub fn new(transport: T, service_url: impl Into<String>) -> Self {
        Self {
            transport,
            service_url: service_url.into(),
            tools: AVAILABLE_TOOLS.to_vec(),
            session: ScanSession::default(),
        }
    }

    /// Read access to the current session (live during a scan, final after).
    pub fn session(&self) -> &ScanSession {
        &self.session
    }

    /// The catalog with current enabled flags, in fixed order.
    pub fn tools(&self) -> &[ToolDescriptor] {
        &self.tools
    }

    /// Toggles one tool. Rejected while a scan is running so the queue
    /// snapshot can never drift mid-scan.
    pub fn set_tool_enabled(
        &mut self,
        id: ToolId,
        enabled: bool,
    ) -> Result<(), ControllerError> {
        if self.session.busy {
            return Err(ControllerError::ScanInProgress);
        }
        for tool in &mut self.tools {
            if tool.id == id {
                tool.enabled = enabled;
            }
        }
        Ok(())
    }

    /// Enables exactly the given set of tools, disabling the rest.
    pub fn enable_only(&mut self, ids: &[ToolId]) -> Result<(), ControllerError> {
        if self.session.busy {
            return Err(ControllerError::ScanInProgress);
        }
        for tool in &mut self.tools {
            tool.enabled = ids.contains(&tool.id);
        }
        Ok(())
    }

    /// Reduces operator input to a bare host: a pasted URL becomes its host,
    /// anything else is passed through trimmed. Validation proper happens at
    /// the execution service.
    pub fn normalize_target(input: &str) -> String {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return String::new();
        }
        let with_scheme = if !trimmed.starts_with("http://") && !trimmed.starts_with("https://") {
            format!("https://{trimmed}")
        } else {
            trimmed.to_string()
        };
        Url::parse(&with_scheme)
            .ok()
            .and_then(|url| url.host_str().map(String::from))
            .unwrap_or_else(|| trimmed.to_string())
    }

    /// Runs the full scan sequence against `target`.
    ///
    /// Rejects if a scan is already in progress or the target is empty;
    /// otherwise clears the previous session, snapshots the enabled tools in
    /// catalog order and executes them one at a time. A transport failure on
    /// one tool marks that tool failed with remediation text and the queue
    /// continues; the session always reaches its finished log entry.
    pub async fn start_scan(&mut self, target: &str) -> Result<(), ControllerError> {
        if self.session.busy {
            warn!("scan requested while another scan is in progress");
            return Err(ControllerError::ScanInProgress);
        }
        let target = Self::normalize_target(target);
        if target.is_empty() {
            return Err(ControllerError::EmptyTarget);
        }

        let queue: Vec<ToolId> = self
            .tools
            .iter()
            .filter(|tool| tool.enabled)
            .map(|tool| tool.id)
            .collect();

        self.session = ScanSession {
            target: target.clone(),
            queue: queue.clone(),
            results: queue
                .iter()
                .map(|&id| (id, ScanResult::pending(id)))
                .collect(),
            logs: Vec::new(),
            progress: 0.0,
            busy: true,
        };

        info!(target = %target, tools = ?queue, "starting scan sequence");
        self.log(LogLevel::Info, format!("Target acquired: {target}"));
        let id_list: Vec<String> = queue.iter().map(|id| id.to_string()).collect();
        self.log(
            LogLevel::Info,
            format!("Initializing suite: {}", id_list.join(", ")),
        );

        let total = queue.len();
        let mut done = 0usize;

        for tool in queue {
            let name = catalog::display_name(tool);

            if let Some(result) = self.session.results.get_mut(&tool) {
                result.status = ScanStatus::Running;
                result.started_at = Utc::now();
            }
            self.log(LogLevel::Warning, format!("[{name}] Executing command..."));

            let started = Instant::now();
            let (status, output) = match self.transport.execute(tool, &target).await {
                Ok(outcome) => match outcome.status {
                    OutcomeStatus::Completed => (ScanStatus::Completed, outcome.output),
                    // "error" can only appear here if the service rejected
                    // the request; either way the tool did not complete.
                    OutcomeStatus::Failed | OutcomeStatus::Error => {
                        (ScanStatus::Failed, outcome.output)
                    }
                },
                Err(e) => (
                    ScanStatus::Failed,
                    self.connection_error_output(tool, &target, &e),
                ),
            };
            let duration = format!("{:.2}s", started.elapsed().as_secs_f64());

            if let Some(result) = self.session.results.get_mut(&tool) {
                result.status = status;
                result.output = output;
                result.duration = Some(duration.clone());
            }

            match status {
                ScanStatus::Completed => {
                    self.log(LogLevel::Success, format!("[{name}] Completed in {duration}"));
                }
                _ => {
                    self.log(
                        LogLevel::Error,
                        format!("[{name}] Failed: See output for details"),
                    );
                }
            }

            done += 1;
            self.session.progress = progress_fraction(done, total);
        }

        self.session.busy = false;
        self.log(LogLevel::Success, "Scan sequence finished.");
        info!(target = %self.session.target, "scan sequence finished");
        Ok(())
    }

    fn log(&mut self, level: LogLevel, message: impl Into<String>) {
        self.session.logs.push(LogEntry::new(level, message));
    }

    // The remediation text for a transport-level failure: names the service
    // location, how to start it, and the command the tool would have run.
    fn connection_error_output(&self, tool: ToolId, target: &str, err: &TransportError) -> String {
        format!(
            "[CONNECTION ERROR] Could not reach the execution service at {url}.\n\n\
             1. Ensure the execution service is running on this machine:\n\
             \x20  $ autorecon serve\n\
             2. Ensure it is listening on {url}.\n\
             3. If running in a cloud IDE/VM, ensure the port is forwarded/exposed.\n\n\
             Command meant to run: {command}\n\n\
             Transport error: {err}",
            url = self.service_url,
            command = catalog::display_command(tool, target),
        )
    }
}

/// Overall progress after `done` of `total` tools have finished, regardless
/// of how they finished. An empty queue counts as fully done.
pub fn progress_fraction(done: usize, total: usize) -> f64 {
    if total == 0 {
        return 1.0;
    }
    done as f64 / total as f64
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use pretty_assertions::assert_eq;

    use super::*;

    // In-memory stand-in for the execution service: records dispatch order
    // and fails on request.
    struct FakeTransport {
        calls: Mutex<Vec<ToolId>>,
        fail_connect: Vec<ToolId>,
        report_failed: Vec<ToolId>,
    }

    impl FakeTransport {
        fn ok() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                fail_connect: Vec::new(),
                report_failed: Vec::new(),
            }
        }

        fn calls(&self) -> Vec<ToolId> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ExecTransport for FakeTransport {
        async fn execute(
            &self,
            tool_id: ToolId,
            target: &str,
        ) -> Result<ScanOutcome, TransportError> {
            self.calls.lock().unwrap().push(tool_id);
            if self.fail_connect.contains(&tool_id) {
                return Err(TransportError::Connect("connection refused".to_string()));
            }
            if self.report_failed.contains(&tool_id) {
                return Ok(ScanOutcome {
                    status: OutcomeStatus::Failed,
                    output: format!("{tool_id} blew up"),
                });
            }
            Ok(ScanOutcome {
                status: OutcomeStatus::Completed,
                output: format!("{tool_id} scanned {target}"),
            })
        }
    }

    fn controller_with(transport: FakeTransport, ids: &[ToolId]) -> ScanController<FakeTransport> {
        let mut controller = ScanController::new(transport, "http://127.0.0.1:3001");
        controller.enable_only(ids).unwrap();
        controller
    }

    #[tokio::test]
    async fn tools_are_dispatched_strictly_in_catalog_order() {
        // Enabled out of order on purpose; the snapshot follows the catalog.
        let mut controller = controller_with(
            FakeTransport::ok(),
            &[ToolId::Nikto, ToolId::Subfinder, ToolId::Nmap],
        );
        controller.start_scan("example.com").await.unwrap();

        assert_eq!(
            controller.transport.calls(),
            vec![ToolId::Subfinder, ToolId::Nmap, ToolId::Nikto]
        );
    }

    #[tokio::test]
    async fn completed_scan_finalizes_every_result_and_the_session() {
        let mut controller =
            controller_with(FakeTransport::ok(), &[ToolId::Subfinder, ToolId::Nmap]);
        controller.start_scan("example.com").await.unwrap();

        let session = controller.session();
        assert!(!session.busy);
        assert_eq!(session.progress, 1.0);
        assert_eq!(session.target, "example.com");
        for id in [ToolId::Subfinder, ToolId::Nmap] {
            let result = &session.results[&id];
            assert_eq!(result.status, ScanStatus::Completed);
            assert!(result.output.contains("example.com"));
            assert!(result.duration.is_some());
        }
        assert_eq!(
            session.logs.last().map(|entry| entry.message.as_str()),
            Some("Scan sequence finished.")
        );
    }

    #[tokio::test]
    async fn transport_failure_marks_the_tool_failed_but_the_queue_continues() {
        let transport = FakeTransport {
            fail_connect: vec![ToolId::Subfinder],
            ..FakeTransport::ok()
        };
        let mut controller = controller_with(transport, &[ToolId::Subfinder, ToolId::Nmap]);
        controller.start_scan("example.com").await.unwrap();

        let session = controller.session();
        let failed = &session.results[&ToolId::Subfinder];
        assert_eq!(failed.status, ScanStatus::Failed);
        assert!(failed.output.contains("[CONNECTION ERROR]"));
        assert!(failed.output.contains("http://127.0.0.1:3001"));
        assert!(failed.output.contains("autorecon serve"));
        assert!(failed.output.contains("subfinder -d example.com"));

        // The second tool still executed and the session still finished.
        assert_eq!(session.results[&ToolId::Nmap].status, ScanStatus::Completed);
        assert_eq!(session.progress, 1.0);
        assert!(!session.busy);
    }

    #[tokio::test]
    async fn service_reported_failure_is_adopted_verbatim() {
        let transport = FakeTransport {
            report_failed: vec![ToolId::Nmap],
            ..FakeTransport::ok()
        };
        let mut controller = controller_with(transport, &[ToolId::Nmap]);
        controller.start_scan("example.com").await.unwrap();

        let result = &controller.session().results[&ToolId::Nmap];
        assert_eq!(result.status, ScanStatus::Failed);
        assert_eq!(result.output, "nmap blew up");
    }

    #[tokio::test]
    async fn rescan_while_busy_is_rejected_without_touching_the_session() {
        let mut controller = controller_with(FakeTransport::ok(), &[ToolId::Nmap]);
        controller.start_scan("example.com").await.unwrap();

        // Freeze the finished session, then simulate an in-flight scan.
        let logs_before = controller.session().logs.len();
        controller.session.busy = true;

        let rejected = controller.start_scan("other.com").await;
        assert_eq!(rejected, Err(ControllerError::ScanInProgress));
        assert_eq!(controller.session().logs.len(), logs_before);
        assert_eq!(controller.session().target, "example.com");
    }

    #[test]
    fn tool_toggles_are_visible_through_the_catalog_view() {
        let mut controller = ScanController::new(FakeTransport::ok(), "http://127.0.0.1:3001");
        assert!(controller.tools().iter().all(|tool| !tool.enabled));

        controller.set_tool_enabled(ToolId::Nikto, true).unwrap();
        let enabled: Vec<ToolId> = controller
            .tools()
            .iter()
            .filter(|tool| tool.enabled)
            .map(|tool| tool.id)
            .collect();
        assert_eq!(enabled, vec![ToolId::Nikto]);
    }

    #[tokio::test]
    async fn toggling_tools_is_rejected_while_busy() {
        let mut controller = controller_with(FakeTransport::ok(), &[ToolId::Nmap]);
        controller.session.busy = true;
        assert_eq!(
            controller.set_tool_enabled(ToolId::Nikto, true),
            Err(ControllerError::ScanInProgress)
        );
    }

    #[tokio::test]
    async fn empty_target_is_rejected_before_any_dispatch() {
        let mut controller = controller_with(FakeTransport::ok(), &[ToolId::Nmap]);
        assert_eq!(
            controller.start_scan("   ").await,
            Err(ControllerError::EmptyTarget)
        );
        assert!(controller.transport.calls().is_empty());
    }

    #[test]
    fn progress_is_exactly_done_over_total() {
        assert_eq!(progress_fraction(0, 4), 0.0);
        assert_eq!(progress_fraction(2, 4), 0.5);
        assert_eq!(progress_fraction(4, 4), 1.0);
        assert_eq!(progress_fraction(0, 0), 1.0);
    }

    #[test]
    fn pasted_urls_are_reduced_to_their_host() {
        assert_eq!(
            ScanController::<FakeTransport>::normalize_target("https://example.com/path?q=1"),
            "example.com"
        );
        assert_eq!(
            ScanController::<FakeTransport>::normalize_target("  example.com  "),
            "example.com"
        );
        assert_eq!(ScanController::<FakeTransport>::normalize_target(""), "");
    }
}
