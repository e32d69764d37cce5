// src/core/models.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

// --- Tool Identity ---

// The closed set of external reconnaissance tools the suite knows how to drive.
// Keeping this an enum (rather than free-form strings) means the command
// resolver can match exhaustively: adding a tool is a single-point change the
// compiler enforces everywhere.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ToolId {
    Subfinder,
    Httpx,
    Nmap,
    Waybackurls,
    Dirsearch,
    Nikto,
}

// High-level grouping used when presenting the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum ToolCategory {
    Discovery,
    Vulnerability,
    Network,
    Content,
}

// A catalog entry describing one tool. Everything here is static except the
// `enabled` flag, which the operator toggles before a scan starts.
#[derive(Debug, Clone)]
pub struct ToolDescriptor {
    pub id: ToolId,
    pub name: &'static str,
    pub description: &'static str,
    /// The human-readable command template shown to the operator, with the
    /// `{domain}` placeholder left in place. The resolver builds the real
    /// invocation separately.
    pub command_display: &'static str,
    pub category: ToolCategory,
    pub enabled: bool,
}

// --- Execution Outcomes ---

// Wire-level classification of one tool execution, shared between the
// execution service and the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    /// Subprocess exited successfully.
    Completed,
    /// Subprocess ran but exited non-zero, timed out, or crashed.
    Failed,
    /// Request rejected before any subprocess was spawned.
    Error,
}

// The structured result of one execution attempt. This is the JSON body of
// the `/api/scan` response in both directions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanOutcome {
    pub status: OutcomeStatus,
    pub output: String,
}

// --- Scan Session State ---

// Lifecycle of one (target, tool) pair within a scan.
// pending -> running -> {completed | failed}, no retries, no other edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ScanStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

// One per (target, tool) pair. Created in `Pending` when the scan starts and
// never mutated after reaching a terminal status until a new scan replaces it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResult {
    pub tool_id: ToolId,
    pub status: ScanStatus,
    pub output: String,
    pub started_at: DateTime<Utc>,
    pub duration: Option<String>,
}

impl ScanResult {
    // A fresh pending record for a tool that has not been dispatched yet.
    pub fn pending(tool_id: ToolId) -> Self {
        Self {
            tool_id,
            status: ScanStatus::Pending,
            output: String::new(),
            started_at: Utc::now(),
            duration: None,
        }
    }
}

// Severity of an orchestration-level log line, mirroring the four classes the
// live terminal feed distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[strum(serialize_all = "lowercase")]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

// An append-only record of one orchestration event (target acquired, tool
// started, tool finished, scan finished). The sequence is cleared when a new
// scan begins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
}

impl LogEntry {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            message: message.into(),
        }
    }
}

// The ephemeral aggregate for the currently active (or most recently
// completed) scan. Lives only in memory; the next scan discards and replaces
// it wholesale.
#[derive(Debug, Clone, Default)]
pub struct ScanSession {
    pub target: String,
    /// Enabled tools in catalog order, snapshotted when the scan started.
    pub queue: Vec<ToolId>,
    pub results: std::collections::HashMap<ToolId, ScanResult>,
    pub logs: Vec<LogEntry>,
    /// completed_count / total_enabled, in [0, 1].
    pub progress: f64,
    /// Exactly one session may be in progress at a time.
    pub busy: bool,
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    use super::*;

    #[test]
    fn tool_ids_round_trip_as_lowercase_strings() {
        assert_eq!(ToolId::Waybackurls.to_string(), "waybackurls");
        assert_eq!(ToolId::from_str("nikto").unwrap(), ToolId::Nikto);
        assert!(ToolId::from_str("metasploit").is_err());
    }

    #[test]
    fn outcome_serializes_with_lowercase_status() {
        let outcome = ScanOutcome {
            status: OutcomeStatus::Failed,
            output: "boom".to_string(),
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["output"], "boom");
    }

    #[test]
    fn pending_result_starts_with_empty_output_and_no_duration() {
        let result = ScanResult::pending(ToolId::Nmap);
        assert_eq!(result.status, ScanStatus::Pending);
        assert_eq!(result.output, "");
        assert_eq!(result.duration, None);
    }
}
