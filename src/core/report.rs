//! Markdown report generation for a scan session.
//!
//! Pure functions over a session snapshot: same session in, same document
//! out. Output text is embedded verbatim, with no re-formatting and no
//! truncation.

use chrono::{DateTime, Utc};

use crate::core::catalog;
use crate::core::models::ScanSession;

/// Renders the full scan report for a session.
///
/// One section per snapshotted tool, in catalog order, with the recorded
/// duration and the raw output fenced as-is. Tools that never produced a
/// result are omitted from the body. The generation timestamp is a
/// parameter so the rendering stays deterministic.
pub fn render_report(session: &ScanSession, generated_at: DateTime<Utc>) -> String {
    let mut report = String::new();
    report.push_str("# Autorecon Scan Report\n");
    report.push_str(&format!("Target: {}\n", session.target));
    report.push_str(&format!(
        "Date: {}\n",
        generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    report.push_str("Execution Mode: Local execution service\n\n");
    report.push_str("---\n\n");

    for &tool in &session.queue {
        let Some(result) = session.results.get(&tool) else {
            continue;
        };
        report.push_str(&format!("## [{}] Output\n", catalog::display_name(tool)));
        report.push_str(&format!(
            "Duration: {}\n\n",
            result.duration.as_deref().unwrap_or("-")
        ));
        report.push_str(&format!("```\n{}\n```\n\n", result.output));
        report.push_str("---\n\n");
    }

    report
}

/// Filename for the exported report, derived from the target with anything
/// outside `[a-z0-9]` flattened to underscores.
pub fn report_filename(target: &str) -> String {
    let sanitized: String = target
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    format!("recon_report_{sanitized}.md")
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::core::models::{ScanResult, ScanStatus, ToolId};

    fn session_with_one_result() -> ScanSession {
        let mut session = ScanSession {
            target: "example.com".to_string(),
            queue: vec![ToolId::Subfinder, ToolId::Nmap],
            ..ScanSession::default()
        };
        let mut result = ScanResult::pending(ToolId::Subfinder);
        result.status = ScanStatus::Completed;
        result.output = "api.example.com\nwww.example.com".to_string();
        result.duration = Some("4.20s".to_string());
        session.results.insert(ToolId::Subfinder, result);
        session
    }

    #[test]
    fn report_contains_finished_tools_verbatim_and_omits_the_rest() {
        let session = session_with_one_result();
        let generated = Utc.with_ymd_and_hms(2026, 2, 1, 12, 0, 0).unwrap();
        let report = render_report(&session, generated);

        assert!(report.contains("# Autorecon Scan Report"));
        assert!(report.contains("Target: example.com"));
        assert!(report.contains("Date: 2026-02-01 12:00:00 UTC"));
        assert!(report.contains("## [Subfinder] Output"));
        assert!(report.contains("Duration: 4.20s"));
        assert!(report.contains("api.example.com\nwww.example.com"));
        // Nmap never produced a result, so it has no section at all.
        assert!(!report.contains("Nmap"));
    }

    #[test]
    fn rendering_is_deterministic_for_the_same_snapshot() {
        let session = session_with_one_result();
        let generated = Utc.with_ymd_and_hms(2026, 2, 1, 12, 0, 0).unwrap();
        assert_eq!(
            render_report(&session, generated),
            render_report(&session, generated)
        );
    }

    #[test]
    fn filename_flattens_the_target() {
        assert_eq!(
            report_filename("Sub.Example-1.com"),
            "recon_report_sub_example_1_com.md"
        );
    }
}
