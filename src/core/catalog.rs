//! The static tool catalog and the command resolver.
//!
//! This module is the single source of truth for which external tools the
//! suite can drive and how each one is invoked. The catalog is data, not
//! behavior: adding a tool means adding one `ToolDescriptor` entry and one
//! arm to `resolve_command`. The catalog is also the trust boundary for tool
//! identity: once an id is in this table its template is executed as-is,
//! with only the target substituted.

use crate::core::models::{ToolCategory, ToolDescriptor, ToolId};

/// Every tool the suite ships with, in the fixed order scans iterate them.
///
/// The `command_display` field is what the operator sees; the actual shell
/// invocation comes from [`resolve_command`] and may differ (pipelines,
/// extra flags, output caps).
pub static AVAILABLE_TOOLS: &[ToolDescriptor] = &[
    ToolDescriptor {
        id: ToolId::Subfinder,
        name: "Subfinder",
        description: "Fast passive subdomain enumeration tool.",
        command_display: "subfinder -d {domain}",
        category: ToolCategory::Discovery,
        enabled: false,
    },
    ToolDescriptor {
        id: ToolId::Httpx,
        name: "HTTPX",
        description: "Fast and multi-purpose HTTP toolkit.",
        command_display: "httpx -u {domain} -status-code -title",
        category: ToolCategory::Discovery,
        enabled: false,
    },
    ToolDescriptor {
        id: ToolId::Nmap,
        name: "Nmap",
        description: "Network mapping and port scanning.",
        command_display: "nmap -sV -sC {domain}",
        category: ToolCategory::Network,
        enabled: false,
    },
    ToolDescriptor {
        id: ToolId::Waybackurls,
        name: "Waybackurls",
        description: "Fetch known URLs from the Wayback Machine.",
        command_display: "waybackurls {domain}",
        category: ToolCategory::Content,
        enabled: false,
    },
    ToolDescriptor {
        id: ToolId::Dirsearch,
        name: "Dirsearch",
        description: "Web path scanner (brute-force).",
        command_display: "dirsearch -u {domain} -e php,html,js",
        category: ToolCategory::Content,
        enabled: false,
    },
    ToolDescriptor {
        id: ToolId::Nikto,
        name: "Nikto",
        description: "Web server scanner for dangerous files/CGIs.",
        command_display: "nikto -h {domain} -maxtime 300s",
        category: ToolCategory::Vulnerability,
        enabled: false,
    },
];

/// Looks up the catalog entry for a tool id. Every `ToolId` variant has an
/// entry (the catalog test pins that down), so `None` only means the table
/// and the enum have drifted apart.
pub fn descriptor(id: ToolId) -> Option<&'static ToolDescriptor> {
    AVAILABLE_TOOLS.iter().find(|tool| tool.id == id)
}

/// Builds the exact shell command to run for a tool against a target.
///
/// The target is substituted verbatim, so callers must have validated it
/// first (see the execution service); this function performs no validation
/// of its own. The httpx entry is a pipeline: subfinder feeds the host list.
/// Waybackurls output is capped at a fixed 100 lines to keep captures
/// bounded on URL-heavy domains.
pub fn resolve_command(id: ToolId, target: &str) -> String {
    match id {
        ToolId::Nmap => format!("nmap -sV -sC -T4 -F {target}"),
        ToolId::Subfinder => format!("subfinder -d {target} -silent"),
        ToolId::Httpx => format!(
            "subfinder -d {target} -silent | httpx -title -status-code -tech-detect -silent"
        ),
        ToolId::Waybackurls => format!("waybackurls {target} | head -n 100"),
        ToolId::Dirsearch => {
            format!("dirsearch -u {target} -e php,html,js,txt -t 20 --format=plain")
        }
        ToolId::Nikto => format!("nikto -h {target} -maxtime 300s -ask no -nointeractive"),
    }
}

/// Renders the operator-facing command for a tool with the target filled in.
/// Used for log lines and remediation messages, not for execution.
pub fn display_command(id: ToolId, target: &str) -> String {
    match descriptor(id) {
        Some(tool) => tool.command_display.replace("{domain}", target),
        None => resolve_command(id, target),
    }
}

/// The display name for a tool, falling back to its id if the catalog entry
/// is missing.
pub fn display_name(id: ToolId) -> String {
    match descriptor(id) {
        Some(tool) => tool.name.to_string(),
        None => id.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn every_tool_id_has_a_catalog_entry() {
        for id in ToolId::iter() {
            assert_eq!(descriptor(id).map(|t| t.id), Some(id));
        }
    }

    #[test]
    fn catalog_order_matches_tool_listing() {
        let ids: Vec<ToolId> = AVAILABLE_TOOLS.iter().map(|t| t.id).collect();
        assert_eq!(
            ids,
            vec![
                ToolId::Subfinder,
                ToolId::Httpx,
                ToolId::Nmap,
                ToolId::Waybackurls,
                ToolId::Dirsearch,
                ToolId::Nikto,
            ]
        );
    }

    #[test]
    fn resolver_substitutes_the_target_verbatim() {
        assert_eq!(
            resolve_command(ToolId::Nmap, "example.com"),
            "nmap -sV -sC -T4 -F example.com"
        );
        assert_eq!(
            resolve_command(ToolId::Httpx, "example.com"),
            "subfinder -d example.com -silent | httpx -title -status-code -tech-detect -silent"
        );
    }

    #[test]
    fn waybackurls_output_is_capped_at_one_hundred_lines() {
        assert_eq!(
            resolve_command(ToolId::Waybackurls, "example.com"),
            "waybackurls example.com | head -n 100"
        );
    }

    #[test]
    fn display_command_fills_the_domain_placeholder() {
        assert_eq!(
            display_command(ToolId::Subfinder, "example.com"),
            "subfinder -d example.com"
        );
    }
}
