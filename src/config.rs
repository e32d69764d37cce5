// src/config.rs

use std::net::SocketAddr;
use std::time::Duration;

use tracing::warn;

/// Default address the execution service binds to, and the address the scan
/// controller targets when nothing else is configured.
const DEFAULT_BIND: &str = "127.0.0.1:3001";
/// Hard wall-clock limit for one tool subprocess (matches the slowest tool's
/// own -maxtime budget with headroom).
const DEFAULT_TIMEOUT_SECS: u64 = 360;
/// Combined stdout/stderr capture cap per stream, 10 MiB.
const DEFAULT_OUTPUT_CAP_BYTES: usize = 10 * 1024 * 1024;

/// Runtime configuration for both halves of the suite.
///
/// Defaults are baked in; each field can be overridden through an
/// `AUTORECON_*` environment variable. A malformed override is logged and
/// ignored rather than aborting startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Address the execution service listens on.
    pub bind: SocketAddr,
    /// Base URL the scan controller uses to reach the execution service.
    pub service_url: String,
    /// Wall-clock timeout for a single tool subprocess.
    pub exec_timeout: Duration,
    /// Maximum bytes kept from each of a subprocess's output streams.
    pub output_cap_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND
                .parse()
                .unwrap_or_else(|_| SocketAddr::from(([127, 0, 0, 1], 3001))),
            service_url: format!("http://{DEFAULT_BIND}"),
            exec_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            output_cap_bytes: DEFAULT_OUTPUT_CAP_BYTES,
        }
    }
}

impl Config {
    /// Builds the configuration from defaults plus environment overrides.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(raw) = std::env::var("AUTORECON_BIND") {
            match raw.parse() {
                Ok(addr) => config.bind = addr,
                Err(_) => warn!(value = %raw, "AUTORECON_BIND is not a valid socket address, using default"),
            }
        }
        if let Ok(url) = std::env::var("AUTORECON_SERVICE_URL") {
            config.service_url = url.trim_end_matches('/').to_string();
        }
        if let Ok(raw) = std::env::var("AUTORECON_TIMEOUT_SECS") {
            match raw.parse::<u64>() {
                Ok(secs) => config.exec_timeout = Duration::from_secs(secs),
                Err(_) => warn!(value = %raw, "AUTORECON_TIMEOUT_SECS is not a number, using default"),
            }
        }
        if let Ok(raw) = std::env::var("AUTORECON_OUTPUT_CAP_BYTES") {
            match raw.parse::<usize>() {
                Ok(bytes) => config.output_cap_bytes = bytes,
                Err(_) => warn!(value = %raw, "AUTORECON_OUTPUT_CAP_BYTES is not a number, using default"),
            }
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn defaults_match_the_reference_limits() {
        let config = Config::default();
        assert_eq!(config.bind.port(), 3001);
        assert_eq!(config.service_url, "http://127.0.0.1:3001");
        assert_eq!(config.exec_timeout, Duration::from_secs(360));
        assert_eq!(config.output_cap_bytes, 10 * 1024 * 1024);
    }
}
