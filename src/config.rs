use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Tunables for one diagnosis run.
///
/// Every field has a default, so a JSON config file only needs the keys it
/// wants to override:
///
/// ```json
/// { "connect_timeout_ms": 3000, "workers": 8, "secure_ports": [10443] }
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ProbeConfig {
    /// TCP connect and DNS budget for the single-target pipeline.
    pub connect_timeout_ms: u64,
    /// TLS handshake budget.
    pub tls_timeout_ms: u64,
    /// HTTP connect and per-read budget.
    pub http_timeout_ms: u64,
    /// Connect budget for the scanner and the multi-port gate.
    pub scan_timeout_ms: u64,
    /// Echo requests sent by the reachability stage.
    pub ping_attempts: u32,
    /// Wait for each echo reply.
    pub ping_timeout_ms: u64,
    /// Upper bound on concurrent port probes in `scan` / `diagnose_all`.
    pub workers: usize,
    pub user_agent: String,
    /// Ports treated as TLS in addition to 443, 8443 and 9443.
    pub secure_ports: Vec<u16>,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 5_000,
            tls_timeout_ms: 5_000,
            http_timeout_ms: 5_000,
            scan_timeout_ms: 200,
            ping_attempts: 3,
            ping_timeout_ms: 1_000,
            workers: 16,
            user_agent: "Mozilla/5.0".to_string(),
            secure_ports: Vec::new(),
        }
    }
}

impl ProbeConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn tls_timeout(&self) -> Duration {
        Duration::from_millis(self.tls_timeout_ms)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_millis(self.http_timeout_ms)
    }

    pub fn scan_timeout(&self) -> Duration {
        Duration::from_millis(self.scan_timeout_ms)
    }

    pub fn ping_timeout(&self) -> Duration {
        Duration::from_millis(self.ping_timeout_ms)
    }

    /// Budget for the whole reachability stage: every attempt plus one spare.
    pub fn ping_stage_timeout(&self) -> Duration {
        self.ping_timeout() * (self.ping_attempts.max(1) + 1)
    }

    /// Whether `port` gets a TLS handshake and an `https://` request.
    pub fn is_secure_port(&self, port: u16) -> bool {
        crate::catalog::is_default_secure_port(port) || self.secure_ports.contains(&port)
    }

    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            bail!("workers must be at least 1");
        }
        if self.ping_attempts == 0 {
            bail!("ping_attempts must be at least 1");
        }
        let budgets = [
            ("connect_timeout_ms", self.connect_timeout_ms),
            ("tls_timeout_ms", self.tls_timeout_ms),
            ("http_timeout_ms", self.http_timeout_ms),
            ("scan_timeout_ms", self.scan_timeout_ms),
            ("ping_timeout_ms", self.ping_timeout_ms),
        ];
        for (name, ms) in budgets {
            if ms == 0 {
                bail!("{name} must be greater than zero");
            }
        }
        if self.secure_ports.contains(&0) {
            bail!("secure_ports contains port 0");
        }
        Ok(())
    }
}

/// Parse a JSON config document and validate it.
pub fn parse_config_str(s: &str) -> Result<ProbeConfig> {
    let cfg: ProbeConfig = serde_json::from_str(s).context("invalid config JSON")?;
    cfg.validate()?;
    Ok(cfg)
}

/// Load a config file. Errors if the file cannot be read, parsed, or validated.
pub fn load_config_from_path(path: impl AsRef<Path>) -> Result<ProbeConfig> {
    let content = fs::read_to_string(path.as_ref())
        .with_context(|| format!("failed to read config file: {}", path.as_ref().display()))?;
    parse_config_str(&content)
        .with_context(|| format!("in config file: {}", path.as_ref().display()))
}
