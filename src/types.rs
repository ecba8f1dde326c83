use serde::{Deserialize, Serialize};

/// Outcome of a stage that may legitimately be skipped.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum StageOutcome {
    #[default]
    NotAttempted,
    Passed,
    Failed,
}

impl StageOutcome {
    pub fn from_success(ok: bool) -> Self {
        if ok {
            Self::Passed
        } else {
            Self::Failed
        }
    }

    pub fn is_failed(self) -> bool {
        self == Self::Failed
    }

    pub fn was_attempted(self) -> bool {
        self != Self::NotAttempted
    }
}

/// Everything learned about one target:port during one diagnosis.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct ProbeResult {
    pub target: String,
    pub port: u16,
    pub service_name: String,
    /// RFC 3339 UTC time the probe started.
    pub checked_at: String,

    pub dns_resolved: bool,
    pub resolved_address: Option<String>,

    pub ping_reachable: bool,
    pub ping_replies: u32,

    pub port_open: bool,

    pub tls: StageOutcome,
    pub tls_issuer: Option<String>,
    pub tls_not_before: Option<String>,
    pub tls_not_after: Option<String>,

    pub http: StageOutcome,
    pub http_status_code: Option<u16>,
    pub auth_failed: bool,
    pub server_banner: Option<String>,
    pub page_title: Option<String>,
    pub response_time_millis: Option<u64>,

    pub resolution_hint: Option<String>,
    pub risk_hint: Option<String>,

    pub raw_log: String,
    pub analysis_summary: String,

    /// Only set by the scan-only path.
    pub scanned_open_ports: Option<Vec<u16>>,
}

impl ProbeResult {
    pub fn new(target: &str, port: u16, service_name: &str, checked_at: String) -> Self {
        Self {
            target: target.to_string(),
            port,
            service_name: service_name.to_string(),
            checked_at,
            ..Self::default()
        }
    }

    /// Scan-only record: open ports and the scan log, no per-stage signals.
    pub fn scan_only(target: &str, report: ScanReport, checked_at: String) -> Self {
        Self {
            target: target.to_string(),
            checked_at,
            raw_log: report.raw_log,
            scanned_open_ports: Some(report.open_ports),
            ..Self::default()
        }
    }

    /// False only when a TLS handshake was attempted and failed.
    pub fn tls_valid(&self) -> bool {
        !self.tls.is_failed()
    }

    /// False only when the HTTP probe was attempted and failed.
    pub fn http_success(&self) -> bool {
        !self.http.is_failed()
    }

    /// Append one narrative paragraph to the raw log.
    pub(crate) fn log(&mut self, paragraph: impl AsRef<str>) {
        self.raw_log.push_str(paragraph.as_ref());
        self.raw_log.push_str("\n\n");
    }
}

/// Output of the scan-only path.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct ScanReport {
    pub open_ports: Vec<u16>,
    pub raw_log: String,
}

/// Leaf certificate details captured by a successful handshake.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CertificateInfo {
    pub issuer: String,
    pub not_before: String,
    pub not_after: String,
}

/// What the HTTP probe saw.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub server: Option<String>,
    pub title: Option<String>,
    /// Time until the response headers arrived.
    pub elapsed_ms: u64,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..400).contains(&self.status)
    }

    pub fn is_auth_failure(&self) -> bool {
        self.status == 401 || self.status == 403
    }
}
