//! Static port tables: service names, risk annotations and candidate lists.

/// Label used when a port has no catalog entry.
pub const UNKNOWN_SERVICE: &str = "알 수 없음";

/// Deployment-specific application port (the demo server).
pub const DEMO_SERVER_PORT: u16 = 40100;

/// Ports probed by the scan-only path, in output order.
pub const SCAN_CANDIDATES: &[u16] = &[22, 80, 443, 8080, 8443, 3306, 5432, 6379, DEMO_SERVER_PORT];

/// Ports probed by the multi-port diagnosis, in output order. SSH is left out
/// because it never answers HTTP.
pub const MULTI_CANDIDATES: &[u16] = &[80, 443, 8080, 8443, 3306, 5432, 6379, DEMO_SERVER_PORT];

const DEFAULT_SECURE_PORTS: &[u16] = &[443, 8443, 9443];

/// Immutable port lookup tables.
#[derive(Debug)]
pub struct Catalog {
    services: &'static [(u16, &'static str)],
    risks: &'static [(u16, &'static str)],
}

/// The process-wide catalog.
pub static CATALOG: Catalog = Catalog {
    services: &[
        (22, "SSH"),
        (80, "HTTP"),
        (443, "HTTPS"),
        (8080, "웹서버 (개발용)"),
        (8443, "HTTPS (개발용)"),
        (3306, "MySQL"),
        (5432, "PostgreSQL"),
        (6379, "Redis"),
        (27017, "MongoDB"),
        (5000, "Flask"),
        (8000, "Django"),
        (DEMO_SERVER_PORT, "데모 서버"),
    ],
    risks: &[
        (23, "Telnet (암호화되지 않음)"),
        (21, "FTP (암호화되지 않음)"),
        (445, "SMB (랜섬웨어 공격 대상)"),
        (3389, "RDP (원격 데스크탑, 외부 노출 위험)"),
        (6379, "Redis (인증 없이 접근 가능)"),
        (27017, "MongoDB (기본 설정 시 외부 노출 위험)"),
    ],
};

impl Catalog {
    pub fn service_name(&self, port: u16) -> Option<&'static str> {
        lookup(self.services, port)
    }

    /// Service name, or [`UNKNOWN_SERVICE`] for unmapped ports.
    pub fn service_label(&self, port: u16) -> &'static str {
        self.service_name(port).unwrap_or(UNKNOWN_SERVICE)
    }

    pub fn risk(&self, port: u16) -> Option<&'static str> {
        lookup(self.risks, port)
    }

    /// Full warning attached to an open risky port.
    pub fn risk_warning(&self, port: u16) -> Option<String> {
        self.risk(port).map(|desc| {
            format!(
                "⚠️ 보안 경고: {desc} 포트가 열려 있습니다. 외부 노출 시 보안 취약점이 발생할 수 있습니다."
            )
        })
    }

    pub fn services(&self) -> &'static [(u16, &'static str)] {
        self.services
    }

    pub fn risks(&self) -> &'static [(u16, &'static str)] {
        self.risks
    }
}

/// 443, 8443 and 9443 always count as TLS ports.
pub fn is_default_secure_port(port: u16) -> bool {
    DEFAULT_SECURE_PORTS.contains(&port)
}

fn lookup(table: &'static [(u16, &'static str)], port: u16) -> Option<&'static str> {
    table.iter().find(|(p, _)| *p == port).map(|(_, v)| *v)
}
