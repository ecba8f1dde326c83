//! Remediation hints keyed on port and failure context.

use crate::catalog::DEMO_SERVER_PORT;

pub const GENERIC_CLOSED_HINT: &str = "🚫 포트가 닫혀 있습니다. 서버 애플리케이션이 실행 중인지, 방화벽이나 보안 그룹에서 해당 포트가 허용되어 있는지 확인하세요.";

pub const GENERIC_NO_RESPONSE_HINT: &str = "🚫 HTTP 응답 없음: 해당 포트에서 웹 애플리케이션이 정상적으로 실행 중인지 확인하고, 방화벽 및 라우팅 설정을 점검하세요.";

pub const HTTPS_NO_RESPONSE_HINT: &str = "🔐 HTTPS 응답 없음: SSL 인증서가 올바르게 설치되어 있는지 확인하고, 웹 서버 설정을 점검하세요.";

/// Pick the remediation text for `port`.
///
/// `secure` is true for any port probed over TLS, including configured extras.
/// `tls_issue` swaps the HTTPS hint for the port table.
pub fn hint(port: u16, port_open: bool, tls_issue: bool, secure: bool) -> &'static str {
    if !port_open {
        return closed_port_hint(port);
    }
    if secure && !tls_issue {
        return HTTPS_NO_RESPONSE_HINT;
    }
    match port {
        80 => "🌐 HTTP 응답 없음: 웹 서버가 실행 중인지 확인하고, index.html 또는 라우팅 설정을 점검하세요.",
        8080 | 8443 => "🧪 개발용 웹 포트 응답 없음: 백엔드 애플리케이션(Spring, Node 등)이 실행 중인지 확인하세요.",
        3306 => "🗄 DB 응답 없음: MySQL이 실행 중인지, 외부 접속이 허용되어 있는지 확인하세요.",
        _ => GENERIC_NO_RESPONSE_HINT,
    }
}

fn closed_port_hint(port: u16) -> &'static str {
    match port {
        22 => "🔧 SSH 접속 실패: sshd 서비스가 실행 중인지 확인하고, 방화벽에서 22번 포트를 허용하세요.",
        80 => "🌐 웹 서버 접속 실패: Apache/Nginx가 실행 중인지 확인하고, 방화벽에서 80번 포트를 열어주세요.",
        443 => "🔐 HTTPS 접속 실패: SSL 인증서 설치 여부와 443번 포트 방화벽 설정을 확인하세요.",
        3306 => "🗄 MySQL 접속 실패: 외부 접속 허용 여부와 3306번 포트 방화벽 설정을 확인하세요.",
        5432 => "🗄 PostgreSQL 접속 실패: pg_hba.conf 설정과 방화벽을 확인하세요.",
        6379 => "⚠️ Redis 접속 실패: redis.conf에서 bind 설정과 requirepass 여부를 확인하고, 6379번 포트를 허용하세요.",
        DEMO_SERVER_PORT => "🧪 데모 서버 접속 실패: 해당 포트가 방화벽에서 허용되어 있는지 확인하고, 서버 애플리케이션이 실행 중인지 확인하세요.",
        _ => GENERIC_CLOSED_HINT,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closed_ports_use_their_own_text() {
        assert!(hint(22, false, false, false).contains("sshd"));
        assert!(hint(5432, false, false, false).contains("pg_hba.conf"));
        assert!(hint(6379, false, true, false).contains("requirepass"));
        assert!(hint(40100, false, false, false).contains("데모 서버"));
        assert!(hint(443, false, false, true).contains("443번 포트"));
    }

    #[test]
    fn closed_unmapped_port_is_generic() {
        assert_eq!(hint(12345, false, false, false), GENERIC_CLOSED_HINT);
        // 8080 only has an open-port entry
        assert_eq!(hint(8080, false, false, false), GENERIC_CLOSED_HINT);
        assert_eq!(hint(12345, false, false, true), GENERIC_CLOSED_HINT);
    }

    #[test]
    fn open_secure_port_without_tls_issue() {
        assert_eq!(hint(443, true, false, true), HTTPS_NO_RESPONSE_HINT);
        assert_eq!(hint(9443, true, false, true), HTTPS_NO_RESPONSE_HINT);
        assert_eq!(hint(8443, true, false, true), HTTPS_NO_RESPONSE_HINT);
    }

    #[test]
    fn configured_secure_port_gets_https_hint() {
        assert_eq!(hint(10443, true, false, true), HTTPS_NO_RESPONSE_HINT);
        assert_eq!(hint(10443, true, false, false), GENERIC_NO_RESPONSE_HINT);
    }

    #[test]
    fn open_port_table() {
        assert!(hint(80, true, false, false).contains("index.html"));
        assert!(hint(8443, true, true, true).contains("개발용"));
        assert!(hint(8080, true, false, false).contains("개발용"));
        assert!(hint(3306, true, false, false).contains("MySQL"));
        assert_eq!(hint(443, true, true, true), GENERIC_NO_RESPONSE_HINT);
        assert_eq!(hint(5000, true, false, false), GENERIC_NO_RESPONSE_HINT);
    }
}
