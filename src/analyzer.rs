//! Rule-based diagnosis: turns the signals of a finished probe into a
//! status / evidence / cause / remediation narrative.

use crate::types::{ProbeResult, StageOutcome};
use std::fmt::Write;

/// Response time above which the success narrative warns about latency.
pub const SLOW_RESPONSE_MS: u64 = 2_000;

pub const SUCCESS_HEADLINE: &str = "✅ 접속 성공";
pub const FAILURE_HEADLINE: &str = "❌ 접속 실패";

/// Build the analysis summary for `result`.
///
/// Pure: the output depends only on the arguments.
pub fn analyze(result: &ProbeResult, target: &str, port: u16) -> String {
    let mut out = String::new();
    if result.port_open && result.http_success() {
        write_connected(&mut out, result, target, port);
    } else {
        write_not_connected(&mut out, result, target, port);
    }
    out
}

fn write_connected(out: &mut String, r: &ProbeResult, target: &str, port: u16) {
    let _ = writeln!(out, "{SUCCESS_HEADLINE}: {target}:{port}\n");
    out.push_str("→ 분석 결과:\n");
    checklist_dns_ping_port(out, r, port);
    match r.tls {
        StageOutcome::Passed => out.push_str("  [✓] SSL 인증서 유효\n"),
        StageOutcome::Failed => out.push_str("  [✗] SSL 인증서 오류\n"),
        StageOutcome::NotAttempted => {}
    }
    match r.http {
        StageOutcome::Passed => out.push_str("  [✓] HTTP 응답 정상\n"),
        StageOutcome::NotAttempted => out.push_str("  [-] HTTP 검사 안 함\n"),
        StageOutcome::Failed => {}
    }
    out.push('\n');

    let _ = writeln!(
        out,
        "🖥 서버 종류: {}",
        r.server_banner.as_deref().unwrap_or("알 수 없음")
    );
    let _ = writeln!(out, "📄 페이지 제목: {}", r.page_title.as_deref().unwrap_or("없음"));
    match r.response_time_millis {
        Some(ms) => {
            let _ = writeln!(out, "⏱ 응답 속도: {ms}ms");
            if ms > SLOW_RESPONSE_MS {
                out.push_str("⚠️ 응답 지연: 서버 부하 또는 네트워크 병목 가능성\n");
            }
        }
        None => out.push_str("⏱ 응답 속도: 측정 안 됨\n"),
    }
}

fn write_not_connected(out: &mut String, r: &ProbeResult, target: &str, port: u16) {
    let ssl_broken = r.tls.is_failed() && port == 443;
    let http_broken = r.port_open && !r.http_success();

    let _ = writeln!(out, "{FAILURE_HEADLINE}: {target}:{port}\n");
    out.push_str("→ 원인 추정:\n");
    checklist_dns_ping_port(out, r, port);
    if http_broken {
        if r.auth_failed {
            let code = r.http_status_code.unwrap_or_default();
            let _ = writeln!(out, "  [✗] HTTP 응답 코드 {code} → 인증 실패");
        } else {
            out.push_str("  [✗] HTTP 응답 없음 → 서비스 미기동 또는 인증 실패 가능\n");
        }
    }
    if ssl_broken {
        out.push_str("  [✗] SSL 인증서 오류 → HTTPS 접속 불가\n");
    }

    out.push_str("\n⮕ 가능성 있는 원인:\n");
    if let Some(cause) = root_cause(r) {
        let _ = writeln!(out, "  - {cause}");
    }
    if ssl_broken {
        out.push_str("  - SSL 인증서가 만료되었거나 누락됐을 수 있습니다.\n");
    }

    out.push_str("\n🛠 해결 가이드:\n");
    if !r.port_open {
        out.push_str("  - 서버의 nginx/apache가 실행 중인지 확인하세요.\n");
        out.push_str("  - 방화벽(inbound rules)을 열어주세요.\n");
    }
    if ssl_broken {
        out.push_str("  - SSL 인증서를 갱신하거나 설치하세요.\n");
        out.push_str("  - HTTPS 설정이 웹 서버에 적용되어 있는지 확인하세요.\n");
    }
    if http_broken {
        out.push_str("  - 인증이 필요한 서비스인지 확인하세요.\n");
        out.push_str("  - HTTP 응답 코드 및 로그를 확인하세요.\n");
    }
}

fn checklist_dns_ping_port(out: &mut String, r: &ProbeResult, port: u16) {
    out.push_str(if r.dns_resolved {
        "  [✓] DNS 해석 성공\n"
    } else {
        "  [✗] DNS 해석 실패\n"
    });
    out.push_str(if r.ping_reachable {
        "  [✓] Ping 응답 OK\n"
    } else {
        "  [✗] Ping 실패\n"
    });
    if r.port_open {
        let _ = writeln!(out, "  [✓] 포트 {port} 열림");
    } else {
        let _ = writeln!(out, "  [✗] 포트 {port} 닫힘");
    }
}

/// First matching cause in priority order: DNS, ping, port, HTTP.
fn root_cause(r: &ProbeResult) -> Option<&'static str> {
    if !r.dns_resolved {
        Some("도메인 이름이 잘못되었거나 DNS 서버에 등록되지 않았습니다. (DNS 해석 실패)")
    } else if !r.ping_reachable {
        Some("서버가 꺼져 있거나 방화벽에 의해 ICMP가 차단됐을 수 있습니다.")
    } else if !r.port_open {
        Some("해당 포트에 서비스가 열려 있지 않거나 방화벽에 의해 차단됐을 수 있습니다.")
    } else if !r.http_success() {
        Some("웹 서버가 미기동 중이거나 인증 실패로 응답이 거부됐을 수 있습니다.")
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn healthy(port: u16) -> ProbeResult {
        ProbeResult {
            port,
            dns_resolved: true,
            ping_reachable: true,
            port_open: true,
            http: StageOutcome::Passed,
            http_status_code: Some(200),
            response_time_millis: Some(120),
            ..ProbeResult::default()
        }
    }

    fn cause_section(summary: &str) -> &str {
        let start = summary.find("가능성 있는 원인").expect("cause section");
        let end = summary.find("해결 가이드").expect("remediation section");
        &summary[start..end]
    }

    #[test]
    fn connected_narrative() {
        let mut r = healthy(80);
        r.server_banner = Some("nginx".into());
        let s = analyze(&r, "example.com", 80);
        assert!(s.starts_with("✅ 접속 성공: example.com:80"));
        assert!(s.contains("🖥 서버 종류: nginx"));
        assert!(s.contains("📄 페이지 제목: 없음"));
        assert!(s.contains("⏱ 응답 속도: 120ms"));
        assert!(!s.contains("응답 지연"));
        assert!(!s.contains("접속 실패"));
    }

    #[test]
    fn slow_response_warns() {
        let mut r = healthy(80);
        r.response_time_millis = Some(2_001);
        assert!(analyze(&r, "h", 80).contains("⚠️ 응답 지연"));
        r.response_time_millis = Some(2_000);
        assert!(!analyze(&r, "h", 80).contains("⚠️ 응답 지연"));
    }

    #[test]
    fn skipped_http_is_reported_as_not_checked() {
        let mut r = healthy(80);
        r.http = StageOutcome::NotAttempted;
        let s = analyze(&r, "h", 80);
        assert!(s.contains("접속 성공"));
        assert!(s.contains("[-] HTTP 검사 안 함"));
        assert!(!s.contains("HTTP 응답 정상"));
    }

    #[test]
    fn dns_failure_always_leads() {
        for port_open in [false, true] {
            for ping in [false, true] {
                let r = ProbeResult {
                    dns_resolved: false,
                    ping_reachable: ping,
                    port_open,
                    http: StageOutcome::Failed,
                    tls: StageOutcome::Failed,
                    ..ProbeResult::default()
                };
                let s = analyze(&r, "nowhere.invalid", 443);
                assert!(s.contains(FAILURE_HEADLINE));
                let causes = cause_section(&s);
                let first = causes.lines().nth(1).unwrap();
                assert!(first.contains("DNS 해석 실패"), "{first}");
            }
        }
    }

    #[test]
    fn ping_then_port_then_http_priority() {
        let mut r = ProbeResult {
            dns_resolved: true,
            ping_reachable: false,
            http: StageOutcome::Failed,
            ..ProbeResult::default()
        };
        assert!(cause_section(&analyze(&r, "h", 80)).contains("ICMP"));
        r.ping_reachable = true;
        assert!(cause_section(&analyze(&r, "h", 80)).contains("포트에 서비스가 열려 있지 않거나"));
        r.port_open = true;
        assert!(cause_section(&analyze(&r, "h", 80)).contains("웹 서버가 미기동"));
    }

    #[test]
    fn ssl_lines_only_on_443() {
        let mut r = healthy(443);
        r.http = StageOutcome::Failed;
        r.tls = StageOutcome::Failed;
        let s = analyze(&r, "h", 443);
        assert!(s.contains("SSL 인증서 오류 → HTTPS 접속 불가"));
        assert!(s.contains("SSL 인증서가 만료되었거나"));
        assert!(s.contains("SSL 인증서를 갱신하거나"));

        r.port = 8443;
        let s = analyze(&r, "h", 8443);
        assert!(!s.contains("SSL 인증서가 만료되었거나"));
        assert!(!s.contains("SSL 인증서를 갱신하거나"));
    }

    #[test]
    fn remediation_blocks_are_additive() {
        let mut r = healthy(443);
        r.http = StageOutcome::Failed;
        r.tls = StageOutcome::Failed;
        let s = analyze(&r, "h", 443);
        let guide = &s[s.find("해결 가이드").unwrap()..];
        let ssl = guide.find("SSL 인증서를 갱신").unwrap();
        let auth = guide.find("인증이 필요한 서비스").unwrap();
        assert!(ssl < auth);
        assert!(!guide.contains("nginx/apache"));
    }

    #[test]
    fn closed_port_remediation() {
        let r = ProbeResult {
            dns_resolved: true,
            ping_reachable: true,
            http: StageOutcome::Failed,
            ..ProbeResult::default()
        };
        let s = analyze(&r, "h", 5432);
        assert!(s.contains("[✗] 포트 5432 닫힘"));
        assert!(s.contains("nginx/apache"));
        assert!(!s.contains("HTTP 응답 없음"));
        assert!(!s.contains("인증이 필요한 서비스"));
    }

    #[test]
    fn auth_failure_names_the_status() {
        let mut r = healthy(80);
        r.http = StageOutcome::Failed;
        r.auth_failed = true;
        r.http_status_code = Some(401);
        let s = analyze(&r, "h", 80);
        assert!(s.contains("[✗] HTTP 응답 코드 401 → 인증 실패"));
    }

    #[test]
    fn deterministic() {
        let mut r = healthy(443);
        r.tls = StageOutcome::Failed;
        r.http = StageOutcome::Failed;
        assert_eq!(analyze(&r, "h", 443), analyze(&r.clone(), "h", 443));
    }
}
