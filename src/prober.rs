//! The single-target pipeline: DNS → ping → TCP → TLS → HTTP → risk → analysis.
//!
//! Network probing and recording are split. Each `record_*` function takes the
//! result built so far plus the signal its probe produced and returns the
//! result with that stage's fields filled in. They never touch fields owned by
//! another stage, so any prefix of the pipeline can be replayed in tests
//! without a network.

use crate::analyzer;
use crate::catalog::{Catalog, CATALOG, MULTI_CANDIDATES, SCAN_CANDIDATES};
use crate::config::ProbeConfig;
use crate::error::ProbeError;
use crate::hints;
use crate::ping::{self, PingReport};
use crate::scanner;
use crate::types::{CertificateInfo, HttpResponse, ProbeResult, ScanReport, StageOutcome};
use crate::{http, net, tls};
use ::time::{format_description::well_known, OffsetDateTime};
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info_span, Instrument};

/// Entry point for all diagnoses. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Diagnoser {
    config: Arc<ProbeConfig>,
    catalog: &'static Catalog,
}

impl Default for Diagnoser {
    fn default() -> Self {
        Self::new(ProbeConfig::default())
    }
}

impl Diagnoser {
    pub fn new(config: ProbeConfig) -> Self {
        Self {
            config: Arc::new(config),
            catalog: &CATALOG,
        }
    }

    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    pub fn catalog(&self) -> &'static Catalog {
        self.catalog
    }

    /// Run the full pipeline against `target:port`. Never fails: every stage
    /// failure ends up as flags and narrative on the returned result.
    pub async fn diagnose(&self, target: &str, port: u16) -> ProbeResult {
        let span = info_span!("diagnose", host = target, port);
        self.run_pipeline(target, port).instrument(span).await
    }

    async fn run_pipeline(&self, target: &str, port: u16) -> ProbeResult {
        let cfg = &*self.config;
        let res = ProbeResult::new(target, port, self.catalog.service_label(port), now_iso_like());

        let dns = net::resolve(target, cfg.connect_timeout()).await;
        debug!(ok = dns.is_ok(), "dns stage finished");
        let res = record_dns(res, dns);

        let echo = ping::ping(
            target,
            cfg.ping_attempts,
            cfg.ping_timeout(),
            cfg.ping_stage_timeout(),
        )
        .await;
        debug!(ok = echo.as_ref().map(PingReport::reachable).unwrap_or(false), "ping stage finished");
        let res = record_ping(res, echo);

        let tcp = net::check_port(target, port, cfg.connect_timeout()).await;
        debug!(ok = tcp.is_ok(), "tcp stage finished");
        let res = record_connect(res, tcp);

        let secure = cfg.is_secure_port(port);
        let res = if secure {
            let cert = tls::inspect(target, port, cfg.tls_timeout()).await;
            debug!(ok = cert.is_ok(), "tls stage finished");
            record_tls(res, cert)
        } else {
            res
        };

        let reply = http::get_root(target, port, secure, cfg.http_timeout(), &cfg.user_agent).await;
        debug!(ok = reply.as_ref().map(HttpResponse::is_success).unwrap_or(false), "http stage finished");
        let res = record_http(res, reply);

        let res = annotate_risk(res, self.catalog);
        finish(res)
    }

    /// Which of the scan candidates accept a TCP connection.
    pub async fn scan(&self, target: &str) -> ScanReport {
        scanner::scan(
            target,
            SCAN_CANDIDATES,
            self.config.scan_timeout(),
            self.config.workers,
        )
        .instrument(info_span!("scan", host = target))
        .await
    }

    /// Full diagnosis of every multi-port candidate that is reachable.
    pub async fn diagnose_all(&self, target: &str) -> Vec<ProbeResult> {
        self.diagnose_all_with_cancel(target, CancellationToken::new())
            .await
    }

    /// Variant of [`Diagnoser::diagnose_all`] that stops early once `cancel` fires.
    pub async fn diagnose_all_with_cancel(
        &self,
        target: &str,
        cancel: CancellationToken,
    ) -> Vec<ProbeResult> {
        scanner::probe_all(self, target, MULTI_CANDIDATES, cancel)
            .instrument(info_span!("diagnose_all", host = target))
            .await
    }
}

pub fn record_dns(mut res: ProbeResult, outcome: Result<IpAddr, ProbeError>) -> ProbeResult {
    match outcome {
        Ok(addr) => {
            res.dns_resolved = true;
            res.resolved_address = Some(addr.to_string());
            res.log(format!("✅ DNS 해석 성공: {addr}"));
        }
        Err(e) => {
            res.dns_resolved = false;
            res.log(format!("❌ DNS 해석 실패: {e}"));
        }
    }
    res
}

pub fn record_ping(mut res: ProbeResult, outcome: Result<PingReport, ProbeError>) -> ProbeResult {
    match outcome {
        Ok(report) if report.reachable() => {
            res.ping_reachable = true;
            res.ping_replies = report.received;
            res.log(format!("📡 Ping 응답 OK: {}/{} 수신", report.received, report.sent));
        }
        Ok(report) => {
            res.ping_reachable = false;
            res.log(format!("❌ Ping 실패: {}/{} 수신 (응답 없음)", report.received, report.sent));
        }
        Err(e) => {
            res.ping_reachable = false;
            res.log(format!("❌ Ping 실패: {e}"));
        }
    }
    res
}

/// A failed connect also picks the closed-port remediation hint.
pub fn record_connect(mut res: ProbeResult, outcome: Result<Duration, ProbeError>) -> ProbeResult {
    let port = res.port;
    match outcome {
        Ok(_) => {
            res.port_open = true;
            res.log(format!("🔓 포트 {port} 열림"));
        }
        Err(e) => {
            res.port_open = false;
            res.log(format!("🔒 포트 {port} 닫힘: {e}"));
            res.resolution_hint = Some(hints::hint(port, false, false, false).to_string());
        }
    }
    res
}

pub fn record_tls(mut res: ProbeResult, outcome: Result<CertificateInfo, ProbeError>) -> ProbeResult {
    match outcome {
        Ok(cert) => {
            res.tls = StageOutcome::Passed;
            res.log(format!(
                "🔐 SSL 인증서 유효\n   - 발급자: {}\n   - 유효기간: {} ~ {}",
                cert.issuer, cert.not_before, cert.not_after
            ));
            res.tls_issuer = Some(cert.issuer);
            res.tls_not_before = Some(cert.not_before);
            res.tls_not_after = Some(cert.not_after);
        }
        Err(e) => {
            res.tls = StageOutcome::Failed;
            if res.target.parse::<IpAddr>().is_ok() {
                // Hostname verification needs the IP in the certificate's SAN list
                res.log(format!(
                    "❌ SSL 인증서 오류: {e}\n   - IP 주소로 접속하여 인증서의 호스트 이름과 일치하지 않을 수 있습니다. 도메인 이름으로 다시 시도해 보세요."
                ));
            } else {
                res.log(format!("❌ SSL 인증서 오류: {e}"));
            }
        }
    }
    res
}

/// A transport failure on an open port overrides the hint with the
/// open-port remediation; a closed port keeps its closed-port hint.
/// A port counts as secure here when the TLS stage ran for it.
pub fn record_http(mut res: ProbeResult, outcome: Result<HttpResponse, ProbeError>) -> ProbeResult {
    match outcome {
        Ok(resp) => {
            res.http = StageOutcome::from_success(resp.is_success());
            res.auth_failed = resp.is_auth_failure();
            res.http_status_code = Some(resp.status);
            res.response_time_millis = Some(resp.elapsed_ms);
            res.log(format!(
                "🌐 HTTP 응답 코드: {}\n🖥 서버 종류: {}\n📄 페이지 제목: {}\n⏱ 응답 속도: {}ms",
                resp.status,
                resp.server.as_deref().unwrap_or("알 수 없음"),
                resp.title.as_deref().unwrap_or("없음"),
                resp.elapsed_ms
            ));
            res.server_banner = resp.server;
            res.page_title = resp.title;
        }
        Err(e) => {
            res.http = StageOutcome::Failed;
            res.server_banner = None;
            res.log(format!("❌ HTTP 요청 실패: {e}"));
            if res.port_open {
                let secure = res.tls.was_attempted();
                res.resolution_hint = Some(hints::hint(res.port, true, false, secure).to_string());
            }
        }
    }
    res
}

pub fn annotate_risk(mut res: ProbeResult, catalog: &Catalog) -> ProbeResult {
    if res.port_open {
        if let Some(warning) = catalog.risk_warning(res.port) {
            res.log(&warning);
            res.risk_hint = Some(warning);
        }
    }
    res
}

/// Attach the analysis summary. Last step of every diagnosis.
pub fn finish(mut res: ProbeResult) -> ProbeResult {
    res.analysis_summary = analyzer::analyze(&res, &res.target, res.port);
    res
}

pub(crate) fn now_iso_like() -> String {
    let now = OffsetDateTime::now_utc();
    now.format(&well_known::Rfc3339)
        .unwrap_or_else(|_| String::from("1970-01-01T00:00:00Z"))
}
