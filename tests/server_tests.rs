use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tower::ServiceExt;

use reach_diag::catalog::MULTI_CANDIDATES;
use reach_diag::config::ProbeConfig;
use reach_diag::server::{router, AppState};
use reach_diag::settings::{NoopLauncher, SettingsLauncher};
use reach_diag::Diagnoser;

#[derive(Default)]
struct CountingLauncher {
    network: AtomicUsize,
    port: AtomicUsize,
}

impl SettingsLauncher for CountingLauncher {
    fn open_network_settings(&self) {
        self.network.fetch_add(1, Ordering::Relaxed);
    }

    fn open_port_settings(&self) {
        self.port.fetch_add(1, Ordering::Relaxed);
    }
}

fn test_state() -> AppState {
    AppState::new(Diagnoser::new(ProbeConfig::default()), Arc::new(NoopLauncher))
}

fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(resp: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn catalog_lists_services_and_risks() {
    let app = router(test_state());
    let resp = app
        .oneshot(Request::get("/api/catalog").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;
    let risks = json["risks"].as_array().unwrap();
    assert_eq!(risks.len(), 6);
    assert!(json["services"]
        .as_array()
        .unwrap()
        .iter()
        .any(|s| s["port"] == 5432 && s["label"] == "PostgreSQL"));
}

#[tokio::test]
async fn empty_target_is_bad_request() {
    for uri in ["/api/diagnose", "/api/scan", "/api/diagnose-multi"] {
        let app = router(test_state());
        let resp = app.oneshot(post_json(uri, r#"{"target":"  "}"#)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{uri}");
        let json = body_json(resp).await;
        assert_eq!(json["error"], "bad_request");
    }
}

#[tokio::test]
async fn settings_endpoints_call_the_launcher() {
    let launcher = Arc::new(CountingLauncher::default());
    let state = AppState::new(Diagnoser::default(), launcher.clone());

    let resp = router(state.clone())
        .oneshot(post_json("/api/open-network-settings", ""))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = router(state)
        .oneshot(post_json("/api/open-port-settings", ""))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    assert_eq!(launcher.network.load(Ordering::Relaxed), 1);
    assert_eq!(launcher.port.load(Ordering::Relaxed), 1);
}

#[tokio::test]
async fn scan_returns_scan_only_record() {
    let cfg = ProbeConfig {
        scan_timeout_ms: 50,
        ..ProbeConfig::default()
    };
    let state = AppState::new(Diagnoser::new(cfg), Arc::new(NoopLauncher));
    let resp = router(state)
        .oneshot(post_json("/api/scan", r#"{"target":"127.0.0.1"}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;
    assert_eq!(json["target"], "127.0.0.1");
    assert!(json["scanned_open_ports"].is_array());
    assert!(json["raw_log"].as_str().unwrap().starts_with("🔍 포트 스캔 결과:"));
}

/// Slow HTTP server on the first multi-port candidate that is free locally.
async fn slow_candidate_fixture() -> Option<u16> {
    for &port in MULTI_CANDIDATES.iter().rev() {
        let Ok(listener) = TcpListener::bind(("127.0.0.1", port)).await else {
            continue;
        };
        tokio::spawn(async move {
            loop {
                let Ok((mut sock, _)) = listener.accept().await else {
                    return;
                };
                tokio::spawn(async move {
                    let mut buf = [0u8; 2048];
                    if let Ok(n) = sock.read(&mut buf).await {
                        if n > 0 {
                            tokio::time::sleep(Duration::from_millis(600)).await;
                            let _ = sock
                                .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\nConnection: close\r\n\r\n")
                                .await;
                        }
                    }
                });
            }
        });
        return Some(port);
    }
    None
}

#[tokio::test]
async fn concurrent_multi_runs_both_complete() {
    let Some(port) = slow_candidate_fixture().await else {
        return;
    };
    let cfg = ProbeConfig {
        connect_timeout_ms: 1_000,
        tls_timeout_ms: 1_000,
        http_timeout_ms: 3_000,
        scan_timeout_ms: 200,
        ping_attempts: 1,
        ping_timeout_ms: 200,
        ..ProbeConfig::default()
    };
    let state = AppState::new(Diagnoser::new(cfg), Arc::new(NoopLauncher));

    let first = router(state.clone()).oneshot(post_json("/api/diagnose-multi", r#"{"target":"127.0.0.1"}"#));
    let second = async {
        tokio::time::sleep(Duration::from_millis(200)).await;
        router(state.clone())
            .oneshot(post_json("/api/diagnose-multi", r#"{"target":" 127.0.0.1 "}"#))
            .await
    };
    let (first, second) = tokio::join!(first, second);

    for resp in [first.unwrap(), second.unwrap()] {
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        let ports: Vec<u64> = json["results"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["port"].as_u64().unwrap())
            .collect();
        assert!(ports.contains(&(port as u64)), "{} missing {port}: {ports:?}", json["target"]);
    }
}
