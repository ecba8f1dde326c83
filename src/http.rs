//! `GET /` probe over http or https, built on `reqwest`.

use crate::error::ProbeError;
use crate::types::HttpResponse;
use reqwest::{header, redirect, Client, Response};
use std::error::Error as _;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Body bytes read while looking for the page title.
const MAX_BODY_BYTES: usize = 64 * 1024;

/// `http(s)://host:port/`, with IPv6 literals bracketed.
pub fn root_url(target: &str, port: u16, secure: bool) -> String {
    let scheme = if secure { "https" } else { "http" };
    if target.contains(':') {
        format!("{scheme}://[{target}]:{port}/")
    } else {
        format!("{scheme}://{target}:{port}/")
    }
}

/// Issue `GET /` to `target:port`, over https when `secure`.
///
/// `timeout` bounds the connect and the whole exchange. The elapsed time stops
/// when the response headers arrive; the body is only read for its title.
/// Redirects are reported as-is rather than followed.
pub async fn get_root(
    target: &str,
    port: u16,
    secure: bool,
    timeout: Duration,
    user_agent: &str,
) -> Result<HttpResponse, ProbeError> {
    let client = Client::builder()
        .connect_timeout(timeout)
        .timeout(timeout)
        .user_agent(user_agent)
        .redirect(redirect::Policy::none())
        .build()
        .map_err(|e| ProbeError::HttpTransport(format!("HTTP client setup failed: {e}")))?;

    let start = Instant::now();
    let mut resp = client
        .get(root_url(target, port, secure))
        .send()
        .await
        .map_err(|e| transport_error(e, timeout))?;
    let elapsed_ms = start.elapsed().as_millis() as u64;

    let status = resp.status().as_u16();
    let server = resp
        .headers()
        .get(header::SERVER)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());
    let title = read_title(&mut resp).await;

    Ok(HttpResponse {
        status,
        server,
        title,
        elapsed_ms,
    })
}

async fn read_title(resp: &mut Response) -> Option<String> {
    let mut body = Vec::new();
    while body.len() < MAX_BODY_BYTES {
        match resp.chunk().await {
            Ok(Some(chunk)) => body.extend_from_slice(&chunk),
            Ok(None) => break,
            Err(e) => {
                debug!(error = %e, "stopped reading response body");
                break;
            }
        }
    }
    extract_title(&String::from_utf8_lossy(&body))
}

fn transport_error(err: reqwest::Error, timeout: Duration) -> ProbeError {
    if err.is_timeout() {
        return ProbeError::http_timeout(timeout);
    }
    // reqwest's Display omits the underlying cause
    let mut msg = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        msg.push_str(": ");
        msg.push_str(&cause.to_string());
        source = cause.source();
    }
    ProbeError::HttpTransport(msg)
}

/// Text of the first `<title>` element, whitespace-collapsed.
pub fn extract_title(body: &str) -> Option<String> {
    let lower = body.to_ascii_lowercase();
    let open = lower.find("<title")?;
    let content_start = open + lower[open..].find('>')? + 1;
    let content_end = content_start + lower[content_start..].find("</title")?;
    let title = body[content_start..content_end]
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    if title.is_empty() {
        None
    } else {
        Some(title)
    }
}
