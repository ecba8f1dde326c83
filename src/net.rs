use crate::error::ProbeError;
use std::net::IpAddr;
use std::time::Duration;
use tokio::net::{lookup_host, TcpStream};
use tokio::time::{self, Instant};

/// Resolve `target` to its first address. IP literals resolve to themselves.
pub async fn resolve(target: &str, timeout: Duration) -> Result<IpAddr, ProbeError> {
    if let Ok(ip) = target.parse::<IpAddr>() {
        return Ok(ip);
    }
    match time::timeout(timeout, lookup_host((target, 0))).await {
        Ok(Ok(mut addrs)) => addrs
            .next()
            .map(|a| a.ip())
            .ok_or_else(|| ProbeError::Resolution(format!("no addresses found for {target}"))),
        Ok(Err(e)) => Err(ProbeError::Resolution(e.to_string())),
        Err(_) => Err(ProbeError::resolution_timeout(timeout)),
    }
}

/// Open a TCP connection to `target:port` within `timeout`.
pub async fn connect(target: &str, port: u16, timeout: Duration) -> Result<TcpStream, ProbeError> {
    match time::timeout(timeout, TcpStream::connect((target, port))).await {
        Ok(Ok(stream)) => Ok(stream),
        Ok(Err(e)) => Err(ProbeError::Connect(e.to_string())),
        Err(_) => Err(ProbeError::connect_timeout(timeout)),
    }
}

/// Connect and immediately drop the stream, returning the connect latency.
pub async fn check_port(target: &str, port: u16, timeout: Duration) -> Result<Duration, ProbeError> {
    let start = Instant::now();
    connect(target, port, timeout).await?;
    Ok(start.elapsed())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn ip_literal_resolves_without_lookup() {
        let ip = resolve("127.0.0.1", Duration::from_millis(50)).await.unwrap();
        assert_eq!(ip, IpAddr::from([127, 0, 0, 1]));
    }

    #[tokio::test]
    async fn invalid_name_is_resolution_error() {
        let err = resolve("no such host.invalid", Duration::from_secs(5)).await.unwrap_err();
        assert!(matches!(err, ProbeError::Resolution(_)));
    }

    #[tokio::test]
    async fn open_and_closed_ports() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        assert!(check_port("127.0.0.1", port, Duration::from_secs(1)).await.is_ok());

        drop(listener);
        let err = check_port("127.0.0.1", port, Duration::from_secs(1)).await.unwrap_err();
        assert!(matches!(err, ProbeError::Connect(_)));
    }
}
