use crate::error::ProbeError;
use crate::net;
use crate::types::CertificateInfo;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time;
use tokio_native_tls::{TlsConnector, TlsStream};
use x509_parser::prelude::*;

/// Verifying TLS handshake over an established TCP stream.
///
/// Certificate chain and hostname are checked against the system trust store.
async fn handshake(
    target: &str,
    tcp: TcpStream,
    timeout: Duration,
) -> Result<TlsStream<TcpStream>, ProbeError> {
    let connector = native_tls::TlsConnector::new()
        .map_err(|e| ProbeError::Certificate(format!("TLS setup failed: {e}")))?;
    let connector = TlsConnector::from(connector);
    match time::timeout(timeout, connector.connect(target, tcp)).await {
        Ok(Ok(stream)) => Ok(stream),
        Ok(Err(e)) => Err(ProbeError::Certificate(e.to_string())),
        Err(_) => Err(ProbeError::certificate_timeout(timeout)),
    }
}

/// Connect to `target:port`, complete a verifying handshake and read the leaf
/// certificate. Every failure, including the TCP connect, is a certificate
/// failure from the caller's point of view.
pub async fn inspect(target: &str, port: u16, timeout: Duration) -> Result<CertificateInfo, ProbeError> {
    let tcp = net::connect(target, port, timeout)
        .await
        .map_err(|e| ProbeError::Certificate(e.to_string()))?;
    let stream = handshake(target, tcp, timeout).await?;
    let cert = stream
        .get_ref()
        .peer_certificate()
        .map_err(|e| ProbeError::Certificate(e.to_string()))?
        .ok_or_else(|| ProbeError::Certificate("server presented no certificate".into()))?;
    let der = cert
        .to_der()
        .map_err(|e| ProbeError::Certificate(e.to_string()))?;
    certificate_info(&der)
}

/// Issuer and validity window of a DER-encoded certificate.
pub fn certificate_info(der: &[u8]) -> Result<CertificateInfo, ProbeError> {
    let (_, cert) = parse_x509_certificate(der)
        .map_err(|e| ProbeError::Certificate(format!("unparseable certificate: {e}")))?;
    let validity = cert.validity();
    Ok(CertificateInfo {
        issuer: cert.issuer().to_string(),
        not_before: validity.not_before.to_string(),
        not_after: validity.not_after.to_string(),
    })
}
