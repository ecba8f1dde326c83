use std::time::Duration;

/// Failure of a single network probe.
///
/// Every variant is recovered by the stage that produced it; none of them
/// escape the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProbeError {
    #[error("{0}")]
    Resolution(String),
    #[error("{0}")]
    Unreachable(String),
    #[error("{0}")]
    Connect(String),
    #[error("{0}")]
    Certificate(String),
    #[error("{0}")]
    HttpTransport(String),
}

impl ProbeError {
    pub fn resolution_timeout(after: Duration) -> Self {
        Self::Resolution(timed_out(after))
    }

    pub fn unreachable_timeout(after: Duration) -> Self {
        Self::Unreachable(timed_out(after))
    }

    pub fn connect_timeout(after: Duration) -> Self {
        Self::Connect(timed_out(after))
    }

    pub fn certificate_timeout(after: Duration) -> Self {
        Self::Certificate(timed_out(after))
    }

    pub fn http_timeout(after: Duration) -> Self {
        Self::HttpTransport(timed_out(after))
    }
}

fn timed_out(after: Duration) -> String {
    format!("timed out after {}ms", after.as_millis())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_the_bare_detail() {
        let e = ProbeError::Connect("connection refused".into());
        assert_eq!(e.to_string(), "connection refused");
    }

    #[test]
    fn timeouts_keep_their_stage() {
        let e = ProbeError::http_timeout(Duration::from_millis(5000));
        assert_eq!(e, ProbeError::HttpTransport("timed out after 5000ms".into()));
    }
}
