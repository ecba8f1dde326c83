use crate::net;
use crate::prober::Diagnoser;
use crate::types::{ProbeResult, ScanReport};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

const MAX_WORKERS: usize = 256;

/// Probe each candidate port with a short TCP connect and report the open ones.
///
/// - Limits concurrent connects using a `Semaphore`.
/// - Failures of any kind count as closed; nothing is retried.
/// - Output follows the order of `candidates`, not connect latency.
pub async fn scan(target: &str, candidates: &[u16], timeout: Duration, workers: usize) -> ScanReport {
    let host: Arc<str> = Arc::from(target);
    let states = run_pool(candidates, workers, &CancellationToken::new(), move |port| {
        let host = host.clone();
        async move { net::check_port(&host, port, timeout).await.is_ok() }
    })
    .await;

    let mut report = ScanReport {
        open_ports: Vec::new(),
        raw_log: String::from("🔍 포트 스캔 결과:\n"),
    };
    for (port, open) in states {
        if open {
            report.open_ports.push(port);
            report.raw_log.push_str(&format!("✅ 포트 {port} 열림\n"));
        } else {
            report.raw_log.push_str(&format!("🔒 포트 {port} 닫힘\n"));
        }
    }
    debug!(open = report.open_ports.len(), "scan finished");
    report
}

/// Gate each candidate on a short connect, then run the full pipeline on the
/// reachable ones. Closed ports produce no entry.
pub async fn probe_all(
    diagnoser: &Diagnoser,
    target: &str,
    candidates: &[u16],
    cancel: CancellationToken,
) -> Vec<ProbeResult> {
    let host: Arc<str> = Arc::from(target);
    let gate = diagnoser.config().scan_timeout();
    let results = run_pool(candidates, diagnoser.config().workers, &cancel, move |port| {
        let host = host.clone();
        let diagnoser = diagnoser.clone();
        async move {
            match net::check_port(&host, port, gate).await {
                Ok(_) => Some(diagnoser.diagnose(&host, port).await),
                Err(_) => None,
            }
        }
    })
    .await;

    let out: Vec<ProbeResult> = results.into_iter().filter_map(|(_, r)| r).collect();
    debug!(probed = out.len(), "multi-port diagnosis finished");
    out
}

/// Run `job` once per candidate on a bounded pool and return the outputs in
/// candidate order. Jobs still running when `cancel` fires are dropped.
async fn run_pool<T, F, Fut>(
    candidates: &[u16],
    workers: usize,
    cancel: &CancellationToken,
    job: F,
) -> Vec<(u16, T)>
where
    F: Fn(u16) -> Fut,
    Fut: Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    let sem = Arc::new(Semaphore::new(workers.clamp(1, MAX_WORKERS)));
    let mut set = JoinSet::new();

    for (idx, &port) in candidates.iter().enumerate() {
        if cancel.is_cancelled() {
            break;
        }
        let permit = tokio::select! {
            _ = cancel.cancelled() => break,
            permit = sem.clone().acquire_owned() => match permit {
                Ok(p) => p,
                Err(_) => break,
            },
        };
        let fut = job(port);
        let cancel = cancel.clone();

        set.spawn(async move {
            let _permit = permit; // keep permit until task completes
            tokio::select! {
                _ = cancel.cancelled() => (idx, port, None),
                out = fut => (idx, port, Some(out)),
            }
        });
    }

    let mut done = Vec::with_capacity(candidates.len());
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((idx, port, Some(out))) => done.push((idx, port, out)),
            Ok((_, port, None)) => debug!(port, "port probe cancelled"),
            Err(e) => warn!(error = %e, "port probe task failed"),
        }
    }

    done.sort_by_key(|(idx, _, _)| *idx);
    done.into_iter().map(|(_, port, out)| (port, out)).collect()
}
