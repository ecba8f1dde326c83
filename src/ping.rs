//! ICMP reachability through the system `ping` utility.
//!
//! Raw ICMP sockets need elevated privileges, the system binary does not.

use crate::error::ProbeError;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PingReport {
    pub sent: u32,
    pub received: u32,
}

impl PingReport {
    pub fn reachable(&self) -> bool {
        self.received > 0
    }
}

/// Send `attempts` echo requests, waiting `per_attempt` for each reply.
///
/// The child is killed if the whole run exceeds `stage_timeout`.
pub async fn ping(
    target: &str,
    attempts: u32,
    per_attempt: Duration,
    stage_timeout: Duration,
) -> Result<PingReport, ProbeError> {
    // A leading '-' would be read as an option
    if target.is_empty() || target.starts_with('-') {
        return Err(ProbeError::Unreachable(format!("invalid ping target: {target:?}")));
    }
    let mut cmd = ping_command(target, attempts, per_attempt);
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true);

    let child = cmd
        .spawn()
        .map_err(|e| ProbeError::Unreachable(format!("failed to run ping: {e}")))?;

    match time::timeout(stage_timeout, child.wait_with_output()).await {
        Ok(Ok(output)) => {
            let text = String::from_utf8_lossy(&output.stdout);
            Ok(PingReport {
                sent: attempts,
                received: count_replies(&text),
            })
        }
        Ok(Err(e)) => Err(ProbeError::Unreachable(e.to_string())),
        Err(_) => Err(ProbeError::unreachable_timeout(stage_timeout)),
    }
}

/// Count echo replies in ping output. Every reply line carries a TTL field on
/// all supported platforms.
pub fn count_replies(output: &str) -> u32 {
    output
        .lines()
        .filter(|l| l.to_ascii_lowercase().contains("ttl="))
        .count() as u32
}

#[cfg(windows)]
fn ping_command(target: &str, attempts: u32, per_attempt: Duration) -> Command {
    let mut cmd = Command::new("ping");
    cmd.arg("-n")
        .arg(attempts.to_string())
        .arg("-w")
        .arg(per_attempt.as_millis().to_string())
        .arg(target);
    cmd
}

#[cfg(target_os = "macos")]
fn ping_command(target: &str, attempts: u32, per_attempt: Duration) -> Command {
    // -W is in milliseconds on macOS
    let mut cmd = Command::new("ping");
    cmd.arg("-c")
        .arg(attempts.to_string())
        .arg("-W")
        .arg(per_attempt.as_millis().to_string())
        .arg(target);
    cmd
}

#[cfg(not(any(windows, target_os = "macos")))]
fn ping_command(target: &str, attempts: u32, per_attempt: Duration) -> Command {
    // -W is whole seconds on Linux
    let secs = per_attempt.as_secs().max(1);
    let mut cmd = Command::new("ping");
    cmd.arg("-c")
        .arg(attempts.to_string())
        .arg("-W")
        .arg(secs.to_string())
        .arg(target);
    cmd
}
