use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use reach_diag::config::{self, ProbeConfig};
use reach_diag::settings::{NoopLauncher, SettingsLauncher, SystemSettingsLauncher};
use reach_diag::types::{ProbeResult, StageOutcome};
use reach_diag::{server, Diagnoser};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// reach-diag: find out why a host or service cannot be reached.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "reach-diag",
    version,
    about = "One-shot reachability diagnosis: DNS, ping, TCP, TLS and HTTP with a root-cause report.",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// JSON file with probe settings; flags below override it.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// TCP connect and DNS timeout in milliseconds.
    #[arg(long = "connect-timeout-ms", global = true)]
    connect_timeout_ms: Option<u64>,

    /// TLS handshake timeout in milliseconds.
    #[arg(long = "tls-timeout-ms", global = true)]
    tls_timeout_ms: Option<u64>,

    /// HTTP connect/read timeout in milliseconds.
    #[arg(long = "http-timeout-ms", global = true)]
    http_timeout_ms: Option<u64>,

    /// Per-port timeout for scans in milliseconds.
    #[arg(long = "scan-timeout-ms", global = true)]
    scan_timeout_ms: Option<u64>,

    /// Max concurrent port probes for scan / diagnose-all.
    #[arg(long, global = true)]
    workers: Option<usize>,

    /// Extra port to treat as TLS (repeatable).
    #[arg(long = "secure-port", global = true)]
    secure_ports: Vec<u16>,

    /// Write results as pretty JSON to this path (optional).
    #[arg(long, global = true)]
    output: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Run the full pipeline against one port.
    Diagnose {
        target: String,
        #[arg(long, default_value_t = server::DEFAULT_PORT)]
        port: u16,
    },
    /// List which of the common service ports are open.
    Scan { target: String },
    /// Diagnose every common service port that accepts a connection.
    DiagnoseAll { target: String },
    /// Serve the JSON API.
    Serve {
        #[arg(long, default_value = "127.0.0.1:8080")]
        bind: String,
        /// Ignore requests to open OS settings panels.
        #[arg(long = "no-settings-launcher", default_value_t = false)]
        no_settings_launcher: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let cfg = build_config(&cli)?;
    let diagnoser = Diagnoser::new(cfg);

    match cli.command.clone() {
        Command::Diagnose { target, port } => {
            let result = diagnoser.diagnose(&target, port).await;
            print_diagnosis(&result);
            write_output(cli.output.as_deref(), &result);
        }
        Command::Scan { target } => {
            let report = diagnoser.scan(&target).await;
            print!("{}", report.raw_log);
            println!("\nOpen ports: {:?}", report.open_ports);
            write_output(cli.output.as_deref(), &report);
        }
        Command::DiagnoseAll { target } => {
            // Ctrl-C stops the remaining port probes.
            let cancel = CancellationToken::new();
            let cancel_ctrlc = cancel.clone();
            tokio::spawn(async move {
                let _ = tokio::signal::ctrl_c().await;
                cancel_ctrlc.cancel();
            });
            let results = diagnoser.diagnose_all_with_cancel(&target, cancel).await;
            print_results_table(&target, &results);
            for result in &results {
                println!("\n=== {}:{} ({}) ===", target, result.port, result.service_name);
                println!("{}", result.analysis_summary);
            }
            write_output(cli.output.as_deref(), &results);
        }
        Command::Serve {
            bind,
            no_settings_launcher,
        } => {
            let launcher: Arc<dyn SettingsLauncher> = if no_settings_launcher {
                Arc::new(NoopLauncher)
            } else {
                Arc::new(SystemSettingsLauncher)
            };
            let state = server::AppState::new(diagnoser, launcher);
            info!("press Ctrl+C to stop the server");
            tokio::select! {
                res = server::spawn_server(&bind, state) => res?,
                _ = tokio::signal::ctrl_c() => info!("shutting down"),
            }
        }
    }

    Ok(())
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(std::io::stderr)
        .init();
}

fn build_config(cli: &Cli) -> Result<ProbeConfig> {
    let mut cfg = match cli.config.as_deref() {
        Some(path) => config::load_config_from_path(path)?,
        None => ProbeConfig::default(),
    };
    if let Some(v) = cli.connect_timeout_ms {
        cfg.connect_timeout_ms = v;
    }
    if let Some(v) = cli.tls_timeout_ms {
        cfg.tls_timeout_ms = v;
    }
    if let Some(v) = cli.http_timeout_ms {
        cfg.http_timeout_ms = v;
    }
    if let Some(v) = cli.scan_timeout_ms {
        cfg.scan_timeout_ms = v;
    }
    if let Some(v) = cli.workers {
        cfg.workers = v;
    }
    cfg.secure_ports.extend(cli.secure_ports.iter().copied());
    cfg.validate().context("invalid probe settings")?;
    Ok(cfg)
}

fn print_diagnosis(result: &ProbeResult) {
    println!("{}", result.raw_log.trim_end());
    if let Some(hint) = &result.resolution_hint {
        println!("\n{hint}");
    }
    if let Some(risk) = &result.risk_hint {
        println!("{risk}");
    }
    println!("\n{}", result.analysis_summary);
}

fn outcome_label(outcome: StageOutcome) -> &'static str {
    match outcome {
        StageOutcome::NotAttempted => "-",
        StageOutcome::Passed => "ok",
        StageOutcome::Failed => "FAIL",
    }
}

fn print_results_table(target: &str, results: &[ProbeResult]) {
    let mut service_w = "service".len();
    for r in results {
        service_w = service_w.max(r.service_name.chars().count());
    }
    let port_w = 5usize;
    let col_w = 6usize;

    println!("\nReachable ports on {}: {}", target, results.len());
    println!(
        "{:>port_w$}  {:<service_w$}  {:<col_w$}  {:<col_w$}  {:>col_w$}  {:>10}",
        "port",
        "service",
        "tls",
        "http",
        "status",
        "latency_ms",
        port_w = port_w,
        service_w = service_w,
        col_w = col_w
    );
    println!(
        "{:-<port_w$}  {:-<service_w$}  {:-<col_w$}  {:-<col_w$}  {:-<col_w$}  {:-<10}",
        "",
        "",
        "",
        "",
        "",
        "",
        port_w = port_w,
        service_w = service_w,
        col_w = col_w
    );
    for r in results {
        println!(
            "{:>port_w$}  {:<service_w$}  {:<col_w$}  {:<col_w$}  {:>col_w$}  {:>10}",
            r.port,
            r.service_name,
            outcome_label(r.tls),
            outcome_label(r.http),
            r.http_status_code.map(|c| c.to_string()).unwrap_or_else(|| "-".into()),
            r.response_time_millis.map(|ms| ms.to_string()).unwrap_or_else(|| "-".into()),
            port_w = port_w,
            service_w = service_w,
            col_w = col_w
        );
    }
}

fn write_output<T: Serialize>(path: Option<&Path>, value: &T) {
    let Some(path) = path else {
        return;
    };
    match write_results_json(path, value) {
        Ok(()) => println!("Wrote JSON results to {}", path.display()),
        Err(e) => eprintln!("Failed to write JSON to {}: {:#}", path.display(), e),
    }
}

fn write_results_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let file = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    serde_json::to_writer_pretty(file, value)?;
    Ok(())
}
