//! Library crate for reach-diag exposing the probe pipeline and its collaborators.
pub mod analyzer;
pub mod catalog;
pub mod config;
pub mod error;
pub mod hints;
pub mod http;
pub mod net;
pub mod ping;
pub mod prober;
pub mod scanner;
pub mod server;
pub mod settings;
pub mod tls;
pub mod types;

pub use error::ProbeError;
pub use prober::Diagnoser;
pub use types::{ProbeResult, ScanReport, StageOutcome};
