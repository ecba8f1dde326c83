//! Opening the operating system's network and firewall settings panels.

use std::process::{Command, Stdio};

/// Best-effort launcher for OS settings panels. Implementations never fail
/// the caller; problems are logged and dropped.
pub trait SettingsLauncher: Send + Sync {
    fn open_network_settings(&self);
    fn open_port_settings(&self);
}

/// Spawns the platform's settings command and returns immediately.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemSettingsLauncher;

/// Does nothing. For tests and headless hosts.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopLauncher;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Panel {
    Network,
    Firewall,
}

impl SettingsLauncher for SystemSettingsLauncher {
    fn open_network_settings(&self) {
        launch(Panel::Network);
    }

    fn open_port_settings(&self) {
        launch(Panel::Firewall);
    }
}

impl SettingsLauncher for NoopLauncher {
    fn open_network_settings(&self) {}

    fn open_port_settings(&self) {}
}

/// Program and arguments that open `panel` on `os` (as in `std::env::consts::OS`).
pub fn panel_command(os: &str, panel: Panel) -> Option<(&'static str, &'static [&'static str])> {
    match (os, panel) {
        ("windows", Panel::Network) => Some(("control.exe", &["/name", "Microsoft.NetworkAndSharingCenter"])),
        ("windows", Panel::Firewall) => Some(("control.exe", &["/name", "Microsoft.WindowsFirewall"])),
        ("macos", Panel::Network) => Some(("open", &["/System/Library/PreferencePanes/Network.prefPane"])),
        ("macos", Panel::Firewall) => Some(("open", &["/System/Library/PreferencePanes/Security.prefPane"])),
        ("linux", Panel::Network) => Some(("nm-connection-editor", &[])),
        ("linux", Panel::Firewall) => Some(("gnome-control-center", &["firewall"])),
        _ => None,
    }
}

fn launch(panel: Panel) {
    let os = std::env::consts::OS;
    let Some((program, args)) = panel_command(os, panel) else {
        tracing::warn!(os, ?panel, "no settings panel command for this platform");
        return;
    };
    let spawned = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn();
    match spawned {
        Ok(child) => tracing::debug!(program, pid = child.id(), ?panel, "opened settings panel"),
        Err(e) => tracing::warn!(program, error = %e, ?panel, "failed to open settings panel"),
    }
}
