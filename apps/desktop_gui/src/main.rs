use std::path::PathBuf;

mod backend_bridge;
mod controller;
mod ui;

use clap::Parser;
use crossbeam_channel::bounded;
use eframe::egui;
use tracing_subscriber::EnvFilter;

use backend_bridge::commands::BackendCommand;
use controller::events::UiEvent;
use ui::{AppPaths, DesktopGuiApp, StartupConfig};

#[derive(Debug, Parser)]
#[command(name = "ward-runner-dashboard", about = "Operator dashboard for the ward delivery robot")]
struct Cli {
    /// Relay server base URL. Defaults to the last URL used, then the local relay.
    #[arg(long)]
    server_url: Option<String>,
    /// Named profile; each profile keeps its own local cache.
    #[arg(long, default_value = "default")]
    profile: String,
    /// Overrides the per-profile data directory.
    #[arg(long)]
    data_dir: Option<PathBuf>,
}

impl From<Cli> for StartupConfig {
    fn from(cli: Cli) -> Self {
        Self {
            server_url: cli.server_url,
            profile: cli.profile,
            data_dir: cli.data_dir,
        }
    }
}

/// `RUST_LOG` when it parses, `info` otherwise.
fn log_filter(rust_log: Option<&str>) -> EnvFilter {
    rust_log
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

fn main() -> anyhow::Result<()> {
    let rust_log = std::env::var("RUST_LOG").ok();
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(rust_log.as_deref()))
        .init();

    let startup = StartupConfig::from(Cli::parse());
    let paths = AppPaths::from_startup(&startup)?;
    tracing::info!(data_root = %paths.data_root.display(), "using local data directory");

    let (cmd_tx, cmd_rx) = bounded::<BackendCommand>(256);
    let (ui_tx, ui_rx) = bounded::<UiEvent>(2048);
    backend_bridge::runtime::launch(cmd_rx, ui_tx, paths.cache_url());

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Ward Runner Dashboard")
            .with_inner_size([1280.0, 800.0])
            .with_min_inner_size([980.0, 640.0]),
        ..Default::default()
    };
    eframe::run_native(
        "Ward Runner Dashboard",
        options,
        Box::new(move |cc| {
            Ok(Box::new(DesktopGuiApp::bootstrap(
                cmd_tx,
                ui_rx,
                startup,
                cc.storage,
            )))
        }),
    )
    .map_err(|err| anyhow::anyhow!("dashboard window failed: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_without_server_url_leaves_it_unset() {
        let cli = Cli::parse_from(["ward-runner-dashboard"]);
        let startup = StartupConfig::from(cli);
        assert!(startup.server_url.is_none());
        assert_eq!(startup.profile, "default");
        assert!(startup.data_dir.is_none());
    }

    #[test]
    fn cli_accepts_data_dir_override() {
        let cli = Cli::parse_from([
            "ward-runner-dashboard",
            "--server-url",
            "http://relay.local:9000",
            "--data-dir",
            "/var/lib/ward",
        ]);
        let paths = AppPaths::from_startup(&StartupConfig::from(cli)).expect("paths");
        assert_eq!(paths.data_root, PathBuf::from("/var/lib/ward"));
    }

    #[test]
    fn log_filter_honours_rust_log() {
        assert_eq!(log_filter(Some("client_core=debug")).to_string(), "client_core=debug");
        assert_eq!(log_filter(None).to_string(), "info");
    }
}
