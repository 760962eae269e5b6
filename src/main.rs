use std::time::Duration;

use clap::Parser;
use log::info;
use miette::{IntoDiagnostic, Result, WrapErr};
use tokio::sync::mpsc;
use tokio_graceful_shutdown::{SubsystemBuilder, Toplevel};

use vsxlink::bridge::Bridge;
use vsxlink::config::{default_config_path, Config};
use vsxlink::storage::LabelStore;
use vsxlink::{console, Cli, VERSION};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    env_logger::Builder::new()
        .filter_level(args.verbose.log_level_filter())
        .init();

    info!("vsxlink {} starting", VERSION);

    let path = match &args.config {
        Some(path) => path.clone(),
        None => default_config_path().into_diagnostic()?,
    };
    let mut config = Config::load(&path).into_diagnostic()?;
    if let Some(tick_ms) = args.tick_ms {
        config.tick_ms = tick_ms;
    }
    info!(
        "Loaded {} with {} receiver(s)",
        path.display(),
        config.devices.len()
    );

    let labels = LabelStore::with_default_dir().into_diagnostic()?;
    let bridge = Bridge::new(&config, labels).into_diagnostic()?;
    let (command_tx, command_rx) = mpsc::channel(32);
    let with_console = args.console;

    Toplevel::new(move |s| async move {
        s.start(SubsystemBuilder::new("bridge", move |h| {
            bridge.run(command_rx, h)
        }));
        if with_console {
            s.start(SubsystemBuilder::new("console", move |h| {
                console::run(command_tx, h)
            }));
        }
    })
    .catch_signals()
    .handle_shutdown_requests(Duration::from_secs(5))
    .await
    .into_diagnostic()
    .wrap_err("Shutdown did not complete cleanly")
}
