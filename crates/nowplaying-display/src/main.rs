mod bus;
mod components;
mod core;
mod font;
mod frame;
mod sink;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use nowplaying_proto::config::{Config, SinkKind};
use nowplaying_proto::state::MetadataStore;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser, Debug)]
#[command(name = "nowplaying", about = "Now-playing title and starfield for a small mono display")]
struct Cli {
    /// Config file to use instead of the default location
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Where frames go
    #[arg(long, value_enum)]
    sink: Option<SinkArg>,

    /// Frames per second
    #[arg(long)]
    fps: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SinkArg {
    Preview,
    File,
    Null,
}

impl From<SinkArg> for SinkKind {
    fn from(arg: SinkArg) -> Self {
        match arg {
            SinkArg::Preview => SinkKind::Preview,
            SinkArg::File => SinkKind::File,
            SinkArg::Null => SinkKind::Null,
        }
    }
}

fn init_logging() -> anyhow::Result<PathBuf> {
    let data_dir = nowplaying_proto::platform::data_dir();
    std::fs::create_dir_all(&data_dir)?;
    let log_path = data_dir.join("nowplaying.log");

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    // the preview sink owns the terminal, so logs go to the file only
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(log_file)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new(
                    "info,nowplaying=debug,nowplaying_proto=debug,rumqttc=warn",
                )
            }),
        )
        .init();

    Ok(log_path)
}

/// Cancel `cancel` on Ctrl-C or SIGTERM.
fn spawn_signal_watch(cancel: CancellationToken) {
    tokio::spawn(async move {
        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut sig) => {
                    sig.recv().await;
                }
                Err(e) => {
                    warn!("signals: cannot watch SIGTERM: {}", e);
                    std::future::pending::<()>().await;
                }
            }
        };
        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = cancel.cancelled() => return,
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    warn!("signals: cannot watch Ctrl-C: {}", e);
                    return;
                }
                info!("signals: interrupt received");
            }
            _ = terminate => info!("signals: terminate received"),
        }
        cancel.cancel();
    });
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_path = init_logging()?;
    eprintln!("nowplaying: logging to {}", log_path.display());
    info!("Log file: {:?}", log_path);

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => Config::load()?,
    };
    config.apply_env_overrides();
    if let Some(sink) = cli.sink {
        config.display.sink = sink.into();
    }
    if let Some(fps) = cli.fps {
        config.display.fps = fps;
    }
    config.validate()?;
    info!(
        "Config loaded from: {:?}",
        cli.config.clone().unwrap_or_else(Config::config_path)
    );

    let cancel = CancellationToken::new();
    spawn_signal_watch(cancel.clone());

    let store = Arc::new(MetadataStore::new());
    let bus = bus::BusClient::start(&config.mqtt, Arc::clone(&store), cancel.clone());

    let mut display = match sink::open(&config.display) {
        Ok(display) => display,
        Err(e) => {
            bus.shutdown().await;
            return Err(e).context("opening display sink");
        }
    };
    let quit_keys = (config.display.sink == SinkKind::Preview)
        .then(|| sink::spawn_quit_keys(cancel.clone()));

    let mut render = core::RenderLoop::new(&config, store);
    let result = render.run(display.as_mut(), cancel.clone()).await;

    // tear down in reverse order whatever ended the loop
    cancel.cancel();
    bus.shutdown().await;
    if let Err(e) = display.close() {
        warn!("sink: close failed: {}", e);
    }
    drop(display);
    if let Some(handle) = quit_keys {
        let _ = handle.await;
    }

    match result {
        Ok(()) => {
            info!("nowplaying: shut down cleanly");
            Ok(())
        }
        Err(e) => {
            error!("render: {}", e);
            Err(e).context("display sink failed")
        }
    }
}
