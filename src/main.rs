//! obs-remote CLI
//!
//! Sends one command to a running OBS instance over obs-websocket.
//!
//! ## Usage
//!
//! ```bash
//! # Show the current scene and its sources
//! obs-remote scene
//!
//! # Connect to a specific server with a password
//! obs-remote --url ws://studio:4444 --password secret toggle-mute "Mic/Aux"
//!
//! # Save a 1280x720 JPEG of a source
//! obs-remote screenshot Camera --format jpg --width 1280 --height 720 -o camera.jpg
//!
//! # Print scene switches as JSON lines until OBS closes the connection
//! obs-remote watch SwitchScenes
//!
//! # Format a reading without connecting
//! obs-remote format voltage 12.3456
//! ```

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use obs_remote::config::default_config_path;
use obs_remote::units::{self, Quantity};
use obs_remote::{Config, Lifecycle, ObsClient, ObsError, ScreenshotRequest};
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Notify};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "obs-remote")]
#[command(about = "Remote control for OBS Studio over obs-websocket")]
struct Args {
    /// Path to config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// obs-websocket URL
    #[arg(long, env = "OBS_WEBSOCKET_URL")]
    url: Option<String>,

    /// obs-websocket password
    #[arg(long, env = "OBS_WEBSOCKET_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Per-command timeout in seconds (0 = wait forever)
    #[arg(long)]
    timeout: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the current scene
    Scene,

    /// Mute a source
    Mute { source: String },

    /// Unmute a source
    Unmute { source: String },

    /// Toggle a source's mute state
    ToggleMute { source: String },

    /// Capture a source as an image
    Screenshot {
        source: String,

        /// Image format (png, jpg, bmp, ...)
        #[arg(long)]
        format: Option<String>,

        #[arg(long)]
        width: Option<u32>,

        #[arg(long)]
        height: Option<u32>,

        /// Write the image here instead of printing the reply
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print notifications of the given update types until the connection closes
    Watch {
        #[arg(required = true)]
        update_types: Vec<String>,
    },

    /// Format a reading with a metric prefix (offline)
    Format {
        quantity: QuantityArg,

        #[arg(allow_negative_numbers = true)]
        value: f64,
    },

    /// Write the effective configuration to the config file
    InitConfig,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum QuantityArg {
    Voltage,
    Current,
    Resistance,
    Capacitance,
    Frequency,
    Power,
}

impl From<QuantityArg> for Quantity {
    fn from(arg: QuantityArg) -> Self {
        match arg {
            QuantityArg::Voltage => units::VOLTAGE,
            QuantityArg::Current => units::CURRENT,
            QuantityArg::Resistance => units::RESISTANCE,
            QuantityArg::Capacitance => units::CAPACITANCE,
            QuantityArg::Frequency => units::FREQUENCY,
            QuantityArg::Power => units::POWER,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries command output
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env().add_directive("obs_remote=info".parse()?))
        .init();

    let args = Args::parse();

    let config_path = args.config.clone().unwrap_or_else(default_config_path);
    let mut config = Config::load_or_default(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;

    // Apply CLI overrides
    if let Some(url) = args.url {
        config.url = url;
    }
    if let Some(password) = args.password {
        config.password = Some(password);
    }
    if let Some(timeout) = args.timeout {
        config.request_timeout_secs = timeout;
    }

    match args.command {
        Command::Format { quantity, value } => {
            println!("{}", Quantity::from(quantity).format(value));
            return Ok(());
        }
        Command::InitConfig => {
            config.save(&config_path)?;
            info!(path = %config_path.display(), "Wrote config");
            return Ok(());
        }
        _ => {}
    }

    let timeout = config.request_timeout();
    let password = config.password.clone().unwrap_or_default();
    let client = with_timeout(timeout, ObsClient::connect(&config.url, password))
        .await
        .with_context(|| format!("connecting to {}", config.url))?;

    match args.command {
        Command::Scene => {
            let scene = with_timeout(timeout, client.get_current_scene()).await?;
            println!("{}", scene.name);
            for source in &scene.sources {
                let muted = if source.muted == Some(true) { " (muted)" } else { "" };
                println!("  {}{}", source.name, muted);
            }
        }
        Command::Mute { source } => {
            with_timeout(timeout, client.set_mute(&source, true)).await?;
        }
        Command::Unmute { source } => {
            with_timeout(timeout, client.set_mute(&source, false)).await?;
        }
        Command::ToggleMute { source } => {
            with_timeout(timeout, client.toggle_mute(&source)).await?;
        }
        Command::Screenshot {
            source,
            format,
            width,
            height,
            output,
        } => {
            let request = ScreenshotRequest::new(source)
                .with_format(format.unwrap_or_else(|| config.screenshot.format.clone()))
                .with_size(
                    width.unwrap_or(config.screenshot.width),
                    height.unwrap_or(config.screenshot.height),
                );
            let shot = with_timeout(timeout, client.take_source_screenshot(&request)).await?;
            match output {
                Some(path) => {
                    let bytes = shot.image_bytes()?;
                    tokio::fs::write(&path, &bytes)
                        .await
                        .with_context(|| format!("writing {}", path.display()))?;
                    info!(path = %path.display(), bytes = bytes.len(), "Saved screenshot");
                }
                None => println!("{}", shot.img.unwrap_or_default()),
            }
        }
        Command::Watch { update_types } => watch(&client, update_types).await,
        Command::Format { .. } | Command::InitConfig => {}
    }

    if let Err(e) = client.close().await {
        debug!(error = %e, "Close failed");
    }
    Ok(())
}

/// Print matching notifications as JSON lines until the server closes the
/// connection or the user hits Ctrl-C.
async fn watch(client: &ObsClient, update_types: Vec<String>) {
    let closed = Arc::new(Notify::new());
    let notify = Arc::clone(&closed);
    client.on_lifecycle(Lifecycle::Close, move || notify.notify_one());

    let (tx, mut rx) = mpsc::unbounded_channel();
    for update_type in update_types {
        let tx = tx.clone();
        client.on_update(update_type, move |message| {
            let _ = tx.send(message.clone());
        });
    }

    loop {
        tokio::select! {
            Some(message) = rx.recv() => println!("{}", message),
            _ = closed.notified() => {
                warn!("OBS closed the connection");
                break;
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }
}

async fn with_timeout<T>(
    timeout: Option<Duration>,
    fut: impl Future<Output = Result<T, ObsError>>,
) -> Result<T, ObsError> {
    match timeout {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| ObsError::Timeout(format!("no reply within {}s", limit.as_secs())))?,
        None => fut.await,
    }
}
