//! curfueld - fuel tank level daemon
//!
//! Polls the level sender on a serial port and appends tank volume readings
//! to the configured event log until interrupted.
//!
//! # Usage
//!
//! Log readings:
//! ```bash
//! curfueld /etc/curfuel.ini
//! ```
//!
//! Find the sender's raw range before filling in `[calibration]`:
//! ```bash
//! curfueld -c /etc/curfuel.ini
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use curfuel_core::config::DaemonConfig;
use curfuel_core::daemon::{DaemonController, DaemonError, Mode, RunOutcome};
use curfuel_core::demo::DemoConnector;
use curfuel_core::pipeline::CalibrationBounds;
use curfuel_core::protocol::{list_ports, ChannelError, Connector, SerialConnector};
use curfuel_core::shutdown::Shutdown;
use std::io::{self, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Polls taken by the demo sender before it "unplugs"
const DEMO_DROPOUT_POLLS: u32 = 120;

/// Refused reconnects during a demo outage
const DEMO_OUTAGE_ATTEMPTS: u32 = 3;

#[derive(Parser, Debug)]
#[command(name = "curfueld", version)]
#[command(about = "Fuel tank level monitoring daemon", long_about = None)]
struct Cli {
    /// Path to the INI configuration file
    #[arg(required_unless_present = "list_ports")]
    config: Option<PathBuf>,

    /// Calibration mode: show the live min/max raw values instead of logging
    #[arg(short = 'c', long)]
    calibrate: bool,

    /// List serial ports that could host the sender and exit
    #[arg(long)]
    list_ports: bool,

    /// Print the resolved configuration as JSON and exit
    #[arg(long)]
    print_config: bool,

    /// Use a simulated sender instead of the serial device
    #[arg(long)]
    demo: bool,

    /// More diagnostics on stderr (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn mode(&self) -> Mode {
        if self.calibrate {
            Mode::Calibrate
        } else {
            Mode::Run
        }
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn print_ports() {
    let ports = list_ports();
    if ports.is_empty() {
        println!("No serial ports found");
        return;
    }
    for port in ports {
        match (port.vid, port.pid) {
            (Some(vid), Some(pid)) => println!(
                "{}  [{:04x}:{:04x}] {}",
                port.name,
                vid,
                pid,
                port.product.unwrap_or_default()
            ),
            _ => println!("{}", port.name),
        }
    }
}

fn print_bounds(bounds: &CalibrationBounds) {
    print!("\r    {}   (Hit ^C to stop)", bounds);
    let _ = io::stdout().flush();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if cli.list_ports {
        print_ports();
        return Ok(());
    }

    let config_path = cli.config.as_deref().context("no configuration file given")?;
    let config = DaemonConfig::from_file(config_path)
        .with_context(|| format!("failed to load {}", config_path.display()))?;

    if cli.print_config {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    let connector: Box<dyn Connector> = if cli.demo {
        Box::new(DemoConnector::new().with_dropouts(DEMO_DROPOUT_POLLS, DEMO_OUTAGE_ATTEMPTS))
    } else {
        Box::new(SerialConnector::new())
    };

    let shutdown = Shutdown::new();
    let mut daemon = DaemonController::new(config, connector, shutdown.clone());

    // Ctrl-C only raises the flag; the worker closes the port itself
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("interrupt received, shutting down");
                shutdown.request();
            }
            Err(e) => tracing::error!("cannot listen for interrupts: {}", e),
        }
    });

    let mode = cli.mode();
    if mode == Mode::Calibrate {
        println!("Manually move the sending unit from the lowest to the highest position");
        println!("multiple times. Use the min and max in your configuration file.");
        println!();
    }

    let result = tokio::task::spawn_blocking(move || daemon.execute(mode, print_bounds))
        .await
        .context("daemon worker panicked")?;

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(DaemonError::Channel(ChannelError::Interrupted)) => {
            tracing::info!("interrupted before the device was opened");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    match outcome {
        RunOutcome::Logged(stats) => tracing::info!(?stats, "run complete"),
        RunOutcome::Calibrated(bounds) if bounds.samples > 0 => {
            println!();
            println!("minimum = {:.2}", bounds.min);
            println!("maximum = {:.2}", bounds.max);
        }
        RunOutcome::Calibrated(_) => println!("\nNo readings received"),
    }

    Ok(())
}
