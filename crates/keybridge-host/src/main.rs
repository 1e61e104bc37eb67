//! keybridge: serial keyboard bridge entry point.
//!
//! Finds and opens the serial device, sends the `host|user` header, then
//! forwards every key typed into this terminal as a protocol symbol until
//! the exit combination (Ctrl+Shift+G by default) is pressed.
//!
//! # Usage
//!
//! ```text
//! keybridge [OPTIONS]
//!
//! Options:
//!   --port <PORT>          Port to try first (e.g. COM3, /dev/ttyUSB0)
//!   --baud <BAUD>          Line speed [default from config: 9600]
//!   --config <PATH>        Config file instead of the platform default
//!   --interval-ms <MS>     Delay between polling ticks
//!   --settle-ms <MS>       Pause after opening the port
//!   --list-ports           Print the visible serial ports and exit
//!   --write-config         Write the effective configuration and exit
//! ```
//!
//! # Exit status
//!
//! | Code | Meaning                                         |
//! |------|-------------------------------------------------|
//! | 0    | Exit combination pressed, or a listing command  |
//! | 1    | No serial port could be opened                  |
//! | 2    | Serial write or terminal input failed mid-run   |
//! | 3    | Configuration could not be loaded or is invalid |

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use keybridge_host::application::discover_port::{
    connect, detect_port, DiscoveryError, PortDiscovery, PortProvider,
};
use keybridge_host::application::session::{run_bridge, SessionError};
use keybridge_host::infrastructure::console::StdConsole;
use keybridge_host::infrastructure::identity;
use keybridge_host::infrastructure::key_state::terminal::TerminalKeyState;
use keybridge_host::infrastructure::serial::SystemPorts;
use keybridge_host::infrastructure::storage::config::{
    config_file_path, load_config, load_config_from, save_config_to, AppConfig, ConfigError,
};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Serial keyboard bridge.
///
/// Forwards keys typed into this terminal window to a microcontroller over a
/// serial port.
#[derive(Debug, Parser)]
#[command(
    name = "keybridge",
    about = "Forward keys typed into this terminal to a serial device",
    version
)]
struct Cli {
    /// Serial port to try before any detected or enumerated port.
    #[arg(long, env = "KEYBRIDGE_PORT")]
    port: Option<String>,

    /// Baud rate; overrides `serial.baud`.
    #[arg(long, env = "KEYBRIDGE_BAUD")]
    baud: Option<u32>,

    /// Configuration file; defaults to the platform config directory.
    #[arg(long, env = "KEYBRIDGE_CONFIG")]
    config: Option<PathBuf>,

    /// Milliseconds between polling ticks; overrides `polling.interval_ms`.
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Milliseconds to wait after the port opens; overrides `serial.settle_delay_ms`.
    #[arg(long)]
    settle_ms: Option<u64>,

    /// Print the visible serial ports and the auto-detected one, then exit.
    #[arg(long)]
    list_ports: bool,

    /// Write the effective configuration to the config file, then exit.
    #[arg(long)]
    write_config: bool,
}

impl Cli {
    /// Loads the config file and applies the command-line overrides.
    fn load_config(&self) -> Result<AppConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => load_config_from(path)?,
            None => load_config()?,
        };
        if let Some(port) = &self.port {
            config.serial.preferred_port = Some(port.clone());
        }
        if let Some(baud) = self.baud {
            config.serial.baud = baud;
        }
        if let Some(interval) = self.interval_ms {
            config.polling.interval_ms = interval;
        }
        if let Some(settle) = self.settle_ms {
            config.serial.settle_delay_ms = settle;
        }
        Ok(config)
    }

    fn config_path(&self) -> Result<PathBuf, ConfigError> {
        match &self.config {
            Some(path) => Ok(path.clone()),
            None => config_file_path(),
        }
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            eprintln!("keybridge: {e:#}");
            ExitCode::from(exit_code_for(&e))
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = cli.load_config().context("failed to load configuration")?;
    init_logging(&config.log_level);

    if cli.list_ports {
        return list_ports(&config);
    }
    if cli.write_config {
        let path = cli.config_path()?;
        save_config_to(&path, &config)?;
        println!("Wrote {}", path.display());
        return Ok(());
    }

    let options = config.to_discovery_options()?;
    let policy = config.to_polling_policy()?;
    info!("keybridge {} starting", env!("CARGO_PKG_VERSION"));

    // ── Connection ────────────────────────────────────────────────────────────
    let provider = SystemPorts::new();
    let mut discovery = PortDiscovery::new(&provider, options);
    let mut console = StdConsole::stdio();
    let connection = connect(&mut discovery, &mut console)?;

    // ── Session ───────────────────────────────────────────────────────────────
    let header = identity::session_header();
    println!(
        "Sending keys typed in this window to {}. Press {} to stop.",
        connection.port(),
        policy.exit
    );
    let mut keys = TerminalKeyState::open().map_err(SessionError::KeyState)?;
    if !keys.reports_release() {
        info!("terminal does not report key releases; auto-repeat counts as new presses");
    }
    let result = run_bridge(connection, &header, &mut keys, &policy);
    // Leave raw mode before printing anything.
    drop(keys);

    let summary = result?;
    println!("Stopped. {} symbols sent.", summary.symbols_sent);
    Ok(())
}

/// `RUST_LOG` wins; otherwise the configured level.  Logs go to stderr so
/// the operator lines on stdout stay readable.
fn init_logging(level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(std::io::stderr)
        .init();
}

fn list_ports(config: &AppConfig) -> anyhow::Result<()> {
    let ports = SystemPorts::new()
        .list_ports()
        .context("failed to enumerate serial ports")?;
    if ports.is_empty() {
        println!("No serial ports found.");
        return Ok(());
    }
    for port in &ports {
        println!("{}\t{}", port.id, port.description);
    }
    match detect_port(&ports, &config.serial.detect_markers) {
        Some(port) => println!("Auto-detected: {}", port.id),
        None => println!("Auto-detected: none"),
    }
    Ok(())
}

fn exit_code_for(error: &anyhow::Error) -> u8 {
    if error.downcast_ref::<DiscoveryError>().is_some() {
        1
    } else if error.downcast_ref::<SessionError>().is_some() {
        2
    } else if error.downcast_ref::<ConfigError>().is_some() {
        3
    } else {
        1
    }
}
