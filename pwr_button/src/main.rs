//! # pwr_button Binary
//!
//! Presses the power buttons of the configured hosts through GPIO lines.
//!
//! # Usage
//!
//! ```bash
//! # Power on the default host
//! pwr_button press on
//!
//! # Force a named host off, simulated lines, verbose logging
//! pwr_button -s -v press off --host linux
//!
//! # Serve commands from stdin ("on", "linux off", "health", "hosts")
//! pwr_button --config config/config.toml run
//!
//! # List hosts
//! pwr_button hosts
//! ```
//!
//! Replies are JSON on stdout; logs go to stderr.

use clap::{Parser, Subcommand};
use parking_lot::Mutex;
use pwr_button::{Command, Dispatcher, DriverRegistry, PowerBoard, PressAction};
use pwr_common::config::{ConfigError, ConfigLoader, LogLevel};
use pwr_common::consts::{DEFAULT_CONFIG_PATH, SIMULATION_DRIVER};
use pwr_common::line::config::ButtonConfig;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{error, info, warn, Level};
use tracing_subscriber::EnvFilter;

/// pwr_button - GPIO power button emulation
#[derive(Parser, Debug)]
#[command(name = "pwr_button")]
#[command(author = "RTS007")]
#[command(version)]
#[command(about = "Press computer power buttons through GPIO output lines")]
#[command(long_about = None)]
struct Args {
    /// Path to configuration file. Built-in defaults are used if it does not exist.
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Force simulation driver (no GPIO hardware touched)
    #[arg(short = 's', long)]
    simulate: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    mode: Mode,
}

#[derive(Subcommand, Debug)]
enum Mode {
    /// Press once, then release the lines
    Press {
        /// "on" (short press) or "off" (long press)
        action: PressAction,

        /// Target host; defaults to the first configured host
        #[arg(long)]
        host: Option<String>,
    },
    /// Read commands from stdin, one JSON reply per line on stdout
    Run,
    /// Print the configured hosts as JSON
    Hosts,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Err(e) = run() {
        error!("pwr_button failed: {}", e);
        std::process::exit(1);
    }
    Ok(())
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Config decides the log level, so load it first and report afterwards.
    let loaded = load_config(&args.config);
    let log_level = loaded
        .as_ref()
        .map_or(LogLevel::default(), |(config, _)| config.shared.log_level);
    setup_tracing(&args, log_level);

    let (config, from_file) = loaded?;
    if from_file {
        info!("Loaded configuration from {}", args.config.display());
    } else {
        warn!(
            "No configuration at {}, using built-in defaults",
            args.config.display()
        );
    }
    config.validate()?;

    info!(
        "{} v{} starting...",
        config.shared.service_name,
        env!("CARGO_PKG_VERSION")
    );

    let driver_override = if args.simulate {
        info!("Simulation mode enabled");
        Some(SIMULATION_DRIVER)
    } else {
        None
    };

    let registry = DriverRegistry::with_builtin_drivers();
    let board = Arc::new(PowerBoard::from_config(&config, &registry, driver_override)?);

    // Ctrl-C waits for in-flight pulses so no line is left high.
    {
        let board = Arc::clone(&board);
        ctrlc::set_handler(move || {
            info!("Received shutdown signal");
            if let Err(e) = board.shutdown() {
                error!("Shutdown failed: {}", e);
            }
            std::process::exit(130);
        })?;
    }

    // The signal handler keeps a reference, so Drop alone would never clean up.
    let outcome = execute(args.mode, &Dispatcher::new(Arc::clone(&board)));
    let shutdown = board.shutdown();
    outcome?;
    shutdown?;

    info!("pwr_button shutdown complete");
    Ok(())
}

fn execute(mode: Mode, dispatcher: &Dispatcher) -> Result<(), Box<dyn std::error::Error>> {
    match mode {
        Mode::Press { action, host } => {
            let reply = dispatcher.dispatch(&Command::Press { host, action })?;
            println!("{}", serde_json::to_string(&reply)?);
        }
        Mode::Hosts => {
            let reply = dispatcher.dispatch(&Command::Hosts)?;
            println!("{}", serde_json::to_string_pretty(&reply)?);
        }
        Mode::Run => serve_stdin(dispatcher)?,
    }
    Ok(())
}

/// Load `path`, falling back to defaults when it does not exist.
///
/// The flag is `true` when the file was read.
fn load_config(path: &Path) -> Result<(ButtonConfig, bool), ConfigError> {
    match ButtonConfig::load(path) {
        Ok(config) => Ok((config, true)),
        Err(ConfigError::FileNotFound) => Ok((ButtonConfig::default(), false)),
        Err(e) => Err(e),
    }
}

/// Serve stdin until EOF. Each command runs on its own worker so presses
/// on different hosts overlap; replies are written whole, in completion order.
fn serve_stdin(dispatcher: &Dispatcher) -> Result<(), Box<dyn std::error::Error>> {
    info!("Reading commands from stdin");
    let stdout = Arc::new(Mutex::new(io::stdout()));
    let mut workers: Vec<JoinHandle<()>> = Vec::new();

    for (n, line) in io::stdin().lock().lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        workers.retain(|w| !w.is_finished());

        let dispatcher = dispatcher.clone();
        let stdout = Arc::clone(&stdout);
        let worker = thread::Builder::new()
            .name(format!("request-{n}"))
            .spawn(move || {
                let reply = dispatcher.handle_line(&line);
                let mut out = stdout.lock();
                if let Err(e) = writeln!(out, "{reply}") {
                    warn!("Failed to write reply: {}", e);
                    return;
                }
                if let Err(e) = out.flush() {
                    warn!("Failed to flush reply: {}", e);
                }
            })?;
        workers.push(worker);
    }

    info!("stdin closed, waiting for {} request(s)", workers.len());
    for worker in workers {
        if worker.join().is_err() {
            error!("Request worker panicked");
        }
    }
    Ok(())
}

/// Setup tracing subscriber based on CLI arguments and configured level.
///
/// Logs go to stderr; stdout carries replies only.
fn setup_tracing(args: &Args, log_level: LogLevel) {
    let level = if args.verbose {
        Level::DEBUG
    } else {
        Level::from(log_level)
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .init();
    }
}
