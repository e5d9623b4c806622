//! meterctl - poll, inspect and write meter registers
//!
//! Talks to one device per invocation over Modbus TCP, or to an in-memory
//! simulation of it with `--simulate`.

mod commands;
mod config;
mod display;

use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use colored::*;
use common::logging::{self, LogConfig};

use crate::commands::Session;
use crate::config::{AppConfig, CliOverrides};

#[derive(Parser)]
#[command(name = "meterctl")]
#[command(about = "Poll, inspect and write energy meter registers")]
#[command(long_about = "Poll, inspect and write energy meter registers

Catalog:
  devices       List known device types
  registers     List the registers of a device

Device access:
  dump          Read every register once and print it
  read          Read a single register
  scan          Print raw holding registers in an address range
  write         Write a catalog register
  write-direct  Write a raw value to any holding address
  poll          Read periodically, optionally storing into SQLite

Examples:
  meterctl devices
  meterctl --device SolaxX1Hybrid --host 192.168.1.40 dump
  meterctl --simulate read 30001
  meterctl -c config/meterctl.yaml poll --cycles 10")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (default: config/meterctl.yaml when present)
    #[arg(short = 'c', long, global = true)]
    config: Option<PathBuf>,

    /// Device type from the catalog
    #[arg(short, long, global = true)]
    device: Option<String>,

    /// Device or gateway host
    #[arg(long, global = true)]
    host: Option<String>,

    /// Device or gateway TCP port
    #[arg(short, long, global = true)]
    port: Option<u16>,

    /// Unit (slave) id on the bus
    #[arg(short, long, global = true)]
    unit: Option<u8>,

    /// Use an in-memory simulated device instead of the network
    #[arg(long, global = true)]
    simulate: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List known device types
    Devices,

    /// List the registers of a device
    Registers {
        /// Device type (default: the configured device)
        device: Option<String>,
    },

    /// Read every register once and print it
    Dump {
        /// Print unscaled values
        #[arg(long)]
        raw: bool,

        /// Print a JSON document instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Read a single register by code (e.g. 30001)
    Read {
        code: u32,

        /// Print the unscaled value
        #[arg(long)]
        raw: bool,
    },

    /// Print raw holding registers from start to stop inclusive
    Scan { start: u16, stop: u16 },

    /// Write a catalog register (integer, or on/off for coils)
    Write {
        code: u32,
        #[arg(allow_hyphen_values = true)]
        value: String,
    },

    /// Write a raw 16-bit value to a holding register address
    WriteDirect { address: u16, value: u16 },

    /// Read periodically, optionally storing readings into SQLite
    Poll {
        /// Number of cycles, 0 runs until interrupted
        #[arg(long)]
        cycles: Option<u64>,

        /// Milliseconds between cycles
        #[arg(long)]
        interval_ms: Option<u64>,

        /// Store readings through the configured sink
        #[arg(long)]
        store: bool,
    },
}

impl Cli {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            device: self.device.clone(),
            host: self.host.clone(),
            port: self.port,
            unit_id: self.unit,
        }
    }
}

fn init_logging(config: &AppConfig, verbose: bool, ansi: bool) -> Result<()> {
    logging::init_log_root(config.logging.dir.as_deref());
    let level = if verbose {
        "debug"
    } else {
        config.logging.level.as_str()
    };
    let log_config = LogConfig {
        service_name: "meterctl".to_string(),
        log_dir: logging::get_log_root(),
        level: level.parse().unwrap_or(tracing::Level::INFO),
        enable_json: config.logging.json,
        enable_file: config.logging.file,
        enable_ansi: ansi,
    };
    logging::init_with_config(log_config)
        .map_err(|e| anyhow!("Failed to initialize logging: {e}"))
}

fn run(cli: Cli) -> Result<()> {
    let mut config = AppConfig::load(cli.config.as_deref(), &cli.overrides())?;

    if let Commands::Poll {
        cycles,
        interval_ms,
        store,
    } = &cli.command
    {
        if let Some(cycles) = cycles {
            config.poll.cycles = *cycles;
        }
        if let Some(interval_ms) = interval_ms {
            config.poll.interval_ms = *interval_ms;
        }
        if *store {
            config.sink.enabled = true;
        }
        config.validate()?;
    }

    init_logging(&config, cli.verbose, !cli.no_color)?;
    let session = Session::new(config, cli.simulate)?;

    match cli.command {
        Commands::Devices => session.list_devices(),
        Commands::Registers { device } => session.list_registers(device.as_deref())?,
        Commands::Dump { raw, json } => session.dump(raw, json)?,
        Commands::Read { code, raw } => session.read(code, raw)?,
        Commands::Scan { start, stop } => session.scan(start, stop)?,
        Commands::Write { code, value } => session.write(code, &value)?,
        Commands::WriteDirect { address, value } => session.write_direct(address, value)?,
        Commands::Poll { .. } => session.poll()?,
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    if let Err(e) = run(cli) {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}
