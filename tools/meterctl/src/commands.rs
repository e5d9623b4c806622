//! Subcommand implementations

use std::collections::BTreeMap;

use anyhow::{bail, Context, Result};
use colored::*;
use meterlink_registers::{
    DeviceCatalog, Reader, RegisterClient, RegisterError, RegisterMap, SimulatedDevice, TcpClient,
    Value, Writer,
};
use meterlink_sink::{MeasurementSink, Reading, SqliteSink};
use serde_json::json;
use tracing::{error, info};

use crate::config::AppConfig;
use crate::display;

type Client = Box<dyn RegisterClient>;

/// Configuration plus the catalog it resolves device names against
pub struct Session {
    pub config: AppConfig,
    pub catalog: DeviceCatalog,
    /// Serve requests from an in-memory device
    pub simulate: bool,
}

impl Session {
    /// Built-in catalog, extended by `catalog_file` when configured
    pub fn new(config: AppConfig, simulate: bool) -> Result<Self> {
        let mut catalog = DeviceCatalog::builtin();
        if let Some(path) = &config.catalog_file {
            let added = catalog
                .load_yaml(path)
                .with_context(|| format!("Failed to load catalog file {}", path.display()))?;
            info!("Catalog file {} added: {}", path.display(), added.join(", "));
        }
        Ok(Self {
            config,
            catalog,
            simulate,
        })
    }

    fn registers(&self) -> Result<&RegisterMap> {
        Ok(self.catalog.lookup(&self.config.device)?)
    }

    fn connect(&self) -> Result<Client> {
        if self.simulate {
            let registers = self.registers()?;
            info!(
                "Simulating '{}' with {} registers",
                self.config.device,
                registers.len()
            );
            return Ok(Box::new(SimulatedDevice::with_registers(registers)));
        }

        let conn = &self.config.connection;
        let client = TcpClient::connect(&conn.host, conn.port, conn.unit_id, self.config.timeout())
            .with_context(|| format!("Failed to connect to {}:{}", conn.host, conn.port))?;
        Ok(Box::new(client))
    }

    fn reader(&self) -> Result<Reader<Client>> {
        let client = self.connect()?;
        let reader = Reader::for_device(client, &self.catalog, &self.config.device)?
            .with_max_read(self.config.limits.max_read_registers);
        Ok(reader)
    }

    fn writer(&self) -> Result<Writer<Client>> {
        let client = self.connect()?;
        Ok(Writer::for_device(client, &self.catalog, &self.config.device)?)
    }

    // ========== catalog ==========

    pub fn list_devices(&self) {
        println!("{}", "Known devices:".bright_cyan().bold());
        for name in self.catalog.device_names() {
            let count = self.catalog.lookup(name).map_or(0, |regs| regs.len());
            println!("  {:<20} {} registers", name.bright_yellow(), count);
        }
    }

    pub fn list_registers(&self, device: Option<&str>) -> Result<()> {
        let device = device.unwrap_or(&self.config.device);
        let registers = self.catalog.lookup(device)?;
        println!(
            "{} {} ({} registers)",
            "Device:".bright_cyan(),
            device.bright_yellow(),
            registers.len()
        );
        for (&code, register) in registers {
            println!("{}", display::register_line(code, register));
        }
        Ok(())
    }

    // ========== reading ==========

    /// Poll everything once and print each register
    pub fn dump(&self, raw: bool, as_json: bool) -> Result<()> {
        let mut reader = self.reader()?;
        let values = reader
            .map(!raw)
            .context("Unable to read register data from device")?;

        if as_json {
            let doc = values_json(reader.registers(), &values);
            println!("{}", serde_json::to_string_pretty(&doc)?);
            return Ok(());
        }

        print_values(reader.registers(), &values);
        Ok(())
    }

    pub fn read(&self, code: u32, raw: bool) -> Result<()> {
        let mut reader = self.reader()?;
        let value = reader
            .read_one(code, !raw)
            .with_context(|| format!("Failed to read register {code}"))?;
        let register = reader
            .descriptor(code)
            .ok_or(RegisterError::UnknownRegister(code))?;
        println!("{}", display::value_line(code, register, &value));
        Ok(())
    }

    pub fn scan(&self, start: u16, stop: u16) -> Result<()> {
        if stop < start {
            bail!("scan range is empty: {start} > {stop}");
        }
        let mut reader = self.reader()?;
        let words = reader
            .scan_holding(start, stop)
            .with_context(|| format!("Unable to read registers {start} to {stop}"))?;
        for (address, word) in words {
            println!("{}", display::scan_line(address, word));
        }
        Ok(())
    }

    // ========== writing ==========

    /// Write `text` to a catalog register
    ///
    /// `true`/`false`/`on`/`off` write a coil, anything else must parse as
    /// an integer and is truncated to the register width.
    pub fn write(&self, code: u32, text: &str) -> Result<()> {
        let mut writer = self.writer()?;
        let result = match parse_switch(text) {
            Some(on) => writer.write_typed(code, Value::Coil(on)),
            None => {
                let value: i64 = text
                    .trim()
                    .parse()
                    .with_context(|| format!("'{text}' is not an integer or on/off"))?;
                writer.write_simple(code, value)
            },
        };
        result.with_context(|| format!("Failed to write register {code}"))?;

        let description = writer
            .registers()
            .get(&code)
            .map_or("", |reg| reg.description.as_str());
        println!(
            "{} {} ← {}",
            "✓ Wrote".green(),
            format!("{code} ({description})").bright_yellow(),
            text.trim()
        );
        Ok(())
    }

    pub fn write_direct(&self, address: u16, value: u16) -> Result<()> {
        let mut writer = self.writer()?;
        let echo = writer
            .write_direct(address, value)
            .with_context(|| format!("Failed to write address {address}"))?;
        println!(
            "{} {} ← {} (echo: {})",
            "✓ Wrote".green(),
            format!("address {address}").bright_yellow(),
            value,
            display::hex_bytes(&echo)
        );
        Ok(())
    }

    // ========== polling ==========

    /// Map every `interval_ms`, storing through the sink when enabled
    ///
    /// Failed cycles are logged and the loop carries on.
    pub fn poll(&self) -> Result<()> {
        let mut reader = self.reader()?;
        let poll = &self.config.poll;

        // The register client is blocking; only the sink needs a runtime
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("Failed to build async runtime")?;

        let sink = if self.config.sink.enabled {
            let sink_config = self.config.sink_config(reader.registers());
            let sink = runtime
                .block_on(SqliteSink::connect(sink_config))
                .context("Failed to open sink")?;
            Some(sink)
        } else {
            None
        };

        info!(
            "Polling '{}' every {}ms ({})",
            self.config.device,
            poll.interval_ms,
            match poll.cycles {
                0 => "until stopped".to_string(),
                n => format!("{n} cycles"),
            }
        );

        let mut cycle: u64 = 0;
        loop {
            cycle += 1;
            match reader.map(poll.factored) {
                Ok(values) => {
                    let reading = Reading::now(values);
                    println!(
                        "{} {}",
                        format!("Cycle {cycle}").bright_cyan(),
                        reading.taken_at.to_rfc3339()
                    );
                    print_values(reader.registers(), &reading.values);

                    if let Some(sink) = &sink {
                        if let Err(e) = runtime.block_on(sink.store(&reading)) {
                            error!("Cycle {} not stored in {}: {}", cycle, sink.name(), e);
                        }
                    }
                },
                Err(e) => error!("Poll cycle {} failed: {}", cycle, e),
            }

            if poll.cycles != 0 && cycle >= poll.cycles {
                break;
            }
            std::thread::sleep(self.config.poll_interval());
        }

        if let Some(sink) = sink {
            runtime.block_on(sink.close())?;
        }
        Ok(())
    }
}

fn print_values(registers: &RegisterMap, values: &BTreeMap<u32, Value>) {
    for (&code, register) in registers {
        match values.get(&code) {
            Some(value) => println!("{}", display::value_line(code, register, value)),
            None => {
                let line = format!("  {:5}: {:<40} unavailable", code, register.description);
                println!("{}", line.dimmed());
            },
        }
    }
}

/// `{"30001": {"description", "units", "value"}}` for every read register
fn values_json(registers: &RegisterMap, values: &BTreeMap<u32, Value>) -> serde_json::Value {
    let entries = values
        .iter()
        .filter_map(|(code, value)| {
            let register = registers.get(code)?;
            Some((
                code.to_string(),
                json!({
                    "description": register.description,
                    "units": register.units,
                    "value": value.as_f64(),
                    "format": register.format.as_str(),
                }),
            ))
        })
        .collect();
    serde_json::Value::Object(entries)
}

fn parse_switch(text: &str) -> Option<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "true" | "on" => Some(true),
        "false" | "off" => Some(false),
        _ => None,
    }
}
