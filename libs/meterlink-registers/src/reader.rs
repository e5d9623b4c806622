//! Device reader
//!
//! Ties a [`RegisterClient`] to one device's registers. Two access modes are
//! offered:
//! - [`Reader::poll_all`] fills one cache per register class with the fewest
//!   reads the device limit allows, after which [`Reader::get_cached`] and
//!   [`Reader::map`] serve values without further traffic.
//! - [`Reader::read_one`] asks the device for a single register directly.

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use crate::cache::RegisterCache;
use crate::catalog::{DeviceCatalog, RegisterMap};
use crate::codec;
use crate::constants::register_bytes;
use crate::error::{ClassFailure, RegisterError, Result};
use crate::register::{Register, RegisterClass, RegisterFormat};
use crate::transport::RegisterClient;
use crate::value::Value;

/// Outcome of a poll in which at least one register class was read
#[derive(Debug, Default)]
pub struct PollSummary {
    /// Classes read successfully, with the number of device reads each took
    pub filled: Vec<(RegisterClass, u32)>,
    /// Classes whose fill failed; their cached values are unavailable
    pub failed: Vec<ClassFailure>,
}

impl PollSummary {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn total_reads(&self) -> u32 {
        self.filled.iter().map(|(_, reads)| reads).sum()
    }
}

/// Reads one device through a register client
#[derive(Debug)]
pub struct Reader<C> {
    client: C,
    registers: RegisterMap,
    input: RegisterCache,
    holding: RegisterCache,
}

impl<C: RegisterClient> Reader<C> {
    /// Reader over an explicit register map
    ///
    /// Codes outside the input and holding classes are ignored.
    pub fn new(client: C, registers: RegisterMap) -> Self {
        let mut input = RegisterCache::new(RegisterClass::Input);
        let mut holding = RegisterCache::new(RegisterClass::Holding);

        for (&code, register) in &registers {
            match RegisterClass::from_code(code) {
                Some(RegisterClass::Input) => input.add(register),
                Some(RegisterClass::Holding) => holding.add(register),
                None => warn!("Register code {} has no readable class, ignoring", code),
            }
        }

        Self {
            client,
            registers,
            input,
            holding,
        }
    }

    /// Reader for a device named in `catalog`
    pub fn for_device(client: C, catalog: &DeviceCatalog, device: &str) -> Result<Self> {
        let registers = catalog.lookup(device)?.clone();
        info!("Reader for '{}' with {} registers", device, registers.len());
        Ok(Self::new(client, registers))
    }

    /// Cap the registers requested per read for devices below the protocol limit
    pub fn with_max_read(mut self, max_read: u16) -> Self {
        self.input = self.input.with_max_read(max_read);
        self.holding = self.holding.with_max_read(max_read);
        self
    }

    /// Fill every non-empty register class cache
    ///
    /// A class that fails is reported in the summary and left unfilled; the
    /// call only fails when every class failed or nothing was configured.
    pub fn poll_all(&mut self) -> Result<PollSummary> {
        let mut summary = PollSummary::default();

        for cache in [&mut self.input, &mut self.holding] {
            if cache.is_empty() {
                continue;
            }
            match cache.fill(&mut self.client) {
                Ok(reads) => {
                    debug!("Filled {} cache in {} read(s)", cache.class(), reads);
                    summary.filled.push((cache.class(), reads));
                },
                Err(error) => {
                    warn!("Polling {} registers failed: {}", cache.class(), error);
                    summary.failed.push(ClassFailure {
                        class: cache.class(),
                        error,
                    });
                },
            }
        }

        if summary.filled.is_empty() {
            if summary.failed.is_empty() {
                return Err(RegisterError::NoRegisters);
            }
            return Err(RegisterError::PollFailed {
                failures: summary.failed,
            });
        }
        Ok(summary)
    }

    /// Read one register from the device, bypassing the cache
    pub fn read_one(&mut self, code: u32, factored: bool) -> Result<Value> {
        let (class, register) = self.lookup(code)?;
        let register = register.clone();
        let count = register.size_in_registers();
        let bytes = self.client.read_registers(class, register.address, count)?;
        let value = codec::decode(register.format, &bytes)?;
        Ok(scale(&register, value, factored))
    }

    /// Value from the most recent successful poll of the register's class
    pub fn get_cached(&self, code: u32, factored: bool) -> Result<Value> {
        let (class, register) = self.lookup(code)?;
        let value = self.cache(class).extract(register)?;
        Ok(scale(register, value, factored))
    }

    /// Poll, then collect every register that could be extracted
    ///
    /// Registers of a failed class, or that fail to decode, are left out.
    pub fn map(&mut self, factored: bool) -> Result<BTreeMap<u32, Value>> {
        self.poll_all()?;

        let mut values = BTreeMap::new();
        for &code in self.registers.keys() {
            match self.get_cached(code, factored) {
                Ok(value) => {
                    values.insert(code, value);
                },
                Err(RegisterError::CacheNotFilled { .. }) => {},
                Err(e) => warn!("Skipping register {}: {}", code, e),
            }
        }
        Ok(values)
    }

    /// Raw holding register words for addresses `start..=stop`
    pub fn scan_holding(&mut self, start: u16, stop: u16) -> Result<Vec<(u16, u16)>> {
        let mut words = Vec::new();
        if stop < start {
            return Ok(words);
        }
        let max_read = u32::from(self.holding.max_read());
        let mut address = u32::from(start);
        let end = u32::from(stop) + 1;

        while address < end {
            let count = (end - address).min(max_read) as u16;
            let at = address as u16;
            let bytes = self.client.read_holding_registers(at, count)?;
            let expected = register_bytes(usize::from(count));
            if bytes.len() < expected {
                return Err(RegisterError::ShortRead {
                    expected,
                    actual: bytes.len(),
                });
            }
            for (i, word) in codec::bytes_to_words(&bytes[..expected]).into_iter().enumerate() {
                words.push((at + i as u16, word));
            }
            address += u32::from(count);
        }
        Ok(words)
    }

    /// Units of `code`, empty when unknown
    pub fn units(&self, code: u32) -> &str {
        self.registers
            .get(&code)
            .map_or("", |reg| reg.units.as_str())
    }

    pub fn descriptor(&self, code: u32) -> Option<&Register> {
        self.registers.get(&code)
    }

    /// All registers in code order
    pub fn registers(&self) -> &RegisterMap {
        &self.registers
    }

    pub fn cache(&self, class: RegisterClass) -> &RegisterCache {
        match class {
            RegisterClass::Input => &self.input,
            RegisterClass::Holding => &self.holding,
        }
    }

    pub fn client_mut(&mut self) -> &mut C {
        &mut self.client
    }

    pub fn into_client(self) -> C {
        self.client
    }

    fn lookup(&self, code: u32) -> Result<(RegisterClass, &Register)> {
        let register = self
            .registers
            .get(&code)
            .ok_or(RegisterError::UnknownRegister(code))?;
        let class = RegisterClass::from_code(code).ok_or(RegisterError::UnknownRegister(code))?;
        Ok((class, register))
    }
}

fn scale(register: &Register, value: Value, factored: bool) -> Value {
    if factored && register.format != RegisterFormat::Coil {
        register.apply_factor(value)
    } else {
        value
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Tests may unwrap
mod tests {
    use super::*;
    use crate::transport::{RequestKind, SimulatedDevice};
    use tracing_test::traced_test;

    fn meter() -> RegisterMap {
        let mut regs = RegisterMap::new();
        regs.insert(30001, Register::new("Grid Voltage", "V", 0, RegisterFormat::U16, 0.1));
        regs.insert(30002, Register::new("Grid Current", "A", 1, RegisterFormat::S16, 0.1));
        regs.insert(30005, Register::new("Frequency", "Hz", 4, RegisterFormat::Ieee32, 1.0));
        regs.insert(40001, Register::new("Export Limit", "W", 0, RegisterFormat::U32, 1.0));
        regs.insert(40003, Register::new("Relay", "", 2, RegisterFormat::Coil, 1.0));
        regs
    }

    fn device() -> SimulatedDevice {
        let mut device = SimulatedDevice::new();
        device.set_input(0, 2300);
        device.set_input(1, (-52i16) as u16);
        device.load_bytes(RegisterClass::Input, 4, &49.5f32.to_bits().to_be_bytes());
        device.load_bytes(RegisterClass::Holding, 0, &[0x00, 0x01, 0x86, 0xA0]);
        device.set_holding(2, 1);
        device
    }

    // ========== poll_all() / get_cached() tests ==========

    #[test]
    fn test_poll_all_reads_each_class_once() {
        let mut dev = device();
        let mut reader = Reader::new(&mut dev, meter());
        let summary = reader.poll_all().unwrap();
        assert!(summary.is_complete());
        assert_eq!(summary.total_reads(), 2);

        assert_eq!(reader.get_cached(30001, true).unwrap(), Value::Float(230.0));
        assert_eq!(reader.get_cached(30001, false).unwrap(), Value::U16(2300));
        assert_eq!(reader.get_cached(30005, false).unwrap(), Value::Float(49.5));
        assert_eq!(reader.get_cached(40001, false).unwrap(), Value::U32(100_000));
        assert_eq!(reader.get_cached(40003, true).unwrap(), Value::Coil(true));

        let scaled = reader.get_cached(30002, true).unwrap().as_f64();
        assert!((scaled + 5.2).abs() < 1e-9);

        let kinds: Vec<RequestKind> = dev.requests().iter().map(|r| r.kind).collect();
        assert_eq!(kinds, vec![RequestKind::ReadInput, RequestKind::ReadHolding]);
    }

    #[test]
    fn test_get_cached_before_poll_is_guarded() {
        let mut dev = device();
        let reader = Reader::new(&mut dev, meter());
        assert!(matches!(
            reader.get_cached(30001, true),
            Err(RegisterError::CacheNotFilled {
                class: RegisterClass::Input
            })
        ));
        assert!(matches!(
            reader.get_cached(39999, true),
            Err(RegisterError::UnknownRegister(39999))
        ));
    }

    #[test]
    fn test_partial_poll_keeps_good_class() {
        let mut dev = device();
        dev.fail_reads_at(0);
        // Fails both classes: input and holding windows both start at 0
        let mut reader = Reader::new(&mut dev, meter());
        assert!(matches!(
            reader.poll_all(),
            Err(RegisterError::PollFailed { failures }) if failures.len() == 2
        ));

        let mut dev = device();
        dev.fail_reads_at(2);
        let mut regs = meter();
        regs.remove(&30002);
        regs.remove(&30005);
        // Input window is just address 0, holding covers 0..3
        let mut reader = Reader::new(&mut dev, regs);
        let summary = reader.poll_all().unwrap();
        assert_eq!(summary.filled, vec![(RegisterClass::Input, 1)]);
        assert_eq!(summary.failed.len(), 1);
        assert_eq!(summary.failed[0].class, RegisterClass::Holding);

        assert!(reader.get_cached(30001, false).is_ok());
        assert!(matches!(
            reader.get_cached(40001, false),
            Err(RegisterError::CacheNotFilled { .. })
        ));
    }

    #[test]
    fn test_poll_with_no_registers() {
        let mut dev = SimulatedDevice::new();
        let mut reader = Reader::new(&mut dev, RegisterMap::new());
        assert!(matches!(reader.poll_all(), Err(RegisterError::NoRegisters)));
        assert!(dev.requests().is_empty());
    }

    // ========== read_one() tests ==========

    #[test]
    fn test_read_one_bypasses_cache() {
        let mut dev = device();
        let mut reader = Reader::new(&mut dev, meter());
        assert_eq!(reader.read_one(40001, false).unwrap(), Value::U32(100_000));
        assert!(matches!(
            reader.read_one(40999, false),
            Err(RegisterError::UnknownRegister(40999))
        ));
        assert!(!reader.cache(RegisterClass::Holding).is_filled());

        let request = dev.requests()[0];
        assert_eq!(request.kind, RequestKind::ReadHolding);
        assert_eq!((request.address, request.count), (0, 2));
    }

    #[test]
    fn test_read_one_applies_factor() {
        let mut dev = device();
        let mut reader = Reader::new(&mut dev, meter());
        assert_eq!(reader.read_one(30001, true).unwrap(), Value::Float(230.0));
        assert_eq!(reader.read_one(30001, false).unwrap(), Value::U16(2300));
        // coils are never scaled
        assert_eq!(reader.read_one(40003, true).unwrap(), Value::Coil(true));
        let scaled = reader.read_one(30002, true).unwrap().as_f64();
        assert!((scaled + 5.2).abs() < 1e-9);
    }

    #[test]
    fn test_read_one_transport_failure() {
        let mut dev = device();
        dev.disconnect();
        let mut reader = Reader::new(&mut dev, meter());
        assert!(matches!(
            reader.read_one(30001, true),
            Err(RegisterError::Transport(_))
        ));
    }

    // ========== map() tests ==========

    #[test]
    fn test_map_collects_every_register() {
        let mut dev = device();
        let mut reader = Reader::new(&mut dev, meter());
        let values = reader.map(true).unwrap();
        assert_eq!(values.len(), 5);
        assert_eq!(values[&30001], Value::Float(230.0));
    }

    #[test]
    #[traced_test]
    fn test_map_skips_failed_class() {
        let mut dev = device();
        let mut regs = meter();
        regs.insert(40100, Register::new("Far", "", 100, RegisterFormat::U16, 1.0));
        dev.fail_reads_at(100);
        let mut reader = Reader::new(&mut dev, regs);
        let values = reader.map(false).unwrap();
        assert_eq!(values.keys().copied().collect::<Vec<_>>(), vec![30001, 30002, 30005]);
        assert!(logs_contain("Polling holding registers failed"));
    }

    #[test]
    fn test_map_skips_undecodable_register() {
        let mut dev = device();
        let mut regs = meter();
        regs.insert(30010, Register::new("Future", "", 9, RegisterFormat::Unrecognized, 1.0));
        let mut reader = Reader::new(&mut dev, regs);
        let values = reader.map(false).unwrap();
        assert!(!values.contains_key(&30010));
        assert_eq!(values.len(), 5);
    }

    // ========== scan_holding() / metadata tests ==========

    #[test]
    fn test_scan_holding_chunks_by_limit() {
        let mut dev = SimulatedDevice::new();
        dev.set_holding(12, 0xABCD);
        let mut reader = Reader::new(&mut dev, meter()).with_max_read(5);
        let words = reader.scan_holding(10, 21).unwrap();
        assert_eq!(words.len(), 12);
        assert_eq!(words[2], (12, 0xABCD));
        assert_eq!(words[11].0, 21);
        assert_eq!(dev.requests().len(), 3);
    }

    #[test]
    fn test_scan_holding_empty_range() {
        let mut dev = SimulatedDevice::new();
        let mut reader = Reader::new(&mut dev, meter());
        assert!(reader.scan_holding(10, 9).unwrap().is_empty());
    }

    #[test]
    fn test_units_and_descriptor() {
        let mut dev = SimulatedDevice::new();
        let reader = Reader::new(&mut dev, meter());
        assert_eq!(reader.units(30005), "Hz");
        assert_eq!(reader.units(1), "");
        assert_eq!(reader.descriptor(40003).map(|r| r.address), Some(2));
        assert_eq!(reader.registers().len(), 5);
    }

    #[test]
    fn test_for_device_uses_catalog() {
        let catalog = DeviceCatalog::builtin();
        let mut dev = SimulatedDevice::new();
        let reader = Reader::for_device(&mut dev, &catalog, "SolaxX1Hybrid").unwrap();
        assert_eq!(reader.cache(RegisterClass::Input).start(), Some(0));
        assert_eq!(reader.cache(RegisterClass::Input).length(), 0x53);
        assert!(reader.cache(RegisterClass::Holding).is_empty());

        assert!(matches!(
            Reader::for_device(&mut dev, &catalog, "nope"),
            Err(RegisterError::DeviceNotFound(_))
        ));
    }
}
