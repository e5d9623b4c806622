//! In-memory device for testing and offline runs
//!
//! Holds separate holding and input register banks (unset registers read as
//! zero), records every request, and can be told to misbehave.

use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use super::RegisterClient;
use crate::codec;
use crate::error::TransportError;
use crate::register::{Register, RegisterClass, RegisterFormat};

/// Exception code for "server device failure"
const SERVER_DEVICE_FAILURE: u8 = 0x04;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    ReadHolding,
    ReadInput,
    WriteSingle,
}

/// One request seen by the simulator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Request {
    pub kind: RequestKind,
    pub address: u16,
    /// Registers requested (1 for writes)
    pub count: u16,
}

/// Simulated register device
#[derive(Debug, Default)]
pub struct SimulatedDevice {
    /// Holding registers (4xxxx)
    holding_registers: HashMap<u16, u16>,
    /// Input registers (3xxxx)
    input_registers: HashMap<u16, u16>,
    requests: Vec<Request>,
    /// Reads covering one of these addresses fail
    failing_addresses: Vec<u16>,
    /// Cap on registers returned per read
    response_limit: Option<u16>,
    /// Bytes echoed instead of the written value
    echo_override: Option<Vec<u8>>,
    disconnected: bool,
}

impl SimulatedDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulator preloaded with a plausible value for every register
    ///
    /// Integers read as `address % 1000`, floats as `address / 10`, coils
    /// as set on odd addresses.
    pub fn with_registers(registers: &BTreeMap<u32, Register>) -> Self {
        let mut device = Self::new();
        for (&code, register) in registers {
            let Some(class) = RegisterClass::from_code(code) else {
                continue;
            };
            let address = register.address;
            let bytes = match register.format {
                RegisterFormat::Ieee32 => (f32::from(address) / 10.0).to_bits().to_be_bytes().to_vec(),
                RegisterFormat::Coil => vec![0, (address % 2) as u8],
                format => match codec::encode_int(format, i64::from(address % 1000)) {
                    Ok(bytes) => bytes,
                    Err(_) => continue,
                },
            };
            device.load_bytes(class, address, &bytes);
        }
        device
    }

    pub fn set_holding(&mut self, address: u16, value: u16) {
        self.holding_registers.insert(address, value);
    }

    pub fn set_input(&mut self, address: u16, value: u16) {
        self.input_registers.insert(address, value);
    }

    /// Store big-endian bytes as consecutive registers starting at `address`
    pub fn load_bytes(&mut self, class: RegisterClass, address: u16, bytes: &[u8]) {
        for (i, word) in codec::bytes_to_words(bytes).into_iter().enumerate() {
            let Some(at) = address.checked_add(i as u16) else {
                break;
            };
            self.bank_mut(class).insert(at, word);
        }
    }

    pub fn holding(&self, address: u16) -> u16 {
        self.holding_registers.get(&address).copied().unwrap_or(0)
    }

    pub fn input(&self, address: u16) -> u16 {
        self.input_registers.get(&address).copied().unwrap_or(0)
    }

    /// Requests seen so far, oldest first
    pub fn requests(&self) -> &[Request] {
        &self.requests
    }

    pub fn clear_requests(&mut self) {
        self.requests.clear();
    }

    /// Fail every later read whose range covers `address`
    pub fn fail_reads_at(&mut self, address: u16) {
        self.failing_addresses.push(address);
    }

    pub fn clear_failures(&mut self) {
        self.failing_addresses.clear();
    }

    /// Return at most `registers` registers per read
    pub fn truncate_responses(&mut self, registers: u16) {
        self.response_limit = Some(registers);
    }

    /// Echo `bytes` for every write instead of the written value
    pub fn override_echo(&mut self, bytes: Option<Vec<u8>>) {
        self.echo_override = bytes;
    }

    /// Make every request fail with [`TransportError::NotConnected`]
    pub fn disconnect(&mut self) {
        self.disconnected = true;
    }

    fn bank_mut(&mut self, class: RegisterClass) -> &mut HashMap<u16, u16> {
        match class {
            RegisterClass::Input => &mut self.input_registers,
            RegisterClass::Holding => &mut self.holding_registers,
        }
    }

    fn read(&mut self, class: RegisterClass, address: u16, count: u16) -> Result<Vec<u8>, TransportError> {
        let kind = match class {
            RegisterClass::Input => RequestKind::ReadInput,
            RegisterClass::Holding => RequestKind::ReadHolding,
        };
        self.requests.push(Request {
            kind,
            address,
            count,
        });
        debug!("Simulated {} read: address={}, count={}", class, address, count);

        if self.disconnected {
            return Err(TransportError::NotConnected);
        }
        let last = u32::from(address) + u32::from(count);
        if self
            .failing_addresses
            .iter()
            .any(|&a| u32::from(a) >= u32::from(address) && u32::from(a) < last)
        {
            return Err(TransportError::Exception {
                code: SERVER_DEVICE_FAILURE,
                message: format!("simulated failure reading {count} registers at {address}"),
            });
        }

        let returned = self.response_limit.map_or(count, |limit| count.min(limit));
        let bank = match class {
            RegisterClass::Input => &self.input_registers,
            RegisterClass::Holding => &self.holding_registers,
        };
        let mut bytes = Vec::with_capacity(usize::from(returned) * 2);
        for i in 0..u32::from(returned) {
            let word = u16::try_from(u32::from(address) + i)
                .ok()
                .and_then(|at| bank.get(&at).copied())
                .unwrap_or(0);
            bytes.extend_from_slice(&word.to_be_bytes());
        }
        Ok(bytes)
    }
}

impl RegisterClient for SimulatedDevice {
    fn read_holding_registers(&mut self, address: u16, count: u16) -> Result<Vec<u8>, TransportError> {
        self.read(RegisterClass::Holding, address, count)
    }

    fn read_input_registers(&mut self, address: u16, count: u16) -> Result<Vec<u8>, TransportError> {
        self.read(RegisterClass::Input, address, count)
    }

    fn write_single_register(&mut self, address: u16, value: u16) -> Result<Vec<u8>, TransportError> {
        self.requests.push(Request {
            kind: RequestKind::WriteSingle,
            address,
            count: 1,
        });
        debug!("Simulated write: address={}, value={:#06x}", address, value);

        if self.disconnected {
            return Err(TransportError::NotConnected);
        }
        self.holding_registers.insert(address, value);
        Ok(self
            .echo_override
            .clone()
            .unwrap_or_else(|| value.to_be_bytes().to_vec()))
    }
}
