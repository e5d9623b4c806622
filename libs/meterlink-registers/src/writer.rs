//! Device writer
//!
//! Only holding registers are writable. Every word goes out as a
//! single-register write and the device's echo must match what was sent.
//! 32-bit values take two writes, high word first.

use tracing::{debug, info, warn};

use crate::catalog::{DeviceCatalog, RegisterMap};
use crate::codec;
use crate::error::{RegisterError, Result};
use crate::register::{Register, RegisterClass};
use crate::transport::RegisterClient;
use crate::value::Value;

/// Writes holding registers of one device
#[derive(Debug)]
pub struct Writer<C> {
    client: C,
    registers: RegisterMap,
}

impl<C: RegisterClient> Writer<C> {
    /// Writer over the holding-class subset of `registers`
    pub fn new(client: C, registers: &RegisterMap) -> Self {
        let registers = registers
            .iter()
            .filter(|(code, _)| RegisterClass::from_code(**code) == Some(RegisterClass::Holding))
            .map(|(code, reg)| (*code, reg.clone()))
            .collect();
        Self { client, registers }
    }

    pub fn for_device(client: C, catalog: &DeviceCatalog, device: &str) -> Result<Self> {
        let writer = Self::new(client, catalog.lookup(device)?);
        info!("Writer for '{}' with {} writable registers", device, writer.registers.len());
        Ok(writer)
    }

    /// Write an integer, truncated to the register's width
    ///
    /// Float registers fail with [`RegisterError::UnsupportedEncoding`].
    pub fn write_simple(&mut self, code: u32, value: i64) -> Result<()> {
        let register = self.lookup(code)?;
        let bytes = codec::encode_int(register.format, value)?;
        let register = register.clone();
        self.write_words(&register, &bytes)
    }

    /// Write an already typed value
    pub fn write_typed(&mut self, code: u32, value: Value) -> Result<()> {
        let register = self.lookup(code)?;
        let bytes = codec::encode(register.format, value)?;
        let register = register.clone();
        self.write_words(&register, &bytes)
    }

    /// Write a raw word to any address, returning the device's echo unchecked
    pub fn write_direct(&mut self, address: u16, value: u16) -> Result<Vec<u8>> {
        debug!("Direct write: address={}, value={:#06x}", address, value);
        Ok(self.client.write_single_register(address, value)?)
    }

    /// Writable registers in code order
    pub fn registers(&self) -> &RegisterMap {
        &self.registers
    }

    pub fn client_mut(&mut self) -> &mut C {
        &mut self.client
    }

    pub fn into_client(self) -> C {
        self.client
    }

    fn lookup(&self, code: u32) -> Result<&Register> {
        self.registers
            .get(&code)
            .ok_or(RegisterError::UnknownRegister(code))
    }

    fn write_words(&mut self, register: &Register, bytes: &[u8]) -> Result<()> {
        for (i, word) in codec::bytes_to_words(bytes).into_iter().enumerate() {
            let address = register
                .address
                .checked_add(i as u16)
                .ok_or(RegisterError::OutOfWindow {
                    address: register.address,
                    start: register.address,
                    length: u32::from(register.size_in_registers()),
                })?;
            debug!("Writing {:#06x} to register {} ({})", word, address, register.description);

            let echo = self.client.write_single_register(address, word)?;
            let expected = word.to_be_bytes();
            if echo != expected {
                warn!(
                    "Register {} echoed {:02X?} after writing {:02X?}",
                    address, echo, expected
                );
                return Err(RegisterError::WriteVerificationMismatch {
                    address,
                    expected: expected.to_vec(),
                    actual: echo,
                });
            }
        }
        Ok(())
    }
}
