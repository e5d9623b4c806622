//! Batched register cache
//!
//! One cache covers one register class. Descriptors added to it grow a single
//! contiguous address window (gaps included), which [`RegisterCache::fill`]
//! reads in chunks no larger than the device read limit. Values are then
//! extracted from the buffered bytes without further device traffic.

use tracing::{debug, warn};

use crate::codec;
use crate::constants::{register_bytes, MAX_READ_REGISTERS};
use crate::error::{RegisterError, Result};
use crate::register::{Register, RegisterClass};
use crate::transport::RegisterClient;
use crate::value::Value;

/// Contiguous byte window over one register class
#[derive(Debug, Clone)]
pub struct RegisterCache {
    class: RegisterClass,
    /// Lowest address added, `None` while the cache is empty
    start: Option<u16>,
    /// One past the highest register covered
    end: u32,
    max_read: u16,
    data: Vec<u8>,
    filled: bool,
}

impl RegisterCache {
    pub fn new(class: RegisterClass) -> Self {
        Self {
            class,
            start: None,
            end: 0,
            max_read: MAX_READ_REGISTERS,
            data: Vec::new(),
            filled: false,
        }
    }

    /// Limit the registers requested per read (clamped to 1..=125)
    pub fn with_max_read(mut self, max_read: u16) -> Self {
        self.max_read = max_read.clamp(1, MAX_READ_REGISTERS);
        self
    }

    pub fn class(&self) -> RegisterClass {
        self.class
    }

    pub fn start(&self) -> Option<u16> {
        self.start
    }

    /// Number of registers in the window
    pub fn length(&self) -> u32 {
        self.start.map_or(0, |start| self.end - u32::from(start))
    }

    /// Registers requested per read
    pub fn max_read(&self) -> u16 {
        self.max_read
    }

    pub fn is_empty(&self) -> bool {
        self.start.is_none()
    }

    pub fn is_filled(&self) -> bool {
        self.filled
    }

    /// Widen the window to cover `register`
    ///
    /// Adding changes the window, so any previously filled bytes are dropped.
    pub fn add(&mut self, register: &Register) {
        self.start = Some(match self.start {
            Some(start) => start.min(register.address),
            None => register.address,
        });
        self.end = self.end.max(register.end_address());
        self.invalidate();
    }

    /// Forget buffered bytes; extraction fails until the next fill
    pub fn invalidate(&mut self) {
        self.filled = false;
        self.data.clear();
    }

    /// Number of reads a fill of the current window issues
    pub fn planned_reads(&self) -> u32 {
        self.length().div_ceil(u32::from(self.max_read))
    }

    /// Read the whole window from the device
    ///
    /// Returns the number of reads issued (zero for an empty cache). Any chunk
    /// failure aborts the fill and leaves the cache unfilled.
    pub fn fill<C>(&mut self, client: &mut C) -> Result<u32>
    where
        C: RegisterClient + ?Sized,
    {
        let Some(start) = self.start else {
            return Ok(0);
        };
        self.invalidate();

        let length = self.length();
        let mut buffer = Vec::with_capacity(register_bytes(length as usize));
        let mut offset = 0u32;
        let mut reads = 0u32;

        while offset < length {
            let count = (length - offset).min(u32::from(self.max_read)) as u16;
            let address = self.chunk_address(start, offset)?;
            debug!(
                "Reading {} {} registers at {} ({}/{})",
                count,
                self.class,
                address,
                reads + 1,
                self.planned_reads()
            );

            let bytes = match client.read_registers(self.class, address, count) {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!("{} register read at {} failed: {}", self.class, address, e);
                    return Err(e.into());
                },
            };
            let expected = register_bytes(usize::from(count));
            if bytes.len() < expected {
                return Err(RegisterError::ShortRead {
                    expected,
                    actual: bytes.len(),
                });
            }
            buffer.extend_from_slice(&bytes[..expected]);

            offset += u32::from(count);
            reads += 1;
        }

        self.data = buffer;
        self.filled = true;
        Ok(reads)
    }

    fn chunk_address(&self, start: u16, offset: u32) -> Result<u16> {
        u16::try_from(u32::from(start) + offset).map_err(|_| RegisterError::OutOfWindow {
            address: u16::MAX,
            start,
            length: self.length(),
        })
    }

    /// Decode `register` from the buffered window
    pub fn extract(&self, register: &Register) -> Result<Value> {
        codec::decode(register.format, self.slice(register)?)
    }

    /// Raw bytes backing `register`
    pub fn slice(&self, register: &Register) -> Result<&[u8]> {
        let Some(start) = self.start else {
            return Err(RegisterError::CacheNotFilled { class: self.class });
        };
        if !self.filled {
            return Err(RegisterError::CacheNotFilled { class: self.class });
        }
        if register.address < start || register.end_address() > self.end {
            return Err(RegisterError::OutOfWindow {
                address: register.address,
                start,
                length: self.length(),
            });
        }

        let offset = register_bytes(usize::from(register.address - start));
        let size = register_bytes(usize::from(register.size_in_registers()));
        Ok(&self.data[offset..offset + size])
    }
}
