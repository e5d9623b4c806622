//! Transport seam
//!
//! Readers and writers talk to devices through [`RegisterClient`]. Framing,
//! sessions and timeouts belong to the implementation; this crate only sees
//! raw register bytes (two per register, big-endian).

mod simulator;
#[cfg(feature = "tcp")]
mod tcp;

pub use simulator::{Request, RequestKind, SimulatedDevice};
#[cfg(feature = "tcp")]
pub use tcp::TcpClient;

use crate::error::TransportError;
use crate::register::RegisterClass;

/// Blocking register access to one device
pub trait RegisterClient {
    /// Read `count` holding registers starting at `address`
    fn read_holding_registers(&mut self, address: u16, count: u16)
        -> Result<Vec<u8>, TransportError>;

    /// Read `count` input registers starting at `address`
    fn read_input_registers(&mut self, address: u16, count: u16) -> Result<Vec<u8>, TransportError>;

    /// Write one holding register, returning the bytes the device echoed
    fn write_single_register(&mut self, address: u16, value: u16) -> Result<Vec<u8>, TransportError>;

    /// Dispatch a read by register class
    fn read_registers(
        &mut self,
        class: RegisterClass,
        address: u16,
        count: u16,
    ) -> Result<Vec<u8>, TransportError> {
        match class {
            RegisterClass::Input => self.read_input_registers(address, count),
            RegisterClass::Holding => self.read_holding_registers(address, count),
        }
    }
}

impl<T: RegisterClient + ?Sized> RegisterClient for &mut T {
    fn read_holding_registers(
        &mut self,
        address: u16,
        count: u16,
    ) -> Result<Vec<u8>, TransportError> {
        (**self).read_holding_registers(address, count)
    }

    fn read_input_registers(&mut self, address: u16, count: u16) -> Result<Vec<u8>, TransportError> {
        (**self).read_input_registers(address, count)
    }

    fn write_single_register(&mut self, address: u16, value: u16) -> Result<Vec<u8>, TransportError> {
        (**self).write_single_register(address, value)
    }
}

impl<T: RegisterClient + ?Sized> RegisterClient for Box<T> {
    fn read_holding_registers(
        &mut self,
        address: u16,
        count: u16,
    ) -> Result<Vec<u8>, TransportError> {
        (**self).read_holding_registers(address, count)
    }

    fn read_input_registers(&mut self, address: u16, count: u16) -> Result<Vec<u8>, TransportError> {
        (**self).read_input_registers(address, count)
    }

    fn write_single_register(&mut self, address: u16, value: u16) -> Result<Vec<u8>, TransportError> {
        (**self).write_single_register(address, value)
    }
}
