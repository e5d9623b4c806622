//! Register codec and batched register cache for polling meters and inverters
//!
//! # Layout
//!
//! - [`codec`]: big-endian register bytes to typed [`Value`]s and back
//! - [`register`]: descriptors ([`Register`]), formats and register classes
//! - [`cache`]: contiguous per-class window filled with bounded reads
//! - [`catalog`]: device name to register map lookup, with YAML extension
//! - [`transport`]: the [`RegisterClient`] seam, a simulator and a TCP client
//! - [`reader`] / [`writer`]: orchestration over one device connection
//!
//! Everything here is blocking and single-threaded: one reader or writer per
//! physical connection, timeouts owned by the transport, retries owned by the
//! caller.
//!
//! ```
//! use meterlink_registers::{DeviceCatalog, Reader, SimulatedDevice};
//!
//! let catalog = DeviceCatalog::builtin();
//! let mut device = SimulatedDevice::new();
//! device.set_input(0, 2300);
//!
//! let mut reader = Reader::for_device(&mut device, &catalog, "SolaxX1Hybrid")?;
//! reader.poll_all()?;
//! assert_eq!(reader.get_cached(30001, true)?.as_f64(), 230.0);
//! # Ok::<(), meterlink_registers::RegisterError>(())
//! ```

pub mod cache;
pub mod catalog;
pub mod codec;
pub mod constants;
pub mod error;
pub mod reader;
pub mod register;
pub mod transport;
pub mod value;
pub mod writer;

pub use cache::RegisterCache;
pub use catalog::{DeviceCatalog, RegisterMap};
pub use error::{ClassFailure, RegisterError, Result, TransportError};
pub use reader::{PollSummary, Reader};
pub use register::{Register, RegisterClass, RegisterFormat};
#[cfg(feature = "tcp")]
pub use transport::TcpClient;
pub use transport::{RegisterClient, SimulatedDevice};
pub use value::Value;
pub use writer::Writer;
