//! TCP transport over the tokio-modbus synchronous client
//!
//! Framing and transaction ids are handled by tokio-modbus; this adapter
//! converts register words to bytes, hands single-register write echoes back
//! untouched and maps its error layers onto [`TransportError`].

use std::io;
use std::net::{SocketAddr, ToSocketAddrs};
use std::time::Duration;

use tokio_modbus::client::sync::{self, Client, Context};
use tokio_modbus::prelude::SyncReader;
use tokio_modbus::{Request, Response, Slave};
use tracing::{debug, info};

use super::RegisterClient;
use crate::error::TransportError;

/// Blocking TCP session with one unit
pub struct TcpClient {
    ctx: Context,
    peer: SocketAddr,
    unit_id: u8,
}

impl std::fmt::Debug for TcpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpClient")
            .field("peer", &self.peer)
            .field("unit_id", &self.unit_id)
            .finish_non_exhaustive()
    }
}

impl TcpClient {
    /// Resolve `host:port` and open a session addressed to `unit_id`
    ///
    /// `timeout` bounds every request; `None` waits indefinitely.
    pub fn connect(
        host: &str,
        port: u16,
        unit_id: u8,
        timeout: Option<Duration>,
    ) -> Result<Self, TransportError> {
        let peer = (host, port).to_socket_addrs()?.next().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::AddrNotAvailable,
                format!("{host}:{port} did not resolve to an address"),
            )
        })?;

        let mut ctx = sync::tcp::connect_slave(peer, Slave(unit_id))?;
        ctx.set_timeout(timeout);
        info!("Connected to {} (unit {})", peer, unit_id);

        Ok(Self { ctx, peer, unit_id })
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    pub fn unit_id(&self) -> u8 {
        self.unit_id
    }

    fn map_result<T>(result: tokio_modbus::Result<T>) -> Result<T, TransportError> {
        match result {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(exception)) => Err(TransportError::Exception {
                message: exception.to_string(),
                code: u8::from(exception),
            }),
            Err(tokio_modbus::Error::Transport(e)) => Err(TransportError::Io(e)),
            Err(other) => Err(TransportError::Io(io::Error::new(
                io::ErrorKind::InvalidData,
                other.to_string(),
            ))),
        }
    }
}

fn words_to_bytes(words: &[u16]) -> Vec<u8> {
    words.iter().flat_map(|w| w.to_be_bytes()).collect()
}

impl RegisterClient for TcpClient {
    fn read_holding_registers(&mut self, address: u16, count: u16) -> Result<Vec<u8>, TransportError> {
        debug!("TCP read holding: address={}, count={}", address, count);
        let words = Self::map_result(self.ctx.read_holding_registers(address, count))?;
        Ok(words_to_bytes(&words))
    }

    fn read_input_registers(&mut self, address: u16, count: u16) -> Result<Vec<u8>, TransportError> {
        debug!("TCP read input: address={}, count={}", address, count);
        let words = Self::map_result(self.ctx.read_input_registers(address, count))?;
        Ok(words_to_bytes(&words))
    }

    fn write_single_register(&mut self, address: u16, value: u16) -> Result<Vec<u8>, TransportError> {
        debug!("TCP write single: address={}, value={:#06x}", address, value);
        let request = Request::WriteSingleRegister(address, value);
        match Self::map_result(self.ctx.call(request))? {
            Response::WriteSingleRegister(echoed, word) if echoed == address => {
                Ok(word.to_be_bytes().to_vec())
            },
            other => Err(TransportError::Io(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("unexpected response to write of register {address}: {other:?}"),
            ))),
        }
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Tests may unwrap
mod tests {
    use super::*;
    use crate::catalog::RegisterMap;
    use crate::error::RegisterError;
    use crate::register::{Register, RegisterFormat};
    use crate::writer::Writer;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread::{self, JoinHandle};

    /// One-shot server answering a single-register write with `echo` as the
    /// echoed value
    fn write_responder(echo: u16) -> (u16, JoinHandle<[u8; 12]>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            // MBAP header (7) + function, address, value (5)
            let mut request = [0u8; 12];
            stream.read_exact(&mut request).unwrap();
            let mut reply = request;
            reply[10..12].copy_from_slice(&echo.to_be_bytes());
            stream.write_all(&reply).unwrap();
            request
        });
        (port, handle)
    }

    fn writable() -> RegisterMap {
        let mut regs = RegisterMap::new();
        regs.insert(40001, Register::new("Export Limit", "W", 5, RegisterFormat::U16, 1.0));
        regs
    }

    #[test]
    fn test_words_to_bytes() {
        assert_eq!(words_to_bytes(&[0x4049, 0x0FDB]), vec![0x40, 0x49, 0x0F, 0xDB]);
        assert!(words_to_bytes(&[]).is_empty());
    }

    #[test]
    fn test_connect_refused_is_io_error() {
        // Bind then drop a listener to find a port with nothing behind it
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .and_then(|l| l.local_addr())
            .map(|a| a.port());
        let Ok(port) = port else {
            return;
        };
        let result = TcpClient::connect("127.0.0.1", port, 1, Some(Duration::from_millis(200)));
        assert!(matches!(result, Err(TransportError::Io(_))));
    }

    // ========== write_single_register() tests ==========

    #[test]
    fn test_write_returns_device_echo() {
        let (port, server) = write_responder(0x0102);
        let mut client =
            TcpClient::connect("127.0.0.1", port, 3, Some(Duration::from_secs(2))).unwrap();
        let echo = client.write_single_register(5, 0x0102).unwrap();
        assert_eq!(echo, vec![0x01, 0x02]);

        let request = server.join().unwrap();
        assert_eq!(request[6], 3); // unit id
        assert_eq!(request[7], 0x06);
        assert_eq!(&request[8..12], &[0x00, 0x05, 0x01, 0x02]);
    }

    #[test]
    fn test_divergent_echo_fails_verification() {
        let (port, server) = write_responder(0xDEAD);
        let client =
            TcpClient::connect("127.0.0.1", port, 1, Some(Duration::from_secs(2))).unwrap();
        let mut writer = Writer::new(client, &writable());

        match writer.write_simple(40001, 0x0102) {
            Err(RegisterError::WriteVerificationMismatch {
                address,
                expected,
                actual,
            }) => {
                assert_eq!(address, 5);
                assert_eq!(expected, vec![0x01, 0x02]);
                assert_eq!(actual, vec![0xDE, 0xAD]);
            },
            other => panic!("expected echo mismatch, got {other:?}"),
        }
        server.join().unwrap();
    }
}
