//! Register addressing constants
//!
//! These limits come from the class of protocol the meters speak:
//! - Maximum PDU size: 253 bytes
//! - Register limits are derived so a response fits within one PDU

/// Bytes carried by one 16-bit register
pub const BYTES_PER_REGISTER: usize = 2;

/// Maximum number of registers for a single holding/input register read
///
/// Calculation for response PDU:
/// - Function Code: 1 byte
/// - Byte Count: 1 byte
/// - Register Data: N × 2 bytes
/// - Total: 1 + 1 + (N × 2) ≤ 253
/// - Therefore: N ≤ (253 - 2) / 2 = 125.5 → 125 registers
pub const MAX_READ_REGISTERS: u16 = 125;

/// Leading code digit of read-only input registers (e.g. 30001)
pub const INPUT_REGISTER_CLASS: u32 = 3;

/// Leading code digit of read-write holding registers (e.g. 40001)
pub const HOLDING_REGISTER_CLASS: u32 = 4;

/// Default TCP port for meter gateways
pub const DEFAULT_TCP_PORT: u16 = 502;

/// Byte length of a read covering `registers` registers
#[inline]
pub const fn register_bytes(registers: usize) -> usize {
    registers * BYTES_PER_REGISTER
}
