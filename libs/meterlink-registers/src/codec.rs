//! Register value codec
//!
//! Converts big-endian register bytes into typed [`Value`]s and back.
//!
//! Two conventions here are specific to the meters this crate talks to and
//! must not be "fixed":
//! - Coils are a single flag in bit 0 of the low byte of one register.
//! - `ieee32` is decoded field by field rather than by reinterpreting the
//!   bits, and a zero exponent field selects a `0x400000` mantissa
//!   denominator. Device firmware produces its readings the same way.

use tracing::trace;

use crate::constants::register_bytes;
use crate::error::{RegisterError, Result};
use crate::register::RegisterFormat;
use crate::value::Value;

const IEEE32_EXPONENT_BIAS: i32 = 127;
const IEEE32_MANTISSA_MASK: u32 = 0x007F_FFFF;
const IEEE32_DENOMINATOR: f64 = 0x80_0000 as f64;
const IEEE32_ZERO_EXPONENT_DENOMINATOR: f64 = 0x40_0000 as f64;

// ============================================================================
// Decoding
// ============================================================================

/// Decode the leading bytes of `bytes` according to `format`
///
/// Extra trailing bytes are ignored; too few bytes is a [`RegisterError::ShortRead`].
pub fn decode(format: RegisterFormat, bytes: &[u8]) -> Result<Value> {
    let needed = register_bytes(usize::from(format.size_in_registers()));
    if bytes.len() < needed {
        return Err(RegisterError::ShortRead {
            expected: needed,
            actual: bytes.len(),
        });
    }

    let value = match format {
        RegisterFormat::U16 => Value::U16(unsigned16(bytes)),
        RegisterFormat::S16 => Value::S16(unsigned16(bytes) as i16),
        RegisterFormat::U32 => Value::U32(unsigned32(bytes)),
        RegisterFormat::S32 => Value::S32(unsigned32(bytes) as i32),
        RegisterFormat::Coil => Value::Coil(bytes[1] & 0x01 == 0x01),
        RegisterFormat::Ieee32 => Value::Float(ieee32(unsigned32(bytes))),
        RegisterFormat::Unrecognized => return Err(RegisterError::UnsupportedEncoding(format)),
    };

    trace!("Decoded {} from {:02X?}: {}", format, &bytes[..needed], value);
    Ok(value)
}

#[inline]
fn unsigned16(bytes: &[u8]) -> u16 {
    u16::from(bytes[0]) << 8 | u16::from(bytes[1])
}

#[inline]
fn unsigned32(bytes: &[u8]) -> u32 {
    u32::from(bytes[0]) << 24
        | u32::from(bytes[1]) << 16
        | u32::from(bytes[2]) << 8
        | u32::from(bytes[3])
}

/// Decode a 32-bit float word field by field
///
/// `sign * (1 + mantissa / denominator) * 2^(exponent_field - 127)`, where the
/// denominator is `0x400000` when the exponent field is zero and `0x800000`
/// otherwise. Matches IEEE-754 for normal numbers; zero and subnormals decode
/// to tiny non-zero magnitudes.
pub fn ieee32(word: u32) -> f64 {
    let negative = word >> 31 == 1;
    let exponent_field = ((word >> 23) & 0xFF) as i32;
    let mantissa = f64::from(word & IEEE32_MANTISSA_MASK);

    let denominator = if exponent_field == 0 {
        IEEE32_ZERO_EXPONENT_DENOMINATOR
    } else {
        IEEE32_DENOMINATOR
    };
    let magnitude = (1.0 + mantissa / denominator) * 2f64.powi(exponent_field - IEEE32_EXPONENT_BIAS);

    if negative {
        -magnitude
    } else {
        magnitude
    }
}

// ============================================================================
// Encoding
// ============================================================================

/// Encode an integer for a register of `format`
///
/// Values are truncated to the register width (two's complement for signed
/// formats). Coils encode any non-zero value as `0x0001`. Float registers
/// have no inverse and fail with [`RegisterError::UnsupportedEncoding`].
pub fn encode_int(format: RegisterFormat, value: i64) -> Result<Vec<u8>> {
    let bytes = match format {
        RegisterFormat::U16 | RegisterFormat::S16 => (value as u16).to_be_bytes().to_vec(),
        RegisterFormat::U32 | RegisterFormat::S32 => (value as u32).to_be_bytes().to_vec(),
        RegisterFormat::Coil => vec![0x00, u8::from(value != 0)],
        RegisterFormat::Ieee32 | RegisterFormat::Unrecognized => {
            return Err(RegisterError::UnsupportedEncoding(format))
        },
    };
    Ok(bytes)
}

/// Encode a typed value for a register of `format`
///
/// Integer and coil values are accepted for any integer or coil format and
/// follow [`encode_int`]. Float values cannot be encoded.
pub fn encode(format: RegisterFormat, value: Value) -> Result<Vec<u8>> {
    match value {
        Value::Float(_) => Err(RegisterError::UnsupportedEncoding(format)),
        Value::Coil(flag) => encode_int(format, i64::from(flag)),
        other => encode_int(format, other.as_i64()),
    }
}

/// Split encoded bytes into the big-endian register words a write sends
pub fn bytes_to_words(bytes: &[u8]) -> Vec<u16> {
    bytes.chunks_exact(2).map(unsigned16).collect()
}
