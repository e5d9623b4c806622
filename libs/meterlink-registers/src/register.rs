//! Register descriptors
//!
//! A [`Register`] describes one logical measurement on a device: where it
//! lives, how its bytes are encoded and how the decoded value is scaled into
//! engineering units. Descriptors are keyed by a numeric code whose leading
//! digit selects the register class (3 = input, 4 = holding).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::{HOLDING_REGISTER_CLASS, INPUT_REGISTER_CLASS};
use crate::error::RegisterError;
use crate::value::Value;

/// Byte encoding of a register value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegisterFormat {
    U16,
    S16,
    U32,
    S32,
    /// Single flag carried in bit 0 of the low byte
    Coil,
    /// 32-bit float, decoded bit by bit
    Ieee32,
    /// Format this build does not understand; treated as two registers wide
    #[serde(other)]
    Unrecognized,
}

impl RegisterFormat {
    /// Number of 16-bit registers occupied by a value of this format
    pub const fn size_in_registers(self) -> u16 {
        match self {
            Self::U16 | Self::S16 | Self::Coil => 1,
            Self::U32 | Self::S32 | Self::Ieee32 => 2,
            // Reading too much is harmless, reading too little truncates
            Self::Unrecognized => 2,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::U16 => "u16",
            Self::S16 => "s16",
            Self::U32 => "u32",
            Self::S32 => "s32",
            Self::Coil => "coil",
            Self::Ieee32 => "ieee32",
            Self::Unrecognized => "unrecognized",
        }
    }
}

impl fmt::Display for RegisterFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RegisterFormat {
    type Err = RegisterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "u16" | "uint16" => Ok(Self::U16),
            "s16" | "int16" => Ok(Self::S16),
            "u32" | "uint32" => Ok(Self::U32),
            "s32" | "int32" => Ok(Self::S32),
            "coil" | "bool" => Ok(Self::Coil),
            "ieee32" | "float32" => Ok(Self::Ieee32),
            _ => Err(RegisterError::UnknownFormat(s.to_string())),
        }
    }
}

/// Register class, selected by the leading digit of a register code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RegisterClass {
    /// Read-only input registers (codes 3xxxx)
    Input,
    /// Read-write holding registers (codes 4xxxx)
    Holding,
}

impl RegisterClass {
    /// Class of a register code, or `None` when the leading digit is neither 3 nor 4
    pub fn from_code(code: u32) -> Option<Self> {
        let mut lead = code;
        while lead >= 10 {
            lead /= 10;
        }
        match lead {
            INPUT_REGISTER_CLASS => Some(Self::Input),
            HOLDING_REGISTER_CLASS => Some(Self::Holding),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Holding => "holding",
        }
    }
}

impl fmt::Display for RegisterClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata for one logical measurement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Register {
    pub description: String,
    #[serde(default)]
    pub units: String,
    /// Device-local register number
    pub address: u16,
    pub format: RegisterFormat,
    #[serde(default = "default_factor")]
    pub factor: f64,
}

fn default_factor() -> f64 {
    1.0
}

impl Register {
    pub fn new(
        description: impl Into<String>,
        units: impl Into<String>,
        address: u16,
        format: RegisterFormat,
        factor: f64,
    ) -> Self {
        Self {
            description: description.into(),
            units: units.into(),
            address,
            format,
            factor,
        }
    }

    #[inline]
    pub fn size_in_registers(&self) -> u16 {
        self.format.size_in_registers()
    }

    /// One past the last register covered, widened so 65535 + 2 does not wrap
    #[inline]
    pub fn end_address(&self) -> u32 {
        u32::from(self.address) + u32::from(self.size_in_registers())
    }

    /// Scale a decoded value into engineering units
    ///
    /// Integer values are widened to `f64` before multiplying; floats are
    /// multiplied directly. Coils scale as 0 or 1.
    pub fn apply_factor(&self, value: Value) -> Value {
        Value::Float(self.factor * value.as_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_in_registers() {
        assert_eq!(RegisterFormat::U16.size_in_registers(), 1);
        assert_eq!(RegisterFormat::S16.size_in_registers(), 1);
        assert_eq!(RegisterFormat::Coil.size_in_registers(), 1);
        assert_eq!(RegisterFormat::U32.size_in_registers(), 2);
        assert_eq!(RegisterFormat::S32.size_in_registers(), 2);
        assert_eq!(RegisterFormat::Ieee32.size_in_registers(), 2);
        assert_eq!(RegisterFormat::Unrecognized.size_in_registers(), 2);
    }

    #[test]
    fn test_apply_factor_u16() {
        let reg = Register::new("Line voltage", "V", 0, RegisterFormat::U16, 0.1);
        let scaled = reg.apply_factor(Value::U16(2300));
        assert!((scaled.as_f64() - 230.0).abs() < 1e-9);
    }

    #[test]
    fn test_apply_factor_float_and_signed() {
        let reg = Register::new("Power", "W", 0, RegisterFormat::Ieee32, 2.0);
        assert_eq!(reg.apply_factor(Value::Float(1.5)), Value::Float(3.0));

        let reg = Register::new("Battery current", "A", 0, RegisterFormat::S16, 0.1);
        let scaled = reg.apply_factor(Value::S16(-25)).as_f64();
        assert!((scaled + 2.5).abs() < 1e-9);
    }

    #[test]
    fn test_register_class_from_code() {
        assert_eq!(RegisterClass::from_code(30001), Some(RegisterClass::Input));
        assert_eq!(RegisterClass::from_code(341001), Some(RegisterClass::Input));
        assert_eq!(RegisterClass::from_code(40013), Some(RegisterClass::Holding));
        assert_eq!(RegisterClass::from_code(4), Some(RegisterClass::Holding));
        assert_eq!(RegisterClass::from_code(10001), None);
        assert_eq!(RegisterClass::from_code(0), None);
    }

    #[test]
    fn test_format_parse() {
        assert_eq!("U16".parse::<RegisterFormat>().ok(), Some(RegisterFormat::U16));
        assert_eq!(
            "ieee32".parse::<RegisterFormat>().ok(),
            Some(RegisterFormat::Ieee32)
        );
        assert!(matches!(
            "f64".parse::<RegisterFormat>(),
            Err(RegisterError::UnknownFormat(f)) if f == "f64"
        ));
    }

    #[test]
    fn test_end_address_does_not_wrap() {
        let reg = Register::new("Top", "", u16::MAX, RegisterFormat::U32, 1.0);
        assert_eq!(reg.end_address(), 65537);
    }
}
