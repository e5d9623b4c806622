//! Typed register values

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::register::RegisterFormat;

/// A decoded register value
///
/// Exactly one representation is held, matching the format of the register
/// it was read from. Scaled values are always [`Value::Float`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Value {
    U16(u16),
    S16(i16),
    U32(u32),
    S32(i32),
    Coil(bool),
    Float(f64),
}

impl Value {
    /// Widen to `f64` (coils map to 0.0 / 1.0)
    pub fn as_f64(&self) -> f64 {
        match *self {
            Self::U16(v) => f64::from(v),
            Self::S16(v) => f64::from(v),
            Self::U32(v) => f64::from(v),
            Self::S32(v) => f64::from(v),
            Self::Coil(v) => {
                if v {
                    1.0
                } else {
                    0.0
                }
            },
            Self::Float(v) => v,
        }
    }

    /// Integer view; floats are truncated toward zero
    pub fn as_i64(&self) -> i64 {
        match *self {
            Self::U16(v) => i64::from(v),
            Self::S16(v) => i64::from(v),
            Self::U32(v) => i64::from(v),
            Self::S32(v) => i64::from(v),
            Self::Coil(v) => i64::from(v),
            Self::Float(v) => v as i64,
        }
    }

    pub fn as_bool(&self) -> bool {
        match *self {
            Self::Coil(v) => v,
            _ => self.as_i64() != 0,
        }
    }

    /// Format whose decode produces this variant
    pub fn natural_format(&self) -> RegisterFormat {
        match self {
            Self::U16(_) => RegisterFormat::U16,
            Self::S16(_) => RegisterFormat::S16,
            Self::U32(_) => RegisterFormat::U32,
            Self::S32(_) => RegisterFormat::S32,
            Self::Coil(_) => RegisterFormat::Coil,
            Self::Float(_) => RegisterFormat::Ieee32,
        }
    }

    pub fn is_float(&self) -> bool {
        matches!(self, Self::Float(_))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::U16(v) => write!(f, "{v}"),
            Self::S16(v) => write!(f, "{v}"),
            Self::U32(v) => write!(f, "{v}"),
            Self::S32(v) => write!(f, "{v}"),
            Self::Coil(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v:.2}"),
        }
    }
}

impl From<u16> for Value {
    fn from(v: u16) -> Self {
        Self::U16(v)
    }
}

impl From<i16> for Value {
    fn from(v: i16) -> Self {
        Self::S16(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Self::U32(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::S32(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Coil(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}
