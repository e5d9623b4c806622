//! Console formatting of registers and values

use meterlink_registers::{Register, Value};

/// `  30001: Line to neutral volts                       230.00 V`
///
/// Floats get two decimals in a 12-wide column, integers a 15-wide column,
/// coils print as `true`/`false` without units.
pub fn value_line(code: u32, register: &Register, value: &Value) -> String {
    let prefix = format!("  {:5}: {:<40} ", code, register.description);
    let line = match value {
        Value::Coil(on) => return format!("{prefix}{on}"),
        Value::Float(v) => format!("{prefix}{v:12.2} {}", register.units),
        other => format!("{prefix}{:15} {}", other.as_i64(), register.units),
    };
    line.trim_end().to_string()
}

/// Catalog listing: code, description, address, format and factor
pub fn register_line(code: u32, register: &Register) -> String {
    let line = format!(
        "  {:5}: {:<40} @{:<5} {:<6} x{:<8} {}",
        code,
        register.description,
        register.address,
        register.format,
        register.factor,
        register.units
    );
    line.trim_end().to_string()
}

/// `Register 40 [0028] : 1F4 [500]`
pub fn scan_line(address: u16, word: u16) -> String {
    format!("Register {address} [{address:04X}] : {word:X} [{word}]")
}

/// Hex dump of a write echo, `00 2A`
pub fn hex_bytes(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use meterlink_registers::RegisterFormat;

    fn volts() -> Register {
        Register::new("Line to neutral volts", "V", 0, RegisterFormat::Ieee32, 1.0)
    }

    #[test]
    fn test_value_line_float() {
        let line = value_line(30001, &volts(), &Value::Float(230.456));
        assert_eq!(
            line,
            format!("  30001: {:<40} {:>12} V", "Line to neutral volts", "230.46")
        );
    }

    #[test]
    fn test_value_line_integer_and_coil() {
        let reg = Register::new("Serial number", "", 4, RegisterFormat::U32, 1.0);
        let line = value_line(40005, &reg, &Value::U32(123_456));
        assert!(line.ends_with("         123456"));
        assert!(line.starts_with("  40005: Serial number"));

        let reg = Register::new("Relay", "", 10, RegisterFormat::Coil, 1.0);
        assert!(value_line(40011, &reg, &Value::Coil(true)).ends_with(" true"));
    }

    #[test]
    fn test_register_line() {
        let line = register_line(30001, &volts());
        assert!(line.contains("@0"));
        assert!(line.contains("ieee32"));
        assert!(line.ends_with(" V"));
    }

    #[test]
    fn test_scan_line_and_hex() {
        assert_eq!(scan_line(40, 500), "Register 40 [0028] : 1F4 [500]");
        assert_eq!(hex_bytes(&[0x00, 0x2A]), "00 2A");
        assert_eq!(hex_bytes(&[]), "");
    }
}
