//! Sink trait and the data handed to it

use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use meterlink_registers::{RegisterMap, Value};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SinkError};

/// One poll's worth of values, keyed by register code
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub taken_at: DateTime<Utc>,
    pub values: BTreeMap<u32, Value>,
}

impl Reading {
    /// Reading stamped with the current time
    pub fn now(values: BTreeMap<u32, Value>) -> Self {
        Self {
            taken_at: Utc::now(),
            values,
        }
    }
}

/// Column `name` stores the value of register `code`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SinkField {
    pub name: String,
    pub code: u32,
}

impl SinkField {
    pub fn new(name: impl Into<String>, code: u32) -> Self {
        Self {
            name: name.into(),
            code,
        }
    }
}

/// Destination for readings
#[async_trait]
pub trait MeasurementSink: Send + Sync {
    /// Persist one reading; failures are returned, never retried
    async fn store(&self, reading: &Reading) -> Result<()>;

    /// Release connections
    async fn close(&self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str;
}

/// Columns every sink table carries besides its fields
pub const RESERVED_COLUMNS: [&str; 2] = ["id", "taken_at"];

/// `Grid Voltage` → `grid_voltage`, `MAC Address #1` → `mac_address_1`
pub fn column_name(description: &str) -> String {
    let mut name = String::with_capacity(description.len());
    for c in description.chars() {
        if c.is_ascii_alphanumeric() {
            name.push(c.to_ascii_lowercase());
        } else if !name.is_empty() && !name.ends_with('_') {
            name.push('_');
        }
    }
    while name.ends_with('_') {
        name.pop();
    }
    if name.is_empty() || name.starts_with(|c: char| c.is_ascii_digit()) {
        name.insert_str(0, "r_");
    }
    name
}

/// One field per register, named after its description
///
/// Names that collide with each other or with [`RESERVED_COLUMNS`] get the
/// register code appended.
pub fn fields_from_registers(registers: &RegisterMap) -> Vec<SinkField> {
    let mut seen: HashSet<String> = RESERVED_COLUMNS.iter().map(|c| c.to_string()).collect();
    registers
        .iter()
        .map(|(&code, register)| {
            let mut name = column_name(&register.description);
            if !seen.insert(name.clone()) {
                name = format!("{name}_{code}");
                seen.insert(name.clone());
            }
            SinkField::new(name, code)
        })
        .collect()
}

/// Accept `[A-Za-z_][A-Za-z0-9_]*`
pub fn validate_identifier(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(SinkError::InvalidIdentifier(name.to_string()))
    }
}

/// A field column: a plain identifier that is not one of [`RESERVED_COLUMNS`]
pub fn validate_column(name: &str) -> Result<()> {
    validate_identifier(name)?;
    if RESERVED_COLUMNS.iter().any(|c| c.eq_ignore_ascii_case(name)) {
        return Err(SinkError::ReservedColumn(name.to_string()));
    }
    Ok(())
}

/// Pick the configured fields' values out of a reading, in field order
pub fn field_values(fields: &[SinkField], reading: &Reading) -> Result<Vec<f64>> {
    fields
        .iter()
        .map(|field| {
            reading
                .values
                .get(&field.code)
                .map(Value::as_f64)
                .ok_or_else(|| SinkError::MissingField {
                    code: field.code,
                    name: field.name.clone(),
                })
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Tests may unwrap
mod tests {
    use super::*;
    use meterlink_registers::{Register, RegisterFormat};

    #[test]
    fn test_column_name() {
        assert_eq!(column_name("Grid Voltage"), "grid_voltage");
        assert_eq!(column_name("MAC Address #1"), "mac_address_1");
        assert_eq!(column_name("  Line to neutral volts "), "line_to_neutral_volts");
        assert_eq!(column_name("10M Avg"), "r_10m_avg");
        assert_eq!(column_name("%"), "r_");
    }

    #[test]
    fn test_fields_from_registers_dedupes() {
        let mut regs = RegisterMap::new();
        regs.insert(30001, Register::new("Power", "W", 0, RegisterFormat::U16, 1.0));
        regs.insert(30002, Register::new("power", "W", 1, RegisterFormat::U16, 1.0));
        let fields = fields_from_registers(&regs);
        assert_eq!(
            fields,
            vec![SinkField::new("power", 30001), SinkField::new("power_30002", 30002)]
        );
    }

    #[test]
    fn test_fields_avoid_reserved_columns() {
        let mut regs = RegisterMap::new();
        regs.insert(30001, Register::new("ID", "", 0, RegisterFormat::U16, 1.0));
        regs.insert(30002, Register::new("Taken At", "s", 1, RegisterFormat::U16, 1.0));
        regs.insert(30003, Register::new("Volts", "V", 2, RegisterFormat::U16, 1.0));
        let fields = fields_from_registers(&regs);
        assert_eq!(
            fields,
            vec![
                SinkField::new("id_30001", 30001),
                SinkField::new("taken_at_30002", 30002),
                SinkField::new("volts", 30003),
            ]
        );
        for field in &fields {
            assert!(validate_column(&field.name).is_ok());
        }
    }

    #[test]
    fn test_validate_column() {
        assert!(validate_column("volts").is_ok());
        assert!(matches!(validate_column("id"), Err(SinkError::ReservedColumn(_))));
        assert!(matches!(validate_column("Taken_At"), Err(SinkError::ReservedColumn(_))));
        assert!(matches!(validate_column("bad name"), Err(SinkError::InvalidIdentifier(_))));
    }

    #[test]
    fn test_validate_identifier() {
        assert!(validate_identifier("grid_voltage").is_ok());
        assert!(validate_identifier("_x1").is_ok());
        assert!(validate_identifier("1x").is_err());
        assert!(validate_identifier("volts; DROP TABLE readings").is_err());
        assert!(validate_identifier("").is_err());
    }

    #[test]
    fn test_field_values_missing_code() {
        let mut values = BTreeMap::new();
        values.insert(30001, Value::Float(230.0));
        let reading = Reading::now(values);

        let fields = vec![SinkField::new("volts", 30001)];
        assert_eq!(field_values(&fields, &reading).unwrap(), vec![230.0]);

        let fields = vec![SinkField::new("volts", 30001), SinkField::new("amps", 30007)];
        assert!(matches!(
            field_values(&fields, &reading),
            Err(SinkError::MissingField { code: 30007, ref name }) if name == "amps"
        ));
    }
}
