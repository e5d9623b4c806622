//! Device catalog
//!
//! Maps a device name (matched case-insensitively) to the registers it
//! exposes. The catalog is built once, optionally extended from YAML files,
//! and handed to readers and writers; nothing in this crate keeps a global
//! register table.

mod file;
mod sdm230;
mod solax;

use std::collections::BTreeMap;

use tracing::debug;

use crate::error::{RegisterError, Result};
use crate::register::{Register, RegisterClass, RegisterFormat};

/// Registers of one device, keyed by register code
pub type RegisterMap = BTreeMap<u32, Register>;

/// Static table row: code, description, units, address, format, factor
type Row = (u32, &'static str, &'static str, u16, RegisterFormat, f64);

fn from_rows(rows: &[Row]) -> RegisterMap {
    rows.iter()
        .map(|&(code, description, units, address, format, factor)| {
            (code, Register::new(description, units, address, format, factor))
        })
        .collect()
}

/// Overlay `extra` onto `base`; entries of `extra` win on code collision
pub fn merge(base: &RegisterMap, extra: &RegisterMap) -> RegisterMap {
    let mut merged = base.clone();
    merged.extend(extra.iter().map(|(code, reg)| (*code, reg.clone())));
    merged
}

/// Check every code belongs to the input or holding class
pub fn validate(name: &str, registers: &RegisterMap) -> Result<()> {
    if name.trim().is_empty() {
        return Err(RegisterError::invalid_catalog("device name is empty"));
    }
    if let Some(code) = registers
        .keys()
        .find(|code| RegisterClass::from_code(**code).is_none())
    {
        return Err(RegisterError::invalid_catalog(format!(
            "device '{name}': register code {code} is neither input (3xxxx) nor holding (4xxxx)"
        )));
    }
    Ok(())
}

/// Immutable name → register map lookup
#[derive(Debug, Clone, Default)]
pub struct DeviceCatalog {
    devices: BTreeMap<String, RegisterMap>,
}

impl DeviceCatalog {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Catalog with the bundled meters and inverters
    pub fn builtin() -> Self {
        let mut catalog = Self::empty();

        let sdm230 = from_rows(sdm230::REGISTERS);
        let sdm230_ex = merge(&sdm230, &from_rows(sdm230::EXTRA_REGISTERS));
        catalog.devices.insert(sdm230::NAME.to_string(), sdm230);
        catalog.devices.insert(sdm230::EXTENDED_NAME.to_string(), sdm230_ex);

        let solax = from_rows(solax::REGISTERS);
        let solax_ex = merge(&solax, &from_rows(solax::EXTRA_REGISTERS));
        catalog.devices.insert(solax::NAME.to_string(), solax);
        catalog.devices.insert(solax::EXTENDED_NAME.to_string(), solax_ex);

        catalog
    }

    /// Add a device; names are stored lower-cased and must be unique
    pub fn insert_device(&mut self, name: &str, registers: RegisterMap) -> Result<()> {
        validate(name, &registers)?;
        let key = name.trim().to_lowercase();
        if self.devices.contains_key(&key) {
            return Err(RegisterError::invalid_catalog(format!(
                "device '{key}' is defined twice"
            )));
        }
        debug!("Catalog: added '{}' with {} registers", key, registers.len());
        self.devices.insert(key, registers);
        Ok(())
    }

    /// Add a device made of `base`'s registers overlaid with `overlay`
    pub fn insert_extended(&mut self, name: &str, base: &str, overlay: RegisterMap) -> Result<()> {
        let merged = merge(self.lookup(base)?, &overlay);
        self.insert_device(name, merged)
    }

    /// Registers of `name`, ignoring case
    pub fn lookup(&self, name: &str) -> Result<&RegisterMap> {
        self.devices
            .get(&name.trim().to_lowercase())
            .ok_or_else(|| RegisterError::DeviceNotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.devices.contains_key(&name.trim().to_lowercase())
    }

    /// Known device names, sorted
    pub fn device_names(&self) -> impl Iterator<Item = &str> {
        self.devices.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}
