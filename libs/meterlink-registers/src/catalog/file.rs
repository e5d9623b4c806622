//! Supplementary catalog files
//!
//! ```yaml
//! devices:
//!   sdm120:
//!     registers:
//!       30001: { description: Voltage, units: V, address: 0, format: ieee32 }
//!   sdm120ex:
//!     extends: sdm120
//!     registers:
//!       40013: { description: Relay Pulse Width, units: ms, address: 12, format: ieee32 }
//! ```
//!
//! Devices may extend a built-in device or one defined earlier in the same
//! file.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use tracing::info;

use super::{DeviceCatalog, RegisterMap};
use crate::error::{RegisterError, Result};
use crate::register::{Register, RegisterFormat};

const INLINE_SOURCE: &str = "<inline>";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CatalogDocument {
    #[serde(default)]
    devices: serde_yaml::Mapping,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DeviceEntry {
    #[serde(default)]
    extends: Option<String>,
    #[serde(default)]
    registers: BTreeMap<u32, RegisterEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RegisterEntry {
    description: String,
    #[serde(default)]
    units: String,
    address: u16,
    format: String,
    #[serde(default = "default_factor")]
    factor: f64,
}

fn default_factor() -> f64 {
    1.0
}

impl RegisterEntry {
    fn into_register(self) -> Result<Register> {
        let format: RegisterFormat = self.format.parse()?;
        Ok(Register::new(
            self.description,
            self.units,
            self.address,
            format,
            self.factor,
        ))
    }
}

impl DeviceCatalog {
    /// Add the devices described by a YAML catalog file
    ///
    /// Returns the names added, in file order.
    pub fn load_yaml(&mut self, path: impl AsRef<Path>) -> Result<Vec<String>> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| RegisterError::CatalogFile {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let added = self.extend_from_source(&text, &path.display().to_string())?;
        info!("Loaded {} device(s) from {}", added.len(), path.display());
        Ok(added)
    }

    /// Add the devices described by YAML text
    pub fn extend_from_yaml(&mut self, text: &str) -> Result<Vec<String>> {
        self.extend_from_source(text, INLINE_SOURCE)
    }

    fn extend_from_source(&mut self, text: &str, source: &str) -> Result<Vec<String>> {
        let document: CatalogDocument =
            serde_yaml::from_str(text).map_err(|e| RegisterError::CatalogFile {
                path: source.to_string(),
                reason: e.to_string(),
            })?;

        // Mapping keeps file order, so a device can extend one defined above it.
        // Devices land in a copy that replaces the catalog only if all succeed.
        let mut extended = self.clone();
        let mut added = Vec::with_capacity(document.devices.len());
        for (key, value) in document.devices {
            let name = key.as_str().map(str::to_string).ok_or_else(|| {
                RegisterError::invalid_catalog(format!("{source}: device names must be strings"))
            })?;
            let entry: DeviceEntry =
                serde_yaml::from_value(value).map_err(|e| RegisterError::CatalogFile {
                    path: source.to_string(),
                    reason: format!("device '{name}': {e}"),
                })?;

            let mut registers = RegisterMap::new();
            for (code, reg) in entry.registers {
                registers.insert(code, reg.into_register()?);
            }

            match entry.extends {
                Some(base) => extended.insert_extended(&name, &base, registers)?,
                None => extended.insert_device(&name, registers)?,
            }
            added.push(name.trim().to_lowercase());
        }
        *self = extended;
        Ok(added)
    }
}
