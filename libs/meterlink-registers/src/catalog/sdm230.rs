//! Eastron SDM230 single phase energy meter

use super::Row;
use crate::register::RegisterFormat::{Ieee32, U32};

pub(super) const NAME: &str = "sdm230";
pub(super) const EXTENDED_NAME: &str = "sdm230ex";

/// Measurement registers
pub(super) const REGISTERS: &[Row] = &[
    (30001, "Line to neutral volts", "V", 0x0000, Ieee32, 1.0),
    (30007, "Current", "A", 0x0006, Ieee32, 1.0),
    (30013, "Active Power", "W", 0x000C, Ieee32, 1.0),
    (30019, "Apparent Power", "VA", 0x0012, Ieee32, 1.0),
    (30025, "Reactive Power", "VAr", 0x0018, Ieee32, 1.0),
    (30031, "Power Factor", "", 0x001E, Ieee32, 1.0),
    (30037, "Phase Angle", "Degrees", 0x0024, Ieee32, 1.0),
    (30071, "Frequency", "Hz", 0x0046, Ieee32, 1.0),
    (30073, "Import Active Energy", "kWh", 0x0048, Ieee32, 1.0),
    (30075, "Export Active Energy", "kWh", 0x004A, Ieee32, 1.0),
    (30077, "Import Reactive Energy", "kVArh", 0x004C, Ieee32, 1.0),
    (30079, "Export Reactive Energy", "kVArh", 0x004E, Ieee32, 1.0),
    (30085, "Total system power demand", "W", 0x0054, Ieee32, 1.0),
    (30087, "Maximum total system power demand", "W", 0x0056, Ieee32, 1.0),
    (30089, "Current system positive power demand", "W", 0x0058, Ieee32, 1.0),
    (30091, "Maximum system positive power demand", "W", 0x005A, Ieee32, 1.0),
    (30093, "Current system reverse power demand", "W", 0x005C, Ieee32, 1.0),
    (30095, "Maximum system reverse power demand", "W", 0x005E, Ieee32, 1.0),
    (30259, "Current demand", "Amps", 0x0102, Ieee32, 1.0),
    (30265, "Maximum current Demand", "A", 0x0108, Ieee32, 1.0),
    (30343, "Total Active Energy", "kWh", 0x0156, Ieee32, 1.0),
    (30345, "Total Reactive Energy", "kVArh", 0x0158, Ieee32, 1.0),
];

/// Configuration registers
///
/// The 46xxxx block sits near the top of the address space, so polling the
/// extended set reads a very wide holding window.
pub(super) const EXTRA_REGISTERS: &[Row] = &[
    (40013, "Relay Pulse Width", "ms", 0x000C, Ieee32, 1.0),
    (40019, "Network Parity Stop", "", 0x0012, Ieee32, 1.0),
    (40021, "Network Node", "", 0x0014, Ieee32, 1.0),
    (40029, "Network Baud Rate", "", 0x001C, Ieee32, 1.0),
    (462721, "Screen Settings", "", 0xF500, U32, 1.0),
    (463761, "System Power", "", 0xF910, U32, 1.0),
    (463776, "Measurement Mode", "", 0xF91F, U32, 1.0),
    (463792, "Pulse Indicators", "", 0xF92F, U32, 1.0),
];
