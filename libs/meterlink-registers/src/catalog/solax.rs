//! Solax X1 Hybrid inverter

use super::Row;
use crate::register::RegisterFormat::{S16, S32, U16, U32};

pub(super) const NAME: &str = "solaxx1hybrid";
pub(super) const EXTENDED_NAME: &str = "solaxx1hybridex";

pub(super) const REGISTERS: &[Row] = &[
    (30001, "Grid Voltage", "V", 0x00, U16, 0.1),
    (30002, "Grid Current", "A", 0x01, S16, 0.1),
    (30003, "Inverter Power", "W", 0x02, S16, 1.0),
    (30004, "PV1 Voltage", "V", 0x03, U16, 0.1),
    (30005, "PV2 Voltage", "V", 0x04, U16, 0.1),
    (30006, "PV1 Current", "A", 0x05, U16, 0.1),
    (30007, "PV2 Current", "A", 0x06, U16, 0.1),
    (30008, "Grid Frequency", "Hz", 0x07, U16, 0.01),
    (30009, "Inner Temp", "C", 0x08, S16, 1.0),
    // 0 waiting, 1 checking, 2 normal, 3 off, 7 eps, 9 idle
    (30010, "Run Mode", "", 0x09, U16, 1.0),
    (30011, "PV1 Power", "W", 0x0A, U16, 1.0),
    (30012, "PV2 Power", "W", 0x0B, U16, 1.0),
    (30021, "Battery Voltage", "V", 0x14, S16, 0.1),
    (30022, "Battery Current", "A", 0x15, S16, 0.1),
    (30023, "Battery Power", "W", 0x16, S16, 1.0),
    (30024, "Charger Board Temperature", "C", 0x17, S16, 1.0),
    (30025, "Battery Temperature", "C", 0x18, S16, 1.0),
    (30026, "Charger Boost Temperature", "C", 0x19, S16, 1.0),
    (30029, "Battery Capacity", "%", 0x1C, U16, 1.0),
    (30030, "Battery Energy Charged", "W", 0x1D, U32, 1.0),
    (30032, "BMS Warning", "", 0x1F, U16, 1.0),
    (30033, "Battery Energy Discharged", "W", 0x20, U32, 1.0),
    (30036, "Battery State of Health", "", 0x23, U16, 1.0),
    (30065, "Inverter Fault", "", 0x40, U32, 1.0),
    (30067, "Charger Fault", "", 0x42, U16, 1.0),
    // 512 while a meter fault is present
    (30068, "Manager Fault", "", 0x43, U16, 1.0),
    (30071, "Measured Power", "W", 0x46, S32, 0.001),
    (30073, "Feed In Energy", "kWh", 0x48, U32, 0.01),
    (30075, "Consumed Energy", "kWh", 0x4A, U32, 0.01),
    (30077, "EPS Voltage", "V", 0x4C, U16, 0.1),
    (30078, "EPS Current", "A", 0x4D, U16, 0.1),
    (30079, "EPS VA", "VA", 0x4E, U16, 0.1),
    (30080, "EPS Frequency", "Hz", 0x4F, U16, 1.0),
    (30081, "Energy Today", "kW", 0x50, U16, 0.1),
    (30082, "Energy Total", "kW", 0x51, U32, 0.001),
];

/// Settings readable as holding registers
///
/// Several of these are written through different addresses on the device
/// (e.g. "Min Charger Capacity" is set via register 34).
pub(super) const EXTRA_REGISTERS: &[Row] = &[
    // Advanced grid settings
    (40026, "Vac Lower", "V", 0x19, U16, 0.1),
    (40027, "Vac Upper", "V", 0x1A, U16, 0.1),
    (40028, "FEC Lower", "Hz", 0x1B, U16, 0.01),
    (40029, "FEC Upper", "Hz", 0x1C, U16, 0.01),
    (40032, "Vac 10M Avg", "V", 0x1F, U16, 0.1),
    (40033, "Vac Lower Slow", "V", 0x20, U16, 0.1),
    (40034, "Vac Upper Slow", "V", 0x21, U16, 0.1),
    (40035, "FEC Lower Slow", "Hz", 0x22, U16, 0.01),
    (40036, "FEC Upper Slow", "Hz", 0x23, U16, 0.01),
    // Clock
    (40135, "Minutes", "", 0x86, U16, 1.0),
    (40136, "Hours", "", 0x87, U16, 1.0),
    (40137, "Day", "", 0x88, U16, 1.0),
    (40138, "Month", "", 0x89, U16, 1.0),
    (40139, "Year", "", 0x8A, U16, 1.0),
    (40140, "Min Charger Capacity", "%", 0x8C, U16, 1.0),
    (40145, "Charge Max Current", "A", 0x90, U16, 0.1),
    (40146, "Discharge Max Current", "A", 0x91, U16, 0.1),
    // Forced time-of-use charge windows
    (40147, "Charge Period 1 Start Hour", "", 0x92, U16, 1.0),
    (40148, "Charge Period 1 Start Minutes", "", 0x93, U16, 1.0),
    (40149, "Charge Period 1 Finish Hour", "", 0x94, U16, 1.0),
    (40150, "Charge Period 1 Finish Minutes", "", 0x95, U16, 1.0),
    (40155, "Charge Period 2 Start Hour", "", 0x9A, U16, 1.0),
    (40156, "Charge Period 2 Start Minutes", "", 0x9B, U16, 1.0),
    (40157, "Charge Period 2 Finish Hour", "", 0x9C, U16, 1.0),
    (40158, "Charge Period 2 Finish Minutes", "", 0x9D, U16, 1.0),
    (40163, "MAC Address #1", "", 0xA2, U16, 1.0),
    (40164, "MAC Address #2", "", 0xA3, U16, 1.0),
    (40165, "MAC Address #3", "", 0xA4, U16, 1.0),
    (40183, "Max Export Power", "W", 0xB6, U16, 1.0),
    (40187, "Rated Power", "kW", 0xBA, U16, 0.001),
    (40223, "Battery version number", "", 0xDE, U16, 0.01),
    (40225, "Admin Password", "", 0xE0, U16, 1.0),
    // Backup work mode window
    (40255, "Backup Start Hour", "", 0xFE, U16, 1.0),
    (40256, "Backup Start Minute", "", 0xFF, U16, 1.0),
    (40257, "Backup Finish Hour", "", 0x100, U16, 1.0),
    (40258, "Backup finish Minute", "", 0x101, U16, 1.0),
    (40265, "Use Meter", "", 0x108, U16, 1.0),
    (40266, "Meter 1 ID", "", 0x109, U16, 1.0),
    (40267, "Meter 2 ID", "", 0x10A, U16, 1.0),
];
