//! End-to-end polling against simulated meters and inverters

#![allow(clippy::disallowed_methods)] // Tests may unwrap

use meterlink_registers::transport::RequestKind;
use meterlink_registers::{
    DeviceCatalog, Reader, RegisterClass, RegisterError, SimulatedDevice, Value, Writer,
};

#[test]
fn sdm230_poll_reads_whole_input_window_in_three_chunks() {
    let catalog = DeviceCatalog::builtin();
    let registers = catalog.lookup("sdm230").unwrap().clone();
    let mut device = SimulatedDevice::with_registers(&registers);

    let mut reader = Reader::new(&mut device, registers);
    // 0x0000..0x015A = 346 registers, gaps included
    assert_eq!(reader.cache(RegisterClass::Input).length(), 346);

    let summary = reader.poll_all().unwrap();
    assert_eq!(summary.filled, vec![(RegisterClass::Input, 3)]);

    // Seeded with 0.0f32; an all-zero word decodes to 2^-127
    let volts = reader.get_cached(30001, true).unwrap();
    assert_eq!(volts, Value::Float(2f64.powi(-127)));
    // Address 0x158 seeded with 344 / 10
    let total = reader.get_cached(30345, false).unwrap();
    assert_eq!(total, Value::Float(f64::from(34.4f32)));

    let counts: Vec<u16> = device.requests().iter().map(|r| r.count).collect();
    assert_eq!(counts, vec![125, 125, 96]);
}

#[test]
fn solax_extended_polls_both_classes() {
    let catalog = DeviceCatalog::builtin();
    let registers = catalog.lookup("solaxx1hybridex").unwrap().clone();
    let mut device = SimulatedDevice::with_registers(&registers);

    let mut reader = Reader::new(&mut device, registers);
    let values = reader.map(true).unwrap();
    assert_eq!(values.len(), reader.registers().len());

    // Grid voltage at address 0 reads 0; PV1 voltage at 3 reads 3 * 0.1
    assert_eq!(values[&30001].as_f64(), 0.0);
    assert!((values[&30004].as_f64() - 0.3).abs() < 1e-9);

    let kinds: Vec<RequestKind> = device.requests().iter().map(|r| r.kind).collect();
    assert_eq!(kinds, vec![RequestKind::ReadInput, RequestKind::ReadHolding, RequestKind::ReadHolding]);
}

#[test]
fn write_then_read_back_through_cache() {
    let catalog = DeviceCatalog::builtin();
    let mut device = SimulatedDevice::new();

    let mut writer = Writer::for_device(&mut device, &catalog, "SolaxX1HybridEx").unwrap();
    writer.write_simple(40145, 250).unwrap();

    let mut reader = Reader::for_device(&mut device, &catalog, "SolaxX1HybridEx").unwrap();
    reader.poll_all().unwrap();
    assert_eq!(reader.get_cached(40145, false).unwrap(), Value::U16(250));
    assert!((reader.get_cached(40145, true).unwrap().as_f64() - 25.0).abs() < 1e-9);
}

#[test]
fn device_outage_fails_poll_and_keeps_cache_guarded() {
    let catalog = DeviceCatalog::builtin();
    let mut device = SimulatedDevice::new();
    device.disconnect();

    let mut reader = Reader::for_device(&mut device, &catalog, "sdm230").unwrap();
    let err = reader.poll_all().unwrap_err();
    assert!(matches!(err, RegisterError::PollFailed { ref failures } if failures.len() == 1));
    assert!(err.to_string().contains("input registers"));
    assert!(matches!(
        reader.get_cached(30001, true),
        Err(RegisterError::CacheNotFilled { .. })
    ));
}

#[test]
fn conservative_read_limit_uses_more_chunks() {
    let catalog = DeviceCatalog::builtin();
    let mut device = SimulatedDevice::new();
    let mut reader = Reader::for_device(&mut device, &catalog, "solaxx1hybrid")
        .unwrap()
        .with_max_read(50);
    let summary = reader.poll_all().unwrap();
    // 0x53 = 83 registers
    assert_eq!(summary.total_reads(), 2);
}
