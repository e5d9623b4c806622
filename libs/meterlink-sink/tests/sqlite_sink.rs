//! SQLite sink against real database files

#![allow(clippy::disallowed_methods)] // Tests may unwrap

use std::collections::BTreeMap;

use meterlink_registers::{
    DeviceCatalog, Reader, Register, RegisterFormat, RegisterMap, SimulatedDevice, Value,
};
use meterlink_sink::{
    fields_from_registers, MeasurementSink, Reading, SinkError, SinkField, SqliteSink,
    SqliteSinkConfig,
};
use tempfile::TempDir;

fn reading(volts: f64, amps: f64) -> Reading {
    let mut values = BTreeMap::new();
    values.insert(30001, Value::Float(volts));
    values.insert(30007, Value::Float(amps));
    values.insert(30013, Value::Float(1.0));
    Reading::now(values)
}

fn config(dir: &TempDir) -> SqliteSinkConfig {
    SqliteSinkConfig::new(
        dir.path().join("data").join("meterlink.db"),
        "readings",
        vec![SinkField::new("volts", 30001), SinkField::new("amps", 30007)],
    )
}

#[tokio::test]
async fn stores_configured_fields_as_rows() {
    let dir = TempDir::new().unwrap();
    let sink = SqliteSink::connect(config(&dir)).await.unwrap();

    sink.store(&reading(230.5, 4.25)).await.unwrap();
    sink.store(&reading(229.0, 0.5)).await.unwrap();

    let rows: Vec<(f64, f64)> = sqlx::query_as("SELECT volts, amps FROM readings ORDER BY id")
        .fetch_all(sink.pool())
        .await
        .unwrap();
    assert_eq!(rows, vec![(230.5, 4.25), (229.0, 0.5)]);

    sink.close().await.unwrap();
    assert!(dir.path().join("data").join("meterlink.db").exists());
}

#[tokio::test]
async fn missing_code_fails_without_writing() {
    let dir = TempDir::new().unwrap();
    let sink = SqliteSink::connect(config(&dir)).await.unwrap();

    let mut values = BTreeMap::new();
    values.insert(30001, Value::Float(230.0));
    let err = sink.store(&Reading::now(values)).await.unwrap_err();
    assert!(matches!(err, SinkError::MissingField { code: 30007, .. }));

    sink.store(&reading(1.0, 2.0)).await.unwrap();
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM readings")
        .fetch_one(sink.pool())
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn existing_table_without_create() {
    let dir = TempDir::new().unwrap();
    let mut cfg = config(&dir);
    cfg.create_table = false;
    let sink = SqliteSink::connect(cfg).await.unwrap();

    // No table yet and the sink was told not to create one
    assert!(matches!(
        sink.store(&reading(1.0, 2.0)).await,
        Err(SinkError::Database(_))
    ));

    sqlx::query("CREATE TABLE readings (taken_at TEXT, volts REAL, amps REAL)")
        .execute(sink.pool())
        .await
        .unwrap();
    sink.store(&reading(1.0, 2.0)).await.unwrap();
}

#[tokio::test]
async fn invalid_identifiers_rejected_before_connecting() {
    let dir = TempDir::new().unwrap();
    let mut cfg = config(&dir);
    cfg.fields.push(SinkField::new("drop table", 30013));
    assert!(matches!(
        SqliteSink::connect(cfg).await,
        Err(SinkError::InvalidIdentifier(_))
    ));
    assert!(!dir.path().join("data").exists());
}

#[tokio::test]
async fn polled_map_flows_into_sink() {
    let dir = TempDir::new().unwrap();
    let catalog = DeviceCatalog::builtin();
    let registers = catalog.lookup("solaxx1hybrid").unwrap().clone();
    let fields = fields_from_registers(&registers);
    assert!(fields.iter().any(|f| f.name == "grid_voltage" && f.code == 30001));

    let mut device = SimulatedDevice::with_registers(&registers);
    let mut reader = Reader::new(&mut device, registers);
    let values = reader.map(true).unwrap();

    let cfg = SqliteSinkConfig::new(dir.path().join("solax.db"), "solax", fields);
    let sink = SqliteSink::connect(cfg).await.unwrap();
    sink.store(&Reading::now(values)).await.unwrap();

    // PV1 voltage lives at address 3, seeded 3, scaled by 0.1
    let pv1: f64 = sqlx::query_scalar("SELECT pv1_voltage FROM solax")
        .fetch_one(sink.pool())
        .await
        .unwrap();
    assert!((pv1 - 0.3).abs() < 1e-9);
}

#[tokio::test]
async fn registers_named_like_sink_columns_still_store() {
    let dir = TempDir::new().unwrap();
    let mut registers = RegisterMap::new();
    registers.insert(30001, Register::new("ID", "", 0, RegisterFormat::U16, 1.0));
    registers.insert(30002, Register::new("Taken At", "s", 1, RegisterFormat::U16, 1.0));

    let fields = fields_from_registers(&registers);
    let cfg = SqliteSinkConfig::new(dir.path().join("meter.db"), "readings", fields);
    let sink = SqliteSink::connect(cfg).await.unwrap();

    let mut values = BTreeMap::new();
    values.insert(30001, Value::U16(7));
    values.insert(30002, Value::U16(42));
    sink.store(&Reading::now(values)).await.unwrap();

    let row: (i64, f64, f64) =
        sqlx::query_as("SELECT id, id_30001, taken_at_30002 FROM readings")
            .fetch_one(sink.pool())
            .await
            .unwrap();
    assert_eq!(row, (1, 7.0, 42.0));
}
