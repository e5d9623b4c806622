//! Persistence sinks for polled readings
//!
//! A [`Reading`] maps register codes to values; a sink stores the values of
//! its configured [`SinkField`]s. [`SqliteSink`] writes rows to SQLite,
//! [`MemorySink`] keeps readings in memory.

pub mod error;
pub mod memory;
pub mod sink;
pub mod sqlite;

pub use error::{Result, SinkError};
pub use memory::MemorySink;
pub use sink::{
    column_name, fields_from_registers, validate_column, MeasurementSink, Reading, SinkField,
    RESERVED_COLUMNS,
};
pub use sqlite::{SqliteSink, SqliteSinkConfig};
