//! In-memory sink

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::Result;
use crate::sink::{field_values, MeasurementSink, Reading, SinkField};

/// Keeps every stored reading; optionally enforces a field list like the
/// database sinks do
#[derive(Debug, Default)]
pub struct MemorySink {
    fields: Vec<SinkField>,
    readings: Mutex<Vec<Reading>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject readings missing any of `fields`
    pub fn with_fields(fields: Vec<SinkField>) -> Self {
        Self {
            fields,
            readings: Mutex::new(Vec::new()),
        }
    }

    pub async fn readings(&self) -> Vec<Reading> {
        self.readings.lock().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.readings.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.readings.lock().await.is_empty()
    }
}

#[async_trait]
impl MeasurementSink for MemorySink {
    async fn store(&self, reading: &Reading) -> Result<()> {
        field_values(&self.fields, reading)?;
        self.readings.lock().await.push(reading.clone());
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
