// Sample domain model - transient input from a data source
use serde::{Deserialize, Serialize};

/// Raw value carried by a sample. Booleans are mapped to 0/1 before storage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SampleValue {
    Bool(bool),
    Number(f64),
}

impl SampleValue {
    pub fn as_f64(self) -> f64 {
        match self {
            SampleValue::Bool(true) => 1.0,
            SampleValue::Bool(false) => 0.0,
            SampleValue::Number(v) => v,
        }
    }
}

impl From<f64> for SampleValue {
    fn from(value: f64) -> Self {
        SampleValue::Number(value)
    }
}

impl From<bool> for SampleValue {
    fn from(value: bool) -> Self {
        SampleValue::Bool(value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub tag: String,
    pub value: SampleValue,
    /// Epoch milliseconds
    pub timestamp: i64,
}

impl Sample {
    pub fn new(tag: impl Into<String>, value: impl Into<SampleValue>, timestamp: i64) -> Self {
        Self {
            tag: tag.into(),
            value: value.into(),
            timestamp,
        }
    }
}
