use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// A loosely-typed cell in a timeline row. Event-specific columns carry
/// whatever the timeline generator put there (a position, a code string).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Number(f64),
    Text(String),
}

impl Value {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

/// One scheduled event: when it happens, which handler runs it, and any
/// event-specific columns the handler's `arg_cols` pull from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Row {
    pub onset: f64,
    pub event_name: String,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

impl Row {
    pub fn new(onset: f64, event_name: impl Into<String>) -> Self {
        Self {
            onset,
            event_name: event_name.into(),
            extra: HashMap::new(),
        }
    }

    pub fn with_col(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(name.into(), value.into());
        self
    }

    /// Look a column up by name. `onset` and `event_name` resolve like any
    /// other column so handlers can list them in `arg_cols`. Null cells read
    /// as missing.
    pub fn get(&self, col: &str) -> Option<Value> {
        match col {
            "onset" => Some(Value::Number(self.onset)),
            "event_name" => Some(Value::Text(self.event_name.clone())),
            _ => self.extra.get(col).filter(|v| !v.is_null()).cloned(),
        }
    }
}

/// The declarative onset schedule for one run. Rows are iterated strictly in
/// table order; construction rejects onsets that run backwards, so table
/// order and wall-clock order agree.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "Vec<Row>", into = "Vec<Row>")]
pub struct Timeline {
    rows: Vec<Row>,
}

impl Timeline {
    pub fn new(rows: Vec<Row>) -> Result<Self, ConfigError> {
        let mut prev = 0.0_f64;
        for (index, row) in rows.iter().enumerate() {
            if !row.onset.is_finite() || row.onset < 0.0 {
                return Err(ConfigError::BadOnset {
                    index,
                    onset: row.onset,
                });
            }
            if row.onset < prev {
                return Err(ConfigError::NonMonotonicOnset {
                    index,
                    onset: row.onset,
                    prev,
                });
            }
            prev = row.onset;
        }
        Ok(Self { rows })
    }

    /// Parse a timeline from a JSON array of row objects. Rows missing the
    /// `onset` or `event_name` column fail here, before any run starts.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let rows: Vec<Row> =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        Self::new(rows)
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl TryFrom<Vec<Row>> for Timeline {
    type Error = ConfigError;

    fn try_from(rows: Vec<Row>) -> Result<Self, Self::Error> {
        Timeline::new(rows)
    }
}

impl From<Timeline> for Vec<Row> {
    fn from(timeline: Timeline) -> Self {
        timeline.rows
    }
}
