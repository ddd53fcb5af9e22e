use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::span::Position;

/// Kind of a metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    /// Monotonically increasing value.
    Counter,
    /// Arbitrary value, may go up or down.
    Gauge,
    /// Duration-valued.
    Timer,
}

/// Type of the value stored in a metric's datum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatumType {
    Int,
    Float,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatumValue {
    Int(i64),
    Float(f64),
}

/// The mutable current value container for one label combination of a
/// metric, with the unix timestamp (seconds) of its last update.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Datum {
    pub value: DatumValue,
    pub time: i64,
}

impl Datum {
    /// A fresh datum holding the zero value of `dtype` at time zero.
    pub fn new(dtype: DatumType) -> Self {
        let value = match dtype {
            DatumType::Int => DatumValue::Int(0),
            DatumType::Float => DatumValue::Float(0.0),
        };
        Self { value, time: 0 }
    }

    pub fn set_int(&mut self, value: i64, time: i64) {
        self.value = DatumValue::Int(value);
        self.time = time;
    }

    pub fn set_float(&mut self, value: f64, time: i64) {
        self.value = DatumValue::Float(value);
        self.time = time;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MetricError {
    #[error("metric {0} is dimensioned by {1} label keys; a bare datum cannot be materialized")]
    Dimensioned(String, usize),
}

/// An exported metric: name, owning program, kind, datum type and the
/// ordered label keys that dimension it.
///
/// Created exactly once per declaration at code generation time; the
/// metric pool index it is appended at becomes its symbol's address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub name: String,
    pub program: String,
    pub kind: MetricKind,
    pub datum_type: DatumType,
    pub keys: Vec<String>,
    pub hidden: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Position>,
    /// Storage for the label-less datum. Dimensioned metrics materialize
    /// one datum per label combination at match time, outside this crate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    datum: Option<Datum>,
}

impl Metric {
    pub fn new(
        name: impl Into<String>,
        program: impl Into<String>,
        kind: MetricKind,
        datum_type: DatumType,
        keys: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            program: program.into(),
            kind,
            datum_type,
            keys,
            hidden: false,
            source: None,
            datum: None,
        }
    }

    /// Record the source position of the declaration that created this
    /// metric.
    pub fn set_source(&mut self, pos: Position) {
        self.source = Some(pos);
    }

    /// Materialize the label-less datum, creating it on first access.
    ///
    /// Fails for dimensioned metrics: their label values are unknown
    /// until real data arrives.
    pub fn get_datum(&mut self) -> Result<&mut Datum, MetricError> {
        if !self.keys.is_empty() {
            return Err(MetricError::Dimensioned(self.name.clone(), self.keys.len()));
        }
        Ok(self.datum.get_or_insert(Datum::new(self.datum_type)))
    }

    /// The materialized label-less datum, if any.
    pub fn datum(&self) -> Option<&Datum> {
        self.datum.as_ref()
    }
}
