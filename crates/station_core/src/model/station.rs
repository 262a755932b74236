//! Station entity, column allow-list and value sets.
//!
//! # Invariants
//! - `StationColumn::ALL` is the complete projection allow-list.
//! - `StationValues` never carries unknown columns.
//! - No range validation is applied to coordinates or label length.

use rusqlite::types::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

/// Storage-assigned row identifier.
pub type StationId = i64;

/// Declared width of the `label` column.
pub const LABEL_MAX_CHARS: usize = 50;

/// One column of the station table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StationColumn {
    Id,
    Code,
    Lat,
    Lon,
    Label,
}

impl StationColumn {
    /// Allow-listed columns in table order.
    pub const ALL: [StationColumn; 5] = [
        StationColumn::Id,
        StationColumn::Code,
        StationColumn::Lat,
        StationColumn::Lon,
        StationColumn::Label,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Code => "code",
            Self::Lat => "lat",
            Self::Lon => "lon",
            Self::Label => "label",
        }
    }

    /// Looks up an allow-listed column by its exact name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|column| column.as_str() == name)
    }
}

impl Display for StationColumn {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored station row.
///
/// Non-id columns are nullable in the table, so they are optional here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Station {
    pub id: StationId,
    pub code: Option<i64>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub label: Option<String>,
}

/// A station to be inserted, without an id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewStation {
    pub code: i64,
    pub lat: f64,
    pub lon: f64,
    pub label: Option<String>,
}

impl NewStation {
    pub fn new(code: i64, lat: f64, lon: f64) -> Self {
        Self {
            code,
            lat,
            lon,
            label: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Converts into the value set used by insert requests.
    pub fn to_values(&self) -> StationValues {
        let values = StationValues::new()
            .code(self.code)
            .lat(self.lat)
            .lon(self.lon);
        match &self.label {
            Some(label) => values.label(label.as_str()),
            None => values.put(StationColumn::Label, Value::Null),
        }
    }
}

/// Column values for insert and update requests.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StationValues {
    values: BTreeMap<StationColumn, Value>,
}

impl StationValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn code(self, code: i64) -> Self {
        self.put(StationColumn::Code, code)
    }

    pub fn lat(self, lat: f64) -> Self {
        self.put(StationColumn::Lat, lat)
    }

    pub fn lon(self, lon: f64) -> Self {
        self.put(StationColumn::Lon, lon)
    }

    pub fn label(self, label: impl Into<String>) -> Self {
        self.put(StationColumn::Label, label.into())
    }

    /// Sets one column; a later call for the same column wins.
    pub fn put(mut self, column: StationColumn, value: impl Into<Value>) -> Self {
        self.values.insert(column, value.into());
        self
    }

    pub fn get(&self, column: StationColumn) -> Option<&Value> {
        self.values.get(&column)
    }

    pub fn contains(&self, column: StationColumn) -> bool {
        self.values.contains_key(&column)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterates columns in table order.
    pub fn iter(&self) -> impl Iterator<Item = (StationColumn, &Value)> {
        self.values.iter().map(|(column, value)| (*column, value))
    }
}
