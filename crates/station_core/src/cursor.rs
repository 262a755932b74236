//! Materialized read results.
//!
//! A cursor starts positioned before the first row. When the provider binds
//! it to a locator, it also carries a change subscription so the holder can
//! ask whether data under that locator changed since the read.

use crate::model::station::{Station, StationColumn};
use crate::notify::Subscription;
use rusqlite::types::Value;

pub struct StationCursor {
    columns: Vec<StationColumn>,
    rows: Vec<Vec<Value>>,
    // -1 is before first, rows.len() is after last.
    position: isize,
    notification: Option<Subscription>,
}

impl StationCursor {
    pub(crate) fn new(columns: Vec<StationColumn>, rows: Vec<Vec<Value>>) -> Self {
        Self {
            columns,
            rows,
            position: -1,
            notification: None,
        }
    }

    pub(crate) fn set_notification(&mut self, subscription: Subscription) {
        self.notification = Some(subscription);
    }

    /// Columns of every row, in projection order.
    pub fn columns(&self) -> &[StationColumn] {
        &self.columns
    }

    pub fn count(&self) -> usize {
        self.rows.len()
    }

    pub fn position(&self) -> isize {
        self.position
    }

    pub fn is_before_first(&self) -> bool {
        self.rows.is_empty() || self.position < 0
    }

    pub fn is_after_last(&self) -> bool {
        self.rows.is_empty() || self.position >= self.row_count()
    }

    /// Advances to the next row. Returns `false` once past the last row.
    pub fn move_to_next(&mut self) -> bool {
        if self.position < self.row_count() {
            self.position += 1;
        }
        self.position < self.row_count()
    }

    pub fn move_to_first(&mut self) -> bool {
        self.position = 0;
        !self.rows.is_empty()
    }

    pub fn column_index(&self, column: StationColumn) -> Option<usize> {
        self.columns.iter().position(|candidate| *candidate == column)
    }

    /// Value of `column` in the current row.
    ///
    /// `None` when the cursor is not on a row or the column is not projected.
    pub fn get(&self, column: StationColumn) -> Option<&Value> {
        let index = self.column_index(column)?;
        self.current_row()?.get(index)
    }

    pub fn get_i64(&self, column: StationColumn) -> Option<i64> {
        match self.get(column)? {
            Value::Integer(value) => Some(*value),
            _ => None,
        }
    }

    pub fn get_f64(&self, column: StationColumn) -> Option<f64> {
        match self.get(column)? {
            Value::Real(value) => Some(*value),
            Value::Integer(value) => Some(*value as f64),
            _ => None,
        }
    }

    pub fn get_str(&self, column: StationColumn) -> Option<&str> {
        match self.get(column)? {
            Value::Text(value) => Some(value.as_str()),
            _ => None,
        }
    }

    /// Decodes the current row; requires `id` in the projection.
    pub fn station(&self) -> Option<Station> {
        Some(Station {
            id: self.get_i64(StationColumn::Id)?,
            code: self.get_i64(StationColumn::Code),
            lat: self.get_f64(StationColumn::Lat),
            lon: self.get_f64(StationColumn::Lon),
            label: self.get_str(StationColumn::Label).map(str::to_string),
        })
    }

    /// Decodes every remaining row, advancing to the end.
    pub fn stations(&mut self) -> Vec<Station> {
        let mut stations = Vec::new();
        while self.move_to_next() {
            if let Some(station) = self.station() {
                stations.push(station);
            }
        }
        stations
    }

    /// Locator this cursor watches, if it was bound to one.
    pub fn notification_uri(&self) -> Option<&str> {
        self.notification.as_ref().map(Subscription::uri)
    }

    /// Returns how many changes were published under the bound locator since
    /// the last call.
    pub fn take_changes(&self) -> usize {
        self.notification.as_ref().map_or(0, Subscription::drain)
    }

    fn current_row(&self) -> Option<&Vec<Value>> {
        usize::try_from(self.position)
            .ok()
            .and_then(|index| self.rows.get(index))
    }

    fn row_count(&self) -> isize {
        isize::try_from(self.rows.len()).unwrap_or(isize::MAX)
    }
}

impl std::fmt::Debug for StationCursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StationCursor")
            .field("columns", &self.columns)
            .field("count", &self.rows.len())
            .field("position", &self.position)
            .field("notification_uri", &self.notification_uri())
            .finish()
    }
}
