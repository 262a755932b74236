//! Baseline row seeding collaborator.
//!
//! The seeder runs once, right after the station table is created (first
//! open or destructive version bump). Its failures never abort table
//! creation; the lifecycle step logs and swallows them.

use crate::model::station::NewStation;
use rusqlite::{params, Connection};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Error reported by a seeder.
#[derive(Debug)]
pub enum SeedError {
    Sqlite(rusqlite::Error),
    Source(String),
}

impl Display for SeedError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::Source(message) => write!(f, "seed source failed: {message}"),
        }
    }
}

impl Error for SeedError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::Source(_) => None,
        }
    }
}

impl From<rusqlite::Error> for SeedError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

/// Populates initial rows into a freshly created station table.
pub trait StationSeeder {
    fn seed(&self, conn: &Connection, table: &str) -> Result<(), SeedError>;
}

impl<F> StationSeeder for F
where
    F: Fn(&Connection, &str) -> Result<(), SeedError>,
{
    fn seed(&self, conn: &Connection, table: &str) -> Result<(), SeedError> {
        self(conn, table)
    }
}

/// Seeder that leaves the table empty.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSeed;

impl StationSeeder for NoSeed {
    fn seed(&self, _conn: &Connection, _table: &str) -> Result<(), SeedError> {
        Ok(())
    }
}

/// Seeder inserting a fixed list of stations.
#[derive(Debug, Clone, Default)]
pub struct FixedSeed {
    stations: Vec<NewStation>,
}

impl FixedSeed {
    pub fn new(stations: Vec<NewStation>) -> Self {
        Self { stations }
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }
}

impl StationSeeder for FixedSeed {
    fn seed(&self, conn: &Connection, table: &str) -> Result<(), SeedError> {
        // `table` was checked as a plain identifier before the lifecycle step ran.
        let mut stmt = conn.prepare(&format!(
            "INSERT INTO {table} (code, lat, lon, label) VALUES (?1, ?2, ?3, ?4);"
        ))?;
        for station in &self.stations {
            stmt.execute(params![
                station.code,
                station.lat,
                station.lon,
                station.label.as_deref(),
            ])?;
        }
        Ok(())
    }
}
