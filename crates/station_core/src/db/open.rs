//! Connection bootstrap for the station store.
//!
//! # Responsibility
//! - Open file or in-memory SQLite connections.
//! - Run the table lifecycle step before returning a usable connection.
//! - Hold one lazily opened connection for the lifetime of a store.
//!
//! # Invariants
//! - Returned connections have the station table at the requested version.
//! - A `StationStore` opens its connection at most once.

use super::schema::{ensure_schema, LifecycleAction};
use super::seed::StationSeeder;
use super::DbResult;
use log::{error, info};
use once_cell::sync::OnceCell;
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Opens a SQLite database file and brings the station table to `version`.
///
/// # Side effects
/// - May create, seed or drop-and-recreate the station table.
/// - Emits `store_open` logging events with duration and status.
pub fn open_store(
    path: impl AsRef<Path>,
    table: &str,
    version: u32,
    seeder: &dyn StationSeeder,
) -> DbResult<Connection> {
    open_with("file", || Connection::open(path), table, version, seeder)
}

/// Opens an in-memory SQLite database with a fresh station table.
pub fn open_store_in_memory(
    table: &str,
    version: u32,
    seeder: &dyn StationSeeder,
) -> DbResult<Connection> {
    open_with("memory", Connection::open_in_memory, table, version, seeder)
}

fn open_with(
    mode: &str,
    open: impl FnOnce() -> rusqlite::Result<Connection>,
    table: &str,
    version: u32,
    seeder: &dyn StationSeeder,
) -> DbResult<Connection> {
    let started_at = Instant::now();
    info!("event=store_open module=db status=start mode={mode}");

    let mut conn = match open() {
        Ok(conn) => conn,
        Err(err) => {
            error!(
                "event=store_open module=db status=error mode={mode} duration_ms={} error_code=db_open_failed error={err}",
                started_at.elapsed().as_millis()
            );
            return Err(err.into());
        }
    };

    match bootstrap_connection(&mut conn, table, version, seeder) {
        Ok(action) => {
            info!(
                "event=store_open module=db status=ok mode={mode} duration_ms={} lifecycle={action:?}",
                started_at.elapsed().as_millis()
            );
            Ok(conn)
        }
        Err(err) => {
            error!(
                "event=store_open module=db status=error mode={mode} duration_ms={} error_code=db_bootstrap_failed error={err}",
                started_at.elapsed().as_millis()
            );
            Err(err)
        }
    }
}

fn bootstrap_connection(
    conn: &mut Connection,
    table: &str,
    version: u32,
    seeder: &dyn StationSeeder,
) -> DbResult<LifecycleAction> {
    conn.busy_timeout(Duration::from_secs(5))?;
    ensure_schema(conn, table, version, seeder)
}

#[derive(Debug, Clone)]
enum StoreTarget {
    File(PathBuf),
    Memory,
}

/// Owned handle to the station database, opened on first use.
///
/// The readable and writable accessors hand out the same connection; SQLite
/// serializes writers, and the mutex keeps the handle shareable across
/// threads.
pub struct StationStore {
    target: StoreTarget,
    table: String,
    version: u32,
    seeder: Box<dyn StationSeeder + Send + Sync>,
    conn: OnceCell<Mutex<Connection>>,
}

impl StationStore {
    pub fn new(
        path: impl Into<PathBuf>,
        table: impl Into<String>,
        version: u32,
        seeder: impl StationSeeder + Send + Sync + 'static,
    ) -> Self {
        Self::with_target(StoreTarget::File(path.into()), table, version, seeder)
    }

    pub fn in_memory(
        table: impl Into<String>,
        version: u32,
        seeder: impl StationSeeder + Send + Sync + 'static,
    ) -> Self {
        Self::with_target(StoreTarget::Memory, table, version, seeder)
    }

    fn with_target(
        target: StoreTarget,
        table: impl Into<String>,
        version: u32,
        seeder: impl StationSeeder + Send + Sync + 'static,
    ) -> Self {
        Self {
            target,
            table: table.into(),
            version,
            seeder: Box::new(seeder),
            conn: OnceCell::new(),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// Returns whether the connection has been opened yet.
    pub fn is_open(&self) -> bool {
        self.conn.get().is_some()
    }

    /// Connection for read statements.
    pub fn readable(&self) -> DbResult<MutexGuard<'_, Connection>> {
        self.connection()
    }

    /// Connection for mutating statements.
    pub fn writable(&self) -> DbResult<MutexGuard<'_, Connection>> {
        self.connection()
    }

    fn connection(&self) -> DbResult<MutexGuard<'_, Connection>> {
        let cell = self.conn.get_or_try_init(|| -> DbResult<Mutex<Connection>> {
            let seeder: &dyn StationSeeder = self.seeder.as_ref();
            let conn = match &self.target {
                StoreTarget::File(path) => open_store(path, &self.table, self.version, seeder)?,
                StoreTarget::Memory => open_store_in_memory(&self.table, self.version, seeder)?,
            };
            Ok(Mutex::new(conn))
        })?;
        Ok(cell.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

#[cfg(test)]
mod tests {
    use super::StationStore;
    use crate::db::seed::NoSeed;

    #[test]
    fn store_opens_lazily_and_once() {
        let store = StationStore::in_memory("stations", 1, NoSeed);
        assert!(!store.is_open());

        store
            .writable()
            .unwrap()
            .execute("INSERT INTO stations (code) VALUES (7);", [])
            .unwrap();
        assert!(store.is_open());

        let count: i64 = store
            .readable()
            .unwrap()
            .query_row("SELECT COUNT(*) FROM stations;", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn invalid_table_name_fails_on_first_use() {
        let store = StationStore::in_memory("bad name", 1, NoSeed);
        assert!(store.readable().is_err());
        assert!(!store.is_open());
    }
}
