//! Station table definition and version lifecycle.
//!
//! # Responsibility
//! - Own the fixed five-column station layout.
//! - Create the table and run the seeder on a fresh database.
//! - Drop and recreate the table when the requested version is newer.
//!
//! # Invariants
//! - `PRAGMA user_version` mirrors the last applied requested version.
//! - Downgrades are rejected, never applied.
//! - Seeding failures are logged and swallowed; the created table stays.

use crate::db::seed::StationSeeder;
use crate::db::{DbError, DbResult};
use crate::model::station::LABEL_MAX_CHARS;
use log::{error, info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::Connection;

/// Largest version `PRAGMA user_version` can hold (a signed 32-bit value).
pub const MAX_SCHEMA_VERSION: u32 = i32::MAX as u32;

static TABLE_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("table name pattern is valid"));

/// Outcome of one lifecycle check, mainly for logging and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleAction {
    /// Stored version already matched.
    Unchanged,
    /// Fresh database; table created and seeded.
    Created,
    /// Older stored version; table dropped, recreated and seeded.
    Recreated { from_version: u32 },
}

/// Returns whether `name` can be spliced into SQL as a table identifier.
pub fn is_valid_table_name(name: &str) -> bool {
    TABLE_NAME_RE.is_match(name)
}

/// Returns the `CREATE TABLE` statement for the station layout.
pub fn create_table_sql(table: &str) -> String {
    format!(
        "CREATE TABLE {table} (
            id INTEGER PRIMARY KEY,
            code INTEGER,
            lat FLOAT,
            lon FLOAT,
            label VARCHAR({LABEL_MAX_CHARS})
        );"
    )
}

/// Reads the stored schema version.
pub fn stored_version(conn: &Connection) -> DbResult<u32> {
    let version = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    Ok(version)
}

/// Brings the station table to `version`, creating or recreating it.
pub fn ensure_schema(
    conn: &mut Connection,
    table: &str,
    version: u32,
    seeder: &dyn StationSeeder,
) -> DbResult<LifecycleAction> {
    if version < 1 || version > MAX_SCHEMA_VERSION {
        return Err(DbError::InvalidSchemaVersion(version));
    }
    if !is_valid_table_name(table) {
        return Err(DbError::InvalidTableName(table.to_string()));
    }

    let current = stored_version(conn)?;
    if current > version {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: current,
            requested: version,
        });
    }
    if current == version {
        return Ok(LifecycleAction::Unchanged);
    }

    let tx = conn.transaction()?;
    let action = if current == 0 {
        info!("event=store_create module=db status=start table={table} version={version}");
        LifecycleAction::Created
    } else {
        warn!(
            "event=store_upgrade module=db status=start table={table} from_version={current} to_version={version} data_loss=all_rows"
        );
        tx.execute_batch(&format!("DROP TABLE IF EXISTS {table};"))?;
        LifecycleAction::Recreated {
            from_version: current,
        }
    };

    tx.execute_batch(&create_table_sql(table))?;
    match seeder.seed(&tx, table) {
        Ok(()) => info!("event=store_seed module=db status=ok table={table}"),
        Err(err) => error!(
            "event=store_seed module=db status=error table={table} error_code=seed_failed error={err}"
        ),
    }
    tx.execute_batch(&format!("PRAGMA user_version = {version};"))?;
    tx.commit()?;

    Ok(action)
}

#[cfg(test)]
mod tests {
    use super::{
        create_table_sql, ensure_schema, is_valid_table_name, stored_version, LifecycleAction,
        MAX_SCHEMA_VERSION,
    };
    use crate::model::station::LABEL_MAX_CHARS;
    use crate::db::seed::{NoSeed, SeedError};
    use crate::db::DbError;
    use rusqlite::Connection;

    #[test]
    fn table_name_must_be_plain_identifier() {
        assert!(is_valid_table_name("stations"));
        assert!(is_valid_table_name("_stops2"));
        assert!(!is_valid_table_name(""));
        assert!(!is_valid_table_name("2stations"));
        assert!(!is_valid_table_name("stations; DROP TABLE x"));
        assert!(!is_valid_table_name("main.stations"));
    }

    #[test]
    fn fresh_database_is_created_then_unchanged() {
        let mut conn = Connection::open_in_memory().unwrap();

        let first = ensure_schema(&mut conn, "stations", 1, &NoSeed).unwrap();
        assert_eq!(first, LifecycleAction::Created);
        assert_eq!(stored_version(&conn).unwrap(), 1);

        let second = ensure_schema(&mut conn, "stations", 1, &NoSeed).unwrap();
        assert_eq!(second, LifecycleAction::Unchanged);
    }

    #[test]
    fn seeding_failure_keeps_created_table() {
        let mut conn = Connection::open_in_memory().unwrap();
        let failing = |_: &Connection, _: &str| -> Result<(), SeedError> {
            Err(SeedError::Source("fixture missing".to_string()))
        };

        let action = ensure_schema(&mut conn, "stations", 1, &failing).unwrap();
        assert_eq!(action, LifecycleAction::Created);

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM stations;", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
        assert_eq!(stored_version(&conn).unwrap(), 1);
    }

    #[test]
    fn zero_version_is_rejected() {
        let mut conn = Connection::open_in_memory().unwrap();
        let err = ensure_schema(&mut conn, "stations", 0, &NoSeed).unwrap_err();
        assert!(matches!(err, DbError::InvalidSchemaVersion(0)));
    }

    #[test]
    fn version_outside_user_version_range_is_rejected() {
        let mut conn = Connection::open_in_memory().unwrap();
        let too_large = MAX_SCHEMA_VERSION + 1;
        let err = ensure_schema(&mut conn, "stations", too_large, &NoSeed).unwrap_err();
        assert!(matches!(err, DbError::InvalidSchemaVersion(v) if v == too_large));
        assert_eq!(stored_version(&conn).unwrap(), 0);

        ensure_schema(&mut conn, "stations", MAX_SCHEMA_VERSION, &NoSeed).unwrap();
        assert_eq!(stored_version(&conn).unwrap(), MAX_SCHEMA_VERSION);
        assert_eq!(
            ensure_schema(&mut conn, "stations", MAX_SCHEMA_VERSION, &NoSeed).unwrap(),
            LifecycleAction::Unchanged
        );
    }

    #[test]
    fn label_width_follows_model_constant() {
        assert!(create_table_sql("stations").contains(&format!("VARCHAR({LABEL_MAX_CHARS})")));
    }

    #[test]
    fn downgrade_is_rejected() {
        let mut conn = Connection::open_in_memory().unwrap();
        ensure_schema(&mut conn, "stations", 3, &NoSeed).unwrap();

        let err = ensure_schema(&mut conn, "stations", 2, &NoSeed).unwrap_err();
        assert!(matches!(
            err,
            DbError::UnsupportedSchemaVersion {
                db_version: 3,
                requested: 2
            }
        ));
    }
}
