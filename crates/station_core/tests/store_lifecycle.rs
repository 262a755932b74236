use rusqlite::Connection;
use station_core::db::schema::stored_version;
use station_core::db::{open_store, open_store_in_memory, DbError, SeedError};
use station_core::{
    FixedSeed, NewStation, NoSeed, ProviderConfig, StationProvider, StationQuery, StationValues,
};

fn baseline() -> FixedSeed {
    FixedSeed::new(vec![
        NewStation::new(2193, 42.6977, 23.3219).with_label("Sofia University"),
        NewStation::new(1287, 42.6842, 23.3190).with_label("NDK"),
    ])
}

#[test]
fn fresh_database_gets_table_and_seed_rows() {
    let conn = open_store_in_memory("stations", 1, &baseline()).unwrap();

    assert_eq!(stored_version(&conn).unwrap(), 1);
    assert_eq!(
        table_columns(&conn, "stations"),
        vec!["id", "code", "lat", "lon", "label"]
    );
    assert_eq!(row_count(&conn, "stations"), 2);
}

#[test]
fn reopening_same_version_keeps_rows() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("station.db");

    let conn = open_store(&path, "stations", 1, &baseline()).unwrap();
    conn.execute(
        "INSERT INTO stations (code, lat, lon, label) VALUES (7, 1.0, 2.0, 'extra');",
        [],
    )
    .unwrap();
    drop(conn);

    let reopened = open_store(&path, "stations", 1, &baseline()).unwrap();
    assert_eq!(row_count(&reopened, "stations"), 3);
}

#[test]
fn version_bump_drops_rows_and_reseeds() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("station.db");

    let conn = open_store(&path, "stations", 1, &baseline()).unwrap();
    conn.execute("INSERT INTO stations (code) VALUES (1), (2), (3);", [])
        .unwrap();
    assert_eq!(row_count(&conn, "stations"), 5);
    drop(conn);

    let upgraded = open_store(&path, "stations", 2, &baseline()).unwrap();
    assert_eq!(stored_version(&upgraded).unwrap(), 2);
    assert_eq!(row_count(&upgraded, "stations"), 2);

    let labels = labels(&upgraded);
    assert_eq!(labels, vec!["NDK".to_string(), "Sofia University".to_string()]);
}

#[test]
fn older_requested_version_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 9;").unwrap();
    drop(conn);

    let err = open_store(&path, "stations", 1, &NoSeed).unwrap_err();
    match err {
        DbError::UnsupportedSchemaVersion {
            db_version,
            requested,
        } => {
            assert_eq!(db_version, 9);
            assert_eq!(requested, 1);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn version_beyond_user_version_range_is_rejected_every_time() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("station.db");

    for _ in 0..2 {
        let err = open_store(&path, "stations", 3_000_000_000, &NoSeed).unwrap_err();
        assert!(matches!(err, DbError::InvalidSchemaVersion(3_000_000_000)));
    }

    let conn = open_store(&path, "stations", 1, &NoSeed).unwrap();
    assert_eq!(stored_version(&conn).unwrap(), 1);
}

#[test]
fn failing_seeder_leaves_table_in_place() {
    let half_then_fail = |conn: &Connection, table: &str| -> Result<(), SeedError> {
        conn.execute(&format!("INSERT INTO {table} (code) VALUES (1);"), [])?;
        Err(SeedError::Source("station feed unavailable".to_string()))
    };

    let conn = open_store_in_memory("stations", 1, &half_then_fail).unwrap();
    assert_eq!(stored_version(&conn).unwrap(), 1);
    assert_eq!(row_count(&conn, "stations"), 1);
}

#[test]
fn custom_table_name_is_honoured() {
    let conn = open_store_in_memory("stops", 1, &baseline()).unwrap();
    assert_eq!(row_count(&conn, "stops"), 2);
}

#[test]
fn invalid_table_name_is_rejected_before_any_statement() {
    let err = open_store_in_memory("stations; DROP TABLE x", 1, &NoSeed).unwrap_err();
    assert!(matches!(err, DbError::InvalidTableName(_)));
}

#[test]
fn file_backed_provider_reseeds_after_version_bump() {
    let dir = tempfile::tempdir().unwrap();
    let config = ProviderConfig {
        database_path: dir.path().join("station.db"),
        ..ProviderConfig::default()
    };

    {
        let provider = StationProvider::new(config.clone(), baseline()).unwrap();
        assert!(!provider.store().is_open());
        let collection = provider.collection_uri().to_string();
        provider
            .insert(&collection, &StationValues::new().code(99).label("temporary"))
            .unwrap();
        let cursor = provider.query(&collection, &StationQuery::new()).unwrap();
        assert_eq!(cursor.count(), 3);
    }

    let upgraded = ProviderConfig {
        schema_version: 2,
        ..config
    };
    let provider = StationProvider::new(upgraded, baseline()).unwrap();
    let collection = provider.collection_uri().to_string();
    let mut cursor = provider.query(&collection, &StationQuery::new()).unwrap();
    let codes: Vec<_> = cursor.stations().into_iter().map(|s| s.code).collect();
    assert_eq!(codes, vec![Some(2193), Some(1287)]);
}

fn row_count(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table};"), [], |row| {
        row.get(0)
    })
    .unwrap()
}

fn labels(conn: &Connection) -> Vec<String> {
    let mut stmt = conn
        .prepare("SELECT label FROM stations ORDER BY label;")
        .unwrap();
    let labels = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .unwrap()
        .map(Result::unwrap)
        .collect();
    labels
}

fn table_columns(conn: &Connection, table: &str) -> Vec<String> {
    let mut stmt = conn
        .prepare(&format!("PRAGMA table_info({table});"))
        .unwrap();
    let mut rows = stmt.query([]).unwrap();
    let mut columns = Vec::new();
    while let Some(row) = rows.next().unwrap() {
        columns.push(row.get::<_, String>(1).unwrap());
    }
    columns
}
