//! Locator-addressed CRUD entry point for stations.
//!
//! # Responsibility
//! - Classify locators and reject unrecognized ones before any statement.
//! - Delegate statements to the station repository on the store connection.
//! - Bind read results to their locator and publish changes after mutations.
//!
//! # Invariants
//! - Reads are capped at `ProviderConfig::result_limit`.
//! - Item-scoped updates bind the locator id; it is never spliced into SQL.
//! - Notifications are published only after a mutation succeeded.

use crate::config::{ConfigError, ProviderConfig};
use crate::cursor::StationCursor;
use crate::db::seed::StationSeeder;
use crate::db::{DbError, DbResult, StationStore};
use crate::model::station::{StationId, StationValues};
use crate::notify::ChangeNotifier;
use crate::repo::station_repo::{
    RepoError, RepoResult, Selection, SqliteStationRepository, StationQuery, StationRepository,
};
use crate::uri::{UriMatch, UriRouter};
use log::{debug, error, info};
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Arc, MutexGuard};
use std::time::Instant;

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Request-level failure.
#[derive(Debug)]
pub enum ProviderError {
    /// Locator matches neither the collection nor the item pattern.
    UnknownUri(String),
    InvalidArgument(String),
    /// Engine reported no valid generated id for an insert.
    InsertFailed(String),
    Db(DbError),
}

impl Display for ProviderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownUri(uri) => write!(f, "unknown URI {uri}"),
            Self::InvalidArgument(message) => write!(f, "invalid argument: {message}"),
            Self::InsertFailed(uri) => write!(f, "failed to insert row into {uri}"),
            Self::Db(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ProviderError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::UnknownUri(_) | Self::InvalidArgument(_) | Self::InsertFailed(_) => None,
        }
    }
}

impl From<RepoError> for ProviderError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::InvalidArgument(message) => Self::InvalidArgument(message),
            RepoError::Db(err) => Self::Db(err),
        }
    }
}

impl From<DbError> for ProviderError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

/// Station content provider over one lazily opened store.
pub struct StationProvider {
    config: ProviderConfig,
    store: StationStore,
    router: UriRouter,
    notifier: Arc<ChangeNotifier>,
}

impl StationProvider {
    /// Creates a provider over the configured database file.
    ///
    /// The file is not touched until the first request.
    pub fn new(
        config: ProviderConfig,
        seeder: impl StationSeeder + Send + Sync + 'static,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let store = StationStore::new(
            config.database_path.clone(),
            config.table_name.clone(),
            config.schema_version,
            seeder,
        );
        Ok(Self::with_store(config, store))
    }

    /// Creates a provider over a private in-memory database.
    pub fn in_memory(
        config: ProviderConfig,
        seeder: impl StationSeeder + Send + Sync + 'static,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let store = StationStore::in_memory(
            config.table_name.clone(),
            config.schema_version,
            seeder,
        );
        Ok(Self::with_store(config, store))
    }

    fn with_store(config: ProviderConfig, store: StationStore) -> Self {
        let router = UriRouter::new(config.authority.clone(), config.table_name.clone());
        Self {
            config,
            store,
            router,
            notifier: Arc::new(ChangeNotifier::new()),
        }
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    pub fn store(&self) -> &StationStore {
        &self.store
    }

    pub fn router(&self) -> &UriRouter {
        &self.router
    }

    pub fn notifier(&self) -> &Arc<ChangeNotifier> {
        &self.notifier
    }

    /// Locator of the whole station collection.
    pub fn collection_uri(&self) -> &str {
        self.router.collection_uri()
    }

    /// Returns the content type tag for a collection or item locator.
    pub fn get_type(&self, uri: &str) -> ProviderResult<&'static str> {
        Ok(self.classify(uri)?.content_type())
    }

    /// Runs a capped read and binds the result to `uri` for change tracking.
    ///
    /// The locator is not classified; an item locator reads like the
    /// collection unless the selection narrows it.
    pub fn query(&self, uri: &str, query: &StationQuery) -> ProviderResult<StationCursor> {
        let started_at = Instant::now();
        let result = self.run_repo(self.store.readable(), |repo| {
            repo.query(query, self.config.result_limit)
        });

        match result {
            Ok(mut cursor) => {
                cursor.set_notification(self.notifier.subscribe(uri, true));
                debug!(
                    "event=station_query module=provider status=ok rows={} duration_ms={}",
                    cursor.count(),
                    started_at.elapsed().as_millis()
                );
                Ok(cursor)
            }
            Err(err) => Err(log_failure("station_query", err)),
        }
    }

    /// Inserts one row into the collection and returns its item locator.
    pub fn insert(&self, uri: &str, values: &StationValues) -> ProviderResult<String> {
        if self.router.classify(uri) != Some(UriMatch::Collection) {
            return Err(log_failure(
                "station_insert",
                ProviderError::UnknownUri(uri.to_string()),
            ));
        }
        if values.is_empty() {
            return Err(log_failure(
                "station_insert",
                ProviderError::InvalidArgument("values should not be empty".to_string()),
            ));
        }

        let row_id = self
            .run_repo(self.store.writable(), |repo| repo.insert(values))
            .and_then(|row_id| check_generated_id(row_id, uri))
            .map_err(|err| log_failure("station_insert", err))?;

        let item_uri = self.router.item_uri(row_id);
        self.notifier.notify_change(&item_uri);
        info!("event=station_insert module=provider status=ok id={row_id}");
        Ok(item_uri)
    }

    /// Updates rows under `uri` and returns the affected count.
    ///
    /// An item locator narrows `selection` to that row id.
    pub fn update(
        &self,
        uri: &str,
        values: &StationValues,
        selection: &Selection,
    ) -> ProviderResult<usize> {
        let selection = match self.classify(uri)? {
            UriMatch::Collection => selection.clone(),
            UriMatch::Item(id) => selection.clone().and_id(id),
        };

        let count = self
            .run_repo(self.store.writable(), |repo| repo.update(values, &selection))
            .map_err(|err| log_failure("station_update", err))?;

        self.notifier.notify_change(uri);
        info!("event=station_update module=provider status=ok rows={count}");
        Ok(count)
    }

    /// Deletes rows matching `selection` across the whole table.
    ///
    /// The locator is not classified and does not scope the statement; it
    /// only names what observers are told changed.
    pub fn delete(&self, uri: &str, selection: &Selection) -> ProviderResult<usize> {
        let count = self
            .run_repo(self.store.writable(), |repo| repo.delete(selection))
            .map_err(|err| log_failure("station_delete", err))?;

        self.notifier.notify_change(uri);
        info!("event=station_delete module=provider status=ok rows={count}");
        Ok(count)
    }

    /// Runs `op` against the station table once the store connection is held.
    fn run_repo<T>(
        &self,
        conn: DbResult<MutexGuard<'_, Connection>>,
        op: impl FnOnce(&SqliteStationRepository<'_>) -> RepoResult<T>,
    ) -> ProviderResult<T> {
        let conn = conn?;
        let repo = SqliteStationRepository::new(&conn, self.store.table());
        let result = op(&repo);
        Ok(result?)
    }

    fn classify(&self, uri: &str) -> ProviderResult<UriMatch> {
        self.router
            .classify(uri)
            .ok_or_else(|| ProviderError::UnknownUri(uri.to_string()))
    }
}

fn log_failure(event: &str, err: ProviderError) -> ProviderError {
    error!(
        "event={event} module=provider status=error error_code={} error={err}",
        error_code(&err)
    );
    err
}

/// Accepts only positive engine-generated ids.
pub fn check_generated_id(row_id: StationId, uri: &str) -> ProviderResult<StationId> {
    if row_id > 0 {
        Ok(row_id)
    } else {
        Err(ProviderError::InsertFailed(uri.to_string()))
    }
}

fn error_code(err: &ProviderError) -> &'static str {
    match err {
        ProviderError::UnknownUri(_) => "unknown_uri",
        ProviderError::InvalidArgument(_) => "invalid_argument",
        ProviderError::InsertFailed(_) => "insert_failed",
        ProviderError::Db(_) => "db_error",
    }
}

#[cfg(test)]
mod tests {
    use super::{check_generated_id, error_code, ProviderError};
    use crate::db::DbError;

    #[test]
    fn generated_id_must_be_positive() {
        assert_eq!(check_generated_id(1, "content://a/stations").unwrap(), 1);
        for row_id in [0, -1] {
            let err = check_generated_id(row_id, "content://a/stations").unwrap_err();
            assert!(matches!(err, ProviderError::InsertFailed(uri) if uri == "content://a/stations"));
        }
    }

    #[test]
    fn store_failures_carry_db_error_code() {
        let err = ProviderError::from(DbError::InvalidTableName("x y".to_string()));
        assert_eq!(error_code(&err), "db_error");
    }
}
