//! Transit station store.
//!
//! A URI-addressed CRUD provider over one SQLite table of stations: locator
//! routing, parameter-bound statements and change notification.

pub mod config;
pub mod cursor;
pub mod db;
pub mod logging;
pub mod model;
pub mod notify;
pub mod repo;
pub mod service;
pub mod uri;

pub use config::{load_config, ConfigError, ProviderConfig};
pub use cursor::StationCursor;
pub use db::{DbError, FixedSeed, NoSeed, SeedError, StationSeeder, StationStore};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::station::{NewStation, Station, StationColumn, StationId, StationValues};
pub use notify::{ChangeNotifier, ChangeObserver, ObserverId, Subscription};
pub use repo::station_repo::{
    RepoError, RepoResult, Selection, SqliteStationRepository, StationQuery, StationRepository,
};
pub use service::station_provider::{ProviderError, ProviderResult, StationProvider};
pub use uri::{UriMatch, UriRouter, COLLECTION_CONTENT_TYPE, ITEM_CONTENT_TYPE};

/// Returns the crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
