//! Repository layer over the station table.
//!
//! # Responsibility
//! - Build and run parameter-bound SQL for station reads and mutations.
//! - Keep SQLite details out of the provider layer.
//!
//! # Invariants
//! - Repository statements never interpolate caller values or row ids.

pub mod station_repo;
