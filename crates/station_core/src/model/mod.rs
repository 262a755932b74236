//! Station domain model.
//!
//! # Responsibility
//! - Define the single flat station entity and its fixed column set.
//! - Provide typed value sets for insert/update requests.
//!
//! # Invariants
//! - `id` is assigned by storage at insert time and never written by callers.
//! - No relationships exist between stations.

pub mod station;
