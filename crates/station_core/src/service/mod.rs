//! Request-level services.
//!
//! # Responsibility
//! - Route locator-addressed requests onto repository statements.
//! - Publish change notifications after successful mutations.

pub mod station_provider;
