//! Infrastructure layer for Botline.
//!
//! Contains implementations of the ports defined in `botline-core`: the
//! SQLite key-value store, the three backend transports, and config file
//! loading with data-directory resolution.

pub mod config;
pub mod sqlite;
pub mod transport;
