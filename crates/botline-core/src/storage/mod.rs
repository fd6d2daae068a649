//! Storage abstractions for Botline.
//!
//! Defines the key-value store port plus an in-memory implementation used
//! by tests and by hosts that do not need durability.
//! Durable implementations live in botline-infra.

pub mod kv_store;
pub mod memory;
