//! Shared domain types for Botline.
//!
//! This crate contains the core domain types used across the Botline workspace:
//! bot descriptors and platforms, chat messages, configuration, and the error
//! taxonomy shared by the dispatch and storage layers.
//!
//! Zero infrastructure dependencies -- only serde and thiserror.

pub mod bot;
pub mod config;
pub mod error;
pub mod message;
