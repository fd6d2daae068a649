//! Session persistence and lifecycle.
//!
//! - `SessionStore`: never-failing mirror of a bot's message list
//! - `MessageIdGenerator`: strictly increasing message ids
//! - `SessionController`: one conversation's state machine

pub mod controller;
pub mod ids;
pub mod store;
