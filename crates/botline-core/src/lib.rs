//! Conversation dispatch and session lifecycle for Botline.
//!
//! This crate defines the "ports" the infrastructure layer implements
//! (`KvStore`, `Transport`) and the logic built on top of them: the session
//! store, prompt catalog, dispatch gateway and session controller. It depends
//! only on `botline-types` -- never on `botline-infra` or any database/IO crate.

pub mod dispatch;
pub mod prompt;
pub mod session;
pub mod storage;

#[cfg(test)]
pub(crate) mod testing;
