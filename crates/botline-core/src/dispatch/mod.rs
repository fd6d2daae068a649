//! Dispatch abstractions for Botline.
//!
//! This module defines the transport capability and the gateway that routes
//! a prompt to it:
//! - `Transport`: RPITIT trait for concrete transport strategies
//! - `BoxTransport`: Object-safe wrapper for dynamic dispatch
//! - `DispatchGateway`: Platform-keyed router with cancellation

pub mod box_transport;
pub mod gateway;
pub mod transport;
