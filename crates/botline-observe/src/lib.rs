//! Logging and trace export setup for hosts embedding Botline.

pub mod tracing_setup;
