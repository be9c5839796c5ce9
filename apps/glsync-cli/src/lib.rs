//! glsync CLI library
//!
//! Exposes the configuration, error and output modules so integration tests
//! can drive them without spawning the binary.

pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod output;
