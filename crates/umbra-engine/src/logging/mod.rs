//! Logging setup.
//!
//! The engine logs through the `log` facade; this module installs
//! `env_logger` as the backend for hosts that want one.

mod init;

pub use init::{init_logging, LoggingConfig, DEFAULT_FILTER};
