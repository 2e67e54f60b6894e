//! SM2 Common
//!
//! Shared utilities for the SM2 key and certificate engine.
//!
//! This crate provides:
//! - Component-based structured logging with instance context
//! - Process-level logging configuration on top of `env_logger`

pub mod logging;

pub use logging::{Component, LogLevel, Logger, LoggingConfig};
