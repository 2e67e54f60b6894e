// Logging utilities for the SM2 engine
//
// This module provides:
// - Component-based structured logging
// - Instance tracking through logger inheritance
// - Operation tracing for builder and verifier calls
// - A small configuration type that installs `env_logger`

use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Arguments, Display, Formatter};

/// Predefined components for logging categorization
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Component {
    Keys,
    Cipher,
    Signer,
    Builder,
    Verifier,
    Storage,
    Custom(&'static str),
}

// Lightweight Display helpers to avoid prefix String allocations
struct ComponentPrefixDisplay {
    parent: Option<Component>,
    component: Component,
}
impl Display for ComponentPrefixDisplay {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.parent {
            Some(parent) => write!(f, "{}.{}", parent.as_str(), self.component.as_str()),
            None => write!(f, "{}", self.component.as_str()),
        }
    }
}

struct MaybeOperationDisplay<'a>(Option<&'a str>);
impl Display for MaybeOperationDisplay<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if let Some(op) = self.0 {
            write!(f, "|op={op}")
        } else {
            Ok(())
        }
    }
}

impl Component {
    /// Get the string representation of the component
    pub fn as_str(&self) -> &str {
        match self {
            Component::Keys => "Keys",
            Component::Cipher => "Cipher",
            Component::Signer => "Signer",
            Component::Builder => "Builder",
            Component::Verifier => "Verifier",
            Component::Storage => "Storage",
            Component::Custom(name) => name,
        }
    }
}

/// A helper for creating component-specific loggers with instance tracking
#[derive(Debug, Clone)]
pub struct Logger {
    /// Component this logger is for
    component: Component,
    /// Identifier of the owning instance (a CA name, a process label, ...)
    instance: String,
    /// Parent component for hierarchical logging (if any)
    parent_component: Option<Component>,
    /// Operation currently being traced
    operation: Option<String>,
}

impl Logger {
    /// Create a new root logger for a specific component and instance
    pub fn new_root(component: Component, instance: &str) -> Self {
        Self {
            component,
            instance: instance.to_string(),
            parent_component: None,
            operation: None,
        }
    }

    /// Create a child logger with the same instance but a different component
    pub fn with_component(&self, component: Component) -> Self {
        Self {
            component,
            instance: self.instance.clone(),
            parent_component: Some(self.component),
            operation: self.operation.clone(),
        }
    }

    /// Create a logger that tags every line with an operation name
    pub fn with_operation(&self, operation: impl Into<String>) -> Self {
        Self {
            component: self.component,
            instance: self.instance.clone(),
            parent_component: self.parent_component,
            operation: Some(operation.into()),
        }
    }

    /// Get a reference to the instance identifier
    pub fn instance(&self) -> &str {
        &self.instance
    }

    /// Get the component this logger reports as
    pub fn component(&self) -> Component {
        self.component
    }

    /// Get a reference to the operation if available
    pub fn operation(&self) -> Option<&str> {
        self.operation.as_deref()
    }

    fn prefix(&self) -> impl Display + '_ {
        PrefixDisplay(self)
    }

    /// Log a debug message
    pub fn debug(&self, message: impl Into<String>) {
        if log::log_enabled!(log::Level::Debug) {
            debug!("[{}][{}] {}", self.instance, self.prefix(), message.into());
        }
    }

    /// Log a debug message using fmt::Arguments (avoids allocating message String)
    pub fn debug_args(&self, args: Arguments) {
        if log::log_enabled!(log::Level::Debug) {
            debug!("[{}][{}] {}", self.instance, self.prefix(), args);
        }
    }

    /// Log an info message
    pub fn info(&self, message: impl Into<String>) {
        if log::log_enabled!(log::Level::Info) {
            info!("[{}][{}] {}", self.instance, self.prefix(), message.into());
        }
    }

    /// Log an info message using fmt::Arguments
    pub fn info_args(&self, args: Arguments) {
        if log::log_enabled!(log::Level::Info) {
            info!("[{}][{}] {}", self.instance, self.prefix(), args);
        }
    }

    /// Log a warning message
    pub fn warn(&self, message: impl Into<String>) {
        if log::log_enabled!(log::Level::Warn) {
            warn!("[{}][{}] {}", self.instance, self.prefix(), message.into());
        }
    }

    /// Log a warning using fmt::Arguments
    pub fn warn_args(&self, args: Arguments) {
        if log::log_enabled!(log::Level::Warn) {
            warn!("[{}][{}] {}", self.instance, self.prefix(), args);
        }
    }

    /// Log an error message
    pub fn error(&self, message: impl Into<String>) {
        if log::log_enabled!(log::Level::Error) {
            error!("[{}][{}] {}", self.instance, self.prefix(), message.into());
        }
    }
}

struct PrefixDisplay<'a>(&'a Logger);
impl Display for PrefixDisplay<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}",
            ComponentPrefixDisplay {
                parent: self.0.parent_component,
                component: self.0.component,
            },
            MaybeOperationDisplay(self.0.operation())
        )
    }
}

/// Log level accepted by [`LoggingConfig`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
    Off,
}

impl LogLevel {
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
            LogLevel::Off => log::LevelFilter::Off,
        }
    }
}

/// Process-level logging setup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default level when `RUST_LOG` is not set
    pub level: LogLevel,
    /// Route output to the test harness capture
    pub is_test: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            is_test: false,
        }
    }
}

impl LoggingConfig {
    pub fn new(level: LogLevel) -> Self {
        Self {
            level,
            ..Default::default()
        }
    }

    /// Configuration used by tests: debug output captured by the harness
    pub fn for_tests() -> Self {
        Self {
            level: LogLevel::Debug,
            is_test: true,
        }
    }

    /// Install `env_logger`. `RUST_LOG` still wins over `level`.
    /// Returns false when a logger was already installed.
    pub fn try_init(&self) -> bool {
        env_logger::Builder::new()
            .filter_level(self.level.to_level_filter())
            .parse_env("RUST_LOG")
            .is_test(self.is_test)
            .try_init()
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn child_logger_keeps_instance_and_records_parent() {
        let root = Logger::new_root(Component::Keys, "ca-1");
        let child = root.with_component(Component::Builder).with_operation("build_csr");
        assert_eq!(child.instance(), "ca-1");
        assert_eq!(child.component(), Component::Builder);
        assert_eq!(child.operation(), Some("build_csr"));
        assert_eq!(child.prefix().to_string(), "Keys.Builder|op=build_csr");
        assert_eq!(root.prefix().to_string(), "Keys");
    }

    #[test]
    fn log_level_maps_to_filter() {
        assert_eq!(LogLevel::Off.to_level_filter(), log::LevelFilter::Off);
        assert_eq!(LogLevel::Debug.to_level_filter(), log::LevelFilter::Debug);
        let cfg = LoggingConfig::for_tests();
        assert!(cfg.is_test);
        // A second install attempt must not panic.
        cfg.try_init();
        assert!(!cfg.try_init());
    }
}
