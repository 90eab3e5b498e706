//! Error types for command building, the line transport and profile loading.

use thiserror::Error;

use crate::command::SupplyCommand;

pub type Result<T, I> = core::result::Result<T, Error<I>>;

/// Failures while rendering a command into a wire line.
///
/// These are never retried: building the same invocation again fails the same way.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BuildError {
    #[error("Command '{command}' is not mapped for driver '{driver}'")]
    UnmappedCommand {
        command: SupplyCommand,
        driver: String,
    },
    #[error("Command '{0}' requires a value but none was provided")]
    MissingValue(SupplyCommand),
    #[error("Command '{0}' requires a channel but none was provided")]
    MissingChannel(SupplyCommand),
    #[error("Template for '{command}' could not be rendered: {reason}")]
    Template {
        command: SupplyCommand,
        reason: String,
    },
    /// NaN and infinities have no fixed-point rendering.
    #[error("Value {value} for '{command}' is not a finite number")]
    InvalidValue { command: SupplyCommand, value: f64 },
}

/// Transport and pipeline errors, generic over the channel's own error type.
#[derive(Error, Debug)]
pub enum Error<I: embedded_io::Error> {
    #[error(transparent)]
    Build(#[from] BuildError),
    #[error("Serial port is not open")]
    NotOpen,
    #[error("Serial open failed: {0:?}")]
    TransportOpenFailed(I),
    #[error("Serial write failed: {0:?}")]
    WriteFailed(I),
    #[error("Serial read failed: {0:?}")]
    ReadFailed(I),
}

/// Malformed or inconsistent supply configuration.
///
/// Always fatal to the operation that loaded it.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file '{path}' could not be read: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Config is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Key 'supplies' must be a non-empty object")]
    EmptySupplies,
    #[error("Default supply '{0}' not found in supplies")]
    MissingDefault(String),
    #[error("Unknown supply profile '{name}'. Available: {available}")]
    UnknownProfile { name: String, available: String },
    #[error("Unknown command name in config: '{0}'")]
    UnknownCommand(String),
    #[error("Unsupported driver type: '{0}'")]
    UnknownDriver(String),
    #[error("Driver type '{0}' has a fixed command set and takes no 'command_map'")]
    FixedDialect(String),
    #[error("Invalid serial parameter: {0}")]
    InvalidSerial(String),
    #[error("Template for '{command}' is malformed: {reason}")]
    MalformedTemplate {
        command: SupplyCommand,
        reason: String,
    },
}
