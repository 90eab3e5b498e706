//! Serial line parameters.

use std::time::Duration;

use strum_macros::{Display, EnumString};

use crate::error::ConfigError;

/// Longest accepted read or write timeout.
pub const MAX_TIMEOUT: Duration = Duration::from_secs(3600);

/// Parity setting, written as a single letter in profiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
pub enum Parity {
    #[default]
    #[strum(serialize = "N")]
    None,
    #[strum(serialize = "E")]
    Even,
    #[strum(serialize = "O")]
    Odd,
    #[strum(serialize = "M")]
    Mark,
    #[strum(serialize = "S")]
    Space,
}

/// Everything needed to open one serial channel.
///
/// Immutable once built; construct through [`SerialConfig::builder`] or
/// [`SerialConfig::new`] so the invariants are checked.
#[derive(Debug, Clone, PartialEq)]
pub struct SerialConfig {
    port: String,
    baud_rate: u32,
    byte_size: u8,
    parity: Parity,
    stop_bits: u8,
    read_timeout: Duration,
    write_timeout: Duration,
    newline: String,
}

impl SerialConfig {
    /// A config with the default line settings: 9600 8N1, 1s timeouts, `"\n"` terminator.
    pub fn new(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            baud_rate: 9600,
            byte_size: 8,
            parity: Parity::None,
            stop_bits: 1,
            read_timeout: Duration::from_secs(1),
            write_timeout: Duration::from_secs(1),
            newline: "\n".into(),
        }
    }

    pub fn builder(port: impl Into<String>) -> SerialConfigBuilder {
        SerialConfigBuilder {
            config: Self::new(port),
        }
    }

    pub fn port(&self) -> &str {
        &self.port
    }

    pub fn baud_rate(&self) -> u32 {
        self.baud_rate
    }

    pub fn byte_size(&self) -> u8 {
        self.byte_size
    }

    pub fn parity(&self) -> Parity {
        self.parity
    }

    pub fn stop_bits(&self) -> u8 {
        self.stop_bits
    }

    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    pub fn write_timeout(&self) -> Duration {
        self.write_timeout
    }

    /// Line terminator appended to every written line.
    pub fn newline(&self) -> &str {
        &self.newline
    }

    /// Same settings on a different port.
    pub fn with_port(&self, port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            ..self.clone()
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: String| Err(ConfigError::InvalidSerial(reason));
        if self.baud_rate == 0 {
            return invalid("baud rate must be positive".into());
        }
        if self.byte_size == 0 {
            return invalid("byte size must be positive".into());
        }
        if self.stop_bits == 0 {
            return invalid("stop bits must be positive".into());
        }
        if self.read_timeout > MAX_TIMEOUT || self.write_timeout > MAX_TIMEOUT {
            return invalid(format!("timeouts must not exceed {}s", MAX_TIMEOUT.as_secs()));
        }
        if self.newline.is_empty() || !self.newline.is_ascii() {
            return invalid(format!("line terminator {:?} must be non-empty ASCII", self.newline));
        }
        Ok(())
    }
}

pub struct SerialConfigBuilder {
    config: SerialConfig,
}

impl SerialConfigBuilder {
    pub fn baud_rate(mut self, baud_rate: u32) -> Self {
        self.config.baud_rate = baud_rate;
        self
    }

    pub fn byte_size(mut self, byte_size: u8) -> Self {
        self.config.byte_size = byte_size;
        self
    }

    pub fn parity(mut self, parity: Parity) -> Self {
        self.config.parity = parity;
        self
    }

    /// Parity from its profile letter (`N`, `E`, `O`, `M` or `S`).
    pub fn parity_letter(self, letter: &str) -> Result<Self, ConfigError> {
        let parity = letter
            .trim()
            .to_ascii_uppercase()
            .parse::<Parity>()
            .map_err(|_| ConfigError::InvalidSerial(format!("unknown parity '{letter}'")))?;
        Ok(self.parity(parity))
    }

    pub fn stop_bits(mut self, stop_bits: u8) -> Self {
        self.config.stop_bits = stop_bits;
        self
    }

    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.config.read_timeout = timeout;
        self
    }

    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.config.write_timeout = timeout;
        self
    }

    pub fn newline(mut self, newline: impl Into<String>) -> Self {
        self.config.newline = newline.into();
        self
    }

    pub fn build(self) -> Result<SerialConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
