//! Supply profiles loaded from a JSON file.
//!
//! ```json
//! {
//!   "default": "A",
//!   "supplies": {
//!     "A": {
//!       "driver": "map",
//!       "description": "Agilent E3645A",
//!       "serial": { "baudrate": 9600, "parity": "N", "stopbits": 2, "newline": "\r\n" },
//!       "command_map": { "IDN": "*IDN?", "SET_VOLTAGE": "VOLT {value}" },
//!       "expect_response": ["IDN"]
//!     }
//!   }
//! }
//! ```
//!
//! Command names are checked against [`SupplyCommand`] when [`SupplyProfile::driver`] builds
//! the driver, so a typo fails there instead of silently never matching. A `scpi` profile may
//! list `expect_response` but not `command_map`.

use std::{
    collections::{BTreeMap, BTreeSet},
    path::Path,
    str::FromStr,
    time::Duration,
};

use serde::Deserialize;
use tracing::debug;

use crate::{
    command::SupplyCommand,
    driver::{Driver, MapDriver, ScpiDriver},
    error::ConfigError,
    format::DEFAULT_PRECISION,
    serial::SerialConfig,
    template::CommandTemplate,
};

/// Stand-in port name; the real port is supplied at runtime.
pub const PORT_PLACEHOLDER: &str = "__PORT_FROM_CLI__";

#[derive(Debug, Deserialize)]
struct SuppliesFile {
    default: String,
    supplies: BTreeMap<String, ProfileEntry>,
}

#[derive(Debug, Deserialize)]
struct ProfileEntry {
    driver: String,
    #[serde(default)]
    description: String,
    serial: SerialEntry,
    #[serde(default)]
    command_map: BTreeMap<String, String>,
    #[serde(default)]
    expect_response: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct SerialEntry {
    baudrate: u32,
    bytesize: u8,
    parity: String,
    stopbits: u8,
    timeout_s: f64,
    write_timeout_s: f64,
    newline: String,
}

impl Default for SerialEntry {
    fn default() -> Self {
        Self {
            baudrate: 9600,
            bytesize: 8,
            parity: "N".into(),
            stopbits: 1,
            timeout_s: 1.0,
            write_timeout_s: 1.0,
            newline: "\n".into(),
        }
    }
}

impl SerialEntry {
    fn into_config(self) -> Result<SerialConfig, ConfigError> {
        SerialConfig::builder(PORT_PLACEHOLDER)
            .baud_rate(self.baudrate)
            .byte_size(self.bytesize)
            .parity_letter(&self.parity)?
            .stop_bits(self.stopbits)
            .read_timeout(seconds(self.timeout_s, "timeout_s")?)
            .write_timeout(seconds(self.write_timeout_s, "write_timeout_s")?)
            .newline(self.newline)
            .build()
    }
}

fn seconds(value: f64, key: &str) -> Result<Duration, ConfigError> {
    Duration::try_from_secs_f64(value).map_err(|_| {
        ConfigError::InvalidSerial(format!(
            "'{key}' must be a non-negative number of seconds, got {value}"
        ))
    })
}

/// One named supply from the profile file.
#[derive(Debug, Clone)]
pub struct SupplyProfile {
    pub name: String,
    pub description: String,
    /// Driver kind, as written.
    pub driver_kind: String,
    /// Serial settings with [`PORT_PLACEHOLDER`] as the port.
    pub serial: SerialConfig,
    pub command_map: BTreeMap<String, String>,
    /// `None` when the profile leaves the response policy to the driver.
    pub expect_response: Option<Vec<String>>,
}

impl SupplyProfile {
    /// Build the driver this profile describes.
    ///
    /// Every command name in `command_map` and `expect_response` must be a known
    /// [`SupplyCommand`], whatever the driver kind.
    pub fn driver(&self) -> Result<Driver, ConfigError> {
        let templates = self
            .command_map
            .iter()
            .map(|(name, template)| {
                let command = parse_command(name)?;
                let template = CommandTemplate::parse(template).map_err(|err| {
                    ConfigError::MalformedTemplate {
                        command,
                        reason: err.to_string(),
                    }
                })?;
                Ok((command, template))
            })
            .collect::<Result<BTreeMap<_, _>, ConfigError>>()?;

        let expect = self
            .expect_response
            .as_ref()
            .map(|names| {
                names
                    .iter()
                    .map(|n| parse_command(n))
                    .collect::<Result<BTreeSet<_>, _>>()
            })
            .transpose()?;

        match self.driver_kind.trim().to_ascii_lowercase().as_str() {
            "map" => Ok(MapDriver::new(&self.name, templates, expect)
                .with_precision(DEFAULT_PRECISION)
                .into()),
            "scpi" => {
                if !templates.is_empty() {
                    return Err(ConfigError::FixedDialect(self.driver_kind.clone()));
                }
                let driver = ScpiDriver::new(&self.name);
                Ok(match expect {
                    Some(expect) => driver.with_expect_response(expect),
                    None => driver,
                }
                .into())
            }
            _ => Err(ConfigError::UnknownDriver(self.driver_kind.clone())),
        }
    }

    /// The profile's serial settings bound to `port`.
    pub fn serial_for(&self, port: &str) -> SerialConfig {
        self.serial.with_port(port)
    }
}

/// Read and validate the supply profile file at `path`.
pub fn load_profiles(path: impl AsRef<Path>) -> Result<SupplyProfiles, ConfigError> {
    SupplyProfiles::load(path)
}

fn parse_command(name: &str) -> Result<SupplyCommand, ConfigError> {
    SupplyCommand::from_str(name.trim()).map_err(|_| ConfigError::UnknownCommand(name.to_owned()))
}

/// Supply profiles and the name of the default one.
#[derive(Debug, Clone)]
pub struct SupplyProfiles {
    pub default: String,
    pub profiles: BTreeMap<String, SupplyProfile>,
}

impl SupplyProfiles {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let file: SuppliesFile = serde_json::from_str(text)?;
        if file.supplies.is_empty() {
            return Err(ConfigError::EmptySupplies);
        }

        let profiles = file
            .supplies
            .into_iter()
            .map(|(name, entry)| {
                let profile = SupplyProfile {
                    name: name.clone(),
                    description: entry.description,
                    driver_kind: entry.driver,
                    serial: entry.serial.into_config()?,
                    command_map: entry.command_map,
                    expect_response: entry.expect_response,
                };
                Ok((name, profile))
            })
            .collect::<Result<BTreeMap<_, _>, ConfigError>>()?;

        if !profiles.contains_key(&file.default) {
            return Err(ConfigError::MissingDefault(file.default));
        }

        Ok(Self {
            default: file.default,
            profiles,
        })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let profiles = Self::from_json(&text)?;
        debug!(
            path = %path.display(),
            count = profiles.profiles.len(),
            default = %profiles.default,
            "Loaded supply profiles"
        );
        Ok(profiles)
    }

    /// The named profile, or the default one when `name` is `None`.
    pub fn select(&self, name: Option<&str>) -> Result<&SupplyProfile, ConfigError> {
        let name = name.unwrap_or(self.default.as_str());
        self.profiles
            .get(name)
            .ok_or_else(|| ConfigError::UnknownProfile {
                name: name.to_owned(),
                available: self.profiles.keys().cloned().collect::<Vec<_>>().join(", "),
            })
    }
}
