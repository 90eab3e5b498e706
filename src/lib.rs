//! This crate drives SCPI-style bench power supplies over a serial line.
//!
//! Abstract [`SupplyCommand`]s are rendered into device text by a [`CommandDriver`] and sent
//! over a [`LineTransport`], which owns the serial channel and handles the timing: clearing
//! stale input before each query, holding DTR for the exchange, and polling for a late reply
//! against a deadline.
//!
//! Two driver kinds are available:
//! * `map` - one text template per command, taken from a supply profile
//!   (e.g. `"SET_VOLTAGE": "VOLT {value}"`)
//! * `scpi` - a fixed SCPI dialect for E364xA-class supplies
//!
//! Supply profiles are loaded from JSON, see [`profile`].
//!
//! The host serial backend lives behind the `serialport` feature (on by default). Any other
//! channel can be used by implementing [`channel::Connector`].
//!
//! ```ignore
//! let profiles = load_profiles("power_supplies.json")?;
//! let profile = profiles.select(Some("A"))?;
//! let driver = profile.driver()?;
//!
//! let mut transport = LineTransport::new(profile.serial_for("COM4"), SerialPortConnector);
//! transport.open()?;
//! let idn = CommandPipeline::new(&driver, &mut transport).execute(SupplyCommand::Idn, None, None, None)?;
//! transport.close();
//! ```

pub mod channel;
pub mod command;
pub mod driver;
pub mod error;
pub mod format;
pub mod golden;
pub mod pipeline;
#[cfg(feature = "serialport")]
pub mod port;
pub mod profile;
pub mod serial;
pub mod template;
pub mod trace;
pub mod transport;

#[cfg(test)]
mod mock_serial;

pub use command::{Invocation, SupplyCommand};
pub use driver::{CommandDriver, Driver, MapDriver, ScpiDriver};
pub use error::{BuildError, ConfigError, Error};
pub use pipeline::CommandPipeline;
pub use profile::{SupplyProfile, SupplyProfiles, load_profiles};
pub use serial::{Parity, SerialConfig};
pub use transport::{LineIo, LineTransport};
