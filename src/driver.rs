//! Drivers turn a [`SupplyCommand`] plus optional arguments into a wire line.
//!
//! Two kinds exist. [`MapDriver`] is table driven: every command it supports has a template
//! loaded from configuration. [`ScpiDriver`] hard-codes the baseline SCPI dialect. Both sit
//! behind [`CommandDriver`], and [`Driver`] selects one at runtime from a profile's kind string.

use std::collections::{BTreeMap, BTreeSet};

use crate::{
    command::SupplyCommand,
    error::BuildError,
    format::{DEFAULT_PRECISION, format_fixed},
    template::CommandTemplate,
};

pub trait CommandDriver {
    /// Driver name used in trace output.
    fn name(&self) -> &str;

    /// Render the wire line for `command`, without terminator.
    fn build(
        &self,
        command: SupplyCommand,
        value: Option<f64>,
        channel: Option<u32>,
    ) -> Result<String, BuildError>;

    /// Whether a reply line should be awaited when the caller doesn't say.
    ///
    /// Defaults to the query heuristic: identity and measurement commands reply.
    fn expects_response(&self, command: SupplyCommand) -> bool {
        command.is_query()
    }
}

/// Device-agnostic driver backed by a template per command.
///
/// ```text
/// SET_VOLTAGE     => "VOLT {value}"
/// OPEN_OUTPUT     => "OUTP ON"
/// MEASURE_VOLTAGE => "MEAS:VOLT?"
/// ```
#[derive(Debug, Clone)]
pub struct MapDriver {
    name: String,
    templates: BTreeMap<SupplyCommand, CommandTemplate>,
    /// `None` falls back to the query heuristic.
    expect_response: Option<BTreeSet<SupplyCommand>>,
    precision: usize,
}

impl MapDriver {
    pub fn new(
        name: impl Into<String>,
        templates: BTreeMap<SupplyCommand, CommandTemplate>,
        expect_response: Option<BTreeSet<SupplyCommand>>,
    ) -> Self {
        Self {
            name: name.into(),
            templates,
            expect_response,
            precision: DEFAULT_PRECISION,
        }
    }

    /// Fractional digits for every `{value}` this driver renders.
    pub fn with_precision(mut self, precision: usize) -> Self {
        self.precision = precision;
        self
    }

    pub fn precision(&self) -> usize {
        self.precision
    }

    pub fn template(&self, command: SupplyCommand) -> Option<&CommandTemplate> {
        self.templates.get(&command)
    }
}

impl CommandDriver for MapDriver {
    fn name(&self) -> &str {
        &self.name
    }

    fn build(
        &self,
        command: SupplyCommand,
        value: Option<f64>,
        channel: Option<u32>,
    ) -> Result<String, BuildError> {
        let template = self
            .templates
            .get(&command)
            .ok_or_else(|| BuildError::UnmappedCommand {
                command,
                driver: self.name.clone(),
            })?;
        template.render(command, value, channel, self.precision)
    }

    fn expects_response(&self, command: SupplyCommand) -> bool {
        match &self.expect_response {
            Some(set) => set.contains(&command),
            None => command.is_query(),
        }
    }
}

/// Argument that follows the mnemonic.
#[derive(Debug, Clone, Copy)]
enum Argument {
    None,
    Literal(&'static str),
    Value,
}

/// Hard-coded SCPI dialect for E36xx-class supplies.
///
/// A channel, when given, is appended to the base mnemonic: `OUTP ON` becomes `OUTP2 ON`,
/// `MEAS:VOLT?` becomes `MEAS:VOLT2?`. Common commands (`*IDN?`, `*RST`) take no channel.
#[derive(Debug, Clone)]
pub struct ScpiDriver {
    name: String,
    /// `None` falls back to the query heuristic.
    expect_response: Option<BTreeSet<SupplyCommand>>,
    precision: usize,
}

impl ScpiDriver {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            expect_response: None,
            precision: DEFAULT_PRECISION,
        }
    }

    pub fn with_precision(mut self, precision: usize) -> Self {
        self.precision = precision;
        self
    }

    /// Replace the query heuristic with an explicit set of commands that get a reply.
    pub fn with_expect_response(mut self, expect_response: BTreeSet<SupplyCommand>) -> Self {
        self.expect_response = Some(expect_response);
        self
    }

    /// Mnemonic, argument and whether the command is a query.
    fn dialect(command: SupplyCommand) -> Option<(&'static str, Argument, bool)> {
        use Argument as A;
        use SupplyCommand as C;
        Some(match command {
            C::OpenOutput => ("OUTP", A::Literal("ON"), false),
            C::CloseOutput => ("OUTP", A::Literal("OFF"), false),
            C::SetVoltage => ("VOLT", A::Value, false),
            C::SetCurrent => ("CURR", A::Value, false),
            C::MeasureVoltage => ("MEAS:VOLT", A::None, true),
            C::MeasureCurrent => ("MEAS:CURR", A::None, true),
            C::Idn => ("*IDN", A::None, true),
            C::Reset => ("*RST", A::None, false),
            C::SystemRemote => ("SYST:REM", A::None, false),
            C::SystemLocal => ("SYST:LOC", A::None, false),
            C::SystemRwlock => ("SYST:RWL", A::None, false),
            C::SetRangeLow => ("VOLT:RANG", A::Literal("LOW"), false),
            C::SetRangeHigh => ("VOLT:RANG", A::Literal("HIGH"), false),
            C::OvpSet => ("VOLT:PROT", A::Value, false),
            C::OvpEnable => ("VOLT:PROT:STAT", A::Literal("ON"), false),
            C::OvpDisable => ("VOLT:PROT:STAT", A::Literal("OFF"), false),
            C::OvpClear => ("VOLT:PROT:CLE", A::None, false),
            C::EchoTest => return None,
        })
    }
}

impl CommandDriver for ScpiDriver {
    fn name(&self) -> &str {
        &self.name
    }

    fn build(
        &self,
        command: SupplyCommand,
        value: Option<f64>,
        channel: Option<u32>,
    ) -> Result<String, BuildError> {
        let (mnemonic, argument, query) =
            Self::dialect(command).ok_or_else(|| BuildError::UnmappedCommand {
                command,
                driver: self.name.clone(),
            })?;

        let mut line = String::from(mnemonic);
        if let Some(channel) = channel.filter(|_| !mnemonic.starts_with('*')) {
            line.push_str(&channel.to_string());
        }
        if query {
            line.push('?');
        }
        match argument {
            Argument::None => {}
            Argument::Literal(arg) => {
                line.push(' ');
                line.push_str(arg);
            }
            Argument::Value => {
                let value = value.ok_or(BuildError::MissingValue(command))?;
                let rendered = format_fixed(value, self.precision)
                    .ok_or(BuildError::InvalidValue { command, value })?;
                line.push(' ');
                line.push_str(&rendered);
            }
        }
        Ok(line)
    }

    fn expects_response(&self, command: SupplyCommand) -> bool {
        match &self.expect_response {
            Some(set) => set.contains(&command),
            None => command.is_query(),
        }
    }
}

/// Driver selected by a profile's `driver` kind.
#[derive(Debug, Clone)]
pub enum Driver {
    Map(MapDriver),
    Scpi(ScpiDriver),
}

impl Driver {
    /// The configuration kind string of this driver.
    pub fn kind(&self) -> &'static str {
        match self {
            Driver::Map(_) => "map",
            Driver::Scpi(_) => "scpi",
        }
    }
}

impl CommandDriver for Driver {
    fn name(&self) -> &str {
        match self {
            Driver::Map(d) => d.name(),
            Driver::Scpi(d) => d.name(),
        }
    }

    fn build(
        &self,
        command: SupplyCommand,
        value: Option<f64>,
        channel: Option<u32>,
    ) -> Result<String, BuildError> {
        match self {
            Driver::Map(d) => d.build(command, value, channel),
            Driver::Scpi(d) => d.build(command, value, channel),
        }
    }

    fn expects_response(&self, command: SupplyCommand) -> bool {
        match self {
            Driver::Map(d) => d.expects_response(command),
            Driver::Scpi(d) => d.expects_response(command),
        }
    }
}

impl From<MapDriver> for Driver {
    fn from(driver: MapDriver) -> Self {
        Driver::Map(driver)
    }
}

impl From<ScpiDriver> for Driver {
    fn from(driver: ScpiDriver) -> Self {
        Driver::Scpi(driver)
    }
}
