//! The vendor-neutral command vocabulary.

use strum_macros::{Display, EnumIter, EnumString, IntoStaticStr};

/// One abstract power supply operation.
///
/// Names round-trip through their `SCREAMING_SNAKE_CASE` form, which is how they appear in
/// supply profiles (`"SET_VOLTAGE"`, `"OVP_SET"`, ...).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumIter, EnumString, IntoStaticStr,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum SupplyCommand {
    /// Enable the output.
    OpenOutput,
    /// Disable the output.
    CloseOutput,
    /// Program the voltage setpoint. Needs a value.
    SetVoltage,
    /// Program the current limit. Needs a value.
    SetCurrent,
    /// Query the measured output voltage.
    MeasureVoltage,
    /// Query the measured output current.
    MeasureCurrent,
    /// Query the instrument identity string.
    Idn,
    /// Return the instrument to its power-on state.
    Reset,
    SystemRemote,
    SystemLocal,
    /// Remote mode with the front panel keys locked.
    SystemRwlock,
    SetRangeLow,
    SetRangeHigh,
    /// Program the over-voltage protection threshold. Needs a value.
    OvpSet,
    OvpEnable,
    OvpDisable,
    /// Clear a tripped over-voltage protection latch.
    OvpClear,
    /// Interface test hook.
    EchoTest,
}

impl SupplyCommand {
    /// Identity and measurement commands, which produce a reply line.
    pub fn is_query(self) -> bool {
        matches!(
            self,
            SupplyCommand::Idn | SupplyCommand::MeasureVoltage | SupplyCommand::MeasureCurrent
        )
    }

    /// The configuration name of this command.
    pub fn name(self) -> &'static str {
        self.into()
    }
}

/// A single `execute` request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Invocation {
    pub command: SupplyCommand,
    pub value: Option<f64>,
    pub channel: Option<u32>,
    /// Overrides the driver's response policy when set.
    pub expect_response: Option<bool>,
}

impl Invocation {
    pub fn new(command: SupplyCommand) -> Self {
        Self {
            command,
            value: None,
            channel: None,
            expect_response: None,
        }
    }

    pub fn with_value(mut self, value: f64) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_channel(mut self, channel: u32) -> Self {
        self.channel = Some(channel);
        self
    }

    pub fn expect_response(mut self, expect: bool) -> Self {
        self.expect_response = Some(expect);
        self
    }
}

impl From<SupplyCommand> for Invocation {
    fn from(command: SupplyCommand) -> Self {
        Self::new(command)
    }
}
