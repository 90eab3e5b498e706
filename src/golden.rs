//! Bring-up sequence for an E364xA-class bench supply.

use strum_macros::{Display, EnumString};
use tracing::info;

use crate::{
    command::SupplyCommand,
    driver::CommandDriver,
    error::Result,
    pipeline::CommandPipeline,
    transport::LineIo,
};

/// Output range selected before programming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum RangeMode {
    #[default]
    Low,
    High,
}

impl RangeMode {
    fn command(self) -> SupplyCommand {
        match self {
            RangeMode::Low => SupplyCommand::SetRangeLow,
            RangeMode::High => SupplyCommand::SetRangeHigh,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GoldenPathOptions {
    pub range: RangeMode,
    /// Over-voltage protection threshold in volts.
    pub ovp: f64,
    /// Voltage setpoint in volts.
    pub volt: f64,
    /// Current limit in amps.
    pub curr: f64,
    pub skip_reset: bool,
    pub skip_ovp: bool,
    /// Lock the front panel while in remote mode.
    pub lock_remote: bool,
}

impl Default for GoldenPathOptions {
    fn default() -> Self {
        Self {
            range: RangeMode::Low,
            ovp: 6.0,
            volt: 5.0,
            curr: 0.2,
            skip_reset: false,
            skip_ovp: false,
            lock_remote: false,
        }
    }
}

/// Replies collected along the way. Empty strings mean the supply stayed silent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GoldenPathReport {
    pub idn: String,
    pub voltage: String,
    pub current: String,
}

/// Remote mode, identify, reset, configure with the output off, switch on, measure, then
/// switch off and hand the panel back.
///
/// Stops at the first failing step. Closing the transport is left to the caller.
pub fn run_golden_path<D: CommandDriver, T: LineIo>(
    pipeline: &mut CommandPipeline<'_, D, T>,
    options: &GoldenPathOptions,
) -> Result<GoldenPathReport, T::Error> {
    write(pipeline, SupplyCommand::SystemRemote, None)?;
    if options.lock_remote {
        write(pipeline, SupplyCommand::SystemRwlock, None)?;
    }

    let idn = pipeline.execute(SupplyCommand::Idn, None, None, Some(true))?;
    info!(idn = %idn, "Supply identified");

    if !options.skip_reset {
        write(pipeline, SupplyCommand::Reset, None)?;
    }

    write(pipeline, SupplyCommand::CloseOutput, None)?;
    write(pipeline, options.range.command(), None)?;

    if !options.skip_ovp {
        write(pipeline, SupplyCommand::OvpSet, Some(options.ovp))?;
        write(pipeline, SupplyCommand::OvpEnable, None)?;
        write(pipeline, SupplyCommand::OvpClear, None)?;
    }

    write(pipeline, SupplyCommand::SetVoltage, Some(options.volt))?;
    write(pipeline, SupplyCommand::SetCurrent, Some(options.curr))?;
    write(pipeline, SupplyCommand::OpenOutput, None)?;

    let voltage = pipeline.execute(SupplyCommand::MeasureVoltage, None, None, Some(true))?;
    let current = pipeline.execute(SupplyCommand::MeasureCurrent, None, None, Some(true))?;
    info!(voltage = %voltage, current = %current, "Output measured");

    write(pipeline, SupplyCommand::CloseOutput, None)?;
    write(pipeline, SupplyCommand::SystemLocal, None)?;

    Ok(GoldenPathReport {
        idn,
        voltage,
        current,
    })
}

fn write<D: CommandDriver, T: LineIo>(
    pipeline: &mut CommandPipeline<'_, D, T>,
    command: SupplyCommand,
    value: Option<f64>,
) -> Result<(), T::Error> {
    pipeline.execute(command, value, None, Some(false)).map(drop)
}
