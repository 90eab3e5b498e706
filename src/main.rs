use std::{error::Error, path::PathBuf, process::ExitCode};

use bench_psu_link::{
    golden::{GoldenPathOptions, RangeMode, run_golden_path},
    pipeline::CommandPipeline,
    port::{SerialPortConnector, available_ports},
    profile::load_profiles,
    transport::LineTransport,
};
use clap::Parser;
use inquire::Select;
use tracing::{error, info};

/// Bring up a bench power supply over a serial line using a named supply profile.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Serial port (e.g. COM4 or /dev/ttyUSB0). Prompts for one when omitted.
    port: Option<String>,

    /// Supply profile JSON file
    #[arg(long, default_value = "power_supplies.json")]
    config: PathBuf,

    /// Supply profile name; the file's default when omitted
    #[arg(long)]
    supply: Option<String>,

    /// Output range: low or high
    #[arg(long, default_value_t = RangeMode::Low)]
    range: RangeMode,

    /// Over-voltage protection threshold (V)
    #[arg(long, default_value_t = 6.0)]
    ovp: f64,

    /// Output voltage setpoint (V)
    #[arg(long, default_value_t = 5.0)]
    volt: f64,

    /// Output current limit (A)
    #[arg(long, default_value_t = 0.2)]
    curr: f64,

    /// Skip the *RST baseline reset
    #[arg(long)]
    skip_reset: bool,

    /// Skip over-voltage protection setup
    #[arg(long)]
    skip_ovp: bool,

    /// Lock the front panel while in remote mode
    #[arg(long)]
    lock_remote: bool,
}

impl Args {
    fn golden_path_options(&self) -> GoldenPathOptions {
        GoldenPathOptions {
            range: self.range,
            ovp: self.ovp,
            volt: self.volt,
            curr: self.curr,
            skip_reset: self.skip_reset,
            skip_ovp: self.skip_ovp,
            lock_remote: self.lock_remote,
        }
    }
}

fn select_port() -> Result<String, Box<dyn Error>> {
    let ports = available_ports()?;
    if ports.is_empty() {
        return Err("No serial ports found".into());
    }
    Ok(Select::new("Select a serial port:", ports).prompt()?)
}

fn run(args: Args) -> Result<(), Box<dyn Error>> {
    let profiles = load_profiles(&args.config)?;
    let profile = profiles.select(args.supply.as_deref())?;
    let driver = profile.driver()?;

    let port = match args.port.clone() {
        Some(port) => port,
        None => select_port()?,
    };
    info!(supply = %profile.name, driver = %profile.driver_kind, port = %port, "Using supply");

    let mut transport = LineTransport::new(profile.serial_for(&port), SerialPortConnector);
    let result = transport.open().and_then(|()| {
        let mut pipeline = CommandPipeline::new(&driver, &mut transport);
        run_golden_path(&mut pipeline, &args.golden_path_options())
    });
    transport.close();

    let report = result?;
    info!(
        idn = %report.idn,
        voltage = %report.voltage,
        current = %report.current,
        "Golden path complete"
    );
    Ok(())
}

fn main() -> ExitCode {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}
