//! [`Connector`] backed by the `serialport` crate.

use std::{
    io, thread,
    time::{Duration, Instant},
};

use serialport::{ClearBuffer, SerialPort};

use crate::{
    channel::{Connector, SerialChannel},
    serial::{Parity, SerialConfig},
};

/// Longest a single blocking read may take, so transport deadlines stay accurate.
const READ_SLICE: Duration = Duration::from_millis(100);
/// Pause before retrying a write the port reported as timed out.
const WRITE_RETRY_BACKOFF: Duration = Duration::from_millis(5);

#[derive(Debug)]
pub struct IoError(io::Error);

impl IoError {
    fn invalid_input(message: String) -> Self {
        IoError(io::Error::new(io::ErrorKind::InvalidInput, message))
    }

    pub fn into_inner(self) -> io::Error {
        self.0
    }
}

impl core::fmt::Display for IoError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for IoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.0)
    }
}

impl From<io::Error> for IoError {
    fn from(err: io::Error) -> Self {
        IoError(err)
    }
}

impl From<serialport::Error> for IoError {
    fn from(err: serialport::Error) -> Self {
        IoError(err.into())
    }
}

impl embedded_io::Error for IoError {
    fn kind(&self) -> embedded_io::ErrorKind {
        match self.0.kind() {
            io::ErrorKind::NotFound => embedded_io::ErrorKind::NotFound,
            io::ErrorKind::PermissionDenied => embedded_io::ErrorKind::PermissionDenied,
            io::ErrorKind::NotConnected => embedded_io::ErrorKind::NotConnected,
            io::ErrorKind::BrokenPipe => embedded_io::ErrorKind::BrokenPipe,
            io::ErrorKind::AlreadyExists => embedded_io::ErrorKind::AlreadyExists,
            io::ErrorKind::InvalidInput => embedded_io::ErrorKind::InvalidInput,
            io::ErrorKind::InvalidData => embedded_io::ErrorKind::InvalidData,
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => embedded_io::ErrorKind::TimedOut,
            io::ErrorKind::Interrupted => embedded_io::ErrorKind::Interrupted,
            io::ErrorKind::Unsupported => embedded_io::ErrorKind::Unsupported,
            io::ErrorKind::OutOfMemory => embedded_io::ErrorKind::OutOfMemory,
            _ => embedded_io::ErrorKind::Other,
        }
    }
}

/// An open host serial port.
pub struct PortWrapper {
    port: Box<dyn SerialPort>,
    write_timeout: Duration,
}

impl embedded_io::ErrorType for PortWrapper {
    type Error = IoError;
}

impl embedded_io::Read for PortWrapper {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        io::Read::read(&mut self.port, buf).map_err(IoError)
    }
}

impl embedded_io::Write for PortWrapper {
    /// Keeps retrying a write the port timed out on until the write timeout is spent.
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        let port = &mut self.port;
        retry_timed_out(self.write_timeout, || io::Write::write(port, buf)).map_err(IoError)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        io::Write::flush(&mut self.port).map_err(IoError)
    }
}

impl SerialChannel for PortWrapper {
    fn clear_input(&mut self) -> Result<(), Self::Error> {
        Ok(self.port.clear(ClearBuffer::Input)?)
    }

    fn clear_output(&mut self) -> Result<(), Self::Error> {
        Ok(self.port.clear(ClearBuffer::Output)?)
    }

    fn set_dtr(&mut self, level: bool) -> Result<(), Self::Error> {
        Ok(self.port.write_data_terminal_ready(level)?)
    }
}

/// Run `op` until it does something other than time out, or `limit` has passed.
///
/// Sleeps [`WRITE_RETRY_BACKOFF`] between attempts, so a port opened with a zero timeout does
/// not spin.
fn retry_timed_out<T>(limit: Duration, mut op: impl FnMut() -> io::Result<T>) -> io::Result<T> {
    let deadline = Instant::now() + limit;
    loop {
        match op() {
            Err(err) if err.kind() == io::ErrorKind::TimedOut => {
                let now = Instant::now();
                if now >= deadline {
                    return Err(err);
                }
                thread::sleep(WRITE_RETRY_BACKOFF.min(deadline - now));
            }
            other => return other,
        }
    }
}

/// Opens host serial ports.
///
/// Mark and space parity are accepted in a [`SerialConfig`] but the backend can't express
/// them, so opening such a config fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct SerialPortConnector;

impl SerialPortConnector {
    fn settings(
        config: &SerialConfig,
    ) -> Result<(serialport::DataBits, serialport::Parity, serialport::StopBits), IoError> {
        let data_bits = match config.byte_size() {
            5 => serialport::DataBits::Five,
            6 => serialport::DataBits::Six,
            7 => serialport::DataBits::Seven,
            8 => serialport::DataBits::Eight,
            other => return Err(IoError::invalid_input(format!("unsupported byte size {other}"))),
        };
        let parity = match config.parity() {
            Parity::None => serialport::Parity::None,
            Parity::Even => serialport::Parity::Even,
            Parity::Odd => serialport::Parity::Odd,
            other => return Err(IoError::invalid_input(format!("unsupported parity {other}"))),
        };
        let stop_bits = match config.stop_bits() {
            1 => serialport::StopBits::One,
            2 => serialport::StopBits::Two,
            other => return Err(IoError::invalid_input(format!("unsupported stop bits {other}"))),
        };
        Ok((data_bits, parity, stop_bits))
    }
}

impl Connector for SerialPortConnector {
    type Channel = PortWrapper;

    fn connect(&mut self, config: &SerialConfig) -> Result<PortWrapper, IoError> {
        let (data_bits, parity, stop_bits) = Self::settings(config)?;
        let port = serialport::new(config.port(), config.baud_rate())
            .data_bits(data_bits)
            .parity(parity)
            .stop_bits(stop_bits)
            .flow_control(serialport::FlowControl::None)
            .timeout(config.read_timeout().min(READ_SLICE))
            .open()?;

        Ok(PortWrapper {
            port,
            write_timeout: config.write_timeout(),
        })
    }
}

/// Names of the serial ports present on this host.
pub fn available_ports() -> Result<Vec<String>, IoError> {
    Ok(serialport::available_ports()?
        .into_iter()
        .map(|p| p.port_name)
        .collect())
}
