//! The physical channel capability the transport is built on.
//!
//! Byte I/O comes from [`embedded_io::Read`] and [`embedded_io::Write`]. A read that finds no
//! data should either return `Ok(0)` or fail with [`embedded_io::ErrorKind::TimedOut`]; the
//! transport treats both as "nothing yet". Dropping a channel releases it.

use crate::serial::SerialConfig;

pub trait SerialChannel: embedded_io::Read + embedded_io::Write {
    /// Discard anything received but not yet read.
    fn clear_input(&mut self) -> Result<(), Self::Error>;

    /// Discard anything queued but not yet transmitted.
    fn clear_output(&mut self) -> Result<(), Self::Error>;

    /// Drive the DTR control line.
    fn set_dtr(&mut self, level: bool) -> Result<(), Self::Error>;
}

/// Opens channels from a [`SerialConfig`].
pub trait Connector {
    type Channel: SerialChannel;

    fn connect(
        &mut self,
        config: &SerialConfig,
    ) -> Result<Self::Channel, <Self::Channel as embedded_io::ErrorType>::Error>;
}

/// Error kinds that mean "no data arrived in time" rather than a failure.
pub(crate) fn is_idle(kind: embedded_io::ErrorKind) -> bool {
    matches!(
        kind,
        embedded_io::ErrorKind::TimedOut | embedded_io::ErrorKind::Interrupted
    )
}
