//! Build a command with a driver, send it over a transport, and optionally collect the reply.

use crate::{
    command::{Invocation, SupplyCommand},
    driver::CommandDriver,
    error::Result,
    trace::{Direction, TraceObserver, TracingObserver},
    transport::LineIo,
};

/// Borrows a driver and a transport for a sequence of commands.
///
/// The pipeline never opens or closes the transport and never retries; retrying for a late
/// reply happens inside [`LineIo::send_and_receive`].
pub struct CommandPipeline<'a, D: CommandDriver, T: LineIo> {
    driver: &'a D,
    transport: &'a mut T,
    observer: Box<dyn TraceObserver + 'a>,
}

impl<'a, D: CommandDriver, T: LineIo> CommandPipeline<'a, D, T> {
    /// A pipeline tracing through [`TracingObserver`].
    pub fn new(driver: &'a D, transport: &'a mut T) -> Self {
        Self {
            driver,
            transport,
            observer: Box::new(TracingObserver),
        }
    }

    pub fn with_observer(mut self, observer: impl TraceObserver + 'a) -> Self {
        self.observer = Box::new(observer);
        self
    }

    pub fn driver(&self) -> &D {
        self.driver
    }

    /// Run one command.
    ///
    /// `expect_response` overrides the driver's policy when given. Returns the reply line,
    /// which is empty for write-only commands and for queries nobody answered in time.
    pub fn execute(
        &mut self,
        command: SupplyCommand,
        value: Option<f64>,
        channel: Option<u32>,
        expect_response: Option<bool>,
    ) -> Result<String, T::Error> {
        let line = self.driver.build(command, value, channel)?;
        let expect_response =
            expect_response.unwrap_or_else(|| self.driver.expects_response(command));

        self.observer.trace(Direction::Tx, self.driver.name(), &line);

        if expect_response {
            let reply = self.transport.send_and_receive(&line)?;
            self.observer.trace(Direction::Rx, self.driver.name(), &reply);
            return Ok(reply);
        }

        self.transport.write_line(&line)?;
        Ok(String::new())
    }

    pub fn execute_invocation(&mut self, invocation: &Invocation) -> Result<String, T::Error> {
        self.execute(
            invocation.command,
            invocation.value,
            invocation.channel,
            invocation.expect_response,
        )
    }

    /// Interface test hook: trace `message` and write it verbatim as a line.
    pub fn echo(&mut self, message: &str) -> Result<(), T::Error> {
        self.observer.trace(Direction::Echo, self.driver.name(), message);
        self.transport.write_line(message)
    }
}
