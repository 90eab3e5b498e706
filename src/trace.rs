//! Observers for the lines a pipeline sends and receives.

use std::{cell::RefCell, rc::Rc};

use strum_macros::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "UPPERCASE")]
pub enum Direction {
    Tx,
    Rx,
    /// Interface test hook traffic.
    Echo,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceEvent {
    pub direction: Direction,
    pub driver: String,
    pub line: String,
}

/// Receives one event per traced line.
pub trait TraceObserver {
    fn trace(&self, direction: Direction, driver: &str, line: &str);
}

/// Default observer: emits each line through `tracing` at info level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl TraceObserver for TracingObserver {
    fn trace(&self, direction: Direction, driver: &str, line: &str) {
        tracing::info!(%direction, driver, line, "[{direction}][{driver}] {line}");
    }
}

/// Keeps every event in memory. Clones share the same log.
#[derive(Debug, Default, Clone)]
pub struct TraceRecorder {
    events: Rc<RefCell<Vec<TraceEvent>>>,
}

impl TraceRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<TraceEvent> {
        self.events.borrow().clone()
    }

    /// Recorded lines for one direction, in order.
    pub fn lines(&self, direction: Direction) -> Vec<String> {
        self.events
            .borrow()
            .iter()
            .filter(|e| e.direction == direction)
            .map(|e| e.line.clone())
            .collect()
    }
}

impl TraceObserver for TraceRecorder {
    fn trace(&self, direction: Direction, driver: &str, line: &str) {
        self.events.borrow_mut().push(TraceEvent {
            direction,
            driver: driver.to_owned(),
            line: line.to_owned(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recorder_shares_log_between_clones() {
        let recorder = TraceRecorder::new();
        let handle = recorder.clone();
        handle.trace(Direction::Tx, "A", "*IDN?");
        handle.trace(Direction::Rx, "A", "AGILENT,E3645A");
        assert_eq!(recorder.events().len(), 2);
        assert_eq!(recorder.lines(Direction::Tx), vec!["*IDN?"]);
        assert_eq!(recorder.lines(Direction::Rx), vec!["AGILENT,E3645A"]);
        assert_eq!(
            recorder.events()[0],
            TraceEvent {
                direction: Direction::Tx,
                driver: "A".into(),
                line: "*IDN?".into()
            }
        );
    }

    #[test]
    fn direction_labels() {
        assert_eq!(Direction::Tx.to_string(), "TX");
        assert_eq!(Direction::Rx.to_string(), "RX");
        assert_eq!(Direction::Echo.to_string(), "ECHO");
    }
}
