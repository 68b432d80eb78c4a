//! Driver telemetry.
//!
//! Counters are advisory: nothing in the driver reads them back to make a
//! decision.

use core::fmt;

use tether_uart::LineErrors;

/// Running counters kept by a [`SerialDriver`](crate::SerialDriver).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DriverStats {
    /// Bytes written to the port (after newline translation).
    pub bytes_transmitted: u64,
    /// Bytes moved from the port into the inbound queue.
    pub bytes_received: u64,
    /// Wakeups sent to peers.
    pub notifications: u64,
    /// Hardware interrupts serviced.
    pub interrupts: u64,
    /// Interrupts cut short by the dispatch limit.
    pub dispatch_limit_hits: u64,
    /// Wake events on channels the driver does not own.
    pub unknown_wakes: u64,
    /// Times the receive interrupt was disabled because the inbound queue
    /// filled up.
    pub backpressure_events: u64,
    /// Receive overruns.
    pub overruns: u64,
    /// Parity errors.
    pub parity_errors: u64,
    /// Framing errors.
    pub framing_errors: u64,
    /// Break conditions.
    pub breaks: u64,
}

impl DriverStats {
    /// All counters at zero.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            bytes_transmitted: 0,
            bytes_received: 0,
            notifications: 0,
            interrupts: 0,
            dispatch_limit_hits: 0,
            unknown_wakes: 0,
            backpressure_events: 0,
            overruns: 0,
            parity_errors: 0,
            framing_errors: 0,
            breaks: 0,
        }
    }

    /// Counts each error kind present in `errors` once.
    pub fn record_line_errors(&mut self, errors: LineErrors) {
        for (kind, counter) in [
            (LineErrors::OVERRUN, &mut self.overruns),
            (LineErrors::PARITY, &mut self.parity_errors),
            (LineErrors::FRAMING, &mut self.framing_errors),
            (LineErrors::BREAK, &mut self.breaks),
        ] {
            if errors.contains(kind) {
                *counter += 1;
            }
        }
    }

    /// Total line errors of every kind.
    #[must_use]
    pub const fn line_errors(&self) -> u64 {
        self.overruns + self.parity_errors + self.framing_errors + self.breaks
    }
}

impl fmt::Display for DriverStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "tx {} rx {} notify {} irq {} (limit {}) unknown {} backpressure {} line errors {}",
            self.bytes_transmitted,
            self.bytes_received,
            self.notifications,
            self.interrupts,
            self.dispatch_limit_hits,
            self.unknown_wakes,
            self.backpressure_events,
            self.line_errors(),
        )
    }
}
