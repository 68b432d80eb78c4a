//! Receive fill engine.
//!
//! Moves bytes from the UART into the inbound queue. When the queue fills
//! while the UART still holds data, the receive interrupt is disabled and
//! the driver asks the peer to signal once it frees space. The unread bytes
//! stay in the UART FIFO; nothing is dropped here.

use tether_uart::TransferPort;

use crate::driver::{Notifier, SerialDriver, Settle, Trigger};
use crate::{sdebug, strace, swarn};

/// How a fill left the receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RxOutcome {
    /// No data left in the UART.
    Idle,
    /// Inbound queue full with data still in the UART; receive interrupt
    /// disabled until the peer frees space.
    Backpressured,
}

/// Summary of one fill invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FillReport {
    /// Bytes placed in the inbound queue.
    pub transferred: u32,
    /// Whether the peer was woken.
    pub notified: bool,
    /// Final receiver state.
    pub outcome: RxOutcome,
}

impl<P: TransferPort, N: Notifier> SerialDriver<'_, P, N> {
    /// Fills the inbound queue from the UART.
    ///
    /// Wakes the peer at most once, and only if at least one byte moved and
    /// the peer asked for data.
    pub fn fill(&mut self, trigger: Trigger) -> FillReport {
        let mut transferred = 0;
        let outcome = loop {
            self.release_backpressure();
            transferred += self.receive_pass();
            if let Settle::Done(outcome) = self.receive_settle() {
                break outcome;
            }
        };

        let notified = transferred > 0 && self.rx.signal_required_for_consumer();
        if notified {
            self.rx.cancel_consumer_signal();
            self.notify_peer(self.config.channels.rx);
        }

        self.collect_line_errors();

        strace!(
            "serial: fill ({:?}) moved {} -> {:?}{}",
            trigger,
            transferred,
            outcome,
            if notified { ", peer woken" } else { "" },
        );

        FillReport {
            transferred,
            notified,
            outcome,
        }
    }

    /// Drops a stale space-available request once the peer has freed room.
    fn release_backpressure(&mut self) {
        if self.rx.signal_required_for_producer() && !self.rx.is_full() {
            self.rx.cancel_producer_signal();
            self.port.set_receive_interrupt(true);
        }
    }

    /// Moves bytes while the UART has some and the queue has room. Returns
    /// the number of bytes enqueued.
    pub(crate) fn receive_pass(&mut self) -> u32 {
        let mut moved = 0;
        while self.port.has_data() && !self.rx.is_full() {
            let byte = self.port.receive();
            strace!("serial: received {:#04x}", byte);
            if !self.rx.enqueue(byte) {
                break;
            }
            self.stats.bytes_received += 1;
            moved += 1;
        }
        moved
    }

    /// Enters backpressure if the queue is full with data still waiting,
    /// then re-checks for space the peer freed in the meantime.
    pub(crate) fn receive_settle(&mut self) -> Settle<RxOutcome> {
        let blocked = self.port.has_data() && self.rx.is_full();
        if blocked {
            self.port.set_receive_interrupt(false);
            self.rx.request_producer_signal();
        }

        if self.port.has_data() && !self.rx.is_full() {
            if self.rx.signal_required_for_producer() {
                self.rx.cancel_producer_signal();
                self.port.set_receive_interrupt(true);
            }
            return Settle::Reprocess;
        }

        if blocked {
            self.stats.backpressure_events += 1;
            sdebug!(
                "serial: inbound queue full, receive interrupt off ({} bytes queued)",
                self.rx.len()
            );
            Settle::Done(RxOutcome::Backpressured)
        } else {
            Settle::Done(RxOutcome::Idle)
        }
    }

    /// Counts and reports line errors the port has seen.
    pub(crate) fn collect_line_errors(&mut self) {
        let errors = self.port.line_errors();
        if !errors.is_empty() {
            self.stats.record_line_errors(errors);
            swarn!("serial: line errors {:?}", errors);
        }
    }
}
