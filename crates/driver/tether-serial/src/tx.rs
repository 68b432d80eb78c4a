//! Transmit drain engine.
//!
//! Moves bytes from the outbound queue into the UART until either runs out,
//! then decides how to sleep: with nothing queued the transmit interrupt is
//! disabled and only a peer signal can wake the driver; with bytes queued
//! but the UART busy the transmit interrupt is enabled.
//!
//! The signal request is armed before the final emptiness check, never
//! after. A peer enqueue that lands between the last dequeue and the arming
//! is then seen either by the peer (which finds the request armed and
//! signals) or by the re-check here (which loops).

use tether_uart::TransferPort;

use crate::driver::{Notifier, SerialDriver, Settle, Trigger};
use crate::strace;

/// How a drain left the transmitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxOutcome {
    /// Outbound queue empty, transmit interrupt disabled.
    Idle,
    /// Bytes still queued, transmit interrupt enabled.
    AwaitHardware,
}

/// Summary of one drain invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrainReport {
    /// Bytes taken from the outbound queue.
    pub transferred: u32,
    /// Whether the peer was woken.
    pub notified: bool,
    /// Final transmitter state.
    pub outcome: TxOutcome,
}

impl<P: TransferPort, N: Notifier> SerialDriver<'_, P, N> {
    /// Drains the outbound queue into the UART.
    ///
    /// Never waits on the hardware. Wakes the peer at most once, and only if
    /// at least one byte moved and the peer asked for space.
    pub fn drain(&mut self, trigger: Trigger) -> DrainReport {
        let mut transferred = 0;
        let outcome = loop {
            transferred += self.transmit_pass();
            if let Settle::Done(outcome) = self.transmit_settle() {
                break outcome;
            }
        };

        let notified = transferred > 0 && self.tx.signal_required_for_producer();
        if notified {
            self.tx.cancel_producer_signal();
            self.notify_peer(self.config.channels.tx);
        }

        strace!(
            "serial: drain ({:?}) moved {} -> {:?}{}",
            trigger,
            transferred,
            outcome,
            if notified { ", peer woken" } else { "" },
        );

        DrainReport {
            transferred,
            notified,
            outcome,
        }
    }

    /// Moves bytes while the queue has some and the UART has room. Returns
    /// the number of bytes dequeued.
    pub(crate) fn transmit_pass(&mut self) -> u32 {
        let mut moved = 0;
        while !self.tx.is_empty() && self.port.can_accept() {
            let Some(byte) = self.tx.dequeue() else {
                break;
            };
            self.transmit_byte(byte);
            moved += 1;
        }
        moved
    }

    /// Arms the data-available request, then re-checks for bytes the peer
    /// enqueued in the meantime.
    pub(crate) fn transmit_settle(&mut self) -> Settle<TxOutcome> {
        self.tx.request_consumer_signal();

        let pending = !self.tx.is_empty();
        if pending && self.port.can_accept() {
            self.tx.cancel_consumer_signal();
            self.port.set_transmit_interrupt(false);
            Settle::Reprocess
        } else if pending {
            self.port.set_transmit_interrupt(true);
            Settle::Done(TxOutcome::AwaitHardware)
        } else {
            self.port.set_transmit_interrupt(false);
            Settle::Done(TxOutcome::Idle)
        }
    }

    /// Writes one dequeued byte, expanding `\n` to `\r\n` when configured.
    /// One readiness check covers both bytes.
    fn transmit_byte(&mut self, byte: u8) {
        if byte == b'\n' && self.config.translate_newlines {
            self.port.send(b'\r');
            self.stats.bytes_transmitted += 1;
        }
        self.port.send(byte);
        self.stats.bytes_transmitted += 1;
    }
}
