//! Non-blocking UART transfer ports.
//!
//! The serial driver's transfer engines talk to hardware only through the
//! [`TransferPort`] trait: readiness checks, single-byte send/receive,
//! interrupt-enable toggles and interrupt-cause decoding. Nothing here ever
//! spins waiting for readiness; callers send only after
//! [`can_accept`](TransferPort::can_accept) and receive only after
//! [`has_data`](TransferPort::has_data).
//!
//! Implementations:
//!
//! - [`Ns16550`]: 8250/16550-compatible MMIO UARTs (NXP DUART, DesignWare 8250).
//! - [`Pl011`]: ARM PrimeCell PL011.
//! - `SimUart` (feature `sim`): a scripted in-memory port for tests and the
//!   host simulator.

#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]

#[cfg(feature = "sim")]
extern crate alloc;

pub mod mmio;
pub mod ns16550;
pub mod pl011;
#[cfg(feature = "sim")]
pub mod sim;

use bitflags::bitflags;

pub use ns16550::{Ns16550, RegisterLayout};
pub use pl011::Pl011;
#[cfg(feature = "sim")]
pub use sim::SimUart;

bitflags! {
    /// Decoded interrupt causes.
    ///
    /// A 16550 reports one cause per IIR read (highest priority first); a
    /// PL011 reports every pending cause at once. Both decode into this set.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct InterruptCauses: u8 {
        /// Receive FIFO reached its trigger level.
        const DATA_AVAILABLE    = 1 << 0;
        /// Bytes sat in the receive FIFO below the trigger level for too long.
        const CHARACTER_TIMEOUT = 1 << 1;
        /// Transmit holding register / FIFO drained.
        const TRANSMIT_EMPTY    = 1 << 2;
        /// Overrun, parity, framing or break condition.
        const LINE_STATUS       = 1 << 3;
        /// Modem status change (never enabled by this driver).
        const MODEM_STATUS      = 1 << 4;
    }
}

impl InterruptCauses {
    /// Causes serviced by the receive fill engine.
    pub const RECEIVE: Self = Self::DATA_AVAILABLE.union(Self::CHARACTER_TIMEOUT);

    /// Causes the interrupt dispatcher keeps looping on.
    pub const SERVICED: Self = Self::RECEIVE
        .union(Self::TRANSMIT_EMPTY)
        .union(Self::LINE_STATUS);

    /// Returns `true` if the receive path has work.
    #[must_use]
    pub const fn wants_fill(self) -> bool {
        self.intersects(Self::RECEIVE)
    }

    /// Returns `true` if the transmit path has work.
    #[must_use]
    pub const fn wants_drain(self) -> bool {
        self.contains(Self::TRANSMIT_EMPTY)
    }

    /// Returns `true` if any cause the dispatcher services is pending.
    #[must_use]
    pub const fn is_serviceable(self) -> bool {
        self.intersects(Self::SERVICED)
    }
}

bitflags! {
    /// Receive-side line errors.
    ///
    /// Advisory only: the affected bytes are already lost or corrupted by the
    /// time these are observed.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct LineErrors: u8 {
        /// Receive FIFO overflowed.
        const OVERRUN = 1 << 0;
        /// Parity check failed.
        const PARITY  = 1 << 1;
        /// Missing stop bit.
        const FRAMING = 1 << 2;
        /// Line held low for longer than a character time.
        const BREAK   = 1 << 3;
    }
}

/// A character-oriented UART seen as a non-blocking byte port.
///
/// Methods take `&self` because device registers are inherently shared
/// state; the driver serializes all calls on one thread of control.
pub trait TransferPort {
    /// One-time setup: enables the FIFOs and leaves only the receive
    /// (and line-status) interrupts enabled. Line parameters are assumed
    /// to be configured already.
    fn setup(&self);

    /// Returns `true` if the transmitter can take another byte.
    ///
    /// One `true` covers a CR/LF pair: a port that cannot promise room for
    /// two bytes must keep the second one itself rather than drop it.
    fn can_accept(&self) -> bool;

    /// Writes one byte. Only valid after [`can_accept`](Self::can_accept)
    /// returned `true` (at most two sends per check); never waits.
    fn send(&self, byte: u8);

    /// Returns `true` if a received byte is ready.
    fn has_data(&self) -> bool;

    /// Reads one received byte. Only valid after
    /// [`has_data`](Self::has_data) returned `true`.
    fn receive(&self) -> u8;

    /// Enables or disables the transmit-ready interrupt.
    fn set_transmit_interrupt(&self, enabled: bool);

    /// Enables or disables the receive-ready (and receive-timeout) interrupt.
    fn set_receive_interrupt(&self, enabled: bool);

    /// Returns the pending interrupt causes.
    ///
    /// May acknowledge sticky causes in hardware.
    fn interrupt_causes(&self) -> InterruptCauses;

    /// Returns and clears the line errors observed since the last call.
    fn line_errors(&self) -> LineErrors;
}

impl<T: TransferPort + ?Sized> TransferPort for &T {
    fn setup(&self) {
        (**self).setup();
    }

    fn can_accept(&self) -> bool {
        (**self).can_accept()
    }

    fn send(&self, byte: u8) {
        (**self).send(byte);
    }

    fn has_data(&self) -> bool {
        (**self).has_data()
    }

    fn receive(&self) -> u8 {
        (**self).receive()
    }

    fn set_transmit_interrupt(&self, enabled: bool) {
        (**self).set_transmit_interrupt(enabled);
    }

    fn set_receive_interrupt(&self, enabled: bool) {
        (**self).set_receive_interrupt(enabled);
    }

    fn interrupt_causes(&self) -> InterruptCauses {
        (**self).interrupt_causes()
    }

    fn line_errors(&self) -> LineErrors {
        (**self).line_errors()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn receive_causes_want_fill() {
        assert!(InterruptCauses::DATA_AVAILABLE.wants_fill());
        assert!(InterruptCauses::CHARACTER_TIMEOUT.wants_fill());
        assert!(!InterruptCauses::TRANSMIT_EMPTY.wants_fill());
    }

    #[test]
    fn transmit_cause_wants_drain() {
        assert!(InterruptCauses::TRANSMIT_EMPTY.wants_drain());
        assert!(!InterruptCauses::DATA_AVAILABLE.wants_drain());
    }

    #[test]
    fn modem_status_alone_is_not_serviceable() {
        assert!(!InterruptCauses::MODEM_STATUS.is_serviceable());
        assert!(!InterruptCauses::empty().is_serviceable());
        assert!(InterruptCauses::LINE_STATUS.is_serviceable());
        assert!((InterruptCauses::MODEM_STATUS | InterruptCauses::TRANSMIT_EMPTY).is_serviceable());
    }
}
