//! Scripted in-memory port.
//!
//! [`SimUart`] stands in for real hardware in tests and in the host
//! simulator. The line side is scripted up front: bytes waiting to be
//! received, how many more times the transmitter reports ready, and line
//! errors to raise. Everything the driver does to the port is recorded.

use alloc::collections::VecDeque;
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};

use crate::{InterruptCauses, LineErrors, TransferPort};

/// A simulated UART.
#[derive(Debug, Default)]
pub struct SimUart {
    rx_backlog: RefCell<VecDeque<u8>>,
    /// Remaining `can_accept` grants; `None` means always ready.
    tx_budget: Cell<Option<u32>>,
    sent: RefCell<Vec<u8>>,
    tx_irq: Cell<bool>,
    rx_irq: Cell<bool>,
    pending_errors: Cell<LineErrors>,
    setup_calls: Cell<u32>,
}

impl SimUart {
    /// Creates an idle port with an always-ready transmitter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues bytes as if they arrived on the line.
    pub fn push_rx(&self, bytes: &[u8]) {
        self.rx_backlog.borrow_mut().extend(bytes.iter().copied());
    }

    /// Limits how many more times [`can_accept`](TransferPort::can_accept)
    /// answers `true`. `None` makes the transmitter always ready.
    pub fn set_tx_budget(&self, budget: Option<u32>) {
        self.tx_budget.set(budget);
    }

    /// Returns the remaining transmit budget.
    #[must_use]
    pub fn tx_budget(&self) -> Option<u32> {
        self.tx_budget.get()
    }

    /// Raises line errors; they are reported once through
    /// [`line_errors`](TransferPort::line_errors).
    pub fn inject_errors(&self, errors: LineErrors) {
        self.pending_errors.set(self.pending_errors.get() | errors);
    }

    /// Returns a copy of every byte sent so far.
    #[must_use]
    pub fn sent(&self) -> Vec<u8> {
        self.sent.borrow().clone()
    }

    /// Returns and forgets every byte sent so far.
    pub fn take_sent(&self) -> Vec<u8> {
        core::mem::take(&mut *self.sent.borrow_mut())
    }

    /// Number of bytes still waiting on the line.
    #[must_use]
    pub fn rx_pending(&self) -> usize {
        self.rx_backlog.borrow().len()
    }

    /// Returns `true` if the transmit-ready interrupt is enabled.
    #[must_use]
    pub fn tx_interrupt_enabled(&self) -> bool {
        self.tx_irq.get()
    }

    /// Returns `true` if the receive-ready interrupt is enabled.
    #[must_use]
    pub fn rx_interrupt_enabled(&self) -> bool {
        self.rx_irq.get()
    }

    /// Number of times [`setup`](TransferPort::setup) ran.
    #[must_use]
    pub fn setup_calls(&self) -> u32 {
        self.setup_calls.get()
    }

    fn tx_ready(&self) -> bool {
        self.tx_budget.get().is_none_or(|left| left > 0)
    }
}

impl TransferPort for SimUart {
    fn setup(&self) {
        self.setup_calls.set(self.setup_calls.get() + 1);
        self.tx_irq.set(false);
        self.rx_irq.set(true);
    }

    fn can_accept(&self) -> bool {
        match self.tx_budget.get() {
            None => true,
            Some(0) => false,
            Some(left) => {
                self.tx_budget.set(Some(left - 1));
                true
            }
        }
    }

    fn send(&self, byte: u8) {
        self.sent.borrow_mut().push(byte);
    }

    fn has_data(&self) -> bool {
        !self.rx_backlog.borrow().is_empty()
    }

    fn receive(&self) -> u8 {
        // An empty receive buffer reads as zero.
        self.rx_backlog.borrow_mut().pop_front().unwrap_or(0)
    }

    fn set_transmit_interrupt(&self, enabled: bool) {
        self.tx_irq.set(enabled);
    }

    fn set_receive_interrupt(&self, enabled: bool) {
        self.rx_irq.set(enabled);
    }

    fn interrupt_causes(&self) -> InterruptCauses {
        let mut causes = InterruptCauses::empty();
        causes.set(
            InterruptCauses::DATA_AVAILABLE,
            self.rx_irq.get() && self.has_data(),
        );
        causes.set(
            InterruptCauses::TRANSMIT_EMPTY,
            self.tx_irq.get() && self.tx_ready(),
        );
        causes.set(
            InterruptCauses::LINE_STATUS,
            !self.pending_errors.get().is_empty(),
        );
        causes
    }

    fn line_errors(&self) -> LineErrors {
        self.pending_errors.replace(LineErrors::empty())
    }
}
