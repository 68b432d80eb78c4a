//! ARM PrimeCell PL011 UART.
//!
//! 32-bit registers. Unlike the 16550, the interrupt status registers report
//! every pending cause at once. Receive and transmit causes clear themselves
//! as the FIFOs are serviced (or their masks are dropped); error causes are
//! cleared through ICR when read.
//!
//! The transmit interrupt fires when the FIFO falls to its trigger level, not
//! when it empties, so the port accepts bytes whenever the FIFO is not full.
//! FR has no fill level, so the second byte of a CR/LF pair can find the FIFO
//! full. That byte is held in the handle and written as soon as the FIFO has
//! room; the transmit interrupt stays unmasked until it has gone out.

use core::cell::Cell;

use bitflags::bitflags;

use crate::mmio::MmioRegion;
use crate::{InterruptCauses, LineErrors, TransferPort};

/// Register offsets from the UART base address.
mod reg {
    /// Data Register.
    pub const DR: usize = 0x00;
    /// Receive Status / Error Clear Register.
    pub const RSR_ECR: usize = 0x04;
    /// Flag Register.
    pub const FR: usize = 0x18;
    /// Line Control Register.
    pub const LCR_H: usize = 0x2C;
    /// Control Register.
    pub const CR: usize = 0x30;
    /// Interrupt Mask Set/Clear Register.
    pub const IMSC: usize = 0x38;
    /// Raw Interrupt Status Register.
    pub const RIS: usize = 0x3C;
    /// Interrupt Clear Register.
    pub const ICR: usize = 0x44;
}

bitflags! {
    /// Flag Register bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Fr: u32 {
        /// UART busy transmitting.
        const BUSY = 1 << 3;
        /// Receive FIFO empty.
        const RXFE = 1 << 4;
        /// Transmit FIFO full.
        const TXFF = 1 << 5;
        /// Receive FIFO full.
        const RXFF = 1 << 6;
        /// Transmit FIFO empty.
        const TXFE = 1 << 7;
    }
}

bitflags! {
    /// Interrupt bits shared by IMSC, RIS, MIS and ICR.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Irq: u32 {
        /// Receive FIFO at trigger level.
        const RX = 1 << 4;
        /// Transmit FIFO at trigger level.
        const TX = 1 << 5;
        /// Receive timeout.
        const RT = 1 << 6;
        /// Framing error.
        const FE = 1 << 7;
        /// Parity error.
        const PE = 1 << 8;
        /// Break error.
        const BE = 1 << 9;
        /// Overrun error.
        const OE = 1 << 10;

        /// All error interrupts.
        const ERRORS = Self::FE.bits() | Self::PE.bits() | Self::BE.bits() | Self::OE.bits();
        /// Receive-side data interrupts.
        const RECEIVE = Self::RX.bits() | Self::RT.bits();
    }
}

/// LCR_H: enable FIFOs.
const LCR_H_FEN: u32 = 1 << 4;
/// CR: UART enable.
const CR_UARTEN: u32 = 1 << 0;
/// CR: transmit enable.
const CR_TXE: u32 = 1 << 8;
/// CR: receive enable.
const CR_RXE: u32 = 1 << 9;
/// ICR: every clearable interrupt.
const ICR_ALL: u32 = 0x7FF;

/// DR bits 11:8 carry the error flags of the byte in bits 7:0.
const DR_ERROR_SHIFT: u32 = 8;

/// Decodes a masked interrupt status value (RIS & IMSC).
#[must_use]
pub fn decode_mis(mis: Irq) -> InterruptCauses {
    let mut causes = InterruptCauses::empty();
    causes.set(InterruptCauses::DATA_AVAILABLE, mis.contains(Irq::RX));
    causes.set(InterruptCauses::CHARACTER_TIMEOUT, mis.contains(Irq::RT));
    causes.set(InterruptCauses::TRANSMIT_EMPTY, mis.contains(Irq::TX));
    causes.set(InterruptCauses::LINE_STATUS, mis.intersects(Irq::ERRORS));
    causes
}

/// Maps RSR (or DR bits 11:8 shifted down) onto [`LineErrors`].
#[must_use]
pub fn decode_rsr(rsr: u32) -> LineErrors {
    let mut errors = LineErrors::empty();
    errors.set(LineErrors::FRAMING, rsr & (1 << 0) != 0);
    errors.set(LineErrors::PARITY, rsr & (1 << 1) != 0);
    errors.set(LineErrors::BREAK, rsr & (1 << 2) != 0);
    errors.set(LineErrors::OVERRUN, rsr & (1 << 3) != 0);
    errors
}

/// A PL011 UART behind an MMIO window.
#[derive(Debug)]
pub struct Pl011 {
    regs: MmioRegion,
    sticky_errors: Cell<LineErrors>,
    held: Cell<Option<u8>>,
}

impl Pl011 {
    /// Creates a handle for the UART whose registers start at `base`.
    /// Does **not** touch hardware.
    ///
    /// # Safety
    ///
    /// `base` must map the PL011 register block (0x48 bytes, 4-byte aligned)
    /// for the lifetime of the handle, and nothing else may drive the UART.
    #[must_use]
    pub const unsafe fn new(base: *mut u8) -> Self {
        Self {
            // SAFETY: Forwarded from the caller's contract.
            regs: unsafe { MmioRegion::new(base) },
            sticky_errors: Cell::new(LineErrors::empty()),
            held: Cell::new(None),
        }
    }

    /// Returns the current Flag Register value.
    #[must_use]
    pub fn flags(&self) -> Fr {
        Fr::from_bits_truncate(self.regs.read_u32(reg::FR))
    }

    /// Returns the current interrupt mask.
    #[must_use]
    pub fn interrupt_mask(&self) -> Irq {
        Irq::from_bits_truncate(self.regs.read_u32(reg::IMSC))
    }

    /// Returns the byte waiting for transmit FIFO space, if any.
    #[must_use]
    pub fn held_byte(&self) -> Option<u8> {
        self.held.get()
    }

    fn tx_full(&self) -> bool {
        self.flags().contains(Fr::TXFF)
    }

    fn flush_held(&self) {
        if let Some(byte) = self.held.get().filter(|_| !self.tx_full()) {
            self.regs.write_u32(reg::DR, u32::from(byte));
            self.held.set(None);
        }
    }

    fn update_mask(&self, bits: Irq, enabled: bool) {
        let mut mask = self.interrupt_mask();
        mask.set(bits, enabled);
        self.regs.write_u32(reg::IMSC, mask.bits());
    }

    fn note_errors(&self, errors: LineErrors) {
        if !errors.is_empty() {
            self.sticky_errors.set(self.sticky_errors.get() | errors);
        }
    }
}

impl TransferPort for Pl011 {
    fn setup(&self) {
        self.regs.write_u32(reg::IMSC, 0);
        self.regs.write_u32(reg::ICR, ICR_ALL);
        // Control registers must not change while the UART is enabled.
        let cr = self.regs.read_u32(reg::CR);
        self.regs.write_u32(reg::CR, cr & !CR_UARTEN);
        let lcr_h = self.regs.read_u32(reg::LCR_H);
        self.regs.write_u32(reg::LCR_H, lcr_h | LCR_H_FEN);
        self.regs.write_u32(reg::CR, cr | CR_UARTEN | CR_TXE | CR_RXE);
        self.regs.write_u32(reg::IMSC, (Irq::RECEIVE | Irq::ERRORS).bits());
    }

    fn can_accept(&self) -> bool {
        self.flush_held();
        self.held.get().is_none() && !self.tx_full()
    }

    fn send(&self, byte: u8) {
        if self.tx_full() {
            self.held.set(Some(byte));
        } else {
            self.regs.write_u32(reg::DR, u32::from(byte));
        }
    }

    fn has_data(&self) -> bool {
        !self.flags().contains(Fr::RXFE)
    }

    #[allow(clippy::cast_possible_truncation)]
    fn receive(&self) -> u8 {
        let dr = self.regs.read_u32(reg::DR);
        self.note_errors(decode_rsr(dr >> DR_ERROR_SHIFT));
        dr as u8
    }

    fn set_transmit_interrupt(&self, enabled: bool) {
        self.update_mask(Irq::TX, enabled || self.held.get().is_some());
    }

    fn set_receive_interrupt(&self, enabled: bool) {
        self.update_mask(Irq::RECEIVE, enabled);
    }

    fn interrupt_causes(&self) -> InterruptCauses {
        self.flush_held();
        let raw = Irq::from_bits_truncate(self.regs.read_u32(reg::RIS));
        let pending = raw & self.interrupt_mask();
        let errors = pending & Irq::ERRORS;
        if !errors.is_empty() {
            self.regs.write_u32(reg::ICR, errors.bits());
        }
        decode_mis(pending)
    }

    fn line_errors(&self) -> LineErrors {
        let rsr = self.regs.read_u32(reg::RSR_ECR);
        let errors = decode_rsr(rsr);
        if !errors.is_empty() {
            // Any write to ECR clears RSR.
            self.regs.write_u32(reg::RSR_ECR, 0);
            self.note_errors(errors);
        }
        self.sticky_errors.replace(LineErrors::empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(offset: usize) -> usize {
        offset / 4
    }

    fn uart(mem: &mut [u32; 0x20]) -> Pl011 {
        // SAFETY: `mem` covers the register block and outlives the handle.
        unsafe { Pl011::new(mem.as_mut_ptr().cast()) }
    }

    #[test]
    fn decode_mis_reports_every_cause() {
        let causes = decode_mis(Irq::RX | Irq::TX | Irq::OE);
        assert_eq!(
            causes,
            InterruptCauses::DATA_AVAILABLE
                | InterruptCauses::TRANSMIT_EMPTY
                | InterruptCauses::LINE_STATUS
        );
        assert_eq!(decode_mis(Irq::RT), InterruptCauses::CHARACTER_TIMEOUT);
        assert_eq!(decode_mis(Irq::empty()), InterruptCauses::empty());
    }

    #[test]
    fn decode_rsr_bits() {
        assert_eq!(decode_rsr(0b0001), LineErrors::FRAMING);
        assert_eq!(decode_rsr(0b1010), LineErrors::PARITY | LineErrors::OVERRUN);
        assert_eq!(decode_rsr(0), LineErrors::empty());
    }

    #[test]
    fn setup_enables_fifo_and_receive_interrupts() {
        let mut mem = [0u32; 0x20];
        let port = uart(&mut mem);
        port.setup();
        assert_eq!(port.interrupt_mask(), Irq::RECEIVE | Irq::ERRORS);
        assert_ne!(mem[word(reg::LCR_H)] & LCR_H_FEN, 0);
        assert_eq!(
            mem[word(reg::CR)] & (CR_UARTEN | CR_TXE | CR_RXE),
            CR_UARTEN | CR_TXE | CR_RXE
        );
    }

    #[test]
    fn setup_on_enabled_uart_keeps_line_settings() {
        const WLEN_8: u32 = 0b11 << 5;
        const CR_LBE: u32 = 1 << 7;
        let mut mem = [0u32; 0x20];
        mem[word(reg::LCR_H)] = WLEN_8;
        mem[word(reg::CR)] = CR_UARTEN | CR_LBE;
        let port = uart(&mut mem);
        port.setup();
        assert_eq!(mem[word(reg::LCR_H)], WLEN_8 | LCR_H_FEN);
        assert_eq!(mem[word(reg::CR)], CR_UARTEN | CR_LBE | CR_TXE | CR_RXE);
    }

    #[test]
    fn receive_interrupt_toggle_covers_timeout() {
        let mut mem = [0u32; 0x20];
        let port = uart(&mut mem);
        port.setup();
        port.set_receive_interrupt(false);
        assert!(!port.interrupt_mask().intersects(Irq::RECEIVE));
        assert!(port.interrupt_mask().contains(Irq::ERRORS));
        port.set_transmit_interrupt(true);
        port.set_receive_interrupt(true);
        assert_eq!(port.interrupt_mask(), Irq::RECEIVE | Irq::TX | Irq::ERRORS);
    }

    #[test]
    fn readiness_follows_flags() {
        let mut mem = [0u32; 0x20];
        mem[word(reg::FR)] = (Fr::RXFE | Fr::TXFF).bits();
        let port = uart(&mut mem);
        assert!(!port.can_accept());
        assert!(!port.has_data());
        port.regs.write_u32(reg::FR, Fr::TXFE.bits());
        assert!(port.can_accept());
        assert!(port.has_data());
    }

    #[test]
    fn partly_filled_fifo_accepts() {
        let mut mem = [0u32; 0x20];
        mem[word(reg::FR)] = Fr::RXFE.bits();
        let port = uart(&mut mem);
        assert!(port.can_accept());
        port.send(b'z');
        assert_eq!(port.regs.read_u32(reg::DR), u32::from(b'z'));
    }

    #[test]
    fn byte_sent_into_full_fifo_is_held() {
        let mut mem = [0u32; 0x20];
        mem[word(reg::FR)] = (Fr::RXFE | Fr::TXFF).bits();
        let port = uart(&mut mem);
        port.setup();
        port.send(b'\n');
        assert_eq!(port.held_byte(), Some(b'\n'));
        assert_eq!(port.regs.read_u32(reg::DR), 0);

        // Masking the transmit interrupt waits for the held byte.
        port.set_transmit_interrupt(false);
        assert!(port.interrupt_mask().contains(Irq::TX));
        assert!(!port.can_accept());

        port.regs.write_u32(reg::FR, Fr::RXFE.bits());
        assert!(port.can_accept());
        assert_eq!(port.held_byte(), None);
        assert_eq!(port.regs.read_u32(reg::DR), u32::from(b'\n'));
        port.set_transmit_interrupt(false);
        assert!(!port.interrupt_mask().contains(Irq::TX));
    }

    #[test]
    fn causes_ignore_masked_raw_status() {
        let mut mem = [0u32; 0x20];
        mem[word(reg::RIS)] = (Irq::TX | Irq::RX).bits();
        mem[word(reg::IMSC)] = Irq::RX.bits();
        let port = uart(&mut mem);
        assert_eq!(port.interrupt_causes(), InterruptCauses::DATA_AVAILABLE);
        port.set_transmit_interrupt(true);
        assert_eq!(
            port.interrupt_causes(),
            InterruptCauses::DATA_AVAILABLE | InterruptCauses::TRANSMIT_EMPTY
        );
    }

    #[test]
    fn receive_records_per_byte_errors() {
        let mut mem = [0u32; 0x20];
        // Byte 'q' with a parity error flagged in DR[9].
        mem[word(reg::DR)] = u32::from(b'q') | (1 << 9);
        let port = uart(&mut mem);
        assert_eq!(port.receive(), b'q');
        assert_eq!(port.line_errors(), LineErrors::PARITY);
        assert_eq!(port.line_errors(), LineErrors::empty());
    }

    #[test]
    fn error_causes_are_cleared_through_icr() {
        let mut mem = [0u32; 0x20];
        mem[word(reg::RIS)] = (Irq::RX | Irq::BE).bits();
        mem[word(reg::IMSC)] = (Irq::RECEIVE | Irq::ERRORS).bits();
        let port = uart(&mut mem);
        let causes = port.interrupt_causes();
        assert!(causes.contains(InterruptCauses::LINE_STATUS));
        assert!(causes.contains(InterruptCauses::DATA_AVAILABLE));
        assert_eq!(mem[word(reg::ICR)], Irq::BE.bits());
    }
}
