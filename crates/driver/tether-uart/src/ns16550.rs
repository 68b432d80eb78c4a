//! 8250/16550-compatible MMIO UART.
//!
//! Covers the NXP QorIQ DUART (byte-spaced registers, two instances per
//! block at [`DUART1_OFFSET`] and [`DUART2_OFFSET`]) and the Synopsys
//! DesignWare 8250 (4-byte register stride, 32-bit access). Line settings
//! (baud, parity, framing) are left as programmed by firmware.

use core::cell::Cell;

use bitflags::bitflags;

use crate::mmio::MmioRegion;
use crate::{InterruptCauses, LineErrors, TransferPort};

// ---------------------------------------------------------------------------
// Register offsets
// ---------------------------------------------------------------------------

/// Register indices (before applying the layout's stride).
mod reg {
    /// Transmit Holding Register (write).
    pub const THR: usize = 0;
    /// Receive Buffer Register (read).
    pub const RBR: usize = 0;
    /// Interrupt Enable Register.
    pub const IER: usize = 1;
    /// Interrupt Identification Register (read).
    pub const IIR: usize = 2;
    /// FIFO Control Register (write).
    pub const FCR: usize = 2;
    /// Line Status Register.
    pub const LSR: usize = 5;
}

/// Offset of the first DUART instance within an LS1043A DUART block.
pub const DUART1_OFFSET: usize = 0x500;
/// Offset of the second DUART instance within an LS1043A DUART block.
pub const DUART2_OFFSET: usize = 0x600;

// ---------------------------------------------------------------------------
// Bitflag types
// ---------------------------------------------------------------------------

bitflags! {
    /// Interrupt Enable Register bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Ier: u8 {
        /// Received data available (also gates the character timeout).
        const DATA_AVAILABLE    = 1 << 0;
        /// Transmitter holding register empty.
        const THR_EMPTY         = 1 << 1;
        /// Receiver line status.
        const LINE_STATUS       = 1 << 2;
        /// Modem status.
        const MODEM_STATUS      = 1 << 3;
    }
}

bitflags! {
    /// FIFO Control Register bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Fcr: u8 {
        /// Enable FIFOs.
        const ENABLE            = 1 << 0;
        /// Clear receive FIFO.
        const CLEAR_RX          = 1 << 1;
        /// Clear transmit FIFO.
        const CLEAR_TX          = 1 << 2;
        /// Trigger level: 1 byte.
        const TRIGGER_1         = 0b00 << 6;
        /// Trigger level: 4 bytes.
        const TRIGGER_4         = 0b01 << 6;
        /// Trigger level: 8 bytes.
        const TRIGGER_8         = 0b10 << 6;
        /// Trigger level: 14 bytes.
        const TRIGGER_14        = 0b11 << 6;
    }
}

bitflags! {
    /// Line Status Register bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Lsr: u8 {
        /// Data ready (received data available).
        const DATA_READY        = 1 << 0;
        /// Overrun error.
        const OVERRUN_ERROR     = 1 << 1;
        /// Parity error.
        const PARITY_ERROR      = 1 << 2;
        /// Framing error.
        const FRAMING_ERROR     = 1 << 3;
        /// Break indicator.
        const BREAK_INDICATOR   = 1 << 4;
        /// Transmit Holding Register (FIFO) empty.
        const THR_EMPTY         = 1 << 5;
        /// Transmitter empty (both THR and shift register).
        const TRANSMITTER_EMPTY = 1 << 6;
        /// Error in received FIFO.
        const FIFO_ERROR        = 1 << 7;
    }
}

impl Lsr {
    /// Maps the error bits onto [`LineErrors`].
    #[must_use]
    pub fn line_errors(self) -> LineErrors {
        let mut errors = LineErrors::empty();
        errors.set(LineErrors::OVERRUN, self.contains(Self::OVERRUN_ERROR));
        errors.set(LineErrors::PARITY, self.contains(Self::PARITY_ERROR));
        errors.set(LineErrors::FRAMING, self.contains(Self::FRAMING_ERROR));
        errors.set(LineErrors::BREAK, self.contains(Self::BREAK_INDICATOR));
        errors
    }
}

// ---------------------------------------------------------------------------
// IIR decoding
// ---------------------------------------------------------------------------

/// IIR bit 0: set when no interrupt is pending.
const IIR_NO_PENDING: u8 = 1 << 0;

/// Decodes an Interrupt Identification Register value.
///
/// Bit 0 clear means an interrupt is pending; bits 3:1 identify it. The
/// FIFO status bits (7:6) are ignored.
#[must_use]
pub const fn decode_iir(iir: u8) -> InterruptCauses {
    if iir & IIR_NO_PENDING != 0 {
        return InterruptCauses::empty();
    }
    match (iir >> 1) & 0b111 {
        0b011 => InterruptCauses::LINE_STATUS,
        0b010 => InterruptCauses::DATA_AVAILABLE,
        0b110 => InterruptCauses::CHARACTER_TIMEOUT,
        0b001 => InterruptCauses::TRANSMIT_EMPTY,
        0b000 => InterruptCauses::MODEM_STATUS,
        _ => InterruptCauses::empty(),
    }
}

// ---------------------------------------------------------------------------
// Ns16550
// ---------------------------------------------------------------------------

/// Register spacing and access width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterLayout {
    /// Consecutive byte registers, 8-bit access (NXP DUART, PC-style 16550).
    Byte,
    /// Registers on a 4-byte stride, 32-bit access (DesignWare 8250).
    Word,
}

/// A 16550-compatible UART behind an MMIO window.
///
/// Reading LSR clears its error bits, so every LSR read folds the error bits
/// into a sticky set returned by [`TransferPort::line_errors`]; readiness
/// polling therefore never loses an error report.
#[derive(Debug)]
pub struct Ns16550 {
    regs: MmioRegion,
    layout: RegisterLayout,
    sticky_errors: Cell<LineErrors>,
}

impl Ns16550 {
    /// Creates a handle for the UART whose registers start at `base`.
    /// Does **not** touch hardware.
    ///
    /// # Safety
    ///
    /// `base` must map the UART's register block (at least eight registers
    /// with the given layout) for the lifetime of the handle, and nothing
    /// else may drive the same UART.
    #[must_use]
    pub const unsafe fn new(base: *mut u8, layout: RegisterLayout) -> Self {
        Self {
            // SAFETY: Forwarded from the caller's contract.
            regs: unsafe { MmioRegion::new(base) },
            layout,
            sticky_errors: Cell::new(LineErrors::empty()),
        }
    }

    /// Creates a handle for one instance of an LS1043A DUART block.
    ///
    /// # Safety
    ///
    /// `block` must map the whole DUART block (at least
    /// `instance_offset + 8` bytes); see [`new`](Self::new).
    #[must_use]
    pub const unsafe fn duart(block: *mut u8, instance_offset: usize) -> Self {
        // SAFETY: Forwarded from the caller's contract.
        unsafe { Self::new(block.wrapping_add(instance_offset), RegisterLayout::Byte) }
    }

    fn read(&self, reg: usize) -> u8 {
        match self.layout {
            RegisterLayout::Byte => self.regs.read_u8(reg),
            #[allow(clippy::cast_possible_truncation)]
            RegisterLayout::Word => self.regs.read_u32(reg << 2) as u8,
        }
    }

    fn write(&self, reg: usize, value: u8) {
        match self.layout {
            RegisterLayout::Byte => self.regs.write_u8(reg, value),
            RegisterLayout::Word => self.regs.write_u32(reg << 2, u32::from(value)),
        }
    }

    /// Returns the current Line Status Register value.
    #[must_use]
    pub fn line_status(&self) -> Lsr {
        let lsr = Lsr::from_bits_truncate(self.read(reg::LSR));
        let errors = lsr.line_errors();
        if !errors.is_empty() {
            self.sticky_errors.set(self.sticky_errors.get() | errors);
        }
        lsr
    }

    /// Returns the current Interrupt Enable Register value.
    #[must_use]
    pub fn interrupt_enable(&self) -> Ier {
        Ier::from_bits_truncate(self.read(reg::IER))
    }

    fn update_ier(&self, bits: Ier, enabled: bool) {
        let mut ier = self.interrupt_enable();
        ier.set(bits, enabled);
        self.write(reg::IER, ier.bits());
    }
}

impl TransferPort for Ns16550 {
    fn setup(&self) {
        self.write(reg::IER, 0);
        self.write(
            reg::FCR,
            (Fcr::ENABLE | Fcr::CLEAR_RX | Fcr::CLEAR_TX | Fcr::TRIGGER_14).bits(),
        );
        self.write(reg::IER, (Ier::DATA_AVAILABLE | Ier::LINE_STATUS).bits());
    }

    fn can_accept(&self) -> bool {
        // With FIFOs enabled THRE means the whole transmit FIFO is empty.
        self.line_status().contains(Lsr::THR_EMPTY)
    }

    fn send(&self, byte: u8) {
        self.write(reg::THR, byte);
    }

    fn has_data(&self) -> bool {
        self.line_status().contains(Lsr::DATA_READY)
    }

    fn receive(&self) -> u8 {
        self.read(reg::RBR)
    }

    fn set_transmit_interrupt(&self, enabled: bool) {
        self.update_ier(Ier::THR_EMPTY, enabled);
    }

    fn set_receive_interrupt(&self, enabled: bool) {
        self.update_ier(Ier::DATA_AVAILABLE, enabled);
    }

    fn interrupt_causes(&self) -> InterruptCauses {
        decode_iir(self.read(reg::IIR))
    }

    fn line_errors(&self) -> LineErrors {
        // Sample LSR once more so errors latched since the last poll count.
        let _ = self.line_status();
        self.sticky_errors.replace(LineErrors::empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// RAM stand-in for a register block. Reads return whatever was last
    /// written, so tests pre-load status registers by hand.
    struct Regs {
        mem: [u32; 16],
    }

    impl Regs {
        fn new() -> Self {
            Self { mem: [0; 16] }
        }

        fn byte_uart(&mut self) -> Ns16550 {
            // SAFETY: `mem` outlives the handle within each test.
            unsafe { Ns16550::new(self.mem.as_mut_ptr().cast(), RegisterLayout::Byte) }
        }

        fn word_uart(&mut self) -> Ns16550 {
            // SAFETY: `mem` outlives the handle within each test.
            unsafe { Ns16550::new(self.mem.as_mut_ptr().cast(), RegisterLayout::Word) }
        }
    }

    #[test]
    fn decode_iir_values() {
        assert_eq!(decode_iir(0x01), InterruptCauses::empty());
        assert_eq!(decode_iir(0xC1), InterruptCauses::empty());
        assert_eq!(decode_iir(0x06), InterruptCauses::LINE_STATUS);
        assert_eq!(decode_iir(0x04), InterruptCauses::DATA_AVAILABLE);
        assert_eq!(decode_iir(0xC4), InterruptCauses::DATA_AVAILABLE);
        assert_eq!(decode_iir(0x0C), InterruptCauses::CHARACTER_TIMEOUT);
        assert_eq!(decode_iir(0x02), InterruptCauses::TRANSMIT_EMPTY);
        assert_eq!(decode_iir(0xC2), InterruptCauses::TRANSMIT_EMPTY);
        assert_eq!(decode_iir(0x00), InterruptCauses::MODEM_STATUS);
    }

    #[test]
    fn lsr_error_mapping() {
        let lsr = Lsr::OVERRUN_ERROR | Lsr::BREAK_INDICATOR | Lsr::DATA_READY;
        assert_eq!(lsr.line_errors(), LineErrors::OVERRUN | LineErrors::BREAK);
        assert_eq!(Lsr::THR_EMPTY.line_errors(), LineErrors::empty());
    }

    #[test]
    fn setup_enables_receive_and_line_status_only() {
        let mut regs = Regs::new();
        let uart = regs.byte_uart();
        uart.write(reg::IER, 0xFF);
        uart.setup();
        assert_eq!(uart.interrupt_enable(), Ier::DATA_AVAILABLE | Ier::LINE_STATUS);
    }

    #[test]
    fn interrupt_toggles_preserve_other_bits() {
        let mut regs = Regs::new();
        let uart = regs.byte_uart();
        uart.setup();

        uart.set_transmit_interrupt(true);
        assert!(uart.interrupt_enable().contains(Ier::THR_EMPTY));
        assert!(uart.interrupt_enable().contains(Ier::DATA_AVAILABLE));

        uart.set_receive_interrupt(false);
        assert_eq!(uart.interrupt_enable(), Ier::THR_EMPTY | Ier::LINE_STATUS);

        uart.set_transmit_interrupt(false);
        uart.set_receive_interrupt(true);
        assert_eq!(uart.interrupt_enable(), Ier::DATA_AVAILABLE | Ier::LINE_STATUS);
    }

    #[test]
    fn readiness_follows_lsr() {
        let mut regs = Regs::new();
        let uart = regs.byte_uart();
        uart.write(reg::LSR, 0);
        assert!(!uart.can_accept());
        assert!(!uart.has_data());

        uart.write(reg::LSR, (Lsr::THR_EMPTY | Lsr::DATA_READY).bits());
        assert!(uart.can_accept());
        assert!(uart.has_data());
    }

    #[test]
    fn errors_seen_while_polling_are_sticky() {
        let mut regs = Regs::new();
        let uart = regs.byte_uart();
        uart.write(reg::LSR, (Lsr::DATA_READY | Lsr::FRAMING_ERROR).bits());
        assert!(uart.has_data());
        // Hardware clears the error bits on read.
        uart.write(reg::LSR, Lsr::DATA_READY.bits());
        assert_eq!(uart.line_errors(), LineErrors::FRAMING);
        assert_eq!(uart.line_errors(), LineErrors::empty());
    }

    #[test]
    fn word_layout_uses_four_byte_stride() {
        let mut regs = Regs::new();
        let uart = regs.word_uart();
        uart.send(b'A');
        uart.set_receive_interrupt(true);
        assert_eq!(regs.mem[reg::THR], u32::from(b'A'));
        assert_eq!(regs.mem[reg::IER], u32::from(Ier::DATA_AVAILABLE.bits()));
    }

    #[test]
    fn duart_instance_offsets() {
        let mut block = [0u8; 0x700];
        // SAFETY: `block` covers both instances and outlives the handles.
        let second = unsafe { Ns16550::duart(block.as_mut_ptr(), DUART2_OFFSET) };
        second.send(b'Z');
        assert_eq!(block[DUART2_OFFSET + reg::THR], b'Z');
        assert_eq!(block[DUART1_OFFSET + reg::THR], 0);
    }
}
