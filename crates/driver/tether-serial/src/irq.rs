//! Hardware interrupt dispatch.

use tether_uart::{InterruptCauses, TransferPort};

use crate::driver::{Notifier, SerialDriver, Trigger};
use crate::{strace, swarn};

impl<P: TransferPort, N: Notifier> SerialDriver<'_, P, N> {
    /// Services a UART interrupt.
    ///
    /// Re-reads the pending causes after every round and keeps going until
    /// none the driver services is left, or until
    /// [`dispatch_limit`](crate::DriverConfig::dispatch_limit) rounds have
    /// run. The interrupt is acknowledged in either case. Returns the number
    /// of rounds.
    pub fn dispatch(&mut self) -> u32 {
        let limit = self.config.dispatch_limit;
        let mut rounds = 0;

        loop {
            let causes = self.port.interrupt_causes();
            if !causes.is_serviceable() {
                break;
            }
            if rounds == limit {
                self.stats.dispatch_limit_hits += 1;
                swarn!(
                    "serial: interrupt still pending after {} rounds ({:?})",
                    rounds,
                    causes
                );
                break;
            }
            rounds += 1;

            if causes.contains(InterruptCauses::LINE_STATUS) {
                self.collect_line_errors();
            }
            if causes.wants_fill() {
                self.fill(Trigger::Interrupt);
            }
            if causes.wants_drain() {
                self.drain(Trigger::Interrupt);
            }
        }

        self.stats.interrupts += 1;
        self.notifier.ack_irq(self.config.channels.irq);
        strace!("serial: interrupt serviced in {} rounds", rounds);
        rounds
    }
}

#[cfg(test)]
mod tests {
    use tether_queue::QueueStorage;
    use tether_uart::pl011::{Fr, Irq};
    use tether_uart::{LineErrors, Pl011, SimUart};

    use super::*;
    use crate::config::DriverConfig;
    use crate::driver::QueueRegion;
    use crate::sim::RecordingNotifier;
    use crate::tx::TxOutcome;

    /// A port whose interrupt never clears.
    struct StuckPort(SimUart);

    impl TransferPort for StuckPort {
        fn setup(&self) {
            self.0.setup();
        }
        fn can_accept(&self) -> bool {
            self.0.can_accept()
        }
        fn send(&self, byte: u8) {
            self.0.send(byte);
        }
        fn has_data(&self) -> bool {
            self.0.has_data()
        }
        fn receive(&self) -> u8 {
            self.0.receive()
        }
        fn set_transmit_interrupt(&self, enabled: bool) {
            self.0.set_transmit_interrupt(enabled);
        }
        fn set_receive_interrupt(&self, enabled: bool) {
            self.0.set_receive_interrupt(enabled);
        }
        fn interrupt_causes(&self) -> InterruptCauses {
            InterruptCauses::CHARACTER_TIMEOUT
        }
        fn line_errors(&self) -> LineErrors {
            self.0.line_errors()
        }
    }

    #[test]
    fn services_receive_and_transmit_then_acks() {
        let rx = QueueStorage::<16>::new();
        let tx = QueueStorage::<16>::new();
        let mut drv = SerialDriver::init(
            SimUart::new(),
            RecordingNotifier::new(),
            QueueRegion::from_storage(&rx),
            QueueRegion::from_storage(&tx),
            DriverConfig::DEFAULT,
        )
        .unwrap();
        // Outbound bytes left waiting on a busy transmitter.
        drv.port().set_tx_budget(Some(0));
        tx.handle().unwrap().enqueue(b'o');
        drv.drain(Trigger::Peer);
        assert!(drv.port().tx_interrupt_enabled());

        drv.port().set_tx_budget(None);
        drv.port().push_rx(b"in");
        let rounds = drv.dispatch();

        assert_eq!(rounds, 1);
        assert_eq!(drv.port().sent(), b"o");
        assert_eq!(rx.handle().unwrap().len(), 2);
        assert!(!drv.port().tx_interrupt_enabled());
        assert_eq!(drv.notifier().acked(), [drv.config().channels.irq]);
        assert_eq!(drv.stats().interrupts, 1);
    }

    #[test]
    fn spurious_interrupt_is_still_acknowledged() {
        let rx = QueueStorage::<4>::new();
        let tx = QueueStorage::<4>::new();
        let mut drv = SerialDriver::init(
            SimUart::new(),
            RecordingNotifier::new(),
            QueueRegion::from_storage(&rx),
            QueueRegion::from_storage(&tx),
            DriverConfig::DEFAULT,
        )
        .unwrap();

        assert_eq!(drv.dispatch(), 0);
        assert_eq!(drv.notifier().acked().len(), 1);
        assert!(drv.notifier().notified().is_empty());
    }

    #[test]
    fn line_status_is_recorded() {
        let rx = QueueStorage::<4>::new();
        let tx = QueueStorage::<4>::new();
        let mut drv = SerialDriver::init(
            SimUart::new(),
            RecordingNotifier::new(),
            QueueRegion::from_storage(&rx),
            QueueRegion::from_storage(&tx),
            DriverConfig::DEFAULT,
        )
        .unwrap();
        drv.port().inject_errors(LineErrors::OVERRUN | LineErrors::BREAK);

        assert_eq!(drv.dispatch(), 1);
        assert_eq!(drv.stats().overruns, 1);
        assert_eq!(drv.stats().breaks, 1);
        assert_eq!(drv.stats().line_errors(), 2);
    }

    #[test]
    fn stuck_cause_is_bounded() {
        let rx = QueueStorage::<4>::new();
        let tx = QueueStorage::<4>::new();
        let config = DriverConfig {
            dispatch_limit: 5,
            ..DriverConfig::DEFAULT
        };
        let mut drv = SerialDriver::init(
            StuckPort(SimUart::new()),
            RecordingNotifier::new(),
            QueueRegion::from_storage(&rx),
            QueueRegion::from_storage(&tx),
            config,
        )
        .unwrap();

        assert_eq!(drv.dispatch(), 5);
        assert_eq!(drv.stats().dispatch_limit_hits, 1);
        assert_eq!(drv.notifier().acked().len(), 1);
    }

    #[test]
    fn pl011_transmit_interrupt_drains_partly_filled_fifo() {
        const DR: usize = 0;
        const FR: usize = 0x18 / 4;
        const RIS: usize = 0x3C / 4;

        let mut mem = [0u32; 0x20];
        let regs = mem.as_mut_ptr();
        let poke = |word: usize, value: u32| {
            // SAFETY: `word` indexes `mem`, which outlives the driver.
            unsafe { regs.add(word).write_volatile(value) }
        };
        // SAFETY: `mem` covers the PL011 register block and outlives the driver.
        let port = unsafe { Pl011::new(regs.cast()) };
        let rx = QueueStorage::<4>::new();
        let tx = QueueStorage::<4>::new();
        let mut drv = SerialDriver::init(
            port,
            RecordingNotifier::new(),
            QueueRegion::from_storage(&rx),
            QueueRegion::from_storage(&tx),
            DriverConfig::DEFAULT,
        )
        .unwrap();

        // A full FIFO leaves the byte queued behind the transmit interrupt.
        poke(FR, (Fr::RXFE | Fr::TXFF).bits());
        assert!(tx.handle().unwrap().enqueue(b'x'));
        assert_eq!(drv.drain(Trigger::Peer).outcome, TxOutcome::AwaitHardware);
        assert!(drv.port().interrupt_mask().contains(Irq::TX));

        // The FIFO has fallen to its trigger level but is not empty.
        poke(FR, Fr::RXFE.bits());
        poke(RIS, Irq::TX.bits());

        assert_eq!(drv.dispatch(), 1);
        // SAFETY: As above.
        assert_eq!(unsafe { regs.add(DR).read_volatile() }, u32::from(b'x'));
        assert!(tx.handle().unwrap().is_empty());
        assert!(!drv.port().interrupt_mask().contains(Irq::TX));
        assert_eq!(drv.stats().dispatch_limit_hits, 0);
    }
}
