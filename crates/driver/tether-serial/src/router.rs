//! Wake event routing.

use tether_uart::TransferPort;

use crate::config::{Channel, WakeSource};
use crate::driver::{Notifier, SerialDriver, Trigger};
use crate::error::SerialError;
use crate::swarn;

impl<P: TransferPort, N: Notifier> SerialDriver<'_, P, N> {
    /// Handles one wake event.
    ///
    /// # Errors
    ///
    /// Returns [`SerialError::UnknownChannel`] if `channel` is not one of the
    /// driver's channels. Nothing else happens in that case.
    pub fn handle_wake(&mut self, channel: Channel) -> Result<(), SerialError> {
        match self.config.channels.classify(channel) {
            Some(WakeSource::Interrupt) => {
                self.dispatch();
            }
            Some(WakeSource::Transmit) => {
                self.drain(Trigger::Peer);
            }
            Some(WakeSource::Receive) => {
                // The peer freed space; leave backpressure.
                self.port.set_receive_interrupt(true);
                self.fill(Trigger::Peer);
            }
            None => {
                self.stats.unknown_wakes += 1;
                swarn!("serial: wake on unknown channel {}", channel);
                return Err(SerialError::UnknownChannel(channel.as_u32()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tether_queue::QueueStorage;
    use tether_uart::SimUart;

    use super::*;
    use crate::config::{ChannelMap, DriverConfig};
    use crate::driver::QueueRegion;
    use crate::sim::RecordingNotifier;

    const MAP: ChannelMap = ChannelMap {
        irq: Channel::new(10),
        tx: Channel::new(11),
        rx: Channel::new(12),
    };

    fn config() -> DriverConfig {
        DriverConfig {
            channels: MAP,
            ..DriverConfig::DEFAULT
        }
    }

    #[test]
    fn transmit_channel_drains() {
        let (rx, tx) = (QueueStorage::<4>::new(), QueueStorage::<4>::new());
        let mut drv = SerialDriver::init(
            SimUart::new(),
            RecordingNotifier::new(),
            QueueRegion::from_storage(&rx),
            QueueRegion::from_storage(&tx),
            config(),
        )
        .unwrap();
        tx.handle().unwrap().enqueue(b'k');

        drv.handle_wake(MAP.tx).unwrap();

        assert_eq!(drv.port().sent(), b"k");
        assert_eq!(drv.notifier().notified(), [MAP.tx]);
        assert!(drv.notifier().acked().is_empty());
    }

    #[test]
    fn interrupt_channel_dispatches_and_acks() {
        let (rx, tx) = (QueueStorage::<4>::new(), QueueStorage::<4>::new());
        let mut drv = SerialDriver::init(
            SimUart::new(),
            RecordingNotifier::new(),
            QueueRegion::from_storage(&rx),
            QueueRegion::from_storage(&tx),
            config(),
        )
        .unwrap();
        drv.port().push_rx(b"z");

        drv.handle_wake(MAP.irq).unwrap();

        assert_eq!(rx.handle().unwrap().dequeue(), Some(b'z'));
        assert_eq!(drv.notifier().notified(), [MAP.rx]);
        assert_eq!(drv.notifier().acked(), [MAP.irq]);
    }

    #[test]
    fn receive_channel_reenables_intake() {
        let (rx, tx) = (QueueStorage::<4>::new(), QueueStorage::<4>::new());
        let mut drv = SerialDriver::init(
            SimUart::new(),
            RecordingNotifier::new(),
            QueueRegion::from_storage(&rx),
            QueueRegion::from_storage(&tx),
            config(),
        )
        .unwrap();
        drv.port().set_receive_interrupt(false);

        drv.handle_wake(MAP.rx).unwrap();

        assert!(drv.port().rx_interrupt_enabled());
    }

    #[test]
    fn unknown_channel_is_reported_and_ignored() {
        let (rx, tx) = (QueueStorage::<4>::new(), QueueStorage::<4>::new());
        let mut drv = SerialDriver::init(
            SimUart::new(),
            RecordingNotifier::new(),
            QueueRegion::from_storage(&rx),
            QueueRegion::from_storage(&tx),
            config(),
        )
        .unwrap();
        tx.handle().unwrap().enqueue(b'k');
        drv.port().push_rx(b"z");

        assert_eq!(
            drv.handle_wake(Channel::new(0)),
            Err(SerialError::UnknownChannel(0))
        );

        assert!(drv.port().sent().is_empty());
        assert_eq!(drv.port().rx_pending(), 1);
        assert!(drv.notifier().notified().is_empty());
        assert!(drv.notifier().acked().is_empty());
        assert_eq!(drv.stats().unknown_wakes, 1);
    }
}
