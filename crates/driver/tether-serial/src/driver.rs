//! Driver context and its collaborators.

use tether_queue::{QueueHandle, QueueHeader, QueueStorage, Slot};
use tether_uart::TransferPort;

use crate::config::{Channel, DriverConfig};
use crate::error::SerialError;
use crate::stats::DriverStats;
use crate::sdebug;

/// Delivery of notifications to the rest of the system.
pub trait Notifier {
    /// Wakes the peer listening on `channel`.
    fn notify(&mut self, channel: Channel);

    /// Acknowledges the hardware interrupt delivered on `channel`, allowing
    /// the next one to be delivered.
    fn ack_irq(&mut self, channel: Channel);
}

/// What caused a transfer engine to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// The UART raised its interrupt.
    Interrupt,
    /// The peer signalled the driver.
    Peer,
}

/// Result of one settle step of a transfer engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Settle<T> {
    /// The other side made progress in the window before the signal request
    /// was armed; run another pass.
    Reprocess,
    /// The engine has reached a state in which it can sleep.
    Done(T),
}

/// A shared-memory queue region handed to the driver at start-up.
#[derive(Debug, Clone, Copy)]
pub struct QueueRegion<'a> {
    header: &'a QueueHeader,
    data: &'a [Slot],
    capacity: u32,
}

impl<'a> QueueRegion<'a> {
    /// Describes a region from its control block and data slots.
    #[must_use]
    pub const fn new(header: &'a QueueHeader, data: &'a [Slot], capacity: u32) -> Self {
        Self {
            header,
            data,
            capacity,
        }
    }

    /// Describes the whole of an in-process queue allocation.
    #[must_use]
    pub fn from_storage<const N: usize>(storage: &'a QueueStorage<N>) -> Self {
        // Oversized storage is rejected as an invalid capacity at init.
        let capacity = u32::try_from(N).unwrap_or(u32::MAX);
        Self::new(storage.header(), storage.data(), capacity)
    }

    fn init(self) -> Result<QueueHandle<'a>, SerialError> {
        Ok(QueueHandle::init(self.header, self.data, self.capacity)?)
    }
}

/// Describes the region behind an attached handle, such as one bound to
/// mapped memory with [`QueueHandle::from_raw`].
impl<'a> From<QueueHandle<'a>> for QueueRegion<'a> {
    fn from(handle: QueueHandle<'a>) -> Self {
        Self::new(handle.header(), handle.data(), handle.capacity())
    }
}

/// The serial driver: one UART, one inbound and one outbound queue.
///
/// All state lives here; every entry point takes `&mut self`, so wake
/// events are handled strictly one at a time.
pub struct SerialDriver<'a, P, N> {
    pub(crate) port: P,
    pub(crate) notifier: N,
    /// Inbound queue: the driver produces, the peer consumes.
    pub(crate) rx: QueueHandle<'a>,
    /// Outbound queue: the peer produces, the driver consumes.
    pub(crate) tx: QueueHandle<'a>,
    pub(crate) config: DriverConfig,
    pub(crate) stats: DriverStats,
}

impl<'a, P: TransferPort, N: Notifier> SerialDriver<'a, P, N> {
    /// One-time start-up: resets both queues (empty, both signal requests
    /// armed) and sets up the UART with the receive interrupt enabled and
    /// the transmit interrupt disabled.
    ///
    /// # Errors
    ///
    /// Returns [`SerialError::Queue`] if either region is unusable. The
    /// hardware is not touched in that case.
    pub fn init(
        port: P,
        notifier: N,
        rx_region: QueueRegion<'a>,
        tx_region: QueueRegion<'a>,
        config: DriverConfig,
    ) -> Result<Self, SerialError> {
        let rx = rx_region.init()?;
        let tx = tx_region.init()?;

        port.setup();
        port.set_transmit_interrupt(false);
        port.set_receive_interrupt(true);

        sdebug!(
            "serial: up, rx capacity {} tx capacity {} (irq {}, tx {}, rx {})",
            rx.capacity(),
            tx.capacity(),
            config.channels.irq,
            config.channels.tx,
            config.channels.rx,
        );

        Ok(Self {
            port,
            notifier,
            rx,
            tx,
            config,
            stats: DriverStats::new(),
        })
    }

    /// Returns the UART.
    pub fn port(&self) -> &P {
        &self.port
    }

    /// Returns the notifier.
    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    /// Returns the notifier mutably.
    pub fn notifier_mut(&mut self) -> &mut N {
        &mut self.notifier
    }

    /// Returns the inbound queue.
    pub fn rx_queue(&self) -> QueueHandle<'a> {
        self.rx
    }

    /// Returns the outbound queue.
    pub fn tx_queue(&self) -> QueueHandle<'a> {
        self.tx
    }

    /// Returns the configuration.
    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// Returns the telemetry counters.
    pub fn stats(&self) -> &DriverStats {
        &self.stats
    }

    /// Wakes the peer on `channel` and counts it.
    pub(crate) fn notify_peer(&mut self, channel: Channel) {
        self.notifier.notify(channel);
        self.stats.notifications += 1;
    }
}

impl<P, N> core::fmt::Debug for SerialDriver<'_, P, N> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SerialDriver")
            .field("rx", &self.rx)
            .field("tx", &self.tx)
            .field("config", &self.config)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}
