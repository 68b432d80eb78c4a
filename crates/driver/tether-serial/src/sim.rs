//! Host-side collaborators for tests and simulation.

use alloc::vec::Vec;

use crate::config::Channel;
use crate::driver::Notifier;

/// A [`Notifier`] that records every call.
#[derive(Debug, Default, Clone)]
pub struct RecordingNotifier {
    notified: Vec<Channel>,
    acked: Vec<Channel>,
}

impl RecordingNotifier {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Channels woken so far, in order.
    #[must_use]
    pub fn notified(&self) -> &[Channel] {
        &self.notified
    }

    /// Interrupt acknowledgements so far, in order.
    #[must_use]
    pub fn acked(&self) -> &[Channel] {
        &self.acked
    }

    /// Forgets everything recorded so far.
    pub fn clear(&mut self) {
        self.notified.clear();
        self.acked.clear();
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&mut self, channel: Channel) {
        self.notified.push(channel);
    }

    fn ack_irq(&mut self, channel: Channel) {
        self.acked.push(channel);
    }
}
