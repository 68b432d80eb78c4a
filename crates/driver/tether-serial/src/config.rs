//! Driver configuration.
//!
//! Everything here is `const`-constructible so a driver image can carry its
//! configuration in a `static`.

use core::fmt;

/// A notification channel number, as assigned by the system that wires the
/// driver to its peers and its interrupt line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Channel(u32);

impl Channel {
    /// Creates a channel from its raw number.
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw channel number.
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ch{}", self.0)
    }
}

/// What a wake event on a known channel means.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakeSource {
    /// The UART raised its interrupt.
    Interrupt,
    /// The peer enqueued outbound bytes.
    Transmit,
    /// The peer consumed inbound bytes.
    Receive,
}

/// Channel assignment of the three wake sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelMap {
    /// Hardware interrupt delivery.
    pub irq: Channel,
    /// Outbound (transmit) queue peer.
    pub tx: Channel,
    /// Inbound (receive) queue peer.
    pub rx: Channel,
}

impl ChannelMap {
    /// The conventional assignment: interrupt 0, transmit 1, receive 2.
    pub const DEFAULT: Self = Self {
        irq: Channel::new(0),
        tx: Channel::new(1),
        rx: Channel::new(2),
    };

    /// Maps a channel to its wake source, or `None` if the driver does not
    /// own it. On overlapping assignments the interrupt wins, then transmit.
    #[must_use]
    pub fn classify(&self, channel: Channel) -> Option<WakeSource> {
        if channel == self.irq {
            Some(WakeSource::Interrupt)
        } else if channel == self.tx {
            Some(WakeSource::Transmit)
        } else if channel == self.rx {
            Some(WakeSource::Receive)
        } else {
            None
        }
    }

    /// Returns `true` if all three channels differ.
    #[must_use]
    pub fn is_distinct(&self) -> bool {
        self.irq != self.tx && self.irq != self.rx && self.tx != self.rx
    }
}

impl Default for ChannelMap {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Driver configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverConfig {
    /// Wake channel assignment.
    pub channels: ChannelMap,
    /// Emit `\n` as `\r\n` on transmit.
    pub translate_newlines: bool,
    /// Maximum cause-servicing rounds per hardware interrupt.
    pub dispatch_limit: u32,
}

impl DriverConfig {
    /// Default configuration.
    pub const DEFAULT: Self = Self {
        channels: ChannelMap::DEFAULT,
        translate_newlines: true,
        dispatch_limit: 64,
    };
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_channels() {
        let map = ChannelMap::default();
        assert_eq!(map.classify(Channel::new(0)), Some(WakeSource::Interrupt));
        assert_eq!(map.classify(Channel::new(1)), Some(WakeSource::Transmit));
        assert_eq!(map.classify(Channel::new(2)), Some(WakeSource::Receive));
        assert_eq!(map.classify(Channel::new(3)), None);
        assert!(map.is_distinct());
    }

    #[test]
    fn overlapping_map_prefers_interrupt() {
        let map = ChannelMap {
            irq: Channel::new(4),
            tx: Channel::new(4),
            rx: Channel::new(5),
        };
        assert!(!map.is_distinct());
        assert_eq!(map.classify(Channel::new(4)), Some(WakeSource::Interrupt));
    }

    #[test]
    fn channel_display_and_raw() {
        let ch = Channel::new(9);
        assert_eq!(ch.as_u32(), 9);
        assert_eq!(format!("{ch}"), "ch9");
    }

    #[test]
    fn default_config() {
        let config = DriverConfig::default();
        assert!(config.translate_newlines);
        assert_eq!(config.dispatch_limit, 64);
        assert_eq!(config.channels, ChannelMap::DEFAULT);
    }
}
