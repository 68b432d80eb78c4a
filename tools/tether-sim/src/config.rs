//! Scenario file loading and validation.

use std::path::Path;

use anyhow::{Context, Result, bail, ensure};
use serde::Deserialize;
use tether_serial::log::LogLevel;
use tether_serial::{Channel, ChannelMap, DriverConfig};
use tether_uart::LineErrors;

/// A scenario file.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimConfig {
    /// Most verbose driver log level shown.
    #[serde(default)]
    pub log_level: LevelName,
    /// Driver settings.
    #[serde(default)]
    pub driver: DriverSection,
    /// Queue sizes.
    #[serde(default)]
    pub queues: QueueSection,
    /// Steps, run in order.
    #[serde(default, rename = "step")]
    pub steps: Vec<Step>,
}

/// Driver log level names.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LevelName {
    /// Errors only.
    Error,
    /// Warnings and errors.
    #[default]
    Warn,
    /// Informational and above.
    Info,
    /// Debug and above.
    Debug,
    /// Everything.
    Trace,
}

impl From<LevelName> for LogLevel {
    fn from(name: LevelName) -> Self {
        match name {
            LevelName::Error => Self::Error,
            LevelName::Warn => Self::Warn,
            LevelName::Info => Self::Info,
            LevelName::Debug => Self::Debug,
            LevelName::Trace => Self::Trace,
        }
    }
}

/// `[driver]` section.
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DriverSection {
    /// Emit `\n` as `\r\n`.
    pub translate_newlines: bool,
    /// Cause-servicing rounds per interrupt.
    pub dispatch_limit: u32,
    /// Channel numbers.
    pub channels: ChannelSection,
}

impl Default for DriverSection {
    fn default() -> Self {
        let defaults = DriverConfig::DEFAULT;
        Self {
            translate_newlines: defaults.translate_newlines,
            dispatch_limit: defaults.dispatch_limit,
            channels: ChannelSection::default(),
        }
    }
}

/// `[driver.channels]` section.
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChannelSection {
    /// Hardware interrupt channel.
    pub irq: u32,
    /// Outbound queue channel.
    pub tx: u32,
    /// Inbound queue channel.
    pub rx: u32,
}

impl Default for ChannelSection {
    fn default() -> Self {
        let map = ChannelMap::DEFAULT;
        Self {
            irq: map.irq.as_u32(),
            tx: map.tx.as_u32(),
            rx: map.rx.as_u32(),
        }
    }
}

/// `[queues]` section.
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QueueSection {
    /// Inbound queue capacity in bytes.
    pub rx_capacity: u32,
    /// Outbound queue capacity in bytes.
    pub tx_capacity: u32,
}

impl Default for QueueSection {
    fn default() -> Self {
        Self {
            rx_capacity: 64,
            tx_capacity: 64,
        }
    }
}

/// One scenario step.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum Step {
    /// The peer enqueues bytes on the outbound queue.
    PeerWrite {
        /// Bytes to write.
        data: String,
    },
    /// The peer dequeues from the inbound queue.
    PeerRead {
        /// Upper bound on bytes read; everything if absent.
        #[serde(default)]
        max: Option<usize>,
    },
    /// Bytes arrive on the line.
    Line {
        /// Bytes received.
        data: String,
    },
    /// Changes how many more times the transmitter reports ready.
    TxReady {
        /// Remaining ready answers; always ready if absent.
        #[serde(default)]
        budget: Option<u32>,
    },
    /// The line reports errors.
    LineError {
        /// Error kinds.
        errors: Vec<ErrorKind>,
    },
    /// A raw wake event.
    Wake {
        /// Channel number.
        channel: u32,
    },
}

/// Line error names.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    /// Receive overrun.
    Overrun,
    /// Parity error.
    Parity,
    /// Framing error.
    Framing,
    /// Break condition.
    Break,
}

/// Folds error names into a [`LineErrors`] set.
pub fn line_errors(kinds: &[ErrorKind]) -> LineErrors {
    kinds.iter().fold(LineErrors::empty(), |acc, kind| {
        acc | match kind {
            ErrorKind::Overrun => LineErrors::OVERRUN,
            ErrorKind::Parity => LineErrors::PARITY,
            ErrorKind::Framing => LineErrors::FRAMING,
            ErrorKind::Break => LineErrors::BREAK,
        }
    })
}

impl SimConfig {
    /// Reads, parses and validates a scenario file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config = Self::parse(&content)
            .with_context(|| format!("Invalid scenario {}", path.display()))?;
        Ok(config)
    }

    /// Parses and validates scenario text.
    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).context("Failed to parse TOML")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        for (name, capacity) in [
            ("rx_capacity", self.queues.rx_capacity),
            ("tx_capacity", self.queues.tx_capacity),
        ] {
            ensure!(
                capacity.is_power_of_two(),
                "queues.{name} must be a non-zero power of two, got {capacity}"
            );
        }
        if self.driver.dispatch_limit == 0 {
            bail!("driver.dispatch_limit must be at least 1");
        }
        ensure!(
            self.channel_map().is_distinct(),
            "driver.channels must be three different channels"
        );
        Ok(())
    }

    /// Channel assignment.
    pub fn channel_map(&self) -> ChannelMap {
        let ch = &self.driver.channels;
        ChannelMap {
            irq: Channel::new(ch.irq),
            tx: Channel::new(ch.tx),
            rx: Channel::new(ch.rx),
        }
    }

    /// Driver configuration.
    pub fn driver_config(&self) -> DriverConfig {
        DriverConfig {
            channels: self.channel_map(),
            translate_newlines: self.driver.translate_newlines,
            dispatch_limit: self.driver.dispatch_limit,
        }
    }
}
