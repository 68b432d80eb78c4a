//! Scenario runner.
//!
//! Plays the peer's part of the queue protocol against a driver bound to a
//! [`SimUart`], and raises the UART interrupt whenever the simulated
//! hardware has an enabled cause pending.

use anyhow::{Context, Result};
use tether_queue::{QueueHandle, QueueHeader, Slot};
use tether_serial::sim::RecordingNotifier;
use tether_serial::{Channel, DriverStats, QueueRegion, SerialDriver};
use tether_uart::{SimUart, TransferPort};

use crate::config::{SimConfig, Step, line_errors};

/// What a scenario run produced.
#[derive(Debug, Default)]
pub struct Outcome {
    /// Human-readable log of every step.
    pub transcript: Vec<String>,
    /// Everything the UART transmitted.
    pub sent: Vec<u8>,
    /// Everything the peer read from the inbound queue.
    pub delivered: Vec<u8>,
    /// Bytes the peer could not enqueue because the outbound queue was full.
    pub rejected: usize,
    /// Driver counters at the end of the run.
    pub stats: DriverStats,
}

fn new_slots(capacity: u32) -> Vec<Slot> {
    (0..capacity).map(|_| Slot::new(0)).collect()
}

/// Runs every step of `config`.
pub fn run(config: &SimConfig) -> Result<Outcome> {
    let rx_header = QueueHeader::new();
    let tx_header = QueueHeader::new();
    let rx_data = new_slots(config.queues.rx_capacity);
    let tx_data = new_slots(config.queues.tx_capacity);

    let driver = SerialDriver::init(
        SimUart::new(),
        RecordingNotifier::new(),
        QueueRegion::new(&rx_header, &rx_data, config.queues.rx_capacity),
        QueueRegion::new(&tx_header, &tx_data, config.queues.tx_capacity),
        config.driver_config(),
    )
    .context("Driver initialization failed")?;

    let mut sim = Simulation {
        inbound: QueueHandle::attach(&rx_header, &rx_data, config.queues.rx_capacity)?,
        outbound: QueueHandle::attach(&tx_header, &tx_data, config.queues.tx_capacity)?,
        driver,
        outcome: Outcome::default(),
    };

    for (index, step) in config.steps.iter().enumerate() {
        sim.outcome
            .transcript
            .push(format!("step {}: {}", index + 1, describe(step)));
        sim.apply(step);
        sim.raise_pending_interrupt();
        sim.record_effects();
    }

    let stats = *sim.driver.stats();
    let port = sim.driver.port();
    sim.outcome.transcript.push(format!(
        "end: tx irq {}, rx irq {}, {} byte(s) still on the line",
        on_off(port.tx_interrupt_enabled()),
        on_off(port.rx_interrupt_enabled()),
        port.rx_pending(),
    ));
    sim.outcome.transcript.push(format!("stats: {stats}"));
    sim.outcome.stats = stats;
    Ok(sim.outcome)
}

struct Simulation<'a> {
    /// Peer's end of the inbound queue (the peer consumes).
    inbound: QueueHandle<'a>,
    /// Peer's end of the outbound queue (the peer produces).
    outbound: QueueHandle<'a>,
    driver: SerialDriver<'a, SimUart, RecordingNotifier>,
    outcome: Outcome,
}

impl Simulation<'_> {
    fn apply(&mut self, step: &Step) {
        match step {
            Step::PeerWrite { data } => {
                let mut written = 0;
                for &byte in data.as_bytes() {
                    if !self.outbound.enqueue(byte) {
                        break;
                    }
                    written += 1;
                }
                self.outcome.rejected += data.len() - written;
                if self.outbound.signal_required_for_consumer() {
                    self.outbound.cancel_consumer_signal();
                    let tx = self.driver.config().channels.tx;
                    self.wake(tx);
                }
            }
            Step::PeerRead { max } => {
                let limit = max.unwrap_or(usize::MAX);
                let mut chunk = Vec::new();
                while chunk.len() < limit {
                    let Some(byte) = self.inbound.dequeue() else {
                        break;
                    };
                    chunk.push(byte);
                }
                self.outcome
                    .transcript
                    .push(format!("  peer read {}", quoted(&chunk)));
                self.outcome.delivered.extend_from_slice(&chunk);
                self.inbound.request_consumer_signal();
                if !chunk.is_empty() && self.inbound.signal_required_for_producer() {
                    self.inbound.cancel_producer_signal();
                    let rx = self.driver.config().channels.rx;
                    self.wake(rx);
                }
            }
            Step::Line { data } => self.driver.port().push_rx(data.as_bytes()),
            Step::TxReady { budget } => self.driver.port().set_tx_budget(*budget),
            Step::LineError { errors } => self.driver.port().inject_errors(line_errors(errors)),
            Step::Wake { channel } => self.wake(Channel::new(*channel)),
        }
    }

    fn raise_pending_interrupt(&mut self) {
        if self.driver.port().interrupt_causes().is_serviceable() {
            let irq = self.driver.config().channels.irq;
            self.wake(irq);
        }
    }

    fn wake(&mut self, channel: Channel) {
        self.outcome.transcript.push(format!("  wake {channel}"));
        if let Err(err) = self.driver.handle_wake(channel) {
            self.outcome.transcript.push(format!("  error: {err}"));
        }
    }

    fn record_effects(&mut self) {
        let sent = self.driver.port().take_sent();
        if !sent.is_empty() {
            self.outcome.transcript.push(format!("  sent {}", quoted(&sent)));
            self.outcome.sent.extend_from_slice(&sent);
        }
        for channel in self.driver.notifier().notified() {
            self.outcome.transcript.push(format!("  notify {channel}"));
        }
        self.driver.notifier_mut().clear();
    }
}

fn describe(step: &Step) -> String {
    match step {
        Step::PeerWrite { data } => format!("peer writes {}", quoted(data.as_bytes())),
        Step::PeerRead { max: Some(max) } => format!("peer reads up to {max}"),
        Step::PeerRead { max: None } => "peer reads".to_string(),
        Step::Line { data } => format!("line delivers {}", quoted(data.as_bytes())),
        Step::TxReady { budget: Some(n) } => format!("transmitter ready {n} more time(s)"),
        Step::TxReady { budget: None } => "transmitter always ready".to_string(),
        Step::LineError { errors } => format!("line errors {:?}", line_errors(errors)),
        Step::Wake { channel } => format!("raw wake on ch{channel}"),
    }
}

fn quoted(bytes: &[u8]) -> String {
    format!("{:?}", String::from_utf8_lossy(bytes))
}

fn on_off(enabled: bool) -> &'static str {
    if enabled { "on" } else { "off" }
}
