//! Interrupt-driven UART driver for shared-memory serial queues.
//!
//! The driver sits between one UART and two single-producer/single-consumer
//! byte queues shared with a peer component:
//!
//! - outbound (tx): the peer produces, the driver drains into the UART;
//! - inbound (rx): the driver fills from the UART, the peer consumes.
//!
//! It runs only when woken, either by the UART interrupt or by a peer
//! signal, and every wake runs to completion through
//! [`SerialDriver::handle_wake`]. Neither side polls. Each side arms a
//! signal request in the queue before its final check for work, and the
//! other side only signals when it finds the request armed, so a wakeup
//! is never lost and never sent for nothing.
//!
//! The UART is reached through [`tether_uart::TransferPort`] and the rest
//! of the system through [`Notifier`], which keeps the whole engine
//! runnable on the host.

#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]

#[cfg(any(test, feature = "sim"))]
extern crate alloc;

pub mod config;
mod driver;
pub mod error;
mod irq;
pub mod log;
mod router;
mod rx;
#[cfg(any(test, feature = "sim"))]
pub mod sim;
pub mod stats;
mod tx;

pub use config::{Channel, ChannelMap, DriverConfig, WakeSource};
pub use driver::{Notifier, QueueRegion, SerialDriver, Trigger};
pub use error::SerialError;
pub use rx::{FillReport, RxOutcome};
pub use stats::DriverStats;
pub use tx::{DrainReport, TxOutcome};
