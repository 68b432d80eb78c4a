//! Single-producer/single-consumer byte queues over shared memory.
//!
//! This crate contains the shared-memory transport between the serial driver
//! and its clients: a [`QueueHandle`] over a [`QueueHeader`] control block and
//! a byte data region, plus the wakeup-request flags both sides use to avoid
//! polling without losing notifications.
//!
//! It has no dependencies and is `no_std`, so it can be mapped into any
//! component, and its memory ordering can be model-checked on the host with
//! `RUSTFLAGS="--cfg loom" cargo test -p tether-queue --release`.
//!
//! # Example
//!
//! ```ignore
//! use tether_queue::QueueStorage;
//!
//! let storage = QueueStorage::<8>::new();
//! let q = storage.handle()?;
//!
//! // Producer
//! q.enqueue(b'h');
//! if q.signal_required_for_consumer() {
//!     q.cancel_consumer_signal();
//!     // notify the consumer
//! }
//!
//! // Consumer
//! assert_eq!(q.dequeue(), Some(b'h'));
//! ```

#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]

mod error;
mod loom_compat;
mod queue;

pub use error::QueueError;
pub use queue::{QueueHandle, QueueHeader, QueueStorage, Slot};
