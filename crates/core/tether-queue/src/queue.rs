//! Shared-memory byte queue with wakeup-request flags.
//!
//! A queue is split into two regions that are mapped into both the driver and
//! its peer: a [`QueueHeader`] control block and a data region of `capacity`
//! byte slots. Exactly one side produces (advances `tail`) and exactly one side
//! consumes (advances `head`); neither ever writes the other's index.
//!
//! # Indices
//!
//! `head` and `tail` are free-running `u32` counters. The slot for an index is
//! `index & (capacity - 1)`, which is why the capacity must be a power of two:
//! the counters can then wrap at `u32::MAX` without disturbing the occupancy
//! computation `tail - head` (wrapping).
//!
//! # Signal requests
//!
//! Each side can ask the other to notify it:
//!
//! - the consumer arms the *consumer signal* before sleeping on an empty queue
//!   and the producer checks it after enqueueing;
//! - the producer arms the *producer signal* before sleeping on a full queue
//!   and the consumer checks it after dequeueing.
//!
//! Arming is followed by a `SeqCst` fence and checking is preceded by one. A
//! side that arms and then re-checks the queue, paired with a side that
//! publishes and then checks the flag, cannot both miss each other.

use crate::error::QueueError;
use crate::loom_compat::{AtomicU8, AtomicU32, Ordering, fence};

/// One byte slot of a queue data region.
pub type Slot = AtomicU8;

/// Flag value meaning "the owner of this flag wants a notification".
const REQUESTED: u32 = 1;
/// Flag value meaning "no notification wanted".
const CLEAR: u32 = 0;

// ---------------------------------------------------------------------------
// QueueHeader
// ---------------------------------------------------------------------------

/// Shared control block of a queue.
///
/// The layout is fixed (`repr(C)`, four 32-bit words) so that a peer written
/// against the same layout can map the region.
#[repr(C)]
#[derive(Debug)]
pub struct QueueHeader {
    /// Next slot to write. Advanced only by the producer.
    tail: AtomicU32,
    /// Next slot to read. Advanced only by the consumer.
    head: AtomicU32,
    /// The producer wants to be woken when space frees.
    producer_signal: AtomicU32,
    /// The consumer wants to be woken when data arrives.
    consumer_signal: AtomicU32,
}

impl QueueHeader {
    /// Creates an empty control block with both signal requests armed.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tail: AtomicU32::new(0),
            head: AtomicU32::new(0),
            producer_signal: AtomicU32::new(REQUESTED),
            consumer_signal: AtomicU32::new(REQUESTED),
        }
    }
}

impl Default for QueueHeader {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// QueueHandle
// ---------------------------------------------------------------------------

/// A view of one shared queue.
///
/// The handle itself holds no state besides the references and the capacity;
/// every query re-reads the shared indices.
#[derive(Clone, Copy)]
pub struct QueueHandle<'a> {
    header: &'a QueueHeader,
    data: &'a [Slot],
    capacity: u32,
}

impl<'a> QueueHandle<'a> {
    /// Binds a handle to an existing queue without touching its state.
    ///
    /// Only the first `capacity` slots of `data` are used.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::InvalidCapacity`] if `capacity` is not a non-zero
    /// power of two, or [`QueueError::RegionTooSmall`] if `data` has fewer
    /// than `capacity` slots.
    pub fn attach(
        header: &'a QueueHeader,
        data: &'a [Slot],
        capacity: u32,
    ) -> Result<Self, QueueError> {
        if !capacity.is_power_of_two() {
            return Err(QueueError::InvalidCapacity(capacity));
        }
        let needed = capacity as usize;
        if data.len() < needed {
            return Err(QueueError::RegionTooSmall {
                needed,
                actual: data.len(),
            });
        }

        Ok(Self {
            header,
            data: &data[..needed],
            capacity,
        })
    }

    /// Binds a handle and resets the queue to empty with both signal
    /// requests armed.
    ///
    /// # Errors
    ///
    /// Same as [`attach`](Self::attach).
    pub fn init(
        header: &'a QueueHeader,
        data: &'a [Slot],
        capacity: u32,
    ) -> Result<Self, QueueError> {
        let handle = Self::attach(header, data, capacity)?;
        handle.reset();
        Ok(handle)
    }

    /// Binds a handle to raw shared-memory regions.
    ///
    /// # Safety
    ///
    /// `header` must point to a valid, suitably aligned [`QueueHeader`] and
    /// `data` to at least `capacity` bytes, both mapped for the lifetime
    /// `'a`. The regions may be shared with exactly one other party that
    /// follows the single-producer/single-consumer contract.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::InvalidCapacity`] if `capacity` is not a non-zero
    /// power of two.
    #[cfg(not(loom))]
    pub unsafe fn from_raw(
        header: *const QueueHeader,
        data: *const u8,
        capacity: u32,
    ) -> Result<Self, QueueError> {
        if !capacity.is_power_of_two() {
            return Err(QueueError::InvalidCapacity(capacity));
        }
        // SAFETY: The caller guarantees both regions are valid for 'a.
        // `AtomicU8` has the same in-memory representation as `u8`.
        let (header, data) = unsafe {
            (
                &*header,
                core::slice::from_raw_parts(data.cast::<Slot>(), capacity as usize),
            )
        };
        Self::attach(header, data, capacity)
    }

    /// Resets both indices to zero and arms both signal requests.
    ///
    /// Only valid while neither side is using the queue (driver start-up).
    pub fn reset(&self) {
        self.header.tail.store(0, Ordering::Relaxed);
        self.header.head.store(0, Ordering::Relaxed);
        self.header.producer_signal.store(REQUESTED, Ordering::Relaxed);
        self.header.consumer_signal.store(REQUESTED, Ordering::Relaxed);
        fence(Ordering::SeqCst);
    }

    /// Returns the number of byte slots.
    #[must_use]
    pub const fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Returns the shared control block.
    #[must_use]
    pub const fn header(&self) -> &'a QueueHeader {
        self.header
    }

    /// Returns the data slots in use.
    #[must_use]
    pub const fn data(&self) -> &'a [Slot] {
        self.data
    }

    /// Returns a snapshot of the read index.
    #[must_use]
    pub fn head(&self) -> u32 {
        self.header.head.load(Ordering::Acquire)
    }

    /// Returns a snapshot of the write index.
    #[must_use]
    pub fn tail(&self) -> u32 {
        self.header.tail.load(Ordering::Acquire)
    }

    /// Returns the number of bytes currently queued.
    #[must_use]
    pub fn len(&self) -> u32 {
        self.tail().wrapping_sub(self.head())
    }

    /// Returns the number of free slots.
    #[must_use]
    pub fn free_space(&self) -> u32 {
        self.capacity.saturating_sub(self.len())
    }

    /// Returns `true` if no bytes are queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.head() == self.tail()
    }

    /// Returns `true` if every slot holds an unread byte.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.len() >= self.capacity
    }

    #[inline]
    fn slot(&self, index: u32) -> &Slot {
        &self.data[(index & (self.capacity - 1)) as usize]
    }

    /// Appends a byte. Producer side only.
    ///
    /// Returns `false` without side effects if the queue is full.
    pub fn enqueue(&self, byte: u8) -> bool {
        let tail = self.header.tail.load(Ordering::Relaxed);
        let head = self.header.head.load(Ordering::Acquire);
        if tail.wrapping_sub(head) >= self.capacity {
            return false;
        }

        self.slot(tail).store(byte, Ordering::Relaxed);
        // Publishes the slot write.
        self.header.tail.store(tail.wrapping_add(1), Ordering::Release);
        true
    }

    /// Removes the oldest byte. Consumer side only.
    ///
    /// Returns `None` if the queue is empty.
    pub fn dequeue(&self) -> Option<u8> {
        let head = self.header.head.load(Ordering::Relaxed);
        let tail = self.header.tail.load(Ordering::Acquire);
        if head == tail {
            return None;
        }

        let byte = self.slot(head).load(Ordering::Relaxed);
        // Releases the slot back to the producer.
        self.header.head.store(head.wrapping_add(1), Ordering::Release);
        Some(byte)
    }

    // -- Signal requests ------------------------------------------------------

    /// Consumer: asks the producer for a notification when data arrives.
    pub fn request_consumer_signal(&self) {
        self.header.consumer_signal.store(REQUESTED, Ordering::Relaxed);
        fence(Ordering::SeqCst);
    }

    /// Clears the consumer's notification request.
    pub fn cancel_consumer_signal(&self) {
        self.header.consumer_signal.store(CLEAR, Ordering::Relaxed);
    }

    /// Producer: asks the consumer for a notification when space frees.
    pub fn request_producer_signal(&self) {
        self.header.producer_signal.store(REQUESTED, Ordering::Relaxed);
        fence(Ordering::SeqCst);
    }

    /// Clears the producer's notification request.
    pub fn cancel_producer_signal(&self) {
        self.header.producer_signal.store(CLEAR, Ordering::Relaxed);
    }

    /// Returns `true` if the producer has asked to be notified.
    ///
    /// Checked by the consumer after dequeueing.
    #[must_use]
    pub fn signal_required_for_producer(&self) -> bool {
        fence(Ordering::SeqCst);
        self.header.producer_signal.load(Ordering::Relaxed) == REQUESTED
    }

    /// Returns `true` if the consumer has asked to be notified.
    ///
    /// Checked by the producer after enqueueing.
    #[must_use]
    pub fn signal_required_for_consumer(&self) -> bool {
        fence(Ordering::SeqCst);
        self.header.consumer_signal.load(Ordering::Relaxed) == REQUESTED
    }
}

impl core::fmt::Debug for QueueHandle<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("QueueHandle")
            .field("head", &self.head())
            .field("tail", &self.tail())
            .field("capacity", &self.capacity)
            .field("producer_signal", &self.signal_required_for_producer())
            .field("consumer_signal", &self.signal_required_for_consumer())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// QueueStorage
// ---------------------------------------------------------------------------

/// A header and data region allocated together.
///
/// Stands in for a mapped shared-memory region when both sides live in the
/// same address space (tests, simulation, statically allocated queues).
pub struct QueueStorage<const N: usize> {
    header: QueueHeader,
    data: [Slot; N],
}

impl<const N: usize> QueueStorage<N> {
    /// Creates zeroed storage with both signal requests armed.
    #[must_use]
    pub fn new() -> Self {
        Self {
            header: QueueHeader::new(),
            data: core::array::from_fn(|_| Slot::new(0)),
        }
    }

    /// Returns the control block.
    #[must_use]
    pub fn header(&self) -> &QueueHeader {
        &self.header
    }

    /// Returns the data region.
    #[must_use]
    pub fn data(&self) -> &[Slot] {
        &self.data
    }

    /// Returns a handle over the whole region.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::InvalidCapacity`] if `N` is not a power of two.
    pub fn handle(&self) -> Result<QueueHandle<'_>, QueueError> {
        let capacity = u32::try_from(N).map_err(|_| QueueError::InvalidCapacity(u32::MAX))?;
        QueueHandle::attach(&self.header, &self.data, capacity)
    }
}

impl<const N: usize> Default for QueueStorage<N> {
    fn default() -> Self {
        Self::new()
    }
}
