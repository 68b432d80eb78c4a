//! Volatile register window.
//!
//! [`MmioRegion`] consolidates the `unsafe` part of device register access in
//! its constructor: once a region has been created over a valid mapping, the
//! individual reads and writes are safe.

/// A mapped device register window.
#[derive(Debug, Clone, Copy)]
pub struct MmioRegion {
    base: *mut u8,
}

// SAFETY: The region is plain device memory; the owning driver serializes
// all accesses.
unsafe impl Send for MmioRegion {}

impl MmioRegion {
    /// Creates a register window at `base`.
    ///
    /// # Safety
    ///
    /// `base` must point to a mapping of the device's register block that
    /// stays valid for the lifetime of the region, large enough for every
    /// offset later passed to the accessors, and with each accessed offset
    /// aligned for its access width.
    #[must_use]
    pub const unsafe fn new(base: *mut u8) -> Self {
        Self { base }
    }

    /// Reads an 8-bit register.
    #[inline]
    #[must_use]
    pub fn read_u8(&self, offset: usize) -> u8 {
        // SAFETY: The constructor's contract covers every register offset.
        unsafe { self.base.add(offset).read_volatile() }
    }

    /// Writes an 8-bit register.
    #[inline]
    pub fn write_u8(&self, offset: usize, value: u8) {
        // SAFETY: The constructor's contract covers every register offset.
        unsafe { self.base.add(offset).write_volatile(value) }
    }

    /// Reads a 32-bit register.
    #[inline]
    #[must_use]
    pub fn read_u32(&self, offset: usize) -> u32 {
        // SAFETY: The constructor's contract covers every register offset and
        // its alignment.
        unsafe { self.base.add(offset).cast::<u32>().read_volatile() }
    }

    /// Writes a 32-bit register.
    #[inline]
    pub fn write_u32(&self, offset: usize, value: u32) {
        // SAFETY: The constructor's contract covers every register offset and
        // its alignment.
        unsafe { self.base.add(offset).cast::<u32>().write_volatile(value) }
    }
}
