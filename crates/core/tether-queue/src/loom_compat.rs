//! Loom compatibility shim.
//!
//! When compiled with `cfg(loom)`, re-exports loom's atomic types and fence.
//! Otherwise, re-exports `core::sync::atomic`.
//!
//! The queue is shared with a peer in another protection domain, so every
//! access to shared state goes through these types and the memory ordering
//! can be checked under loom's scheduler without code changes.

// ---------------------------------------------------------------------------
// Loom mode
// ---------------------------------------------------------------------------

#[cfg(loom)]
pub(crate) use loom::sync::atomic::{AtomicU8, AtomicU32, Ordering, fence};

// ---------------------------------------------------------------------------
// Normal mode
// ---------------------------------------------------------------------------

#[cfg(not(loom))]
pub(crate) use core::sync::atomic::{AtomicU8, AtomicU32, Ordering, fence};
