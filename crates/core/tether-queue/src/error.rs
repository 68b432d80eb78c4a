//! Queue construction errors.

use core::fmt;

/// Errors returned when binding a [`QueueHandle`](crate::QueueHandle) to a
/// memory region.
///
/// Runtime conditions (full on enqueue, empty on dequeue) are not errors and
/// are reported through the return values of the queue operations instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueError {
    /// The capacity is zero or not a power of two.
    InvalidCapacity(u32),
    /// The data region is smaller than the requested capacity.
    RegionTooSmall {
        /// Bytes required by the capacity.
        needed: usize,
        /// Bytes actually provided.
        actual: usize,
    },
}

impl fmt::Display for QueueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCapacity(cap) => {
                write!(f, "queue capacity {cap} is not a non-zero power of two")
            }
            Self::RegionTooSmall { needed, actual } => {
                write!(f, "queue data region too small: need {needed} bytes, got {actual}")
            }
        }
    }
}

impl core::error::Error for QueueError {}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::*;

    #[test]
    fn display_all_variants() {
        assert_eq!(
            format!("{}", QueueError::InvalidCapacity(6)),
            "queue capacity 6 is not a non-zero power of two"
        );
        assert_eq!(
            format!(
                "{}",
                QueueError::RegionTooSmall {
                    needed: 8,
                    actual: 4
                }
            ),
            "queue data region too small: need 8 bytes, got 4"
        );
    }
}
