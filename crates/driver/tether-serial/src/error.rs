//! Driver error type.

use core::fmt;

use tether_queue::QueueError;

/// Errors reported by the serial driver.
///
/// None of these are fatal: the driver keeps running after reporting any of
/// them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SerialError {
    /// A wake event arrived on a channel the driver does not own.
    UnknownChannel(u32),
    /// A queue region was rejected at initialization.
    Queue(QueueError),
}

impl fmt::Display for SerialError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownChannel(ch) => write!(f, "wake on unknown channel {ch}"),
            Self::Queue(err) => write!(f, "queue setup failed: {err}"),
        }
    }
}

impl core::error::Error for SerialError {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            Self::Queue(err) => Some(err),
            Self::UnknownChannel(_) => None,
        }
    }
}

impl From<QueueError> for SerialError {
    fn from(err: QueueError) -> Self {
        Self::Queue(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_all_variants() {
        assert_eq!(
            format!("{}", SerialError::UnknownChannel(7)),
            "wake on unknown channel 7"
        );
        assert_eq!(
            format!("{}", SerialError::Queue(QueueError::InvalidCapacity(3))),
            format!("queue setup failed: {}", QueueError::InvalidCapacity(3))
        );
    }

    #[test]
    fn queue_errors_convert() {
        let err: SerialError = QueueError::InvalidCapacity(0).into();
        assert_eq!(err, SerialError::Queue(QueueError::InvalidCapacity(0)));
        assert_ne!(err, SerialError::UnknownChannel(0));
    }
}
