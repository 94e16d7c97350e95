use core::fmt;

use serde::Serialize;
use thiserror::Error as ThisError;

/// Error categories reported by driver operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ThisError)]
pub enum ErrorKind {
    /// `begin()` has not completed successfully.
    #[error("driver not initialized")]
    NotInitialized,
    /// Configuration rejected before any bus access.
    #[error("invalid configuration")]
    InvalidConfig,
    /// Parameter outside its documented range.
    #[error("invalid parameter")]
    InvalidParam,
    /// Date/time value failed calendar validation.
    #[error("invalid date/time")]
    InvalidDateTime,
    /// Bus transaction failed.
    #[error("bus communication failure")]
    Bus,
    /// Bus transaction or EEPROM poll exceeded its deadline.
    #[error("operation timed out")]
    Timeout,
    /// Device did not respond during presence verification.
    #[error("device not found")]
    DeviceNotFound,
    /// The EEPROM commit reported a write failure.
    #[error("EEPROM write failed")]
    NvmWriteFailed,
    /// The pending-write queue is full; the write was not accepted.
    #[error("EEPROM write queue full")]
    QueueFull,
}

/// Error value returned by every fallible operation.
///
/// Plain value type: copied freely, never heap-allocated. `detail` carries
/// the underlying transport code when one exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Error {
    pub kind: ErrorKind,
    pub detail: Option<i32>,
    pub message: &'static str,
}

impl Error {
    pub const fn new(kind: ErrorKind, message: &'static str) -> Self {
        Self {
            kind,
            detail: None,
            message,
        }
    }

    pub const fn with_detail(kind: ErrorKind, message: &'static str, detail: i32) -> Self {
        Self {
            kind,
            detail: Some(detail),
            message,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.detail {
            Some(detail) => write!(f, "{}: {} (detail {})", self.kind, self.message, detail),
            None => write!(f, "{}: {}", self.kind, self.message),
        }
    }
}

impl std::error::Error for Error {}

/// Outcome of a configuration-mutating operation.
///
/// `Pending` means the volatile mirror register is updated and the EEPROM
/// commit was accepted by the persistence engine; call `tick()` until
/// `nvm_status()` settles. Both variants count as success for health
/// tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WriteOutcome {
    /// The change is complete (volatile-only configuration, or no change
    /// was needed).
    Applied,
    /// An EEPROM commit is in flight or queued behind one.
    Pending,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_includes_detail() {
        let err = Error::with_detail(ErrorKind::Bus, "transfer aborted", -7);
        let rendered = format!("{err}");
        assert!(rendered.contains("bus communication failure"));
        assert!(rendered.contains("transfer aborted"));
        assert!(rendered.contains("-7"));
    }

    #[test]
    fn test_error_is_copy() {
        let err = Error::new(ErrorKind::Timeout, "deadline elapsed");
        let copy = err;
        assert_eq!(err, copy);
        assert_eq!(copy.detail, None);
    }
}
