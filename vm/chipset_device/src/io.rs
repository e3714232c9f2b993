// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Memory mapped IO (MMIO) results.

/// An error related to the suitability of the IO request for the device.
///
/// A device should handle device-specific errors internally (reserved
/// registers, writes to read-only registers, and so on), and should return
/// `IoResult::Ok` in those conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoError {
    /// The requested device register is not present.
    InvalidRegister,
    /// The access length is invalid for the specified address.
    InvalidAccessSize,
    /// The caller attempted to perform an unaligned access to the device
    /// registers.
    UnalignedAccess,
}

/// The result returned by a device MMIO operation, as in the methods of
/// [`MmioIntercept`](crate::mmio::MmioIntercept).
#[derive(Debug)]
#[must_use]
pub enum IoResult {
    /// The IO operation succeeded.
    Ok,
    /// The IO operation failed due to an access error.
    ///
    /// The caller should log the failure, then ignore writes, and fill the
    /// buffer with `!0` on reads.
    Err(IoError),
}

impl IoResult {
    /// Panics if `self` is not `IoResult::Ok`.
    #[track_caller]
    pub fn unwrap(self) {
        match self {
            IoResult::Ok => {}
            IoResult::Err(_) => panic!("unexpected IO result {:?}", self),
        }
    }

    /// Converts `self` to a `Result<(), IoError>`.
    pub fn now_or_never(self) -> Result<(), IoError> {
        match self {
            IoResult::Ok => Ok(()),
            IoResult::Err(e) => Err(e),
        }
    }
}

impl From<Result<(), IoError>> for IoResult {
    fn from(value: Result<(), IoError>) -> Self {
        match value {
            Ok(()) => IoResult::Ok,
            Err(e) => IoResult::Err(e),
        }
    }
}
