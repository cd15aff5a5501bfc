// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::TryReserveError;
use std::fmt::{self, Display};

use thiserror::Error;

/// An operating system error number as reported by a failed kernel call.
///
/// The wrapped value is always positive (e.g. `libc::EAGAIN`). Use [`Errno::negated`] to obtain
/// the negative form that callers forwarding results to C-style interfaces expect.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Errno(pub i32);

impl Errno {
    /// The positive error number.
    #[must_use]
    pub const fn raw(self) -> i32 {
        self.0
    }

    /// The error number in the negative form used by kernel interfaces (e.g. `-EAGAIN`).
    #[must_use]
    pub const fn negated(self) -> i32 {
        -self.0
    }

    /// Captures the error number of the last failed call made on the current thread.
    #[must_use]
    pub fn last_os_error() -> Self {
        Self(
            std::io::Error::last_os_error()
                .raw_os_error()
                .unwrap_or(libc::EIO),
        )
    }

    /// Interprets a raw kernel result that carries `-errno` when negative.
    #[must_use]
    pub fn from_negative(result: i64) -> Option<Self> {
        if result >= 0 {
            return None;
        }

        Some(Self(
            i32::try_from(result.unsigned_abs()).unwrap_or(libc::EOVERFLOW),
        ))
    }
}

impl Display for Errno {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", std::io::Error::from_raw_os_error(self.0))
    }
}

impl std::error::Error for Errno {}

impl From<Errno> for std::io::Error {
    fn from(value: Errno) -> Self {
        Self::from_raw_os_error(value.0)
    }
}

/// Any error that may arise from setting up or driving an asynchronous I/O context.
///
/// Every variant maps to an operating system error number via [`Error::errno`], so callers that
/// need to report failures through errno-based interfaces can forward them verbatim.
///
/// # Thread safety
///
/// This type is thread-safe.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Memory for buffers or bookkeeping could not be reserved. Retrying later or shrinking the
    /// configuration may succeed.
    #[error("insufficient memory to reserve asynchronous I/O resources")]
    ResourceExhausted,

    /// The kernel refused to create the AIO context or the wake-up `eventfd`.
    #[error("kernel AIO setup failed: {0}")]
    KernelSetupFailed(Errno),

    /// A kernel call made while driving the context failed. The context remains usable and the
    /// same call may be retried.
    #[error("kernel I/O call failed: {0}")]
    Io(Errno),

    /// More operations were requested than the context was sized for. This is a configuration
    /// error of the caller, not a transient condition.
    #[error(
        "capacity exceeded: {requested} operations requested but only {available} of {capacity} slots remain"
    )]
    CapacityExceeded {
        /// Number of additional operations that were requested.
        requested: usize,
        /// Number of operation slots that were still free.
        available: usize,
        /// Total number of operation slots of the context.
        capacity: usize,
    },

    /// An argument was out of range, such as an endpoint index beyond the endpoint count or a
    /// header offset that does not fit in the buffer.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The API was used in a way that contradicts the state of the context, such as rearming a
    /// buffer that is already queued.
    #[error("contract violation: {0}")]
    ContractViolation(String),
}

impl Error {
    /// The negative operating system error number that corresponds to this error.
    #[must_use]
    pub const fn errno(&self) -> i32 {
        match self {
            Self::ResourceExhausted => -libc::ENOMEM,
            Self::KernelSetupFailed(errno) | Self::Io(errno) => errno.negated(),
            Self::CapacityExceeded { .. } => -libc::ENOSPC,
            Self::InvalidArgument(_) | Self::ContractViolation(_) => -libc::EINVAL,
        }
    }
}

impl From<TryReserveError> for Error {
    fn from(_: TryReserveError) -> Self {
        Self::ResourceExhausted
    }
}

/// A specialized `Result` for asynchronous I/O context operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents the error as a standard I/O error, for callers that interoperate with libraries
/// that expect standard I/O errors.
impl From<Error> for std::io::Error {
    fn from(value: Error) -> Self {
        match value {
            Error::KernelSetupFailed(errno) | Error::Io(errno) => errno.into(),
            Error::ResourceExhausted => Self::new(std::io::ErrorKind::OutOfMemory, value),
            Error::InvalidArgument(_) => Self::new(std::io::ErrorKind::InvalidInput, value),
            _ => Self::other(value),
        }
    }
}
