// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use thiserror::Error;

/// Errors reported by the device helpers.
///
/// # Thread safety
///
/// This type is thread-safe.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// No entry of the scanned directory is a device node with the requested numbers.
    #[error("no device node with number {major}:{minor}")]
    NotFound {
        /// Requested major number.
        major: u32,
        /// Requested minor number.
        minor: u32,
    },

    /// A FunctionFS instance name was empty, not ASCII or contained a path separator or NUL.
    #[error("invalid FunctionFS instance name {0:?}")]
    InvalidName(String),

    /// A filesystem call failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// The negative operating system error number that corresponds to this error.
    #[must_use]
    pub fn errno(&self) -> i32 {
        match self {
            Self::NotFound { .. } => -libc::ENOENT,
            Self::InvalidName(_) => -libc::EINVAL,
            Self::Io(error) => -error.raw_os_error().unwrap_or(libc::EIO),
        }
    }
}

/// A specialized `Result` for the device helpers.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use static_assertions::assert_impl_all;

    use super::*;

    #[test]
    fn thread_safe_type() {
        assert_impl_all!(Error: Send, Sync);
    }

    #[test]
    fn errno() {
        assert_eq!(Error::NotFound { major: 1, minor: 3 }.errno(), -libc::ENOENT);
        assert_eq!(Error::InvalidName("a/b".to_string()).errno(), -libc::EINVAL);
        assert_eq!(
            Error::Io(std::io::Error::from_raw_os_error(libc::EPERM)).errno(),
            -libc::EPERM
        );
        assert_eq!(Error::Io(std::io::Error::other("custom")).errno(), -libc::EIO);
    }

    #[test]
    fn display() {
        assert_eq!(
            Error::NotFound { major: 29, minor: 0 }.to_string(),
            "no device node with number 29:0"
        );
    }
}
