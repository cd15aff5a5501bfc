// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::os::fd::BorrowedFd;

use crate::{Direction, Error, Result};

/// Number of transfer buffers an endpoint gets unless configured otherwise.
pub const DEFAULT_BUFFER_COUNT: usize = 4;

/// Size of each transfer buffer unless configured otherwise, header included.
pub const DEFAULT_BUFFER_SIZE: usize = 16 * 1024;

/// Describes one endpoint and the buffer pool that keeps it fed.
///
/// Each of the `buffer_count` buffers holds `buffer_size` bytes. The first `header_len` bytes of
/// every buffer are reserved for the caller (for example to prepend left-over bytes of a previous
/// transfer) and are never transferred, so each transfer moves `buffer_size - header_len` bytes.
///
/// The file descriptor is borrowed: the context never closes it and cannot outlive it.
#[derive(Clone, Copy, Debug)]
pub struct EndpointConfig<'fd> {
    fd: BorrowedFd<'fd>,
    direction: Direction,
    buffer_count: usize,
    buffer_size: usize,
    header_len: usize,
}

impl<'fd> EndpointConfig<'fd> {
    /// Creates a configuration with [`DEFAULT_BUFFER_COUNT`] buffers of [`DEFAULT_BUFFER_SIZE`]
    /// bytes and no header.
    #[must_use]
    pub const fn new(fd: BorrowedFd<'fd>, direction: Direction) -> Self {
        Self {
            fd,
            direction,
            buffer_count: DEFAULT_BUFFER_COUNT,
            buffer_size: DEFAULT_BUFFER_SIZE,
            header_len: 0,
        }
    }

    /// Sets how many transfers are kept in flight for this endpoint.
    #[must_use]
    pub const fn with_buffer_count(mut self, buffer_count: usize) -> Self {
        self.buffer_count = buffer_count;
        self
    }

    /// Sets the size of each buffer, header included.
    #[must_use]
    pub const fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    /// Reserves `header_len` bytes at the start of each buffer that are excluded from transfers.
    #[must_use]
    pub const fn with_header_len(mut self, header_len: usize) -> Self {
        self.header_len = header_len;
        self
    }

    /// The endpoint file descriptor.
    #[must_use]
    pub const fn fd(&self) -> BorrowedFd<'fd> {
        self.fd
    }

    /// The direction of the initial transfers.
    #[must_use]
    pub const fn direction(&self) -> Direction {
        self.direction
    }

    /// Number of buffers.
    #[must_use]
    pub const fn buffer_count(&self) -> usize {
        self.buffer_count
    }

    /// Size of each buffer, header included.
    #[must_use]
    pub const fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Reserved prefix of each buffer.
    #[must_use]
    pub const fn header_len(&self) -> usize {
        self.header_len
    }

    /// Checks that the buffer geometry is usable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if there are no buffers, the buffers are empty or the
    /// header leaves no room for transfer data.
    pub fn validate(&self) -> Result<()> {
        validate_geometry(self.buffer_count, self.buffer_size, self.header_len)
    }
}

pub(crate) fn validate_geometry(
    buffer_count: usize,
    buffer_size: usize,
    header_len: usize,
) -> Result<()> {
    if buffer_count == 0 {
        return Err(Error::InvalidArgument(
            "an endpoint needs at least one buffer".to_string(),
        ));
    }

    if buffer_size == 0 {
        return Err(Error::InvalidArgument(
            "buffer size must be greater than zero".to_string(),
        ));
    }

    if header_len >= buffer_size {
        return Err(Error::InvalidArgument(format!(
            "header of {header_len} bytes leaves no room in a {buffer_size} byte buffer"
        )));
    }

    // Each transfer length is reported by the kernel as a signed 32-bit value.
    if buffer_size - header_len > i32::MAX as usize {
        return Err(Error::InvalidArgument(format!(
            "transfers of {} bytes are too large",
            buffer_size - header_len
        )));
    }

    Ok(())
}
