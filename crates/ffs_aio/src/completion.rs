// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::os::fd::BorrowedFd;

use crate::{Errno, SlotKey};

/// One finished operation, as reported by the most recent [`Context::poll`][crate::Context::poll].
///
/// The completion borrows the context, so the buffer it refers to cannot be rearmed (and handed
/// back to the kernel) while its data is still being inspected.
#[derive(Clone, Copy, Debug)]
pub struct Completion<'a> {
    slot: SlotKey,
    fd: BorrowedFd<'a>,
    result: i64,
    offset: usize,
    data: &'a [u8],
}

impl<'a> Completion<'a> {
    pub(crate) const fn new(
        slot: SlotKey,
        fd: BorrowedFd<'a>,
        result: i64,
        offset: usize,
        data: &'a [u8],
    ) -> Self {
        Self {
            slot,
            fd,
            result,
            offset,
            data,
        }
    }

    /// The buffer that finished. Pass it to [`Context::rearm_slot`][crate::Context::rearm_slot]
    /// to queue the buffer again without going through the completion index.
    #[must_use]
    pub const fn slot(&self) -> SlotKey {
        self.slot
    }

    /// Index of the endpoint the operation belonged to.
    #[must_use]
    pub const fn endpoint(&self) -> usize {
        self.slot.endpoint()
    }

    /// Index of the buffer within its endpoint.
    #[must_use]
    pub const fn buffer(&self) -> usize {
        self.slot.buffer()
    }

    /// The endpoint file descriptor the operation was issued against.
    #[must_use]
    pub const fn fd(&self) -> BorrowedFd<'a> {
        self.fd
    }

    /// Raw kernel result: the number of bytes transferred, or a negative error number.
    #[must_use]
    pub const fn result(&self) -> i64 {
        self.result
    }

    /// Length of the header reserved at the start of the buffer. Transferred bytes begin here.
    #[must_use]
    pub const fn offset(&self) -> usize {
        self.offset
    }

    /// The entire data region of the buffer, header included.
    #[must_use]
    pub const fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Whether the operation failed.
    #[must_use]
    pub const fn is_error(&self) -> bool {
        self.result < 0
    }

    /// The error the operation failed with, if it failed.
    #[must_use]
    pub fn errno(&self) -> Option<Errno> {
        Errno::from_negative(self.result)
    }

    /// The bytes the operation transferred, which follow the header.
    ///
    /// # Errors
    ///
    /// Returns the error number reported by the kernel if the operation failed.
    pub fn payload(&self) -> Result<&'a [u8], Errno> {
        let end = self.transfer_end()?;

        Ok(self.data.get(self.offset..end).unwrap_or_default())
    }

    /// The header followed by the transferred bytes, for callers that stage left-over bytes of a
    /// previous transfer in the header through [`Context::buffer_mut`][crate::Context::buffer_mut].
    ///
    /// # Errors
    ///
    /// Returns the error number reported by the kernel if the operation failed.
    pub fn frame(&self) -> Result<&'a [u8], Errno> {
        let end = self.transfer_end()?;

        Ok(self.data.get(..end).unwrap_or_default())
    }

    fn transfer_end(&self) -> Result<usize, Errno> {
        if let Some(errno) = self.errno() {
            return Err(errno);
        }

        // A record claiming more bytes than the buffer holds is clamped to the buffer.
        let transferred = usize::try_from(self.result).unwrap_or(usize::MAX);

        Ok(self
            .offset
            .saturating_add(transferred)
            .min(self.data.len()))
    }
}
