// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::cell::UnsafeCell;
use std::os::fd::RawFd;

use crate::pal::{IOCB_FLAG_RESFD, Iocb};
use crate::{Direction, Error, Result, SlotKey};

/// Lifecycle state of a transfer buffer.
///
/// Buffers cycle `Armed → InFlight → Completed → Armed` for as long as the context lives.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum BufferState {
    /// Allocated but never prepared for a transfer.
    Idle,

    /// Prepared and waiting in the pending-submission queue.
    Armed,

    /// Handed to the kernel. The data region belongs to the kernel until the operation completes.
    InFlight,

    /// Reported by the most recent poll that included it. The data region may be inspected and
    /// the buffer may be rearmed.
    Completed,
}

/// One transfer buffer: a data region with a reserved header prefix plus the descriptor of the
/// operation that transfers into or out of the region behind the header.
#[derive(Debug)]
pub(crate) struct Buffer {
    // The kernel writes `aio_key` into the descriptor during submission, through a pointer we
    // obtain from a shared reference.
    descriptor: UnsafeCell<Iocb>,
    data: Box<[u8]>,
    header_len: usize,
    state: BufferState,
}

impl Buffer {
    /// # Panics
    ///
    /// Panics if `header_len` is not smaller than the data region. Geometry is validated before
    /// any buffer is created.
    pub(crate) fn new(data: Box<[u8]>, header_len: usize) -> Self {
        assert!(
            header_len < data.len(),
            "header must leave room for transfer data"
        );

        Self {
            descriptor: UnsafeCell::new(Iocb::default()),
            data,
            header_len,
            state: BufferState::Idle,
        }
    }

    pub(crate) const fn state(&self) -> BufferState {
        self.state
    }

    pub(crate) const fn header_len(&self) -> usize {
        self.header_len
    }

    /// Number of bytes each transfer moves: the data region minus the reserved header.
    pub(crate) fn transfer_len(&self) -> usize {
        self.data.len() - self.header_len
    }

    /// The entire data region, header included.
    pub(crate) fn data(&self) -> &[u8] {
        &self.data
    }

    /// The entire data region, header included. The next `arm` points the descriptor at the
    /// region again, so it must only be called while no transfer is queued or in flight.
    pub(crate) fn data_mut(&mut self) -> &mut [u8] {
        debug_assert!(matches!(self.state, BufferState::Idle | BufferState::Completed));
        &mut self.data
    }

    /// Prepares a transfer of the full usable length in `direction` and marks the buffer as
    /// queued. Only idle or completed buffers may be armed, which is what guarantees that a
    /// buffer is never queued twice.
    pub(crate) fn arm(
        &mut self,
        key: SlotKey,
        direction: Direction,
        fd: RawFd,
        wake_fd: RawFd,
    ) -> Result<()> {
        if !matches!(self.state, BufferState::Idle | BufferState::Completed) {
            return Err(Error::ContractViolation(format!(
                "buffer {key} cannot be rearmed while {:?}",
                self.state
            )));
        }

        let transfer_len = self.transfer_len();
        let target = self.data[self.header_len..].as_mut_ptr();

        *self.descriptor.get_mut() = Iocb {
            aio_data: key.to_user_data(),
            aio_lio_opcode: direction.opcode(),
            aio_fildes: fd.cast_unsigned(),
            aio_buf: target.expose_provenance() as u64,
            aio_nbytes: transfer_len as u64,
            aio_offset: 0,
            aio_flags: IOCB_FLAG_RESFD,
            aio_resfd: wake_fd.cast_unsigned(),
            ..Iocb::default()
        };

        self.state = BufferState::Armed;

        Ok(())
    }

    /// Pointer handed to the kernel in `io_submit`.
    pub(crate) fn descriptor_ptr(&self) -> *mut Iocb {
        self.descriptor.get()
    }

    pub(crate) fn mark_in_flight(&mut self) {
        debug_assert_eq!(self.state, BufferState::Armed);
        self.state = BufferState::InFlight;
    }

    pub(crate) fn mark_completed(&mut self, key: SlotKey) -> Result<()> {
        if self.state != BufferState::InFlight {
            return Err(Error::ContractViolation(format!(
                "completion reported for buffer {key} which was {:?}, not in flight",
                self.state
            )));
        }

        self.state = BufferState::Completed;

        Ok(())
    }
}
