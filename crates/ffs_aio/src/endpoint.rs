// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::os::fd::BorrowedFd;

use crate::buffer::Buffer;
use crate::{Direction, Error, Result, SlotKey};

/// A data endpoint and the buffers that keep it fed.
#[derive(Debug)]
pub(crate) struct Endpoint<'fd> {
    fd: BorrowedFd<'fd>,
    direction: Direction,
    buffers: Vec<Buffer>,
}

impl<'fd> Endpoint<'fd> {
    pub(crate) const fn new(fd: BorrowedFd<'fd>, direction: Direction, buffers: Vec<Buffer>) -> Self {
        Self {
            fd,
            direction,
            buffers,
        }
    }

    pub(crate) const fn fd(&self) -> BorrowedFd<'fd> {
        self.fd
    }

    pub(crate) const fn direction(&self) -> Direction {
        self.direction
    }

    pub(crate) fn buffers(&self) -> &[Buffer] {
        &self.buffers
    }
}

/// Resolves a slot key to its buffer and the file descriptor of the owning endpoint.
pub(crate) fn resolve<'a, 'fd>(
    endpoints: &'a [Option<Endpoint<'fd>>],
    key: SlotKey,
) -> Result<(BorrowedFd<'fd>, &'a Buffer)> {
    endpoints
        .get(key.endpoint())
        .and_then(Option::as_ref)
        .and_then(|endpoint| Some((endpoint.fd(), endpoint.buffers.get(key.buffer())?)))
        .ok_or_else(|| unknown_slot(key))
}

/// Resolves a slot key to its buffer, for mutation.
pub(crate) fn resolve_mut<'a, 'fd>(
    endpoints: &'a mut [Option<Endpoint<'fd>>],
    key: SlotKey,
) -> Result<(BorrowedFd<'fd>, &'a mut Buffer)> {
    endpoints
        .get_mut(key.endpoint())
        .and_then(Option::as_mut)
        .and_then(|endpoint| Some((endpoint.fd(), endpoint.buffers.get_mut(key.buffer())?)))
        .ok_or_else(|| unknown_slot(key))
}

fn unknown_slot(key: SlotKey) -> Error {
    Error::ContractViolation(format!("{key} does not identify an initialized buffer"))
}

#[cfg(test)]
mod tests {
    use std::os::fd::AsRawFd;

    use super::*;
    use crate::BufferState;

    fn endpoint(buffer_count: usize) -> Endpoint<'static> {
        // SAFETY: The descriptor is only stored, never used for I/O.
        let fd = unsafe { BorrowedFd::borrow_raw(7) };

        let buffers = (0..buffer_count)
            .map(|_| Buffer::new(vec![0; 32].into_boxed_slice(), 4))
            .collect();

        Endpoint::new(fd, Direction::Read, buffers)
    }

    #[test]
    fn resolves_initialized_slots_only() {
        let mut endpoints = vec![Some(endpoint(2)), None];

        let (fd, buffer) = resolve(&endpoints, SlotKey::new(0, 1)).unwrap();
        assert_eq!(fd.as_raw_fd(), 7);
        assert_eq!(buffer.state(), BufferState::Idle);

        let (_, buffer) = resolve_mut(&mut endpoints, SlotKey::new(0, 0)).unwrap();
        assert_eq!(buffer.state(), BufferState::Idle);

        for key in [SlotKey::new(0, 2), SlotKey::new(1, 0), SlotKey::new(2, 0)] {
            assert!(matches!(
                resolve(&endpoints, key),
                Err(Error::ContractViolation(_))
            ));
            assert!(matches!(
                resolve_mut(&mut endpoints, key),
                Err(Error::ContractViolation(_))
            ));
        }
    }

    #[test]
    fn accessors() {
        let endpoint = endpoint(3);

        assert_eq!(endpoint.fd().as_raw_fd(), 7);
        assert_eq!(endpoint.direction(), Direction::Read);
        assert_eq!(endpoint.buffers().len(), 3);
    }
}
