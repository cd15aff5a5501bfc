// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::mem;
use std::os::fd::{BorrowedFd, RawFd};

use tracing::{Level, event};

use crate::pal::{AioContextId, Bindings, BindingsFacade, IoEvent, Iocb, SysResult};
use crate::{Error, Result};

/// Owns an in-kernel AIO context and destroys it on drop, unless it was destroyed explicitly.
///
/// Destroying the context makes the kernel cancel or wait for every operation still in flight,
/// after which no buffer memory is referenced by the kernel any more.
#[derive(Debug)]
pub(crate) struct AioHandle {
    id: AioContextId,
    destroyed: bool,
    bindings: BindingsFacade,
}

impl AioHandle {
    pub(crate) fn new(bindings: BindingsFacade, max_events: u32) -> Result<Self> {
        let id = bindings
            .io_setup(max_events)
            .map_err(Error::KernelSetupFailed)?;

        event!(Level::TRACE, message = "created AIO context", id, max_events);

        Ok(Self {
            id,
            destroyed: false,
            bindings,
        })
    }

    /// Destroys the kernel context. Only the first call reaches the kernel, and a failure is
    /// not retried: the kernel keeps whatever it still references.
    pub(crate) fn destroy(&mut self) -> SysResult<()> {
        if mem::replace(&mut self.destroyed, true) {
            return Ok(());
        }

        let result = self.bindings.io_destroy(self.id);

        match result {
            Ok(()) => event!(Level::TRACE, message = "destroyed AIO context", id = self.id),
            Err(errno) => {
                event!(Level::WARN, message = "failed to destroy AIO context", id = self.id, %errno);
            }
        }

        result
    }

    /// # Safety
    ///
    /// See [`Bindings::io_submit`].
    pub(crate) unsafe fn submit(&self, iocbs: &[*mut Iocb]) -> SysResult<usize> {
        // SAFETY: Forwarding safety requirements to the caller.
        unsafe { self.bindings.io_submit(self.id, iocbs) }
    }

    pub(crate) fn get_events(&self, min_nr: usize, events: &mut [IoEvent]) -> SysResult<usize> {
        self.bindings.io_getevents(self.id, min_nr, events)
    }
}

impl Drop for AioHandle {
    fn drop(&mut self) {
        // Failures are already logged.
        _ = self.destroy();
    }
}

/// Owns the `eventfd` that the kernel signals whenever an operation completes, and closes it
/// on drop.
#[derive(Debug)]
pub(crate) struct WakeFd {
    fd: RawFd,
    bindings: BindingsFacade,
}

impl WakeFd {
    pub(crate) fn new(bindings: BindingsFacade) -> Result<Self> {
        let fd = bindings.eventfd().map_err(Error::KernelSetupFailed)?;

        event!(Level::TRACE, message = "created wake-up eventfd", fd);

        Ok(Self { fd, bindings })
    }

    pub(crate) const fn raw(&self) -> RawFd {
        self.fd
    }

    pub(crate) fn as_fd(&self) -> BorrowedFd<'_> {
        // SAFETY: The descriptor stays open until `self` is dropped, which the returned
        // borrow cannot outlive.
        unsafe { BorrowedFd::borrow_raw(self.fd) }
    }

    /// Blocks until at least one completion has been signaled and returns the signal count.
    pub(crate) fn wait(&self) -> SysResult<u64> {
        self.bindings.eventfd_read(self.fd)
    }
}

impl Drop for WakeFd {
    fn drop(&mut self) {
        if let Err(errno) = self.bindings.close(self.fd) {
            event!(Level::WARN, message = "failed to close wake-up eventfd", fd = self.fd, %errno);
        }
    }
}
