// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt::Debug;
use std::os::fd::RawFd;

use crate::Errno;
use crate::pal::{AioContextId, IoEvent, Iocb};

/// Result of a raw kernel call: the value on success or the error number on failure.
pub type SysResult<T> = Result<T, Errno>;

/// Bindings for the kernel calls used by the asynchronous I/O context.
///
/// All PAL system calls must go through this trait, enabling them to be mocked or simulated.
#[cfg_attr(test, mockall::automock)]
pub trait Bindings: Debug + Send + Sync + 'static {
    /// Creates an AIO context able to hold `max_events` operations.
    fn io_setup(&self, max_events: u32) -> SysResult<AioContextId>;

    /// Destroys an AIO context. The kernel cancels or waits for every operation still in flight
    /// before this returns.
    fn io_destroy(&self, context: AioContextId) -> SysResult<()>;

    /// Submits operations in order and returns how many of them were accepted. Accepted
    /// operations always form a prefix of `iocbs`.
    ///
    /// # Safety
    ///
    /// Every pointer must reference a valid, writable `Iocb`. The data regions referenced by the
    /// accepted descriptors must stay valid and must not be accessed until the kernel reports the
    /// corresponding completion (or the AIO context is destroyed).
    unsafe fn io_submit(&self, context: AioContextId, iocbs: &[*mut Iocb]) -> SysResult<usize>;

    /// Waits until at least `min_nr` operations have completed and copies up to `events.len()`
    /// completion records into `events`, returning the number copied.
    fn io_getevents(
        &self,
        context: AioContextId,
        min_nr: usize,
        events: &mut [IoEvent],
    ) -> SysResult<usize>;

    /// Creates a counting `eventfd` with an initial value of zero.
    fn eventfd(&self) -> SysResult<RawFd>;

    /// Blocks until the `eventfd` counter is non-zero, then returns the counter and resets it.
    fn eventfd_read(&self, fd: RawFd) -> SysResult<u64>;

    fn close(&self, fd: RawFd) -> SysResult<()>;
}
