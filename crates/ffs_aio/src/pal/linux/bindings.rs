// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::os::fd::RawFd;
use std::ptr;

use libc::{c_long, c_void};

use crate::Errno;
use crate::pal::{AioContextId, Bindings, IoEvent, Iocb, SysResult};

/// System call bindings that target the real kernel that the build is targeting.
///
/// You would only use different bindings in unit tests that need to use mock or simulated
/// bindings.
#[derive(Debug, Default)]
pub struct BuildTargetBindings;

/// Converts a raw system call return value into a result, capturing `errno` on failure.
fn check(ret: c_long) -> SysResult<c_long> {
    if ret < 0 {
        Err(Errno::last_os_error())
    } else {
        Ok(ret)
    }
}

fn to_c_long(value: usize) -> SysResult<c_long> {
    c_long::try_from(value).or(Err(Errno(libc::EINVAL)))
}

impl Bindings for BuildTargetBindings {
    #[cfg_attr(test, mutants::skip)] // Real PAL behavior is not meaningful to mutate, we try mutations manually via mock PAL.
    fn io_setup(&self, max_events: u32) -> SysResult<AioContextId> {
        // The kernel requires the handle to be zero-initialized.
        let mut context: AioContextId = 0;

        // SAFETY: The out pointer references a live local for the duration of the call.
        check(unsafe {
            libc::syscall(
                libc::SYS_io_setup,
                c_long::from(max_events),
                &raw mut context,
            )
        })?;

        Ok(context)
    }

    #[cfg_attr(test, mutants::skip)] // Real PAL behavior is not meaningful to mutate, we try mutations manually via mock PAL.
    fn io_destroy(&self, context: AioContextId) -> SysResult<()> {
        // SAFETY: No memory is passed to the kernel. Destroying an unknown handle fails with
        // EINVAL, which is not a safety concern.
        check(unsafe { libc::syscall(libc::SYS_io_destroy, context) })?;

        Ok(())
    }

    #[cfg_attr(test, mutants::skip)] // Real PAL behavior is not meaningful to mutate, we try mutations manually via mock PAL.
    unsafe fn io_submit(&self, context: AioContextId, iocbs: &[*mut Iocb]) -> SysResult<usize> {
        let count = to_c_long(iocbs.len())?;

        // SAFETY: The pointer array outlives the call; validity of the descriptors and of the
        // memory they reference is guaranteed by the caller.
        let accepted = check(unsafe {
            libc::syscall(libc::SYS_io_submit, context, count, iocbs.as_ptr())
        })?;

        Ok(usize::try_from(accepted).unwrap_or_default())
    }

    #[cfg_attr(test, mutants::skip)] // Real PAL behavior is not meaningful to mutate, we try mutations manually via mock PAL.
    fn io_getevents(
        &self,
        context: AioContextId,
        min_nr: usize,
        events: &mut [IoEvent],
    ) -> SysResult<usize> {
        let min_nr = to_c_long(min_nr)?;
        let nr = to_c_long(events.len())?;

        // SAFETY: The kernel writes at most `nr` records into `events`, which has room for
        // exactly that many. A null timeout means "wait until min_nr records are available".
        let received = check(unsafe {
            libc::syscall(
                libc::SYS_io_getevents,
                context,
                min_nr,
                nr,
                events.as_mut_ptr(),
                ptr::null_mut::<libc::timespec>(),
            )
        })?;

        Ok(usize::try_from(received).unwrap_or_default())
    }

    #[cfg_attr(test, mutants::skip)] // Real PAL behavior is not meaningful to mutate, we try mutations manually via mock PAL.
    fn eventfd(&self) -> SysResult<RawFd> {
        // SAFETY: No safety requirements.
        let fd = unsafe { libc::eventfd(0, libc::EFD_CLOEXEC) };

        if fd < 0 {
            return Err(Errno::last_os_error());
        }

        Ok(fd)
    }

    #[cfg_attr(test, mutants::skip)] // Real PAL behavior is not meaningful to mutate, we try mutations manually via mock PAL.
    fn eventfd_read(&self, fd: RawFd) -> SysResult<u64> {
        let mut counter: u64 = 0;

        // SAFETY: The destination is a live local exactly as large as the requested length.
        let read = unsafe {
            libc::read(
                fd,
                (&raw mut counter).cast::<c_void>(),
                size_of::<u64>(),
            )
        };

        match read {
            8 => Ok(counter),
            n if n < 0 => Err(Errno::last_os_error()),
            // An eventfd read either transfers all 8 bytes or fails.
            _ => Err(Errno(libc::EIO)),
        }
    }

    #[cfg_attr(test, mutants::skip)] // Real PAL behavior is not meaningful to mutate, we try mutations manually via mock PAL.
    fn close(&self, fd: RawFd) -> SysResult<()> {
        // SAFETY: No memory safety requirements. Closing a descriptor twice is logically
        // invalid but does not violate Rust language rules.
        if unsafe { libc::close(fd) } < 0 {
            return Err(Errno::last_os_error());
        }

        Ok(())
    }
}
