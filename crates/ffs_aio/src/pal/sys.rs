// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Mirrors of the kernel AIO ABI (`linux/aio_abi.h`). The `libc` crate does not provide these.

use static_assertions::const_assert_eq;

/// The kernel's `aio_context_t`, an opaque handle to an in-kernel completion ring.
pub type AioContextId = u64;

pub const IOCB_CMD_PREAD: u16 = 0;
pub const IOCB_CMD_PWRITE: u16 = 1;

/// Tells the kernel to signal `aio_resfd` (an eventfd) when the operation completes.
pub const IOCB_FLAG_RESFD: u32 = 1 << 0;

/// The kernel's `struct iocb`: one operation descriptor handed to `io_submit`.
///
/// The kernel writes `aio_key` during submission, so the memory must stay writable while the
/// descriptor is being submitted.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Iocb {
    pub aio_data: u64,

    #[cfg(target_endian = "little")]
    pub aio_key: u32,
    pub aio_rw_flags: i32,
    #[cfg(target_endian = "big")]
    pub aio_key: u32,

    pub aio_lio_opcode: u16,
    pub aio_reqprio: i16,
    pub aio_fildes: u32,

    pub aio_buf: u64,
    pub aio_nbytes: u64,
    pub aio_offset: i64,

    pub aio_reserved2: u64,

    pub aio_flags: u32,
    pub aio_resfd: u32,
}

/// The kernel's `struct io_event`: one completion record returned by `io_getevents`.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct IoEvent {
    /// Echo of `Iocb::aio_data` of the completed operation.
    pub data: u64,
    /// User address of the `Iocb` that completed.
    pub obj: u64,
    /// Bytes transferred, or `-errno`.
    pub res: i64,
    pub res2: i64,
}

const_assert_eq!(size_of::<Iocb>(), 64);
const_assert_eq!(size_of::<IoEvent>(), 32);

#[cfg(test)]
mod tests {
    use std::mem::offset_of;

    use super::*;

    #[test]
    fn iocb_field_offsets_match_kernel_abi() {
        assert_eq!(offset_of!(Iocb, aio_data), 0);
        assert_eq!(offset_of!(Iocb, aio_lio_opcode), 16);
        assert_eq!(offset_of!(Iocb, aio_fildes), 20);
        assert_eq!(offset_of!(Iocb, aio_buf), 24);
        assert_eq!(offset_of!(Iocb, aio_nbytes), 32);
        assert_eq!(offset_of!(Iocb, aio_offset), 40);
        assert_eq!(offset_of!(Iocb, aio_flags), 56);
        assert_eq!(offset_of!(Iocb, aio_resfd), 60);
    }

    #[test]
    fn io_event_field_offsets_match_kernel_abi() {
        assert_eq!(offset_of!(IoEvent, data), 0);
        assert_eq!(offset_of!(IoEvent, obj), 8);
        assert_eq!(offset_of!(IoEvent, res), 16);
        assert_eq!(offset_of!(IoEvent, res2), 24);
    }
}
