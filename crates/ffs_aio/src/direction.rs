// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use derive_more::Display;

use crate::pal::{IOCB_CMD_PREAD, IOCB_CMD_PWRITE};

/// Direction of a transfer, seen from the device side of the USB link.
///
/// OUT endpoints carry host-to-device data and are therefore read by the gadget, while IN
/// endpoints carry device-to-host data and are written by the gadget.
#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
pub enum Direction {
    /// Receive data from the endpoint (OUT endpoint).
    #[display("read")]
    Read,

    /// Send data to the endpoint (IN endpoint).
    #[display("write")]
    Write,
}

impl Direction {
    pub(crate) const fn opcode(self) -> u16 {
        match self {
            Self::Read => IOCB_CMD_PREAD,
            Self::Write => IOCB_CMD_PWRITE,
        }
    }
}
