// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fs::OpenOptions;
use std::os::fd::OwnedFd;
use std::path::{Path, PathBuf};

use tracing::{Level, event};

use crate::Result;

/// Address of the control endpoint of every FunctionFS instance.
pub const CONTROL_ENDPOINT: u8 = 0;

/// Path of the endpoint file with the given address under a FunctionFS mount point.
#[must_use]
pub fn endpoint_path(mount_point: impl AsRef<Path>, address: u8) -> PathBuf {
    mount_point.as_ref().join(format!("ep{address}"))
}

/// Opens an OUT endpoint, which carries data from the host and is therefore read by the gadget.
///
/// # Errors
///
/// [`Error::Io`][crate::Error::Io] if the endpoint cannot be opened, for example because the
/// descriptors have not been written to the control endpoint yet.
pub fn open_out_endpoint(mount_point: impl AsRef<Path>, address: u8) -> Result<OwnedFd> {
    let path = endpoint_path(mount_point, address);
    let file = OpenOptions::new().read(true).open(&path)?;

    event!(Level::DEBUG, message = "opened OUT endpoint", path = %path.display());

    Ok(file.into())
}

/// Opens an IN endpoint, which carries data to the host and is therefore written by the gadget.
///
/// # Errors
///
/// [`Error::Io`][crate::Error::Io] if the endpoint cannot be opened.
pub fn open_in_endpoint(mount_point: impl AsRef<Path>, address: u8) -> Result<OwnedFd> {
    let path = endpoint_path(mount_point, address);
    let file = OpenOptions::new().write(true).open(&path)?;

    event!(Level::DEBUG, message = "opened IN endpoint", path = %path.display());

    Ok(file.into())
}
