// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::ffi::CString;
use std::fs::DirBuilder;
use std::io;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::DirBuilderExt;
use std::path::{Path, PathBuf};
use std::ptr;

use tracing::{Level, event};

use crate::device_path::DEV_DIR;
use crate::{Error, Result};

/// Permissions of a newly created mount point: owner full access, group read and search.
pub const MOUNT_POINT_MODE: u32 = 0o750;

const FUNCTIONFS: &str = "functionfs";

/// Mounts the FunctionFS instance `name` at `/dev/<name>` and returns the mount point.
///
/// The instance must have been created beforehand, usually by adding a `ffs.<name>` function to
/// a gadget through configfs. Mounting an instance that is already mounted succeeds.
///
/// # Errors
///
/// * [`Error::InvalidName`] if `name` is empty, not ASCII or contains `/` or NUL.
/// * [`Error::Io`] if the mount point cannot be created or the mount fails.
pub fn mount_function(name: &str) -> Result<PathBuf> {
    mount_function_at(DEV_DIR, name)
}

/// Mounts the FunctionFS instance `name` at `<root>/<name>` and returns the mount point.
///
/// # Errors
///
/// See [`mount_function`].
pub fn mount_function_at(root: impl AsRef<Path>, name: &str) -> Result<PathBuf> {
    validate_name(name)?;

    let target = root.as_ref().join(name);

    match DirBuilder::new().mode(MOUNT_POINT_MODE).create(&target) {
        Ok(()) => {}
        Err(error) if error.kind() == io::ErrorKind::AlreadyExists => {}
        Err(error) => return Err(error.into()),
    }

    let source = CString::new(name).map_err(io::Error::from)?;
    let target_c = CString::new(target.as_os_str().as_bytes()).map_err(io::Error::from)?;
    let fstype = CString::new(FUNCTIONFS).map_err(io::Error::from)?;

    // SAFETY: All strings are NUL-terminated and outlive the call. No mount data is passed.
    let ret = unsafe {
        libc::mount(
            source.as_ptr(),
            target_c.as_ptr(),
            fstype.as_ptr(),
            0,
            ptr::null(),
        )
    };

    if ret != 0 {
        let error = io::Error::last_os_error();

        if error.raw_os_error() != Some(libc::EBUSY) {
            return Err(error.into());
        }

        event!(Level::DEBUG, message = "FunctionFS instance already mounted", name, target = %target.display());
    } else {
        event!(Level::DEBUG, message = "mounted FunctionFS instance", name, target = %target.display());
    }

    Ok(target)
}

fn validate_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name.is_ascii()
        && !name.contains(['/', '\0'])
        && name != "."
        && name != "..";

    if valid {
        Ok(())
    } else {
        Err(Error::InvalidName(name.to_string()))
    }
}
