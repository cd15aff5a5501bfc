// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fs;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};

use tracing::{Level, event};

use crate::{Error, Result};

/// Directory that holds the device nodes of the system.
pub const DEV_DIR: &str = "/dev";

/// Finds the node in `/dev` whose device number is `major:minor`.
///
/// Only the top level of `/dev` is scanned. Symbolic links are followed, so a link to a matching
/// node may be returned if the directory lists it first.
///
/// # Errors
///
/// * [`Error::NotFound`] if no entry matches.
/// * [`Error::Io`] if the directory cannot be read.
pub fn resolve_device_path(major: u32, minor: u32) -> Result<PathBuf> {
    resolve_device_path_in(DEV_DIR, major, minor)
}

/// Finds the entry of `dir` whose device number is `major:minor`.
///
/// Entries that cannot be inspected, for example dangling links, are skipped.
///
/// # Errors
///
/// * [`Error::NotFound`] if no entry matches.
/// * [`Error::Io`] if the directory cannot be read.
pub fn resolve_device_path_in(dir: impl AsRef<Path>, major: u32, minor: u32) -> Result<PathBuf> {
    let dir = dir.as_ref();

    for entry in fs::read_dir(dir)? {
        let path = match entry {
            Ok(entry) => entry.path(),
            Err(error) => {
                event!(Level::TRACE, message = "skipping unreadable directory entry", %error);
                continue;
            }
        };

        let rdev = match fs::metadata(&path) {
            Ok(metadata) => metadata.rdev(),
            Err(error) => {
                event!(Level::TRACE, message = "skipping entry", path = %path.display(), %error);
                continue;
            }
        };

        if libc::major(rdev) == major && libc::minor(rdev) == minor {
            event!(
                Level::DEBUG,
                message = "resolved device node",
                major,
                minor,
                path = %path.display()
            );

            return Ok(path);
        }
    }

    Err(Error::NotFound { major, minor })
}
