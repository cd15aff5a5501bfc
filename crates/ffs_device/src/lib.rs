// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Helpers a USB gadget process needs before it can drive FunctionFS endpoints.
//!
//! * [`resolve_device_path`] finds the `/dev` node of a device from its major and minor numbers,
//!   for example to locate a UDC or framebuffer announced through sysfs.
//! * [`mount_function`] mounts a FunctionFS instance under `/dev/<name>`, after which the
//!   gadget writes its descriptors to `ep0` and opens the data endpoints.
//! * [`open_out_endpoint`] and [`open_in_endpoint`] open data endpoints with the access mode the
//!   endpoint direction requires.
//!
//! ```no_run
//! use ffs_device::{mount_function, open_out_endpoint};
//!
//! # fn main() -> Result<(), ffs_device::Error> {
//! let mount_point = mount_function("ffs-dl")?;
//! let ep1 = open_out_endpoint(&mount_point, 1)?;
//! # Ok(())
//! # }
//! ```

#![cfg(target_os = "linux")]

mod device_path;
mod endpoint;
mod error;
mod mount;

pub use device_path::*;
pub use endpoint::*;
pub use error::*;
pub use mount::*;
