// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Prints the `/dev` node of a device number given as `MAJOR:MINOR`, for example `1:3`.

use std::env;
use std::error::Error;

use ffs_device::resolve_device_path;
use tracing::Level;

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .init();

    let device = env::args().nth(1).unwrap_or_else(|| "1:3".to_string());
    let (major, minor) = device
        .split_once(':')
        .ok_or("expected a device number as MAJOR:MINOR")?;

    let path = resolve_device_path(major.parse()?, minor.parse()?)?;
    println!("{device} is {}", path.display());

    Ok(())
}
