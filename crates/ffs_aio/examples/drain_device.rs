// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Keeps a readable character device continuously drained with batched asynchronous reads.
//!
//! Usage: `drain_device [PATH] [CYCLES]`, defaulting to `/dev/zero` and 16 cycles. Point it at a
//! FunctionFS OUT endpoint (e.g. `/dev/ffs-adb/ep1`) to drain a real USB gadget endpoint.

use std::env;
use std::error::Error;
use std::fs::File;
use std::os::fd::AsFd;

use ffs_aio::{Context, Direction, EndpointConfig};
use tracing::Level;

const DEFAULT_PATH: &str = "/dev/zero";
const DEFAULT_CYCLES: usize = 16;

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .init();

    let mut args = env::args().skip(1);
    let path = args.next().unwrap_or_else(|| DEFAULT_PATH.to_string());
    let cycles = match args.next() {
        Some(cycles) => cycles.parse()?,
        None => DEFAULT_CYCLES,
    };

    let device = File::open(&path)?;

    let mut context = Context::with_endpoints(&[EndpointConfig::new(device.as_fd(), Direction::Read)
        .with_buffer_count(4)
        .with_buffer_size(16 * 1024)])?;

    context.submit()?;

    let mut total_bytes: u64 = 0;
    let mut failed_transfers = 0_usize;

    for _ in 0..cycles {
        let count = context.poll()?;

        for completion in context.completions() {
            match completion?.payload() {
                Ok(payload) => total_bytes += payload.len() as u64,
                Err(errno) => {
                    failed_transfers += 1;
                    println!("transfer failed: {errno}");
                }
            }
        }

        for index in 0..count {
            context.rearm_read(index)?;
        }

        context.submit()?;
    }

    println!("read {total_bytes} bytes from {path} in {cycles} cycles, {failed_transfers} failed transfers");

    Ok(())
}
