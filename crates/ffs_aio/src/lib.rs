// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Batched asynchronous I/O for USB FunctionFS endpoints, built on Linux native AIO
//! (`io_setup`, `io_submit`, `io_getevents`) with completions signaled through an `eventfd`.
//!
//! A USB gadget has to keep its data endpoints continuously supplied with outstanding transfers,
//! otherwise the host side stalls waiting for the device. This crate owns a fixed pool of transfer
//! buffers per endpoint and keeps every one of them perpetually in flight:
//!
//! 1. Create a [`Context`] sized for the number of endpoints and the maximum number of
//!    operations that may be outstanding at once.
//! 1. Initialize each endpoint with [`Context::init_endpoint`], which allocates its buffers and
//!    queues one operation per buffer.
//! 1. Hand the queued operations to the kernel with [`Context::submit`].
//! 1. Wait for completions with [`Context::poll`], inspect each of them with
//!    [`Context::extract`], fill or stage data through [`Context::buffer_mut`] if needed and
//!    queue the buffer again with [`Context::rearm_read`] or [`Context::rearm_write`].
//! 1. Submit again and repeat. Dropping the context cancels outstanding operations and releases
//!    every resource.
//!
//! ```no_run
//! use std::fs::File;
//! use std::os::fd::AsFd;
//!
//! use ffs_aio::{Context, Direction, EndpointConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let ep1 = File::open("/dev/ffs-dl/ep1")?;
//!
//! let mut context = Context::with_endpoints(&[EndpointConfig::new(ep1.as_fd(), Direction::Read)
//!     .with_buffer_count(8)
//!     .with_buffer_size(16 * 1024)])?;
//!
//! context.submit()?;
//!
//! loop {
//!     let count = context.poll()?;
//!
//!     for completion in context.completions() {
//!         let completion = completion?;
//!         println!("{} bytes from {:?}", completion.result(), completion.fd());
//!     }
//!
//!     for index in 0..count {
//!         context.rearm_read(index)?;
//!     }
//!
//!     context.submit()?;
//! }
//! # }
//! ```
//!
//! # Threading
//!
//! A context is driven by exactly one loop. It is neither `Send` nor `Sync` because the kernel
//! holds pointers into its buffer arena while operations are in flight.
//!
//! # Reactor integration
//!
//! [`Context::wake_fd`] exposes the `eventfd` that becomes readable whenever operations complete,
//! so a reactor can wait for readiness before calling [`Context::poll`], which then does not block.

#![cfg(target_os = "linux")]

pub(crate) mod pal;

#[cfg(test)]
mod testing;

mod buffer;
mod completion;
mod context;
mod direction;
mod endpoint;
mod endpoint_config;
mod error;
mod kernel_resources;
mod slot_key;
mod submission_queue;

pub use buffer::BufferState;
pub use completion::*;
pub use context::*;
pub use direction::*;
pub use endpoint_config::*;
pub use error::*;
pub use slot_key::*;
