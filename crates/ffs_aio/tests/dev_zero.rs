// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Drives the real kernel AIO machinery against `/dev/zero` and `/dev/null`, which accept
//! asynchronous reads and writes like any FunctionFS endpoint would.

#![cfg(target_os = "linux")]
#![cfg(not(miri))] // Miri cannot talk to real OS.

use std::error::Error;
use std::fs::{File, OpenOptions};
use std::os::fd::{AsFd, AsRawFd};

use ffs_aio::{BufferState, Context, Direction, EndpointConfig};

const BUFFER_SIZE: usize = 4096;
const HEADER_LEN: usize = 64;

// Sandboxed environments may forbid AIO contexts entirely, in which case there is nothing to test.
fn aio_available() -> bool {
    match Context::new(1, 1) {
        Ok(_) => true,
        Err(error) => {
            println!("skipping, kernel AIO is unavailable: {error}");
            false
        }
    }
}

#[test]
fn read_and_write_cycles() -> Result<(), Box<dyn Error>> {
    if !aio_available() {
        return Ok(());
    }

    let source = File::open("/dev/zero")?;
    let sink = OpenOptions::new().write(true).open("/dev/null")?;

    let mut context = Context::with_endpoints(&[
        EndpointConfig::new(source.as_fd(), Direction::Read)
            .with_buffer_count(2)
            .with_buffer_size(BUFFER_SIZE)
            .with_header_len(HEADER_LEN),
        EndpointConfig::new(sink.as_fd(), Direction::Write)
            .with_buffer_count(2)
            .with_buffer_size(BUFFER_SIZE),
    ])?;

    assert_eq!(context.submit()?, 4);

    let mut completed = 0;

    while completed < 12 {
        let count = context.poll()?;
        assert!(count > 0);

        for completion in context.completions() {
            let completion = completion?;

            match completion.endpoint() {
                0 => {
                    assert_eq!(completion.fd().as_raw_fd(), source.as_raw_fd());
                    assert_eq!(completion.offset(), HEADER_LEN);

                    let payload = completion.payload()?;
                    assert_eq!(payload.len(), BUFFER_SIZE - HEADER_LEN);
                    assert!(payload.iter().all(|b| *b == 0));
                }
                1 => {
                    assert_eq!(completion.fd().as_raw_fd(), sink.as_raw_fd());
                    assert_eq!(completion.result(), BUFFER_SIZE as i64);
                }
                other => panic!("completion for unknown endpoint {other}"),
            }

            assert_eq!(context.buffer_state(completion.slot()), Some(BufferState::Completed));
        }

        for index in 0..count {
            let direction = if context.extract(index)?.endpoint() == 0 {
                Direction::Read
            } else {
                context.buffer_mut(index)?.fill(0xA5);
                Direction::Write
            };

            context.rearm(index, direction)?;
        }

        assert_eq!(context.submit()?, count);
        completed += count;
    }

    // Dropping with operations in flight must neither hang nor crash.
    drop(context);

    Ok(())
}
