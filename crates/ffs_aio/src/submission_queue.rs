// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::vec::Drain;

use crate::{Error, Result, SlotKey};

/// Ordered list of armed buffers waiting for the next batched submission.
///
/// The capacity is fixed at creation and the queue never reallocates afterwards.
#[derive(Debug)]
pub(crate) struct SubmissionQueue {
    keys: Vec<SlotKey>,
    capacity: usize,
}

impl SubmissionQueue {
    pub(crate) fn with_capacity(capacity: usize) -> Result<Self> {
        let mut keys = Vec::new();
        keys.try_reserve_exact(capacity)?;

        Ok(Self { keys, capacity })
    }

    pub(crate) fn len(&self) -> usize {
        self.keys.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub(crate) fn remaining(&self) -> usize {
        self.capacity - self.keys.len()
    }

    pub(crate) fn keys(&self) -> &[SlotKey] {
        &self.keys
    }

    pub(crate) fn push(&mut self, key: SlotKey) -> Result<()> {
        if self.remaining() == 0 {
            return Err(Error::CapacityExceeded {
                requested: 1,
                available: 0,
                capacity: self.capacity,
            });
        }

        self.keys.push(key);

        Ok(())
    }

    /// Removes the first `count` entries, which the kernel has accepted, keeping the rest in order.
    pub(crate) fn accept(&mut self, count: usize) -> Drain<'_, SlotKey> {
        let count = count.min(self.keys.len());
        self.keys.drain(..count)
    }
}
