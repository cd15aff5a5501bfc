// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt::Debug;
use std::num::NonZeroUsize;

use crate::pal::BindingsFacade;

/// Everything a context needs from the operating system: the kernel calls and the memory that
/// backs transfer buffers.
pub trait Platform: Debug + Send + Sync + 'static {
    fn bindings(&self) -> BindingsFacade;

    /// Allocates a zero-filled data region of exactly `len` bytes for one transfer buffer, or
    /// returns `None` if the memory cannot be obtained. Must never abort the process.
    ///
    /// Regions are requested only while an endpoint is initialized and live as long as the
    /// context, so this is never on the transfer path.
    fn allocate_region(&self, len: NonZeroUsize) -> Option<Box<[u8]>>;
}
