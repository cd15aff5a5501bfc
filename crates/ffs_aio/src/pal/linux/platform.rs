// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::num::NonZeroUsize;

use crate::pal::{BindingsFacade, Platform, allocate_zeroed_region};

#[derive(Debug)]
pub struct BuildTargetPlatform;

impl Platform for BuildTargetPlatform {
    #[cfg_attr(test, mutants::skip)] // Real PAL behavior is not meaningful to mutate, we try mutations manually via mock PAL.
    fn bindings(&self) -> BindingsFacade {
        BindingsFacade::real()
    }

    #[cfg_attr(test, mutants::skip)] // Real PAL behavior is not meaningful to mutate, we try mutations manually via mock PAL.
    fn allocate_region(&self, len: NonZeroUsize) -> Option<Box<[u8]>> {
        allocate_zeroed_region(len)
    }
}
