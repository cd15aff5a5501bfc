// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::num::NonZeroUsize;

use mockall::mock;

use crate::pal::{BindingsFacade, Platform};

mock! {
    #[derive(Debug)]
    pub Platform { }

    impl Platform for Platform {
        fn bindings(&self) -> BindingsFacade;
        fn allocate_region(&self, len: NonZeroUsize) -> Option<Box<[u8]>>;
    }
}
