// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Test doubles and helpers used by the unit tests of this crate.

mod simulated_kernel;
pub(crate) use simulated_kernel::*;

mod unit_test_helpers;
pub(crate) use unit_test_helpers::*;

pub(crate) const ERR_POISONED_LOCK: &str = "poisoned lock - a previous test assertion failed while holding the lock";
