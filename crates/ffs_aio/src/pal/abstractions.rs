// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

mod bindings;
mod platform;

pub use bindings::*;
pub use platform::*;
