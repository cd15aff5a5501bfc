// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

mod abstractions;
mod facade;
mod linux;
mod region;
mod sys;

pub use abstractions::*;
pub use facade::*;
pub use linux::*;
pub use region::*;
pub use sys::*;

#[cfg(test)]
mod mocks;
#[cfg(test)]
pub use mocks::*;

/// Singleton instance of `BuildTargetPlatform`, used by public API types
/// to hook up to the real kernel.
///
/// Internal types in this crate may also use other (e.g. mock) platforms,
/// with the instance typically received via ctor parameter.
pub static BUILD_TARGET_PLATFORM: BuildTargetPlatform = BuildTargetPlatform;
