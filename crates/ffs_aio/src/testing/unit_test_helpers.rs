// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::os::fd::{BorrowedFd, RawFd};
use std::sync::Arc;

use crate::pal::{BindingsFacade, MockPlatform, PlatformFacade, allocate_zeroed_region};
use crate::testing::SimulatedKernel;

/// Creates a platform that routes every kernel call to the simulated kernel and performs real
/// memory allocations.
#[cfg_attr(test, mutants::skip)] // This is test code, we do not care about mutating it.
pub fn simulated_platform(kernel: &Arc<SimulatedKernel>) -> PlatformFacade {
    let mut pal = MockPlatform::new();

    pal.expect_bindings()
        .return_const(BindingsFacade::from_simulated(kernel));
    use_real_allocation(&mut pal);

    pal.into()
}

/// Creates a platform on top of the simulated kernel that fails exactly the region allocation
/// with the zero-based index `failing_allocation` and succeeds otherwise.
#[cfg_attr(test, mutants::skip)] // This is test code, we do not care about mutating it.
pub fn simulated_platform_failing_allocation(
    kernel: &Arc<SimulatedKernel>,
    failing_allocation: usize,
) -> PlatformFacade {
    let mut pal = MockPlatform::new();

    pal.expect_bindings()
        .return_const(BindingsFacade::from_simulated(kernel));

    let mut allocations = 0;

    pal.expect_allocate_region().returning(move |len| {
        let index = allocations;
        allocations += 1;

        if index == failing_allocation {
            None
        } else {
            allocate_zeroed_region(len)
        }
    });

    pal.into()
}

/// Configures a mock platform to perform real memory allocations.
#[cfg_attr(test, mutants::skip)] // This is test code, we do not care about mutating it.
pub fn use_real_allocation(pal: &mut MockPlatform) {
    pal.expect_allocate_region()
        .returning(allocate_zeroed_region);
}

/// Borrows a descriptor number for tests that never perform I/O through it.
#[cfg_attr(test, mutants::skip)] // This is test code, we do not care about mutating it.
pub fn borrowed_fd(fd: RawFd) -> BorrowedFd<'static> {
    // SAFETY: The simulated kernel never touches the descriptor, it only records the number.
    unsafe { BorrowedFd::borrow_raw(fd) }
}
