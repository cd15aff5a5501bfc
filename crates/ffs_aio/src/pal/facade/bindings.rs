// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::os::fd::RawFd;
#[cfg(test)]
use std::sync::Arc;

#[cfg(test)]
use crate::pal::MockBindings;
use crate::pal::{AioContextId, Bindings, BuildTargetBindings, IoEvent, Iocb, SysResult};
#[cfg(test)]
use crate::testing::SimulatedKernel;

// Hides the difference between real, mock and simulated bindings behind a common facade.
#[derive(Clone, Debug)]
pub enum BindingsFacade {
    Real(&'static BuildTargetBindings),

    #[cfg(test)]
    Mock(Arc<MockBindings>),

    #[cfg(test)]
    Simulated(Arc<SimulatedKernel>),
}

impl BindingsFacade {
    #[cfg_attr(test, mutants::skip)] // Low-impact layer, waste of time to mutate.
    pub const fn real() -> Self {
        Self::Real(&BuildTargetBindings)
    }

    #[cfg(test)]
    #[cfg_attr(test, mutants::skip)] // Low-impact layer, waste of time to mutate.
    pub fn from_mock(bindings: MockBindings) -> Self {
        Self::Mock(Arc::new(bindings))
    }

    #[cfg(test)]
    #[cfg_attr(test, mutants::skip)] // Low-impact layer, waste of time to mutate.
    pub fn from_simulated(kernel: &Arc<SimulatedKernel>) -> Self {
        Self::Simulated(Arc::clone(kernel))
    }
}

impl Bindings for BindingsFacade {
    #[cfg_attr(test, mutants::skip)] // Low-impact layer, waste of time to mutate.
    fn io_setup(&self, max_events: u32) -> SysResult<AioContextId> {
        match self {
            Self::Real(real) => real.io_setup(max_events),
            #[cfg(test)]
            Self::Mock(mock) => mock.io_setup(max_events),
            #[cfg(test)]
            Self::Simulated(simulated) => simulated.io_setup(max_events),
        }
    }

    #[cfg_attr(test, mutants::skip)] // Low-impact layer, waste of time to mutate.
    fn io_destroy(&self, context: AioContextId) -> SysResult<()> {
        match self {
            Self::Real(real) => real.io_destroy(context),
            #[cfg(test)]
            Self::Mock(mock) => mock.io_destroy(context),
            #[cfg(test)]
            Self::Simulated(simulated) => simulated.io_destroy(context),
        }
    }

    #[cfg_attr(test, mutants::skip)] // Low-impact layer, waste of time to mutate.
    unsafe fn io_submit(&self, context: AioContextId, iocbs: &[*mut Iocb]) -> SysResult<usize> {
        match self {
            Self::Real(real) => {
                // SAFETY: Forwarding safety requirements.
                unsafe { real.io_submit(context, iocbs) }
            }
            #[cfg(test)]
            Self::Mock(mock) => {
                // SAFETY: Forwarding safety requirements.
                unsafe { mock.io_submit(context, iocbs) }
            }
            #[cfg(test)]
            Self::Simulated(simulated) => {
                // SAFETY: Forwarding safety requirements.
                unsafe { simulated.io_submit(context, iocbs) }
            }
        }
    }

    #[cfg_attr(test, mutants::skip)] // Low-impact layer, waste of time to mutate.
    fn io_getevents(
        &self,
        context: AioContextId,
        min_nr: usize,
        events: &mut [IoEvent],
    ) -> SysResult<usize> {
        match self {
            Self::Real(real) => real.io_getevents(context, min_nr, events),
            #[cfg(test)]
            Self::Mock(mock) => mock.io_getevents(context, min_nr, events),
            #[cfg(test)]
            Self::Simulated(simulated) => simulated.io_getevents(context, min_nr, events),
        }
    }

    #[cfg_attr(test, mutants::skip)] // Low-impact layer, waste of time to mutate.
    fn eventfd(&self) -> SysResult<RawFd> {
        match self {
            Self::Real(real) => real.eventfd(),
            #[cfg(test)]
            Self::Mock(mock) => mock.eventfd(),
            #[cfg(test)]
            Self::Simulated(simulated) => simulated.eventfd(),
        }
    }

    #[cfg_attr(test, mutants::skip)] // Low-impact layer, waste of time to mutate.
    fn eventfd_read(&self, fd: RawFd) -> SysResult<u64> {
        match self {
            Self::Real(real) => real.eventfd_read(fd),
            #[cfg(test)]
            Self::Mock(mock) => mock.eventfd_read(fd),
            #[cfg(test)]
            Self::Simulated(simulated) => simulated.eventfd_read(fd),
        }
    }

    #[cfg_attr(test, mutants::skip)] // Low-impact layer, waste of time to mutate.
    fn close(&self, fd: RawFd) -> SysResult<()> {
        match self {
            Self::Real(real) => real.close(fd),
            #[cfg(test)]
            Self::Mock(mock) => mock.close(fd),
            #[cfg(test)]
            Self::Simulated(simulated) => simulated.close(fd),
        }
    }
}
