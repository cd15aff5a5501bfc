// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::VecDeque;
use std::os::fd::RawFd;
use std::ptr;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::pal::{AioContextId, Bindings, IoEvent, Iocb, SysResult};
use crate::testing::ERR_POISONED_LOCK;
use crate::{Errno, SlotKey};

const FIRST_EVENTFD: RawFd = 100;

/// An in-memory stand-in for the kernel AIO machinery.
///
/// Submitted descriptors are copied into an in-flight list, exactly like the real kernel copies
/// them during `io_submit`. Nothing completes on its own: tests decide which operations finish
/// and with what result, and the simulated `eventfd` is signaled accordingly. Failures of the
/// individual calls can be injected one call at a time.
///
/// Designed to be used in scenarios where a mock platform is used, as driving a sequence of
/// stateful kernel calls via mockall expectations quickly becomes unreadable.
#[derive(Debug, Default)]
pub struct SimulatedKernel {
    state: Mutex<State>,
}

#[derive(Debug, Default)]
struct State {
    live_contexts: Vec<AioContextId>,
    next_context: AioContextId,

    open_eventfds: Vec<RawFd>,
    next_eventfd: RawFd,
    eventfd_counter: u64,

    in_flight: Vec<Iocb>,
    ready: VecDeque<IoEvent>,

    submitted_batches: Vec<Vec<SlotKey>>,
    submit_calls: usize,

    destroy_failures: VecDeque<Errno>,
    submit_failures: VecDeque<Errno>,
    submit_limits: VecDeque<usize>,
    getevents_failures: VecDeque<Errno>,
    eventfd_read_failures: VecDeque<Errno>,
}

impl SimulatedKernel {
    #[cfg_attr(test, mutants::skip)] // This is test code, we do not care about mutating it.
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().expect(ERR_POISONED_LOCK)
    }

    /// Completes an in-flight operation with the given raw result and signals the `eventfd`.
    ///
    /// # Panics
    ///
    /// Panics if the operation is not in flight.
    #[cfg_attr(test, mutants::skip)] // This is test code, we do not care about mutating it.
    pub(crate) fn complete(&self, key: SlotKey, res: i64) {
        let mut state = self.state();

        let position = state
            .in_flight
            .iter()
            .position(|iocb| iocb.aio_data == key.to_user_data())
            .unwrap_or_else(|| panic!("{key} is not in flight"));

        let iocb = state.in_flight.remove(position);

        state.ready.push_back(IoEvent {
            data: iocb.aio_data,
            obj: 0,
            res,
            res2: 0,
        });
        state.eventfd_counter += 1;
    }

    /// Completes an in-flight read as if `bytes` had arrived from the endpoint, copying them into
    /// the data region of the operation.
    ///
    /// # Panics
    ///
    /// Panics if the operation is not in flight or `bytes` does not fit the transfer.
    #[cfg_attr(test, mutants::skip)] // This is test code, we do not care about mutating it.
    pub(crate) fn complete_with_data(&self, key: SlotKey, bytes: &[u8]) {
        let iocb = self
            .in_flight(key)
            .unwrap_or_else(|| panic!("{key} is not in flight"));

        assert!(bytes.len() as u64 <= iocb.aio_nbytes);

        let target = ptr::with_exposed_provenance_mut::<u8>(iocb.aio_buf as usize);

        // SAFETY: The descriptor references a live region of at least `aio_nbytes` bytes that
        // nothing else accesses while the operation is in flight.
        unsafe {
            ptr::copy_nonoverlapping(bytes.as_ptr(), target, bytes.len());
        }

        self.complete(key, bytes.len() as i64);
    }

    /// Queues a completion record that does not correspond to any submitted operation.
    #[cfg_attr(test, mutants::skip)] // This is test code, we do not care about mutating it.
    pub(crate) fn inject_event(&self, event: IoEvent) {
        let mut state = self.state();
        state.ready.push_back(event);
        state.eventfd_counter += 1;
    }

    /// The copy of an in-flight descriptor, as captured at submission time.
    #[cfg_attr(test, mutants::skip)] // This is test code, we do not care about mutating it.
    pub(crate) fn in_flight(&self, key: SlotKey) -> Option<Iocb> {
        self.state()
            .in_flight
            .iter()
            .find(|iocb| iocb.aio_data == key.to_user_data())
            .copied()
    }

    #[cfg_attr(test, mutants::skip)] // This is test code, we do not care about mutating it.
    pub(crate) fn in_flight_keys(&self) -> Vec<SlotKey> {
        self.state()
            .in_flight
            .iter()
            .map(|iocb| SlotKey::from_user_data(iocb.aio_data))
            .collect()
    }

    /// Keys of every batch accepted so far, in the order the kernel accepted them.
    #[cfg_attr(test, mutants::skip)] // This is test code, we do not care about mutating it.
    pub(crate) fn submitted_batches(&self) -> Vec<Vec<SlotKey>> {
        self.state().submitted_batches.clone()
    }

    /// Number of `io_submit` calls, including failed ones.
    #[cfg_attr(test, mutants::skip)] // This is test code, we do not care about mutating it.
    pub(crate) fn submit_calls(&self) -> usize {
        self.state().submit_calls
    }

    #[cfg_attr(test, mutants::skip)] // This is test code, we do not care about mutating it.
    pub(crate) fn live_contexts(&self) -> usize {
        self.state().live_contexts.len()
    }

    #[cfg_attr(test, mutants::skip)] // This is test code, we do not care about mutating it.
    pub(crate) fn open_eventfds(&self) -> usize {
        self.state().open_eventfds.len()
    }

    /// Makes the next `io_destroy` fail. The context stays alive and every operation stays in
    /// flight, as with a kernel that refuses the call.
    #[cfg_attr(test, mutants::skip)] // This is test code, we do not care about mutating it.
    pub(crate) fn fail_next_destroy(&self, errno: Errno) {
        self.state().destroy_failures.push_back(errno);
    }

    #[cfg_attr(test, mutants::skip)] // This is test code, we do not care about mutating it.
    pub(crate) fn fail_next_submit(&self, errno: Errno) {
        self.state().submit_failures.push_back(errno);
    }

    /// Makes the next successful `io_submit` accept at most `limit` descriptors.
    #[cfg_attr(test, mutants::skip)] // This is test code, we do not care about mutating it.
    pub(crate) fn limit_next_submit(&self, limit: usize) {
        self.state().submit_limits.push_back(limit);
    }

    #[cfg_attr(test, mutants::skip)] // This is test code, we do not care about mutating it.
    pub(crate) fn fail_next_getevents(&self, errno: Errno) {
        self.state().getevents_failures.push_back(errno);
    }

    #[cfg_attr(test, mutants::skip)] // This is test code, we do not care about mutating it.
    pub(crate) fn fail_next_eventfd_read(&self, errno: Errno) {
        self.state().eventfd_read_failures.push_back(errno);
    }
}

impl Bindings for SimulatedKernel {
    fn io_setup(&self, _max_events: u32) -> SysResult<AioContextId> {
        let mut state = self.state();

        state.next_context += 1;
        let id = state.next_context;
        state.live_contexts.push(id);

        Ok(id)
    }

    fn io_destroy(&self, context: AioContextId) -> SysResult<()> {
        let mut state = self.state();

        let Some(position) = state.live_contexts.iter().position(|id| *id == context) else {
            return Err(Errno(libc::EINVAL));
        };

        if let Some(errno) = state.destroy_failures.pop_front() {
            return Err(errno);
        }

        state.live_contexts.remove(position);

        // Destroying the context cancels everything that was still outstanding.
        state.in_flight.clear();
        state.ready.clear();

        Ok(())
    }

    unsafe fn io_submit(&self, context: AioContextId, iocbs: &[*mut Iocb]) -> SysResult<usize> {
        let mut state = self.state();
        state.submit_calls += 1;

        if !state.live_contexts.contains(&context) {
            return Err(Errno(libc::EINVAL));
        }

        if let Some(errno) = state.submit_failures.pop_front() {
            return Err(errno);
        }

        let limit = state.submit_limits.pop_front().unwrap_or(usize::MAX);
        let accepted = &iocbs[..iocbs.len().min(limit)];

        let mut batch = Vec::with_capacity(accepted.len());

        for iocb in accepted {
            // SAFETY: The caller guarantees that every pointer references a valid descriptor.
            let iocb = unsafe { iocb.read() };

            let key = SlotKey::from_user_data(iocb.aio_data);
            assert!(
                !state.in_flight.iter().any(|i| i.aio_data == iocb.aio_data),
                "{key} was submitted while already in flight"
            );

            batch.push(key);
            state.in_flight.push(iocb);
        }

        state.submitted_batches.push(batch);

        Ok(accepted.len())
    }

    fn io_getevents(
        &self,
        context: AioContextId,
        _min_nr: usize,
        events: &mut [IoEvent],
    ) -> SysResult<usize> {
        let mut state = self.state();

        if !state.live_contexts.contains(&context) {
            return Err(Errno(libc::EINVAL));
        }

        if let Some(errno) = state.getevents_failures.pop_front() {
            return Err(errno);
        }

        let mut received = 0;

        for slot in events.iter_mut() {
            let Some(event) = state.ready.pop_front() else {
                break;
            };

            *slot = event;
            received += 1;
        }

        Ok(received)
    }

    fn eventfd(&self) -> SysResult<RawFd> {
        let mut state = self.state();

        let fd = FIRST_EVENTFD + state.next_eventfd;
        state.next_eventfd += 1;
        state.open_eventfds.push(fd);

        Ok(fd)
    }

    fn eventfd_read(&self, fd: RawFd) -> SysResult<u64> {
        let mut state = self.state();

        if !state.open_eventfds.contains(&fd) {
            return Err(Errno(libc::EBADF));
        }

        if let Some(errno) = state.eventfd_read_failures.pop_front() {
            return Err(errno);
        }

        // A real read would block forever here; a test that gets this far has a bug.
        if state.eventfd_counter == 0 {
            return Err(Errno(libc::EAGAIN));
        }

        Ok(std::mem::take(&mut state.eventfd_counter))
    }

    fn close(&self, fd: RawFd) -> SysResult<()> {
        let mut state = self.state();

        let Some(position) = state.open_eventfds.iter().position(|open| *open == fd) else {
            return Err(Errno(libc::EBADF));
        };

        state.open_eventfds.remove(position);

        Ok(())
    }
}
