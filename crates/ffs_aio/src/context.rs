// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::mem;
use std::num::NonZeroUsize;
use std::os::fd::{AsRawFd, BorrowedFd};

use tracing::{Level, event};

use crate::buffer::Buffer;
use crate::endpoint::{self, Endpoint};
use crate::endpoint_config::validate_geometry;
use crate::kernel_resources::{AioHandle, WakeFd};
use crate::pal::{IoEvent, Iocb, Platform, PlatformFacade};
use crate::submission_queue::SubmissionQueue;
use crate::{BufferState, Completion, Direction, EndpointConfig, Error, Result, SlotKey};

/// Drives batched asynchronous transfers on a fixed set of endpoints.
///
/// The context owns a kernel AIO context sized for `max_events` concurrent operations, an
/// `eventfd` that the kernel signals on every completion and a pool of transfer buffers per
/// endpoint. Every buffer is always in exactly one place: queued for submission, in flight in
/// the kernel, or completed and waiting to be inspected and rearmed.
///
/// The endpoint file descriptors are borrowed for `'fd` and are never closed by the context.
///
/// # Teardown
///
/// Dropping the context destroys the kernel AIO context first, which cancels or waits for every
/// operation still in flight. Only then are the `eventfd` closed and the buffers released, so
/// buffer memory is never freed while the kernel may still write into it. If the kernel refuses
/// to destroy the AIO context while operations are in flight, the buffers are leaked instead.
///
/// # Thread safety
///
/// This type is single-threaded. The kernel holds raw pointers into the buffer arena while
/// operations are in flight, so the context can be neither sent nor shared across threads.
#[derive(Debug)]
pub struct Context<'fd> {
    // Field order is drop order. The AIO context must be destroyed before anything the kernel
    // may still reference is released.
    aio: AioHandle,
    wake: WakeFd,
    endpoints: Vec<Option<Endpoint<'fd>>>,

    pending: SubmissionQueue,

    // Reused for every `io_submit` call. Capacity is `max_events` and never grows.
    submit_scratch: Vec<*mut Iocb>,

    // Completion records of the most recent poll. Only `..ready` are meaningful.
    events: Vec<IoEvent>,
    ready: usize,

    // Buffers owned by initialized endpoints. Never exceeds `max_events`.
    reserved: usize,

    platform: PlatformFacade,
}

impl<'fd> Context<'fd> {
    /// Creates a context for `ep_count` endpoints with room for `max_events` operations that are
    /// queued or in flight at the same time.
    ///
    /// Endpoints are added afterwards with [`init_endpoint`][Self::init_endpoint].
    ///
    /// # Errors
    ///
    /// * [`Error::InvalidArgument`] if `ep_count` is zero or `max_events` is zero or larger than
    ///   `i32::MAX`.
    /// * [`Error::ResourceExhausted`] if the bookkeeping memory cannot be reserved.
    /// * [`Error::KernelSetupFailed`] if the kernel refuses to create the AIO context or the
    ///   `eventfd`.
    ///
    /// Nothing is leaked on failure: every resource that was already created is released.
    pub fn new(ep_count: usize, max_events: usize) -> Result<Self> {
        Self::with_platform(ep_count, max_events, &PlatformFacade::real())
    }

    /// Creates a context and initializes one endpoint per configuration, queueing one read or
    /// write per buffer. The context is sized for exactly the total number of buffers.
    ///
    /// # Errors
    ///
    /// Any error of [`new`][Self::new] or [`init_endpoint`][Self::init_endpoint]. The
    /// partially built context is dropped on failure.
    pub fn with_endpoints(configs: &[EndpointConfig<'fd>]) -> Result<Self> {
        Self::with_endpoints_and_platform(configs, &PlatformFacade::real())
    }

    pub(crate) fn with_endpoints_and_platform(
        configs: &[EndpointConfig<'fd>],
        platform: &PlatformFacade,
    ) -> Result<Self> {
        let mut max_events: usize = 0;

        for config in configs {
            config.validate()?;

            max_events = max_events
                .checked_add(config.buffer_count())
                .ok_or_else(|| Error::InvalidArgument("total buffer count overflows".to_string()))?;
        }

        let mut context = Self::with_platform(configs.len(), max_events, platform)?;

        for (index, config) in configs.iter().enumerate() {
            context.init_endpoint_from(index, config)?;
        }

        Ok(context)
    }

    pub(crate) fn with_platform(
        ep_count: usize,
        max_events: usize,
        platform: &PlatformFacade,
    ) -> Result<Self> {
        if ep_count == 0 || u32::try_from(ep_count).is_err() {
            return Err(Error::InvalidArgument(format!(
                "endpoint count {ep_count} is out of range"
            )));
        }

        let max_events_u32 = u32::try_from(max_events)
            .ok()
            .filter(|n| (1..=i32::MAX.cast_unsigned()).contains(n))
            .ok_or_else(|| {
                Error::InvalidArgument(format!("max_events {max_events} is out of range"))
            })?;

        let mut endpoints = Vec::new();
        endpoints.try_reserve_exact(ep_count)?;
        endpoints.resize_with(ep_count, || None);

        let pending = SubmissionQueue::with_capacity(max_events)?;

        let mut submit_scratch = Vec::new();
        submit_scratch.try_reserve_exact(max_events)?;

        let mut events = Vec::new();
        events.try_reserve_exact(max_events)?;
        events.resize(max_events, IoEvent::default());

        let bindings = platform.bindings();

        // If the eventfd cannot be created, the AIO context is destroyed on the way out.
        let aio = AioHandle::new(bindings.clone(), max_events_u32)?;
        let wake = WakeFd::new(bindings)?;

        event!(
            Level::DEBUG,
            message = "created asynchronous I/O context",
            ep_count,
            max_events,
            wake_fd = wake.raw()
        );

        Ok(Self {
            aio,
            wake,
            endpoints,
            pending,
            submit_scratch,
            events,
            ready: 0,
            reserved: 0,
            platform: platform.clone(),
        })
    }

    /// Allocates `buf_count` buffers of `buf_size` bytes for the endpoint at `index` and queues
    /// one transfer in `direction` per buffer. Each transfer covers the buffer minus its first
    /// `buf_offset` bytes, which are reserved as a header for the caller.
    ///
    /// The queued transfers reach the kernel on the next [`submit`][Self::submit].
    ///
    /// # Errors
    ///
    /// * [`Error::InvalidArgument`] if `index` is out of range or the buffer geometry is
    ///   unusable.
    /// * [`Error::ContractViolation`] if the endpoint is already initialized.
    /// * [`Error::CapacityExceeded`] if the buffers would not fit within `max_events`. Checked
    ///   before anything is allocated.
    /// * [`Error::ResourceExhausted`] if a buffer cannot be allocated. Buffers allocated so far
    ///   are released and the endpoint stays uninitialized, so the call may be retried.
    pub fn init_endpoint(
        &mut self,
        index: usize,
        fd: BorrowedFd<'fd>,
        buf_count: usize,
        buf_size: usize,
        buf_offset: usize,
        direction: Direction,
    ) -> Result<()> {
        let config = EndpointConfig::new(fd, direction)
            .with_buffer_count(buf_count)
            .with_buffer_size(buf_size)
            .with_header_len(buf_offset);

        self.init_endpoint_from(index, &config)
    }

    /// Same as [`init_endpoint`][Self::init_endpoint], with the endpoint described by a
    /// configuration value.
    ///
    /// # Errors
    ///
    /// See [`init_endpoint`][Self::init_endpoint].
    pub fn init_endpoint_from(&mut self, index: usize, config: &EndpointConfig<'fd>) -> Result<()> {
        let ep_count = self.endpoints.len();

        let slot = self.endpoints.get(index).ok_or_else(|| {
            Error::InvalidArgument(format!(
                "endpoint index {index} is out of range for {ep_count} endpoints"
            ))
        })?;

        if slot.is_some() {
            return Err(Error::ContractViolation(format!(
                "endpoint {index} is already initialized"
            )));
        }

        let buf_count = config.buffer_count();
        let buf_size = config.buffer_size();
        let buf_offset = config.header_len();

        validate_geometry(buf_count, buf_size, buf_offset)?;

        let capacity = self.max_events();
        let available = (capacity - self.reserved).min(self.pending.remaining());

        if buf_count > available {
            return Err(Error::CapacityExceeded {
                requested: buf_count,
                available,
                capacity,
            });
        }

        let endpoint_index = to_index(index)?;
        let fd = config.fd();
        let direction = config.direction();

        let mut buffers = self.allocate_buffers(buf_count, buf_size, buf_offset)?;

        for (buffer_index, buffer) in buffers.iter_mut().enumerate() {
            let key = SlotKey::new(endpoint_index, to_index(buffer_index)?);
            buffer.arm(key, direction, fd.as_raw_fd(), self.wake.raw())?;
        }

        for buffer_index in 0..buffers.len() {
            self.pending
                .push(SlotKey::new(endpoint_index, to_index(buffer_index)?))?;
        }

        self.reserved += buf_count;

        self.endpoints[index] = Some(Endpoint::new(fd, direction, buffers));

        event!(
            Level::DEBUG,
            message = "initialized endpoint",
            index,
            fd = fd.as_raw_fd(),
            %direction,
            buf_count,
            buf_size,
            buf_offset
        );

        Ok(())
    }

    // On failure the buffers allocated so far are dropped with the vector.
    fn allocate_buffers(
        &self,
        buf_count: usize,
        buf_size: usize,
        buf_offset: usize,
    ) -> Result<Vec<Buffer>> {
        let len = NonZeroUsize::new(buf_size)
            .ok_or_else(|| Error::InvalidArgument("buffer size must be greater than zero".to_string()))?;

        let mut buffers = Vec::new();
        buffers.try_reserve_exact(buf_count)?;

        for buffer_index in 0..buf_count {
            let Some(data) = self.platform.allocate_region(len) else {
                event!(
                    Level::DEBUG,
                    message = "buffer allocation failed, releasing endpoint buffers",
                    buffer_index,
                    buf_size
                );

                return Err(Error::ResourceExhausted);
            };

            buffers.push(Buffer::new(data, buf_offset));
        }

        Ok(buffers)
    }

    /// Blocks until at least one operation has completed, then collects up to `max_events`
    /// completion records and returns how many belong to in-flight buffers of this context.
    ///
    /// Those records move their buffers to the completed state and stay available through
    /// [`extract`][Self::extract] at indexes `0..count` until the next poll. Records that do not
    /// belong to an in-flight buffer are logged and discarded.
    ///
    /// # Errors
    ///
    /// * [`Error::Io`] if reading the `eventfd` or collecting the records fails. Interrupted
    ///   waits are reported as `EINTR` rather than retried. Buffer states are unchanged.
    /// * [`Error::ContractViolation`] if every collected record was discarded. Buffer states are
    ///   unchanged.
    pub fn poll(&mut self) -> Result<usize> {
        self.ready = 0;

        let signaled = self.wake.wait().map_err(Error::Io)?;
        let received = self
            .aio
            .get_events(1, &mut self.events)
            .map_err(Error::Io)?
            .min(self.events.len());

        let mut valid = 0;
        let mut first_rejection = None;

        // Records of in-flight buffers are compacted to the front in the order received.
        for index in 0..received {
            let record = self.events[index];
            let key = SlotKey::from_user_data(record.data);

            let outcome = endpoint::resolve_mut(&mut self.endpoints, key)
                .and_then(|(_, buffer)| buffer.mark_completed(key));

            match outcome {
                Ok(()) => {
                    self.events[valid] = record;
                    valid += 1;
                }
                Err(error) => {
                    event!(
                        Level::WARN,
                        message = "discarding completion record that does not belong to an in-flight buffer",
                        %key,
                        res = record.res,
                        %error
                    );

                    first_rejection.get_or_insert(error);
                }
            }
        }

        self.ready = valid;

        event!(Level::TRACE, message = "polled completions", signaled, received, valid);

        match first_rejection {
            Some(error) if valid == 0 => Err(error),
            _ => Ok(valid),
        }
    }

    /// Returns the completion at `event_index` of the most recent poll.
    ///
    /// # Errors
    ///
    /// * [`Error::InvalidArgument`] if `event_index` is not below the count returned by the most
    ///   recent poll.
    /// * [`Error::ContractViolation`] if the buffer has already been submitted again, in which
    ///   case its data region belongs to the kernel.
    pub fn extract(&self, event_index: usize) -> Result<Completion<'_>> {
        let event = self.ready_event(event_index)?;
        let key = SlotKey::from_user_data(event.data);
        let (fd, buffer) = endpoint::resolve(&self.endpoints, key)?;

        if buffer.state() == BufferState::InFlight {
            return Err(Error::ContractViolation(format!(
                "buffer {key} has been submitted again and cannot be inspected"
            )));
        }

        Ok(Completion::new(
            key,
            fd,
            event.res,
            buffer.header_len(),
            buffer.data(),
        ))
    }

    /// Iterates over every completion of the most recent poll, in record order.
    pub fn completions(&self) -> impl Iterator<Item = Result<Completion<'_>>> + '_ {
        (0..self.ready).map(|event_index| self.extract(event_index))
    }

    /// The entire data region, header included, of the buffer of the completion at `event_index`.
    ///
    /// Use it to fill the buffer before [`rearm_write`][Self::rearm_write], or to stage bytes in
    /// the header that a following read should be appended to.
    ///
    /// # Errors
    ///
    /// * [`Error::InvalidArgument`] if `event_index` is not below the count returned by the most
    ///   recent poll.
    /// * [`Error::ContractViolation`] if the buffer is no longer in the completed state.
    pub fn buffer_mut(&mut self, event_index: usize) -> Result<&mut [u8]> {
        let key = SlotKey::from_user_data(self.ready_event(event_index)?.data);

        self.slot_buffer_mut(key)
    }

    /// Same as [`buffer_mut`][Self::buffer_mut], with the buffer identified by its slot key.
    ///
    /// # Errors
    ///
    /// [`Error::ContractViolation`] if the key does not identify a buffer of this context or the
    /// buffer is not in the completed state.
    pub fn slot_buffer_mut(&mut self, key: SlotKey) -> Result<&mut [u8]> {
        let (_, buffer) = endpoint::resolve_mut(&mut self.endpoints, key)?;

        if buffer.state() != BufferState::Completed {
            return Err(Error::ContractViolation(format!(
                "buffer {key} cannot be written while {:?}",
                buffer.state()
            )));
        }

        Ok(buffer.data_mut())
    }

    /// Queues the buffer of the completion at `event_index` for another read.
    ///
    /// # Errors
    ///
    /// See [`rearm`][Self::rearm].
    pub fn rearm_read(&mut self, event_index: usize) -> Result<()> {
        self.rearm(event_index, Direction::Read)
    }

    /// Queues the buffer of the completion at `event_index` for a write of its full usable
    /// length. Fill the buffer through [`buffer_mut`][Self::buffer_mut] before rearming it.
    ///
    /// # Errors
    ///
    /// See [`rearm`][Self::rearm].
    pub fn rearm_write(&mut self, event_index: usize) -> Result<()> {
        self.rearm(event_index, Direction::Write)
    }

    /// Queues the buffer of the completion at `event_index` for another transfer in `direction`.
    /// The transfer reaches the kernel on the next [`submit`][Self::submit].
    ///
    /// # Errors
    ///
    /// * [`Error::InvalidArgument`] if `event_index` is not below the count returned by the most
    ///   recent poll.
    /// * [`Error::ContractViolation`] if the buffer is not in the completed state, for example
    ///   because it has already been rearmed.
    pub fn rearm(&mut self, event_index: usize, direction: Direction) -> Result<()> {
        let key = SlotKey::from_user_data(self.ready_event(event_index)?.data);

        self.rearm_slot(key, direction)
    }

    /// Queues a completed buffer, identified by its slot key, for another transfer.
    ///
    /// # Errors
    ///
    /// * [`Error::ContractViolation`] if the key does not identify a buffer of this context or
    ///   the buffer is not in the completed state.
    /// * [`Error::CapacityExceeded`] if the pending queue is full.
    pub fn rearm_slot(&mut self, key: SlotKey, direction: Direction) -> Result<()> {
        let wake_fd = self.wake.raw();
        let capacity = self.max_events();
        let available = self.pending.remaining();

        let (fd, buffer) = endpoint::resolve_mut(&mut self.endpoints, key)?;

        if buffer.state() != BufferState::Completed {
            return Err(Error::ContractViolation(format!(
                "buffer {key} cannot be rearmed while {:?}",
                buffer.state()
            )));
        }

        if available == 0 {
            return Err(Error::CapacityExceeded {
                requested: 1,
                available,
                capacity,
            });
        }

        buffer.arm(key, direction, fd.as_raw_fd(), wake_fd)?;
        self.pending.push(key)?;

        event!(Level::TRACE, message = "rearmed buffer", %key, %direction);

        Ok(())
    }

    /// Hands every queued transfer to the kernel in one batch and returns how many the kernel
    /// accepted.
    ///
    /// The kernel may accept only a prefix of the batch. Accepted transfers leave the queue and
    /// the rest stay queued, in order, for the next call. An empty queue returns zero without a
    /// kernel call.
    ///
    /// # Errors
    ///
    /// [`Error::Io`] if the kernel rejects the batch. Nothing leaves the queue, so a retry submits
    /// exactly the same transfers.
    pub fn submit(&mut self) -> Result<usize> {
        if self.pending.is_empty() {
            return Ok(0);
        }

        self.submit_scratch.clear();

        for key in self.pending.keys() {
            let (_, buffer) = endpoint::resolve(&self.endpoints, *key)?;
            self.submit_scratch.push(buffer.descriptor_ptr());
        }

        // SAFETY: Every pointer references the descriptor of an armed buffer owned by this
        // context. Buffers are never moved after creation and are released only after the AIO
        // context is destroyed. Data regions of accepted transfers are not accessed again until
        // poll reports them completed.
        let accepted = unsafe { self.aio.submit(&self.submit_scratch) }
            .map_err(Error::Io)?
            .min(self.pending.len());

        let requested = self.pending.len();

        for key in self.pending.accept(accepted) {
            let (_, buffer) = endpoint::resolve_mut(&mut self.endpoints, key)?;
            buffer.mark_in_flight();
        }

        if accepted < requested {
            event!(
                Level::DEBUG,
                message = "kernel accepted part of the submission batch",
                requested,
                accepted
            );
        } else {
            event!(Level::TRACE, message = "submitted batch", accepted);
        }

        Ok(accepted)
    }

    /// The `eventfd` that becomes readable whenever operations complete.
    ///
    /// Register it with a reactor to learn when [`poll`][Self::poll] would not block. Do not read
    /// from it directly, which would swallow the wake-up that `poll` waits for.
    #[must_use]
    pub fn wake_fd(&self) -> BorrowedFd<'_> {
        self.wake.as_fd()
    }

    /// Number of endpoint slots the context was created with.
    #[must_use]
    pub fn endpoint_count(&self) -> usize {
        self.endpoints.len()
    }

    /// Maximum number of operations that may be queued or in flight at once.
    #[must_use]
    pub fn max_events(&self) -> usize {
        self.events.len()
    }

    /// Whether the endpoint at `index` has been initialized.
    #[must_use]
    pub fn is_endpoint_initialized(&self, index: usize) -> bool {
        self.endpoints.get(index).is_some_and(Option::is_some)
    }

    /// Direction the endpoint at `index` was initialized with.
    #[must_use]
    pub fn endpoint_direction(&self, index: usize) -> Option<Direction> {
        self.endpoints
            .get(index)?
            .as_ref()
            .map(Endpoint::direction)
    }

    /// Number of transfers waiting for the next [`submit`][Self::submit].
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Number of completion records collected by the most recent poll.
    #[must_use]
    pub const fn ready_len(&self) -> usize {
        self.ready
    }

    /// Current state of the buffer identified by `key`, or `None` if the key does not identify a
    /// buffer of this context.
    #[must_use]
    pub fn buffer_state(&self, key: SlotKey) -> Option<BufferState> {
        endpoint::resolve(&self.endpoints, key)
            .ok()
            .map(|(_, buffer)| buffer.state())
    }

    fn ready_event(&self, event_index: usize) -> Result<IoEvent> {
        self.events
            .get(..self.ready)
            .and_then(|ready| ready.get(event_index))
            .copied()
            .ok_or_else(|| {
                Error::InvalidArgument(format!(
                    "completion index {event_index} is out of range, the last poll returned {}",
                    self.ready
                ))
            })
    }

    fn in_flight_len(&self) -> usize {
        self.endpoints
            .iter()
            .flatten()
            .flat_map(Endpoint::buffers)
            .filter(|buffer| buffer.state() == BufferState::InFlight)
            .count()
    }
}

impl Drop for Context<'_> {
    fn drop(&mut self) {
        let in_flight = self.in_flight_len();

        event!(
            Level::DEBUG,
            message = "releasing asynchronous I/O context",
            in_flight,
            pending = self.pending.len()
        );

        if self.aio.destroy().is_err() && in_flight > 0 {
            event!(
                Level::WARN,
                message = "leaking transfer buffers the kernel may still reference",
                in_flight
            );

            mem::forget(mem::take(&mut self.endpoints));
        }
    }
}

fn to_index(index: usize) -> Result<u32> {
    u32::try_from(index).map_err(|error| {
        Error::InvalidArgument(format!("index {index} does not fit in a slot key: {error}"))
    })
}
