//! The core shared object: a triple-buffered slot ring guarded by a
//! sequence lock on the read side and a ticket lock on the write side.

use std::mem::size_of;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use crate::control::{ControlBlock, NO_OWNER, NO_PUBLISHED_SLOT};
use crate::descriptor::{Descriptor, RegionHandle};
use crate::error::{CreateError, RequestWriteError, WriteError};
use crate::notify;
use crate::region::SharedRegion;
use crate::thread_id::current_thread_id;
use crate::wait;

/// Number of slots in the ring. Fixed at three: the minimum that lets a
/// reader safely finish a retry-detected read of one slot while the writer
/// advances through the other two.
pub const SLOT_COUNT: usize = 3;

/// Tuning knobs for the write-lock wait loop.
#[derive(Debug, Clone, Copy)]
pub struct WaitOptions {
    pub poll_interval: Duration,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            poll_interval: wait::DEFAULT_POLL_INTERVAL,
        }
    }
}

/// A snapshot read out of the ring: the published bytes and the sequence
/// number they were read under, useful for callers that want to detect
/// whether two reads observed the same publish.
#[derive(Debug, Clone)]
pub struct ReadView {
    pub bytes: Vec<u8>,
    pub seq: i32,
}

/// A live subscription to an object's publish notifications. Dropping this
/// without calling `unsubscribe` leaves the callback registered forever;
/// callers that need the subscription to end should call it explicitly.
pub struct Subscription {
    id: String,
    sub_id: u64,
}

impl Subscription {
    pub fn unsubscribe(self) {
        notify::unsubscribe(&self.id, self.sub_id);
    }
}

struct Inner {
    id: String,
    byte_length: usize,
    data_region: Arc<SharedRegion>,
    control_region: Arc<SharedRegion>,
    wait_options: WaitOptions,
}

impl Inner {
    fn control(&self) -> &ControlBlock {
        self.control_region.prefix::<ControlBlock>()
    }

    fn slot_offset(&self, slot: i32) -> usize {
        slot as usize * self.byte_length
    }
}

/// A handle to a shared object. Cheap to clone; every clone refers to the
/// same underlying regions.
#[derive(Clone)]
pub struct SharedObject {
    inner: Arc<Inner>,
}

impl SharedObject {
    pub fn create(id: impl Into<String>, byte_length: usize) -> Result<Self, CreateError> {
        Self::create_with_options(id, byte_length, WaitOptions::default())
    }

    pub fn create_with_options(
        id: impl Into<String>,
        byte_length: usize,
        wait_options: WaitOptions,
    ) -> Result<Self, CreateError> {
        if byte_length == 0 {
            return Err(CreateError::InvalidByteLength(byte_length as i64));
        }

        let data_region = SharedRegion::new_zeroed(byte_length * SLOT_COUNT, 8)?;
        let control_region =
            SharedRegion::new_zeroed(size_of::<ControlBlock>(), std::mem::align_of::<ControlBlock>())?;
        control_region.prefix::<ControlBlock>().published_slot.store(NO_PUBLISHED_SLOT, Ordering::Relaxed);
        control_region.prefix::<ControlBlock>().write_owner_thread_id.store(NO_OWNER, Ordering::Relaxed);

        Ok(Self {
            inner: Arc::new(Inner {
                id: id.into(),
                byte_length,
                data_region: Arc::new(data_region),
                control_region: Arc::new(control_region),
                wait_options,
            }),
        })
    }

    pub fn from_descriptor(descriptor: &Descriptor) -> Self {
        Self::from_descriptor_with_options(descriptor, WaitOptions::default())
    }

    pub fn from_descriptor_with_options(descriptor: &Descriptor, wait_options: WaitOptions) -> Self {
        Self {
            inner: Arc::new(Inner {
                id: descriptor.id.clone(),
                byte_length: descriptor.byte_length,
                data_region: descriptor.data_region.resolve(),
                control_region: descriptor.control_region.resolve(),
                wait_options,
            }),
        }
    }

    /// Registers this object's regions so a peer can attach via `from_descriptor`.
    pub fn descriptor(&self) -> Descriptor {
        Descriptor {
            id: self.inner.id.clone(),
            byte_length: self.inner.byte_length,
            slot_count: SLOT_COUNT,
            data_region: RegionHandle::register(Arc::clone(&self.inner.data_region)),
            control_region: RegionHandle::register(Arc::clone(&self.inner.control_region)),
        }
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn byte_length(&self) -> usize {
        self.inner.byte_length
    }

    /// Runs `write` against an exclusive, mutable view of the next free
    /// slot, then publishes it. Rejects reentrant calls from a thread that
    /// already holds the lock, and permanently rejects every caller once
    /// the object has been poisoned by a writer death.
    pub fn request_write<T, E>(
        &self,
        write: impl FnOnce(&mut [u8]) -> Result<T, E>,
    ) -> Result<T, RequestWriteError<E>> {
        let control = self.inner.control();
        let this_thread = current_thread_id();

        if control.fatal_writer_died.load(Ordering::Acquire) != 0 {
            return Err(RequestWriteError::Lock(WriteError::Poisoned));
        }
        if control.write_owner_thread_id.load(Ordering::Acquire) == this_thread {
            return Err(RequestWriteError::Lock(WriteError::ReentrantWrite));
        }

        let ticket = control.next_ticket.fetch_add(1, Ordering::AcqRel);
        loop {
            if control.fatal_writer_died.load(Ordering::Acquire) != 0 {
                return Err(RequestWriteError::Lock(WriteError::Poisoned));
            }
            let serving = control.serving_ticket.load(Ordering::Acquire);
            if serving == ticket {
                break;
            }
            wait::park(&control.serving_ticket, serving, self.inner.wait_options.poll_interval);
        }

        control.write_owner_thread_id.store(this_thread, Ordering::Release);
        control.write_reentrance_depth.store(1, Ordering::Relaxed);

        let result = self.run_write(write);

        control.write_reentrance_depth.store(0, Ordering::Relaxed);
        control.write_owner_thread_id.store(NO_OWNER, Ordering::Release);
        control.serving_ticket.fetch_add(1, Ordering::AcqRel);
        wait::wake_all(&control.serving_ticket);

        let outcome = result?;
        notify::broadcast(&self.inner.id);
        Ok(outcome)
    }

    fn run_write<T, E>(
        &self,
        write: impl FnOnce(&mut [u8]) -> Result<T, E>,
    ) -> Result<T, RequestWriteError<E>> {
        let control = self.inner.control();
        let published = control.published_slot.load(Ordering::Acquire);
        let seq = control.seq.load(Ordering::Acquire);
        let next_seq = seq.wrapping_add(1);
        let target_slot = next_seq % SLOT_COUNT as i32;

        if published != NO_PUBLISHED_SLOT {
            // Seed the target slot with the previously published bytes so a
            // write that only names a subset of fields (`TypedObject::write`
            // via `write_fields`) leaves the rest exactly as they were,
            // rather than whatever this slot last held three publishes ago.
            let previous = self
                .inner
                .data_region
                .slice(self.inner.slot_offset(published), self.inner.byte_length)
                .to_vec();
            // SAFETY: the ticket lock guarantees exclusive access to the
            // whole data region for the caller holding the ticket; no
            // reader ever observes `target_slot` as published until the
            // store below, so seeding it here is race-free.
            let target = unsafe {
                self.inner
                    .data_region
                    .slice_mut(self.inner.slot_offset(target_slot), self.inner.byte_length)
            };
            target.copy_from_slice(&previous);
        }

        // SAFETY: the ticket lock guarantees exclusive access to the whole
        // data region for the caller holding the ticket; the slice handed to
        // `write` covers exactly this publish's target slot.
        let slice = unsafe {
            self.inner
                .data_region
                .slice_mut(self.inner.slot_offset(target_slot), self.inner.byte_length)
        };
        let outcome = write(slice).map_err(RequestWriteError::Callback)?;

        if control.fatal_writer_died.load(Ordering::Acquire) != 0 {
            return Err(RequestWriteError::Lock(WriteError::Poisoned));
        }

        control.published_slot.store(target_slot, Ordering::Release);
        control.seq.store(next_seq, Ordering::Release);

        Ok(outcome)
    }

    /// Reads the most recently published slot, retrying up to four times if
    /// a concurrent publish is detected mid-read. Returns `None` if nothing
    /// has ever been published, or if every retry raced a publish.
    pub fn read_latest(&self) -> Option<ReadView> {
        let control = self.inner.control();
        const MAX_ATTEMPTS: u32 = 5;

        for _ in 0..MAX_ATTEMPTS {
            let seq_before = control.seq.load(Ordering::Acquire);
            let slot = control.published_slot.load(Ordering::Acquire);
            if slot == NO_PUBLISHED_SLOT {
                return None;
            }

            let bytes = self
                .inner
                .data_region
                .slice(self.inner.slot_offset(slot), self.inner.byte_length)
                .to_vec();

            let seq_after = control.seq.load(Ordering::Acquire);
            if seq_before == seq_after {
                return Some(ReadView { bytes, seq: seq_before });
            }
        }
        None
    }

    /// Permanently poisons the object if `thread_id` is the thread currently
    /// holding the write lock. Idempotent: a second call for the same
    /// thread (or any thread, once already poisoned) is a no-op.
    pub fn mark_writer_thread_died(&self, thread_id: i32) {
        let control = self.inner.control();
        if control.write_owner_thread_id.load(Ordering::Acquire) != thread_id {
            return;
        }
        if control
            .fatal_writer_died
            .compare_exchange(0, 1, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            tracing::warn!("writer thread {thread_id} died mid-write, poisoning object");
            control.serving_ticket.fetch_add(1, Ordering::AcqRel);
            wait::wake_all(&control.serving_ticket);
        }
    }

    pub fn is_poisoned(&self) -> bool {
        self.inner.control().fatal_writer_died.load(Ordering::Acquire) != 0
    }

    /// Registers `cb` to run once per successful publish. Returns a token
    /// that can later remove it via `Subscription::unsubscribe`.
    pub fn subscribe(&self, cb: impl Fn() + Send + Sync + 'static) -> Subscription {
        let sub_id = notify::subscribe(&self.inner.id, Box::new(cb));
        Subscription {
            id: self.inner.id.clone(),
            sub_id,
        }
    }
}
