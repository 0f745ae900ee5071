//! The fixed 7-word control region shared by every thread attached to an object.

use std::sync::atomic::AtomicI32;

/// Field order is part of the wire contract: two attachments to the same
/// control region interoperate only if they agree on this exact layout, so
/// this struct intentionally carries no padding, magic number, or version
/// word beyond the seven words it documents.
#[repr(C)]
pub(crate) struct ControlBlock {
    pub published_slot: AtomicI32,
    pub seq: AtomicI32,
    pub next_ticket: AtomicI32,
    pub serving_ticket: AtomicI32,
    pub write_owner_thread_id: AtomicI32,
    pub write_reentrance_depth: AtomicI32,
    pub fatal_writer_died: AtomicI32,
}

const _: () = assert!(std::mem::size_of::<ControlBlock>() == 7 * 4);

pub(crate) const NO_OWNER: i32 = -1;
pub(crate) const NO_PUBLISHED_SLOT: i32 = -1;
