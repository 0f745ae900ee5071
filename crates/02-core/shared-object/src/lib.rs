//! Shared-memory object core: a triple-buffered slot ring with sequence-locked
//! reads and a ticket-locked writer, plus the plumbing (regions, descriptors,
//! change notification) needed to attach to the same object from more than
//! one thread.

mod control;
mod descriptor;
mod error;
mod notify;
mod object;
mod region;
mod thread_id;
mod wait;

pub use descriptor::{Descriptor, RegionHandle};
pub use error::{CreateError, RegionError, RequestWriteError, WriteError};
pub use object::{ReadView, SharedObject, Subscription, WaitOptions, SLOT_COUNT};
pub use thread_id::current_thread_id;
