//! Atomic park/wake shims backing the ticket lock's wait-for-turn loop.
//!
//! Native targets rely on the `atomic-wait` crate (futex-backed where
//! available), which blocks with no timeout and relies entirely on a
//! matching wake. Loom tests stub this out since loom's deterministic
//! scheduler has no real blocking primitive to exercise. `poll_interval` is
//! threaded through for implementations without a true futex wait; it is
//! unused by the native path here but keeps the fallback documented as a
//! tunable rather than a hidden constant.

use std::sync::atomic::AtomicI32;
use std::time::Duration;

/// Default fallback poll interval for platforms without a true atomic wait.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

#[cfg(feature = "loom")]
mod imp {
    use super::*;

    pub(crate) fn park(_atomic: &AtomicI32, _expected: i32, _poll_interval: Duration) {
        loom::thread::yield_now();
    }

    pub(crate) fn wake_one(_atomic: &AtomicI32) {}

    pub(crate) fn wake_all(_atomic: &AtomicI32) {}
}

#[cfg(not(feature = "loom"))]
mod imp {
    use super::*;
    use std::sync::atomic::AtomicU32;

    fn as_u32(atomic: &AtomicI32) -> &AtomicU32 {
        // SAFETY: `AtomicI32` and `AtomicU32` share size, alignment, and bit
        // representation; only the sign interpretation of the stored value
        // differs, and `atomic-wait` only compares bit patterns.
        unsafe { &*(atomic as *const AtomicI32 as *const AtomicU32) }
    }

    pub(crate) fn park(atomic: &AtomicI32, expected: i32, _poll_interval: Duration) {
        atomic_wait::wait(as_u32(atomic), expected as u32);
    }

    pub(crate) fn wake_one(atomic: &AtomicI32) {
        atomic_wait::wake_one(as_u32(atomic) as *const AtomicU32);
    }

    pub(crate) fn wake_all(atomic: &AtomicI32) {
        atomic_wait::wake_all(as_u32(atomic) as *const AtomicU32);
    }
}

/// Blocks the caller while `atomic` still holds `expected`, returning on any
/// matching `wake_one`/`wake_all` (including spurious wakeups — callers must
/// re-check their own condition in a loop).
pub fn park(atomic: &AtomicI32, expected: i32, poll_interval: Duration) {
    imp::park(atomic, expected, poll_interval)
}

/// Wakes at most one waiter parked on `atomic`.
pub fn wake_one(atomic: &AtomicI32) {
    imp::wake_one(atomic)
}

/// Wakes every waiter parked on `atomic`.
pub fn wake_all(atomic: &AtomicI32) {
    imp::wake_all(atomic)
}
