//! Process-wide thread identity used for write-lock ownership and reentrance checks.

use std::cell::Cell;
use std::sync::atomic::{AtomicI32, Ordering};

static NEXT_THREAD_ID: AtomicI32 = AtomicI32::new(0);

thread_local! {
    static THREAD_ID: Cell<i32> = const { Cell::new(-1) };
}

/// Returns a small, process-wide unique, non-negative id for the calling
/// thread, allocated lazily on first use and cached for the thread's lifetime.
pub fn current_thread_id() -> i32 {
    THREAD_ID.with(|cell| {
        let cached = cell.get();
        if cached >= 0 {
            return cached;
        }
        let id = NEXT_THREAD_ID.fetch_add(1, Ordering::Relaxed);
        cell.set(id);
        id
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::{Arc, Mutex};
    use std::thread;

    #[test]
    fn ids_are_stable_per_thread_and_unique_across_threads() {
        let a = current_thread_id();
        let b = current_thread_id();
        assert_eq!(a, b);

        let seen = Arc::new(Mutex::new(HashSet::new()));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let seen = Arc::clone(&seen);
                thread::spawn(move || {
                    let id = current_thread_id();
                    seen.lock().unwrap().insert(id);
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(seen.lock().unwrap().len(), 8);
    }
}
