//! Memory allocation for the bus's data and control regions.
//!
//! Adapted from the transport layer's shared-region allocator: native
//! targets prefer an anonymous `mmap` (page aligned, already zeroed by the
//! kernel), falling back to an aligned heap allocation when that mapping
//! isn't available or isn't aligned as requested. Unlike that allocator,
//! every accessor here takes `&self`: the sequence-lock and ticket-lock
//! protocols are what make concurrent access to this memory sound, not
//! Rust's aliasing rules, so the unsafety is pushed down to the call sites
//! in `object.rs` that already reason about those protocols.

use std::alloc::{alloc_zeroed, dealloc, Layout};
use std::mem;
use std::ptr::NonNull;

use crate::error::RegionError;

#[cfg(not(target_arch = "wasm32"))]
type NativeMap = memmap2::MmapMut;

enum Backing {
    #[cfg(not(target_arch = "wasm32"))]
    Native(NativeMap),
    Owned { ptr: NonNull<u8>, layout: Layout },
}

impl Backing {
    fn as_ptr(&self) -> *const u8 {
        match self {
            #[cfg(not(target_arch = "wasm32"))]
            Backing::Native(map) => map.as_ptr(),
            Backing::Owned { ptr, .. } => ptr.as_ptr(),
        }
    }
}

/// A contiguous, aligned allocation shared across every thread attached to
/// a shared object.
pub struct SharedRegion {
    len: usize,
    backing: Backing,
}

// SAFETY: the contained pointer is never moved or freed while any thread
// holds a `SharedRegion`/`Arc<SharedRegion>`, and all mutation of the bytes
// it points to is externally serialized by the object's ticket lock; the
// control words are plain atomics. This mirrors the manual `Send`/`Sync`
// impls the transport crate's own tests apply to raw shared-memory rings.
unsafe impl Send for SharedRegion {}
unsafe impl Sync for SharedRegion {}

impl SharedRegion {
    /// Allocates a new, fully zeroed region of `len` bytes aligned to `alignment`.
    pub fn new_zeroed(len: usize, alignment: usize) -> Result<Self, RegionError> {
        let backing = allocate_backing(len, alignment)?;
        Ok(Self { len, backing })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn as_ptr(&self) -> *const u8 {
        self.backing.as_ptr()
    }

    /// Raw mutable pointer into the region.
    ///
    /// # Safety
    /// Callers must ensure writes through this pointer are externally
    /// serialized (the object's ticket lock) and stay within `len` bytes.
    pub unsafe fn as_mut_ptr(&self) -> *mut u8 {
        self.backing.as_ptr() as *mut u8
    }

    pub fn slice(&self, offset: usize, len: usize) -> &[u8] {
        assert_view_bounds(self.len, offset, len);
        // SAFETY: bounds checked above; the region owns `self.len` initialized bytes.
        unsafe { std::slice::from_raw_parts(self.as_ptr().add(offset), len) }
    }

    /// # Safety
    /// Caller must hold the object's write lock for the full lifetime of
    /// the returned slice, and the byte range must not overlap a range any
    /// other thread is concurrently writing.
    pub unsafe fn slice_mut(&self, offset: usize, len: usize) -> &mut [u8] {
        assert_view_bounds(self.len, offset, len);
        std::slice::from_raw_parts_mut(self.as_mut_ptr().add(offset), len)
    }

    /// Reinterprets the region's prefix as `&T`. `T` must be plain-old-data
    /// with no drop glue, and the caller's allocation size/alignment must
    /// already satisfy `T`'s requirements (checked below).
    pub(crate) fn prefix<T>(&self) -> &T {
        debug_assert!(
            !mem::needs_drop::<T>(),
            "control structures must be plain-old-data without drop glue"
        );
        assert!(mem::size_of::<T>() <= self.len, "region too small for prefix type");
        assert!(
            (self.as_ptr() as usize) % mem::align_of::<T>() == 0,
            "region base misaligned for prefix type"
        );
        // SAFETY: bounds and alignment checked above; `T` is POD and the
        // region was zero-initialized, so every bit pattern is valid.
        unsafe { &*(self.as_ptr() as *const T) }
    }
}

fn assert_view_bounds(region_len: usize, offset: usize, len: usize) {
    let end = offset.checked_add(len).expect("slice bounds overflow");
    assert!(end <= region_len, "slice of {end} bytes exceeds region length {region_len}");
}

fn allocate_backing(len: usize, alignment: usize) -> Result<Backing, RegionError> {
    if alignment == 0 || !alignment.is_power_of_two() {
        return Err(RegionError::AllocationFailed { size: len, alignment });
    }

    #[cfg(not(target_arch = "wasm32"))]
    {
        if let Some(backing) = mmap_backing(len, alignment)? {
            return Ok(backing);
        }
    }

    heap_backing(len, alignment)
}

fn heap_backing(len: usize, alignment: usize) -> Result<Backing, RegionError> {
    let layout = Layout::from_size_align(len, alignment)
        .map_err(|_| RegionError::AllocationFailed { size: len, alignment })?;

    // SAFETY: `alloc_zeroed` returns either a valid pointer for `layout` or
    // null on failure; we check for null immediately afterwards.
    let ptr = unsafe { alloc_zeroed(layout) };
    let ptr = NonNull::new(ptr).ok_or(RegionError::AllocationFailed { size: len, alignment })?;

    Ok(Backing::Owned { ptr, layout })
}

#[cfg(not(target_arch = "wasm32"))]
fn mmap_backing(len: usize, alignment: usize) -> Result<Option<Backing>, RegionError> {
    let map = memmap2::MmapOptions::new()
        .len(len.max(1))
        .map_anon()
        .map_err(|_| RegionError::AllocationFailed { size: len, alignment })?;

    if !(map.as_ptr() as usize).is_multiple_of(alignment) {
        return Ok(None);
    }

    // Anonymous mappings are zero-filled by the kernel; no explicit zeroing needed.
    Ok(Some(Backing::Native(map)))
}

impl Drop for SharedRegion {
    fn drop(&mut self) {
        if let Backing::Owned { ptr, layout } = &self.backing {
            // SAFETY: `ptr`/`layout` originate from `alloc_zeroed` in
            // `heap_backing` and are never exposed for deallocation elsewhere.
            unsafe {
                dealloc(ptr.as_ptr(), *layout);
            }
        }
    }
}
