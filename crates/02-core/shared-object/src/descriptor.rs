//! Transportable descriptors letting a peer attach to an existing shared object.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::region::SharedRegion;

static NEXT_REGION_ID: AtomicU64 = AtomicU64::new(1);

fn region_table() -> &'static Mutex<HashMap<u64, Arc<SharedRegion>>> {
    static TABLE: OnceLock<Mutex<HashMap<u64, Arc<SharedRegion>>>> = OnceLock::new();
    TABLE.get_or_init(|| Mutex::new(HashMap::new()))
}

/// An opaque reference to a shared memory region.
///
/// In this single-process implementation, resolving a handle is a registry
/// lookup that hands back the very same `Arc<SharedRegion>` the creator
/// holds. A cross-process transport would instead carry an OS-level handle
/// here (a file descriptor, a `HANDLE`, a transferable `SharedArrayBuffer`);
/// the rest of this crate never needs to know which, since it only ever
/// goes through `register`/`resolve`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RegionHandle(u64);

impl RegionHandle {
    pub(crate) fn register(region: Arc<SharedRegion>) -> Self {
        let id = NEXT_REGION_ID.fetch_add(1, Ordering::Relaxed);
        region_table().lock().insert(id, region);
        Self(id)
    }

    pub(crate) fn resolve(&self) -> Arc<SharedRegion> {
        region_table()
            .lock()
            .get(&self.0)
            .cloned()
            .expect("region handle resolved after its region was dropped from the registry")
    }
}

/// Metadata that lets a peer attach to an existing shared object: its id,
/// sizes, and opaque handles to its two shared regions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Descriptor {
    pub id: String,
    pub byte_length: usize,
    pub slot_count: usize,
    pub data_region: RegionHandle,
    pub control_region: RegionHandle,
}
