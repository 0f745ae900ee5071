//! Error handling for the shared-object core.

/// Errors surfaced by the underlying region allocator.
#[derive(Debug, thiserror::Error)]
pub enum RegionError {
    #[error("failed to allocate shared region of {size} bytes aligned to {alignment}")]
    AllocationFailed { size: usize, alignment: usize },
}

/// Errors surfaced by `SharedObject::create`.
#[derive(Debug, thiserror::Error)]
pub enum CreateError {
    #[error("byte_length must be positive, got {0}")]
    InvalidByteLength(i64),
    #[error(transparent)]
    Region(#[from] RegionError),
}

/// Errors surfaced by `request_write` that originate in the lock/poison
/// protocol itself, as opposed to the caller's write callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum WriteError {
    /// The calling thread already holds this object's write lock.
    ///
    /// Rejected rather than supported: see the reentrance stance recorded
    /// in the design notes.
    #[error("this thread already holds the write lock for this object")]
    ReentrantWrite,
    /// The object's writer thread died while holding the lock; it is
    /// permanently unusable for writes from now on.
    #[error("object is permanently poisoned: its writer thread died mid-write")]
    Poisoned,
}

/// Errors surfaced by `request_write`: either the lock/poison protocol
/// rejected the attempt, or the caller's own callback returned an error.
#[derive(Debug)]
pub enum RequestWriteError<E> {
    Lock(WriteError),
    Callback(E),
}

impl<E: std::fmt::Display> std::fmt::Display for RequestWriteError<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestWriteError::Lock(err) => write!(f, "{err}"),
            RequestWriteError::Callback(err) => write!(f, "{err}"),
        }
    }
}

impl<E: std::fmt::Debug + std::fmt::Display> std::error::Error for RequestWriteError<E> {}
