//! Errors raised by the host's registry bookkeeping, independent of the
//! lock/poison errors `shared_object` and `typed_object` already define.

/// A name or id collided with something already registered on this host.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RuntimeError {
    #[error("a worker named {0:?} is already attached")]
    DuplicateName(String),
    #[error("a shared object with id {0:?} is already registered")]
    DuplicateId(String),
}

/// Errors surfaced by `Host::attach_worker`.
#[derive(Debug, thiserror::Error)]
pub enum AttachError {
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
    #[error(transparent)]
    Handshake(#[from] peer_adapter::HandshakeError),
}

/// Errors surfaced by `Host::create_shared_object`.
#[derive(Debug, thiserror::Error)]
pub enum CreateSharedObjectError {
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
    #[error(transparent)]
    Create(#[from] shared_object::CreateError),
}

/// Errors surfaced by `Host::create_typed_object`.
#[derive(Debug, thiserror::Error)]
pub enum CreateTypedObjectError {
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
    #[error(transparent)]
    Create(#[from] typed_object::TypedCreateError),
}
