//! Bootstrap messages exchanged between a host and an attached worker.

use serde::{Deserialize, Serialize};
use shared_object::Descriptor;

/// The handshake protocol carried over a [`peer_adapter::PeerEndpoint`].
///
/// `A` is the application-defined setup payload a host hands its worker on
/// attach; this crate never inspects it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum BootstrapMessage<A> {
    /// Sent by the host once, immediately on attach: every object registered
    /// so far, plus whatever setup data the caller attached the worker with.
    Init {
        descriptors: Vec<(String, Descriptor)>,
        setup_data: A,
    },
    /// Sent by the worker once, in reply to `Init`, identifying the thread
    /// that will hold this worker's shared-object write locks.
    Ready { thread_id: i32 },
    /// Sent by the host every time a new shared object is registered after
    /// a worker has attached.
    SharedObjectCreated { id: String, descriptor: Descriptor },
}
