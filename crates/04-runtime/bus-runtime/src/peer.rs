//! The worker side of the bootstrap protocol.

use std::collections::HashMap;
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use peer_adapter::{HandshakeError, PeerEndpoint};
use schema_layout::{Schema, SchemaError};
use shared_object::{current_thread_id, Descriptor, SharedObject};
use typed_object::TypedObject;

use crate::message::BootstrapMessage;

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// A worker's view of the bus after completing the handshake: the setup
/// data its host attached it with, and a live, continuously updated table
/// of every shared object descriptor the host has announced.
pub struct Peer<A> {
    setup_data: A,
    descriptors: Arc<Mutex<HashMap<String, Descriptor>>>,
    _endpoint: Arc<dyn PeerEndpoint<BootstrapMessage<A>>>,
}

/// Completes the handshake on `endpoint`: waits for the host's `Init`,
/// replies `Ready` with the calling thread's id, and returns a [`Peer`]
/// that keeps tracking `SharedObjectCreated` announcements for its whole
/// lifetime.
pub fn worker<A: Clone + Send + 'static>(
    endpoint: impl PeerEndpoint<BootstrapMessage<A>> + 'static,
) -> Result<Peer<A>, HandshakeError> {
    let endpoint: Arc<dyn PeerEndpoint<BootstrapMessage<A>>> = Arc::new(endpoint);
    let descriptors: Arc<Mutex<HashMap<String, Descriptor>>> = Arc::new(Mutex::new(HashMap::new()));

    let (tx, rx) = mpsc::channel();
    {
        let descriptors = Arc::clone(&descriptors);
        endpoint.on_message(Box::new(move |msg| match msg {
            BootstrapMessage::Init {
                descriptors: initial,
                setup_data,
            } => {
                descriptors.lock().extend(initial);
                let _ = tx.send(setup_data);
            }
            BootstrapMessage::SharedObjectCreated { id, descriptor } => {
                descriptors.lock().insert(id, descriptor);
            }
            BootstrapMessage::Ready { .. } => {}
        }));
    }

    let setup_data = rx
        .recv_timeout(HANDSHAKE_TIMEOUT)
        .map_err(|_| HandshakeError::TimedOut("init"))?;
    endpoint.post(BootstrapMessage::Ready {
        thread_id: current_thread_id(),
    });

    Ok(Peer {
        setup_data,
        descriptors,
        _endpoint: endpoint,
    })
}

impl<A> Peer<A> {
    /// The setup data the host attached this worker with.
    pub fn worker_setup_data(&self) -> &A {
        &self.setup_data
    }

    /// Attaches to a raw shared object the host has announced, if any.
    pub fn open_shared_object(&self, id: &str) -> Option<SharedObject> {
        self.descriptors
            .lock()
            .get(id)
            .map(SharedObject::from_descriptor)
    }

    /// Attaches to a schema-typed shared object the host has announced, if any.
    pub fn open_typed_object(&self, id: &str, schema: &Schema) -> Option<Result<TypedObject, SchemaError>> {
        self.descriptors
            .lock()
            .get(id)
            .map(|descriptor| TypedObject::from_descriptor(descriptor, schema))
    }
}
