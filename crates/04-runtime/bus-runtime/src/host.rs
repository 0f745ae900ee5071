//! The host side of the bootstrap protocol: owns the object registry and
//! fans out descriptors to every worker it attaches.

use std::collections::HashMap;
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use peer_adapter::PeerEndpoint;
use schema_layout::Schema;
use shared_object::SharedObject;
use typed_object::TypedObject;

use crate::error::{AttachError, CreateSharedObjectError, CreateTypedObjectError, RuntimeError};
use crate::message::BootstrapMessage;
use crate::registry::{create_raw, create_typed, RegisteredObject};

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// Coordinates a set of attached workers and the shared objects they see.
pub struct Host<A> {
    objects: Mutex<HashMap<String, RegisteredObject>>,
    peers: Mutex<HashMap<String, Arc<dyn PeerEndpoint<BootstrapMessage<A>>>>>,
    peer_thread_ids: Mutex<HashMap<String, i32>>,
}

impl<A> Default for Host<A> {
    fn default() -> Self {
        Self {
            objects: Mutex::new(HashMap::new()),
            peers: Mutex::new(HashMap::new()),
            peer_thread_ids: Mutex::new(HashMap::new()),
        }
    }
}

/// Creates a fresh host with an empty object registry and no attached workers.
pub fn host<A>() -> Host<A> {
    Host::default()
}

impl<A: Clone + Send + 'static> Host<A> {
    /// Sends the current object registry to `endpoint` as `Init`, blocking
    /// until the worker on the other end replies `Ready`. On success, the
    /// endpoint is kept so future `create_shared_object`/`create_typed_object`
    /// calls announce themselves to it too. Fails if `name` is already
    /// attached.
    pub fn attach_worker(
        &self,
        name: impl Into<String>,
        endpoint: impl PeerEndpoint<BootstrapMessage<A>> + 'static,
        setup_data: A,
    ) -> Result<(), AttachError> {
        let name = name.into();
        if self.peers.lock().contains_key(&name) {
            tracing::warn!("attach_worker rejected: {name:?} is already attached");
            return Err(RuntimeError::DuplicateName(name).into());
        }

        let descriptors = self
            .objects
            .lock()
            .iter()
            .map(|(id, object)| (id.clone(), object.descriptor()))
            .collect();

        let (tx, rx) = mpsc::channel();
        let stop_listening = endpoint.on_message(Box::new(move |msg| {
            if let BootstrapMessage::Ready { thread_id } = msg {
                let _ = tx.send(thread_id);
            }
        }));
        endpoint.post(BootstrapMessage::Init {
            descriptors,
            setup_data,
        });

        let thread_id = rx
            .recv_timeout(HANDSHAKE_TIMEOUT)
            .map_err(|_| peer_adapter::HandshakeError::TimedOut("ready"))?;
        stop_listening();

        let mut peers = self.peers.lock();
        if peers.contains_key(&name) {
            return Err(RuntimeError::DuplicateName(name).into());
        }
        self.peer_thread_ids.lock().insert(name.clone(), thread_id);
        peers.insert(name.clone(), Arc::new(endpoint));
        tracing::debug!("worker {name:?} attached with thread id {thread_id}");
        Ok(())
    }

    /// Registers a new raw shared object and announces its descriptor to
    /// every currently attached worker. Fails if `id` is already registered.
    pub fn create_shared_object(
        &self,
        id: impl Into<String>,
        byte_length: usize,
    ) -> Result<SharedObject, CreateSharedObjectError> {
        let id = id.into();
        if self.objects.lock().contains_key(&id) {
            tracing::warn!("create_shared_object rejected: {id:?} is already registered");
            return Err(RuntimeError::DuplicateId(id).into());
        }
        let (handle, registered) = create_raw(id.clone(), byte_length)?;
        self.register_and_announce(id, registered, &handle.descriptor())?;
        Ok(handle)
    }

    /// Registers a new schema-typed shared object and announces it. Fails
    /// if `id` is already registered.
    pub fn create_typed_object(
        &self,
        id: impl Into<String>,
        schema: &Schema,
    ) -> Result<TypedObject, CreateTypedObjectError> {
        let id = id.into();
        if self.objects.lock().contains_key(&id) {
            tracing::warn!("create_typed_object rejected: {id:?} is already registered");
            return Err(RuntimeError::DuplicateId(id).into());
        }
        let (handle, registered) = create_typed(id.clone(), schema)?;
        self.register_and_announce(id, registered, &handle.descriptor())?;
        Ok(handle)
    }

    fn register_and_announce(
        &self,
        id: String,
        registered: RegisteredObject,
        descriptor: &shared_object::Descriptor,
    ) -> Result<(), RuntimeError> {
        {
            let mut objects = self.objects.lock();
            if objects.contains_key(&id) {
                return Err(RuntimeError::DuplicateId(id));
            }
            objects.insert(id.clone(), registered);
        }
        for endpoint in self.peers.lock().values() {
            endpoint.post(BootstrapMessage::SharedObjectCreated {
                id: id.clone(),
                descriptor: descriptor.clone(),
            });
        }
        tracing::debug!("registered shared object {id:?} and announced it to attached workers");
        Ok(())
    }

    /// Poisons every shared object whose write lock is held by the thread
    /// that was attached under `name`. A no-op for a name that was never
    /// attached, or whose worker thread never took a write lock.
    pub fn mark_peer_died(&self, name: &str) {
        let Some(thread_id) = self.peer_thread_ids.lock().get(name).copied() else {
            tracing::warn!("mark_peer_died called for {name:?}, which was never attached");
            return;
        };
        tracing::warn!("poisoning every object still held by dead worker {name:?} (thread {thread_id})");
        for object in self.objects.lock().values() {
            object.mark_writer_thread_died(thread_id);
        }
    }
}
