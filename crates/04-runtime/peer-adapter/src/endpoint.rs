//! A uniform duplex endpoint abstraction over a native-thread message channel.
//!
//! Three endpoint styles are expected of callers: the auto-detected endpoint
//! handed to a worker closure spawned by [`spawn_worker`] (its "parent"),
//! an explicit [`pair`] constructed ahead of time and threaded through by
//! hand, and any caller-supplied type implementing [`PeerEndpoint`] (for
//! tests, or for a transport this crate doesn't know about).

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;

pub type Listener<M> = Box<dyn Fn(M) + Send + Sync>;
pub type Unsubscribe = Box<dyn FnOnce() + Send>;

/// A duplex message endpoint: post a message out, and register listeners to
/// receive whatever the other side posts.
pub trait PeerEndpoint<M>: Send + Sync {
    fn post(&self, message: M);
    fn on_message(&self, listener: Listener<M>) -> Unsubscribe;
}

struct Listeners<M> {
    next_id: u64,
    by_id: HashMap<u64, Listener<M>>,
    // Every message ever posted, replayed to a listener as soon as it
    // subscribes. Without this a listener registered a moment too late
    // after the other side's `post` would simply miss it — there is no
    // reliable way for two independently scheduled threads to line up
    // `post`/`on_message` exactly, and the handshake messages this crate
    // exists for are few enough that keeping all of them is cheap.
    history: Vec<M>,
}

impl<M> Default for Listeners<M> {
    fn default() -> Self {
        Self {
            next_id: 0,
            by_id: HashMap::new(),
            history: Vec::new(),
        }
    }
}

/// A [`PeerEndpoint`] backed by a pair of `crossbeam_channel` queues, with a
/// background thread fanning inbound messages out to registered listeners.
pub struct ChannelEndpoint<M> {
    sender: Sender<M>,
    listeners: Arc<Mutex<Listeners<M>>>,
    // Kept alive so the dispatch thread is joined when the last clone of
    // this endpoint (and thus the inbound sender half it depends on) drops.
    _dispatcher: Arc<JoinHandle<()>>,
}

impl<M> Clone for ChannelEndpoint<M> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            listeners: Arc::clone(&self.listeners),
            _dispatcher: Arc::clone(&self._dispatcher),
        }
    }
}

impl<M: Clone + Send + 'static> ChannelEndpoint<M> {
    fn new(sender: Sender<M>, receiver: Receiver<M>) -> Self {
        let listeners: Arc<Mutex<Listeners<M>>> = Arc::new(Mutex::new(Listeners::default()));
        let dispatch_listeners = Arc::clone(&listeners);
        let dispatcher = std::thread::spawn(move || {
            for message in receiver.iter() {
                let mut listeners = dispatch_listeners.lock();
                for listener in listeners.by_id.values() {
                    listener(message.clone());
                }
                listeners.history.push(message);
            }
        });
        Self {
            sender,
            listeners,
            _dispatcher: Arc::new(dispatcher),
        }
    }
}

impl<M: Clone + Send + 'static> PeerEndpoint<M> for ChannelEndpoint<M> {
    fn post(&self, message: M) {
        if self.sender.send(message).is_err() {
            tracing::debug!("post on a disconnected peer endpoint dropped");
        }
    }

    fn on_message(&self, listener: Listener<M>) -> Unsubscribe {
        let mut guard = self.listeners.lock();
        for past in &guard.history {
            listener(past.clone());
        }
        let id = guard.next_id;
        guard.next_id += 1;
        guard.by_id.insert(id, listener);
        drop(guard);

        let listeners = Arc::clone(&self.listeners);
        Box::new(move || {
            listeners.lock().by_id.remove(&id);
        })
    }
}

/// Builds two endpoints wired to each other: posting on one delivers to the
/// other's listeners, and vice versa.
pub fn pair<M: Clone + Send + 'static>() -> (ChannelEndpoint<M>, ChannelEndpoint<M>) {
    let (tx_to_b, rx_for_b) = unbounded();
    let (tx_to_a, rx_for_a) = unbounded();
    let a = ChannelEndpoint::new(tx_to_b, rx_for_a);
    let b = ChannelEndpoint::new(tx_to_a, rx_for_b);
    (a, b)
}

/// Spawns `body` on a new OS thread, handing it the worker-side endpoint of
/// a freshly wired pair; returns the host-side endpoint, which is the
/// "auto-detected parent" the worker's own endpoint is paired against.
pub fn spawn_worker<M, F>(body: F) -> (ChannelEndpoint<M>, JoinHandle<()>)
where
    M: Clone + Send + 'static,
    F: FnOnce(ChannelEndpoint<M>) + Send + 'static,
{
    let (host, worker) = pair();
    let handle = std::thread::spawn(move || body(worker));
    (host, handle)
}
