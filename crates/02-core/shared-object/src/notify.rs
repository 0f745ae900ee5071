//! The change-notification broadcast channel, keyed by object id.
//!
//! A process-visible channel named `shared-object:<id>` receives one message
//! per successful publish; subscribers attach by id alone, without needing
//! the object's descriptor, so the channel table is a process-wide registry
//! rather than something carried on `SharedObjectInner`.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;

type Callback = Box<dyn Fn() + Send + Sync>;

#[derive(Default)]
struct Channel {
    next_id: u64,
    callbacks: HashMap<u64, Callback>,
}

fn channel_table() -> &'static Mutex<HashMap<String, Arc<Mutex<Channel>>>> {
    static TABLE: OnceLock<Mutex<HashMap<String, Arc<Mutex<Channel>>>>> = OnceLock::new();
    TABLE.get_or_init(|| Mutex::new(HashMap::new()))
}

fn channel_name(id: &str) -> String {
    format!("shared-object:{id}")
}

fn channel_for(id: &str) -> Arc<Mutex<Channel>> {
    channel_table()
        .lock()
        .entry(channel_name(id))
        .or_default()
        .clone()
}

/// Registers `cb` to run once per successful publish on `id`, returning a
/// token `unsubscribe` can later remove.
pub(crate) fn subscribe(id: &str, cb: Callback) -> u64 {
    let channel = channel_for(id);
    let mut channel = channel.lock();
    let sub_id = channel.next_id;
    channel.next_id += 1;
    channel.callbacks.insert(sub_id, cb);
    sub_id
}

pub(crate) fn unsubscribe(id: &str, sub_id: u64) {
    channel_for(id).lock().callbacks.remove(&sub_id);
}

/// Fans the notification out to every live subscriber on `id`.
pub(crate) fn broadcast(id: &str) {
    let channel = channel_for(id);
    let channel = channel.lock();
    for cb in channel.callbacks.values() {
        cb();
    }
}
