//! Host/worker bootstrap runtime built on [`shared_object`] and
//! [`peer_adapter`]: a host owns the object registry and announces it to
//! every worker it attaches; a worker hydrates a local table of
//! descriptors and can attach to any object the host has created.

mod error;
mod host;
mod message;
mod peer;
mod registry;

pub use error::{AttachError, CreateSharedObjectError, CreateTypedObjectError, RuntimeError};
pub use host::{host, Host};
pub use message::BootstrapMessage;
pub use peer::{worker, Peer};

#[cfg(test)]
mod tests {
    use super::*;
    use schema_layout::{FieldKind, Numeric, Schema, Value, ValueMap};
    use std::time::Duration;

    #[derive(Clone, Debug, PartialEq, Eq)]
    struct Setup {
        name: String,
    }

    #[test]
    fn attach_worker_hands_existing_objects_and_replies_ready() {
        let host: Host<Setup> = host();
        host.create_shared_object("pre-existing", 4).unwrap();

        let (worker_endpoint, join) = peer_adapter::spawn_worker::<BootstrapMessage<Setup>, _>(move |endpoint| {
            let peer = worker(endpoint).unwrap();
            assert_eq!(peer.worker_setup_data().name, "alpha");
            assert!(peer.open_shared_object("pre-existing").is_some());
        });

        host.attach_worker("alpha-worker", worker_endpoint, Setup { name: "alpha".to_string() })
            .unwrap();
        join.join().unwrap();
    }

    #[test]
    fn objects_created_after_attach_are_announced_to_the_worker() {
        let host: Host<Setup> = host();
        let schema = Schema::new().field("count", FieldKind::Scalar(Numeric::I32));

        let (worker_endpoint, join) = peer_adapter::spawn_worker::<BootstrapMessage<Setup>, _>({
            let schema = schema.clone();
            move |endpoint| {
                let peer = worker(endpoint).unwrap();
                for _ in 0..200 {
                    if peer.open_typed_object("late", &schema).is_some() {
                        break;
                    }
                    std::thread::sleep(std::time::Duration::from_millis(5));
                }
                let object = peer
                    .open_typed_object("late", &schema)
                    .expect("host should have announced the object")
                    .unwrap();
                for _ in 0..200 {
                    if object.read().is_some() {
                        break;
                    }
                    std::thread::sleep(std::time::Duration::from_millis(5));
                }
                let view = object.read().unwrap();
                assert_eq!(view.values.get("count"), Some(&Value::I32(77)));
            }
        });

        host.attach_worker("beta-worker", worker_endpoint, Setup { name: "beta".to_string() })
            .unwrap();
        let object = host.create_typed_object("late", &schema).unwrap();
        object
            .write(&ValueMap::new().insert("count", Value::I32(77)))
            .unwrap();

        join.join().unwrap();
    }

    #[test]
    fn mark_peer_died_poisons_only_objects_that_peer_was_writing() {
        let host: Host<Setup> = host();
        let object = host.create_shared_object("owned-by-dead-peer", 4).unwrap();
        let (mid_write_tx, mid_write_rx) = std::sync::mpsc::channel();

        let (worker_endpoint, join) = peer_adapter::spawn_worker::<BootstrapMessage<Setup>, _>(move |endpoint| {
            let peer = worker(endpoint).unwrap();
            let handle = peer.open_shared_object("owned-by-dead-peer").unwrap();
            handle
                .request_write::<_, std::convert::Infallible>(move |_bytes| {
                    mid_write_tx.send(()).unwrap();
                    std::thread::park();
                    Ok(())
                })
                .ok();
        });

        host.attach_worker("doomed-worker", worker_endpoint, Setup { name: "doomed".to_string() })
            .unwrap();

        mid_write_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        host.mark_peer_died("doomed-worker");
        assert!(object.is_poisoned());

        join.thread().unpark();
        join.join().unwrap();
    }
}
