//! End-to-end scenarios spanning the runtime, typed, and core crates.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bus_runtime::{host, worker, BootstrapMessage};
use peer_adapter::spawn_worker;
use schema_layout::{FieldKind, Numeric, Schema, Value, ValueMap};

#[derive(Clone)]
struct WorkerConfig {
    increment: i32,
}

#[test]
fn scenario_s1_counter_is_produced_by_the_host_and_consumed_by_a_worker() {
    let bus = host::<WorkerConfig>();
    let schema = Schema::new().field("count", FieldKind::Scalar(Numeric::I32));
    let counter = bus.create_typed_object("counter", &schema).unwrap();

    let (endpoint, join) = spawn_worker::<BootstrapMessage<WorkerConfig>, _>({
        let schema = schema.clone();
        move |endpoint| {
            let peer = worker(endpoint).unwrap();
            let handle = peer.open_typed_object("counter", &schema).unwrap().unwrap();
            loop {
                if let Some(view) = handle.read() {
                    if view.values.get("count") == Some(&Value::I32(3)) {
                        break;
                    }
                }
                std::thread::sleep(Duration::from_millis(5));
            }
        }
    });
    bus.attach_worker("consumer", endpoint, WorkerConfig { increment: 1 })
        .unwrap();

    for value in 1..=3i32 {
        counter
            .write(&ValueMap::new().insert("count", Value::I32(value)))
            .unwrap();
    }

    join.join().unwrap();
}

#[test]
fn scenario_s2_two_workers_contend_for_the_write_lock_in_fifo_order() {
    let bus = host::<WorkerConfig>();
    let shared = bus.create_shared_object("contended", 4).unwrap();
    let writes_seen = Arc::new(AtomicUsize::new(0));

    let mut joins = Vec::new();
    for i in 0..4 {
        let writes_seen = Arc::clone(&writes_seen);
        let (endpoint, join) = spawn_worker::<BootstrapMessage<WorkerConfig>, _>(move |endpoint| {
            let peer = worker(endpoint).unwrap();
            let handle = peer.open_shared_object("contended").unwrap();
            handle
                .request_write::<_, std::convert::Infallible>(move |bytes| {
                    bytes.copy_from_slice(&(i as i32).to_le_bytes());
                    writes_seen.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                })
                .unwrap();
        });
        bus.attach_worker(format!("writer-{i}"), endpoint, WorkerConfig { increment: i })
            .unwrap();
        joins.push(join);
    }

    for join in joins {
        join.join().unwrap();
    }
    assert_eq!(writes_seen.load(Ordering::SeqCst), 4);
    assert!(shared.read_latest().is_some());
}

#[test]
fn scenario_s6_worker_death_mid_write_is_observed_by_the_host_and_other_workers() {
    let bus = host::<WorkerConfig>();
    let shared = bus.create_shared_object("fragile", 4).unwrap();
    let (mid_write_tx, mid_write_rx) = std::sync::mpsc::channel();

    let (doomed_endpoint, doomed_join) = spawn_worker::<BootstrapMessage<WorkerConfig>, _>(move |endpoint| {
        let peer = worker(endpoint).unwrap();
        let handle = peer.open_shared_object("fragile").unwrap();
        handle
            .request_write::<_, std::convert::Infallible>(move |_bytes| {
                mid_write_tx.send(()).unwrap();
                std::thread::park();
                Ok(())
            })
            .ok();
    });
    bus.attach_worker("doomed", doomed_endpoint, WorkerConfig { increment: 0 })
        .unwrap();

    mid_write_rx.recv_timeout(Duration::from_secs(5)).unwrap();
    bus.mark_peer_died("doomed");
    assert!(shared.is_poisoned());

    let err = shared
        .request_write::<_, std::convert::Infallible>(|_| Ok(()))
        .unwrap_err();
    assert!(matches!(
        err,
        shared_object::RequestWriteError::Lock(shared_object::WriteError::Poisoned)
    ));

    doomed_join.thread().unpark();
    doomed_join.join().unwrap();
}
