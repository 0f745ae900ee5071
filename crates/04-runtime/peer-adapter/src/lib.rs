//! A duplex message endpoint abstraction used to bootstrap a shared-object
//! bus across native threads.

mod endpoint;
mod error;

pub use endpoint::{pair, spawn_worker, ChannelEndpoint, Listener, PeerEndpoint, Unsubscribe};
pub use error::HandshakeError;
