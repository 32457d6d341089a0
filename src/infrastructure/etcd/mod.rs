//! etcd v2 adapter for the key-value store port

pub mod client;
pub mod peers;
pub mod types;

pub use client::{EtcdClientConfig, EtcdStore};
pub use peers::{local_state, EtcdPeers};
pub use types::PeerMachine;
