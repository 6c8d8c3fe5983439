//! Adapters behind the domain ports: transports, platform and ledgers.

pub mod fixture;
pub mod http;
pub mod in_memory;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
pub mod sleeper;
