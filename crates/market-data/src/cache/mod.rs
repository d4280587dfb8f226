//! Partitioned TTL cache.
//!
//! - `partition` - Well-known partition names and their default TTLs
//! - `store` - The thread-safe [`CacheStore`]
//! - `stats` - Counters and introspection results
//! - `sweeper` - Background purge of expired entries

pub mod partition;
mod stats;
mod store;
mod sweeper;

pub use stats::{CacheInfo, CacheOverview, CacheStats, PartitionInfo};
pub use store::CacheStore;
pub use sweeper::{CacheSweeper, SweeperHandle};
