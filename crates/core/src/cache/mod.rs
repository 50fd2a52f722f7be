//! SQLite-backed cache partitions.
//!
//! This module provides the durable storage behind the worker's caches using
//! SQLite with async access via tokio-rusqlite. It supports:
//!
//! - Named partitions keyed by request identity (method + URL)
//! - Automatic schema migrations
//! - WAL mode for concurrent access
//! - Insertion-ordered FIFO eviction

pub mod connection;
pub mod eviction;
pub mod hash;
pub mod migrations;
pub mod partitions;

pub use crate::Error;

pub use connection::CacheDb;
pub use eviction::EvictionPolicy;
pub use partitions::{CacheEntry, Partition, PartitionRegistry};
