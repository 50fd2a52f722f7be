//! Core types and shared functionality for shelfsync.
//!
//! This crate provides:
//! - Cache partitions and the durable mutation queue with a SQLite backend
//! - HTTP request/response records shared by the worker and its host
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod http;
pub mod queue;

pub use cache::{CacheDb, EvictionPolicy, Partition, PartitionRegistry};
pub use config::{ConfigError, WorkerConfig};
pub use error::Error;
pub use http::{Request, Response};
pub use queue::QueuedMutation;
