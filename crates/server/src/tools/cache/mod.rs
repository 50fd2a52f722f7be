//! Cache inspection MCP tools.
//!
//! This module provides read-only views of the cache partitions.

pub mod get;
pub mod keys;

pub use get::{CacheGetParams, get_impl};
pub use keys::{CacheKeysParams, keys_impl};
