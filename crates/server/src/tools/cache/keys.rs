//! cache_keys tool implementation.
//!
//! Lists partitions, or the entries of one partition in insertion order.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shelfsync_client::Worker;
use shelfsync_core::Error;
use shelfsync_core::cache::CacheEntry;

use crate::tools::json_result;

/// Parameters for the cache_keys tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CacheKeysParams {
    /// Partition whose entries to list; lists the partitions when absent.
    #[serde(default)]
    pub partition: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PartitionSummary {
    pub name: String,
    pub entries: u64,
    /// Whether the running worker version owns this partition.
    pub current: bool,
}

/// Output from the cache_keys tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum CacheKeysOutput {
    Partitions { partitions: Vec<PartitionSummary> },
    Entries { partition: String, entries: Vec<CacheEntry> },
}

/// Implementation of the cache_keys tool.
pub async fn keys_impl(worker: &Worker, params: CacheKeysParams) -> Result<CallToolResult, McpError> {
    let db = worker.db();
    let names = db.partition_names().await?;

    let output = match params.partition {
        Some(name) if names.contains(&name) => {
            let entries = db.entries(&name).await?;
            CacheKeysOutput::Entries { partition: name, entries }
        }
        Some(name) => return Err(Error::CacheMiss(format!("no partition named {name}")).into()),
        None => {
            let mut partitions = Vec::with_capacity(names.len());
            for name in names {
                let entries = db.entry_count(&name).await?;
                let current = worker.registry().contains(&name);
                partitions.push(PartitionSummary { name, entries, current });
            }
            CacheKeysOutput::Partitions { partitions }
        }
    };

    json_result(&output)
}
