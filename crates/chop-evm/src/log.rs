//! Event logs emitted by LOG0..LOG4.

use chop_types::{Address, Bytes, Hash};
use serde::{Deserialize, Serialize};

/// A single log record: emitting address, up to four topics, opaque data.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Address of the contract that emitted the log.
    pub address: Address,
    /// Indexed topics, 0 to 4 of them.
    pub topics: Vec<Hash>,
    /// Unindexed payload.
    pub data: Bytes,
}

impl LogEntry {
    /// Creates a new log entry.
    #[must_use]
    pub fn new(address: Address, topics: Vec<Hash>, data: Bytes) -> Self {
        Self {
            address,
            topics,
            data,
        }
    }
}
