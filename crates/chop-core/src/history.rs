//! # History Manager
//!
//! Bounded ring of past executions, listable in execution order and
//! addressable by id. Oldest entries are evicted on overflow.

use crate::params::{CallParameters, CallResult};
use chrono::{DateTime, Utc};
use std::collections::VecDeque;

/// Default history capacity.
pub const DEFAULT_HISTORY_CAP: usize = 1000;

/// One recorded execution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HistoryEntry {
    /// Unique, monotonically increasing id.
    pub id: u64,
    /// The parameters as executed.
    pub parameters: CallParameters,
    /// What came back.
    pub result: CallResult,
    /// When it ran.
    pub timestamp: DateTime<Utc>,
}

/// The bounded execution history.
#[derive(Debug)]
pub struct HistoryManager {
    entries: VecDeque<HistoryEntry>,
    capacity: usize,
    next_id: u64,
}

impl HistoryManager {
    /// Creates a history with the default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_CAP)
    }

    /// Creates a history with an explicit capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(64)),
            capacity: capacity.max(1),
            next_id: 1,
        }
    }

    /// Records an execution, evicting the oldest entry when full.
    /// Returns the assigned id.
    pub fn add_call(
        &mut self,
        parameters: CallParameters,
        result: CallResult,
        timestamp: DateTime<Utc>,
    ) -> u64 {
        let id = self.next_id;
        self.next_id += 1;

        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(HistoryEntry {
            id,
            parameters,
            result,
            timestamp,
        });
        id
    }

    /// Look up by id.
    #[must_use]
    pub fn get_call(&self, id: u64) -> Option<&HistoryEntry> {
        // Ids are monotonic, so the ring is sorted by id.
        let first = self.entries.front()?.id;
        let index = usize::try_from(id.checked_sub(first)?).ok()?;
        self.entries.get(index)
    }

    /// All entries, oldest first.
    #[must_use]
    pub fn all(&self) -> impl DoubleEndedIterator<Item = &HistoryEntry> + ExactSizeIterator {
        self.entries.iter()
    }

    /// Number of retained entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops everything; ids keep counting.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl Default for HistoryManager {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chop_types::{Address, Bytes};

    fn entry_fixture() -> (CallParameters, CallResult) {
        let params = CallParameters::defaults(Address::new([0xAA; 20]));
        let result = CallResult {
            success: true,
            return_data: Bytes::new(),
            gas_left: 999_000,
            error_info: String::new(),
            logs: Vec::new(),
            deployed_address: None,
        };
        (params, result)
    }

    #[test]
    fn test_ids_are_monotonic() {
        let mut history = HistoryManager::new();
        let (params, result) = entry_fixture();
        let a = history.add_call(params.clone(), result.clone(), Utc::now());
        let b = history.add_call(params, result, Utc::now());
        assert_eq!(b, a + 1);
    }

    #[test]
    fn test_get_by_id() {
        let mut history = HistoryManager::new();
        let (params, result) = entry_fixture();
        let id = history.add_call(params, result, Utc::now());
        assert_eq!(history.get_call(id).unwrap().id, id);
        assert!(history.get_call(id + 1).is_none());
        assert!(history.get_call(0).is_none());
    }

    #[test]
    fn test_eviction_keeps_order_and_lookup() {
        let mut history = HistoryManager::with_capacity(3);
        let (params, result) = entry_fixture();
        for _ in 0..5 {
            history.add_call(params.clone(), result.clone(), Utc::now());
        }

        assert_eq!(history.len(), 3);
        let ids: Vec<u64> = history.all().map(|e| e.id).collect();
        assert_eq!(ids, vec![3, 4, 5]);

        assert!(history.get_call(1).is_none());
        assert!(history.get_call(2).is_none());
        assert_eq!(history.get_call(4).unwrap().id, 4);
    }

    #[test]
    fn test_clear_keeps_id_counter() {
        let mut history = HistoryManager::new();
        let (params, result) = entry_fixture();
        history.add_call(params.clone(), result.clone(), Utc::now());
        history.clear();
        assert!(history.is_empty());

        let next = history.add_call(params, result, Utc::now());
        assert_eq!(next, 2);
    }
}
