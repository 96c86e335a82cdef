//! # Transient Storage (EIP-1153)
//!
//! TLOAD/TSTORE-visible storage, discarded at the end of each transaction.

use chop_types::{Address, U256};
use std::collections::HashMap;

/// Per-transaction transient storage.
#[derive(Debug, Default, Clone)]
pub struct TransientStorage {
    data: HashMap<(Address, U256), U256>,
}

impl TransientStorage {
    /// Creates an empty transient store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// TLOAD: zero for never-written slots.
    #[must_use]
    pub fn load(&self, address: Address, key: U256) -> U256 {
        self.data.get(&(address, key)).copied().unwrap_or_default()
    }

    /// TSTORE.
    pub fn store(&mut self, address: Address, key: U256, value: U256) {
        self.data.insert((address, key), value);
    }

    /// Discard everything. Called between transactions.
    pub fn clear(&mut self) {
        self.data.clear();
    }

    /// Number of live slots.
    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.data.len()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_default_zero() {
        let t = TransientStorage::new();
        assert_eq!(t.load(Address::ZERO, U256::from(1)), U256::zero());
    }

    #[test]
    fn test_store_load_clear() {
        let mut t = TransientStorage::new();
        let addr = Address::new([1u8; 20]);
        t.store(addr, U256::from(7), U256::from(99));
        assert_eq!(t.load(addr, U256::from(7)), U256::from(99));
        assert_eq!(t.slot_count(), 1);

        t.clear();
        assert_eq!(t.load(addr, U256::from(7)), U256::zero());
        assert_eq!(t.slot_count(), 0);
    }
}
