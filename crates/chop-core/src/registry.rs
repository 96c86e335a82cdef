//! # Contract Registry
//!
//! Deployed contracts addressable by contract address. Re-deploying to an
//! existing address replaces the record.

use chop_types::{Address, Bytes};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// One deployed contract.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Contract {
    /// Deployed address.
    pub address: Address,
    /// Runtime bytecode.
    pub bytecode: Bytes,
    /// When the deployment was recorded.
    pub creation_timestamp: DateTime<Utc>,
}

/// The registry. Iteration order is stable: newest deployment first,
/// address as the tiebreak.
#[derive(Debug, Default)]
pub struct ContractRegistry {
    contracts: BTreeMap<Address, Contract>,
}

impl ContractRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a deployment, replacing any prior code at the address.
    pub fn add(&mut self, address: Address, bytecode: Bytes, timestamp: DateTime<Utc>) {
        self.contracts.insert(
            address,
            Contract {
                address,
                bytecode,
                creation_timestamp: timestamp,
            },
        );
    }

    /// Look up one contract.
    #[must_use]
    pub fn get(&self, address: Address) -> Option<&Contract> {
        self.contracts.get(&address)
    }

    /// All contracts, newest first (address as tiebreak).
    #[must_use]
    pub fn list(&self) -> Vec<&Contract> {
        let mut all: Vec<&Contract> = self.contracts.values().collect();
        all.sort_by(|a, b| {
            b.creation_timestamp
                .cmp(&a.creation_timestamp)
                .then(a.address.cmp(&b.address))
        });
        all
    }

    /// Number of registered contracts.
    #[must_use]
    pub fn count(&self) -> usize {
        self.contracts.len()
    }

    /// Drops every record.
    pub fn clear(&mut self) {
        self.contracts.clear();
    }
}

// =============================================================================
// TESTS
// =============================================================================
