//! # VM State
//!
//! In-memory world state: accounts, code and flat storage, with whole-state
//! checkpoints used to roll back reverted frames.

use crate::errors::VmError;
use chop_types::{Address, Bytes, U256};
use std::collections::{BTreeMap, HashMap};

/// One account as the VM sees it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VmAccount {
    /// Balance in wei.
    pub balance: U256,
    /// Transaction nonce. Contracts are born with nonce 1.
    pub nonce: u64,
    /// Runtime code; empty for EOAs.
    pub code: Bytes,
}

impl VmAccount {
    /// Returns true if this account carries code.
    #[must_use]
    pub fn is_contract(&self) -> bool {
        !self.code.is_empty()
    }
}

/// A point-in-time copy of the world state.
///
/// Frames snapshot before running and roll back on failure. Cloning the
/// full maps is plainly O(state size), which is acceptable for a
/// single-operator development tool.
#[derive(Clone, Debug)]
pub struct StateCheckpoint {
    accounts: HashMap<Address, VmAccount>,
    storage: HashMap<(Address, U256), U256>,
}

/// The mutable world state owned by the VM manager.
#[derive(Clone, Debug, Default)]
pub struct VmState {
    accounts: HashMap<Address, VmAccount>,
    storage: HashMap<(Address, U256), U256>,
}

impl VmState {
    /// Creates an empty state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the account if it exists.
    #[must_use]
    pub fn account(&self, address: Address) -> Option<&VmAccount> {
        self.accounts.get(&address)
    }

    /// Returns true if the address has ever been touched.
    #[must_use]
    pub fn exists(&self, address: Address) -> bool {
        self.accounts.contains_key(&address)
    }

    /// Balance of an address, zero for unknown accounts.
    #[must_use]
    pub fn balance_of(&self, address: Address) -> U256 {
        self.accounts
            .get(&address)
            .map(|a| a.balance)
            .unwrap_or_default()
    }

    /// Nonce of an address, zero for unknown accounts.
    #[must_use]
    pub fn nonce_of(&self, address: Address) -> u64 {
        self.accounts.get(&address).map(|a| a.nonce).unwrap_or(0)
    }

    /// Code of an address, empty for unknown accounts and EOAs.
    #[must_use]
    pub fn code_of(&self, address: Address) -> Bytes {
        self.accounts
            .get(&address)
            .map(|a| a.code.clone())
            .unwrap_or_default()
    }

    /// Sets the balance, creating the account if needed.
    pub fn set_balance(&mut self, address: Address, balance: U256) {
        self.accounts.entry(address).or_default().balance = balance;
    }

    /// Sets the nonce, creating the account if needed.
    pub fn set_nonce(&mut self, address: Address, nonce: u64) {
        self.accounts.entry(address).or_default().nonce = nonce;
    }

    /// Increments the nonce by one, creating the account if needed.
    pub fn bump_nonce(&mut self, address: Address) {
        let account = self.accounts.entry(address).or_default();
        account.nonce = account.nonce.saturating_add(1);
    }

    /// Installs code at an address. An EOA becoming a contract gets nonce 1.
    pub fn set_code(&mut self, address: Address, code: Bytes) {
        let account = self.accounts.entry(address).or_default();
        if !code.is_empty() && account.nonce == 0 {
            account.nonce = 1;
        }
        account.code = code;
    }

    /// Moves `value` wei between accounts.
    ///
    /// # Errors
    ///
    /// Returns `InsufficientBalance` if the sender cannot cover it.
    pub fn transfer(&mut self, from: Address, to: Address, value: U256) -> Result<(), VmError> {
        if value.is_zero() {
            return Ok(());
        }
        let from_balance = self.balance_of(from);
        if from_balance < value {
            return Err(VmError::InsufficientBalance);
        }
        self.set_balance(from, from_balance - value);
        let to_balance = self.balance_of(to);
        self.set_balance(to, to_balance + value);
        Ok(())
    }

    /// Storage read, zero for never-written slots.
    #[must_use]
    pub fn sload(&self, address: Address, key: U256) -> U256 {
        self.storage
            .get(&(address, key))
            .copied()
            .unwrap_or_default()
    }

    /// Storage write.
    pub fn sstore(&mut self, address: Address, key: U256, value: U256) {
        if value.is_zero() {
            self.storage.remove(&(address, key));
        } else {
            self.storage.insert((address, key), value);
        }
    }

    /// All non-zero slots of one address, sorted by key.
    #[must_use]
    pub fn storage_of(&self, address: Address) -> BTreeMap<U256, U256> {
        self.storage
            .iter()
            .filter(|((addr, _), _)| *addr == address)
            .map(|((_, key), value)| (*key, *value))
            .collect()
    }

    /// Deletes an account and its storage (SELFDESTRUCT).
    pub fn remove_account(&mut self, address: Address) {
        self.accounts.remove(&address);
        self.storage.retain(|(addr, _), _| *addr != address);
    }

    /// All known addresses.
    pub fn addresses(&self) -> impl Iterator<Item = Address> + '_ {
        self.accounts.keys().copied()
    }

    /// Takes a checkpoint of the whole state.
    #[must_use]
    pub fn checkpoint(&self) -> StateCheckpoint {
        StateCheckpoint {
            accounts: self.accounts.clone(),
            storage: self.storage.clone(),
        }
    }

    /// Rolls the state back to a checkpoint.
    pub fn revert_to(&mut self, checkpoint: StateCheckpoint) {
        self.accounts = checkpoint.accounts;
        self.storage = checkpoint.storage;
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(n: u8) -> Address {
        let mut bytes = [0u8; 20];
        bytes[19] = n;
        Address::new(bytes)
    }

    #[test]
    fn test_unknown_account_reads_zero() {
        let state = VmState::new();
        assert_eq!(state.balance_of(addr(1)), U256::zero());
        assert_eq!(state.nonce_of(addr(1)), 0);
        assert!(state.code_of(addr(1)).is_empty());
        assert_eq!(state.sload(addr(1), U256::zero()), U256::zero());
    }

    #[test]
    fn test_set_code_bumps_eoa_nonce() {
        let mut state = VmState::new();
        state.set_code(addr(1), Bytes::from_slice(&[0x00]));
        assert_eq!(state.nonce_of(addr(1)), 1);
        assert!(state.account(addr(1)).unwrap().is_contract());

        // Re-deploy over a contract keeps the existing nonce.
        state.set_nonce(addr(1), 5);
        state.set_code(addr(1), Bytes::from_slice(&[0x01]));
        assert_eq!(state.nonce_of(addr(1)), 5);
    }

    #[test]
    fn test_transfer() {
        let mut state = VmState::new();
        state.set_balance(addr(1), U256::from(100));

        state.transfer(addr(1), addr(2), U256::from(30)).unwrap();
        assert_eq!(state.balance_of(addr(1)), U256::from(70));
        assert_eq!(state.balance_of(addr(2)), U256::from(30));

        assert_eq!(
            state.transfer(addr(1), addr(2), U256::from(1000)),
            Err(VmError::InsufficientBalance)
        );
    }

    #[test]
    fn test_storage_roundtrip_and_iteration() {
        let mut state = VmState::new();
        state.sstore(addr(1), U256::from(0), U256::from(5));
        state.sstore(addr(1), U256::from(2), U256::from(7));
        state.sstore(addr(2), U256::from(0), U256::from(9));

        assert_eq!(state.sload(addr(1), U256::from(0)), U256::from(5));

        let slots = state.storage_of(addr(1));
        assert_eq!(slots.len(), 2);
        assert_eq!(slots[&U256::from(2)], U256::from(7));

        // Writing zero clears the slot.
        state.sstore(addr(1), U256::from(0), U256::zero());
        assert_eq!(state.storage_of(addr(1)).len(), 1);
    }

    #[test]
    fn test_checkpoint_revert() {
        let mut state = VmState::new();
        state.set_balance(addr(1), U256::from(100));

        let checkpoint = state.checkpoint();
        state.set_balance(addr(1), U256::from(1));
        state.sstore(addr(1), U256::zero(), U256::from(42));

        state.revert_to(checkpoint);
        assert_eq!(state.balance_of(addr(1)), U256::from(100));
        assert_eq!(state.sload(addr(1), U256::zero()), U256::zero());
    }

    #[test]
    fn test_remove_account() {
        let mut state = VmState::new();
        state.set_balance(addr(1), U256::from(100));
        state.sstore(addr(1), U256::zero(), U256::from(1));

        state.remove_account(addr(1));
        assert!(!state.exists(addr(1)));
        assert!(state.storage_of(addr(1)).is_empty());
    }
}
