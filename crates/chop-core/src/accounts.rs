//! # Account Manager
//!
//! Deterministic custody of the operator's test accounts plus the mutable
//! account store that mirrors post-execution VM state.
//!
//! Derivation is a pure function of (seed, index): the private key is
//! keccak256(seed || index_be), the address is the keccak of the
//! uncompressed secp256k1 public key, last 20 bytes. Re-deriving from a
//! fixed seed therefore reproduces the same address set on every boot.

use chop_evm::VmState;
use chop_types::{keccak256, Address, Bytes, U256};
use k256::ecdsa::SigningKey;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use rand::RngCore;
use std::collections::HashMap;
use tracing::info;

/// Default number of derived accounts.
pub const DEFAULT_ACCOUNT_COUNT: usize = 10;

/// Default funding per derived account: 100 ETH in wei.
#[must_use]
pub fn default_balance() -> U256 {
    eth_to_wei(100)
}

/// Whole ETH to wei.
#[must_use]
pub fn eth_to_wei(eth: u64) -> U256 {
    U256::from(eth) * U256::from(10u64).pow(U256::from(18))
}

/// One managed account. Derived accounts carry their private key;
/// contract accounts created during execution do not.
#[derive(Clone, Debug)]
pub struct Account {
    /// Unique index, assigned at creation.
    pub index: usize,
    /// Account address.
    pub address: Address,
    /// Private key for derived accounts; None for contracts.
    private_key: Option<[u8; 32]>,
    /// Balance in wei.
    pub balance: U256,
    /// Nonce. Contracts are born with 1.
    pub nonce: u64,
    /// Runtime code; empty for EOAs.
    pub code: Bytes,
}

impl Account {
    /// Returns true if this account carries code.
    #[must_use]
    pub fn is_contract(&self) -> bool {
        !self.code.is_empty()
    }
}

/// The account manager.
pub struct AccountManager {
    seed: [u8; 32],
    accounts: Vec<Account>,
    by_address: HashMap<Address, usize>,
}

impl AccountManager {
    /// Creates a manager with `count` derived accounts funded at
    /// `initial_balance`. A missing seed is generated at random.
    #[must_use]
    pub fn new(seed: Option<[u8; 32]>, count: usize, initial_balance: U256) -> Self {
        let seed = seed.unwrap_or_else(|| {
            let mut bytes = [0u8; 32];
            rand::thread_rng().fill_bytes(&mut bytes);
            bytes
        });

        let mut manager = Self {
            seed,
            accounts: Vec::with_capacity(count),
            by_address: HashMap::with_capacity(count),
        };
        for index in 0..count {
            let (private_key, address) = derive(&seed, index as u64);
            manager.insert(Account {
                index,
                address,
                private_key: Some(private_key),
                balance: initial_balance,
                nonce: 0,
                code: Bytes::new(),
            });
        }
        info!(count, seed = %manager.seed_hex(), "derived accounts");
        manager
    }

    fn insert(&mut self, account: Account) {
        self.by_address.insert(account.address, self.accounts.len());
        self.accounts.push(account);
    }

    /// All accounts in index order.
    #[must_use]
    pub fn all(&self) -> &[Account] {
        &self.accounts
    }

    /// Look up one account.
    #[must_use]
    pub fn get(&self, address: Address) -> Option<&Account> {
        self.by_address.get(&address).map(|&i| &self.accounts[i])
    }

    /// Number of managed accounts, contracts included.
    #[must_use]
    pub fn count(&self) -> usize {
        self.accounts.len()
    }

    /// The seed in hex, for display and replay.
    #[must_use]
    pub fn seed_hex(&self) -> String {
        format!("0x{}", hex::encode(self.seed))
    }

    /// The raw seed.
    #[must_use]
    pub fn seed(&self) -> [u8; 32] {
        self.seed
    }

    /// Explicit private-key reveal. The only way key material leaves the
    /// manager; the UI gates this behind a confirmation.
    #[must_use]
    pub fn reveal_private_key(&self, address: Address) -> Option<String> {
        self.get(address)
            .and_then(|account| account.private_key)
            .map(|key| format!("0x{}", hex::encode(key)))
    }

    /// Installs code, marking the account as a contract. An EOA
    /// transitioning to a contract gets nonce 1.
    pub fn set_code(&mut self, address: Address, code: Bytes) {
        let account = self.entry(address);
        if !code.is_empty() && account.nonce == 0 {
            account.nonce = 1;
        }
        account.code = code;
    }

    /// Administrative balance write, used by the execution engine to
    /// reflect post-call state.
    pub fn set_balance(&mut self, address: Address, balance: U256) {
        self.entry(address).balance = balance;
    }

    /// Administrative nonce write.
    pub fn set_nonce(&mut self, address: Address, nonce: u64) {
        self.entry(address).nonce = nonce;
    }

    fn entry(&mut self, address: Address) -> &mut Account {
        let index = match self.by_address.get(&address) {
            Some(&i) => i,
            None => {
                let index = self.accounts.len();
                self.insert(Account {
                    index,
                    address,
                    private_key: None,
                    balance: U256::zero(),
                    nonce: 0,
                    code: Bytes::new(),
                });
                index
            }
        };
        &mut self.accounts[index]
    }

    /// Seeds the VM world state with every managed account.
    pub fn fund_vm(&self, state: &mut VmState) {
        for account in &self.accounts {
            state.set_balance(account.address, account.balance);
            state.set_nonce(account.address, account.nonce);
            if account.is_contract() {
                state.set_code(account.address, account.code.clone());
            }
        }
    }

    /// Mirrors post-execution VM state back into the manager. Every
    /// address the VM knows is reflected; new addresses (deployed
    /// contracts, transfer targets) get fresh entries.
    pub fn mirror_from_vm(&mut self, state: &VmState) {
        let addresses: Vec<Address> = state.addresses().collect();
        for address in addresses {
            if let Some(vm_account) = state.account(address) {
                let account = self.entry(address);
                account.balance = vm_account.balance;
                account.nonce = vm_account.nonce;
                account.code = vm_account.code.clone();
            }
        }
    }
}

/// Derive (private key, address) for one index. Pure in (seed, index).
///
/// In the astronomically unlikely case the keccak output is not a valid
/// secp256k1 scalar, the candidate is re-hashed until one is.
#[must_use]
pub fn derive(seed: &[u8; 32], index: u64) -> ([u8; 32], Address) {
    let mut material = Vec::with_capacity(40);
    material.extend_from_slice(seed);
    material.extend_from_slice(&index.to_be_bytes());

    let mut candidate = keccak256(&material);
    loop {
        if let Ok(signing_key) = SigningKey::from_bytes(candidate.as_bytes().into()) {
            let public = signing_key.verifying_key().to_encoded_point(false);
            let hash = keccak256(&public.as_bytes()[1..]);
            let address = Address::from_slice(&hash.as_bytes()[12..]).unwrap_or(Address::ZERO);
            return (*candidate.as_bytes(), address);
        }
        candidate = keccak256(candidate.as_bytes());
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const SEED: [u8; 32] = [0x01; 32];

    #[test]
    fn test_derivation_is_deterministic() {
        let first = AccountManager::new(Some(SEED), 5, default_balance());
        let second = AccountManager::new(Some(SEED), 5, default_balance());

        let a: Vec<Address> = first.all().iter().map(|acc| acc.address).collect();
        let b: Vec<Address> = second.all().iter().map(|acc| acc.address).collect();
        assert_eq!(a, b);
        assert_eq!(a.len(), 5);
    }

    #[test]
    fn test_indices_are_distinct_addresses() {
        let manager = AccountManager::new(Some(SEED), 10, default_balance());
        let mut addresses: Vec<Address> = manager.all().iter().map(|a| a.address).collect();
        addresses.sort();
        addresses.dedup();
        assert_eq!(addresses.len(), 10);
    }

    #[test]
    fn test_random_seed_differs() {
        let first = AccountManager::new(None, 1, default_balance());
        let second = AccountManager::new(None, 1, default_balance());
        assert_ne!(first.all()[0].address, second.all()[0].address);
    }

    #[test]
    fn test_set_code_marks_contract() {
        let mut manager = AccountManager::new(Some(SEED), 1, default_balance());
        let addr = Address::new([0x42; 20]);
        manager.set_code(addr, Bytes::from_slice(&[0x00]));

        let account = manager.get(addr).unwrap();
        assert!(account.is_contract());
        assert_eq!(account.nonce, 1);
        assert_eq!(account.index, 1);
    }

    #[test]
    fn test_reveal_only_for_derived_accounts() {
        let mut manager = AccountManager::new(Some(SEED), 1, default_balance());
        let derived = manager.all()[0].address;
        assert!(manager.reveal_private_key(derived).is_some());

        let contract = Address::new([0x42; 20]);
        manager.set_code(contract, Bytes::from_slice(&[0x00]));
        assert!(manager.reveal_private_key(contract).is_none());
    }

    #[test]
    fn test_fund_and_mirror_roundtrip() {
        let mut manager = AccountManager::new(Some(SEED), 2, default_balance());
        let mut state = VmState::new();
        manager.fund_vm(&mut state);

        let alice = manager.all()[0].address;
        assert_eq!(state.balance_of(alice), default_balance());

        state.set_balance(alice, U256::from(7));
        state.set_nonce(alice, 3);
        let deployed = Address::new([0x99; 20]);
        state.set_code(deployed, Bytes::from_slice(&[0x60, 0x00]));

        manager.mirror_from_vm(&state);
        assert_eq!(manager.get(alice).unwrap().balance, U256::from(7));
        assert_eq!(manager.get(alice).unwrap().nonce, 3);
        assert!(manager.get(deployed).unwrap().is_contract());
    }

    #[test]
    fn test_eth_to_wei() {
        assert_eq!(
            eth_to_wei(1),
            U256::from_dec_str("1000000000000000000").unwrap()
        );
        assert_eq!(
            eth_to_wei(100),
            U256::from_dec_str("100000000000000000000").unwrap()
        );
    }
}
