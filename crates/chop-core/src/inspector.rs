//! # State Inspector
//!
//! Read-only account and storage queries over the account manager and the
//! VM's flat storage, plus the balance formatting used across the UI.

use crate::accounts::AccountManager;
use chop_evm::VmManager;
use chop_types::{Address, Bytes, U256};
use std::collections::BTreeMap;

/// One address's full observable state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccountState {
    /// The queried address.
    pub address: Address,
    /// Balance in wei.
    pub balance: U256,
    /// Nonce.
    pub nonce: u64,
    /// True when code is present.
    pub is_contract: bool,
    /// Runtime code.
    pub code: Bytes,
    /// Code size in bytes.
    pub code_size: usize,
    /// Non-zero storage slots, sorted by key. Empty for EOAs.
    pub storage_slots: BTreeMap<U256, U256>,
}

/// The read API. Borrows the managers; holds no state of its own.
pub struct StateInspector<'a> {
    accounts: &'a AccountManager,
    vm: &'a VmManager,
}

impl<'a> StateInspector<'a> {
    /// Creates an inspector over the current managers.
    #[must_use]
    pub fn new(accounts: &'a AccountManager, vm: &'a VmManager) -> Self {
        Self { accounts, vm }
    }

    /// Full state of one address. Unknown addresses come back zeroed with
    /// `is_contract = false`.
    #[must_use]
    pub fn inspect_address(&self, address: Address) -> AccountState {
        match self.accounts.get(address) {
            Some(account) => AccountState {
                address,
                balance: account.balance,
                nonce: account.nonce,
                is_contract: account.is_contract(),
                code_size: account.code.len(),
                code: account.code.clone(),
                storage_slots: self.vm.state().storage_of(address),
            },
            None => AccountState {
                address,
                balance: U256::zero(),
                nonce: 0,
                is_contract: false,
                code: Bytes::new(),
                code_size: 0,
                storage_slots: BTreeMap::new(),
            },
        }
    }

    /// Balance shortcut.
    #[must_use]
    pub fn get_balance(&self, address: Address) -> U256 {
        self.accounts
            .get(address)
            .map(|a| a.balance)
            .unwrap_or_default()
    }

    /// Nonce shortcut.
    #[must_use]
    pub fn get_nonce(&self, address: Address) -> u64 {
        self.accounts.get(address).map(|a| a.nonce).unwrap_or(0)
    }

    /// Code shortcut.
    #[must_use]
    pub fn get_code(&self, address: Address) -> Bytes {
        self.accounts
            .get(address)
            .map(|a| a.code.clone())
            .unwrap_or_default()
    }

    /// Contract check shortcut.
    #[must_use]
    pub fn is_contract(&self, address: Address) -> bool {
        self.accounts
            .get(address)
            .is_some_and(|account| account.is_contract())
    }
}

const WEI_PER_ETH: u64 = 1_000_000_000_000_000_000;

/// Renders a wei amount as ETH.
///
/// Rules, fixed 10^18 denominator:
/// - zero renders as `0 ETH`;
/// - amounts evenly divisible by 10^18 render as the integer, `X ETH`;
/// - everything else renders with exactly two (truncated) decimal places,
///   `X.YZ ETH` — below 1 ETH that is `0.YZ ETH`.
#[must_use]
pub fn format_balance(wei: U256) -> String {
    format!("{} ETH", format_eth_amount(wei))
}

/// The same rendering without the unit suffix, for tight table columns.
#[must_use]
pub fn format_balance_short(wei: U256) -> String {
    format_eth_amount(wei)
}

fn format_eth_amount(wei: U256) -> String {
    let denominator = U256::from(WEI_PER_ETH);
    let whole = wei / denominator;
    let remainder = wei % denominator;

    if remainder.is_zero() {
        return whole.to_string();
    }
    // Two truncated decimal places.
    let hundredths = remainder / (denominator / 100);
    format!("{whole}.{:02}", hundredths.as_u64())
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::{default_balance, eth_to_wei, AccountManager};
    use chop_evm::BlockEnv;

    fn setup() -> (AccountManager, VmManager) {
        let mut accounts = AccountManager::new(Some([0x01; 32]), 2, default_balance());
        let mut vm = VmManager::new(BlockEnv::default());
        accounts.fund_vm(vm.state_mut());
        (accounts, vm)
    }

    #[test]
    fn test_inspect_known_account() {
        let (accounts, vm) = setup();
        let inspector = StateInspector::new(&accounts, &vm);
        let address = accounts.all()[0].address;

        let state = inspector.inspect_address(address);
        assert_eq!(state.balance, default_balance());
        assert_eq!(state.nonce, 0);
        assert!(!state.is_contract);
        assert!(state.storage_slots.is_empty());
    }

    #[test]
    fn test_inspect_unknown_address_is_zeroed() {
        let (accounts, vm) = setup();
        let inspector = StateInspector::new(&accounts, &vm);

        let state = inspector.inspect_address(Address::new([0xEE; 20]));
        assert_eq!(state.balance, U256::zero());
        assert_eq!(state.nonce, 0);
        assert!(!state.is_contract);
        assert_eq!(state.code_size, 0);
    }

    #[test]
    fn test_inspect_contract_reads_storage() {
        let (mut accounts, mut vm) = setup();
        let address = Address::new([0x10; 20]);
        let code = Bytes::from_slice(&[0x60, 0x00]);
        accounts.set_code(address, code.clone());
        vm.state_mut().set_code(address, code);
        vm.state_mut()
            .sstore(address, U256::zero(), U256::from(5));

        let inspector = StateInspector::new(&accounts, &vm);
        let state = inspector.inspect_address(address);
        assert!(state.is_contract);
        assert_eq!(state.code_size, 2);
        assert_eq!(state.storage_slots[&U256::zero()], U256::from(5));
        assert!(inspector.is_contract(address));
    }

    #[test]
    fn test_format_balance() {
        assert_eq!(format_balance(U256::zero()), "0 ETH");
        assert_eq!(format_balance(eth_to_wei(100)), "100 ETH");
        assert_eq!(format_balance(eth_to_wei(1)), "1 ETH");

        // 0.5 ETH
        let half = eth_to_wei(1) / 2;
        assert_eq!(format_balance(half), "0.50 ETH");

        // 1.25 ETH
        let one_and_quarter = eth_to_wei(5) / 4;
        assert_eq!(format_balance(one_and_quarter), "1.25 ETH");

        // Truncation, not rounding: 0.999... with dust renders as 0.99.
        let dusty = eth_to_wei(1) - U256::from(1);
        assert_eq!(format_balance(dusty), "0.99 ETH");
    }

    #[test]
    fn test_format_balance_short() {
        assert_eq!(format_balance_short(eth_to_wei(100)), "100");
        assert_eq!(format_balance_short(eth_to_wei(1) / 2), "0.50");
    }
}
