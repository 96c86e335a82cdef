//! # Session
//!
//! The aggregate that wires the VM, accounts, registry, history, blockchain
//! and persistence into one execution pipeline. The TUI owns exactly one
//! session and drives it from the command worker; the replayer drives the
//! same pipeline at boot.

use crate::accounts::{eth_to_wei, AccountManager};
use crate::chain::{Blockchain, Transaction};
use crate::config::ChopConfig;
use crate::engine::ExecutionEngine;
use crate::errors::EngineError;
use crate::fixtures::Fixture;
use crate::history::HistoryManager;
use crate::inspector::StateInspector;
use crate::params::{CallParameters, CallResult, ParsedCall, DEFAULT_TARGET};
use crate::persist;
use crate::registry::ContractRegistry;
use chop_evm::{BlockEnv, VmManager};
use chop_types::{Address, Bytes};
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use tracing::{info, warn};

/// Everything one executed call produced, for the UI and the tests.
#[derive(Clone, Debug)]
pub struct ExecutionRecord {
    /// The captured result.
    pub result: CallResult,
    /// Id assigned by the history manager.
    pub history_id: u64,
    /// Block the call landed in.
    pub block_number: u64,
    /// The synthesized transaction.
    pub transaction: Transaction,
    /// Set when the persistence append failed; shown as a feedback
    /// message, never an execution failure.
    pub persist_warning: Option<String>,
}

/// The one-per-process session.
pub struct Session {
    /// Operator configuration.
    pub config: ChopConfig,
    /// The embedded EVM.
    pub vm: VmManager,
    /// Test accounts and the mirrored post-execution store.
    pub accounts: AccountManager,
    /// Deployed contracts.
    pub registry: ContractRegistry,
    /// Past executions.
    pub history: HistoryManager,
    /// The synthetic ledger.
    pub chain: Blockchain,
    state_path: Option<PathBuf>,
    persisting: bool,
}

impl Session {
    /// Builds a session: derived accounts funded into a fresh VM, a genesis
    /// chain and (optionally) a persistence path. Pass `None` as the path
    /// to keep the session memory-only.
    #[must_use]
    pub fn new(seed: Option<[u8; 32]>, config: ChopConfig, state_path: Option<PathBuf>) -> Self {
        let accounts = AccountManager::new(
            seed,
            config.accounts.count,
            eth_to_wei(config.accounts.initial_balance_eth),
        );
        let mut chain = Blockchain::new();
        chain.set_gas_limit(config.gas_limit);

        let mut vm = VmManager::new(BlockEnv {
            gas_limit: config.gas_limit,
            ..BlockEnv::default()
        });
        accounts.fund_vm(vm.state_mut());

        Self {
            config,
            vm,
            accounts,
            registry: ContractRegistry::new(),
            history: HistoryManager::new(),
            chain,
            state_path,
            persisting: true,
        }
    }

    /// The persistence path, when the session persists at all.
    #[must_use]
    pub fn state_path(&self) -> Option<&PathBuf> {
        self.state_path.as_ref()
    }

    /// Read-only state queries.
    #[must_use]
    pub fn inspector(&self) -> StateInspector<'_> {
        StateInspector::new(&self.accounts, &self.vm)
    }

    /// Executes one call now.
    ///
    /// # Errors
    ///
    /// `InvalidParameters` when validation rejects the set. VM-level
    /// failures are not errors; they come back in the record.
    pub fn execute(&mut self, params: &CallParameters) -> Result<ExecutionRecord, EngineError> {
        self.execute_at(params, Utc::now())
    }

    /// Executes one call at an explicit timestamp. Live execution passes
    /// now; replay passes the persisted timestamp so blocks, hashes and
    /// history come out identical to the original run.
    ///
    /// # Errors
    ///
    /// `InvalidParameters` when validation rejects the set.
    pub fn execute_at(
        &mut self,
        params: &CallParameters,
        timestamp: DateTime<Utc>,
    ) -> Result<ExecutionRecord, EngineError> {
        let parsed = ParsedCall::from_parameters(params)?;
        let nonce_before = self.vm.state().nonce_of(parsed.caller);
        let unix = timestamp.timestamp().max(0) as u64;

        // The executing code sees the block it will land in.
        self.vm.set_block_env(BlockEnv {
            number: self.chain.height() + 1,
            timestamp: unix,
            gas_limit: self.chain.get_gas_limit(),
            ..BlockEnv::default()
        });

        let result = ExecutionEngine::execute_parsed(&mut self.vm, &parsed);

        // Message-call transactions advance the sender nonce. CREATE*
        // bumps inside the VM as part of address derivation, and
        // STATICCALL leaves every account untouched.
        if matches!(
            parsed.call_type,
            crate::params::CallType::Call | crate::params::CallType::DelegateCall
        ) {
            self.vm.state_mut().bump_nonce(parsed.caller);
        }

        if let Some(deployed) = result.deployed_address {
            let runtime = self.vm.state().code_of(deployed);
            self.registry.add(deployed, runtime.clone(), timestamp);
            self.accounts.set_code(deployed, runtime);
        }
        self.accounts.mirror_from_vm(self.vm.state());

        // Persistence first, then history, then the chain; a persistence
        // failure surfaces as a warning and nothing else.
        let persist_warning = self.append_to_log(params, timestamp);
        let history_id = self
            .history
            .add_call(params.clone(), result.clone(), timestamp);
        let (block_number, transaction) =
            self.chain
                .add_call_result(&parsed, &result, nonce_before, unix);

        Ok(ExecutionRecord {
            result,
            history_id,
            block_number,
            transaction,
            persist_warning,
        })
    }

    fn append_to_log(
        &mut self,
        params: &CallParameters,
        timestamp: DateTime<Utc>,
    ) -> Option<String> {
        if !self.persisting {
            return None;
        }
        let path = self.state_path.as_ref()?;
        let record = persist::from_call_parameters(params, timestamp);
        match persist::append_call(path, record) {
            Ok(()) => None,
            Err(err) => {
                warn!(%err, "persistence append failed");
                Some(format!("state file append failed: {err}"))
            }
        }
    }

    /// Disables or re-enables the persistence append. The replayer turns
    /// it off while re-executing the log it is reading.
    pub fn set_persisting(&mut self, persisting: bool) {
        self.persisting = persisting;
    }

    /// Installs runtime code directly at an address (fixture loading,
    /// scenario setup). Session-local: not recorded in the call log.
    pub fn set_code(&mut self, address: Address, code: Bytes) {
        self.vm.state_mut().set_code(address, code.clone());
        self.accounts.set_code(address, code);
    }

    /// Loads a fixture: installs its bytecode at the fixture target and
    /// returns the parameters ready to execute.
    #[must_use]
    pub fn load_fixture(&mut self, fixture: &Fixture) -> CallParameters {
        if let Ok(code) = Bytes::parse(&fixture.bytecode) {
            if let Ok(target) = Address::parse(DEFAULT_TARGET) {
                self.set_code(target, code);
            }
        }
        fixture.to_parameters()
    }

    /// Full reset: truncate the call log, drop the chain back to genesis,
    /// reseed the VM and re-derive the same accounts from the same seed.
    pub fn reset(&mut self) -> Option<String> {
        let warning = match (self.persisting, self.state_path.as_ref()) {
            (true, Some(path)) => persist::clear_state_file(path)
                .err()
                .map(|err| format!("state file truncate failed: {err}")),
            _ => None,
        };

        let seed = self.accounts.seed();
        self.accounts = AccountManager::new(
            Some(seed),
            self.config.accounts.count,
            eth_to_wei(self.config.accounts.initial_balance_eth),
        );
        self.chain.reset();
        self.vm.reset(BlockEnv {
            gas_limit: self.chain.get_gas_limit(),
            ..BlockEnv::default()
        });
        self.accounts.fund_vm(self.vm.state_mut());
        self.registry.clear();
        self.history.clear();
        info!("session reset");
        warning
    }

    /// Re-derives the account set from a fresh random seed and restarts
    /// the session state around it.
    pub fn regenerate_accounts(&mut self) -> Option<String> {
        self.accounts = AccountManager::new(
            None,
            self.config.accounts.count,
            eth_to_wei(self.config.accounts.initial_balance_eth),
        );
        let warning = match (self.persisting, self.state_path.as_ref()) {
            (true, Some(path)) => persist::clear_state_file(path)
                .err()
                .map(|err| format!("state file truncate failed: {err}")),
            _ => None,
        };
        self.chain.reset();
        self.vm.reset(BlockEnv {
            gas_limit: self.chain.get_gas_limit(),
            ..BlockEnv::default()
        });
        self.accounts.fund_vm(self.vm.state_mut());
        self.registry.clear();
        self.history.clear();
        warning
    }

    /// Applies a new block gas limit to future blocks and the config.
    pub fn set_gas_limit(&mut self, gas_limit: u64) {
        self.chain.set_gas_limit(gas_limit);
        self.config.gas_limit = self.chain.get_gas_limit();
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::CallType;

    const SEED: [u8; 32] = [0x01; 32];

    fn session() -> Session {
        Session::new(Some(SEED), ChopConfig::default(), None)
    }

    fn first_account(session: &Session) -> Address {
        session.accounts.all()[0].address
    }

    #[test]
    fn test_execute_simple_call_grows_chain_and_history() {
        let mut session = session();
        let caller = first_account(&session);
        let target = Address::parse(DEFAULT_TARGET).unwrap();
        session.set_code(target, Bytes::from_slice(&[0x00])); // STOP

        let params = CallParameters::defaults(caller);
        let record = session.execute(&params).unwrap();

        assert!(record.result.success);
        assert_eq!(record.block_number, 1);
        assert_eq!(session.chain.height(), 1);
        assert_eq!(session.history.len(), 1);
        assert_eq!(record.transaction.nonce, 0);
        assert_eq!(session.accounts.get(caller).unwrap().nonce, 1);
    }

    #[test]
    fn test_staticcall_leaves_accounts_untouched() {
        let mut session = session();
        let caller = first_account(&session);
        let target = Address::parse(DEFAULT_TARGET).unwrap();
        session.set_code(target, Bytes::from_slice(&[0x00]));

        let balance_before = session.accounts.get(caller).unwrap().balance;
        let mut params = CallParameters::defaults(caller);
        params.call_type = CallType::StaticCall;

        let record = session.execute(&params).unwrap();
        assert!(record.result.success);
        assert_eq!(session.accounts.get(caller).unwrap().nonce, 0);
        assert_eq!(session.accounts.get(caller).unwrap().balance, balance_before);
    }

    #[test]
    fn test_create_registers_contract() {
        let mut session = session();
        let caller = first_account(&session);

        let mut params = CallParameters::defaults(caller);
        params.call_type = CallType::Create;
        // PUSH5 6005600055 PUSH1 00 MSTORE PUSH1 05 PUSH1 1B RETURN
        params.input_data = "0x6460056000556000526005601bf3".to_string();

        let record = session.execute(&params).unwrap();
        assert!(record.result.success, "{}", record.result.error_info);

        let deployed = record.result.deployed_address.unwrap();
        let contract = session.registry.get(deployed).unwrap();
        assert_eq!(contract.bytecode.as_slice(), &[0x60, 0x05, 0x60, 0x00, 0x55]);
        assert!(session.accounts.get(deployed).unwrap().is_contract());
        assert_eq!(session.accounts.get(caller).unwrap().nonce, 1);
    }

    #[test]
    fn test_failed_call_still_recorded() {
        let mut session = session();
        let caller = first_account(&session);
        let target = Address::parse(DEFAULT_TARGET).unwrap();
        // PUSH1 00 PUSH1 00 REVERT
        session.set_code(target, Bytes::from_slice(&[0x60, 0x00, 0x60, 0x00, 0xFD]));

        let params = CallParameters::defaults(caller);
        let record = session.execute(&params).unwrap();

        assert!(!record.result.success);
        assert!(!record.transaction.status);
        assert_eq!(session.chain.height(), 1);
        assert_eq!(session.history.len(), 1);
    }

    #[test]
    fn test_invalid_parameters_touch_nothing() {
        let mut session = session();
        let caller = first_account(&session);
        let mut params = CallParameters::defaults(caller);
        params.gas_limit = "0".to_string();

        assert!(session.execute(&params).is_err());
        assert_eq!(session.chain.height(), 0);
        assert!(session.history.is_empty());
    }

    #[test]
    fn test_value_transfer_moves_balance() {
        let mut session = session();
        let caller = first_account(&session);
        let receiver = session.accounts.all()[1].address;

        let mut params = CallParameters::defaults(caller);
        params.target = receiver.to_hex();
        params.value = "1000000000000000000".to_string(); // 1 ETH

        let record = session.execute(&params).unwrap();
        assert!(record.result.success);
        assert_eq!(
            session.accounts.get(receiver).unwrap().balance,
            eth_to_wei(101)
        );
    }

    #[test]
    fn test_reset_restores_initial_state() {
        let mut session = session();
        let caller = first_account(&session);
        let target = Address::parse(DEFAULT_TARGET).unwrap();
        session.set_code(target, Bytes::from_slice(&[0x00]));
        session.execute(&CallParameters::defaults(caller)).unwrap();

        let warning = session.reset();
        assert!(warning.is_none());
        assert_eq!(session.chain.height(), 0);
        assert!(session.history.is_empty());
        assert_eq!(session.registry.count(), 0);
        // Same seed, same addresses, fresh balances.
        assert_eq!(first_account(&session), caller);
        assert_eq!(
            session.accounts.get(caller).unwrap().balance,
            eth_to_wei(100)
        );
        assert_eq!(session.vm.state().nonce_of(caller), 0);
    }

    #[test]
    fn test_block_env_tracks_chain() {
        let mut session = session();
        let caller = first_account(&session);
        let target = Address::parse(DEFAULT_TARGET).unwrap();
        // NUMBER PUSH1 00 MSTORE PUSH1 20 PUSH1 00 RETURN
        session.set_code(
            target,
            Bytes::from_slice(&[0x43, 0x60, 0x00, 0x52, 0x60, 0x20, 0x60, 0x00, 0xF3]),
        );

        let params = CallParameters::defaults(caller);
        let first = session.execute(&params).unwrap();
        let second = session.execute(&params).unwrap();

        assert_eq!(first.result.return_data.as_slice()[31], 1);
        assert_eq!(second.result.return_data.as_slice()[31], 2);
    }

    #[test]
    fn test_gas_limit_setting_applies() {
        let mut session = session();
        session.set_gas_limit(12_000_000);
        assert_eq!(session.chain.get_gas_limit(), 12_000_000);
        assert_eq!(session.config.gas_limit, 12_000_000);
    }
}
