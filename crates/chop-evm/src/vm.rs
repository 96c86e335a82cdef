//! # VM Manager
//!
//! Owns the world state and runs top-level calls and creations. Implements
//! [`Host`] so the interpreter can recurse into nested frames against the
//! same state, with per-frame checkpoints for revert semantics.

use crate::env::BlockEnv;
use crate::errors::VmError;
use crate::gas::costs;
use crate::interpreter::{
    CallRequest, CreateRequest, FrameContext, FrameOutcome, Host, Interpreter, MAX_CALL_DEPTH,
};
use crate::log::LogEntry;
use crate::state::VmState;
use crate::transient::TransientStorage;
use chop_types::{keccak256, u256_to_be_bytes, Address, Bytes, Hash, U256};
use std::collections::HashSet;
use tracing::debug;

/// Top-level call kinds the execution engine dispatches.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallKind {
    /// Normal message call against the target's code.
    Call,
    /// Read-only call; any state mutation fails with `WriteProtection`.
    StaticCall,
    /// Run the target's code against the caller's storage.
    DelegateCall,
}

/// A top-level message.
#[derive(Clone, Debug)]
pub struct VmMessage {
    /// Sender.
    pub caller: Address,
    /// Target (ignored for creations).
    pub target: Address,
    /// Value in wei.
    pub value: U256,
    /// Calldata or init code.
    pub data: Bytes,
    /// Gas budget for the frame.
    pub gas_limit: u64,
    /// CREATE2 salt; None selects nonce-based CREATE.
    pub salt: Option<U256>,
}

/// Result of one top-level execution.
#[derive(Clone, Debug)]
pub struct VmOutcome {
    /// True on normal completion.
    pub success: bool,
    /// Return data (or revert payload).
    pub output: Bytes,
    /// Gas left in the top frame.
    pub gas_left: u64,
    /// Logs emitted by the transaction, empty on failure.
    pub logs: Vec<LogEntry>,
    /// Deployed contract address (creations only).
    pub deployed: Option<Address>,
    /// Failure classification, None on success.
    pub error: Option<VmError>,
}

/// The embedded EVM instance.
pub struct VmManager {
    state: VmState,
    block: BlockEnv,
    transient: TransientStorage,
    warm_accounts: HashSet<Address>,
    warm_slots: HashSet<(Address, U256)>,
    logs: Vec<LogEntry>,
    origin: Address,
}

impl VmManager {
    /// Creates a VM over an empty state.
    #[must_use]
    pub fn new(block: BlockEnv) -> Self {
        Self {
            state: VmState::new(),
            block,
            transient: TransientStorage::new(),
            warm_accounts: HashSet::new(),
            warm_slots: HashSet::new(),
            logs: Vec::new(),
            origin: Address::ZERO,
        }
    }

    /// Read access to the world state.
    #[must_use]
    pub fn state(&self) -> &VmState {
        &self.state
    }

    /// Write access to the world state (account funding, SetCode).
    pub fn state_mut(&mut self) -> &mut VmState {
        &mut self.state
    }

    /// The current block environment.
    #[must_use]
    pub fn block_env(&self) -> &BlockEnv {
        &self.block
    }

    /// Replaces the block environment before a top-level execution.
    pub fn set_block_env(&mut self, block: BlockEnv) {
        self.block = block;
    }

    /// Drops all state and starts over on a fresh environment.
    pub fn reset(&mut self, block: BlockEnv) {
        self.state = VmState::new();
        self.block = block;
        self.transient.clear();
        self.warm_accounts.clear();
        self.warm_slots.clear();
        self.logs.clear();
    }

    /// Executes a top-level message call.
    pub fn call(&mut self, kind: CallKind, msg: &VmMessage) -> VmOutcome {
        self.begin_transaction(msg.caller, msg.target);
        debug!(kind = ?kind, caller = %msg.caller, target = %msg.target, gas = msg.gas_limit, "vm call");

        let request = match kind {
            CallKind::Call => CallRequest {
                gas: msg.gas_limit,
                code_address: msg.target,
                address: msg.target,
                caller: msg.caller,
                value: msg.value,
                transfer_value: msg.value,
                input: msg.data.clone(),
                is_static: false,
                depth: 0,
            },
            CallKind::StaticCall => CallRequest {
                gas: msg.gas_limit,
                code_address: msg.target,
                address: msg.target,
                caller: msg.caller,
                value: U256::zero(),
                transfer_value: U256::zero(),
                input: msg.data.clone(),
                is_static: true,
                depth: 0,
            },
            CallKind::DelegateCall => CallRequest {
                gas: msg.gas_limit,
                code_address: msg.target,
                address: msg.caller,
                caller: msg.caller,
                value: msg.value,
                transfer_value: U256::zero(),
                input: msg.data.clone(),
                is_static: false,
                depth: 0,
            },
        };

        let outcome = self.call_frame(request);
        self.finish_transaction(outcome, None)
    }

    /// Executes a top-level contract creation. `msg.salt` selects CREATE2.
    pub fn create(&mut self, msg: &VmMessage) -> VmOutcome {
        self.begin_transaction(msg.caller, Address::ZERO);
        debug!(caller = %msg.caller, salted = msg.salt.is_some(), gas = msg.gas_limit, "vm create");

        let request = CreateRequest {
            gas: msg.gas_limit,
            caller: msg.caller,
            value: msg.value,
            init_code: msg.data.clone(),
            salt: msg.salt,
            depth: 0,
        };

        let outcome = self.create_frame(request);
        let deployed = outcome.created;
        self.finish_transaction(outcome, deployed)
    }

    fn begin_transaction(&mut self, caller: Address, target: Address) {
        self.transient.clear();
        self.warm_accounts.clear();
        self.warm_slots.clear();
        self.logs.clear();
        self.origin = caller;

        // EIP-2929 pre-warms the transaction's principals.
        self.warm_accounts.insert(caller);
        self.warm_accounts.insert(target);
        self.warm_accounts.insert(self.block.coinbase);
    }

    fn finish_transaction(&mut self, outcome: FrameOutcome, deployed: Option<Address>) -> VmOutcome {
        let logs = if outcome.success {
            std::mem::take(&mut self.logs)
        } else {
            self.logs.clear();
            Vec::new()
        };
        VmOutcome {
            success: outcome.success,
            output: outcome.output,
            gas_left: outcome.gas_left,
            logs,
            deployed: deployed.filter(|_| outcome.success),
            error: outcome.error,
        }
    }

    /// Runs one message-call frame with checkpointed state.
    fn call_frame(&mut self, request: CallRequest) -> FrameOutcome {
        if request.depth > MAX_CALL_DEPTH {
            return FrameOutcome {
                success: false,
                output: Bytes::new(),
                gas_left: request.gas,
                created: None,
                error: Some(VmError::CallDepthExceeded(request.depth)),
            };
        }

        let checkpoint = self.state.checkpoint();
        let log_mark = self.logs.len();

        if let Err(err) = self
            .state
            .transfer(request.caller, request.address, request.transfer_value)
        {
            return FrameOutcome {
                success: false,
                output: Bytes::new(),
                gas_left: request.gas,
                created: None,
                error: Some(err),
            };
        }

        let code = self.state.code_of(request.code_address);
        if code.is_empty() {
            // Plain transfer or call to an empty account.
            return FrameOutcome {
                success: true,
                output: Bytes::new(),
                gas_left: request.gas,
                created: None,
                error: None,
            };
        }

        let context = FrameContext {
            address: request.address,
            caller: request.caller,
            origin: self.origin,
            value: request.value,
            calldata: request.input,
            gas_limit: request.gas,
            is_static: request.is_static,
            depth: request.depth,
        };

        let mut interp = Interpreter::new(context, code);
        match interp.run(self) {
            Ok(output) => FrameOutcome {
                success: true,
                output,
                gas_left: interp.gas_remaining(),
                created: None,
                error: None,
            },
            Err(err) => {
                self.state.revert_to(checkpoint);
                self.logs.truncate(log_mark);
                let (output, gas_left) = match &err {
                    VmError::Revert(data) => (data.clone(), interp.gas_remaining()),
                    _ => (Bytes::new(), 0),
                };
                FrameOutcome {
                    success: false,
                    output,
                    gas_left,
                    created: None,
                    error: Some(err),
                }
            }
        }
    }

    /// Runs one creation frame with checkpointed state.
    fn create_frame(&mut self, request: CreateRequest) -> FrameOutcome {
        if request.depth > MAX_CALL_DEPTH {
            return FrameOutcome {
                success: false,
                output: Bytes::new(),
                gas_left: request.gas,
                created: None,
                error: Some(VmError::CallDepthExceeded(request.depth)),
            };
        }

        let new_address = match request.salt {
            Some(salt) => create2_address(request.caller, salt, request.init_code.as_slice()),
            None => create_address(request.caller, self.state.nonce_of(request.caller)),
        };

        // Address collision: an account with code or a used nonce blocks it.
        if let Some(existing) = self.state.account(new_address) {
            if existing.is_contract() || existing.nonce > 0 {
                return FrameOutcome::failure(VmError::Internal(format!(
                    "address collision at {new_address:?}"
                )));
            }
        }

        let checkpoint = self.state.checkpoint();
        let log_mark = self.logs.len();

        if let Err(err) =
            self.state
                .transfer(request.caller, new_address, request.value)
        {
            return FrameOutcome {
                success: false,
                output: Bytes::new(),
                gas_left: request.gas,
                created: None,
                error: Some(err),
            };
        }
        self.warm_accounts.insert(new_address);

        let context = FrameContext {
            address: new_address,
            caller: request.caller,
            origin: self.origin,
            value: request.value,
            calldata: Bytes::new(),
            gas_limit: request.gas,
            is_static: false,
            depth: request.depth,
        };

        let mut interp = Interpreter::new(context, request.init_code);
        match interp.run(self) {
            Ok(runtime_code) => {
                let mut gas_left = interp.gas_remaining();
                let deposit = costs::CODE_DEPOSIT * runtime_code.len() as u64;
                if deposit > gas_left {
                    self.state.revert_to(checkpoint);
                    self.logs.truncate(log_mark);
                    return FrameOutcome::failure(VmError::OutOfGas);
                }
                gas_left -= deposit;

                self.state.set_code(new_address, runtime_code);
                self.state.bump_nonce(request.caller);

                FrameOutcome {
                    success: true,
                    output: Bytes::new(),
                    gas_left,
                    created: Some(new_address),
                    error: None,
                }
            }
            Err(err) => {
                self.state.revert_to(checkpoint);
                self.logs.truncate(log_mark);
                let (output, gas_left) = match &err {
                    VmError::Revert(data) => (data.clone(), interp.gas_remaining()),
                    _ => (Bytes::new(), 0),
                };
                FrameOutcome {
                    success: false,
                    output,
                    gas_left,
                    created: None,
                    error: Some(err),
                }
            }
        }
    }

    fn touch_account(&mut self, address: Address) -> bool {
        self.warm_accounts.insert(address)
    }

    fn touch_slot(&mut self, address: Address, key: U256) -> bool {
        self.warm_slots.insert((address, key))
    }
}

impl Host for VmManager {
    fn block(&self) -> &BlockEnv {
        &self.block
    }

    fn balance(&mut self, address: Address) -> (U256, bool) {
        let cold = self.touch_account(address);
        (self.state.balance_of(address), cold)
    }

    fn code(&mut self, address: Address) -> (Bytes, bool) {
        let cold = self.touch_account(address);
        (self.state.code_of(address), cold)
    }

    fn code_hash(&mut self, address: Address) -> (Hash, bool) {
        let cold = self.touch_account(address);
        let hash = match self.state.account(address) {
            None => Hash::ZERO,
            Some(account) => keccak256(account.code.as_slice()),
        };
        (hash, cold)
    }

    fn sload(&mut self, address: Address, key: U256) -> (U256, bool) {
        let cold = self.touch_slot(address, key);
        (self.state.sload(address, key), cold)
    }

    fn sstore(&mut self, address: Address, key: U256, value: U256) -> bool {
        let cold = self.touch_slot(address, key);
        self.state.sstore(address, key, value);
        cold
    }

    fn tload(&self, address: Address, key: U256) -> U256 {
        self.transient.load(address, key)
    }

    fn tstore(&mut self, address: Address, key: U256, value: U256) {
        self.transient.store(address, key, value);
    }

    fn log(&mut self, entry: LogEntry) {
        self.logs.push(entry);
    }

    fn call(&mut self, request: CallRequest) -> FrameOutcome {
        self.call_frame(request)
    }

    fn create(&mut self, request: CreateRequest) -> FrameOutcome {
        self.create_frame(request)
    }

    fn selfdestruct(&mut self, address: Address, beneficiary: Address) -> bool {
        let cold = self.touch_account(beneficiary);
        let balance = self.state.balance_of(address);
        if !balance.is_zero() && address != beneficiary {
            let _ = self.state.transfer(address, beneficiary, balance);
        }
        self.state.remove_account(address);
        cold
    }
}

// =============================================================================
// ADDRESS DERIVATION
// =============================================================================

/// CREATE address: keccak256(rlp([sender, nonce]))[12..].
///
/// Per the Yellow Paper, section 7.
#[must_use]
pub fn create_address(sender: Address, nonce: u64) -> Address {
    // RLP encode [sender, nonce]. The address is a 20-byte string (0x94
    // header); the nonce is a minimal big-endian integer.
    let mut content = Vec::with_capacity(32);
    content.push(0x80 + 20);
    content.extend_from_slice(sender.as_bytes());

    if nonce == 0 {
        content.push(0x80);
    } else if nonce < 0x80 {
        content.push(nonce as u8);
    } else {
        let bytes = nonce.to_be_bytes();
        let first = bytes.iter().position(|&b| b != 0).unwrap_or(7);
        let trimmed = &bytes[first..];
        content.push(0x80 + trimmed.len() as u8);
        content.extend_from_slice(trimmed);
    }

    let mut rlp = Vec::with_capacity(content.len() + 1);
    rlp.push(0xC0 + content.len() as u8);
    rlp.extend_from_slice(&content);

    let hash = keccak256(&rlp);
    Address::from_slice(&hash.as_bytes()[12..]).unwrap_or(Address::ZERO)
}

/// CREATE2 address: keccak256(0xff ++ sender ++ salt ++ keccak256(init))[12..].
///
/// Per EIP-1014; independent of the sender's nonce.
#[must_use]
pub fn create2_address(sender: Address, salt: U256, init_code: &[u8]) -> Address {
    let code_hash = keccak256(init_code);
    let mut preimage = Vec::with_capacity(1 + 20 + 32 + 32);
    preimage.push(0xFF);
    preimage.extend_from_slice(sender.as_bytes());
    preimage.extend_from_slice(&u256_to_be_bytes(salt));
    preimage.extend_from_slice(code_hash.as_bytes());

    let hash = keccak256(&preimage);
    Address::from_slice(&hash.as_bytes()[12..]).unwrap_or(Address::ZERO)
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

    fn funded_vm() -> VmManager {
        let mut vm = VmManager::new(BlockEnv::default());
        vm.state_mut()
            .set_balance(addr(1), U256::from(10).pow(U256::from(20)));
        vm
    }

    fn msg_to(target: Address, data: &[u8]) -> VmMessage {
        VmMessage {
            caller: addr(1),
            target,
            value: U256::zero(),
            data: Bytes::from_slice(data),
            gas_limit: 1_000_000,
            salt: None,
        }
    }

    // PUSH1 05 PUSH1 0A ADD PUSH1 03 MSTORE PUSH1 03 PUSH1 20 MSTORE
    // PUSH1 20 PUSH1 00 RETURN
    const ADD_CODE: &[u8] = &[
        0x60, 0x05, 0x60, 0x0A, 0x01, 0x60, 0x03, 0x52, 0x60, 0x03, 0x60, 0x20, 0x52, 0x60, 0x20,
        0x60, 0x00, 0xF3,
    ];

    #[test]
    fn test_simple_add_call() {
        let mut vm = funded_vm();
        let target = addr(0x10);
        vm.state_mut().set_code(target, Bytes::from_slice(ADD_CODE));

        let outcome = vm.call(CallKind::Call, &msg_to(target, &[]));
        assert!(outcome.success, "error: {:?}", outcome.error);
        assert_eq!(outcome.output.len(), 32);
        assert!(outcome.gas_left < 1_000_000);
        assert!(outcome.gas_left > 999_900);
    }

    #[test]
    fn test_revert_call() {
        let mut vm = funded_vm();
        let target = addr(0x10);
        // PUSH1 00 PUSH1 00 REVERT
        vm.state_mut()
            .set_code(target, Bytes::from_slice(&[0x60, 0x00, 0x60, 0x00, 0xFD]));

        let outcome = vm.call(CallKind::Call, &msg_to(target, &[]));
        assert!(!outcome.success);
        assert!(matches!(outcome.error, Some(VmError::Revert(_))));
        assert!(outcome.gas_left < 1_000_000);
    }

    #[test]
    fn test_staticcall_rejects_sstore() {
        let mut vm = funded_vm();
        let target = addr(0x10);
        // PUSH1 05 PUSH1 00 SSTORE STOP
        vm.state_mut()
            .set_code(target, Bytes::from_slice(&[0x60, 0x05, 0x60, 0x00, 0x55, 0x00]));

        let before = vm.state().storage_of(target);
        let outcome = vm.call(CallKind::StaticCall, &msg_to(target, &[]));
        assert!(!outcome.success);
        assert_eq!(outcome.error, Some(VmError::WriteProtection));
        assert_eq!(vm.state().storage_of(target), before);
        assert!(outcome.logs.is_empty());
    }

    #[test]
    fn test_call_writes_storage() {
        let mut vm = funded_vm();
        let target = addr(0x10);
        // PUSH1 05 PUSH1 00 SSTORE STOP
        vm.state_mut()
            .set_code(target, Bytes::from_slice(&[0x60, 0x05, 0x60, 0x00, 0x55, 0x00]));

        let outcome = vm.call(CallKind::Call, &msg_to(target, &[]));
        assert!(outcome.success, "error: {:?}", outcome.error);
        assert_eq!(vm.state().sload(target, U256::zero()), U256::from(5));
    }

    #[test]
    fn test_delegatecall_writes_caller_storage() {
        let mut vm = funded_vm();
        let library = addr(0x10);
        vm.state_mut()
            .set_code(library, Bytes::from_slice(&[0x60, 0x05, 0x60, 0x00, 0x55, 0x00]));

        let outcome = vm.call(CallKind::DelegateCall, &msg_to(library, &[]));
        assert!(outcome.success, "error: {:?}", outcome.error);
        // The write lands on the caller, not the library.
        assert_eq!(vm.state().sload(addr(1), U256::zero()), U256::from(5));
        assert_eq!(vm.state().sload(library, U256::zero()), U256::zero());
    }

    #[test]
    fn test_create_deploys_runtime_code() {
        let mut vm = funded_vm();
        // PUSH5 6005600055 PUSH1 00 MSTORE PUSH1 05 PUSH1 1B RETURN
        // The runtime code lands right-aligned in the stored word; the
        // tail 5 bytes are returned as the deployed code.
        let init = [
            0x64, 0x60, 0x05, 0x60, 0x00, 0x55, 0x60, 0x00, 0x52, 0x60, 0x05, 0x60, 0x1B, 0xF3,
        ];
        let nonce_before = vm.state().nonce_of(addr(1));
        let expected = create_address(addr(1), nonce_before);

        let msg = VmMessage {
            caller: addr(1),
            target: Address::ZERO,
            value: U256::zero(),
            data: Bytes::from_slice(&init),
            gas_limit: 1_000_000,
            salt: None,
        };
        let outcome = vm.create(&msg);
        assert!(outcome.success, "error: {:?}", outcome.error);
        assert_eq!(outcome.deployed, Some(expected));
        assert_eq!(
            vm.state().code_of(expected).as_slice(),
            &[0x60, 0x05, 0x60, 0x00, 0x55]
        );
        assert_eq!(vm.state().nonce_of(addr(1)), nonce_before + 1);
        assert_eq!(vm.state().nonce_of(expected), 1);
    }

    #[test]
    fn test_create2_is_nonce_independent() {
        let init = [0x60, 0x00, 0x60, 0x00, 0xF3]; // returns empty code
        let salt = U256::from(42);

        let run = || {
            let mut vm = funded_vm();
            let msg = VmMessage {
                caller: addr(1),
                target: Address::ZERO,
                value: U256::zero(),
                data: Bytes::from_slice(&init),
                gas_limit: 1_000_000,
                salt: Some(salt),
            };
            vm.create(&msg).deployed.unwrap()
        };

        let first = run();
        let second = run();
        assert_eq!(first, second);
        assert_eq!(first, create2_address(addr(1), salt, &init));
    }

    #[test]
    fn test_out_of_gas() {
        let mut vm = funded_vm();
        let target = addr(0x10);
        // JUMPDEST PUSH1 00 JUMP — infinite loop
        vm.state_mut()
            .set_code(target, Bytes::from_slice(&[0x5B, 0x60, 0x00, 0x56]));

        let mut msg = msg_to(target, &[]);
        msg.gas_limit = 10_000;
        let outcome = vm.call(CallKind::Call, &msg);
        assert!(!outcome.success);
        assert_eq!(outcome.error, Some(VmError::OutOfGas));
        assert_eq!(outcome.gas_left, 0);
    }

    #[test]
    fn test_logs_collected_on_success_only() {
        let mut vm = funded_vm();
        let target = addr(0x10);
        // PUSH1 00 PUSH1 00 LOG0 STOP
        vm.state_mut()
            .set_code(target, Bytes::from_slice(&[0x60, 0x00, 0x60, 0x00, 0xA0, 0x00]));

        let outcome = vm.call(CallKind::Call, &msg_to(target, &[]));
        assert!(outcome.success);
        assert_eq!(outcome.logs.len(), 1);
        assert_eq!(outcome.logs[0].address, target);

        // PUSH1 00 PUSH1 00 LOG0 PUSH1 00 PUSH1 00 REVERT
        vm.state_mut().set_code(
            target,
            Bytes::from_slice(&[0x60, 0x00, 0x60, 0x00, 0xA0, 0x60, 0x00, 0x60, 0x00, 0xFD]),
        );
        let outcome = vm.call(CallKind::Call, &msg_to(target, &[]));
        assert!(!outcome.success);
        assert!(outcome.logs.is_empty());
    }

    #[test]
    fn test_value_transfer_on_plain_call() {
        let mut vm = funded_vm();
        let mut msg = msg_to(addr(2), &[]);
        msg.value = U256::from(1000);

        let outcome = vm.call(CallKind::Call, &msg);
        assert!(outcome.success);
        assert_eq!(vm.state().balance_of(addr(2)), U256::from(1000));
        assert_eq!(outcome.gas_left, 1_000_000);
    }

    #[test]
    fn test_create_address_vectors() {
        // Address derivation matches the canonical RLP construction for
        // small and multi-byte nonces.
        let sender = addr(1);
        let a0 = create_address(sender, 0);
        let a1 = create_address(sender, 1);
        let a128 = create_address(sender, 128);
        let a300 = create_address(sender, 300);
        assert_ne!(a0, a1);
        assert_ne!(a1, a128);
        assert_ne!(a128, a300);
    }
}
