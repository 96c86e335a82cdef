//! # EVM Interpreter
//!
//! Synchronous bytecode execution for a single frame. All world-state access
//! and nested frames (CALL, CREATE and friends) go through the [`Host`]
//! trait, which the VM manager implements against its journaled state.

use crate::env::BlockEnv;
use crate::errors::VmError;
use crate::gas::{self, costs, OPCODE_GAS};
use crate::log::LogEntry;
use crate::memory::Memory;
use crate::opcodes::Opcode;
use crate::stack::Stack;
use chop_types::{keccak256, u256_to_be_bytes, Address, Bytes, Hash, U256};
use std::collections::HashSet;

/// Maximum call depth per the EVM specification.
pub const MAX_CALL_DEPTH: usize = 1024;

/// Safety valve against runaway loops in a development tool.
const MAX_EXECUTION_STEPS: u64 = 50_000_000;

// =============================================================================
// FRAME TYPES
// =============================================================================

/// Everything one frame knows about itself.
#[derive(Clone, Debug)]
pub struct FrameContext {
    /// Context address: owner of storage, pushed by ADDRESS.
    pub address: Address,
    /// Immediate caller (CALLER).
    pub caller: Address,
    /// Transaction originator (ORIGIN).
    pub origin: Address,
    /// Apparent value (CALLVALUE). Zero-transfer for DELEGATECALL.
    pub value: U256,
    /// Input data (CALLDATA*).
    pub calldata: Bytes,
    /// Gas available to the frame.
    pub gas_limit: u64,
    /// True inside STATICCALL: all state mutation is rejected.
    pub is_static: bool,
    /// Frame depth, 0 at the top level.
    pub depth: usize,
}

/// A nested message-call request handed to the host.
#[derive(Clone, Debug)]
pub struct CallRequest {
    /// Gas forwarded to the child frame (63/64 rule and stipend applied).
    pub gas: u64,
    /// Address whose code runs.
    pub code_address: Address,
    /// Context/storage address for the child frame.
    pub address: Address,
    /// CALLER seen by the child.
    pub caller: Address,
    /// CALLVALUE seen by the child.
    pub value: U256,
    /// Value actually moved (zero for DELEGATECALL / STATICCALL).
    pub transfer_value: U256,
    /// Child calldata.
    pub input: Bytes,
    /// Whether the child runs in static mode.
    pub is_static: bool,
    /// Child frame depth.
    pub depth: usize,
}

/// A nested contract-creation request handed to the host.
#[derive(Clone, Debug)]
pub struct CreateRequest {
    /// Gas forwarded to the init frame.
    pub gas: u64,
    /// Creating address.
    pub caller: Address,
    /// Endowment moved to the new contract.
    pub value: U256,
    /// Init code to run.
    pub init_code: Bytes,
    /// CREATE2 salt; None selects nonce-based derivation.
    pub salt: Option<U256>,
    /// Child frame depth.
    pub depth: usize,
}

/// What came back from a nested frame.
#[derive(Clone, Debug)]
pub struct FrameOutcome {
    /// True if the frame completed without halting exceptionally or reverting.
    pub success: bool,
    /// Return or revert data.
    pub output: Bytes,
    /// Unconsumed gas handed back to the parent.
    pub gas_left: u64,
    /// Address of the created contract (create frames only).
    pub created: Option<Address>,
    /// Failure classification, None on success.
    pub error: Option<VmError>,
}

impl FrameOutcome {
    /// A failed frame that consumed all forwarded gas.
    #[must_use]
    pub fn failure(error: VmError) -> Self {
        Self {
            success: false,
            output: Bytes::new(),
            gas_left: 0,
            created: None,
            error: Some(error),
        }
    }
}

/// World-state and nested-frame services required by the interpreter.
///
/// Every method that touches an account or slot also reports whether the
/// access was cold (first touch in this transaction) so the interpreter
/// can charge EIP-2929 pricing.
pub trait Host {
    /// Block environment for the 0x40-range opcodes.
    fn block(&self) -> &BlockEnv;
    /// Balance of an address, plus cold flag.
    fn balance(&mut self, address: Address) -> (U256, bool);
    /// Code of an address, plus cold flag.
    fn code(&mut self, address: Address) -> (Bytes, bool);
    /// Code hash of an address (zero hash for untouched accounts), plus cold flag.
    fn code_hash(&mut self, address: Address) -> (Hash, bool);
    /// Storage read, plus cold flag.
    fn sload(&mut self, address: Address, key: U256) -> (U256, bool);
    /// Storage write, returning the cold flag.
    fn sstore(&mut self, address: Address, key: U256, value: U256) -> bool;
    /// Transient storage read.
    fn tload(&self, address: Address, key: U256) -> U256;
    /// Transient storage write.
    fn tstore(&mut self, address: Address, key: U256, value: U256);
    /// Append a log record.
    fn log(&mut self, entry: LogEntry);
    /// Run a nested message call.
    fn call(&mut self, request: CallRequest) -> FrameOutcome;
    /// Run a nested contract creation.
    fn create(&mut self, request: CreateRequest) -> FrameOutcome;
    /// SELFDESTRUCT: move the balance, schedule removal. Returns the cold
    /// flag for the beneficiary.
    fn selfdestruct(&mut self, address: Address, beneficiary: Address) -> bool;
}

// =============================================================================
// INTERPRETER
// =============================================================================

/// Single-frame interpreter state.
pub struct Interpreter {
    /// Frame context.
    pub context: FrameContext,
    code: Bytes,
    pc: usize,
    stack: Stack,
    memory: Memory,
    return_data: Bytes,
    output: Bytes,
    gas_remaining: u64,
    jump_dests: HashSet<usize>,
    stopped: bool,
    reverted: bool,
}

impl Interpreter {
    /// Creates an interpreter for one frame.
    #[must_use]
    pub fn new(context: FrameContext, code: Bytes) -> Self {
        let gas_remaining = context.gas_limit;
        let jump_dests = analyze_jump_dests(code.as_slice());
        Self {
            context,
            code,
            pc: 0,
            stack: Stack::new(),
            memory: Memory::new(),
            return_data: Bytes::new(),
            output: Bytes::new(),
            gas_remaining,
            jump_dests,
            stopped: false,
            reverted: false,
        }
    }

    /// Gas left in the frame. Meaningful after `run` returns.
    #[must_use]
    pub fn gas_remaining(&self) -> u64 {
        self.gas_remaining
    }

    /// Executes the frame to completion.
    ///
    /// Returns the frame output on normal halt (STOP returns empty).
    ///
    /// # Errors
    ///
    /// `Revert` carries the revert payload and leaves `gas_remaining`
    /// refundable; every other error consumes the frame's gas.
    pub fn run<H: Host>(&mut self, host: &mut H) -> Result<Bytes, VmError> {
        let result = self.run_inner(host);
        match result {
            Ok(()) if self.reverted => {
                let data = std::mem::take(&mut self.output);
                Err(VmError::Revert(data))
            }
            Ok(()) => Ok(std::mem::take(&mut self.output)),
            Err(err) => {
                if !err.refunds_gas() {
                    self.gas_remaining = 0;
                }
                Err(err)
            }
        }
    }

    fn run_inner<H: Host>(&mut self, host: &mut H) -> Result<(), VmError> {
        let mut steps = 0u64;
        while !self.stopped && self.pc < self.code.len() {
            steps += 1;
            if steps > MAX_EXECUTION_STEPS {
                return Err(VmError::Internal("execution step limit reached".into()));
            }

            let byte = self.code.as_slice()[self.pc];
            let opcode = Opcode::from_byte(byte).ok_or(VmError::InvalidOpcode(byte))?;

            self.use_gas(OPCODE_GAS[byte as usize])?;
            self.step(opcode, host)?;
        }
        Ok(())
    }

    fn use_gas(&mut self, amount: u64) -> Result<(), VmError> {
        if amount > self.gas_remaining {
            self.gas_remaining = 0;
            return Err(VmError::OutOfGas);
        }
        self.gas_remaining -= amount;
        Ok(())
    }

    /// Charge the warm/cold account access delta for the 0x31/0x3B/0x3F/call
    /// family (base table carries zero for these).
    fn charge_account_access(&mut self, cold: bool) -> Result<(), VmError> {
        self.use_gas(if cold {
            costs::COLD_ACCOUNT_ACCESS
        } else {
            costs::WARM_ACCOUNT_ACCESS
        })
    }

    fn require_mutable(&self) -> Result<(), VmError> {
        if self.context.is_static {
            Err(VmError::WriteProtection)
        } else {
            Ok(())
        }
    }

    /// Expand memory to cover `offset + size` and charge for it.
    /// Zero-size accesses never touch memory.
    fn touch_memory(&mut self, offset: usize, size: usize) -> Result<(), VmError> {
        if size == 0 {
            return Ok(());
        }
        let end = offset
            .checked_add(size)
            .ok_or(VmError::MemoryLimitExceeded {
                requested: usize::MAX,
                max: crate::memory::MAX_MEMORY_SIZE,
            })?;
        let gas = self.memory.expand(end)?;
        self.use_gas(gas)
    }

    #[allow(clippy::too_many_lines)]
    fn step<H: Host>(&mut self, opcode: Opcode, host: &mut H) -> Result<(), VmError> {
        self.pc += 1;

        match opcode {
            // =================================================================
            // STOP & ARITHMETIC
            // =================================================================
            Opcode::Stop => {
                self.stopped = true;
            }

            Opcode::Add => self.binary_op(|a, b| a.overflowing_add(b).0)?,
            Opcode::Mul => self.binary_op(|a, b| a.overflowing_mul(b).0)?,
            Opcode::Sub => self.binary_op(|a, b| a.overflowing_sub(b).0)?,
            Opcode::Div => self.binary_op(|a, b| {
                if b.is_zero() {
                    U256::zero()
                } else {
                    a / b
                }
            })?,
            Opcode::SDiv => self.binary_op(|a, b| {
                if b.is_zero() {
                    U256::zero()
                } else {
                    signed_div(a, b)
                }
            })?,
            Opcode::Mod => self.binary_op(|a, b| {
                if b.is_zero() {
                    U256::zero()
                } else {
                    a % b
                }
            })?,
            Opcode::SMod => self.binary_op(|a, b| {
                if b.is_zero() {
                    U256::zero()
                } else {
                    signed_mod(a, b)
                }
            })?,

            Opcode::AddMod => {
                let a = self.stack.pop()?;
                let b = self.stack.pop()?;
                let n = self.stack.pop()?;
                let result = if n.is_zero() {
                    U256::zero()
                } else {
                    // 512-bit intermediate to dodge overflow
                    u512_to_u256((u256_to_u512(a) + u256_to_u512(b)) % u256_to_u512(n))
                };
                self.stack.push(result)?;
            }

            Opcode::MulMod => {
                let a = self.stack.pop()?;
                let b = self.stack.pop()?;
                let n = self.stack.pop()?;
                let result = if n.is_zero() {
                    U256::zero()
                } else {
                    u512_to_u256((u256_to_u512(a) * u256_to_u512(b)) % u256_to_u512(n))
                };
                self.stack.push(result)?;
            }

            Opcode::Exp => {
                let base = self.stack.pop()?;
                let exp = self.stack.pop()?;
                self.use_gas(gas::exp_gas_cost(exp) - costs::EXP)?;
                self.stack.push(exp_by_squaring(base, exp))?;
            }

            Opcode::SignExtend => {
                let k = self.stack.pop()?;
                let x = self.stack.pop()?;
                // k >= 31 extends from the top byte, which is the identity.
                let result = if k < U256::from(31) {
                    let bit_index = 8 * k.as_usize() + 7;
                    let mask = (U256::one() << (bit_index + 1)) - 1;
                    if x.bit(bit_index) {
                        x | !mask
                    } else {
                        x & mask
                    }
                } else {
                    x
                };
                self.stack.push(result)?;
            }

            // =================================================================
            // COMPARISON & BITWISE
            // =================================================================
            Opcode::Lt => self.binary_op(|a, b| bool_word(a < b))?,
            Opcode::Gt => self.binary_op(|a, b| bool_word(a > b))?,
            Opcode::SLt => self.binary_op(|a, b| bool_word(signed_lt(a, b)))?,
            Opcode::SGt => self.binary_op(|a, b| bool_word(signed_lt(b, a)))?,
            Opcode::Eq => self.binary_op(|a, b| bool_word(a == b))?,

            Opcode::IsZero => {
                let a = self.stack.pop()?;
                self.stack.push(bool_word(a.is_zero()))?;
            }

            Opcode::And => self.binary_op(|a, b| a & b)?,
            Opcode::Or => self.binary_op(|a, b| a | b)?,
            Opcode::Xor => self.binary_op(|a, b| a ^ b)?,

            Opcode::Not => {
                let a = self.stack.pop()?;
                self.stack.push(!a)?;
            }

            Opcode::Byte => {
                let i = self.stack.pop()?;
                let x = self.stack.pop()?;
                let result = if i < U256::from(32) {
                    U256::from(u256_to_be_bytes(x)[i.as_usize()])
                } else {
                    U256::zero()
                };
                self.stack.push(result)?;
            }

            Opcode::Shl => self.binary_op(|shift, value| {
                if shift >= U256::from(256) {
                    U256::zero()
                } else {
                    value << shift.as_usize()
                }
            })?,
            Opcode::Shr => self.binary_op(|shift, value| {
                if shift >= U256::from(256) {
                    U256::zero()
                } else {
                    value >> shift.as_usize()
                }
            })?,
            Opcode::Sar => self.binary_op(|shift, value| sar(value, shift))?,

            // =================================================================
            // KECCAK256
            // =================================================================
            Opcode::Keccak256 => {
                let offset = self.stack.pop_usize()?;
                let size = self.stack.pop_usize()?;
                self.touch_memory(offset, size)?;
                self.use_gas(gas::keccak256_gas_cost(size) - costs::KECCAK256)?;
                let data = self.memory.read_bytes(offset, size);
                let hash = keccak256(&data);
                self.stack.push(U256::from_big_endian(hash.as_bytes()))?;
            }

            // =================================================================
            // ENVIRONMENTAL INFORMATION
            // =================================================================
            Opcode::Address => self.push_address(self.context.address)?,
            Opcode::Origin => self.push_address(self.context.origin)?,
            Opcode::Caller => self.push_address(self.context.caller)?,
            Opcode::CallValue => self.stack.push(self.context.value)?,

            Opcode::Balance => {
                let address = pop_address(&mut self.stack)?;
                let (balance, cold) = host.balance(address);
                self.charge_account_access(cold)?;
                self.stack.push(balance)?;
            }

            Opcode::SelfBalance => {
                let (balance, _) = host.balance(self.context.address);
                self.stack.push(balance)?;
            }

            Opcode::CallDataLoad => {
                let offset = self.stack.pop_usize()?;
                let mut word = [0u8; 32];
                let data = self.context.calldata.as_slice();
                for (i, byte) in word.iter_mut().enumerate() {
                    let pos = offset.saturating_add(i);
                    if pos < data.len() {
                        *byte = data[pos];
                    }
                }
                self.stack.push(U256::from_big_endian(&word))?;
            }

            Opcode::CallDataSize => {
                self.stack.push(U256::from(self.context.calldata.len()))?;
            }

            Opcode::CallDataCopy => {
                let data = self.context.calldata.clone();
                self.copy_to_memory(data.as_slice())?;
            }

            Opcode::CodeSize => {
                self.stack.push(U256::from(self.code.len()))?;
            }

            Opcode::CodeCopy => {
                let code = self.code.clone();
                self.copy_to_memory(code.as_slice())?;
            }

            Opcode::GasPrice => {
                // No fee market in chop.
                self.stack.push(U256::zero())?;
            }

            Opcode::ExtCodeSize => {
                let address = pop_address(&mut self.stack)?;
                let (code, cold) = host.code(address);
                self.charge_account_access(cold)?;
                self.stack.push(U256::from(code.len()))?;
            }

            Opcode::ExtCodeCopy => {
                let address = pop_address(&mut self.stack)?;
                let (code, cold) = host.code(address);
                self.charge_account_access(cold)?;
                self.copy_to_memory(code.as_slice())?;
            }

            Opcode::ExtCodeHash => {
                let address = pop_address(&mut self.stack)?;
                let (hash, cold) = host.code_hash(address);
                self.charge_account_access(cold)?;
                self.stack.push(U256::from_big_endian(hash.as_bytes()))?;
            }

            Opcode::ReturnDataSize => {
                self.stack.push(U256::from(self.return_data.len()))?;
            }

            Opcode::ReturnDataCopy => {
                let dest_offset = self.stack.pop_usize()?;
                let data_offset = self.stack.pop_usize()?;
                let size = self.stack.pop_usize()?;

                if data_offset.saturating_add(size) > self.return_data.len() {
                    return Err(VmError::ReturnDataOutOfBounds {
                        offset: data_offset,
                        size,
                        available: self.return_data.len(),
                    });
                }

                self.touch_memory(dest_offset, size)?;
                self.use_gas(gas::copy_gas_cost(size))?;
                let slice = &self.return_data.as_slice()[data_offset..data_offset + size];
                let slice = slice.to_vec();
                self.memory.write_bytes(dest_offset, &slice)?;
            }

            // =================================================================
            // BLOCK INFORMATION
            // =================================================================
            Opcode::BlockHash => {
                // No ancestor hashes available; chop synthesizes blocks.
                self.stack.pop()?;
                self.stack.push(U256::zero())?;
            }

            Opcode::Coinbase => self.push_address(host.block().coinbase)?,
            Opcode::Timestamp => {
                let timestamp = host.block().timestamp;
                self.stack.push(U256::from(timestamp))?;
            }
            Opcode::Number => {
                let number = host.block().number;
                self.stack.push(U256::from(number))?;
            }
            Opcode::PrevRandao => {
                let randao = host.block().prev_randao;
                self.stack.push(U256::from_big_endian(randao.as_bytes()))?;
            }
            Opcode::GasLimit => {
                let gas_limit = host.block().gas_limit;
                self.stack.push(U256::from(gas_limit))?;
            }
            Opcode::ChainId => {
                let chain_id = host.block().chain_id;
                self.stack.push(U256::from(chain_id))?;
            }
            Opcode::BaseFee => {
                let base_fee = host.block().base_fee;
                self.stack.push(base_fee)?;
            }

            // =================================================================
            // STACK, MEMORY, STORAGE
            // =================================================================
            Opcode::Pop => {
                self.stack.pop()?;
            }

            Opcode::MLoad => {
                let offset = self.stack.pop_usize()?;
                self.touch_memory(offset, 32)?;
                let word = self.memory.read_word(offset);
                self.stack.push(U256::from_big_endian(&word))?;
            }

            Opcode::MStore => {
                let offset = self.stack.pop_usize()?;
                let value = self.stack.pop()?;
                self.touch_memory(offset, 32)?;
                self.memory.write_word(offset, &u256_to_be_bytes(value))?;
            }

            Opcode::MStore8 => {
                let offset = self.stack.pop_usize()?;
                let value = self.stack.pop()?;
                self.touch_memory(offset, 1)?;
                self.memory.write_byte(offset, value.byte(0))?;
            }

            Opcode::SLoad => {
                let key = self.stack.pop()?;
                let (value, cold) = host.sload(self.context.address, key);
                self.use_gas(if cold {
                    costs::COLD_SLOAD
                } else {
                    costs::WARM_SLOAD
                })?;
                self.stack.push(value)?;
            }

            Opcode::SStore => {
                self.require_mutable()?;
                let key = self.stack.pop()?;
                let value = self.stack.pop()?;

                let (_, cold) = host.sload(self.context.address, key);
                if cold {
                    self.use_gas(costs::COLD_SLOAD)?;
                }
                // Simplified SSTORE schedule: set vs reset by the new value.
                self.use_gas(if value.is_zero() {
                    costs::SSTORE_RESET
                } else {
                    costs::SSTORE_SET
                })?;
                host.sstore(self.context.address, key, value);
            }

            Opcode::Jump => {
                let dest = self.stack.pop_usize()?;
                self.jump_to(dest)?;
            }

            Opcode::JumpI => {
                let dest = self.stack.pop_usize()?;
                let condition = self.stack.pop()?;
                if !condition.is_zero() {
                    self.jump_to(dest)?;
                }
            }

            Opcode::Pc => {
                self.stack.push(U256::from(self.pc - 1))?;
            }

            Opcode::MSize => {
                self.stack.push(U256::from(self.memory.len()))?;
            }

            Opcode::Gas => {
                self.stack.push(U256::from(self.gas_remaining))?;
            }

            Opcode::JumpDest => {
                // Marker only.
            }

            Opcode::TLoad => {
                let key = self.stack.pop()?;
                let value = host.tload(self.context.address, key);
                self.stack.push(value)?;
            }

            Opcode::TStore => {
                self.require_mutable()?;
                let key = self.stack.pop()?;
                let value = self.stack.pop()?;
                host.tstore(self.context.address, key, value);
            }

            Opcode::MCopy => {
                let dest = self.stack.pop_usize()?;
                let src = self.stack.pop_usize()?;
                let size = self.stack.pop_usize()?;
                if size > 0 {
                    self.touch_memory(dest.max(src), size)?;
                    self.use_gas(gas::copy_gas_cost(size))?;
                    self.memory.copy_within(dest, src, size)?;
                }
            }

            // =================================================================
            // PUSH / DUP / SWAP
            // =================================================================
            Opcode::Push0 => {
                self.stack.push(U256::zero())?;
            }

            op if op.is_push() => {
                let size = op.immediate_len();
                let end = (self.pc + size).min(self.code.len());
                let mut word = [0u8; 32];
                let available = end - self.pc;
                if available > 0 {
                    word[32 - size..32 - size + available]
                        .copy_from_slice(&self.code.as_slice()[self.pc..end]);
                }
                self.stack.push(U256::from_big_endian(&word))?;
                self.pc += size;
            }

            op if (0x80..=0x8F).contains(&(op as u8)) => {
                self.stack.dup((op as u8 - 0x80) as usize)?;
            }

            op if (0x90..=0x9F).contains(&(op as u8)) => {
                self.stack.swap((op as u8 - 0x90 + 1) as usize)?;
            }

            // =================================================================
            // LOG OPERATIONS
            // =================================================================
            Opcode::Log0 | Opcode::Log1 | Opcode::Log2 | Opcode::Log3 | Opcode::Log4 => {
                self.require_mutable()?;
                let topic_count = (opcode as u8 - 0xA0) as usize;

                let offset = self.stack.pop_usize()?;
                let size = self.stack.pop_usize()?;
                let mut topics = Vec::with_capacity(topic_count);
                for _ in 0..topic_count {
                    let topic = self.stack.pop()?;
                    topics.push(Hash::new(u256_to_be_bytes(topic)));
                }

                self.touch_memory(offset, size)?;
                self.use_gas(gas::log_gas_cost(size, topic_count) - costs::LOG)?;

                let data = self.memory.read_bytes(offset, size);
                host.log(LogEntry::new(
                    self.context.address,
                    topics,
                    Bytes::from_vec(data),
                ));
            }

            // =================================================================
            // SYSTEM OPERATIONS
            // =================================================================
            Opcode::Return => {
                let offset = self.stack.pop_usize()?;
                let size = self.stack.pop_usize()?;
                self.touch_memory(offset, size)?;
                self.output = Bytes::from_vec(self.memory.read_bytes(offset, size));
                self.stopped = true;
            }

            Opcode::Revert => {
                let offset = self.stack.pop_usize()?;
                let size = self.stack.pop_usize()?;
                self.touch_memory(offset, size)?;
                self.output = Bytes::from_vec(self.memory.read_bytes(offset, size));
                self.stopped = true;
                self.reverted = true;
            }

            Opcode::Invalid => {
                return Err(VmError::InvalidOpcode(0xFE));
            }

            Opcode::Call => self.do_call(host, CallScheme::Call)?,
            Opcode::CallCode => self.do_call(host, CallScheme::CallCode)?,
            Opcode::DelegateCall => self.do_call(host, CallScheme::Delegate)?,
            Opcode::StaticCall => self.do_call(host, CallScheme::Static)?,

            Opcode::Create => self.do_create(host, false)?,
            Opcode::Create2 => self.do_create(host, true)?,

            Opcode::SelfDestruct => {
                self.require_mutable()?;
                let beneficiary = pop_address(&mut self.stack)?;
                let cold = host.selfdestruct(self.context.address, beneficiary);
                if cold {
                    self.use_gas(costs::COLD_ACCOUNT_ACCESS)?;
                }
                self.stopped = true;
            }

            other => {
                return Err(VmError::Internal(format!(
                    "unhandled opcode {}",
                    other.mnemonic()
                )));
            }
        }

        Ok(())
    }

    fn binary_op(&mut self, op: impl FnOnce(U256, U256) -> U256) -> Result<(), VmError> {
        let a = self.stack.pop()?;
        let b = self.stack.pop()?;
        self.stack.push(op(a, b))
    }

    fn push_address(&mut self, address: Address) -> Result<(), VmError> {
        let mut word = [0u8; 32];
        word[12..].copy_from_slice(address.as_bytes());
        self.stack.push(U256::from_big_endian(&word))
    }

    fn jump_to(&mut self, dest: usize) -> Result<(), VmError> {
        if !self.jump_dests.contains(&dest) {
            return Err(VmError::InvalidJump(dest));
        }
        self.pc = dest;
        Ok(())
    }

    /// Shared body of CALLDATACOPY / CODECOPY / EXTCODECOPY: pops
    /// (dest, src, size), charges expansion + copy gas, zero-pads the source.
    fn copy_to_memory(&mut self, source: &[u8]) -> Result<(), VmError> {
        let dest_offset = self.stack.pop_usize()?;
        let src_offset = self.stack.pop_usize()?;
        let size = self.stack.pop_usize()?;

        self.touch_memory(dest_offset, size)?;
        self.use_gas(gas::copy_gas_cost(size))?;

        let mut chunk = vec![0u8; size];
        for (i, byte) in chunk.iter_mut().enumerate() {
            let pos = src_offset.saturating_add(i);
            if pos < source.len() {
                *byte = source[pos];
            }
        }
        self.memory.write_bytes(dest_offset, &chunk)?;
        Ok(())
    }

    fn do_call<H: Host>(&mut self, host: &mut H, scheme: CallScheme) -> Result<(), VmError> {
        let gas_requested = self.stack.pop()?;
        let target = pop_address(&mut self.stack)?;
        let value = match scheme {
            CallScheme::Call | CallScheme::CallCode => self.stack.pop()?,
            CallScheme::Delegate | CallScheme::Static => U256::zero(),
        };
        let in_offset = self.stack.pop_usize()?;
        let in_size = self.stack.pop_usize()?;
        let out_offset = self.stack.pop_usize()?;
        let out_size = self.stack.pop_usize()?;

        if self.context.is_static && matches!(scheme, CallScheme::Call) && !value.is_zero() {
            return Err(VmError::WriteProtection);
        }

        self.touch_memory(in_offset, in_size)?;
        self.touch_memory(out_offset, out_size)?;

        let (_, cold) = host.code(target);
        self.charge_account_access(cold)?;
        if !value.is_zero() {
            self.use_gas(costs::CALL_VALUE)?;
        }

        // EIP-150: forward at most 63/64 of what remains.
        let max_forward = self.gas_remaining - self.gas_remaining / 64;
        let gas = if gas_requested > U256::from(max_forward) {
            max_forward
        } else {
            gas_requested.as_u64()
        };
        self.use_gas(gas)?;
        let stipend = if value.is_zero() {
            0
        } else {
            costs::CALL_STIPEND
        };

        let input = Bytes::from_vec(self.memory.read_bytes(in_offset, in_size));
        let request = match scheme {
            CallScheme::Call => CallRequest {
                gas: gas + stipend,
                code_address: target,
                address: target,
                caller: self.context.address,
                value,
                transfer_value: value,
                input,
                is_static: self.context.is_static,
                depth: self.context.depth + 1,
            },
            CallScheme::CallCode => CallRequest {
                gas: gas + stipend,
                code_address: target,
                address: self.context.address,
                caller: self.context.address,
                value,
                transfer_value: U256::zero(),
                input,
                is_static: self.context.is_static,
                depth: self.context.depth + 1,
            },
            CallScheme::Delegate => CallRequest {
                gas,
                code_address: target,
                address: self.context.address,
                caller: self.context.caller,
                value: self.context.value,
                transfer_value: U256::zero(),
                input,
                is_static: self.context.is_static,
                depth: self.context.depth + 1,
            },
            CallScheme::Static => CallRequest {
                gas,
                code_address: target,
                address: target,
                caller: self.context.address,
                value: U256::zero(),
                transfer_value: U256::zero(),
                input,
                is_static: true,
                depth: self.context.depth + 1,
            },
        };

        let outcome = host.call(request);
        self.absorb_outcome(&outcome, out_offset, out_size)?;
        self.stack.push(bool_word(outcome.success))?;
        Ok(())
    }

    fn do_create<H: Host>(&mut self, host: &mut H, salted: bool) -> Result<(), VmError> {
        self.require_mutable()?;

        let value = self.stack.pop()?;
        let offset = self.stack.pop_usize()?;
        let size = self.stack.pop_usize()?;
        let salt = if salted { Some(self.stack.pop()?) } else { None };

        self.touch_memory(offset, size)?;
        self.use_gas(costs::INITCODE_WORD * (size as u64).div_ceil(32))?;
        if salt.is_some() {
            self.use_gas(gas::create2_hash_cost(size))?;
        }

        let max_forward = self.gas_remaining - self.gas_remaining / 64;
        self.use_gas(max_forward)?;

        let init_code = Bytes::from_vec(self.memory.read_bytes(offset, size));
        let outcome = host.create(CreateRequest {
            gas: max_forward,
            caller: self.context.address,
            value,
            init_code,
            salt,
            depth: self.context.depth + 1,
        });

        // Revert data is observable via RETURNDATA*; success clears it.
        self.gas_remaining += outcome.gas_left;
        self.return_data = if outcome.success {
            Bytes::new()
        } else {
            outcome.output.clone()
        };

        match outcome.created.filter(|_| outcome.success) {
            Some(address) => {
                let mut word = [0u8; 32];
                word[12..].copy_from_slice(address.as_bytes());
                self.stack.push(U256::from_big_endian(&word))?;
            }
            None => self.stack.push(U256::zero())?,
        }
        Ok(())
    }

    fn absorb_outcome(
        &mut self,
        outcome: &FrameOutcome,
        out_offset: usize,
        out_size: usize,
    ) -> Result<(), VmError> {
        self.gas_remaining += outcome.gas_left;
        self.return_data = outcome.output.clone();

        let copy_len = out_size.min(outcome.output.len());
        if copy_len > 0 {
            let chunk = outcome.output.as_slice()[..copy_len].to_vec();
            self.memory.write_bytes(out_offset, &chunk)?;
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug)]
enum CallScheme {
    Call,
    CallCode,
    Delegate,
    Static,
}

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Scan bytecode for valid JUMPDEST positions, skipping PUSH immediates.
fn analyze_jump_dests(code: &[u8]) -> HashSet<usize> {
    let mut dests = HashSet::new();
    let mut i = 0;
    while i < code.len() {
        let op = code[i];
        if op == 0x5B {
            dests.insert(i);
        }
        if (0x60..=0x7F).contains(&op) {
            i += (op - 0x5F) as usize;
        }
        i += 1;
    }
    dests
}

fn pop_address(stack: &mut Stack) -> Result<Address, VmError> {
    let value = stack.pop()?;
    let bytes = u256_to_be_bytes(value);
    let mut addr = [0u8; 20];
    addr.copy_from_slice(&bytes[12..]);
    Ok(Address::new(addr))
}

fn bool_word(condition: bool) -> U256 {
    if condition {
        U256::one()
    } else {
        U256::zero()
    }
}

/// Signed less-than over two's-complement words.
fn signed_lt(a: U256, b: U256) -> bool {
    match (a.bit(255), b.bit(255)) {
        (true, false) => true,
        (false, true) => false,
        _ => a < b,
    }
}

fn twos_complement(x: U256) -> U256 {
    (!x).overflowing_add(U256::one()).0
}

/// Signed division, truncating toward zero.
fn signed_div(a: U256, b: U256) -> U256 {
    let a_neg = a.bit(255);
    let b_neg = b.bit(255);
    let a_abs = if a_neg { twos_complement(a) } else { a };
    let b_abs = if b_neg { twos_complement(b) } else { b };
    let result = a_abs / b_abs;
    if a_neg == b_neg {
        result
    } else {
        twos_complement(result)
    }
}

/// Signed modulo; the result takes the dividend's sign.
fn signed_mod(a: U256, b: U256) -> U256 {
    let a_neg = a.bit(255);
    let a_abs = if a_neg { twos_complement(a) } else { a };
    let b_abs = if b.bit(255) { twos_complement(b) } else { b };
    let result = a_abs % b_abs;
    if a_neg {
        twos_complement(result)
    } else {
        result
    }
}

/// Arithmetic shift right, sign-filling.
fn sar(value: U256, shift: U256) -> U256 {
    if shift >= U256::from(256) {
        return if value.bit(255) {
            U256::MAX
        } else {
            U256::zero()
        };
    }
    let shift = shift.as_usize();
    if shift == 0 {
        return value;
    }
    let shifted = value >> shift;
    if value.bit(255) {
        shifted | (U256::MAX << (256 - shift))
    } else {
        shifted
    }
}

/// Exponentiation by squaring with wrapping multiplication.
fn exp_by_squaring(base: U256, mut exp: U256) -> U256 {
    let mut result = U256::one();
    let mut base = base;
    while !exp.is_zero() {
        if exp.bit(0) {
            result = result.overflowing_mul(base).0;
        }
        exp >>= 1;
        base = base.overflowing_mul(base).0;
    }
    result
}

fn u256_to_u512(value: U256) -> primitive_types::U512 {
    let mut bytes = [0u8; 64];
    value.to_big_endian(&mut bytes[32..]);
    primitive_types::U512::from_big_endian(&bytes)
}

fn u512_to_u256(value: primitive_types::U512) -> U256 {
    let mut bytes = [0u8; 64];
    value.to_big_endian(&mut bytes);
    U256::from_big_endian(&bytes[32..])
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analyze_jump_dests_skips_push_data() {
        // PUSH1 0x5B JUMPDEST STOP: the 0x5B at index 1 is immediate data.
        let code = [0x60, 0x5B, 0x5B, 0x00];
        let dests = analyze_jump_dests(&code);
        assert!(dests.contains(&2));
        assert!(!dests.contains(&1));
    }

    #[test]
    fn test_signed_lt() {
        let neg_one = U256::MAX;
        assert!(signed_lt(neg_one, U256::one()));
        assert!(!signed_lt(U256::one(), neg_one));
        assert!(!signed_lt(U256::one(), U256::one()));
    }

    #[test]
    fn test_signed_div() {
        let neg_six = twos_complement(U256::from(6));
        assert_eq!(signed_div(neg_six, U256::from(2)), twos_complement(U256::from(3)));
        assert_eq!(signed_div(neg_six, twos_complement(U256::from(2))), U256::from(3));
        assert_eq!(signed_div(U256::from(6), U256::from(2)), U256::from(3));
    }

    #[test]
    fn test_sar_sign_fills() {
        let neg_two = twos_complement(U256::from(2));
        assert_eq!(sar(neg_two, U256::from(1)), U256::MAX); // -2 >> 1 == -1
        assert_eq!(sar(U256::from(4), U256::from(1)), U256::from(2));
        assert_eq!(sar(neg_two, U256::from(300)), U256::MAX);
        assert_eq!(sar(U256::from(4), U256::from(300)), U256::zero());
    }

    #[test]
    fn test_exp_by_squaring() {
        assert_eq!(exp_by_squaring(U256::from(2), U256::zero()), U256::one());
        assert_eq!(
            exp_by_squaring(U256::from(2), U256::from(10)),
            U256::from(1024)
        );
        assert_eq!(exp_by_squaring(U256::from(3), U256::from(3)), U256::from(27));
    }

    #[test]
    fn test_pop_address_truncates_to_20_bytes() {
        let mut stack = Stack::new();
        stack.push(U256::from(0x1234u64)).unwrap();
        let addr = pop_address(&mut stack).unwrap();
        assert_eq!(addr.as_bytes()[19], 0x34);
        assert_eq!(addr.as_bytes()[18], 0x12);
    }
}
