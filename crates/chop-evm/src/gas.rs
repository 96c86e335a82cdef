//! # EVM Gas Metering
//!
//! Gas costs per the Berlin/London/Shanghai schedules, including EIP-2929
//! warm/cold access pricing. Intrinsic transaction gas is intentionally
//! absent: chop meters opcode execution only.

use chop_types::U256;

// =============================================================================
// BASE GAS COSTS
// =============================================================================

/// Gas costs for common operations.
pub mod costs {
    /// Zero gas.
    pub const ZERO: u64 = 0;
    /// Base cost (e.g., for `POP`).
    pub const BASE: u64 = 2;
    /// Very low cost (e.g., for `ADD`).
    pub const VERY_LOW: u64 = 3;
    /// Low cost (e.g., for `MUL`).
    pub const LOW: u64 = 5;
    /// Mid cost (e.g., for `JUMP`).
    pub const MID: u64 = 8;
    /// High cost (e.g., for `JUMPI`).
    pub const HIGH: u64 = 10;
    /// Jump destination cost.
    pub const JUMPDEST: u64 = 1;

    // Memory costs
    /// Gas per word for memory/calldata/code copies.
    pub const COPY: u64 = 3;

    // Storage costs (EIP-2929)
    /// Cold storage read (first access in the transaction).
    pub const COLD_SLOAD: u64 = 2100;
    /// Warm storage read (subsequent access).
    pub const WARM_SLOAD: u64 = 100;
    /// Cold account access.
    pub const COLD_ACCOUNT_ACCESS: u64 = 2600;
    /// Warm account access.
    pub const WARM_ACCOUNT_ACCESS: u64 = 100;

    // SSTORE costs (EIP-2200, EIP-3529)
    /// SSTORE writing zero over an existing value.
    pub const SSTORE_RESET: u64 = 2900;
    /// SSTORE writing a non-zero value.
    pub const SSTORE_SET: u64 = 20_000;
    /// Refund for clearing a storage slot.
    pub const SSTORE_CLEAR_REFUND: u64 = 4800;

    // Transient storage (EIP-1153)
    /// TLOAD / TSTORE flat cost.
    pub const TRANSIENT_ACCESS: u64 = 100;

    // Call costs
    /// Extra cost when a call transfers value.
    pub const CALL_VALUE: u64 = 9000;
    /// Extra cost when a value transfer creates the target account.
    pub const CALL_NEW_ACCOUNT: u64 = 25_000;
    /// Stipend granted to the callee when value > 0.
    pub const CALL_STIPEND: u64 = 2300;

    // Create costs
    /// CREATE / CREATE2 base cost.
    pub const CREATE: u64 = 32_000;
    /// Per-byte cost of depositing runtime code.
    pub const CODE_DEPOSIT: u64 = 200;
    /// Per-word cost of hashing CREATE2 init code.
    pub const KECCAK256_WORD: u64 = 6;
    /// Per-word cost of the EIP-3860 init code charge.
    pub const INITCODE_WORD: u64 = 2;

    // Log costs
    /// LOG base cost.
    pub const LOG: u64 = 375;
    /// LOG cost per topic.
    pub const LOG_TOPIC: u64 = 375;
    /// LOG cost per byte of data.
    pub const LOG_DATA: u64 = 8;

    // Other
    /// KECCAK256 base cost.
    pub const KECCAK256: u64 = 30;
    /// EXP base cost.
    pub const EXP: u64 = 10;
    /// EXP cost per byte of exponent.
    pub const EXP_BYTE: u64 = 50;
    /// SELFDESTRUCT base cost.
    pub const SELFDESTRUCT: u64 = 5000;
    /// BLOCKHASH cost.
    pub const BLOCKHASH: u64 = 20;
}

// =============================================================================
// PER-OPCODE BASE COST TABLE
// =============================================================================

/// Static base cost for a single opcode byte.
///
/// Dynamic components (memory expansion, warm/cold access, copy size,
/// topic count) are charged separately by the interpreter.
const fn base_cost(byte: u8) -> u64 {
    match byte {
        0x00 => costs::ZERO,                   // STOP
        0x01 | 0x03 => costs::VERY_LOW,        // ADD, SUB
        0x02 | 0x04..=0x07 => costs::LOW,      // MUL, DIV, SDIV, MOD, SMOD
        0x08 | 0x09 => costs::MID,             // ADDMOD, MULMOD
        0x0A => costs::EXP,                    // EXP (plus per-byte)
        0x0B => costs::LOW,                    // SIGNEXTEND
        0x10..=0x1D => costs::VERY_LOW,        // comparison & bitwise
        0x20 => costs::KECCAK256,              // KECCAK256 (plus per-word)
        0x30 | 0x32..=0x3A | 0x3D => costs::BASE, // env info
        0x31 | 0x3B | 0x3F => costs::ZERO,     // BALANCE/EXTCODESIZE/EXTCODEHASH: warm/cold only
        0x3C | 0x3E => costs::ZERO,            // EXTCODECOPY (warm/cold+copy), RETURNDATACOPY base
        0x40 => costs::BLOCKHASH,              // BLOCKHASH
        0x41..=0x48 => costs::BASE,            // block info
        0x50 => costs::BASE,                   // POP
        0x51..=0x53 => costs::VERY_LOW,        // MLOAD, MSTORE, MSTORE8
        0x54 | 0x55 => costs::ZERO,            // SLOAD/SSTORE: fully dynamic
        0x56 => costs::MID,                    // JUMP
        0x57 => costs::HIGH,                   // JUMPI
        0x58..=0x5A => costs::BASE,            // PC, MSIZE, GAS
        0x5B => costs::JUMPDEST,               // JUMPDEST
        0x5C | 0x5D => costs::TRANSIENT_ACCESS, // TLOAD, TSTORE
        0x5E => costs::VERY_LOW,               // MCOPY (plus per-word)
        0x5F => costs::BASE,                   // PUSH0
        0x60..=0x9F => costs::VERY_LOW,        // PUSH1..32, DUP, SWAP
        0xA0..=0xA4 => costs::LOG,             // LOGn (plus topics/data)
        0xF0 | 0xF5 => costs::CREATE,          // CREATE, CREATE2
        0xF1 | 0xF2 | 0xF4 | 0xFA => costs::ZERO, // calls: warm/cold + value
        0xF3 | 0xFD => costs::ZERO,            // RETURN, REVERT
        0xFE => costs::ZERO,                   // INVALID
        0xFF => costs::SELFDESTRUCT,           // SELFDESTRUCT
        _ => costs::ZERO,
    }
}

const fn build_table() -> [u64; 256] {
    let mut table = [0u64; 256];
    let mut i = 0;
    while i < 256 {
        table[i] = base_cost(i as u8);
        i += 1;
    }
    table
}

/// Base gas indexed by opcode byte.
pub const OPCODE_GAS: [u64; 256] = build_table();

// =============================================================================
// DYNAMIC COSTS
// =============================================================================

/// Total gas cost for EXP given the exponent (base cost included).
#[must_use]
pub fn exp_gas_cost(exponent: U256) -> u64 {
    if exponent.is_zero() {
        return costs::EXP;
    }
    let byte_len = (exponent.bits() as u64).div_ceil(8);
    costs::EXP + costs::EXP_BYTE * byte_len
}

/// Total gas cost for KECCAK256 over `size` bytes (base cost included).
#[must_use]
pub fn keccak256_gas_cost(size: usize) -> u64 {
    let words = (size as u64).div_ceil(32);
    costs::KECCAK256 + costs::KECCAK256_WORD * words
}

/// Per-word copy cost for the *COPY family.
#[must_use]
pub fn copy_gas_cost(size: usize) -> u64 {
    let words = (size as u64).div_ceil(32);
    costs::COPY * words
}

/// Total gas cost for LOGn (base cost included).
#[must_use]
pub fn log_gas_cost(size: usize, topic_count: usize) -> u64 {
    costs::LOG + costs::LOG_TOPIC * topic_count as u64 + costs::LOG_DATA * size as u64
}

/// Per-word hashing cost for CREATE2 init code.
#[must_use]
pub fn create2_hash_cost(init_code_len: usize) -> u64 {
    let words = (init_code_len as u64).div_ceil(32);
    costs::KECCAK256_WORD * words
}

// =============================================================================
// TESTS
// =============================================================================
