//! # Error Types
//!
//! Failure modes of EVM execution.

use chop_types::Bytes;
use thiserror::Error;

/// Errors that can occur during EVM execution.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VmError {
    /// Execution ran out of gas.
    #[error("out of gas")]
    OutOfGas,

    /// Stack overflow (>1024 items).
    #[error("stack overflow")]
    StackOverflow,

    /// Stack underflow (pop from empty stack).
    #[error("stack underflow")]
    StackUnderflow,

    /// Invalid opcode encountered.
    #[error("invalid opcode: 0x{0:02X}")]
    InvalidOpcode(u8),

    /// Invalid jump destination.
    #[error("invalid jump destination: {0}")]
    InvalidJump(usize),

    /// Attempted to modify state in a static context.
    #[error("write protection: state mutation inside STATICCALL")]
    WriteProtection,

    /// Call depth exceeded the 1024-frame maximum.
    #[error("call depth exceeded: {0}")]
    CallDepthExceeded(usize),

    /// Insufficient balance for a value transfer.
    #[error("insufficient balance for transfer")]
    InsufficientBalance,

    /// Memory expansion would exceed the limit.
    #[error("memory limit exceeded: {requested} > {max} bytes")]
    MemoryLimitExceeded { requested: usize, max: usize },

    /// Return data out of bounds (RETURNDATACOPY).
    #[error("return data out of bounds: offset {offset}, size {size}, available {available}")]
    ReturnDataOutOfBounds {
        offset: usize,
        size: usize,
        available: usize,
    },

    /// Execution reverted; the payload may decode as an error string.
    #[error("execution reverted")]
    Revert(Bytes),

    /// Internal error (should not happen in production).
    #[error("internal error: {0}")]
    Internal(String),
}

impl VmError {
    /// Returns true if this failure refunds the frame's remaining gas.
    /// Only REVERT does; every other failure consumes the frame's gas.
    #[must_use]
    pub fn refunds_gas(&self) -> bool {
        matches!(self, Self::Revert(_))
    }
}

// =============================================================================
// TESTS
// =============================================================================
