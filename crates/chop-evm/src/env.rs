//! Block-level execution environment.

use chop_types::{Address, Hash, U256};

/// The block context visible to executing code via the 0x40-range opcodes.
///
/// Owned by the synthetic blockchain and refreshed before each top-level
/// execution so NUMBER/TIMESTAMP track the chain the operator sees.
#[derive(Clone, Debug)]
pub struct BlockEnv {
    /// Block number (NUMBER).
    pub number: u64,
    /// Unix timestamp (TIMESTAMP).
    pub timestamp: u64,
    /// Block producer (COINBASE). Fixed zero address in chop.
    pub coinbase: Address,
    /// Block gas limit (GASLIMIT).
    pub gas_limit: u64,
    /// Chain id (CHAINID).
    pub chain_id: u64,
    /// Base fee (BASEFEE).
    pub base_fee: U256,
    /// PREVRANDAO word.
    pub prev_randao: Hash,
}

impl Default for BlockEnv {
    fn default() -> Self {
        Self {
            number: 0,
            timestamp: 0,
            coinbase: Address::ZERO,
            gas_limit: 30_000_000,
            chain_id: 1337,
            base_fee: U256::zero(),
            prev_randao: Hash::ZERO,
        }
    }
}
