//! # Synthetic Blockchain
//!
//! One transaction per executed call, one block per transaction. Hashes are
//! deterministic keccak digests over the listed fields; they exist to give
//! stable unique identifiers, not to bind consensus.

use crate::params::{CallResult, CallType, ParsedCall};
use chop_evm::LogEntry;
use chop_types::{keccak256, u256_to_be_bytes, Address, Bytes, Hash, U256};
use std::collections::HashMap;
use tracing::info;

/// Default per-block gas limit.
pub const DEFAULT_BLOCK_GAS_LIMIT: u64 = 30_000_000;

/// A transaction synthesized from one executed call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    /// Unique id, shared with the history entry ordering.
    pub id: u64,
    /// Deterministic transaction hash.
    pub hash: Hash,
    /// Containing block number.
    pub block_number: u64,
    /// Containing block hash.
    pub block_hash: Hash,
    /// Call shape.
    pub call_type: CallType,
    /// Sender.
    pub from: Address,
    /// Target; None for CREATE*.
    pub to: Option<Address>,
    /// Value in wei.
    pub value: U256,
    /// Gas budget.
    pub gas_limit: u64,
    /// Gas consumed, clamped at the budget.
    pub gas_used: u64,
    /// Sender nonce at execution time.
    pub nonce: u64,
    /// Calldata or init code.
    pub input_data: Bytes,
    /// Return or revert data.
    pub return_data: Bytes,
    /// Execution status.
    pub status: bool,
    /// Failure reason, empty on success.
    pub error: String,
    /// Deployed contract address for CREATE*.
    pub deployed_address: Option<Address>,
    /// Logs emitted.
    pub logs: Vec<LogEntry>,
}

/// A synthesized block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Block {
    /// Height; genesis is 0.
    pub number: u64,
    /// Deterministic block hash.
    pub hash: Hash,
    /// Previous block's hash; zero for genesis.
    pub parent_hash: Hash,
    /// Unix timestamp.
    pub timestamp: u64,
    /// Block producer; always the zero address.
    pub miner: Address,
    /// Gas limit at synthesis time.
    pub gas_limit: u64,
    /// Sum of transaction gas.
    pub gas_used: u64,
    /// Deterministic state root stand-in.
    pub state_root: Hash,
    /// Synthesized size in bytes.
    pub size: u64,
    /// The block's transactions (exactly one past genesis).
    pub transactions: Vec<Transaction>,
}

/// Chain-wide summary for the dashboard.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChainStats {
    /// Latest block number.
    pub height: u64,
    /// Total transactions across all blocks.
    pub total_transactions: u64,
    /// Cumulative gas used.
    pub total_gas_used: u128,
    /// Hash of the latest block.
    pub latest_hash: Hash,
}

/// Index entry: (block number, position inside the block).
type TxLocation = (u64, usize);

/// The in-memory ledger.
pub struct Blockchain {
    blocks: Vec<Block>,
    tx_by_hash: HashMap<Hash, TxLocation>,
    tx_by_id: HashMap<u64, TxLocation>,
    gas_limit: u64,
    next_tx_id: u64,
}

impl Blockchain {
    /// Creates a chain holding only the genesis block.
    #[must_use]
    pub fn new() -> Self {
        let mut chain = Self {
            blocks: Vec::new(),
            tx_by_hash: HashMap::new(),
            tx_by_id: HashMap::new(),
            gas_limit: DEFAULT_BLOCK_GAS_LIMIT,
            next_tx_id: 1,
        };
        chain.blocks.push(genesis_block(chain.gas_limit));
        chain
    }

    /// Record one executed call as a transaction in a fresh block.
    /// `nonce` is the caller's nonce before execution; `timestamp` is the
    /// call's wall-clock second (replay reuses the persisted one).
    pub fn add_call_result(
        &mut self,
        parsed: &ParsedCall,
        result: &CallResult,
        nonce: u64,
        timestamp: u64,
    ) -> (u64, Transaction) {
        let id = self.next_tx_id;
        self.next_tx_id += 1;

        let number = self.blocks.len() as u64;
        let parent = &self.blocks[number as usize - 1];
        let parent_hash = parent.hash;
        let parent_root = parent.state_root;

        let gas_used = result.gas_used(parsed.gas_limit);
        let tx_hash = transaction_hash(number, parsed.caller, nonce, &parsed.input, id);

        let mut tx = Transaction {
            id,
            hash: tx_hash,
            block_number: number,
            block_hash: Hash::ZERO,
            call_type: parsed.call_type,
            from: parsed.caller,
            to: parsed.target,
            value: parsed.value,
            gas_limit: parsed.gas_limit,
            gas_used,
            nonce,
            input_data: parsed.input.clone(),
            return_data: result.return_data.clone(),
            status: result.success,
            error: result.error_info.clone(),
            deployed_address: result.deployed_address,
            logs: result.logs.clone(),
        };

        let block_hash = block_hash(number, parent_hash, timestamp, tx_hash);
        tx.block_hash = block_hash;

        let block = Block {
            number,
            hash: block_hash,
            parent_hash,
            timestamp,
            miner: Address::ZERO,
            gas_limit: self.gas_limit,
            gas_used,
            state_root: state_root(parent_root, tx_hash),
            size: 608 + tx.input_data.len() as u64 + tx.return_data.len() as u64,
            transactions: vec![tx.clone()],
        };

        self.tx_by_hash.insert(tx_hash, (number, 0));
        self.tx_by_id.insert(id, (number, 0));
        self.blocks.push(block);
        info!(block = number, tx = %tx_hash, status = tx.status, "appended block");

        (number, tx)
    }

    /// Block by height.
    #[must_use]
    pub fn get_block_by_number(&self, number: u64) -> Option<&Block> {
        self.blocks.get(usize::try_from(number).ok()?)
    }

    /// The newest `count` blocks, newest first.
    #[must_use]
    pub fn get_recent_blocks(&self, count: usize) -> Vec<&Block> {
        self.blocks.iter().rev().take(count).collect()
    }

    /// Every block, genesis first.
    #[must_use]
    pub fn get_all_blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Transaction by hash, O(1).
    #[must_use]
    pub fn get_transaction_by_hash(&self, hash: Hash) -> Option<&Transaction> {
        self.locate(self.tx_by_hash.get(&hash)?)
    }

    /// Transaction by id, O(1).
    #[must_use]
    pub fn get_transaction_by_id(&self, id: u64) -> Option<&Transaction> {
        self.locate(self.tx_by_id.get(&id)?)
    }

    fn locate(&self, location: &TxLocation) -> Option<&Transaction> {
        let (number, index) = *location;
        self.blocks
            .get(usize::try_from(number).ok()?)
            .and_then(|block| block.transactions.get(index))
    }

    /// Exactly the transactions of block `number`.
    #[must_use]
    pub fn get_transactions_by_block(&self, number: u64) -> &[Transaction] {
        self.get_block_by_number(number)
            .map(|block| block.transactions.as_slice())
            .unwrap_or(&[])
    }

    /// All transactions, oldest first.
    #[must_use]
    pub fn all_transactions(&self) -> impl DoubleEndedIterator<Item = &Transaction> {
        self.blocks.iter().flat_map(|block| block.transactions.iter())
    }

    /// Latest height.
    #[must_use]
    pub fn height(&self) -> u64 {
        self.blocks.len() as u64 - 1
    }

    /// Chain-wide summary.
    #[must_use]
    pub fn get_stats(&self) -> ChainStats {
        ChainStats {
            height: self.height(),
            total_transactions: self.tx_by_id.len() as u64,
            total_gas_used: self
                .blocks
                .iter()
                .map(|block| u128::from(block.gas_used))
                .sum(),
            latest_hash: self.blocks[self.blocks.len() - 1].hash,
        }
    }

    /// Gas limit applied to future blocks.
    #[must_use]
    pub fn get_gas_limit(&self) -> u64 {
        self.gas_limit
    }

    /// Adjusts the gas limit for future blocks.
    pub fn set_gas_limit(&mut self, gas_limit: u64) {
        self.gas_limit = gas_limit.max(1);
    }

    /// Discards everything but a fresh genesis. Outstanding indices are
    /// invalidated.
    pub fn reset(&mut self) {
        self.blocks.clear();
        self.blocks.push(genesis_block(self.gas_limit));
        self.tx_by_hash.clear();
        self.tx_by_id.clear();
        self.next_tx_id = 1;
    }
}

impl Default for Blockchain {
    fn default() -> Self {
        Self::new()
    }
}

fn genesis_block(gas_limit: u64) -> Block {
    let hash = block_hash(0, Hash::ZERO, 0, Hash::ZERO);
    Block {
        number: 0,
        hash,
        parent_hash: Hash::ZERO,
        timestamp: 0,
        miner: Address::ZERO,
        gas_limit,
        gas_used: 0,
        state_root: Hash::ZERO,
        size: 608,
        transactions: Vec::new(),
    }
}

/// keccak256(block_number || from || nonce || input || id).
fn transaction_hash(block_number: u64, from: Address, nonce: u64, input: &Bytes, id: u64) -> Hash {
    let mut preimage = Vec::with_capacity(44 + input.len());
    preimage.extend_from_slice(&block_number.to_be_bytes());
    preimage.extend_from_slice(from.as_bytes());
    preimage.extend_from_slice(&nonce.to_be_bytes());
    preimage.extend_from_slice(input.as_slice());
    preimage.extend_from_slice(&id.to_be_bytes());
    keccak256(&preimage)
}

/// keccak256(number || parent_hash || timestamp || tx_hash).
fn block_hash(number: u64, parent_hash: Hash, timestamp: u64, tx_hash: Hash) -> Hash {
    let mut preimage = Vec::with_capacity(80);
    preimage.extend_from_slice(&number.to_be_bytes());
    preimage.extend_from_slice(parent_hash.as_bytes());
    preimage.extend_from_slice(&timestamp.to_be_bytes());
    preimage.extend_from_slice(tx_hash.as_bytes());
    keccak256(&preimage)
}

/// keccak256(parent_root || tx_hash), a deterministic stand-in.
fn state_root(parent_root: Hash, tx_hash: Hash) -> Hash {
    let mut preimage = Vec::with_capacity(64);
    preimage.extend_from_slice(parent_root.as_bytes());
    preimage.extend_from_slice(tx_hash.as_bytes());
    keccak256(&preimage)
}

/// The salt surface form for display, 32 bytes of hex.
#[must_use]
pub fn format_salt(salt: U256) -> String {
    format!("0x{}", hex::encode(u256_to_be_bytes(salt)))
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed_call(caller_byte: u8) -> ParsedCall {
        ParsedCall {
            call_type: CallType::Call,
            caller: Address::new([caller_byte; 20]),
            target: Some(Address::new([0x10; 20])),
            value: U256::zero(),
            gas_limit: 1_000_000,
            input: Bytes::from_slice(&[0xDE, 0xAD]),
            salt: None,
        }
    }

    fn ok_result(gas_left: u64) -> CallResult {
        CallResult {
            success: true,
            return_data: Bytes::new(),
            gas_left,
            error_info: String::new(),
            logs: Vec::new(),
            deployed_address: None,
        }
    }

    #[test]
    fn test_genesis() {
        let chain = Blockchain::new();
        let genesis = chain.get_block_by_number(0).unwrap();
        assert_eq!(genesis.number, 0);
        assert_eq!(genesis.parent_hash, Hash::ZERO);
        assert!(genesis.transactions.is_empty());
        assert_eq!(chain.height(), 0);
    }

    #[test]
    fn test_add_links_parent_hash() {
        let mut chain = Blockchain::new();
        chain.add_call_result(&parsed_call(1), &ok_result(999_000), 0, 100);
        chain.add_call_result(&parsed_call(1), &ok_result(998_000), 1, 101);

        assert_eq!(chain.height(), 2);
        for n in 1..=2u64 {
            let block = chain.get_block_by_number(n).unwrap();
            let parent = chain.get_block_by_number(n - 1).unwrap();
            assert_eq!(block.number, n);
            assert_eq!(block.parent_hash, parent.hash);
        }
    }

    #[test]
    fn test_gas_used_sums() {
        let mut chain = Blockchain::new();
        let (number, tx) = chain.add_call_result(&parsed_call(1), &ok_result(999_979), 0, 100);
        let block = chain.get_block_by_number(number).unwrap();
        assert_eq!(tx.gas_used, 21);
        assert_eq!(block.gas_used, 21);
        assert_eq!(
            block.gas_used,
            block.transactions.iter().map(|t| t.gas_used).sum::<u64>()
        );
    }

    #[test]
    fn test_tx_indices() {
        let mut chain = Blockchain::new();
        let (number, tx) = chain.add_call_result(&parsed_call(1), &ok_result(999_000), 0, 100);

        assert_eq!(chain.get_transaction_by_hash(tx.hash).unwrap().id, tx.id);
        assert_eq!(chain.get_transaction_by_id(tx.id).unwrap().hash, tx.hash);
        assert_eq!(chain.get_transactions_by_block(number), &[tx.clone()]);
        assert_eq!(tx.block_number, number);
        assert_eq!(
            tx.block_hash,
            chain.get_block_by_number(number).unwrap().hash
        );
    }

    #[test]
    fn test_tx_hashes_unique() {
        let mut chain = Blockchain::new();
        let (_, a) = chain.add_call_result(&parsed_call(1), &ok_result(1), 0, 100);
        // Same caller, same nonce, same input: id still separates them.
        let (_, b) = chain.add_call_result(&parsed_call(1), &ok_result(1), 0, 100);
        assert_ne!(a.hash, b.hash);
    }

    #[test]
    fn test_failed_tx_still_appends() {
        let mut chain = Blockchain::new();
        let result = CallResult {
            success: false,
            return_data: Bytes::new(),
            gas_left: 0,
            error_info: "reverted".to_string(),
            logs: Vec::new(),
            deployed_address: None,
        };
        let (number, tx) = chain.add_call_result(&parsed_call(1), &result, 0, 100);
        assert_eq!(number, 1);
        assert!(!tx.status);
        assert_eq!(tx.error, "reverted");
        assert_eq!(tx.gas_used, 1_000_000);
    }

    #[test]
    fn test_stats() {
        let mut chain = Blockchain::new();
        chain.add_call_result(&parsed_call(1), &ok_result(999_979), 0, 100);
        chain.add_call_result(&parsed_call(2), &ok_result(999_900), 0, 101);

        let stats = chain.get_stats();
        assert_eq!(stats.height, 2);
        assert_eq!(stats.total_transactions, 2);
        assert_eq!(stats.total_gas_used, 21 + 100);
        assert_eq!(stats.latest_hash, chain.get_block_by_number(2).unwrap().hash);
    }

    #[test]
    fn test_recent_blocks_newest_first() {
        let mut chain = Blockchain::new();
        for i in 0..3 {
            chain.add_call_result(&parsed_call(1), &ok_result(1), i, 100 + i);
        }
        let recent: Vec<u64> = chain.get_recent_blocks(2).iter().map(|b| b.number).collect();
        assert_eq!(recent, vec![3, 2]);
    }

    #[test]
    fn test_reset_back_to_genesis() {
        let mut chain = Blockchain::new();
        let (_, tx) = chain.add_call_result(&parsed_call(1), &ok_result(1), 0, 100);
        chain.set_gas_limit(5_000_000);
        chain.reset();

        assert_eq!(chain.height(), 0);
        assert!(chain.get_transaction_by_hash(tx.hash).is_none());
        assert!(chain.get_transaction_by_id(tx.id).is_none());
        // Gas limit survives a reset.
        assert_eq!(chain.get_gas_limit(), 5_000_000);
    }
}
