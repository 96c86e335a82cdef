//! # chop-core
//!
//! The non-visual heart of chop: parameter validation, deterministic test
//! accounts, the execution engine over the embedded EVM, bytecode
//! disassembly, the synthetic blockchain, bounded history, state
//! inspection and the persist/replay layer, all wired together by
//! [`session::Session`].

#![warn(clippy::all)]

pub mod accounts;
pub mod analyzer;
pub mod chain;
pub mod config;
pub mod engine;
pub mod errors;
pub mod fixtures;
pub mod history;
pub mod inspector;
pub mod params;
pub mod persist;
pub mod registry;
pub mod replay;
pub mod session;
pub mod validation;

pub use accounts::{Account, AccountManager};
pub use analyzer::{disassemble, BasicBlock, CodeAnalysis, DisassemblyResult, Instruction};
pub use chain::{Block, Blockchain, ChainStats, Transaction};
pub use config::ChopConfig;
pub use engine::ExecutionEngine;
pub use errors::{EngineError, StoreError, ValidationError};
pub use fixtures::Fixture;
pub use history::{HistoryEntry, HistoryManager};
pub use inspector::{format_balance, format_balance_short, AccountState, StateInspector};
pub use params::{CallParameters, CallResult, CallType, ParsedCall};
pub use registry::{Contract, ContractRegistry};
pub use replay::{replay_state_file, ReplaySummary};
pub use session::{ExecutionRecord, Session};
pub use validation::{validate_call_parameters, validate_field, ParamField};
