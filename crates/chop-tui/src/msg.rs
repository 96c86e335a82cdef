//! Messages and commands.
//!
//! Every mutation of the application model happens by applying a [`Msg`]
//! on the event loop. Long work (EVM execution, disassembly, reset) runs
//! as a [`Cmd`] on a worker and produces exactly one message back.

use chop_core::{DisassemblyResult, EngineError, ExecutionRecord, Fixture};
use chop_types::Address;
use crossterm::event::KeyEvent;

/// One message consumed by the event loop.
#[derive(Debug)]
pub enum Msg {
    /// A keyboard event from the terminal.
    Key(KeyEvent),
    /// An execution finished.
    CallCompleted(Box<Result<ExecutionRecord, EngineError>>),
    /// A disassembly finished.
    DisassemblyReady {
        /// The contract that was analyzed.
        address: Address,
        /// The analysis, or the error panel text.
        result: Result<Box<DisassemblyResult>, String>,
    },
    /// A full reset finished.
    ResetDone {
        /// Persistence warning, if truncation failed.
        warning: Option<String>,
    },
    /// 1 Hz dashboard timer.
    Tick,
    /// Transient feedback from a side-effect command (clipboard, saves).
    Feedback(String),
}

/// One unit of asynchronous work. Each command produces exactly one
/// message; none of them mutate the model directly.
#[derive(Clone, Debug, PartialEq)]
pub enum Cmd {
    /// Execute the call described by the session's current parameters.
    Execute(chop_core::CallParameters),
    /// Disassemble the contract at an address.
    Disassemble(Address),
    /// Truncate persistence and reseed the VM.
    Reset,
    /// Schedule the next 1 Hz tick.
    ScheduleTick,
    /// Copy a string to the terminal clipboard.
    Copy(String),
    /// Persist the current config.
    SaveConfig,
    /// Save a fixture file.
    SaveFixture(Box<Fixture>),
}
