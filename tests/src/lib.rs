//! # chop Test Suite
//!
//! Cross-crate tests that exercise the whole pipeline the way an operator
//! would: seed accounts, shape a call, execute, inspect the chain, quit,
//! reboot, replay.
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── scenarios.rs    # end-to-end operator scenarios
//!     └── invariants.rs   # properties that must hold across components
//! ```
//!
//! Run with `cargo test -p chop-tests`.

#[cfg(test)]
mod integration;

#[cfg(test)]
pub(crate) mod support {
    use chop_core::{ChopConfig, Session};
    use chop_types::Address;

    /// The fixed seed used across the suite: derivation is deterministic,
    /// so addresses are stable between runs and between sessions.
    pub const SEED: [u8; 32] = [0x01; 32];

    /// A memory-only session over the fixed seed.
    pub fn session() -> Session {
        Session::new(Some(SEED), ChopConfig::default(), None)
    }

    /// The operator's first derived account.
    pub fn account0(session: &Session) -> Address {
        session.accounts.all()[0].address
    }
}
