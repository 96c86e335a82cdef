//! # Replayer
//!
//! Boot-time re-execution of the persisted call log. Runs before the event
//! loop starts, against the same deterministic initial state the live
//! session began with, so the observable state after boot equals what the
//! operator would see had they re-entered each call by hand.

use crate::persist::{self, StateFile};
use crate::session::Session;
use tracing::{info, warn};

/// What the replay pass did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    /// Calls re-executed, success or not.
    pub replayed: usize,
    /// Calls that could not be re-executed (bad record, validation).
    pub skipped: usize,
}

/// Replays the session's state file, if it has one. A missing file is an
/// empty replay; an unreadable file logs a warning and proceeds empty —
/// the file is never truncated here.
#[must_use]
pub fn replay_state_file(session: &mut Session) -> ReplaySummary {
    let Some(path) = session.state_path().cloned() else {
        return ReplaySummary::default();
    };

    let state = match persist::load_state_file(&path) {
        Ok(state) => state,
        Err(err) => {
            warn!(%err, "state file unreadable, starting empty");
            return ReplaySummary::default();
        }
    };

    replay_calls(session, &state)
}

/// Replays an already-loaded state file through the session's execution
/// pipeline. Appending is suspended while replaying: the log being read
/// must not grow from its own replay.
pub fn replay_calls(session: &mut Session, state: &StateFile) -> ReplaySummary {
    let mut summary = ReplaySummary::default();
    session.set_persisting(false);

    for (index, call) in state.calls.iter().enumerate() {
        let params = match persist::to_call_parameters(call) {
            Ok(params) => params,
            Err(err) => {
                warn!(index, %err, "skipping unreplayable record");
                summary.skipped += 1;
                continue;
            }
        };
        match session.execute_at(&params, call.timestamp) {
            Ok(record) => {
                summary.replayed += 1;
                if !record.result.success {
                    // Failures replay too; they were part of the session.
                    info!(index, error = %record.result.error_info, "replayed failed call");
                }
            }
            Err(err) => {
                warn!(index, %err, "replay rejected a persisted call");
                summary.skipped += 1;
            }
        }
    }

    session.set_persisting(true);
    info!(
        replayed = summary.replayed,
        skipped = summary.skipped,
        "replay complete"
    );
    summary
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChopConfig;
    use crate::params::{CallParameters, CallType};
    use crate::persist::from_call_parameters;
    use chrono::Utc;

    const SEED: [u8; 32] = [0x01; 32];

    fn fresh_session() -> Session {
        Session::new(Some(SEED), ChopConfig::default(), None)
    }

    #[test]
    fn test_replay_reproduces_live_state() {
        // Live run: one CREATE then one CALL.
        let mut live = fresh_session();
        let caller = live.accounts.all()[0].address;

        let mut create = CallParameters::defaults(caller);
        create.call_type = CallType::Create;
        create.input_data = "0x6460056000556000526005601bf3".to_string();
        let t0 = Utc::now();
        let created = live.execute_at(&create, t0).unwrap();
        let deployed = created.result.deployed_address.unwrap();

        let mut call = CallParameters::defaults(caller);
        call.target = deployed.to_hex();
        let t1 = t0 + chrono::Duration::seconds(1);
        live.execute_at(&call, t1).unwrap();

        // The equivalent persisted log.
        let state = StateFile {
            calls: vec![
                from_call_parameters(&create, t0),
                from_call_parameters(&call, t1),
            ],
        };

        // Replay into a fresh session with the same seed.
        let mut replayed = fresh_session();
        let summary = replay_calls(&mut replayed, &state);
        assert_eq!(summary.replayed, 2);
        assert_eq!(summary.skipped, 0);

        assert_eq!(replayed.chain.height(), live.chain.height());
        assert_eq!(replayed.history.len(), live.history.len());
        assert!(replayed.registry.get(deployed).is_some());
        assert_eq!(
            replayed.accounts.get(caller).unwrap().nonce,
            live.accounts.get(caller).unwrap().nonce
        );
        // Hashes match because timestamps replay from the log.
        for number in 0..=live.chain.height() {
            assert_eq!(
                replayed.chain.get_block_by_number(number).unwrap().hash,
                live.chain.get_block_by_number(number).unwrap().hash
            );
        }
    }

    #[test]
    fn test_bad_records_are_skipped_not_fatal() {
        let mut session = fresh_session();
        let caller = session.accounts.all()[0].address;

        let good = CallParameters::defaults(caller);
        let mut bad = from_call_parameters(&good, Utc::now());
        bad.call_type = "SEND".to_string();

        let state = StateFile {
            calls: vec![bad, from_call_parameters(&good, Utc::now())],
        };
        let summary = replay_calls(&mut session, &state);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.replayed, 1);
        assert_eq!(session.chain.height(), 1);
    }

    #[test]
    fn test_replay_does_not_append() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let mut session = Session::new(Some(SEED), ChopConfig::default(), Some(path.clone()));
        let caller = session.accounts.all()[0].address;

        let params = CallParameters::defaults(caller);
        let state = StateFile {
            calls: vec![from_call_parameters(&params, Utc::now())],
        };
        replay_calls(&mut session, &state);

        // Nothing was written by the replay itself.
        let on_disk = persist::load_state_file(&path).unwrap();
        assert!(on_disk.calls.is_empty());

        // Live execution appends again afterwards.
        session.execute(&params).unwrap();
        let on_disk = persist::load_state_file(&path).unwrap();
        assert_eq!(on_disk.calls.len(), 1);
    }
}
