//! # Persistence
//!
//! The append-only call log at `~/.chop_state.json`. The file is the source
//! of truth for replay: every executed call is appended, and boot re-executes
//! the log in order to reconstruct observable state.
//!
//! The on-disk shape is stable and additive-only:
//!
//! ```json
//! { "calls": [ { "call_type": "CALL", "caller": "0x..", "target": "0x..",
//!                "value": "0", "input_data": "0x", "gas_limit": "1000000",
//!                "salt": "", "timestamp": "2026-01-01T00:00:00Z" } ] }
//! ```

use crate::errors::StoreError;
use crate::params::{CallParameters, CallType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// File name under the home directory.
const STATE_FILE_NAME: &str = ".chop_state.json";

/// One persisted call: the parameter surface strings plus a timestamp.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedCall {
    /// Call shape name (CALL, CREATE2, ...).
    pub call_type: String,
    /// Sender address string.
    pub caller: String,
    /// Target address string; empty for CREATE*.
    pub target: String,
    /// Value string.
    pub value: String,
    /// Calldata / init code string.
    pub input_data: String,
    /// Gas budget string.
    pub gas_limit: String,
    /// Salt string; empty unless CREATE2.
    pub salt: String,
    /// When the call was executed (RFC3339).
    pub timestamp: DateTime<Utc>,
}

/// The whole file.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateFile {
    /// Executed calls, oldest first.
    pub calls: Vec<PersistedCall>,
}

/// Resolves `$HOME/.chop_state.json`.
///
/// # Errors
///
/// `NoHomeDir` when the home directory cannot be resolved.
pub fn get_state_file_path() -> Result<PathBuf, StoreError> {
    dirs::home_dir()
        .map(|home| home.join(STATE_FILE_NAME))
        .ok_or(StoreError::NoHomeDir)
}

/// Loads the state file. A missing file is an empty state, not an error;
/// a present-but-invalid file is.
///
/// # Errors
///
/// `Io` on read failure, `MalformedJson` on parse failure.
pub fn load_state_file(path: &Path) -> Result<StateFile, StoreError> {
    if !path.exists() {
        return Ok(StateFile::default());
    }
    let raw = fs::read_to_string(path).map_err(|e| StoreError::io(path, e))?;
    serde_json::from_str(&raw).map_err(|e| StoreError::malformed(path, e))
}

/// Full rewrite with pretty-printed JSON, via temp file + rename so a
/// crash mid-write cannot leave a torn file.
///
/// # Errors
///
/// `Io` on write failure.
pub fn save_state_file(path: &Path, state: &StateFile) -> Result<(), StoreError> {
    let json = serde_json::to_string_pretty(state)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json).map_err(|e| StoreError::io(&tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| StoreError::io(path, e))?;
    debug!(path = %path.display(), calls = state.calls.len(), "state file saved");
    Ok(())
}

/// Load-modify-save append of one call.
///
/// # Errors
///
/// Propagates load and save failures.
pub fn append_call(path: &Path, call: PersistedCall) -> Result<(), StoreError> {
    let mut state = load_state_file(path)?;
    state.calls.push(call);
    save_state_file(path, &state)
}

/// Truncates the log to `{ "calls": [] }`.
///
/// # Errors
///
/// `Io` on write failure.
pub fn clear_state_file(path: &Path) -> Result<(), StoreError> {
    save_state_file(path, &StateFile::default())
}

/// `CallParameters` + timestamp → on-disk record.
#[must_use]
pub fn from_call_parameters(params: &CallParameters, timestamp: DateTime<Utc>) -> PersistedCall {
    PersistedCall {
        call_type: params.call_type.as_str().to_string(),
        caller: params.caller.clone(),
        target: params.target.clone(),
        value: params.value.clone(),
        input_data: params.input_data.clone(),
        gas_limit: params.gas_limit.clone(),
        salt: params.salt.clone(),
        timestamp: params_timestamp(timestamp),
    }
}

// RFC3339 carries whole seconds; truncate so a round-trip through disk
// compares equal.
fn params_timestamp(timestamp: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp(timestamp.timestamp(), 0).unwrap_or(timestamp)
}

/// On-disk record → `CallParameters`.
///
/// # Errors
///
/// `BadRecord` when the stored call type is unknown.
pub fn to_call_parameters(call: &PersistedCall) -> Result<CallParameters, StoreError> {
    let call_type = CallType::parse(&call.call_type)
        .ok_or_else(|| StoreError::BadRecord(format!("unknown call type {}", call.call_type)))?;
    Ok(CallParameters {
        call_type,
        caller: call.caller.clone(),
        target: call.target.clone(),
        value: call.value.clone(),
        gas_limit: call.gas_limit.clone(),
        input_data: call.input_data.clone(),
        salt: call.salt.clone(),
    })
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chop_types::Address;
    use tempfile::tempdir;

    fn params() -> CallParameters {
        CallParameters::defaults(Address::new([0xAA; 20]))
    }

    #[test]
    fn test_missing_file_is_empty_state() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");
        let state = load_state_file(&path).unwrap();
        assert!(state.calls.is_empty());
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            load_state_file(&path),
            Err(StoreError::MalformedJson { .. })
        ));
    }

    #[test]
    fn test_append_and_load_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");

        let call = from_call_parameters(&params(), Utc::now());
        append_call(&path, call.clone()).unwrap();
        append_call(&path, call.clone()).unwrap();

        let state = load_state_file(&path).unwrap();
        assert_eq!(state.calls.len(), 2);
        assert_eq!(state.calls[0], call);
    }

    #[test]
    fn test_clear_writes_empty_calls() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");
        append_call(&path, from_call_parameters(&params(), Utc::now())).unwrap();

        clear_state_file(&path).unwrap();
        let state = load_state_file(&path).unwrap();
        assert!(state.calls.is_empty());

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"calls\""));
    }

    #[test]
    fn test_converters_roundtrip() {
        let original = params();
        let persisted = from_call_parameters(&original, Utc::now());
        let back = to_call_parameters(&persisted).unwrap();
        assert_eq!(back, original);
    }

    #[test]
    fn test_unknown_call_type_is_bad_record() {
        let mut persisted = from_call_parameters(&params(), Utc::now());
        persisted.call_type = "SEND".to_string();
        assert!(matches!(
            to_call_parameters(&persisted),
            Err(StoreError::BadRecord(_))
        ));
    }

    #[test]
    fn test_timestamp_survives_disk_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");
        let call = from_call_parameters(&params(), Utc::now());
        append_call(&path, call.clone()).unwrap();

        let state = load_state_file(&path).unwrap();
        assert_eq!(state.calls[0].timestamp, call.timestamp);
    }
}
