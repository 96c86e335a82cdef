//! # Fixtures
//!
//! Human-authored JSON call setups at `~/.chop/fixtures/<name>.json`.
//! Loading one installs the bytecode at the well-known fixture target and
//! fills the call parameters, ready to execute.

use crate::errors::StoreError;
use crate::params::{CallParameters, CallType, DEFAULT_TARGET};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Expected outcome, for fixtures that double as regression checks.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpectedResult {
    /// Expected success flag.
    pub success: bool,
    /// Expected gas consumption.
    pub gas_used: u64,
}

/// One fixture file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fixture {
    /// Display name; also the file stem.
    pub name: String,
    /// Runtime bytecode installed at the fixture target.
    pub bytecode: String,
    /// Calldata for the call.
    pub calldata: String,
    /// Sender address string.
    pub caller: String,
    /// Value string.
    pub value: String,
    /// Gas budget.
    pub gas_limit: u64,
    /// Optional expected outcome.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_result: Option<ExpectedResult>,
}

impl Fixture {
    /// The call parameters this fixture sets up: a CALL against the
    /// fixture target carrying the fixture's calldata.
    #[must_use]
    pub fn to_parameters(&self) -> CallParameters {
        CallParameters {
            call_type: CallType::Call,
            caller: self.caller.clone(),
            target: DEFAULT_TARGET.to_string(),
            value: self.value.clone(),
            gas_limit: self.gas_limit.to_string(),
            input_data: self.calldata.clone(),
            salt: String::new(),
        }
    }
}

/// Resolves `~/.chop/fixtures`.
///
/// # Errors
///
/// `NoHomeDir` when the home directory cannot be resolved.
pub fn fixtures_dir() -> Result<PathBuf, StoreError> {
    dirs::home_dir()
        .map(|home| home.join(".chop").join("fixtures"))
        .ok_or(StoreError::NoHomeDir)
}

/// Scans the fixtures directory, sorted by name. A missing directory is
/// an empty list. Unparseable files are skipped with a warning.
///
/// # Errors
///
/// `Io` when the directory exists but cannot be read.
pub fn list(dir: &Path) -> Result<Vec<Fixture>, StoreError> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut fixtures = Vec::new();
    let entries = fs::read_dir(dir).map_err(|e| StoreError::io(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| StoreError::io(dir, e))?;
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
            continue;
        }
        match read_fixture(&path) {
            Ok(fixture) => fixtures.push(fixture),
            Err(err) => warn!(path = %path.display(), %err, "skipping unreadable fixture"),
        }
    }
    fixtures.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(fixtures)
}

/// Loads one fixture by name.
///
/// # Errors
///
/// `Io` when missing, `MalformedJson` when unparseable.
pub fn load(dir: &Path, name: &str) -> Result<Fixture, StoreError> {
    read_fixture(&dir.join(format!("{name}.json")))
}

fn read_fixture(path: &Path) -> Result<Fixture, StoreError> {
    let raw = fs::read_to_string(path).map_err(|e| StoreError::io(path, e))?;
    serde_json::from_str(&raw).map_err(|e| StoreError::malformed(path, e))
}

/// Saves a fixture, creating the directory as needed. Returns the path.
///
/// # Errors
///
/// `Io` on write failure.
pub fn save(dir: &Path, fixture: &Fixture) -> Result<PathBuf, StoreError> {
    fs::create_dir_all(dir).map_err(|e| StoreError::io(dir, e))?;
    let path = dir.join(format!("{}.json", sanitize_name(&fixture.name)));
    let json = serde_json::to_string_pretty(fixture)?;
    fs::write(&path, json).map_err(|e| StoreError::io(&path, e))?;
    Ok(path)
}

fn sanitize_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "fixture".to_string()
    } else {
        cleaned
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn fixture(name: &str) -> Fixture {
        Fixture {
            name: name.to_string(),
            bytecode: "0x6005600a01".to_string(),
            calldata: "0x".to_string(),
            caller: "0x00000000000000000000000000000000000000aa".to_string(),
            value: "0".to_string(),
            gas_limit: 1_000_000,
            expected_result: Some(ExpectedResult {
                success: true,
                gas_used: 21,
            }),
        }
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = tempdir().unwrap();
        let original = fixture("adder");
        let path = save(dir.path(), &original).unwrap();
        assert!(path.ends_with("adder.json"));

        let loaded = load(dir.path(), "adder").unwrap();
        assert_eq!(loaded, original);
    }

    #[test]
    fn test_list_sorted_and_skips_garbage() {
        let dir = tempdir().unwrap();
        save(dir.path(), &fixture("zeta")).unwrap();
        save(dir.path(), &fixture("alpha")).unwrap();
        fs::write(dir.path().join("broken.json"), "nope").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let names: Vec<String> = list(dir.path()).unwrap().into_iter().map(|f| f.name).collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
    }

    #[test]
    fn test_missing_dir_is_empty_list() {
        let dir = tempdir().unwrap();
        let fixtures = list(&dir.path().join("nope")).unwrap();
        assert!(fixtures.is_empty());
    }

    #[test]
    fn test_to_parameters() {
        let params = fixture("adder").to_parameters();
        assert_eq!(params.call_type, CallType::Call);
        assert_eq!(params.target, DEFAULT_TARGET);
        assert_eq!(params.gas_limit, "1000000");
    }

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("my fixture!"), "my_fixture_");
        assert_eq!(sanitize_name(""), "fixture");
        assert_eq!(sanitize_name("ok-name_2"), "ok-name_2");
    }
}
