//! # Call Parameters
//!
//! The editable surface form of a call (strings, because the UI edits them)
//! and the typed form the engine dispatches, plus the execution result.

use crate::errors::ValidationError;
use crate::validation::{self, ParamField};
use chop_evm::LogEntry;
use chop_types::{parse_u256, parse_u64, Address, Bytes, U256};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The five call shapes chop can execute.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallType {
    /// Normal message call.
    Call,
    /// Read-only call; state mutation fails.
    StaticCall,
    /// Target code in the caller's storage context.
    DelegateCall,
    /// Deploy via nonce-derived address.
    Create,
    /// Deploy via salt-derived address.
    Create2,
}

impl CallType {
    /// Every call type, in display order.
    pub const ALL: [CallType; 5] = [
        CallType::Call,
        CallType::StaticCall,
        CallType::DelegateCall,
        CallType::Create,
        CallType::Create2,
    ];

    /// Canonical name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            CallType::Call => "CALL",
            CallType::StaticCall => "STATICCALL",
            CallType::DelegateCall => "DELEGATECALL",
            CallType::Create => "CREATE",
            CallType::Create2 => "CREATE2",
        }
    }

    /// Parse a canonical name.
    #[must_use]
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_ascii_uppercase().as_str() {
            "CALL" => Some(CallType::Call),
            "STATICCALL" => Some(CallType::StaticCall),
            "DELEGATECALL" => Some(CallType::DelegateCall),
            "CREATE" => Some(CallType::Create),
            "CREATE2" => Some(CallType::Create2),
            _ => None,
        }
    }

    /// True for CREATE / CREATE2, which derive their own target.
    #[must_use]
    pub fn is_create(&self) -> bool {
        matches!(self, CallType::Create | CallType::Create2)
    }
}

impl fmt::Display for CallType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Editable call parameters. All values are surface strings; validation
/// and parsing happen at execute time (and eagerly per field in the UI).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallParameters {
    /// Call shape.
    pub call_type: CallType,
    /// Sender address, 0x + 40 hex.
    pub caller: String,
    /// Target address; ignored for CREATE*.
    pub target: String,
    /// Value in wei, decimal or 0x-hex.
    pub value: String,
    /// Gas budget, decimal.
    pub gas_limit: String,
    /// Calldata (or init code for CREATE*), 0x-hex.
    pub input_data: String,
    /// CREATE2 salt, 0x + 64 hex; empty otherwise.
    pub salt: String,
}

/// Default gas budget offered in the editor.
pub const DEFAULT_GAS_LIMIT: u64 = 1_000_000;

/// Default target for quick experiments; SetCode-style fixture loading
/// installs bytecode here.
pub const DEFAULT_TARGET: &str = "0x0000000000000000000000000000000000001000";

impl CallParameters {
    /// Fresh defaults for the given sender.
    #[must_use]
    pub fn defaults(caller: Address) -> Self {
        Self {
            call_type: CallType::Call,
            caller: caller.to_hex(),
            target: DEFAULT_TARGET.to_string(),
            value: "0".to_string(),
            gas_limit: DEFAULT_GAS_LIMIT.to_string(),
            input_data: "0x".to_string(),
            salt: String::new(),
        }
    }

    /// The default surface value for one field.
    #[must_use]
    pub fn default_field(field: ParamField, caller: Address) -> String {
        let defaults = Self::defaults(caller);
        match field {
            ParamField::CallType => defaults.call_type.as_str().to_string(),
            ParamField::Caller => defaults.caller,
            ParamField::Target => defaults.target,
            ParamField::Value => defaults.value,
            ParamField::GasLimit => defaults.gas_limit,
            ParamField::InputData => defaults.input_data,
            ParamField::Salt => defaults.salt,
        }
    }

    /// Read one field's current surface value.
    #[must_use]
    pub fn field_value(&self, field: ParamField) -> String {
        match field {
            ParamField::CallType => self.call_type.as_str().to_string(),
            ParamField::Caller => self.caller.clone(),
            ParamField::Target => self.target.clone(),
            ParamField::Value => self.value.clone(),
            ParamField::GasLimit => self.gas_limit.clone(),
            ParamField::InputData => self.input_data.clone(),
            ParamField::Salt => self.salt.clone(),
        }
    }

    /// Overwrite one field from its surface value. `CallType` parses; the
    /// rest are stored verbatim (validation reports, it does not mutate).
    pub fn set_field(&mut self, field: ParamField, value: String) {
        match field {
            ParamField::CallType => {
                if let Some(call_type) = CallType::parse(&value) {
                    self.call_type = call_type;
                }
            }
            ParamField::Caller => self.caller = value,
            ParamField::Target => self.target = value,
            ParamField::Value => self.value = value,
            ParamField::GasLimit => self.gas_limit = value,
            ParamField::InputData => self.input_data = value,
            ParamField::Salt => self.salt = value,
        }
    }
}

/// Typed form of a validated parameter set, ready for VM dispatch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedCall {
    /// Call shape.
    pub call_type: CallType,
    /// Sender.
    pub caller: Address,
    /// Target; None for CREATE*.
    pub target: Option<Address>,
    /// Value in wei.
    pub value: U256,
    /// Gas budget.
    pub gas_limit: u64,
    /// Calldata or init code.
    pub input: Bytes,
    /// CREATE2 salt.
    pub salt: Option<U256>,
}

impl ParsedCall {
    /// Validates and parses the surface form.
    ///
    /// # Errors
    ///
    /// Returns the first `ValidationError` encountered.
    pub fn from_parameters(params: &CallParameters) -> Result<Self, ValidationError> {
        validation::validate_call_parameters(params)?;

        let caller = Address::parse(&params.caller)
            .map_err(|e| ValidationError::field(ParamField::Caller, e.to_string()))?;
        let target = if params.call_type.is_create() {
            None
        } else {
            Some(
                Address::parse(&params.target)
                    .map_err(|e| ValidationError::field(ParamField::Target, e.to_string()))?,
            )
        };
        let value = if params.value.trim().is_empty() {
            U256::zero()
        } else {
            parse_u256(&params.value)
                .map_err(|e| ValidationError::field(ParamField::Value, e.to_string()))?
        };
        let gas_limit = parse_u64(&params.gas_limit)
            .map_err(|e| ValidationError::field(ParamField::GasLimit, e.to_string()))?;
        let input = Bytes::parse(&params.input_data)
            .map_err(|e| ValidationError::field(ParamField::InputData, e.to_string()))?;
        let salt = if params.call_type == CallType::Create2 {
            let raw = Bytes::parse(&params.salt)
                .map_err(|e| ValidationError::field(ParamField::Salt, e.to_string()))?;
            Some(U256::from_big_endian(raw.as_slice()))
        } else {
            None
        };

        Ok(Self {
            call_type: params.call_type,
            caller,
            target,
            value,
            gas_limit,
            input,
            salt,
        })
    }
}

/// What one execution produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallResult {
    /// True on normal completion.
    pub success: bool,
    /// Return data (or revert payload).
    pub return_data: Bytes,
    /// Gas left in the top frame.
    pub gas_left: u64,
    /// Empty on success; a structured reason otherwise.
    pub error_info: String,
    /// Logs emitted, empty on failure.
    pub logs: Vec<LogEntry>,
    /// Deployed contract address for CREATE*.
    pub deployed_address: Option<Address>,
}

impl CallResult {
    /// Gas consumed against a budget, clamped at zero.
    #[must_use]
    pub fn gas_used(&self, gas_limit: u64) -> u64 {
        gas_limit.saturating_sub(self.gas_left)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn caller() -> Address {
        Address::parse("0x00000000000000000000000000000000000000aa").unwrap()
    }

    #[test]
    fn test_call_type_parse() {
        assert_eq!(CallType::parse("CALL"), Some(CallType::Call));
        assert_eq!(CallType::parse("create2"), Some(CallType::Create2));
        assert_eq!(CallType::parse(" staticcall "), Some(CallType::StaticCall));
        assert_eq!(CallType::parse("SEND"), None);
    }

    #[test]
    fn test_defaults_parse_clean() {
        let params = CallParameters::defaults(caller());
        let parsed = ParsedCall::from_parameters(&params).unwrap();
        assert_eq!(parsed.call_type, CallType::Call);
        assert_eq!(parsed.caller, caller());
        assert_eq!(parsed.gas_limit, DEFAULT_GAS_LIMIT);
        assert!(parsed.input.is_empty());
        assert!(parsed.salt.is_none());
    }

    #[test]
    fn test_create_ignores_target() {
        let mut params = CallParameters::defaults(caller());
        params.call_type = CallType::Create;
        params.target = "not an address".to_string();
        params.input_data = "0x00".to_string();
        let parsed = ParsedCall::from_parameters(&params).unwrap();
        assert!(parsed.target.is_none());
    }

    #[test]
    fn test_create2_salt_required_and_parsed() {
        let mut params = CallParameters::defaults(caller());
        params.call_type = CallType::Create2;
        params.input_data = "0x00".to_string();
        assert!(ParsedCall::from_parameters(&params).is_err());

        params.salt = format!("0x{}", "00".repeat(31) + "2a");
        let parsed = ParsedCall::from_parameters(&params).unwrap();
        assert_eq!(parsed.salt, Some(U256::from(42)));
    }

    #[test]
    fn test_field_roundtrip() {
        let mut params = CallParameters::defaults(caller());
        params.set_field(ParamField::Value, "123".to_string());
        assert_eq!(params.field_value(ParamField::Value), "123");
        params.set_field(ParamField::CallType, "DELEGATECALL".to_string());
        assert_eq!(params.call_type, CallType::DelegateCall);
    }
}
