//! # Parameter Validation
//!
//! Pure syntactic and semantic checks on call parameters. The UI runs the
//! field check eagerly on every edit; the execution engine runs the full
//! check again at execute time.

use crate::errors::ValidationError;
use crate::params::{CallParameters, CallType};
use chop_types::{parse_u256, parse_u64, Bytes};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The editable fields of a call parameter set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParamField {
    /// Call shape.
    CallType,
    /// Sender address.
    Caller,
    /// Target address.
    Target,
    /// Value in wei.
    Value,
    /// Gas budget.
    GasLimit,
    /// Calldata / init code.
    InputData,
    /// CREATE2 salt.
    Salt,
}

impl ParamField {
    /// All fields in editor order.
    pub const ALL: [ParamField; 7] = [
        ParamField::CallType,
        ParamField::Caller,
        ParamField::Target,
        ParamField::Value,
        ParamField::GasLimit,
        ParamField::InputData,
        ParamField::Salt,
    ];

    /// Label shown in the parameter list.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            ParamField::CallType => "call_type",
            ParamField::Caller => "caller",
            ParamField::Target => "target",
            ParamField::Value => "value",
            ParamField::GasLimit => "gas_limit",
            ParamField::InputData => "input_data",
            ParamField::Salt => "salt",
        }
    }
}

impl fmt::Display for ParamField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Check a single field's surface value.
///
/// # Errors
///
/// Returns a `ValidationError` anchored to the field.
pub fn validate_field(field: ParamField, value: &str) -> Result<(), ValidationError> {
    match field {
        ParamField::CallType => match CallType::parse(value) {
            Some(_) => Ok(()),
            None => Err(ValidationError::field(
                field,
                "must be CALL, STATICCALL, DELEGATECALL, CREATE or CREATE2",
            )),
        },
        ParamField::Caller | ParamField::Target => validate_address_field(field, value),
        ParamField::Value => {
            if value.trim().is_empty() {
                return Ok(());
            }
            parse_u256(value)
                .map(|_| ())
                .map_err(|_| ValidationError::field(field, "must be a decimal or 0x-hex integer"))
        }
        ParamField::GasLimit => match parse_u64(value) {
            Ok(0) => Err(ValidationError::field(field, "gas limit must be non-zero")),
            Ok(_) => Ok(()),
            Err(_) => Err(ValidationError::field(
                field,
                "must be a decimal integer fitting 64 bits",
            )),
        },
        ParamField::InputData => Bytes::parse(value)
            .map(|_| ())
            .map_err(|_| ValidationError::field(field, "must be 0x-prefixed even-length hex")),
        ParamField::Salt => {
            if value.is_empty() {
                return Ok(());
            }
            match Bytes::parse(value) {
                Ok(bytes) if bytes.len() == 32 => Ok(()),
                Ok(bytes) => Err(ValidationError::field(
                    field,
                    format!("salt must be exactly 32 bytes, got {}", bytes.len()),
                )),
                Err(_) => Err(ValidationError::field(
                    field,
                    "must be 0x-prefixed even-length hex",
                )),
            }
        }
    }
}

fn validate_address_field(field: ParamField, value: &str) -> Result<(), ValidationError> {
    if value.len() != 42 {
        return Err(ValidationError::field(
            field,
            "must be 42 characters: 0x + 40 hex digits",
        ));
    }
    if !value.starts_with("0x") {
        return Err(ValidationError::field(field, "must start with 0x"));
    }
    if !value[2..].chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ValidationError::field(field, "contains non-hex characters"));
    }
    Ok(())
}

/// Check the full parameter set, field rules plus cross-field rules.
///
/// # Errors
///
/// Returns the first failure found; field checks run first.
pub fn validate_call_parameters(params: &CallParameters) -> Result<(), ValidationError> {
    validate_field(ParamField::Caller, &params.caller)?;
    if !params.call_type.is_create() {
        // CREATE / CREATE2 derive their target; whatever is in the field
        // is ignored entirely.
        validate_field(ParamField::Target, &params.target)?;
    }
    if !params.value.trim().is_empty() {
        validate_field(ParamField::Value, &params.value)?;
    }
    validate_field(ParamField::GasLimit, &params.gas_limit)?;
    validate_field(ParamField::InputData, &params.input_data)?;

    match params.call_type {
        CallType::StaticCall => {
            let zero = params.value.trim().is_empty()
                || parse_u256(&params.value).is_ok_and(|v| v.is_zero());
            if !zero {
                return Err(ValidationError::cross("STATICCALL requires value = 0"));
            }
        }
        CallType::Create2 => {
            if params.salt.is_empty() {
                return Err(ValidationError::cross("CREATE2 requires a 32-byte salt"));
            }
            validate_field(ParamField::Salt, &params.salt)?;
        }
        _ => {}
    }
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chop_types::Address;

    #[test]
    fn test_call_type_field() {
        assert!(validate_field(ParamField::CallType, "CALL").is_ok());
        assert!(validate_field(ParamField::CallType, "create").is_ok());
        assert!(validate_field(ParamField::CallType, "TRANSFER").is_err());
    }

    #[test]
    fn test_address_fields() {
        let good = "0x0000000000000000000000000000000000001000";
        assert!(validate_field(ParamField::Caller, good).is_ok());
        assert!(validate_field(ParamField::Target, good).is_ok());

        assert!(validate_field(ParamField::Caller, "0x1234").is_err());
        assert!(validate_field(ParamField::Caller, &good.replace("0x", "zz")).is_err());
        let bad_digit = format!("0x{}g", "0".repeat(39));
        assert!(validate_field(ParamField::Caller, &bad_digit).is_err());
    }

    #[test]
    fn test_value_field() {
        assert!(validate_field(ParamField::Value, "0").is_ok());
        assert!(validate_field(ParamField::Value, "1000000000000000000").is_ok());
        assert!(validate_field(ParamField::Value, "0xff").is_ok());
        assert!(validate_field(ParamField::Value, "").is_ok());
        assert!(validate_field(ParamField::Value, "-1").is_err());
        assert!(validate_field(ParamField::Value, "ten").is_err());
    }

    #[test]
    fn test_gas_limit_field() {
        assert!(validate_field(ParamField::GasLimit, "1000000").is_ok());
        assert!(validate_field(ParamField::GasLimit, "0").is_err());
        assert!(validate_field(ParamField::GasLimit, "99999999999999999999999").is_err());
        assert!(validate_field(ParamField::GasLimit, "gas").is_err());
    }

    #[test]
    fn test_hex_fields() {
        assert!(validate_field(ParamField::InputData, "0x").is_ok());
        assert!(validate_field(ParamField::InputData, "0xdeadbeef").is_ok());
        assert!(validate_field(ParamField::InputData, "0xabc").is_err());
        assert!(validate_field(ParamField::InputData, "beef").is_err());

        let salt32 = format!("0x{}", "11".repeat(32));
        assert!(validate_field(ParamField::Salt, &salt32).is_ok());
        assert!(validate_field(ParamField::Salt, "0x1122").is_err());
    }

    #[test]
    fn test_cross_field_staticcall_value() {
        let caller = Address::parse("0x00000000000000000000000000000000000000aa").unwrap();
        let mut params = CallParameters::defaults(caller);
        params.call_type = CallType::StaticCall;
        params.value = "5".to_string();
        let err = validate_call_parameters(&params).unwrap_err();
        assert!(err.field.is_none());

        params.value = "0".to_string();
        assert!(validate_call_parameters(&params).is_ok());
    }

    #[test]
    fn test_cross_field_create2_salt() {
        let caller = Address::parse("0x00000000000000000000000000000000000000aa").unwrap();
        let mut params = CallParameters::defaults(caller);
        params.call_type = CallType::Create2;
        params.input_data = "0x00".to_string();
        assert!(validate_call_parameters(&params).is_err());

        params.salt = format!("0x{}", "00".repeat(32));
        assert!(validate_call_parameters(&params).is_ok());
    }

    #[test]
    fn test_create_skips_target_validation() {
        let caller = Address::parse("0x00000000000000000000000000000000000000aa").unwrap();
        let mut params = CallParameters::defaults(caller);
        params.call_type = CallType::Create;
        params.target = "garbage".to_string();
        assert!(validate_call_parameters(&params).is_ok());
    }
}
