//! # Execution Engine
//!
//! Turns a validated parameter set into one VM dispatch and captures the
//! outcome as a [`CallResult`] with a classified error string. The wider
//! pipeline (persistence, history, blockchain, account mirroring) lives on
//! [`crate::session::Session`]; this module owns only the VM boundary.

use crate::errors::EngineError;
use crate::params::{CallParameters, CallResult, CallType, ParsedCall};
use chop_evm::{CallKind, VmError, VmManager, VmMessage, VmOutcome};
use chop_types::Bytes;
use tracing::debug;

/// Stateless façade over the VM dispatch path.
pub struct ExecutionEngine;

impl ExecutionEngine {
    /// Validate, parse and execute one call against the VM.
    ///
    /// VM-level failures (revert, out of gas, write protection, ...) come
    /// back as `Ok` with `CallResult.success = false`; only parameter and
    /// VM-availability problems are `EngineError`s.
    ///
    /// # Errors
    ///
    /// `InvalidParameters` when validation rejects the set.
    pub fn execute(
        vm: &mut VmManager,
        params: &CallParameters,
    ) -> Result<CallResult, EngineError> {
        let parsed = ParsedCall::from_parameters(params)?;
        Ok(Self::execute_parsed(vm, &parsed))
    }

    /// Execute an already-parsed call.
    #[must_use]
    pub fn execute_parsed(vm: &mut VmManager, parsed: &ParsedCall) -> CallResult {
        let message = VmMessage {
            caller: parsed.caller,
            target: parsed.target.unwrap_or_default(),
            value: parsed.value,
            data: parsed.input.clone(),
            gas_limit: parsed.gas_limit,
            salt: parsed.salt,
        };

        let outcome = match parsed.call_type {
            CallType::Call => vm.call(CallKind::Call, &message),
            CallType::StaticCall => vm.call(CallKind::StaticCall, &message),
            CallType::DelegateCall => vm.call(CallKind::DelegateCall, &message),
            CallType::Create | CallType::Create2 => vm.create(&message),
        };
        debug!(
            call_type = %parsed.call_type,
            success = outcome.success,
            gas_left = outcome.gas_left,
            "executed"
        );

        Self::capture(outcome)
    }

    fn capture(outcome: VmOutcome) -> CallResult {
        let error_info = match (&outcome.success, &outcome.error) {
            (true, _) => String::new(),
            (false, Some(err)) => describe_vm_error(err, &outcome.output),
            (false, None) => "execution failed".to_string(),
        };
        CallResult {
            success: outcome.success,
            return_data: outcome.output,
            gas_left: outcome.gas_left,
            error_info,
            logs: outcome.logs,
            deployed_address: outcome.deployed,
        }
    }
}

/// Human-facing classification of a VM failure. Revert payloads that carry
/// a standard `Error(string)` ABI encoding are decoded into the message.
#[must_use]
pub fn describe_vm_error(error: &VmError, output: &Bytes) -> String {
    match error {
        VmError::Revert(_) => match decode_revert_string(output.as_slice()) {
            Some(reason) => format!("reverted: {reason}"),
            None if output.is_empty() => "reverted".to_string(),
            None => format!("reverted with {} bytes of data", output.len()),
        },
        other => other.to_string(),
    }
}

/// Decode the Solidity `Error(string)` revert ABI:
/// selector 0x08c379a0, then abi-encoded (offset, length, utf8 bytes).
#[must_use]
pub fn decode_revert_string(data: &[u8]) -> Option<String> {
    const SELECTOR: [u8; 4] = [0x08, 0xC3, 0x79, 0xA0];
    if data.len() < 4 + 32 + 32 || data[..4] != SELECTOR {
        return None;
    }
    let body = &data[4..];
    let length = usize::try_from(u64::from_be_bytes(body[56..64].try_into().ok()?)).ok()?;
    let text = body.get(64..64 + length)?;
    String::from_utf8(text.to_vec()).ok()
}

// =============================================================================
// TESTS
// =============================================================================
