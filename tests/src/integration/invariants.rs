//! Properties that must hold across components regardless of scenario.

use crate::support::{account0, session, SEED};
use chop_core::{CallParameters, CallType, ChopConfig, Session, params::DEFAULT_TARGET};
use chop_evm::{create2_address, create_address};
use chop_types::{Address, Bytes, U256};

const STORE5_INITCODE: &str = "0x6460056000556000526005601bf3";

fn snapshot_accounts(session: &Session) -> Vec<(Address, U256, u64, usize)> {
    session
        .accounts
        .all()
        .iter()
        .map(|a| (a.address, a.balance, a.nonce, a.code.len()))
        .collect()
}

#[test]
fn gas_left_bounded_and_error_info_consistent() {
    let mut session = session();
    let target = Address::parse(DEFAULT_TARGET).unwrap();

    // One success, one revert, one out-of-gas.
    let programs: [&[u8]; 3] = [
        &[0x00],
        &[0x60, 0x00, 0x60, 0x00, 0xFD],
        &[0x5B, 0x60, 0x00, 0x56],
    ];
    for code in programs {
        session.set_code(target, Bytes::from_slice(code));
        let mut params = CallParameters::defaults(account0(&session));
        params.target = DEFAULT_TARGET.to_string();
        params.gas_limit = "30000".to_string();

        let record = session.execute(&params).unwrap();
        assert!(record.result.gas_left <= 30_000);
        if record.result.success {
            assert!(record.result.error_info.is_empty());
        } else {
            assert!(!record.result.error_info.is_empty());
        }
    }
}

#[test]
fn staticcall_changes_nothing_anywhere() {
    let mut session = session();
    let target = Address::parse(DEFAULT_TARGET).unwrap();
    // Attempted SSTORE; also fund the target so balances are non-trivial.
    session.set_code(target, Bytes::from_slice(&[0x60, 0x05, 0x60, 0x00, 0x55, 0x00]));

    let accounts_before = snapshot_accounts(&session);
    let storage_before = session.vm.state().storage_of(target);

    let mut params = CallParameters::defaults(account0(&session));
    params.call_type = CallType::StaticCall;
    params.target = DEFAULT_TARGET.to_string();
    session.execute(&params).unwrap();

    assert_eq!(snapshot_accounts(&session), accounts_before);
    assert_eq!(session.vm.state().storage_of(target), storage_before);
}

#[test]
fn delegatecall_writes_caller_not_target() {
    let mut session = session();
    let caller = account0(&session);
    let library = Address::parse(DEFAULT_TARGET).unwrap();
    session.set_code(library, Bytes::from_slice(&[0x60, 0x05, 0x60, 0x00, 0x55, 0x00]));

    let mut params = CallParameters::defaults(caller);
    params.call_type = CallType::DelegateCall;
    params.target = DEFAULT_TARGET.to_string();
    let record = session.execute(&params).unwrap();
    assert!(record.result.success, "{}", record.result.error_info);

    // Target's storage untouched; caller's slot written.
    assert!(session.vm.state().storage_of(library).is_empty());
    assert_eq!(
        session.vm.state().sload(caller, U256::zero()),
        U256::from(5)
    );
}

#[test]
fn create_address_formula_and_nonce_increment() {
    let mut session = session();
    let caller = account0(&session);

    for _ in 0..3 {
        let nonce_before = session.accounts.get(caller).unwrap().nonce;
        let mut params = CallParameters::defaults(caller);
        params.call_type = CallType::Create;
        params.input_data = STORE5_INITCODE.to_string();

        let record = session.execute(&params).unwrap();
        assert!(record.result.success);
        assert_eq!(
            record.result.deployed_address,
            Some(create_address(caller, nonce_before))
        );
        assert_eq!(session.accounts.get(caller).unwrap().nonce, nonce_before + 1);
    }
}

#[test]
fn create2_address_ignores_nonce() {
    let mut session = session();
    let caller = account0(&session);
    let init = Bytes::parse(STORE5_INITCODE).unwrap();

    // Bump the nonce with a plain call first.
    let mut call = CallParameters::defaults(caller);
    call.target = DEFAULT_TARGET.to_string();
    session.execute(&call).unwrap();

    let mut params = CallParameters::defaults(caller);
    params.call_type = CallType::Create2;
    params.input_data = STORE5_INITCODE.to_string();
    params.salt = format!("0x{}", "00".repeat(31) + "07");

    let record = session.execute(&params).unwrap();
    assert!(record.result.success, "{}", record.result.error_info);
    assert_eq!(
        record.result.deployed_address,
        Some(create2_address(caller, U256::from(7), init.as_slice()))
    );
}

#[test]
fn chain_links_and_indices_hold() {
    let mut session = session();
    let target = Address::parse(DEFAULT_TARGET).unwrap();
    session.set_code(target, Bytes::from_slice(&[0x00]));

    let mut params = CallParameters::defaults(account0(&session));
    params.target = DEFAULT_TARGET.to_string();
    for _ in 0..5 {
        session.execute(&params).unwrap();
    }

    let chain = &session.chain;
    for n in 1..=chain.height() {
        let block = chain.get_block_by_number(n).unwrap();
        let parent = chain.get_block_by_number(n - 1).unwrap();
        assert_eq!(block.number, n);
        assert_eq!(block.parent_hash, parent.hash);
        assert_eq!(
            block.gas_used,
            block.transactions.iter().map(|t| t.gas_used).sum::<u64>()
        );
        for tx in &block.transactions {
            assert_eq!(chain.get_transaction_by_hash(tx.hash).unwrap(), tx);
            assert_eq!(chain.get_transaction_by_id(tx.id).unwrap(), tx);
        }
    }
}

#[test]
fn account_derivation_is_stable_across_sessions() {
    let first: Vec<Address> = Session::new(Some(SEED), ChopConfig::default(), None)
        .accounts
        .all()
        .iter()
        .map(|a| a.address)
        .collect();
    let second: Vec<Address> = Session::new(Some(SEED), ChopConfig::default(), None)
        .accounts
        .all()
        .iter()
        .map(|a| a.address)
        .collect();
    assert_eq!(first, second);
    assert_eq!(first.len(), 10);
}

#[test]
fn persistence_roundtrip_for_every_call_type() {
    use chop_core::persist::{from_call_parameters, to_call_parameters};
    use chrono::Utc;

    let caller = Address::new([0xAA; 20]);
    for call_type in CallType::ALL {
        let mut params = CallParameters::defaults(caller);
        params.call_type = call_type;
        if call_type == CallType::Create2 {
            params.salt = format!("0x{}", "11".repeat(32));
        }
        let persisted = from_call_parameters(&params, Utc::now());
        assert_eq!(to_call_parameters(&persisted).unwrap(), params);
    }
}
