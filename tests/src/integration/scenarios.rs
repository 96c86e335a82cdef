//! End-to-end operator scenarios: arithmetic call, revert, deploys,
//! write protection, persistence replay and disassembly navigation.

use crate::support::{account0, session, SEED};
use chop_core::{
    analyzer, disassemble, replay_state_file, CallParameters, CallType, ChopConfig, Session,
    params::DEFAULT_TARGET,
};
use chop_types::{Address, Bytes, U256};

/// PUSH1 05, PUSH1 0A, ADD, then MSTORE/RETURN shuffle; 32 bytes out.
const ADD_BYTECODE: &str = "0x6005600a01600352600360205260206000f3";

/// Init code deploying `6005600055` (store 5 at slot 0).
const STORE5_INITCODE: &str = "0x6460056000556000526005601bf3";

const STORE5_RUNTIME: [u8; 5] = [0x60, 0x05, 0x60, 0x00, 0x55];

fn call_params(session: &Session, target: &str) -> CallParameters {
    let mut params = CallParameters::defaults(account0(session));
    params.target = target.to_string();
    params
}

#[test]
fn s1_arithmetic_call() {
    let mut session = session();
    let target = Address::parse(DEFAULT_TARGET).unwrap();
    session.set_code(target, Bytes::parse(ADD_BYTECODE).unwrap());

    let params = call_params(&session, DEFAULT_TARGET);
    let record = session.execute(&params).unwrap();

    assert!(record.result.success, "{}", record.result.error_info);
    assert_eq!(record.result.return_data.len(), 32);
    // Only a couple dozen gas for pushes, adds and memory: no intrinsic
    // transaction cost is charged.
    assert!(record.result.gas_left > 999_900);
    assert!(record.result.gas_left < 1_000_000);

    assert_eq!(session.chain.height(), 1);
    let tx = &record.transaction;
    assert!(tx.status);
    assert_eq!(tx.gas_used, 1_000_000 - record.result.gas_left);
}

#[test]
fn s1_arithmetic_result_byte() {
    // Same program with the sum stored at offset 0: the returned word
    // carries 15 in its last byte.
    let mut session = session();
    let target = Address::parse(DEFAULT_TARGET).unwrap();
    // PUSH1 05 PUSH1 0A ADD PUSH1 00 MSTORE PUSH1 20 PUSH1 00 RETURN
    session.set_code(target, Bytes::parse("0x6005600a0160005260206000f3").unwrap());

    let record = session.execute(&call_params(&session, DEFAULT_TARGET)).unwrap();
    assert!(record.result.success, "{}", record.result.error_info);
    assert_eq!(record.result.return_data.as_slice()[31], 0x0F);
}

#[test]
fn s2_revert() {
    let mut session = session();
    let target = Address::parse(DEFAULT_TARGET).unwrap();
    // PUSH1 00 PUSH1 00 REVERT
    session.set_code(target, Bytes::parse("0x60006000fd").unwrap());

    let record = session.execute(&call_params(&session, DEFAULT_TARGET)).unwrap();

    assert!(!record.result.success);
    assert!(record.result.error_info.contains("revert"));
    assert!(record.result.gas_left < 1_000_000);

    // The block is still appended, status false.
    assert_eq!(session.chain.height(), 1);
    assert!(!record.transaction.status);
}

#[test]
fn s3_create_deploy_and_interact() {
    let mut session = session();
    let caller = account0(&session);
    let nonce_before = session.accounts.get(caller).unwrap().nonce;

    let mut create = CallParameters::defaults(caller);
    create.call_type = CallType::Create;
    create.input_data = STORE5_INITCODE.to_string();
    let record = session.execute(&create).unwrap();
    assert!(record.result.success, "{}", record.result.error_info);

    // Deployed address follows keccak256(rlp(caller, nonce))[12..].
    let deployed = record.result.deployed_address.unwrap();
    assert_eq!(deployed, chop_evm::create_address(caller, nonce_before));

    // Registry holds the runtime code.
    let contract = session.registry.get(deployed).unwrap();
    assert_eq!(contract.bytecode.as_slice(), &STORE5_RUNTIME);

    // A subsequent CALL executes the runtime code and writes slot 0.
    let call = call_params(&session, &deployed.to_hex());
    let record = session.execute(&call).unwrap();
    assert!(record.result.success, "{}", record.result.error_info);

    let state = session.inspector().inspect_address(deployed);
    assert!(state.is_contract);
    assert_eq!(state.storage_slots.get(&U256::zero()), Some(&U256::from(5)));
}

#[test]
fn s4_create2_determinism() {
    let salt = format!("0x{}", "00".repeat(31) + "2a");

    let deploy = || {
        let mut session = session();
        let mut params = CallParameters::defaults(account0(&session));
        params.call_type = CallType::Create2;
        params.input_data = STORE5_INITCODE.to_string();
        params.salt = salt.clone();
        let record = session.execute(&params).unwrap();
        assert!(record.result.success, "{}", record.result.error_info);
        record.result.deployed_address.unwrap()
    };

    let first = deploy();
    let second = deploy();
    assert_eq!(first, second);

    let expected = chop_evm::create2_address(
        {
            let s = session();
            account0(&s)
        },
        U256::from(42),
        Bytes::parse(STORE5_INITCODE).unwrap().as_slice(),
    );
    assert_eq!(first, expected);
}

#[test]
fn s5_staticcall_write_protection() {
    let mut session = session();
    let target = Address::parse(DEFAULT_TARGET).unwrap();
    // The runtime code SSTOREs on entry.
    session.set_code(target, Bytes::from_slice(&[0x60, 0x05, 0x60, 0x00, 0x55, 0x00]));

    let storage_before = session.vm.state().storage_of(target);

    let mut params = call_params(&session, DEFAULT_TARGET);
    params.call_type = CallType::StaticCall;
    let record = session.execute(&params).unwrap();

    assert!(!record.result.success);
    assert!(record.result.error_info.contains("write protection"));
    assert!(record.result.logs.is_empty());
    assert_eq!(session.vm.state().storage_of(target), storage_before);
}

#[test]
fn s6_persistence_and_replay() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");

    // Live session: deploy, then call the deployed contract.
    let (deployed, live_nonce, live_balance, live_heights) = {
        let mut live = Session::new(Some(SEED), ChopConfig::default(), Some(path.clone()));
        let caller = account0(&live);

        let mut create = CallParameters::defaults(caller);
        create.call_type = CallType::Create;
        create.input_data = STORE5_INITCODE.to_string();
        let record = live.execute(&create).unwrap();
        let deployed = record.result.deployed_address.unwrap();

        let call = call_params(&live, &deployed.to_hex());
        live.execute(&call).unwrap();

        let account = live.accounts.get(caller).unwrap();
        (deployed, account.nonce, account.balance, live.chain.height())
    };

    // Relaunch with the same seed; boot replays the log.
    let mut rebooted = Session::new(Some(SEED), ChopConfig::default(), Some(path));
    let summary = replay_state_file(&mut rebooted);
    assert_eq!(summary.replayed, 2);
    assert_eq!(summary.skipped, 0);

    // History holds both calls in order.
    assert_eq!(rebooted.history.len(), 2);
    let types: Vec<CallType> = rebooted
        .history
        .all()
        .map(|entry| entry.parameters.call_type)
        .collect();
    assert_eq!(types, vec![CallType::Create, CallType::Call]);

    assert_eq!(rebooted.chain.height(), live_heights);
    assert!(rebooted.registry.get(deployed).is_some());

    let caller = account0(&rebooted);
    let account = rebooted.accounts.get(caller).unwrap();
    assert_eq!(account.nonce, live_nonce);
    assert_eq!(account.balance, live_balance);

    // The replayed contract answers with the same storage.
    let state = rebooted.inspector().inspect_address(deployed);
    assert_eq!(state.storage_slots.get(&U256::zero()), Some(&U256::from(5)));
}

#[test]
fn s7_disassembly_and_jump() {
    // PUSH1 05 JUMP | JUMPDEST STOP | JUMPDEST PUSH1 06 PUSH1 07
    let code = hex::decode("6005565b005b60066007").unwrap();
    let result = disassemble(&code);
    let analysis = &result.analysis;

    let dests: Vec<u16> = analysis.jump_dests.iter().copied().collect();
    assert_eq!(dests, vec![0x03, 0x05]);
    assert!(analysis.basic_blocks.len() >= 3);

    // The JUMP at instruction index 1 resolves through the preceding PUSH.
    let first_block = analyzer::instructions_for_block(&result, 0);
    let jump_index = first_block
        .iter()
        .position(|inst| inst.mnemonic == "JUMP")
        .unwrap();
    let target = analyzer::jump_destination(first_block, jump_index).unwrap();
    assert_eq!(target, 0x03);

    // Following the jump lands the cursor on the JUMPDEST at 0x03.
    let block_index = analyzer::block_containing_pc(analysis, target).unwrap();
    let block_insts = analyzer::instructions_for_block(&result, block_index);
    let inst_index = analyzer::instruction_index_by_pc(block_insts, target).unwrap();
    assert_eq!(block_insts[inst_index].pc, 0x03);
    assert!(block_insts[inst_index].is_jumpdest);
}
