//! Transaction host tests for bach-core
//!
//! Tests precompile dispatch, call tracing, simulation and running a
//! transaction against a shared ledger built from genesis.

mod common;

use bach_abi::{ParamType, Token};
use bach_core::{
    BlockEnv, CallInput, CallStatus, CallType, ContractHost, Env, ExecError, ExecutionConfig, Gas,
    GenesisAlloc, Ledger, Message, Output, TxEnv, RANDOM_ADDRESS,
};
use bach_crypto::{public_key_to_address, sign, PrivateKey};
use bach_evm::Vm;
use bach_primitives::{Address, H256, U256};
use bytes::Bytes;
use common::*;
use rand::rngs::OsRng;
use std::sync::Arc;

fn ecrecover_input(v_override: Option<u8>) -> (Vec<u8>, Address) {
    let key = PrivateKey::random(&mut OsRng);
    let signer = public_key_to_address(key.verifying_key());
    let hash = bach_crypto::keccak256(b"pay bob 10");
    let sig = sign(&hash, &key).unwrap();

    let mut input = Vec::with_capacity(128);
    input.extend_from_slice(hash.as_bytes());
    input.extend_from_slice(&[0u8; 31]);
    input.push(v_override.unwrap_or(sig.v));
    input.extend_from_slice(&sig.r);
    input.extend_from_slice(&sig.s);
    (input, signer)
}

// ==================== Precompile Tests ====================

/// Test ecrecover through the dispatcher returns the signer word
#[test]
fn test_precompile_ecrecover() {
    let mut chain = TestChain::new();
    let (input, signer) = ecrecover_input(None);
    let mut gas = Gas::new(DEFAULT_GAS);

    let mut host = chain.host();
    let output = host
        .execute(Message::call(ALICE, addr(1), U256::zero(), CallInput::encoded(input), &mut gas))
        .unwrap()
        .into_bytes();
    assert_eq!(Address::from_word(&H256::from_slice(&output).unwrap()), signer);
    assert_eq!(gas.remaining(), DEFAULT_GAS - 21_000 - 3_000);
}

/// Test ecrecover with an invalid v yields the zero word, not an error
#[test]
fn test_precompile_ecrecover_bad_v() {
    let mut chain = TestChain::new();
    let (input, _) = ecrecover_input(Some(29));
    let mut gas = Gas::new(DEFAULT_GAS);

    let mut host = chain.host();
    let output = host
        .execute(Message::call(ALICE, addr(1), U256::zero(), CallInput::encoded(input), &mut gas))
        .unwrap()
        .into_bytes();
    assert_eq!(output.as_ref(), &[0u8; 32]);
    assert!(host.finish().success);
}

/// Test sha256 precompile output and linear gas
#[test]
fn test_precompile_sha256() {
    let mut chain = TestChain::new();
    let mut gas = Gas::new(DEFAULT_GAS);

    let mut host = chain.host();
    let output = host
        .execute(Message::call(ALICE, addr(2), U256::zero(), CallInput::encoded(b"abc".to_vec()), &mut gas))
        .unwrap()
        .into_bytes();
    assert_eq!(
        hex::encode(&output),
        "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
    );
    assert_eq!(gas.remaining(), DEFAULT_GAS - 21_000 - 72);
}

/// Test value cannot be sent to a precompile
#[test]
fn test_precompile_rejects_value() {
    let mut chain = TestChain::new();
    let mut gas = Gas::new(DEFAULT_GAS);

    let mut host = chain.host();
    let err = host
        .execute(Message::call(ALICE, addr(4), U256::one(), CallInput::encoded(vec![1, 2]), &mut gas))
        .unwrap_err();
    assert_eq!(err, ExecError::ValueToPrecompile);
    assert!(!host.finish().success);
    assert_eq!(chain.balance(&ALICE), U256::from(1000u64));
}

/// Test a named method cannot be called on a precompile
#[test]
fn test_precompile_rejects_packed_input() {
    let mut chain = TestChain::new();
    let mut gas = Gas::new(DEFAULT_GAS);

    let mut host = chain.host();
    let err = host
        .execute(Message::call(
            ALICE,
            addr(4),
            U256::zero(),
            CallInput::packed("identity", vec![], vec![]),
            &mut gas,
        ))
        .unwrap_err();
    assert!(matches!(err, ExecError::MethodNotFound(_)));
}

/// Test the randomness precompile draws a fresh word per call
#[test]
fn test_precompile_random() {
    let mut chain = TestChain::new();
    let mut gas = Gas::new(DEFAULT_GAS);

    let mut host = chain.host();
    let mut draw = |gas: &mut Gas| {
        host.execute(Message::call(ALICE, RANDOM_ADDRESS, U256::zero(), CallInput::encoded(vec![]), gas))
            .unwrap()
            .into_bytes()
    };
    let first = draw(&mut gas);
    let second = draw(&mut gas);
    assert_eq!(first.len(), 32);
    assert_ne!(first, second);
    assert_eq!(gas.remaining(), DEFAULT_GAS - 2 * (21_000 + 100));
}

// ==================== Tracing Tests ====================

/// Test the call tree across bytecode and native frames
#[test]
fn test_trace_nested_calls() {
    let mut chain = TestChain::new().with_tracing();
    let mut gas = Gas::new(DEFAULT_GAS);

    let mut host = chain.host();
    host.execute(Message::call(ALICE, CALLER, U256::zero(), CallInput::encoded(vec![]), &mut gas))
        .unwrap();
    let receipt = host.finish();
    let root = receipt.trace.unwrap();

    assert_eq!(root.call_type, CallType::Call);
    assert_eq!(root.from, ALICE);
    assert_eq!(root.to, CALLER);
    assert_eq!(root.status, CallStatus::Succeeded);
    assert!(root.gas_used > 0);
    assert_eq!(root.calls.len(), 1);

    let guard = &root.calls[0];
    assert_eq!(guard.from, CALLER);
    assert_eq!(guard.to, GUARD);
    assert_eq!(guard.status, CallStatus::Succeeded);
    assert_eq!(guard.calls.len(), 1);

    let faulty = &guard.calls[0];
    assert_eq!(faulty.to, FAULTY);
    assert_eq!(faulty.status, CallStatus::ExecutionReverted);
    assert_eq!(faulty.output.to_vec(), bach_abi::encode_revert_reason("bad state"));
}

/// Test a creation frame records the new address
#[test]
fn test_trace_create() {
    let mut chain = TestChain::new().with_tracing();
    let mut gas = Gas::new(DEFAULT_GAS);

    let mut host = chain.host();
    let created = host
        .execute(Message::create(
            ALICE,
            U256::zero(),
            Bytes::from_static(DOUBLER_INIT),
            None,
            &mut gas,
        ))
        .unwrap()
        .address()
        .unwrap();
    let root = host.call_trace().cloned().unwrap();

    assert_eq!(root.call_type, CallType::Create);
    assert_eq!(root.to, created);
    assert_eq!(root.output.as_ref(), DOUBLER_CODE);
}

/// Test a failed transaction still reports its trace
#[test]
fn test_trace_reverted_transaction() {
    let mut chain = TestChain::new().with_tracing();
    let mut gas = Gas::new(DEFAULT_GAS);
    let input = CallInput::packed("callThenRevert", vec![Token::Address(COUNTER)], vec![]);

    let mut host = chain.host();
    host.execute(Message::call(ALICE, GUARD, U256::zero(), input, &mut gas))
        .unwrap_err();
    let receipt = host.finish();
    assert!(!receipt.success);

    let root = receipt.trace.unwrap();
    assert_eq!(root.status, CallStatus::ExecutionReverted);
    assert_eq!(root.calls.len(), 1);
    assert_eq!(root.calls[0].status, CallStatus::Succeeded);
}

/// Test no trace is kept unless enabled
#[test]
fn test_trace_disabled() {
    let mut chain = TestChain::new();
    let mut gas = Gas::new(DEFAULT_GAS);

    let mut host = chain.host();
    host.execute(Message::call(ALICE, addr(0xb0b), U256::one(), CallInput::encoded(vec![]), &mut gas))
        .unwrap();
    assert!(host.call_trace().is_none());
    assert!(host.finish().trace.is_none());
}

// ==================== Host Tests ====================

/// Test simulation returns a result but keeps no state
#[test]
fn test_simulate_discards_changes() {
    let mut chain = TestChain::new();
    let mut gas = Gas::new(DEFAULT_GAS);

    let mut host = chain.host();
    let output = host
        .simulate(Message::call(
            ALICE,
            COUNTER,
            U256::from(5u64),
            CallInput::packed("increment", vec![], vec![ParamType::Uint(256)]),
            &mut gas,
        ))
        .unwrap();
    assert_eq!(output, Output::Tokens(vec![Token::Uint(U256::one())]));
    assert!(!host.must_revert());
    assert_eq!(host.context().pending_changes(), 0);

    let receipt = host.finish();
    assert!(receipt.success);
    assert!(receipt.report.events.is_empty());
    assert_eq!(chain.slot(&COUNTER, 0), U256::zero());
    assert_eq!(chain.balance(&ALICE), U256::from(1000u64));
}

/// Test a later failure reverts earlier successful messages
#[test]
fn test_failure_reverts_whole_transaction() {
    let mut chain = TestChain::new();
    let mut gas = Gas::new(DEFAULT_GAS);

    let mut host = chain.host();
    host.execute(Message::call(ALICE, addr(0xb0b), U256::from(300u64), CallInput::encoded(vec![]), &mut gas))
        .unwrap();
    host.execute(Message::call(ALICE, REVERTER, U256::zero(), CallInput::encoded(vec![]), &mut gas))
        .unwrap_err();
    let receipt = host.finish();

    assert!(!receipt.success);
    assert!(matches!(receipt.error, Some(ExecError::Reverted { .. })));
    assert_eq!(chain.balance(&ALICE), U256::from(1000u64));
    assert!(chain.ledger.account(&addr(0xb0b)).is_none());
}

/// Test a host dropped after a failed message keeps none of its writes
#[test]
fn test_dropped_host_reverts_failed_transaction() {
    let mut chain = TestChain::new();
    let mut gas = Gas::new(DEFAULT_GAS);

    {
        let mut host = chain.host();
        host.execute(Message::call(
            ALICE,
            COUNTER,
            U256::zero(),
            CallInput::packed("increment", vec![], vec![ParamType::Uint(256)]),
            &mut gas,
        ))
        .unwrap();
        host.execute(Message::call(
            ALICE,
            FAULTY,
            U256::zero(),
            CallInput::packed("fail", vec![], vec![]),
            &mut gas,
        ))
        .unwrap_err();
        assert!(host.must_revert());
    }

    assert_eq!(chain.slot(&COUNTER, 0), U256::zero());
    assert_eq!(chain.slot(&FAULTY, 0), U256::zero());
}

/// Test an unfinished host reverts even when every message succeeded
#[test]
fn test_dropped_host_reverts_successful_messages() {
    let mut chain = TestChain::new();
    let mut gas = Gas::new(DEFAULT_GAS);

    let mut host = chain.host();
    host.execute(Message::call(ALICE, addr(0xb0b), U256::from(300u64), CallInput::encoded(vec![]), &mut gas))
        .unwrap();
    assert!(!host.must_revert());
    drop(host);

    assert_eq!(chain.balance(&ALICE), U256::from(1000u64));
    assert!(chain.ledger.account(&addr(0xb0b)).is_none());
}

/// Test a transaction against a shared ledger loaded from genesis
#[test]
fn test_genesis_shared_ledger() {
    init_tracing();

    let alloc: GenesisAlloc = serde_json::from_str(
        r#"{
            "0x00000000000000000000000000000000000a11ce": { "balance": "0x3e8" },
            "0x00000000000000000000000000000000000000d0": { "code": "0xd00b", "nonce": 1 }
        }"#,
    )
    .unwrap();
    let shared = Ledger::from_genesis(&alloc).unwrap().into_shared();
    let config = ExecutionConfig::default();
    let vm: Arc<dyn Vm> = Arc::new(sample_vm(GUARD, FAULTY, COUNTER));
    let env = Env::new(
        &config,
        BlockEnv::default(),
        TxEnv {
            hash: H256::from_low_u64_be(1),
            origin: ALICE,
            ..Default::default()
        },
    );

    let receipt = {
        let mut ledger = shared.write();
        let mut host = ContractHost::new(&mut ledger, env, vm, &config);
        let mut gas = Gas::new(DEFAULT_GAS);
        let output = host
            .execute(Message::call(
                ALICE,
                DOUBLER,
                U256::from(1u64),
                CallInput::packed("double", vec![Token::Uint(U256::from(50u64))], vec![ParamType::Uint(256)]),
                &mut gas,
            ))
            .unwrap();
        assert_eq!(output, Output::Tokens(vec![Token::Uint(U256::from(100u64))]));
        host.finish()
    };

    assert!(receipt.success);
    assert!(receipt.report.touched_accounts.contains(&DOUBLER));
    let ledger = shared.read();
    assert_eq!(ledger.account(&ALICE).unwrap().balance, U256::from(999u64));
    assert_eq!(ledger.account(&DOUBLER).unwrap().balance, U256::one());
}
