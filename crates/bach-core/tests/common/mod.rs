//! Shared fixtures for bach-core integration tests
//!
//! - [`ScriptedVm`]: a VM backend whose "bytecode" keys into Rust closures
//! - Sample native contracts: [`Counter`], [`Faulty`], [`Guard`]
//! - [`TestChain`]: ledger plus environment, one host per transaction

#![allow(dead_code)]

use bach_abi::{decode, encode, function_selector, ParamType, Token};
use bach_core::{
    Account, BlockEnv, CallInput, ContractHost, ContractRegistry, Env, ExecError, ExecResult,
    ExecutionConfig, Ledger, Method, Mutability, NativeCall, NativeContract, TxEnv,
};
use bach_evm::{CallKind, Host, Revision, StatusCode, Vm, VmMessage, VmResult};
use bach_primitives::{Address, H256, U256};
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Chain ID used by every test
pub const TEST_CHAIN_ID: u64 = 1337;

/// Default gas budget for test messages
pub const DEFAULT_GAS: u64 = 1_000_000;

/// Gas a scripted contract charges for its own work
pub const SCRIPT_GAS: i64 = 100;

/// Install a fmt subscriber honouring `RUST_LOG`; repeated calls are ignored
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Address with `n` in its low bytes
pub fn addr(n: u64) -> Address {
    Address::from_low_u64_be(n)
}

// ==================== Scripted VM ====================

/// Behaviour bound to a code blob
pub type Script = Arc<dyn Fn(&mut dyn Host, &VmMessage) -> VmResult + Send + Sync>;

/// VM backend mapping code bytes to scripts.
///
/// Unknown code succeeds with empty output and charges nothing.
#[derive(Clone, Default)]
pub struct ScriptedVm {
    scripts: HashMap<Vec<u8>, Script>,
}

impl ScriptedVm {
    /// Empty backend
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `script` to `code`
    pub fn with<F>(mut self, code: &[u8], script: F) -> Self
    where
        F: Fn(&mut dyn Host, &VmMessage) -> VmResult + Send + Sync + 'static,
    {
        self.scripts.insert(code.to_vec(), Arc::new(script));
        self
    }
}

impl Vm for ScriptedVm {
    fn execute(&self, host: &mut dyn Host, _revision: Revision, message: &VmMessage, code: &[u8]) -> VmResult {
        match self.scripts.get(code) {
            Some(script) => script(host, message),
            None => VmResult::success(message.gas, Bytes::new()),
        }
    }
}

/// Gas left after a script spent [`SCRIPT_GAS`] plus what a child call used
pub fn gas_after(message: &VmMessage, child_budget: i64, child: &VmResult) -> i64 {
    message.gas - SCRIPT_GAS - (child_budget - child.gas_left)
}

/// Nested CALL descriptor issued by a script
pub fn nested_call(message: &VmMessage, to: Address, gas: i64, input: Vec<u8>) -> VmMessage {
    VmMessage::call(message.recipient, to, gas, U256::zero(), Bytes::from(input)).with_depth(message.depth + 1)
}

/// Nested CREATE2 descriptor issued by a script
pub fn nested_create2(message: &VmMessage, gas: i64, init_code: &[u8], salt: H256) -> VmMessage {
    VmMessage {
        kind: CallKind::Create2,
        is_static: false,
        depth: message.depth + 1,
        gas,
        recipient: Address::ZERO,
        sender: message.recipient,
        input: Bytes::copy_from_slice(init_code),
        value: U256::zero(),
        create2_salt: salt,
        code_address: Address::ZERO,
    }
}

/// Runtime code answering `double(uint256)`
pub const DOUBLER_CODE: &[u8] = &[0xd0, 0x0b];

/// Init code storing 42 in slot 0 and deploying [`DOUBLER_CODE`]
pub const DOUBLER_INIT: &[u8] = &[0xc0, 0xde];

/// Init code returning no runtime code
pub const EMPTY_INIT: &[u8] = &[0xee];

/// Runtime code that always reverts with "nope"
pub const REVERTER_CODE: &[u8] = &[0xbd];

/// Runtime code calling `Guard.callOut(faulty)` then recording success in slot 0
pub const CALLER_CODE: &[u8] = &[0xa0];

/// Runtime code deploying [`DOUBLER_INIT`] with CREATE2, salt from call data
pub const FACTORY_CODE: &[u8] = &[0xf2];

/// Runtime code calling `Counter.count()` with raw ABI data and returning it
pub const READER_CODE: &[u8] = &[0x4e];

/// Runtime code writing 42, its code address and its sender into slots 0 to 2
/// of the account it runs for
pub const STAMP_CODE: &[u8] = &[0x57];

/// Runtime code whose nested self-call sets transient slot 0 and reverts,
/// returning transient slots 0 and 1 afterwards
pub const STASH_CODE: &[u8] = &[0x75];

/// Runtime code sending more value than it holds, recording in slot 0 whether
/// the call failed hard and in slot 1 the gas it handed back
pub const PAYER_CODE: &[u8] = &[0x9a];

/// Backend with every sample script bound
pub fn sample_vm(guard: Address, faulty: Address, counter: Address) -> ScriptedVm {
    ScriptedVm::new()
        .with(DOUBLER_CODE, |_, message| {
            let selector = function_selector("double(uint256)");
            if message.input.len() < 4 || message.input[..4] != selector {
                return VmResult::failure(StatusCode::Failure, 0);
            }
            let args = match decode(&[ParamType::Uint(256)], &message.input[4..]) {
                Ok(args) => args,
                Err(_) => return VmResult::failure(StatusCode::Failure, 0),
            };
            let doubled = args[0].as_uint().unwrap_or_default() * U256::from(2u64);
            VmResult::success(message.gas - SCRIPT_GAS, Bytes::from(encode(&[Token::Uint(doubled)])))
        })
        .with(DOUBLER_INIT, |host, message| {
            host.set_storage(&message.recipient, &H256::ZERO, &H256::from_low_u64_be(42));
            VmResult::success(message.gas - SCRIPT_GAS, Bytes::from_static(DOUBLER_CODE))
        })
        .with(EMPTY_INIT, |_, message| VmResult::success(message.gas - SCRIPT_GAS, Bytes::new()))
        .with(REVERTER_CODE, |_, message| {
            VmResult::revert(
                message.gas - SCRIPT_GAS,
                Bytes::from(bach_abi::encode_revert_reason("nope")),
            )
        })
        .with(CALLER_CODE, move |host, message| {
            let selector = function_selector("callOut(address)");
            let data = bach_abi::encode_function_call(selector, &[Token::Address(faulty)]);
            let budget = message.gas / 2;
            let result = host.call(&nested_call(message, guard, budget, data));
            let gas_left = gas_after(message, budget, &result);
            if result.status_code != StatusCode::Success {
                return VmResult::revert(gas_left, result.output);
            }
            host.set_storage(&message.recipient, &H256::ZERO, &H256::from_low_u64_be(1));
            VmResult::success(gas_left, result.output)
        })
        .with(FACTORY_CODE, |host, message| {
            let salt = message
                .input
                .get(..32)
                .and_then(|word| H256::from_slice(word).ok())
                .unwrap_or_default();
            let budget = message.gas / 2;
            let result = host.call(&nested_create2(message, budget, DOUBLER_INIT, salt));
            let gas_left = gas_after(message, budget, &result);
            match result.create_address {
                Some(created) if result.status_code == StatusCode::Success => {
                    VmResult::success(gas_left, Bytes::copy_from_slice(created.to_word().as_bytes()))
                }
                _ => VmResult::revert(gas_left, result.output),
            }
        })
        .with(STAMP_CODE, |host, message| {
            let account = message.recipient;
            host.set_storage(&account, &H256::from_low_u64_be(0), &H256::from_low_u64_be(42));
            host.set_storage(&account, &H256::from_low_u64_be(1), &message.code_address.to_word());
            host.set_storage(&account, &H256::from_low_u64_be(2), &message.sender.to_word());
            VmResult::success(message.gas - SCRIPT_GAS, Bytes::new())
        })
        .with(STASH_CODE, |host, message| {
            let me = message.recipient;
            if message.depth > 0 {
                host.set_transient_storage(&me, &H256::ZERO, &H256::from_low_u64_be(1));
                return VmResult::revert(message.gas - SCRIPT_GAS, Bytes::new());
            }
            host.set_transient_storage(&me, &H256::from_low_u64_be(1), &H256::from_low_u64_be(7));
            let budget = message.gas / 2;
            let result = host.call(&nested_call(message, me, budget, vec![]));
            let mut output = host.get_transient_storage(&me, &H256::ZERO).as_bytes().to_vec();
            output.extend_from_slice(host.get_transient_storage(&me, &H256::from_low_u64_be(1)).as_bytes());
            VmResult::success(gas_after(message, budget, &result), Bytes::from(output))
        })
        .with(PAYER_CODE, |host, message| {
            let budget = message.gas / 2;
            let value = U256::from(1_000_000u64);
            let payment = VmMessage::call(message.recipient, addr(0xb0b), budget, value, Bytes::new())
                .with_depth(message.depth + 1);
            let result = host.call(&payment);
            let failed = u64::from(result.status_code == StatusCode::Failure);
            let account = message.recipient;
            host.set_storage(&account, &H256::from_low_u64_be(0), &H256::from_low_u64_be(failed));
            host.set_storage(
                &account,
                &H256::from_low_u64_be(1),
                &H256::from_low_u64_be(u64::try_from(result.gas_left).unwrap_or(u64::MAX)),
            );
            VmResult::success(gas_after(message, budget, &result), Bytes::new())
        })
        .with(READER_CODE, move |host, message| {
            let data = function_selector("count()").to_vec();
            let budget = message.gas / 2;
            let result = host.call(&nested_call(message, counter, budget, data));
            let gas_left = gas_after(message, budget, &result);
            VmResult {
                gas_left,
                ..result
            }
        })
}

// ==================== Native contracts ====================

fn uint_arg(args: &[Token], index: usize) -> ExecResult<U256> {
    args.get(index)
        .and_then(Token::as_uint)
        .ok_or_else(|| ExecError::revert("bad argument"))
}

fn address_arg(args: &[Token], index: usize) -> ExecResult<Address> {
    args.get(index)
        .and_then(Token::as_address)
        .ok_or_else(|| ExecError::revert("bad argument"))
}

/// Counter with its value in slot 0
pub struct Counter;

impl Counter {
    fn add(ctx: &mut NativeCall<'_, '_>, amount: U256) -> ExecResult<Vec<Token>> {
        let count = ctx
            .load_u256(H256::ZERO)
            .checked_add(amount)
            .ok_or_else(|| ExecError::revert("overflow"))?;
        ctx.store_u256(H256::ZERO, count)?;
        ctx.emit("Incremented", vec![H256::from_u256(count)], Bytes::new())?;
        Ok(vec![Token::Uint(count)])
    }
}

impl NativeContract for Counter {
    fn type_name(&self) -> &str {
        "Counter"
    }

    fn methods(&self) -> Vec<Method> {
        vec![
            Method::new("increment", vec![], vec![ParamType::Uint(256)], Mutability::Payable),
            Method::new(
                "add",
                vec![ParamType::Uint(256)],
                vec![ParamType::Uint(256)],
                Mutability::NonPayable,
            ),
            Method::new("count", vec![], vec![ParamType::Uint(256)], Mutability::View),
        ]
    }

    fn call(&self, method: &str, ctx: &mut NativeCall<'_, '_>, args: Vec<Token>) -> ExecResult<Vec<Token>> {
        match method {
            "increment" => Self::add(ctx, U256::one()),
            "add" => Self::add(ctx, uint_arg(&args, 0)?),
            "count" => Ok(vec![Token::Uint(ctx.load_u256(H256::ZERO))]),
            _ => Err(ExecError::MethodNotFound(method.to_string())),
        }
    }
}

/// Writes slot 0, then reverts with "bad state"
pub struct Faulty;

impl NativeContract for Faulty {
    fn type_name(&self) -> &str {
        "Faulty"
    }

    fn methods(&self) -> Vec<Method> {
        vec![Method::new("fail", vec![], vec![], Mutability::NonPayable)]
    }

    fn call(&self, method: &str, ctx: &mut NativeCall<'_, '_>, _args: Vec<Token>) -> ExecResult<Vec<Token>> {
        match method {
            "fail" => {
                ctx.store_u256(H256::ZERO, U256::one())?;
                Err(ExecError::revert("bad state"))
            }
            _ => Err(ExecError::MethodNotFound(method.to_string())),
        }
    }
}

/// Exercises nested calls from a native contract
pub struct Guard;

impl NativeContract for Guard {
    fn type_name(&self) -> &str {
        "Guard"
    }

    fn methods(&self) -> Vec<Method> {
        vec![
            Method::new("callOut", vec![ParamType::Address], vec![ParamType::Bool], Mutability::NonPayable),
            Method::new("callThenRevert", vec![ParamType::Address], vec![], Mutability::NonPayable),
            Method::new(
                "askDouble",
                vec![ParamType::Address, ParamType::Uint(256)],
                vec![ParamType::Uint(256)],
                Mutability::NonPayable,
            ),
            Method::new("dive", vec![], vec![], Mutability::NonPayable),
            Method::new("roll", vec![], vec![ParamType::Uint(256)], Mutability::NonPayable),
            Method::new(
                "spawn",
                vec![ParamType::Uint(256)],
                vec![ParamType::Address],
                Mutability::NonPayable,
            ),
        ]
    }

    fn call(&self, method: &str, ctx: &mut NativeCall<'_, '_>, args: Vec<Token>) -> ExecResult<Vec<Token>> {
        match method {
            "callOut" => {
                let target = address_arg(&args, 0)?;
                ctx.store_u256(H256::ZERO, U256::one())?;
                let outcome = ctx.try_call(target, U256::zero(), CallInput::packed("fail", vec![], vec![]));
                if let Some(reason) = outcome.revert_reason() {
                    let data = Bytes::from(reason.as_bytes().to_vec());
                    ctx.emit("Caught", vec![], data)?;
                }
                Ok(vec![Token::Bool(outcome.is_success())])
            }
            "callThenRevert" => {
                let counter = address_arg(&args, 0)?;
                ctx.call(counter, "increment", vec![], vec![ParamType::Uint(256)])?;
                Err(ExecError::revert("undo"))
            }
            "askDouble" => {
                let target = address_arg(&args, 0)?;
                let value = uint_arg(&args, 1)?;
                ctx.call(target, "double", vec![Token::Uint(value)], vec![ParamType::Uint(256)])
            }
            "dive" => {
                let me = ctx.address();
                ctx.call(me, "dive", vec![], vec![])
            }
            "roll" => Ok(vec![Token::Uint(ctx.random()?)]),
            "spawn" => {
                let start = uint_arg(&args, 0)?;
                let created = ctx.create("Counter", vec![Token::Uint(start)], U256::zero())?;
                Ok(vec![Token::Address(created)])
            }
            _ => Err(ExecError::MethodNotFound(method.to_string())),
        }
    }
}

/// Registry deploying `Counter(uint256 start)`
pub fn sample_registry() -> ContractRegistry {
    ContractRegistry::new().with("Counter", vec![ParamType::Uint(256)], |ctx, args| {
        let start = uint_arg(&args, 0)?;
        ctx.store_u256(H256::ZERO, start)?;
        Ok(Arc::new(Counter) as Arc<dyn NativeContract>)
    })
}

// ==================== Test chain ====================

/// Funded sender
pub const ALICE: Address = Address::from_low_u64_be(0xa11ce);

/// Genesis native counter
pub const COUNTER: Address = Address::from_low_u64_be(0xc0);

/// Genesis native faulty contract
pub const FAULTY: Address = Address::from_low_u64_be(0xfa);

/// Genesis native guard contract
pub const GUARD: Address = Address::from_low_u64_be(0x6a);

/// Genesis bytecode doubler
pub const DOUBLER: Address = Address::from_low_u64_be(0xd0);

/// Genesis bytecode reverter
pub const REVERTER: Address = Address::from_low_u64_be(0xbd);

/// Genesis bytecode caller of the guard
pub const CALLER: Address = Address::from_low_u64_be(0xa0);

/// Genesis bytecode CREATE2 factory
pub const FACTORY: Address = Address::from_low_u64_be(0xf2);

/// Genesis bytecode reader of the counter
pub const READER: Address = Address::from_low_u64_be(0x4e);

/// Genesis bytecode stamper, only meant to be delegated to
pub const STAMPER: Address = Address::from_low_u64_be(0x57);

/// Genesis bytecode user of transient storage
pub const STASH: Address = Address::from_low_u64_be(0x75);

/// Genesis bytecode sender of unaffordable value
pub const PAYER: Address = Address::from_low_u64_be(0x9a);

/// Ledger with the sample contracts, plus the environment of the next transaction
pub struct TestChain {
    /// Committed state
    pub ledger: Ledger,
    /// Execution settings
    pub config: ExecutionConfig,
    /// VM backend
    pub vm: Arc<ScriptedVm>,
    tx_count: u64,
}

impl TestChain {
    /// Chain where [`ALICE`] holds 1000 and every sample contract is deployed
    pub fn new() -> Self {
        init_tracing();

        let mut ledger = Ledger::new();
        ledger.insert_account(ALICE, Account::with_balance(U256::from(1000u64)));
        ledger.install_contract_manager(sample_registry());
        ledger.register_native(COUNTER, Arc::new(Counter));
        ledger.register_native(FAULTY, Arc::new(Faulty));
        ledger.register_native(GUARD, Arc::new(Guard));

        for (address, code) in [
            (DOUBLER, DOUBLER_CODE),
            (REVERTER, REVERTER_CODE),
            (CALLER, CALLER_CODE),
            (FACTORY, FACTORY_CODE),
            (READER, READER_CODE),
            (STAMPER, STAMP_CODE),
            (STASH, STASH_CODE),
            (PAYER, PAYER_CODE),
        ] {
            let mut account = Account::new();
            account.nonce = 1;
            account.code = Bytes::from_static(code);
            account.code_hash = bach_crypto::keccak256(code);
            account.contract_type = bach_core::ContractType::Bytecode;
            ledger.insert_account(address, account);
        }

        Self {
            ledger,
            config: ExecutionConfig::default(),
            vm: Arc::new(sample_vm(GUARD, FAULTY, COUNTER)),
            tx_count: 0,
        }
    }

    /// Record call trees
    pub fn with_tracing(mut self) -> Self {
        self.config = self.config.with_tracing(true);
        self
    }

    /// Environment of the next transaction
    pub fn next_env(&mut self) -> Env {
        self.tx_count += 1;
        let block = BlockEnv {
            number: 1,
            timestamp: 1_700_000_000,
            coinbase: addr(0xc01),
            hash: H256::from_low_u64_be(0xb1),
            ..Default::default()
        };
        let tx = TxEnv {
            hash: H256::from_low_u64_be(0x7000 + self.tx_count),
            index: self.tx_count - 1,
            origin: ALICE,
            gas_price: 1,
        };
        Env::new(&self.config, block, tx)
    }

    /// Host for the next transaction
    pub fn host(&mut self) -> ContractHost<'_> {
        let env = self.next_env();
        let vm: Arc<dyn Vm> = self.vm.clone();
        ContractHost::new(&mut self.ledger, env, vm, &self.config)
    }

    /// Balance in the committed ledger
    pub fn balance(&self, address: &Address) -> U256 {
        self.ledger
            .account(address)
            .map(|account| account.balance)
            .unwrap_or_default()
    }

    /// Storage word in the committed ledger
    pub fn slot(&self, address: &Address, slot: u64) -> U256 {
        self.ledger.storage(address, &H256::from_low_u64_be(slot)).to_u256()
    }
}

impl Default for TestChain {
    fn default() -> Self {
        Self::new()
    }
}
