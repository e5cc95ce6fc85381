//! Contract manager: the native pseudo-contract that deploys native contracts

use bach_abi::{ParamType, Token};
use bach_primitives::{Address, U256};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use super::{Method, Mutability, NativeCall, NativeContract};
use crate::address::create_address;
use crate::error::{ExecError, ExecResult};

/// Address of the contract manager
pub const CONTRACT_MANAGER_ADDRESS: Address = Address::from_bytes([
    0x00, 0x01, 0xcb, 0x47, 0xea, 0x6d, 0x8b, 0x55, 0xfe, 0x44,
    0xfd, 0xd6, 0xb1, 0xbd, 0xb5, 0x79, 0xef, 0xb4, 0x3e, 0x61,
]);

const TYPE_NAME: &str = "ContractManager";
const GET_DEPLOYED: &str = "getDeployedContracts";

/// Builds a native instance at `ctx.address()` from constructor arguments.
///
/// The constructor may initialize storage through `ctx`; the instance is
/// registered only if it returns `Ok`.
pub type Constructor =
    Arc<dyn Fn(&mut NativeCall<'_, '_>, Vec<Token>) -> ExecResult<Arc<dyn NativeContract>> + Send + Sync>;

#[derive(Clone)]
struct Factory {
    params: Vec<ParamType>,
    construct: Constructor,
}

/// Native contract types that can be deployed, keyed by type name
#[derive(Clone, Default)]
pub struct ContractRegistry {
    factories: BTreeMap<String, Factory>,
}

impl ContractRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a contract type with its constructor parameter types
    pub fn register<F>(&mut self, type_name: impl Into<String>, params: Vec<ParamType>, construct: F)
    where
        F: Fn(&mut NativeCall<'_, '_>, Vec<Token>) -> ExecResult<Arc<dyn NativeContract>>
            + Send
            + Sync
            + 'static,
    {
        self.factories.insert(
            type_name.into(),
            Factory {
                params,
                construct: Arc::new(construct),
            },
        );
    }

    /// Builder form of [`register`](Self::register)
    pub fn with<F>(mut self, type_name: impl Into<String>, params: Vec<ParamType>, construct: F) -> Self
    where
        F: Fn(&mut NativeCall<'_, '_>, Vec<Token>) -> ExecResult<Arc<dyn NativeContract>>
            + Send
            + Sync
            + 'static,
    {
        self.register(type_name, params, construct);
        self
    }

    /// Registered type names, sorted
    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// Name of the manager method deploying `type_name`
    pub fn factory_method(type_name: &str) -> String {
        format!("createNew{}Contract", type_name)
    }

    /// Manager method entry deploying `type_name`
    pub fn factory_entry(&self, type_name: &str) -> Option<Method> {
        self.factories.get(type_name).map(|factory| {
            Method::new(
                Self::factory_method(type_name),
                factory.params.clone(),
                vec![ParamType::Address],
                Mutability::NonPayable,
            )
        })
    }

    /// Type name deployed by the manager method with `selector`
    pub fn resolve_selector(&self, selector: [u8; 4]) -> Option<&str> {
        self.type_names().find(|name| {
            self.factory_entry(name)
                .is_some_and(|method| method.selector() == selector)
        })
    }

    fn type_of_method(&self, method: &str) -> Option<(&str, &Factory)> {
        let type_name = method.strip_prefix("createNew")?.strip_suffix("Contract")?;
        self.factories
            .get_key_value(type_name)
            .map(|(name, factory)| (name.as_str(), factory))
    }
}

impl fmt::Debug for ContractRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.factories.keys()).finish()
    }
}

/// Deploys registered native contract types and lists deployed contracts.
///
/// A deployment takes its address from the deployer and the deployer's nonce
/// before the increment, exactly like a bytecode CREATE.
#[derive(Debug)]
pub struct ContractManager {
    registry: ContractRegistry,
}

impl ContractManager {
    /// Manager over `registry`
    pub fn new(registry: ContractRegistry) -> Self {
        Self { registry }
    }

    fn deploy(
        &self,
        ctx: &mut NativeCall<'_, '_>,
        type_name: &str,
        factory: &Factory,
        args: Vec<Token>,
    ) -> ExecResult<Vec<Token>> {
        let deployer = ctx.caller();
        let context = ctx.context_mut();
        context.create_account(&deployer);
        let nonce = context.account_mut(&deployer)?.increment_nonce();
        let address = create_address(&deployer, nonce);

        if context.contract_type(&address).is_contract() || context.contract(&address).is_ok() {
            return Err(ExecError::ContractAlreadyExists(address));
        }

        let instance = {
            let mut constructor = ctx.nested(address, U256::zero());
            (factory.construct)(&mut constructor, args)?
        };
        ctx.context_mut().add_contract(&address, instance)?;

        tracing::debug!("Deployed native {} contract at {}", type_name, address);
        Ok(vec![Token::Address(address)])
    }

    fn deployed_contracts(&self, ctx: &NativeCall<'_, '_>) -> Vec<Token> {
        let ledger = ctx.context().ledger();
        let (names, addresses): (Vec<_>, Vec<_>) = ledger
            .native_addresses()
            .into_iter()
            .filter(|address| *address != CONTRACT_MANAGER_ADDRESS)
            .filter_map(|address| {
                ledger.contract(&address).map(|contract| {
                    (
                        Token::String(contract.type_name().to_string()),
                        Token::Address(address),
                    )
                })
            })
            .unzip();
        vec![Token::Array(names), Token::Array(addresses)]
    }
}

impl NativeContract for ContractManager {
    fn type_name(&self) -> &str {
        TYPE_NAME
    }

    fn methods(&self) -> Vec<Method> {
        let mut methods: Vec<Method> = self
            .registry
            .type_names()
            .filter_map(|name| self.registry.factory_entry(name))
            .collect();
        methods.push(Method::new(
            GET_DEPLOYED,
            vec![],
            vec![
                ParamType::Array(Box::new(ParamType::String)),
                ParamType::Array(Box::new(ParamType::Address)),
            ],
            Mutability::View,
        ));
        methods
    }

    fn method_by_selector(&self, selector: [u8; 4]) -> Option<Method> {
        match self.registry.resolve_selector(selector) {
            Some(type_name) => self.registry.factory_entry(type_name),
            None => self.method(GET_DEPLOYED).filter(|method| method.selector() == selector),
        }
    }

    fn call(&self, method: &str, ctx: &mut NativeCall<'_, '_>, args: Vec<Token>) -> ExecResult<Vec<Token>> {
        if method == GET_DEPLOYED {
            return Ok(self.deployed_contracts(ctx));
        }
        let (type_name, factory) = self
            .registry
            .type_of_method(method)
            .ok_or_else(|| ExecError::UnknownContractType(method.to_string()))?;
        self.deploy(ctx, type_name, factory, args)
    }
}
