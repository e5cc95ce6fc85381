//! Native contracts
//!
//! A native contract is compiled into the node. It exposes a method table
//! with Solidity ABI types so bytecode contracts can call it with encoded
//! data, while native callers pass typed tokens directly. Its state lives in
//! the execution context's storage slots under its own address, so reverts
//! roll it back like any other write.

mod call;
mod executor;
mod manager;

pub use call::{CallOutcome, NativeCall};
pub use executor::NativeExecutor;
pub use manager::{Constructor, ContractManager, ContractRegistry, CONTRACT_MANAGER_ADDRESS};

use bach_abi::{function_selector, function_signature, ParamType, Token};

use crate::error::ExecResult;

/// State access a method is allowed
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mutability {
    /// Reads only, callable from a static call
    View,
    /// Writes state, rejects value
    NonPayable,
    /// Writes state, accepts value
    Payable,
}

/// Entry of a native method table
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Method {
    /// Method name
    pub name: String,
    /// Argument types
    pub inputs: Vec<ParamType>,
    /// Return types
    pub outputs: Vec<ParamType>,
    /// State access
    pub mutability: Mutability,
}

impl Method {
    /// Method entry
    pub fn new(
        name: impl Into<String>,
        inputs: Vec<ParamType>,
        outputs: Vec<ParamType>,
        mutability: Mutability,
    ) -> Self {
        Self {
            name: name.into(),
            inputs,
            outputs,
            mutability,
        }
    }

    /// Canonical signature, e.g. `transfer(address,uint256)`
    pub fn signature(&self) -> String {
        function_signature(&self.name, &self.inputs)
    }

    /// 4-byte selector of the signature
    pub fn selector(&self) -> [u8; 4] {
        function_selector(&self.signature())
    }

    /// Whether the method accepts value
    pub fn is_payable(&self) -> bool {
        self.mutability == Mutability::Payable
    }

    /// Whether the method may run in a static call
    pub fn is_view(&self) -> bool {
        self.mutability == Mutability::View
    }
}

/// A contract implemented in Rust.
///
/// Per-call data (caller, value, gas, the contract's own address) arrives in
/// the [`NativeCall`] handed to [`call`](Self::call); the instance itself is
/// shared and immutable.
pub trait NativeContract: Send + Sync {
    /// Contract type name, as registered with the contract manager
    fn type_name(&self) -> &str;

    /// Method table
    fn methods(&self) -> Vec<Method>;

    /// Run `method` with arguments already checked against its inputs
    fn call(&self, method: &str, ctx: &mut NativeCall<'_, '_>, args: Vec<Token>) -> ExecResult<Vec<Token>>;

    /// Look up a method by name
    fn method(&self, name: &str) -> Option<Method> {
        self.methods().into_iter().find(|m| m.name == name)
    }

    /// Look up a method by selector
    fn method_by_selector(&self, selector: [u8; 4]) -> Option<Method> {
        self.methods().into_iter().find(|m| m.selector() == selector)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::error::ExecError;

    /// Contract without methods
    pub(crate) struct Nop;

    impl NativeContract for Nop {
        fn type_name(&self) -> &str {
            "Nop"
        }

        fn methods(&self) -> Vec<Method> {
            Vec::new()
        }

        fn call(&self, method: &str, _ctx: &mut NativeCall<'_, '_>, _args: Vec<Token>) -> ExecResult<Vec<Token>> {
            Err(ExecError::MethodNotFound(method.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_selector() {
        let method = Method::new(
            "transfer",
            vec![ParamType::Address, ParamType::Uint(256)],
            vec![ParamType::Bool],
            Mutability::NonPayable,
        );
        assert_eq!(method.signature(), "transfer(address,uint256)");
        assert_eq!(method.selector(), [0xa9, 0x05, 0x9c, 0xbb]);
        assert!(!method.is_payable());
        assert!(!method.is_view());
    }

    #[test]
    fn test_default_lookups_miss() {
        let nop = testing::Nop;
        assert!(nop.method("anything").is_none());
        assert!(nop.method_by_selector([0; 4]).is_none());
    }
}
