//! Gas budget of a call frame

use crate::error::{ExecError, ExecResult};

/// Remaining gas of the active call chain.
///
/// Not transactional: gas spent inside a reverted frame stays spent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Gas {
    remaining: u64,
}

impl Gas {
    /// Budget with `initial` units
    pub fn new(initial: u64) -> Self {
        Self { remaining: initial }
    }

    /// Debit `amount`.
    ///
    /// Exhausts the budget and fails with [`ExecError::OutOfGas`] when
    /// `amount` exceeds what is left.
    pub fn use_gas(&mut self, amount: u64) -> ExecResult<()> {
        if amount > self.remaining {
            self.remaining = 0;
            return Err(ExecError::OutOfGas);
        }
        self.remaining -= amount;
        Ok(())
    }

    /// Credit `amount` back
    pub fn refund(&mut self, amount: u64) {
        self.remaining = self.remaining.saturating_add(amount);
    }

    /// Units left
    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    /// Overwrite the remaining budget
    pub fn set_remaining(&mut self, remaining: u64) {
        self.remaining = remaining;
    }

    /// Budget in the VM's signed representation
    pub fn as_vm_gas(&self) -> i64 {
        i64::try_from(self.remaining).unwrap_or(i64::MAX)
    }

    /// Budget from the VM's signed representation, negative clamps to zero
    pub fn from_vm_gas(gas: i64) -> Self {
        Self::new(u64::try_from(gas).unwrap_or(0))
    }
}
