//! Nullable implementations of the external seams for deterministic
//! testing: an explicit-set role oracle and an in-memory token bridge
//! with failure injection.

use std::collections::HashSet;
use tidepool_types::{Address, TokenAmount};

use crate::auth::RoleOracle;
use crate::bridge::{TokenBridge, TransferError};

/// Role oracle backed by explicit enrollment sets.
#[derive(Clone, Debug, Default)]
pub struct NullRoles {
    members: HashSet<Address>,
    internals: HashSet<Address>,
    governors: HashSet<Address>,
}

impl NullRoles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enroll_member(&mut self, address: Address) {
        self.members.insert(address);
    }

    pub fn enroll_internal(&mut self, address: Address) {
        self.internals.insert(address);
    }

    pub fn enroll_governance(&mut self, address: Address) {
        self.governors.insert(address);
    }
}

impl RoleOracle for NullRoles {
    fn is_member(&self, caller: &Address) -> bool {
        self.members.contains(caller)
    }

    fn is_internal(&self, caller: &Address) -> bool {
        self.internals.contains(caller)
    }

    fn is_governance(&self, caller: &Address) -> bool {
        self.governors.contains(caller)
    }
}

/// In-memory token bridge: tracks the engine's custody account balance and
/// records outbound transfers. `fail_next` makes the next call fail, for
/// testing the no-partial-mutation guarantee.
#[derive(Clone, Debug, Default)]
pub struct NullBridge {
    /// Tokens currently held by the engine's custody account.
    pub held: TokenAmount,
    /// Total ever sent to the burn sink.
    pub burned: TokenAmount,
    /// Outbound payouts, in order.
    pub released: Vec<(Address, TokenAmount)>,
    /// When set, the next bridge call fails and clears the flag.
    pub fail_next: bool,
}

impl NullBridge {
    pub fn new() -> Self {
        Self::default()
    }

    fn check_failure(&mut self, op: &str) -> Result<(), TransferError> {
        if self.fail_next {
            self.fail_next = false;
            return Err(TransferError(format!("injected {op} failure")));
        }
        Ok(())
    }
}

impl TokenBridge for NullBridge {
    fn collect(&mut self, _from: &Address, amount: TokenAmount) -> Result<(), TransferError> {
        self.check_failure("collect")?;
        self.held = self
            .held
            .checked_add(amount)
            .ok_or_else(|| TransferError("custody overflow".into()))?;
        Ok(())
    }

    fn burn(&mut self, amount: TokenAmount) -> Result<(), TransferError> {
        self.check_failure("burn")?;
        self.held = self
            .held
            .checked_sub(amount)
            .ok_or_else(|| TransferError("custody underflow".into()))?;
        self.burned = self.burned + amount;
        Ok(())
    }

    fn release(&mut self, to: &Address, amount: TokenAmount) -> Result<(), TransferError> {
        self.check_failure("release")?;
        self.held = self
            .held
            .checked_sub(amount)
            .ok_or_else(|| TransferError("custody underflow".into()))?;
        self.released.push((to.clone(), amount));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_default_to_nothing() {
        let roles = NullRoles::new();
        let a = Address::new("anyone");
        assert!(!roles.is_member(&a));
        assert!(!roles.is_internal(&a));
        assert!(!roles.is_governance(&a));
    }

    #[test]
    fn bridge_tracks_held_balance() {
        let mut bridge = NullBridge::new();
        let a = Address::new("m");
        bridge.collect(&a, TokenAmount::new(10)).unwrap();
        bridge.burn(TokenAmount::new(3)).unwrap();
        bridge.release(&a, TokenAmount::new(2)).unwrap();
        assert_eq!(bridge.held, TokenAmount::new(5));
        assert_eq!(bridge.burned, TokenAmount::new(3));
        assert_eq!(bridge.released, vec![(a, TokenAmount::new(2))]);
    }

    #[test]
    fn fail_next_fails_once() {
        let mut bridge = NullBridge::new();
        let a = Address::new("m");
        bridge.fail_next = true;
        assert!(bridge.collect(&a, TokenAmount::new(1)).is_err());
        assert!(bridge.collect(&a, TokenAmount::new(1)).is_ok());
    }
}
