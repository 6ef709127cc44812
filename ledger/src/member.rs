//! Per-member ledger state.

use serde::{Deserialize, Serialize};
use tidepool_types::{Address, Timestamp, TokenAmount};

/// One member's exposure to one pool.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    pub pool: Address,
    pub amount: TokenAmount,
}

/// Ledger state for a single member.
///
/// `allocations` is insertion-ordered with one entry per pool; zero-amount
/// entries are pruned on update. The custody balance is the member's total
/// deposit held by the engine — allocations are exposure against it, so
/// their sum may exceed the balance up to the leverage cap.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct MemberRecord {
    /// Tokens held by the engine on the member's behalf.
    pub balance: TokenAmount,

    /// Exposure per pool, insertion-ordered.
    pub allocations: Vec<Allocation>,

    /// Earliest time funds may leave through `withdraw`. Pushed forward
    /// each time a deallocation is released.
    pub unlocked_at: Timestamp,
}

impl MemberRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current allocation to a pool (zero if none).
    pub fn allocation_to(&self, pool: &Address) -> TokenAmount {
        self.allocations
            .iter()
            .find(|a| a.pool == *pool)
            .map(|a| a.amount)
            .unwrap_or(TokenAmount::ZERO)
    }

    /// Set the allocation to a pool to an absolute value, preserving
    /// insertion order. A zero value prunes the entry.
    pub fn set_allocation(&mut self, pool: &Address, amount: TokenAmount) {
        if let Some(entry) = self.allocations.iter_mut().find(|a| a.pool == *pool) {
            if amount.is_zero() {
                self.allocations.retain(|a| a.pool != *pool);
            } else {
                entry.amount = amount;
            }
        } else if !amount.is_zero() {
            self.allocations.push(Allocation {
                pool: pool.clone(),
                amount,
            });
        }
    }

    /// Sum of all allocations, with overflow detection.
    pub fn total_allocated(&self) -> Option<TokenAmount> {
        self.allocations
            .iter()
            .try_fold(TokenAmount::ZERO, |acc, a| acc.checked_add(a.amount))
    }

    /// Largest single allocation (zero when none).
    pub fn max_allocation(&self) -> TokenAmount {
        self.allocations
            .iter()
            .map(|a| a.amount)
            .max()
            .unwrap_or(TokenAmount::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(n: u8) -> Address {
        Address::new(format!("pool-{n}"))
    }

    #[test]
    fn set_allocation_preserves_insertion_order() {
        let mut m = MemberRecord::new();
        m.set_allocation(&pool(1), TokenAmount::new(10));
        m.set_allocation(&pool(2), TokenAmount::new(20));
        m.set_allocation(&pool(1), TokenAmount::new(15));

        let pools: Vec<_> = m.allocations.iter().map(|a| a.pool.clone()).collect();
        assert_eq!(pools, vec![pool(1), pool(2)]);
        assert_eq!(m.allocation_to(&pool(1)), TokenAmount::new(15));
    }

    #[test]
    fn zero_allocation_is_pruned() {
        let mut m = MemberRecord::new();
        m.set_allocation(&pool(1), TokenAmount::new(10));
        m.set_allocation(&pool(1), TokenAmount::ZERO);
        assert!(m.allocations.is_empty());
        assert_eq!(m.allocation_to(&pool(1)), TokenAmount::ZERO);
    }

    #[test]
    fn setting_zero_on_absent_pool_is_noop() {
        let mut m = MemberRecord::new();
        m.set_allocation(&pool(9), TokenAmount::ZERO);
        assert!(m.allocations.is_empty());
    }

    #[test]
    fn totals_and_max() {
        let mut m = MemberRecord::new();
        m.set_allocation(&pool(1), TokenAmount::new(10));
        m.set_allocation(&pool(2), TokenAmount::new(30));
        assert_eq!(m.total_allocated(), Some(TokenAmount::new(40)));
        assert_eq!(m.max_allocation(), TokenAmount::new(30));
    }
}
