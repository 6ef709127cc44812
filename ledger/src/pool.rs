//! Per-pool ledger state.

use serde::{Deserialize, Serialize};
use tidepool_types::{Address, TokenAmount};

/// Ledger state for a single pool.
///
/// `staked` is the net total of all member allocations to this pool; it
/// never increases except via staking and decreases through burns and
/// deallocations. `stakers` is the insertion-ordered roster of members
/// holding a live allocation; zero-allocation entries are pruned lazily
/// when the pool is next touched, so roster order stays stable while a
/// pro-rata pass is suspended over it.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PoolRecord {
    /// Sum of member allocations, net of burns.
    pub staked: TokenAmount,

    /// Cumulative amount ever burned from this pool.
    pub burned: TokenAmount,

    /// Members with a live allocation, in first-stake order.
    pub stakers: Vec<Address>,
}

impl PoolRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a member to the roster if not already present.
    pub fn add_staker(&mut self, member: &Address) {
        if !self.stakers.contains(member) {
            self.stakers.push(member.clone());
        }
    }

    /// Number of members on the roster (live or pending prune).
    pub fn staker_count(&self) -> usize {
        self.stakers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_staker_deduplicates() {
        let mut p = PoolRecord::new();
        let a = Address::new("m1");
        p.add_staker(&a);
        p.add_staker(&a);
        assert_eq!(p.staker_count(), 1);
    }

    #[test]
    fn roster_keeps_first_stake_order() {
        let mut p = PoolRecord::new();
        p.add_staker(&Address::new("m2"));
        p.add_staker(&Address::new("m1"));
        p.add_staker(&Address::new("m2"));
        assert_eq!(p.stakers, vec![Address::new("m2"), Address::new("m1")]);
    }
}
