//! The allocation ledger — validation and application of balance arithmetic.

use crate::error::LedgerError;
use crate::member::MemberRecord;
use crate::pool::PoolRecord;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tidepool_types::{Address, ProtocolParams, Timestamp, TokenAmount};

/// Result of applying one staker's share of a burn.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BurnShare {
    /// Exposure removed from the staker's allocation to the pool.
    pub allocation_cut: TokenAmount,
    /// Tokens removed from the staker's custody balance (capped at the
    /// balance, so it can trail `allocation_cut` for over-leveraged
    /// members).
    pub custody_cut: TokenAmount,
}

/// The ledger owns all member and pool records plus the aggregate custody
/// total. Validation (`check_*`) is separated from application (`apply_*`
/// and the processing primitives) so callers can run external token
/// transfers between the two without ever committing a partial mutation.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Ledger {
    members: HashMap<Address, MemberRecord>,
    pools: HashMap<Address, PoolRecord>,
    /// Sum of all member custody balances.
    total_custody: TokenAmount,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn member(&self, address: &Address) -> Option<&MemberRecord> {
        self.members.get(address)
    }

    pub fn pool(&self, address: &Address) -> Option<&PoolRecord> {
        self.pools.get(address)
    }

    pub fn total_custody(&self) -> TokenAmount {
        self.total_custody
    }

    /// A member's current allocation to a pool (zero if either is unknown).
    pub fn allocation(&self, member: &Address, pool: &Address) -> TokenAmount {
        self.members
            .get(member)
            .map(|m| m.allocation_to(pool))
            .unwrap_or(TokenAmount::ZERO)
    }

    /// A pool's net staked total (zero if unknown).
    pub fn pool_staked(&self, pool: &Address) -> TokenAmount {
        self.pools
            .get(pool)
            .map(|p| p.staked)
            .unwrap_or(TokenAmount::ZERO)
    }

    /// Roster entry by index, for cursor-based pro-rata passes.
    pub fn staker_at(&self, pool: &Address, index: usize) -> Option<&Address> {
        self.pools.get(pool).and_then(|p| p.stakers.get(index))
    }

    /// Roster length (including entries pending lazy prune).
    pub fn roster_len(&self, pool: &Address) -> usize {
        self.pools.get(pool).map(|p| p.staker_count()).unwrap_or(0)
    }

    // ── Staking ──────────────────────────────────────────────────────────

    /// Validate a `stake` call without mutating anything.
    pub fn check_stake(
        &self,
        member: &Address,
        amount: TokenAmount,
        pools: &[Address],
        amounts: &[TokenAmount],
        params: &ProtocolParams,
    ) -> Result<(), LedgerError> {
        if pools.len() != amounts.len() {
            return Err(LedgerError::LengthMismatch {
                pools: pools.len(),
                amounts: amounts.len(),
            });
        }
        for (i, pool) in pools.iter().enumerate() {
            if pools[..i].contains(pool) {
                return Err(LedgerError::DuplicatePool(pool.clone()));
            }
        }

        let empty = MemberRecord::new();
        let record = self.members.get(member).unwrap_or(&empty);

        let new_balance = record
            .balance
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;
        if new_balance < params.min_stake {
            return Err(LedgerError::BelowMinimum {
                required: params.min_stake,
                actual: new_balance,
            });
        }

        let mut new_total = record.total_allocated().ok_or(LedgerError::Overflow)?;
        for (pool, &requested) in pools.iter().zip(amounts) {
            let current = record.allocation_to(pool);
            if requested.is_zero() {
                // Zero is a prune marker, valid only when nothing is staked.
                if !current.is_zero() {
                    return Err(LedgerError::BelowMinimum {
                        required: current,
                        actual: requested,
                    });
                }
                continue;
            }
            if requested < params.min_allocation {
                return Err(LedgerError::BelowMinimum {
                    required: params.min_allocation,
                    actual: requested,
                });
            }
            // Allocations only grow or re-affirm here; decreases go through
            // the deallocation queue.
            if requested < current {
                return Err(LedgerError::BelowMinimum {
                    required: current,
                    actual: requested,
                });
            }
            new_total = new_total
                .checked_sub(current)
                .and_then(|t| t.checked_add(requested))
                .ok_or(LedgerError::Overflow)?;
        }

        let leverage_cap = TokenAmount::new(
            new_balance
                .raw()
                .checked_mul(params.max_leverage)
                .ok_or(LedgerError::Overflow)?,
        );
        if new_total > leverage_cap {
            return Err(LedgerError::LeverageExceeded {
                allocated: new_total,
                cap: leverage_cap,
            });
        }

        if params.max_exposure > 0 {
            let custody_after = self
                .total_custody
                .checked_add(amount)
                .ok_or(LedgerError::Overflow)?;
            let exposure_cap = TokenAmount::new(
                custody_after
                    .raw()
                    .checked_mul(params.max_exposure)
                    .ok_or(LedgerError::Overflow)?,
            );
            for (pool, &requested) in pools.iter().zip(amounts) {
                let current = record.allocation_to(pool);
                if requested <= current {
                    continue;
                }
                let staked_after = self
                    .pool_staked(pool)
                    .checked_add(requested.saturating_sub(current))
                    .ok_or(LedgerError::Overflow)?;
                if staked_after > exposure_cap {
                    return Err(LedgerError::ExposureExceeded {
                        pool: pool.clone(),
                        staked: staked_after,
                        cap: exposure_cap,
                    });
                }
            }
        }

        Ok(())
    }

    /// Apply a `stake` call previously validated by [`Self::check_stake`].
    pub fn apply_stake(
        &mut self,
        member: &Address,
        amount: TokenAmount,
        pools: &[Address],
        amounts: &[TokenAmount],
    ) {
        let record = self.members.entry(member.clone()).or_default();
        record.balance = record.balance + amount;
        self.total_custody = self.total_custody + amount;

        for (pool, &requested) in pools.iter().zip(amounts) {
            let current = record.allocation_to(pool);
            if requested.is_zero() && current.is_zero() {
                continue;
            }
            let delta = requested.saturating_sub(current);
            record.set_allocation(pool, requested);

            let pool_record = self.pools.entry(pool.clone()).or_default();
            pool_record.staked = pool_record.staked + delta;
            if !requested.is_zero() {
                pool_record.add_staker(member);
            }
        }
    }

    // ── Deallocation ─────────────────────────────────────────────────────

    /// Validate a deallocation request batch without mutating anything.
    pub fn check_deallocation_request(
        &self,
        member: &Address,
        pools: &[Address],
        amounts: &[TokenAmount],
        params: &ProtocolParams,
    ) -> Result<(), LedgerError> {
        if pools.len() != amounts.len() {
            return Err(LedgerError::LengthMismatch {
                pools: pools.len(),
                amounts: amounts.len(),
            });
        }
        let record = self
            .members
            .get(member)
            .ok_or_else(|| LedgerError::UnknownMember(member.clone()))?;

        for (pool, &requested) in pools.iter().zip(amounts) {
            if requested.is_zero() {
                return Err(LedgerError::ZeroAmount);
            }
            let current = record.allocation_to(pool);
            if requested > current {
                return Err(LedgerError::InsufficientAllocation {
                    pool: pool.clone(),
                    requested,
                    allocated: current,
                });
            }
            let remaining = current - requested;
            if !remaining.is_zero() && remaining < params.min_allowed_deallocation {
                return Err(LedgerError::BelowMinimum {
                    required: params.min_allowed_deallocation,
                    actual: remaining,
                });
            }
        }
        Ok(())
    }

    /// Apply a matured deallocation: release up to `requested` from the
    /// member's current allocation (which intervening burns may have
    /// shrunk), and push the member's withdrawal lock forward. Returns the
    /// amount actually released.
    pub fn release_allocation(
        &mut self,
        member: &Address,
        pool: &Address,
        requested: TokenAmount,
        now: Timestamp,
        unstake_lock_secs: u64,
    ) -> TokenAmount {
        let Some(record) = self.members.get_mut(member) else {
            return TokenAmount::ZERO;
        };
        let current = record.allocation_to(pool);
        let released = requested.min(current);
        if released.is_zero() {
            return TokenAmount::ZERO;
        }

        record.set_allocation(pool, current - released);
        let lock_until = now.saturating_add_secs(unstake_lock_secs);
        if lock_until > record.unlocked_at {
            record.unlocked_at = lock_until;
        }

        // Roster entries are never removed here: a suspended pro-rata pass
        // may hold an index into this roster. Zero-allocation entries are
        // pruned lazily via `prune_roster` when the next pass starts.
        if let Some(pool_record) = self.pools.get_mut(pool) {
            pool_record.staked = pool_record.staked.saturating_sub(released);
        }
        released
    }

    // ── Burns ────────────────────────────────────────────────────────────

    /// Apply one staker's share of a burn: cut exposure, cut custody, and
    /// keep pool totals in step. The staker roster is left untouched so a
    /// suspended pass can resume at a stable index; callers prune with
    /// [`Self::prune_roster`] once the burn completes.
    pub fn burn_share(
        &mut self,
        member: &Address,
        pool: &Address,
        deduction: TokenAmount,
    ) -> BurnShare {
        let Some(record) = self.members.get_mut(member) else {
            return BurnShare {
                allocation_cut: TokenAmount::ZERO,
                custody_cut: TokenAmount::ZERO,
            };
        };
        let current = record.allocation_to(pool);
        let allocation_cut = deduction.min(current);
        record.set_allocation(pool, current - allocation_cut);

        let custody_cut = allocation_cut.min(record.balance);
        record.balance = record.balance - custody_cut;
        self.total_custody = self.total_custody.saturating_sub(custody_cut);

        if let Some(pool_record) = self.pools.get_mut(pool) {
            pool_record.staked = pool_record.staked.saturating_sub(allocation_cut);
            pool_record.burned = pool_record.burned + allocation_cut;
        }

        BurnShare {
            allocation_cut,
            custody_cut,
        }
    }

    /// Drop roster entries whose allocation has reached zero.
    pub fn prune_roster(&mut self, pool: &Address) {
        let members = &self.members;
        if let Some(pool_record) = self.pools.get_mut(pool) {
            pool_record.stakers.retain(|s| {
                members
                    .get(s)
                    .map(|m| !m.allocation_to(pool).is_zero())
                    .unwrap_or(false)
            });
        }
    }

    // ── Rewards ──────────────────────────────────────────────────────────

    /// Credit a reward payout to a member's custody balance.
    pub fn credit_reward(&mut self, member: &Address, amount: TokenAmount) {
        let record = self.members.entry(member.clone()).or_default();
        record.balance = record.balance + amount;
        self.total_custody = self.total_custody + amount;
    }

    // ── Withdrawal ───────────────────────────────────────────────────────

    /// Validate a withdrawal without mutating anything.
    pub fn check_withdraw(
        &self,
        member: &Address,
        amount: TokenAmount,
        now: Timestamp,
        params: &ProtocolParams,
    ) -> Result<(), LedgerError> {
        let record = self
            .members
            .get(member)
            .ok_or_else(|| LedgerError::UnknownMember(member.clone()))?;

        if amount.is_zero() {
            return Err(LedgerError::ZeroAmount);
        }
        if now < record.unlocked_at {
            return Err(LedgerError::LockTimeNotElapsed {
                unlocked_at: record.unlocked_at,
            });
        }
        if amount < params.min_unstake {
            return Err(LedgerError::BelowMinimum {
                required: params.min_unstake,
                actual: amount,
            });
        }
        let remaining = record
            .balance
            .checked_sub(amount)
            .ok_or(LedgerError::InsufficientBalance {
                needed: amount,
                available: record.balance,
            })?;

        let total = record.total_allocated().ok_or(LedgerError::Overflow)?;
        let cap = TokenAmount::new(
            remaining
                .raw()
                .checked_mul(params.max_leverage)
                .ok_or(LedgerError::Overflow)?,
        );
        if total > cap {
            return Err(LedgerError::LeverageExceeded {
                allocated: total,
                cap,
            });
        }
        if !remaining.is_zero() && remaining < params.min_stake {
            return Err(LedgerError::BelowMinimum {
                required: params.min_stake,
                actual: remaining,
            });
        }
        Ok(())
    }

    /// Apply a withdrawal previously validated by [`Self::check_withdraw`].
    pub fn apply_withdraw(&mut self, member: &Address, amount: TokenAmount) {
        if let Some(record) = self.members.get_mut(member) {
            record.balance = record.balance.saturating_sub(amount);
            self.total_custody = self.total_custody.saturating_sub(amount);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(n: u8) -> Address {
        Address::new(format!("member-{n}"))
    }

    fn pool(n: u8) -> Address {
        Address::new(format!("pool-{n}"))
    }

    fn open_params() -> ProtocolParams {
        // Floors and caps relaxed the way the original test fixture resets
        // them, so small integer amounts are usable.
        let mut p = ProtocolParams::default();
        p.min_allocation = TokenAmount::new(1);
        p.min_allowed_deallocation = TokenAmount::ZERO;
        p.min_stake = TokenAmount::ZERO;
        p.min_unstake = TokenAmount::ZERO;
        p.max_exposure = 0;
        p.max_leverage = 2;
        p
    }

    fn staked_ledger(amount: u128) -> Ledger {
        let mut ledger = Ledger::new();
        let p = open_params();
        let amt = TokenAmount::new(amount);
        ledger
            .check_stake(&member(1), amt, &[pool(1)], &[amt], &p)
            .unwrap();
        ledger.apply_stake(&member(1), amt, &[pool(1)], &[amt]);
        ledger
    }

    #[test]
    fn stake_credits_balance_and_pool() {
        let ledger = staked_ledger(10);
        assert_eq!(ledger.member(&member(1)).unwrap().balance, TokenAmount::new(10));
        assert_eq!(ledger.pool_staked(&pool(1)), TokenAmount::new(10));
        assert_eq!(ledger.allocation(&member(1), &pool(1)), TokenAmount::new(10));
        assert_eq!(ledger.total_custody(), TokenAmount::new(10));
    }

    #[test]
    fn stake_rejects_length_mismatch_and_duplicates() {
        let ledger = Ledger::new();
        let p = open_params();
        let err = ledger
            .check_stake(&member(1), TokenAmount::new(10), &[pool(1)], &[], &p)
            .unwrap_err();
        assert!(matches!(err, LedgerError::LengthMismatch { .. }));

        let err = ledger
            .check_stake(
                &member(1),
                TokenAmount::new(10),
                &[pool(1), pool(1)],
                &[TokenAmount::new(5), TokenAmount::new(5)],
                &p,
            )
            .unwrap_err();
        assert!(matches!(err, LedgerError::DuplicatePool(_)));
    }

    #[test]
    fn stake_rejects_leverage_breach() {
        let ledger = Ledger::new();
        let p = open_params(); // max_leverage = 2
        let err = ledger
            .check_stake(
                &member(1),
                TokenAmount::new(10),
                &[pool(1), pool(2)],
                &[TokenAmount::new(15), TokenAmount::new(10)],
                &p,
            )
            .unwrap_err();
        assert!(matches!(err, LedgerError::LeverageExceeded { .. }));
    }

    #[test]
    fn stake_rejects_exposure_breach() {
        let mut p = open_params();
        p.max_exposure = 1;
        let ledger = Ledger::new();
        // Custody after = 10, cap = 10; requesting 15 on one pool breaches.
        let err = ledger
            .check_stake(
                &member(1),
                TokenAmount::new(10),
                &[pool(1)],
                &[TokenAmount::new(15)],
                &p,
            )
            .unwrap_err();
        assert!(matches!(err, LedgerError::ExposureExceeded { .. }));
    }

    #[test]
    fn stake_rejects_decrease_of_live_allocation() {
        let ledger = staked_ledger(10);
        let p = open_params();
        let err = ledger
            .check_stake(
                &member(1),
                TokenAmount::ZERO,
                &[pool(1)],
                &[TokenAmount::new(4)],
                &p,
            )
            .unwrap_err();
        assert!(matches!(err, LedgerError::BelowMinimum { .. }));
    }

    #[test]
    fn burn_share_cuts_allocation_custody_and_pool() {
        let mut ledger = staked_ledger(10);
        let share = ledger.burn_share(&member(1), &pool(1), TokenAmount::new(4));
        assert_eq!(share.allocation_cut, TokenAmount::new(4));
        assert_eq!(share.custody_cut, TokenAmount::new(4));
        assert_eq!(ledger.allocation(&member(1), &pool(1)), TokenAmount::new(6));
        assert_eq!(ledger.pool_staked(&pool(1)), TokenAmount::new(6));
        assert_eq!(ledger.pool(&pool(1)).unwrap().burned, TokenAmount::new(4));
        assert_eq!(ledger.member(&member(1)).unwrap().balance, TokenAmount::new(6));
        assert_eq!(ledger.total_custody(), TokenAmount::new(6));
    }

    #[test]
    fn burn_share_is_capped_at_allocation() {
        let mut ledger = staked_ledger(10);
        let share = ledger.burn_share(&member(1), &pool(1), TokenAmount::new(25));
        assert_eq!(share.allocation_cut, TokenAmount::new(10));
        assert_eq!(ledger.allocation(&member(1), &pool(1)), TokenAmount::ZERO);
        assert_eq!(ledger.pool_staked(&pool(1)), TokenAmount::ZERO);
    }

    #[test]
    fn burn_to_zero_then_prune_clears_roster() {
        let mut ledger = staked_ledger(10);
        ledger.burn_share(&member(1), &pool(1), TokenAmount::new(10));
        // Roster is stable until pruned.
        assert_eq!(ledger.roster_len(&pool(1)), 1);
        ledger.prune_roster(&pool(1));
        assert_eq!(ledger.roster_len(&pool(1)), 0);
    }

    #[test]
    fn release_allocation_caps_at_current_and_locks_withdrawal() {
        let mut ledger = staked_ledger(10);
        // A burn shrank the allocation to 6; a request for 8 releases 6.
        ledger.burn_share(&member(1), &pool(1), TokenAmount::new(4));
        let released = ledger.release_allocation(
            &member(1),
            &pool(1),
            TokenAmount::new(8),
            Timestamp::new(1_000),
            100,
        );
        assert_eq!(released, TokenAmount::new(6));
        assert_eq!(ledger.allocation(&member(1), &pool(1)), TokenAmount::ZERO);
        assert_eq!(ledger.pool_staked(&pool(1)), TokenAmount::ZERO);
        assert_eq!(
            ledger.member(&member(1)).unwrap().unlocked_at,
            Timestamp::new(1_100)
        );
        // Roster stays stable until the next pass prunes it.
        assert_eq!(ledger.roster_len(&pool(1)), 1);
        ledger.prune_roster(&pool(1));
        assert_eq!(ledger.roster_len(&pool(1)), 0);
    }

    #[test]
    fn withdraw_respects_lock_and_leverage() {
        let mut ledger = staked_ledger(10);
        let p = open_params();

        ledger.release_allocation(
            &member(1),
            &pool(1),
            TokenAmount::new(10),
            Timestamp::new(1_000),
            100,
        );

        let err = ledger
            .check_withdraw(&member(1), TokenAmount::new(5), Timestamp::new(1_050), &p)
            .unwrap_err();
        assert!(matches!(err, LedgerError::LockTimeNotElapsed { .. }));

        ledger
            .check_withdraw(&member(1), TokenAmount::new(10), Timestamp::new(1_100), &p)
            .unwrap();
        ledger.apply_withdraw(&member(1), TokenAmount::new(10));
        assert_eq!(ledger.member(&member(1)).unwrap().balance, TokenAmount::ZERO);
        assert_eq!(ledger.total_custody(), TokenAmount::ZERO);
    }

    #[test]
    fn withdraw_keeping_unbacked_allocation_fails() {
        let mut ledger = staked_ledger(10);
        let p = open_params(); // leverage 2: allocation 10 needs balance >= 5
        let err = ledger
            .check_withdraw(&member(1), TokenAmount::new(6), Timestamp::new(0), &p)
            .unwrap_err();
        assert!(matches!(err, LedgerError::LeverageExceeded { .. }));
        ledger
            .check_withdraw(&member(1), TokenAmount::new(5), Timestamp::new(0), &p)
            .unwrap();
    }

    #[test]
    fn deallocation_request_validation() {
        let ledger = staked_ledger(10);
        let mut p = open_params();
        p.min_allowed_deallocation = TokenAmount::new(5);

        // Remainder 7 >= 5: fine.
        ledger
            .check_deallocation_request(&member(1), &[pool(1)], &[TokenAmount::new(3)], &p)
            .unwrap();
        // Remainder 2 < 5: rejected.
        let err = ledger
            .check_deallocation_request(&member(1), &[pool(1)], &[TokenAmount::new(8)], &p)
            .unwrap_err();
        assert!(matches!(err, LedgerError::BelowMinimum { .. }));
        // Full exit (remainder zero): fine.
        ledger
            .check_deallocation_request(&member(1), &[pool(1)], &[TokenAmount::new(10)], &p)
            .unwrap();
        // More than allocated: rejected.
        let err = ledger
            .check_deallocation_request(&member(1), &[pool(1)], &[TokenAmount::new(11)], &p)
            .unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientAllocation { .. }));
    }
}
