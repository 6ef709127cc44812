//! The pending-action processor — budget-bounded, resumable drains.
//!
//! Each queue moves Idle → Draining → Idle; there is no failed state, and
//! partial progress always persists. Budgets are counted in items: one
//! staker deduction (burns), one matured request (deallocations), one
//! staker credit (rewards). Processing never stops mid-item.
//!
//! Queues drain in fixed priority order — burns, then deallocations, then
//! rewards. A burn pass suspended by budget exhaustion owns its pool's
//! roster and totals, so the later queues wait for it; member-facing
//! operations are refused outright while anything is pending (see
//! `StakingEngine::ensure_no_pending`).

use tidepool_types::{Address, Timestamp, TokenAmount};

use crate::auth::RoleOracle;
use crate::bridge::TokenBridge;
use crate::engine::StakingEngine;
use crate::error::StakingError;

/// Progress summary returned by a processing sweep.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ProcessOutcome {
    /// Burns fully applied this sweep.
    pub burns_completed: u32,
    /// Staker deductions applied this sweep.
    pub burn_steps: u32,
    /// Matured deallocation requests released this sweep.
    pub deallocations_processed: u32,
    /// Rewards fully distributed this sweep.
    pub rewards_completed: u32,
    /// Staker credits applied this sweep.
    pub reward_steps: u32,
    /// Whether every queue ended the sweep drained of actionable work.
    pub finished: bool,
}

impl<R: RoleOracle, B: TokenBridge> StakingEngine<R, B> {
    /// Drain all three queues in priority order under their item budgets.
    pub(crate) fn drain_pending(&mut self, now: Timestamp) -> Result<ProcessOutcome, StakingError> {
        let mut outcome = ProcessOutcome::default();
        self.drain_burns(now, &mut outcome)?;
        if self.burns.has_pending() {
            return Ok(outcome);
        }
        self.drain_deallocations(now, &mut outcome);
        self.drain_rewards(now, &mut outcome)?;
        outcome.finished = self.burns.is_drained()
            && !self.deallocations.has_due(now)
            && self.rewards.is_drained();
        Ok(outcome)
    }

    /// Whether a suspended reward pass holds a cursor into `pool`'s roster.
    fn reward_pass_active_on(&self, pool: &Address) -> bool {
        self.rewards.progress().is_some()
            && self
                .rewards
                .head()
                .map(|(_, r)| r.pool == *pool)
                .unwrap_or(false)
    }

    fn burn_cursor(&self) -> usize {
        self.burns.progress().map(|p| p.staker_index).unwrap_or(0)
    }

    fn reward_cursor(&self) -> usize {
        self.rewards.progress().map(|p| p.staker_index).unwrap_or(0)
    }

    /// Apply the head burn pro-rata across its pool's stakers, one staker
    /// per budget item, resuming from the persisted cursor.
    pub(crate) fn drain_burns(
        &mut self,
        _now: Timestamp,
        outcome: &mut ProcessOutcome,
    ) -> Result<(), StakingError> {
        let mut budget = self.params.burn_cycle_budget;
        loop {
            let (id, pool, amount) = match self.burns.head() {
                Some((id, head)) => (id, head.pool.clone(), head.amount),
                None => break,
            };

            if self.burns.progress().is_none() {
                // Fresh pass: reconcile the roster (drop zeroed entries),
                // unless a suspended reward pass still indexes into it.
                if !self.reward_pass_active_on(&pool) {
                    self.ledger.prune_roster(&pool);
                }
                let pre_total = self.ledger.pool_staked(&pool);
                self.burns.start_progress(pre_total);
            }

            let roster_len = self.ledger.roster_len(&pool);
            while self.burn_cursor() < roster_len {
                if budget == 0 {
                    tracing::debug!(burn = id, "burn drain suspended, budget exhausted");
                    return Ok(());
                }
                let index = self.burn_cursor();
                let Some(staker) = self.ledger.staker_at(&pool, index).cloned() else {
                    break;
                };
                let (deducted, pre_total) = match self.burns.progress() {
                    Some(p) => (p.deducted, p.pre_total),
                    None => break,
                };
                let deduction = if index + 1 == roster_len {
                    // Last staker takes the rounding remainder, capped at
                    // its live allocation inside `burn_share`.
                    amount.saturating_sub(deducted)
                } else {
                    let alloc = self.ledger.allocation(&staker, &pool);
                    alloc
                        .checked_mul_div(amount.raw(), pre_total.raw())
                        .unwrap_or(TokenAmount::ZERO)
                };
                let share = self.ledger.burn_share(&staker, &pool, deduction);
                if let Some(p) = self.burns.progress_mut() {
                    p.staker_index += 1;
                    p.deducted = p.deducted + share.allocation_cut;
                    p.custody_deducted = p.custody_deducted + share.custody_cut;
                }
                budget -= 1;
                outcome.burn_steps += 1;
            }

            // Roster fully walked: settle with the sink, then advance the
            // cursor. A sink failure leaves the burn head in place with
            // its pass complete; the next drain retries the transfer.
            let (deducted, custody) = match self.burns.progress() {
                Some(p) => (p.deducted, p.custody_deducted),
                None => (TokenAmount::ZERO, TokenAmount::ZERO),
            };
            if !custody.is_zero() {
                self.bridge.burn(custody)?;
            }
            if deducted < amount {
                tracing::warn!(
                    burn = id,
                    applied = %deducted,
                    requested = %amount,
                    "burn under-applied after rounding caps"
                );
            }
            if !self.reward_pass_active_on(&pool) {
                self.ledger.prune_roster(&pool);
            }
            self.burns.advance();
            outcome.burns_completed += 1;
            tracing::debug!(burn = id, pool = %pool, "burn fully applied");
        }
        Ok(())
    }

    /// Release matured deallocation requests, one per budget item. Amounts
    /// are re-validated against the member's current allocation, which
    /// intervening burns may have shrunk.
    pub(crate) fn drain_deallocations(&mut self, now: Timestamp, outcome: &mut ProcessOutcome) {
        let mut budget = self.params.deallocation_cycle_budget;
        while budget > 0 {
            let Some((id, request)) = self.deallocations.pop_due(now) else {
                break;
            };
            let released = self.ledger.release_allocation(
                &request.member,
                &request.pool,
                request.amount,
                now,
                self.params.unstake_lock_time_secs,
            );
            budget -= 1;
            outcome.deallocations_processed += 1;
            tracing::debug!(
                request = id,
                member = %request.member,
                pool = %request.pool,
                released = %released,
                "deallocation released"
            );
        }
    }

    /// Credit the head reward pro-rata across its pool's stakers, one
    /// staker per budget item, resuming from the persisted cursor.
    pub(crate) fn drain_rewards(
        &mut self,
        _now: Timestamp,
        outcome: &mut ProcessOutcome,
    ) -> Result<(), StakingError> {
        let mut budget = self.params.reward_cycle_budget;
        loop {
            let (id, pool, amount) = match self.rewards.head() {
                Some((id, head)) => (id, head.pool.clone(), head.amount),
                None => break,
            };

            if self.rewards.progress().is_none() {
                // Rewards only drain once burns are idle, so the roster is
                // safe to reconcile here.
                self.ledger.prune_roster(&pool);
                let pre_total = self.ledger.pool_staked(&pool);
                self.rewards.start_progress(pre_total);
            }

            let roster_len = self.ledger.roster_len(&pool);
            while self.reward_cursor() < roster_len {
                if budget == 0 {
                    tracing::debug!(reward = id, "reward drain suspended, budget exhausted");
                    return Ok(());
                }
                let index = self.reward_cursor();
                let Some(staker) = self.ledger.staker_at(&pool, index).cloned() else {
                    break;
                };
                let (distributed, pre_total) = match self.rewards.progress() {
                    Some(p) => (p.distributed, p.pre_total),
                    None => break,
                };
                let credit = if index + 1 == roster_len {
                    amount.saturating_sub(distributed)
                } else {
                    let alloc = self.ledger.allocation(&staker, &pool);
                    alloc
                        .checked_mul_div(amount.raw(), pre_total.raw())
                        .unwrap_or(TokenAmount::ZERO)
                };
                if !credit.is_zero() {
                    self.ledger.credit_reward(&staker, credit);
                }
                if let Some(p) = self.rewards.progress_mut() {
                    p.staker_index += 1;
                    p.distributed = p.distributed + credit;
                }
                budget -= 1;
                outcome.reward_steps += 1;
            }

            let distributed = self
                .rewards
                .progress()
                .map(|p| p.distributed)
                .unwrap_or(TokenAmount::ZERO);
            if distributed < amount {
                tracing::warn!(
                    reward = id,
                    distributed = %distributed,
                    requested = %amount,
                    "reward left partially undistributed (no live stakers)"
                );
            }
            self.rewards.advance();
            outcome.rewards_completed += 1;
            tracing::debug!(reward = id, pool = %pool, "reward fully distributed");
        }
        Ok(())
    }
}
