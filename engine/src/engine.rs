//! The staking engine call surface.

use tidepool_ledger::{Ledger, LedgerError, MemberRecord, PoolRecord};
use tidepool_queues::{
    BurnQueue, BurnRecord, DeallocationQueue, DeallocationRequest, RewardQueue, RewardRecord,
};
use tidepool_types::{Address, Param, ProtocolParams, Timestamp, TokenAmount};

use crate::auth::RoleOracle;
use crate::bridge::TokenBridge;
use crate::error::StakingError;
use crate::processor::ProcessOutcome;

/// The staking engine: allocation ledger, three pending-action queues, and
/// the external seams.
///
/// Operations are strictly serialized through `&mut self`. Every mutating
/// call first drains as much already-queued work as its budgets allow,
/// then validates and applies its own effect. Validation failures reject
/// atomically before any state mutation.
pub struct StakingEngine<R: RoleOracle, B: TokenBridge> {
    pub(crate) params: ProtocolParams,
    pub(crate) ledger: Ledger,
    pub(crate) burns: BurnQueue,
    pub(crate) deallocations: DeallocationQueue,
    pub(crate) rewards: RewardQueue,
    pub(crate) roles: R,
    pub(crate) bridge: B,
}

impl<R: RoleOracle, B: TokenBridge> StakingEngine<R, B> {
    pub fn new(roles: R, bridge: B) -> Self {
        Self::with_params(ProtocolParams::default(), roles, bridge)
    }

    pub fn with_params(params: ProtocolParams, roles: R, bridge: B) -> Self {
        Self {
            params,
            ledger: Ledger::new(),
            burns: BurnQueue::new(),
            deallocations: DeallocationQueue::new(),
            rewards: RewardQueue::new(),
            roles,
            bridge,
        }
    }

    // ── Capability gates ─────────────────────────────────────────────────

    fn require_member(&self, caller: &Address) -> Result<(), StakingError> {
        if self.roles.is_member(caller) {
            Ok(())
        } else {
            Err(StakingError::PermissionDenied { required: "member" })
        }
    }

    fn require_internal(&self, caller: &Address) -> Result<(), StakingError> {
        if self.roles.is_internal(caller) {
            Ok(())
        } else {
            Err(StakingError::PermissionDenied {
                required: "internal",
            })
        }
    }

    fn require_governance(&self, caller: &Address) -> Result<(), StakingError> {
        if self.roles.is_governance(caller) {
            Ok(())
        } else {
            Err(StakingError::PermissionDenied {
                required: "governance",
            })
        }
    }

    /// Member-facing mutations need the backlog fully cleared: a suspended
    /// pro-rata pass relies on pool rosters and totals staying put.
    fn ensure_no_pending(&self, now: Timestamp) -> Result<(), StakingError> {
        if self.burns.has_pending() {
            return Err(StakingError::PendingBurn);
        }
        if self.deallocations.has_due(now) {
            return Err(StakingError::PendingDeallocation);
        }
        if self.rewards.has_pending() {
            return Err(StakingError::PendingReward);
        }
        Ok(())
    }

    // ── Member operations ────────────────────────────────────────────────

    /// Deposit `amount` into custody and set the listed pool allocations
    /// to absolute values. Allocations only grow or re-affirm here;
    /// decreases go through [`Self::request_deallocation`].
    pub fn stake(
        &mut self,
        caller: &Address,
        amount: TokenAmount,
        pools: &[Address],
        amounts: &[TokenAmount],
        now: Timestamp,
    ) -> Result<(), StakingError> {
        self.require_member(caller)?;
        self.drain_pending(now)?;
        self.ensure_no_pending(now)?;

        self.ledger
            .check_stake(caller, amount, pools, amounts, &self.params)?;
        if !amount.is_zero() {
            self.bridge.collect(caller, amount)?;
        }
        self.ledger.apply_stake(caller, amount, pools, amounts);
        tracing::debug!(member = %caller, amount = %amount, pools = pools.len(), "stake applied");
        Ok(())
    }

    /// Queue time-delayed allocation decreases. `insert_after` names the
    /// queued request the first new request should follow (0 = queue
    /// head); the hint is verified against eligibility-time ordering, and
    /// an invalid hint fails the whole call with no state change.
    /// Balances are untouched until the requests mature and are processed.
    pub fn request_deallocation(
        &mut self,
        caller: &Address,
        pools: &[Address],
        amounts: &[TokenAmount],
        insert_after: u64,
        now: Timestamp,
    ) -> Result<(), StakingError> {
        self.require_member(caller)?;
        self.drain_pending(now)?;
        self.ensure_no_pending(now)?;

        self.ledger
            .check_deallocation_request(caller, pools, amounts, &self.params)?;

        let eligible_at = now.saturating_add_secs(self.params.deallocate_lock_time_secs);
        // All requests in one call share the same eligibility time, so once
        // the first insertion position validates, chaining each subsequent
        // request after the previous one cannot fail.
        let mut after = insert_after;
        for (pool, &requested) in pools.iter().zip(amounts) {
            let id = self.deallocations.insert(
                caller.clone(),
                pool.clone(),
                requested,
                now,
                eligible_at,
                after,
            )?;
            tracing::debug!(request = id, member = %caller, pool = %pool, eligible_at = %eligible_at, "deallocation queued");
            after = id;
        }
        Ok(())
    }

    /// Withdraw unlocked, unallocated custody back to the member.
    pub fn withdraw(
        &mut self,
        caller: &Address,
        amount: TokenAmount,
        now: Timestamp,
    ) -> Result<(), StakingError> {
        self.require_member(caller)?;
        self.drain_pending(now)?;
        self.ensure_no_pending(now)?;

        self.ledger
            .check_withdraw(caller, amount, now, &self.params)?;
        self.bridge.release(caller, amount)?;
        self.ledger.apply_withdraw(caller, amount);
        tracing::debug!(member = %caller, amount = %amount, "withdrawal paid out");
        Ok(())
    }

    // ── Internal operations ──────────────────────────────────────────────

    /// Queue a burn against a pool and immediately drain it within the
    /// burn cycle budget. Refused while an unprocessed burn or a
    /// due-but-unprocessed deallocation exists, so a burn always haircuts
    /// the currently due stake set.
    pub fn push_burn(
        &mut self,
        caller: &Address,
        pool: Address,
        amount: TokenAmount,
        now: Timestamp,
    ) -> Result<ProcessOutcome, StakingError> {
        self.require_internal(caller)?;
        let mut outcome = self.drain_pending(now)?;

        if self.burns.has_pending() {
            return Err(StakingError::PendingBurn);
        }
        if self.deallocations.has_due(now) {
            return Err(StakingError::PendingDeallocation);
        }
        if amount.is_zero() {
            return Err(LedgerError::ZeroAmount.into());
        }
        let staked = self.ledger.pool_staked(&pool);
        if amount > staked {
            return Err(StakingError::BurnExceedsStake {
                pool,
                amount,
                staked,
            });
        }

        let id = self.burns.push(pool.clone(), amount, now);
        tracing::debug!(burn = id, pool = %pool, amount = %amount, "burn queued");
        self.drain_burns(now, &mut outcome)?;
        Ok(outcome)
    }

    /// Queue a reward distribution for a pool's stakers, funded by the
    /// caller, and drain it within the reward cycle budget.
    pub fn push_reward(
        &mut self,
        caller: &Address,
        pool: Address,
        amount: TokenAmount,
        now: Timestamp,
    ) -> Result<ProcessOutcome, StakingError> {
        self.require_internal(caller)?;
        let mut outcome = self.drain_pending(now)?;

        if amount.is_zero() {
            return Err(LedgerError::ZeroAmount.into());
        }
        self.bridge.collect(caller, amount)?;
        let id = self.rewards.push(pool.clone(), amount, now);
        tracing::debug!(reward = id, pool = %pool, amount = %amount, "reward queued");

        // The inline drain must not run ahead of a still-suspended burn
        // pass; the reward stays queued for a later processing call.
        if !self.burns.has_pending() {
            self.drain_rewards(now, &mut outcome)?;
        }
        Ok(outcome)
    }

    // ── Maintenance ──────────────────────────────────────────────────────

    /// Drain pending work from all three queues under their budgets.
    /// Callable by any principal; a no-op on empty queues.
    pub fn process_pending_actions(&mut self, now: Timestamp) -> Result<ProcessOutcome, StakingError> {
        self.drain_pending(now)
    }

    // ── Governance ───────────────────────────────────────────────────────

    pub fn update_parameter(
        &mut self,
        caller: &Address,
        param: Param,
        value: u128,
    ) -> Result<(), StakingError> {
        self.require_governance(caller)?;
        self.params.set(param, value);
        tracing::debug!(param = param.name(), value, "parameter updated");
        Ok(())
    }

    pub fn update_parameters(
        &mut self,
        caller: &Address,
        updates: &[(Param, u128)],
    ) -> Result<(), StakingError> {
        self.require_governance(caller)?;
        for &(param, value) in updates {
            self.params.set(param, value);
            tracing::debug!(param = param.name(), value, "parameter updated");
        }
        Ok(())
    }

    // ── Read views ───────────────────────────────────────────────────────

    pub fn params(&self) -> &ProtocolParams {
        &self.params
    }

    pub fn member(&self, address: &Address) -> Option<&MemberRecord> {
        self.ledger.member(address)
    }

    pub fn pool(&self, address: &Address) -> Option<&PoolRecord> {
        self.ledger.pool(address)
    }

    pub fn allocation(&self, member: &Address, pool: &Address) -> TokenAmount {
        self.ledger.allocation(member, pool)
    }

    pub fn total_custody(&self) -> TokenAmount {
        self.ledger.total_custody()
    }

    pub fn burn(&self, id: u64) -> Option<&BurnRecord> {
        self.burns.get(id)
    }

    pub fn first_burn(&self) -> u64 {
        self.burns.first()
    }

    pub fn last_burn_id(&self) -> u64 {
        self.burns.last_id()
    }

    pub fn deallocation(&self, id: u64) -> Option<&DeallocationRequest> {
        self.deallocations.get(id)
    }

    pub fn first_deallocation(&self) -> u64 {
        self.deallocations.head_id()
    }

    pub fn last_deallocation_id(&self) -> u64 {
        self.deallocations.last_id()
    }

    pub fn reward(&self, id: u64) -> Option<&RewardRecord> {
        self.rewards.get(id)
    }

    pub fn first_reward(&self) -> u64 {
        self.rewards.first()
    }

    pub fn last_reward_id(&self) -> u64 {
        self.rewards.last_id()
    }

    /// The external token bridge (e.g. to inspect custody in tests).
    pub fn bridge(&self) -> &B {
        &self.bridge
    }

    pub fn bridge_mut(&mut self) -> &mut B {
        &mut self.bridge
    }
}
