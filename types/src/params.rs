//! Protocol parameters — every governance-tunable value of the engine.

use crate::amount::TokenAmount;
use serde::{Deserialize, Serialize};

/// All protocol parameters, stored in one table.
///
/// Set to safe defaults at construction; mutated only through the
/// governance-gated update surface; read by every validating operation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProtocolParams {
    // ── Allocation floors and caps ───────────────────────────────────────
    /// Minimum allocation a member may hold on a single pool.
    pub min_allocation: TokenAmount,

    /// Maximum ratio of a member's total allocations to their custody
    /// balance.
    pub max_leverage: u128,

    /// Minimum allocation that may remain on a pool after a deallocation
    /// (the remainder must be zero or at least this).
    pub min_allowed_deallocation: TokenAmount,

    /// Minimum custody balance a member must keep after staking.
    pub min_stake: TokenAmount,

    /// Minimum amount per withdrawal.
    pub min_unstake: TokenAmount,

    /// Pool exposure cap as a multiple of aggregate custody; 0 disables
    /// the check.
    pub max_exposure: u128,

    // ── Lock delays ──────────────────────────────────────────────────────
    /// Delay between a deallocation request and its eligibility.
    pub deallocate_lock_time_secs: u64,

    /// Delay between a processed deallocation and external withdrawability.
    pub unstake_lock_time_secs: u64,

    // ── Processing budgets (items per cycle) ─────────────────────────────
    /// Staker deductions applied per burn-drain cycle.
    pub burn_cycle_budget: u32,

    /// Matured requests applied per deallocation-drain cycle.
    pub deallocation_cycle_budget: u32,

    /// Staker credits applied per reward-drain cycle.
    pub reward_cycle_budget: u32,
}

impl ProtocolParams {
    /// Deployment defaults for the live configuration.
    pub fn pooled_defaults() -> Self {
        Self {
            min_allocation: TokenAmount::from_tokens(20),
            max_leverage: 10,
            min_allowed_deallocation: TokenAmount::from_tokens(20),
            min_stake: TokenAmount::from_tokens(20),
            min_unstake: TokenAmount::from_tokens(20),
            max_exposure: 10,

            deallocate_lock_time_secs: 90 * 24 * 3600, // 90 days
            unstake_lock_time_secs: 30 * 24 * 3600,    // 30 days

            burn_cycle_budget: 50,
            deallocation_cycle_budget: 50,
            reward_cycle_budget: 50,
        }
    }

    /// Apply a single named-parameter update. Amount-valued parameters take
    /// the value as raw units; durations and budgets narrow it.
    pub fn set(&mut self, param: Param, value: u128) {
        match param {
            Param::MinAllocation => self.min_allocation = TokenAmount::new(value),
            Param::MaxLeverage => self.max_leverage = value,
            Param::MinAllowedDeallocation => {
                self.min_allowed_deallocation = TokenAmount::new(value)
            }
            Param::MinStake => self.min_stake = TokenAmount::new(value),
            Param::MinUnstake => self.min_unstake = TokenAmount::new(value),
            Param::MaxExposure => self.max_exposure = value,
            Param::DeallocateLockTime => self.deallocate_lock_time_secs = value as u64,
            Param::UnstakeLockTime => self.unstake_lock_time_secs = value as u64,
            Param::BurnCycleBudget => self.burn_cycle_budget = value as u32,
            Param::DeallocationCycleBudget => self.deallocation_cycle_budget = value as u32,
            Param::RewardCycleBudget => self.reward_cycle_budget = value as u32,
        }
    }
}

impl Default for ProtocolParams {
    fn default() -> Self {
        Self::pooled_defaults()
    }
}

/// Enum of all parameters reachable through the governance update surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Param {
    MinAllocation,
    MaxLeverage,
    MinAllowedDeallocation,
    MinStake,
    MinUnstake,
    MaxExposure,
    DeallocateLockTime,
    UnstakeLockTime,
    BurnCycleBudget,
    DeallocationCycleBudget,
    RewardCycleBudget,
}

impl Param {
    /// Human-readable name of this parameter.
    pub fn name(&self) -> &'static str {
        match self {
            Self::MinAllocation => "min_allocation",
            Self::MaxLeverage => "max_leverage",
            Self::MinAllowedDeallocation => "min_allowed_deallocation",
            Self::MinStake => "min_stake",
            Self::MinUnstake => "min_unstake",
            Self::MaxExposure => "max_exposure",
            Self::DeallocateLockTime => "deallocate_lock_time",
            Self::UnstakeLockTime => "unstake_lock_time",
            Self::BurnCycleBudget => "burn_cycle_budget",
            Self::DeallocationCycleBudget => "deallocation_cycle_budget",
            Self::RewardCycleBudget => "reward_cycle_budget",
        }
    }
}
