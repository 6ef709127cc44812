//! The reward queue — strict FIFO, the credit-side mirror of the burn
//! queue. Each record distributes a payout pro-rata across a pool's
//! stakers, resumable via the same roster-cursor progress shape.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tidepool_types::{Address, Timestamp, TokenAmount};

/// One requested reward distribution for a pool.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardRecord {
    pub pool: Address,
    pub amount: TokenAmount,
    pub requested_at: Timestamp,
}

/// In-flight progress of the head reward's pro-rata pass.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardProgress {
    /// Index of the next staker to credit in the pool's roster.
    pub staker_index: usize,
    /// Payout credited so far across processed stakers.
    pub distributed: TokenAmount,
    /// The pool's staked total when the pass began; pro-rata denominator.
    pub pre_total: TokenAmount,
}

/// Append-only reward backlog with a head cursor.
///
/// Invariant: `first <= last_id + 1`; drained iff `first == last_id + 1`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RewardQueue {
    records: BTreeMap<u64, RewardRecord>,
    first: u64,
    last_id: u64,
    progress: Option<RewardProgress>,
}

impl RewardQueue {
    pub fn new() -> Self {
        Self {
            records: BTreeMap::new(),
            first: 1,
            last_id: 0,
            progress: None,
        }
    }

    /// Id of the next unprocessed reward (`last_id + 1` when drained).
    pub fn first(&self) -> u64 {
        self.first
    }

    /// Last id ever issued (0 before any reward).
    pub fn last_id(&self) -> u64 {
        self.last_id
    }

    pub fn is_drained(&self) -> bool {
        self.first == self.last_id + 1
    }

    pub fn has_pending(&self) -> bool {
        !self.is_drained()
    }

    /// Append a new reward distribution and return its id.
    pub fn push(&mut self, pool: Address, amount: TokenAmount, requested_at: Timestamp) -> u64 {
        self.last_id += 1;
        self.records.insert(
            self.last_id,
            RewardRecord {
                pool,
                amount,
                requested_at,
            },
        );
        self.last_id
    }

    /// Look up any reward ever issued.
    pub fn get(&self, id: u64) -> Option<&RewardRecord> {
        self.records.get(&id)
    }

    /// The head reward awaiting processing.
    pub fn head(&self) -> Option<(u64, &RewardRecord)> {
        if self.is_drained() {
            return None;
        }
        self.records.get(&self.first).map(|r| (self.first, r))
    }

    pub fn progress(&self) -> Option<&RewardProgress> {
        self.progress.as_ref()
    }

    /// Start a pass over the head reward with the given pool total.
    /// No-op if a pass is already in flight.
    pub fn start_progress(&mut self, pre_total: TokenAmount) -> &mut RewardProgress {
        self.progress.get_or_insert(RewardProgress {
            staker_index: 0,
            distributed: TokenAmount::ZERO,
            pre_total,
        })
    }

    pub fn progress_mut(&mut self) -> Option<&mut RewardProgress> {
        self.progress.as_mut()
    }

    /// Complete the head reward: clear progress and advance the cursor.
    pub fn advance(&mut self) {
        debug_assert!(self.has_pending());
        self.progress = None;
        self.first += 1;
    }
}

impl Default for RewardQueue {
    fn default() -> Self {
        Self::new()
    }
}
