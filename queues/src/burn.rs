//! The burn queue — strict FIFO with a resumable pro-rata pass.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tidepool_types::{Address, Timestamp, TokenAmount};

/// One requested burn against a pool.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BurnRecord {
    pub pool: Address,
    pub amount: TokenAmount,
    pub requested_at: Timestamp,
}

/// In-flight progress of the head burn's pro-rata pass.
///
/// Captured when processing starts; survives budget exhaustion so the next
/// drain resumes at the same roster index against the same pre-burn total.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BurnProgress {
    /// Index of the next staker to deduct in the pool's roster.
    pub staker_index: usize,
    /// Exposure deducted so far across processed stakers.
    pub deducted: TokenAmount,
    /// Custody tokens deducted so far (what the sink will receive).
    pub custody_deducted: TokenAmount,
    /// The pool's staked total when the pass began; pro-rata denominator.
    pub pre_total: TokenAmount,
}

/// Append-only burn backlog. Records stay queryable by id after
/// processing; the `first` cursor marks the next unprocessed id.
///
/// Invariant: `first <= last_id + 1`; drained iff `first == last_id + 1`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BurnQueue {
    records: BTreeMap<u64, BurnRecord>,
    first: u64,
    last_id: u64,
    progress: Option<BurnProgress>,
}

impl BurnQueue {
    pub fn new() -> Self {
        Self {
            records: BTreeMap::new(),
            first: 1,
            last_id: 0,
            progress: None,
        }
    }

    /// Id of the next unprocessed burn (`last_id + 1` when drained).
    pub fn first(&self) -> u64 {
        self.first
    }

    /// Last id ever issued (0 before any burn).
    pub fn last_id(&self) -> u64 {
        self.last_id
    }

    pub fn is_drained(&self) -> bool {
        self.first == self.last_id + 1
    }

    pub fn has_pending(&self) -> bool {
        !self.is_drained()
    }

    /// Append a new burn and return its id. Validation (ordering rules,
    /// amount vs pool total) is the engine's job.
    pub fn push(&mut self, pool: Address, amount: TokenAmount, requested_at: Timestamp) -> u64 {
        self.last_id += 1;
        self.records.insert(
            self.last_id,
            BurnRecord {
                pool,
                amount,
                requested_at,
            },
        );
        self.last_id
    }

    /// Look up any burn ever issued.
    pub fn get(&self, id: u64) -> Option<&BurnRecord> {
        self.records.get(&id)
    }

    /// The head burn awaiting processing.
    pub fn head(&self) -> Option<(u64, &BurnRecord)> {
        if self.is_drained() {
            return None;
        }
        self.records.get(&self.first).map(|r| (self.first, r))
    }

    /// Progress of the head burn's pass, if one has started.
    pub fn progress(&self) -> Option<&BurnProgress> {
        self.progress.as_ref()
    }

    /// Start a pass over the head burn with the given pre-burn pool total.
    /// No-op if a pass is already in flight.
    pub fn start_progress(&mut self, pre_total: TokenAmount) -> &mut BurnProgress {
        self.progress.get_or_insert(BurnProgress {
            staker_index: 0,
            deducted: TokenAmount::ZERO,
            custody_deducted: TokenAmount::ZERO,
            pre_total,
        })
    }

    pub fn progress_mut(&mut self) -> Option<&mut BurnProgress> {
        self.progress.as_mut()
    }

    /// Complete the head burn: clear progress and advance the cursor.
    pub fn advance(&mut self) {
        debug_assert!(self.has_pending());
        self.progress = None;
        self.first += 1;
    }
}

impl Default for BurnQueue {
    fn default() -> Self {
        Self::new()
    }
}
