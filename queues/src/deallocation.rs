//! The deallocation queue — ordered by eligibility time, not insertion.
//!
//! Requests carry a lock delay, so the queue is kept sorted by
//! `(eligible_at, id)`. Because the lock parameter can change between
//! requests, a new request does not always belong at the tail; the caller
//! supplies an `insert_after` hint naming the predecessor, and the queue
//! verifies the hinted position instead of trusting it.

use crate::error::QueueError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tidepool_types::{Address, Timestamp, TokenAmount};

/// One queued (or historical) deallocation request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeallocationRequest {
    pub member: Address,
    pub pool: Address,
    pub amount: TokenAmount,
    pub requested_at: Timestamp,
    /// When the request becomes ready for processing.
    pub eligible_at: Timestamp,
    /// Id of the next queued request (0 = none). Stale once processed.
    next: u64,
    /// Whether the request is still queued.
    active: bool,
}

impl DeallocationRequest {
    pub fn next(&self) -> u64 {
        self.next
    }

    pub fn is_queued(&self) -> bool {
        self.active
    }
}

/// Append-only deallocation backlog with an eligibility-ordered link chain.
///
/// Records stay queryable by id after processing; `head` points at the
/// first queued request (0 when drained).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeallocationQueue {
    records: BTreeMap<u64, DeallocationRequest>,
    head: u64,
    last_id: u64,
}

impl DeallocationQueue {
    pub fn new() -> Self {
        Self {
            records: BTreeMap::new(),
            head: 0,
            last_id: 0,
        }
    }

    /// Id of the first queued request (0 when the queue is drained).
    pub fn head_id(&self) -> u64 {
        self.head
    }

    /// Last id ever issued (0 before any request).
    pub fn last_id(&self) -> u64 {
        self.last_id
    }

    pub fn is_drained(&self) -> bool {
        self.head == 0
    }

    /// Look up any request ever issued.
    pub fn get(&self, id: u64) -> Option<&DeallocationRequest> {
        self.records.get(&id)
    }

    /// The first queued request.
    pub fn head(&self) -> Option<(u64, &DeallocationRequest)> {
        self.records.get(&self.head).map(|r| (self.head, r))
    }

    /// Whether the head request is ready at `now`.
    pub fn has_due(&self, now: Timestamp) -> bool {
        self.head().map(|(_, r)| r.eligible_at <= now).unwrap_or(false)
    }

    /// Insert a request after the queue position named by `after`
    /// (0 = before the current head). The position is verified against
    /// `(eligible_at, id)` ordering: the predecessor must not be later
    /// than the new request, and the successor must be strictly later —
    /// equal eligibility times order by ascending id, and a fresh id is
    /// always the largest.
    pub fn insert(
        &mut self,
        member: Address,
        pool: Address,
        amount: TokenAmount,
        requested_at: Timestamp,
        eligible_at: Timestamp,
        after: u64,
    ) -> Result<u64, QueueError> {
        let successor = if after == 0 {
            self.head
        } else {
            let predecessor = self
                .records
                .get(&after)
                .filter(|r| r.active)
                .ok_or(QueueError::InvalidInsertionHint { hint: after })?;
            if predecessor.eligible_at > eligible_at {
                return Err(QueueError::InvalidInsertionHint { hint: after });
            }
            predecessor.next
        };

        if successor != 0 {
            let next_req = &self.records[&successor];
            if next_req.eligible_at <= eligible_at {
                return Err(QueueError::InvalidInsertionHint { hint: after });
            }
        }

        self.last_id += 1;
        let id = self.last_id;
        self.records.insert(
            id,
            DeallocationRequest {
                member,
                pool,
                amount,
                requested_at,
                eligible_at,
                next: successor,
                active: true,
            },
        );

        if after == 0 {
            self.head = id;
        } else if let Some(predecessor) = self.records.get_mut(&after) {
            predecessor.next = id;
        }
        Ok(id)
    }

    /// Pop the head request if it is ready at `now`.
    pub fn pop_due(&mut self, now: Timestamp) -> Option<(u64, DeallocationRequest)> {
        let id = self.head;
        let record = self.records.get_mut(&id)?;
        if record.eligible_at > now {
            return None;
        }
        record.active = false;
        self.head = record.next;
        Some((id, record.clone()))
    }

    /// Number of requests currently queued.
    pub fn queued_len(&self) -> usize {
        let mut count = 0;
        let mut cursor = self.head;
        while cursor != 0 {
            count += 1;
            cursor = self.records[&cursor].next;
        }
        count
    }
}

impl Default for DeallocationQueue {
    fn default() -> Self {
        Self::new()
    }
}
