//! Pending-action queues.
//!
//! Three backlogs of deferred work, each an append-only record map plus a
//! head cursor: burns (strict FIFO by id), deallocations (ordered by
//! eligibility time with validated insertion hints), and rewards (strict
//! FIFO by id). Burns and rewards additionally carry in-flight progress for
//! the pro-rata pass over a pool's staker roster, so a drain suspended by
//! budget exhaustion resumes at a stable index.

pub mod burn;
pub mod deallocation;
pub mod error;
pub mod reward;

pub use burn::{BurnProgress, BurnQueue, BurnRecord};
pub use deallocation::{DeallocationQueue, DeallocationRequest};
pub use error::QueueError;
pub use reward::{RewardProgress, RewardQueue, RewardRecord};
