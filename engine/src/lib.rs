//! The tidepool staking engine.
//!
//! Members deposit a fungible token and allocate exposure to risk-bearing
//! pools; trusted principals burn staked funds from a pool to cover
//! realized losses, or distribute rewards to its stakers; members request
//! time-delayed deallocations and withdraw unlocked funds.
//!
//! Every state-changing call runs under a strictly bounded per-call
//! processing budget. Work that touches many records — a pro-rata burn
//! across a pool's stakers, a batch of matured deallocations — is drained
//! incrementally by a resumable pending-action processor with persisted
//! cursors. Cross-queue ordering is enforced by refusal: a new burn is
//! rejected while an unprocessed burn or a due-but-unprocessed
//! deallocation exists, so a burn always haircuts the currently due stake
//! set.

pub mod auth;
pub mod bridge;
pub mod engine;
pub mod error;
pub mod nullable;
pub mod processor;

pub use auth::RoleOracle;
pub use bridge::{TokenBridge, TransferError};
pub use engine::StakingEngine;
pub use error::StakingError;
pub use nullable::{NullBridge, NullRoles};
pub use processor::ProcessOutcome;
