//! Allocation ledger — the source of truth for "how much is staked where".
//!
//! Members hold a custody balance (tokens the engine holds on their behalf)
//! and allocate exposure to pools, up to a leverage cap. Pools track their
//! net staked total, cumulative burns, and a roster of live stakers.
//!
//! This crate only validates and applies balance arithmetic. Queuing,
//! budget-bounded processing, and the external token/authorization seams
//! live in the engine crate.

pub mod error;
pub mod ledger;
pub mod member;
pub mod pool;

pub use error::LedgerError;
pub use ledger::{BurnShare, Ledger};
pub use member::{Allocation, MemberRecord};
pub use pool::PoolRecord;
