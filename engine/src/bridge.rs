//! Token custody seam.
//!
//! Actual token movement happens outside the engine. The bridge is called
//! at exactly three boundaries — stake/reward intake, burn sink, and
//! withdrawal payout — and each call may fail. The engine never commits a
//! ledger mutation before the corresponding bridge call succeeds.

use thiserror::Error;
use tidepool_types::{Address, TokenAmount};

/// Failure reported by the external token custodian.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct TransferError(pub String);

/// The external token custodian.
pub trait TokenBridge {
    /// Pull tokens from `from` into engine custody (stake or reward
    /// intake).
    fn collect(&mut self, from: &Address, amount: TokenAmount) -> Result<(), TransferError>;

    /// Send burned tokens out of custody to the sink.
    fn burn(&mut self, amount: TokenAmount) -> Result<(), TransferError>;

    /// Pay tokens out of custody to a member.
    fn release(&mut self, to: &Address, amount: TokenAmount) -> Result<(), TransferError>;
}
