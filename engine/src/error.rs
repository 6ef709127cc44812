//! Engine-surface errors.

use thiserror::Error;
use tidepool_ledger::LedgerError;
use tidepool_queues::QueueError;
use tidepool_types::{Address, TokenAmount};

use crate::bridge::TransferError;

#[derive(Debug, Error)]
pub enum StakingError {
    #[error("caller lacks the {required} capability")]
    PermissionDenied { required: &'static str },

    #[error("unable to execute request with unprocessed burns")]
    PendingBurn,

    #[error("unable to execute request with unprocessed deallocations")]
    PendingDeallocation,

    #[error("unable to execute request with unprocessed rewards")]
    PendingReward,

    #[error("burn amount {amount} exceeds total staked {staked} on pool {pool}")]
    BurnExceedsStake {
        pool: Address,
        amount: TokenAmount,
        staked: TokenAmount,
    },

    #[error("token transfer failed: {0}")]
    Transfer(#[from] TransferError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Queue(#[from] QueueError),
}
