//! Ledger-specific errors.

use thiserror::Error;
use tidepool_types::{Address, Timestamp, TokenAmount};

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("pools and amounts length mismatch: {pools} vs {amounts}")]
    LengthMismatch { pools: usize, amounts: usize },

    #[error("pool {0} listed more than once")]
    DuplicatePool(Address),

    #[error("amount below required floor: need at least {required}, got {actual}")]
    BelowMinimum {
        required: TokenAmount,
        actual: TokenAmount,
    },

    #[error("total allocation {allocated} exceeds leverage cap {cap}")]
    LeverageExceeded {
        allocated: TokenAmount,
        cap: TokenAmount,
    },

    #[error("pool {pool} staked total {staked} exceeds exposure cap {cap}")]
    ExposureExceeded {
        pool: Address,
        staked: TokenAmount,
        cap: TokenAmount,
    },

    #[error("requested {requested} exceeds allocation {allocated} on pool {pool}")]
    InsufficientAllocation {
        pool: Address,
        requested: TokenAmount,
        allocated: TokenAmount,
    },

    #[error("insufficient custody balance: need {needed}, available {available}")]
    InsufficientBalance {
        needed: TokenAmount,
        available: TokenAmount,
    },

    #[error("member {0} has no ledger record")]
    UnknownMember(Address),

    #[error("withdrawal locked until {unlocked_at}")]
    LockTimeNotElapsed { unlocked_at: Timestamp },

    #[error("amount must be non-zero")]
    ZeroAmount,

    #[error("arithmetic overflow in ledger computation")]
    Overflow,
}
