//! Fundamental types for the tidepool staking engine.
//!
//! This crate defines the types shared across every other crate in the
//! workspace: addresses, token amounts, timestamps, and the governable
//! protocol parameters.

pub mod address;
pub mod amount;
pub mod params;
pub mod time;

pub use address::Address;
pub use amount::{TokenAmount, TOKEN_UNIT};
pub use params::{Param, ProtocolParams};
pub use time::Timestamp;
