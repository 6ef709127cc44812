//! Token amount type.
//!
//! Amounts are fixed-point integers (u128) to avoid floating-point errors.
//! The smallest unit is 1 raw; one whole token is [`TOKEN_UNIT`] raw.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Sub};

/// Raw units per whole token (18 decimals).
pub const TOKEN_UNIT: u128 = 1_000_000_000_000_000_000;

/// An amount of the staked token, in raw units.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TokenAmount(u128);

impl TokenAmount {
    pub const ZERO: Self = Self(0);

    pub fn new(raw: u128) -> Self {
        Self(raw)
    }

    /// Whole tokens, for readable defaults and test fixtures.
    pub fn from_tokens(tokens: u128) -> Self {
        Self(tokens * TOKEN_UNIT)
    }

    pub fn raw(&self) -> u128 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    /// `self × numerator / denominator`, flooring; `None` if the multiply
    /// overflows or the denominator is zero.
    pub fn checked_mul_div(self, numerator: u128, denominator: u128) -> Option<Self> {
        if denominator == 0 {
            return None;
        }
        self.0.checked_mul(numerator).map(|p| Self(p / denominator))
    }

    pub fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }

    pub fn min(self, other: Self) -> Self {
        Self(self.0.min(other.0))
    }
}

impl Add for TokenAmount {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sub for TokenAmount {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl Sum for TokenAmount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, |acc, a| acc + a)
    }
}

impl fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} raw", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checked_sub_underflow_is_none() {
        let a = TokenAmount::new(5);
        let b = TokenAmount::new(7);
        assert!(a.checked_sub(b).is_none());
        assert_eq!(b.checked_sub(a), Some(TokenAmount::new(2)));
    }

    #[test]
    fn mul_div_rounds_down() {
        let a = TokenAmount::new(10);
        assert_eq!(a.checked_mul_div(1, 3), Some(TokenAmount::new(3)));
    }

    #[test]
    fn mul_div_zero_denominator_is_none() {
        assert!(TokenAmount::new(10).checked_mul_div(1, 0).is_none());
    }

    #[test]
    fn from_tokens_scales_by_unit() {
        assert_eq!(TokenAmount::from_tokens(3).raw(), 3 * TOKEN_UNIT);
    }

    #[test]
    fn sum_of_amounts() {
        let total: TokenAmount = [1u128, 2, 3].iter().map(|n| TokenAmount::new(*n)).sum();
        assert_eq!(total, TokenAmount::new(6));
    }
}
