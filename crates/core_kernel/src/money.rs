//! Money type with precise decimal arithmetic
//!
//! This module provides a type-safe representation of monetary values
//! using rust_decimal for precise calculations without floating-point errors.
//! The billing ledger is single-currency (the facility's local currency), so
//! Money carries no currency axis; amounts are held at a fixed scale of
//! 2 decimal places.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Neg, Sub};
use thiserror::Error;

/// Number of decimal places carried by every amount
pub const MONEY_SCALE: u32 = 2;

/// Errors that can occur during money operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoneyError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Amount must be positive, got {0}")]
    NotPositive(Decimal),

    #[error("Amount must not be negative, got {0}")]
    Negative(Decimal),

    #[error("Overflow during calculation")]
    Overflow,
}

/// A monetary amount in the facility's billing currency
///
/// Money uses rust_decimal for exact arithmetic: repeated additions and
/// subtractions never drift, and comparisons are exact. All amounts are
/// normalized to 2 decimal places on construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    /// Creates a new Money value, rounding to the billing scale
    pub fn new(amount: Decimal) -> Self {
        Self(amount.round_dp(MONEY_SCALE))
    }

    /// Creates Money from an integer amount in minor units (cents)
    pub fn from_minor(minor_units: i64) -> Self {
        Self::new(Decimal::new(minor_units, MONEY_SCALE))
    }

    /// Creates a zero amount
    pub fn zero() -> Self {
        Self(dec!(0))
    }

    /// Validates an amount for a field defined as "positive amount"
    ///
    /// Rejects zero and negative inputs. Serde has already rejected
    /// non-finite values by the time a Decimal exists.
    pub fn positive(amount: Decimal) -> Result<Self, MoneyError> {
        if amount <= Decimal::ZERO {
            return Err(MoneyError::NotPositive(amount));
        }
        Ok(Self::new(amount))
    }

    /// Validates an amount that may be zero but never negative
    pub fn non_negative(amount: Decimal) -> Result<Self, MoneyError> {
        if amount < Decimal::ZERO {
            return Err(MoneyError::Negative(amount));
        }
        Ok(Self::new(amount))
    }

    /// Returns the underlying decimal amount
    pub fn amount(&self) -> Decimal {
        self.0
    }

    /// Returns true if the amount is zero
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Returns true if the amount is strictly positive
    pub fn is_positive(&self) -> bool {
        self.0.is_sign_positive() && !self.0.is_zero()
    }

    /// Returns true if the amount is negative
    pub fn is_negative(&self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }

    /// Returns the absolute value
    pub fn abs(&self) -> Self {
        Self(self.0.abs())
    }

    /// Checked addition that fails on overflow
    pub fn checked_add(&self, other: &Money) -> Result<Money, MoneyError> {
        self.0
            .checked_add(other.0)
            .map(Self::new)
            .ok_or(MoneyError::Overflow)
    }

    /// Checked subtraction that fails on overflow
    pub fn checked_sub(&self, other: &Money) -> Result<Money, MoneyError> {
        self.0
            .checked_sub(other.0)
            .map(Self::new)
            .ok_or(MoneyError::Overflow)
    }

    /// Multiplies a unit price by an integer quantity
    ///
    /// Quantity multiplication is the only scaling the ledger performs, so
    /// the result stays exact at the billing scale.
    pub fn times(&self, quantity: u32) -> Result<Money, MoneyError> {
        self.0
            .checked_mul(Decimal::from(quantity))
            .map(Self::new)
            .ok_or(MoneyError::Overflow)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self::new(self.0 + other.0)
    }
}

impl Sub for Money {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self::new(self.0 - other.0)
    }
}

impl Neg for Money {
    type Output = Self;

    fn neg(self) -> Self {
        Self(-self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

impl From<Decimal> for Money {
    fn from(amount: Decimal) -> Self {
        Self::new(amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_creation_rounds_to_scale() {
        let m = Money::new(dec!(100.505));
        assert_eq!(m.amount(), dec!(100.50));
    }

    #[test]
    fn test_money_from_minor() {
        let m = Money::from_minor(10050);
        assert_eq!(m.amount(), dec!(100.50));
    }

    #[test]
    fn test_money_arithmetic() {
        let a = Money::new(dec!(100.00));
        let b = Money::new(dec!(50.00));

        assert_eq!((a + b).amount(), dec!(150.00));
        assert_eq!((a - b).amount(), dec!(50.00));
    }

    #[test]
    fn test_positive_rejects_zero_and_negative() {
        assert!(matches!(
            Money::positive(dec!(0)),
            Err(MoneyError::NotPositive(_))
        ));
        assert!(matches!(
            Money::positive(dec!(-1.50)),
            Err(MoneyError::NotPositive(_))
        ));
        assert_eq!(Money::positive(dec!(12.34)).unwrap().amount(), dec!(12.34));
    }

    #[test]
    fn test_non_negative_allows_zero() {
        assert!(Money::non_negative(dec!(0)).is_ok());
        assert!(matches!(
            Money::non_negative(dec!(-0.01)),
            Err(MoneyError::Negative(_))
        ));
    }

    #[test]
    fn test_times_quantity() {
        let unit = Money::new(dec!(50.00));
        assert_eq!(unit.times(2).unwrap().amount(), dec!(100.00));
        assert_eq!(unit.times(0).unwrap(), Money::zero());
    }

    #[test]
    fn test_exact_comparison() {
        let a = Money::new(dec!(0.10)) + Money::new(dec!(0.20));
        assert_eq!(a, Money::new(dec!(0.30)));
        assert!(Money::new(dec!(0.29)) < a);
    }
}
