//! Integration tests for the Money type

use core_kernel::{Money, MoneyError};
use rust_decimal_macros::dec;

#[test]
fn test_display_always_shows_two_places() {
    assert_eq!(Money::new(dec!(5)).to_string(), "5.00");
    assert_eq!(Money::new(dec!(5.5)).to_string(), "5.50");
    assert_eq!(Money::new(dec!(-3.2)).to_string(), "-3.20");
}

#[test]
fn test_serde_round_trip() {
    let original = Money::new(dec!(1234.56));
    let json = serde_json::to_string(&original).unwrap();
    let back: Money = serde_json::from_str(&json).unwrap();
    assert_eq!(original, back);
}

#[test]
fn test_serde_rejects_non_numeric() {
    let result: Result<Money, _> = serde_json::from_str("\"not-a-number\"");
    assert!(result.is_err());
}

#[test]
fn test_sum_of_line_totals() {
    let charges = vec![
        Money::new(dec!(100.00)),
        Money::new(dec!(30.00)),
        Money::new(dec!(0.99)),
    ];
    let total: Money = charges.into_iter().sum();
    assert_eq!(total.amount(), dec!(130.99));
}

#[test]
fn test_checked_add_large_values() {
    let a = Money::new(dec!(79000000000000000000000000000));
    let result = a.checked_add(&a);
    assert!(matches!(result, Err(MoneyError::Overflow)));
}

#[test]
fn test_negation() {
    let m = Money::new(dec!(25.00));
    assert_eq!((-m).amount(), dec!(-25.00));
    assert!((-m).is_negative());
}
