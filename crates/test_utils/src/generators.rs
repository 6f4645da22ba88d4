//! Property-Based Test Generators
//!
//! Proptest strategies for generating random billing data that maintains
//! domain invariants.

use core_kernel::Money;
use domain_billing::PaymentMethod;
use proptest::prelude::*;

/// Strategy for positive amounts in minor units (cents)
pub fn positive_amount_minor_strategy() -> impl Strategy<Value = i64> {
    1i64..100_000_000i64
}

/// Strategy for positive Money values
pub fn positive_money_strategy() -> impl Strategy<Value = Money> {
    positive_amount_minor_strategy().prop_map(Money::from_minor)
}

/// Strategy for charge quantities
pub fn quantity_strategy() -> impl Strategy<Value = u32> {
    1u32..100u32
}

/// Strategy for payment methods
pub fn payment_method_strategy() -> impl Strategy<Value = PaymentMethod> {
    prop_oneof![
        Just(PaymentMethod::Cash),
        Just(PaymentMethod::CreditCard),
        Just(PaymentMethod::DebitCard),
        Just(PaymentMethod::BankTransfer),
        Just(PaymentMethod::Insurance),
        Just(PaymentMethod::MobileMoney),
        Just(PaymentMethod::Check),
    ]
}

/// Strategy for a charge list that keeps invoice totals in range
pub fn charge_lines_strategy() -> impl Strategy<Value = Vec<(u32, Money)>> {
    prop::collection::vec(
        (quantity_strategy(), (100i64..10_000_000i64).prop_map(Money::from_minor)),
        1..8,
    )
}
