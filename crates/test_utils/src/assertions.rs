//! Custom Test Assertions
//!
//! Assertion helpers for domain types with more meaningful failure messages
//! than standard assertions.

use core_kernel::Money;
use domain_billing::Invoice;

/// Asserts that a Money value is zero
pub fn assert_money_zero(money: &Money) {
    assert!(money.is_zero(), "Expected zero money, got {}", money);
}

/// Asserts that a Money value is positive
pub fn assert_money_positive(money: &Money) {
    assert!(money.is_positive(), "Expected positive money, got {}", money);
}

/// Asserts the invoice ledger invariants hold
///
/// - balance equals total minus paid
/// - total equals the sum of charge line totals
/// - net paid equals payments minus refunds
/// - neither paid nor balance is negative
pub fn assert_invoice_balanced(invoice: &Invoice) {
    assert_eq!(
        invoice.balance(),
        invoice.total - invoice.paid,
        "balance != total - paid on invoice {}",
        invoice.id
    );

    let charge_sum: Money = invoice.charges.iter().map(|c| c.total_price).sum();
    assert_eq!(
        invoice.total, charge_sum,
        "total {} != sum of charges {} on invoice {}",
        invoice.total, charge_sum, invoice.id
    );

    let payment_sum: Money = invoice.payments.iter().map(|p| p.amount).sum();
    let refund_sum: Money = invoice
        .payments
        .iter()
        .flat_map(|p| p.refunds.iter())
        .map(|r| r.amount)
        .sum();
    assert_eq!(
        invoice.paid,
        payment_sum - refund_sum,
        "paid {} != payments {} - refunds {} on invoice {}",
        invoice.paid,
        payment_sum,
        refund_sum,
        invoice.id
    );

    assert!(
        !invoice.paid.is_negative(),
        "negative paid on invoice {}",
        invoice.id
    );
    assert!(
        !invoice.balance().is_negative(),
        "negative balance on invoice {}",
        invoice.id
    );
}
