//! Billing analytics
//!
//! Read-only aggregation over a reporting period. Nothing here mutates the
//! ledger; summaries are derived from whatever invoice set the store returns
//! and must tolerate an empty set.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use core_kernel::{Money, ReportingPeriod};

use crate::invoice::{Invoice, InvoiceStatus};

/// Aggregated billing figures for a reporting period
#[derive(Debug, Clone, Serialize)]
pub struct BillingSummary {
    /// The period the summary covers
    pub period: ReportingPeriod,
    /// Total invoices created in the period
    pub invoice_count: usize,
    /// Invoices still in draft
    pub draft_count: usize,
    /// Issued invoices with no payment yet
    pub pending_count: usize,
    /// Partially paid invoices
    pub partial_count: usize,
    /// Fully paid invoices
    pub paid_count: usize,
    /// Cancelled invoices
    pub cancelled_count: usize,
    /// Pending/partial invoices past their due date (derived, not stored)
    pub overdue_count: usize,
    /// Sum of invoice totals
    pub total_amount: Money,
    /// Sum of net paid amounts
    pub total_paid: Money,
    /// Sum of outstanding balances
    pub total_outstanding: Money,
    /// total_paid / total_amount, zero when nothing was billed
    pub collection_rate: Decimal,
}

impl BillingSummary {
    /// Summarizes a set of invoices for a period
    ///
    /// `today` drives the derived overdue count so that reports are
    /// reproducible in tests.
    pub fn summarize(period: ReportingPeriod, invoices: &[Invoice], today: NaiveDate) -> Self {
        let mut summary = Self {
            period,
            invoice_count: invoices.len(),
            draft_count: 0,
            pending_count: 0,
            partial_count: 0,
            paid_count: 0,
            cancelled_count: 0,
            overdue_count: 0,
            total_amount: Money::zero(),
            total_paid: Money::zero(),
            total_outstanding: Money::zero(),
            collection_rate: Decimal::ZERO,
        };

        for invoice in invoices {
            match invoice.status {
                InvoiceStatus::Draft => summary.draft_count += 1,
                InvoiceStatus::Pending => summary.pending_count += 1,
                InvoiceStatus::Partial => summary.partial_count += 1,
                InvoiceStatus::Paid => summary.paid_count += 1,
                InvoiceStatus::Cancelled => summary.cancelled_count += 1,
            }
            if invoice.is_overdue(today) {
                summary.overdue_count += 1;
            }

            summary.total_amount = summary.total_amount + invoice.total;
            summary.total_paid = summary.total_paid + invoice.paid;
            summary.total_outstanding = summary.total_outstanding + invoice.balance();
        }

        if !summary.total_amount.is_zero() {
            summary.collection_rate =
                summary.total_paid.amount() / summary.total_amount.amount();
        }

        summary
    }
}
