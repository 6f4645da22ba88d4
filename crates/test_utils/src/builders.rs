//! Test Data Builders
//!
//! Builders for constructing invoice aggregates directly, bypassing the
//! service layer, for tests that target domain behavior in isolation.

use chrono::Utc;
use core_kernel::{Money, PatientId, ServiceId, StaffId};
use rust_decimal_macros::dec;

use domain_billing::{Charge, Invoice, InvoiceNumber, Payment, PaymentMethod};

/// Builder for invoice aggregates in a chosen lifecycle state
pub struct TestInvoiceBuilder {
    patient_id: PatientId,
    sequence: u32,
    charges: Vec<(u32, Money)>,
    finalized: bool,
    payments: Vec<Money>,
}

impl Default for TestInvoiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestInvoiceBuilder {
    pub fn new() -> Self {
        Self {
            patient_id: PatientId::new(),
            sequence: 1,
            charges: Vec::new(),
            finalized: false,
            payments: Vec::new(),
        }
    }

    pub fn for_patient(mut self, patient_id: PatientId) -> Self {
        self.patient_id = patient_id;
        self
    }

    pub fn with_sequence(mut self, sequence: u32) -> Self {
        self.sequence = sequence;
        self
    }

    /// Adds a charge line of `quantity` at `unit_price`
    pub fn with_charge(mut self, quantity: u32, unit_price: Money) -> Self {
        self.charges.push((quantity, unit_price));
        self
    }

    /// A single 1 x 100.00 line, the common case
    pub fn with_standard_charge(self) -> Self {
        self.with_charge(1, Money::new(dec!(100.00)))
    }

    /// Finalizes the invoice after adding charges
    pub fn finalized(mut self) -> Self {
        self.finalized = true;
        self
    }

    /// Records a cash payment after finalizing
    pub fn with_payment(mut self, amount: Money) -> Self {
        self.finalized = true;
        self.payments.push(amount);
        self
    }

    pub fn build(self) -> Invoice {
        let number = InvoiceNumber::new(Utc::now().date_naive(), self.sequence);
        let mut invoice = Invoice::new(self.patient_id, number);

        for (quantity, unit_price) in self.charges {
            let charge = Charge::new(ServiceId::new(), "Test service", quantity, unit_price)
                .expect("valid charge");
            invoice.add_charge(charge).expect("draft accepts charges");
        }
        if self.finalized {
            invoice.finalize().expect("finalizable invoice");
        }
        for amount in self.payments {
            let payment = Payment::new(
                invoice.id,
                invoice.patient_id,
                amount,
                PaymentMethod::Cash,
                StaffId::new(),
            );
            invoice.record_payment(payment).expect("payment fits balance");
        }
        invoice
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain_billing::InvoiceStatus;

    #[test]
    fn test_builder_states() {
        let draft = TestInvoiceBuilder::new().with_standard_charge().build();
        assert_eq!(draft.status, InvoiceStatus::Draft);

        let pending = TestInvoiceBuilder::new()
            .with_standard_charge()
            .finalized()
            .build();
        assert_eq!(pending.status, InvoiceStatus::Pending);

        let paid = TestInvoiceBuilder::new()
            .with_standard_charge()
            .with_payment(Money::new(dec!(100.00)))
            .build();
        assert_eq!(paid.status, InvoiceStatus::Paid);
    }
}
