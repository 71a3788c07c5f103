//! Payments as reported by the payment service.

use common::PaymentUid;
use serde::{Deserialize, Serialize};

use crate::money::Money;

/// Lifecycle of a payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Paid,
    Canceled,
}

impl PaymentStatus {
    /// Returns the wire name of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Paid => "PAID",
            PaymentStatus::Canceled => "CANCELED",
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A payment record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub payment_uid: PaymentUid,
    pub status: PaymentStatus,
    pub price: Money,
}

impl Payment {
    /// A freshly charged payment.
    pub fn paid(payment_uid: PaymentUid, price: Money) -> Self {
        Self {
            payment_uid,
            status: PaymentStatus::Paid,
            price,
        }
    }

    pub fn is_paid(&self) -> bool {
        self.status == PaymentStatus::Paid
    }
}

/// Payment details embedded in rental views and confirmations.
pub type PaymentSummary = Payment;
