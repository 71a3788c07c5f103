//! Saga error types.

use clients::ClientError;
use common::{CarUid, PaymentUid, RentalUid};
use domain::Money;
use thiserror::Error;

/// Errors that can occur while running a rental saga.
#[derive(Debug, Error)]
pub enum SagaError {
    /// A forward step failed.
    #[error("Saga step '{step}' failed: {source}")]
    StepFailed {
        step: &'static str,
        source: ClientError,
    },

    /// Undoing a completed step failed.
    #[error("Compensation step '{step}' failed: {source}")]
    CompensationFailed {
        step: &'static str,
        source: ClientError,
    },

    /// The payment service answered 503 while charging; the car was released.
    #[error("Payment service unavailable")]
    PaymentUnavailable,

    /// The rental was canceled but its payment was not; a background retry
    /// owns the cancellation now.
    #[error("Payment {payment_uid} not canceled yet, retrying in background: {source}")]
    PaymentCancellationDeferred {
        payment_uid: PaymentUid,
        source: ClientError,
    },

    /// Finishing the rental or releasing its car failed.
    #[error("Rental {rental_uid} could not be finished: {source}")]
    RentalNotEnded {
        rental_uid: RentalUid,
        source: ClientError,
    },

    /// The period price does not fit the money type; the car was released.
    #[error("Price for car {car_uid} at {daily_price} per day is out of range")]
    PriceOutOfRange { car_uid: CarUid, daily_price: Money },

    /// A read against a backend failed.
    #[error("Lookup failed: {0}")]
    Lookup(#[from] ClientError),
}

impl SagaError {
    /// Returns true when a backend reported the requested entity as unknown.
    pub fn is_not_found(&self) -> bool {
        match self {
            SagaError::StepFailed { source, .. }
            | SagaError::RentalNotEnded { source, .. }
            | SagaError::Lookup(source) => source.is_not_found(),
            _ => false,
        }
    }

    /// Returns true when the failure happened while undoing a step.
    pub fn is_compensation_failure(&self) -> bool {
        matches!(self, SagaError::CompensationFailed { .. })
    }
}
