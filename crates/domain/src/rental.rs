//! Rental records and the views the gateway assembles around them.

use chrono::NaiveDate;
use common::{CarUid, PaymentUid, RentalUid, Username};
use serde::{Deserialize, Serialize};

use crate::calendar_date;
use crate::car::{Car, CarSummary};
use crate::payment::{Payment, PaymentSummary};

/// Lifecycle of a rental.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RentalStatus {
    InProgress,
    Finished,
    Canceled,
}

impl RentalStatus {
    /// Returns the wire name of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            RentalStatus::InProgress => "IN_PROGRESS",
            RentalStatus::Finished => "FINISHED",
            RentalStatus::Canceled => "CANCELED",
        }
    }
}

impl std::fmt::Display for RentalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A customer's request to rent a car.
///
/// `date_from < date_to` is trusted, not checked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RentalRequest {
    pub car_uid: CarUid,
    #[serde(with = "calendar_date")]
    pub date_from: NaiveDate,
    #[serde(with = "calendar_date")]
    pub date_to: NaiveDate,
}

/// A rental record owned by the rental service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rental {
    pub rental_uid: RentalUid,
    pub car_uid: CarUid,
    pub payment_uid: PaymentUid,
    pub username: Username,
    #[serde(with = "calendar_date")]
    pub date_from: NaiveDate,
    #[serde(with = "calendar_date")]
    pub date_to: NaiveDate,
    pub status: RentalStatus,
}

/// Body sent to the rental service to open a rental.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRental {
    pub car_uid: CarUid,
    #[serde(with = "calendar_date")]
    pub date_from: NaiveDate,
    #[serde(with = "calendar_date")]
    pub date_to: NaiveDate,
    pub username: Username,
    pub payment_uid: PaymentUid,
}

/// Returned to the customer after a successful rent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RentalConfirmation {
    pub rental_uid: RentalUid,
    pub car_uid: CarUid,
    #[serde(with = "calendar_date")]
    pub date_from: NaiveDate,
    #[serde(with = "calendar_date")]
    pub date_to: NaiveDate,
    pub status: RentalStatus,
    pub payment: PaymentSummary,
}

/// Rental joined with its car and, when available, its payment.
///
/// Assembled per request and never stored. A missing `payment` means the
/// payment service could not be read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedRentalView {
    pub rental_uid: RentalUid,
    #[serde(with = "calendar_date")]
    pub date_from: NaiveDate,
    #[serde(with = "calendar_date")]
    pub date_to: NaiveDate,
    pub status: RentalStatus,
    pub car: CarSummary,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment: Option<PaymentSummary>,
}

impl AggregatedRentalView {
    pub fn assemble(rental: &Rental, car: &Car, payment: Option<Payment>) -> Self {
        Self {
            rental_uid: rental.rental_uid,
            date_from: rental.date_from,
            date_to: rental.date_to,
            status: rental.status,
            car: car.summary(),
            payment,
        }
    }
}
