//! Data model for the car rental gateway.
//!
//! Every entity here is owned and persisted by one of the backend services;
//! the gateway only moves them between services and assembles transient
//! views for its callers.

pub mod calendar_date;
pub mod car;
pub mod money;
pub mod payment;
pub mod rental;

pub use car::{Car, CarSummary, CarsPage, CarsQuery, ReservedCar};
pub use money::{Money, whole_days_between};
pub use payment::{Payment, PaymentStatus, PaymentSummary};
pub use rental::{
    AggregatedRentalView, NewRental, Rental, RentalConfirmation, RentalRequest, RentalStatus,
};
