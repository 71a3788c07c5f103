//! Shared identifier types for the car rental gateway.

pub mod types;

pub use types::{CarUid, PaymentUid, RentalUid, Username};
