//! Saga orchestration for the car rental gateway.
//!
//! Renting a car spans three independently failing services:
//! 1. Reserve the car (car service)
//! 2. Charge the payment (payment service)
//! 3. Open the rental record (rental service)
//!
//! When a step fails, the steps already completed are compensated in reverse
//! order. Finishing and canceling a rental are shorter sequences over the same
//! services. A payment cancellation that cannot be delivered is recorded as
//! owed and retried by a detached background task.

pub mod coordinator;
pub mod error;
pub mod pending;
pub mod rental_saga;
pub mod retry;

pub use coordinator::{RentalSagaCoordinator, SettledRentalView};
pub use error::SagaError;
pub use pending::PendingCancellations;
pub use retry::{RetryOutcome, RetryPolicy};
