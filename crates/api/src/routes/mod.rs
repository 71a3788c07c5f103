//! Route handlers.

pub mod cars;
pub mod health;
pub mod metrics;
pub mod rentals;

use std::sync::Arc;

use clients::{CarClient, PaymentClient, RentalClient};
use saga::RentalSagaCoordinator;

/// Shared application state accessible from all handlers.
pub struct AppState<C, R, P>
where
    C: CarClient,
    R: RentalClient,
    P: PaymentClient + Clone + 'static,
{
    pub coordinator: RentalSagaCoordinator<C, R, P>,
}

/// State handle passed to the handlers.
pub type SharedState<C, R, P> = Arc<AppState<C, R, P>>;
