//! Clients for the three backend services behind the gateway.
//!
//! Each backend is modelled as an async trait with one method per remote
//! operation. The `Http*` implementations issue a single reqwest call bounded
//! by a timeout; the `InMemory*` implementations stand in for the services in
//! tests and local runs.

pub mod car;
pub mod error;
mod http;
pub mod memory;
pub mod payment;
pub mod rental;

pub use car::{CarClient, HttpCarClient};
pub use error::{Backend, ClientError};
pub use http::DEFAULT_TIMEOUT;
pub use memory::{InMemoryCarService, InMemoryPaymentService, InMemoryRentalService};
pub use payment::{HttpPaymentClient, PaymentClient};
pub use rental::{HttpRentalClient, RentalClient};
