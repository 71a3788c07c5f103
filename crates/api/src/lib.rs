//! HTTP gateway for the car rental system.
//!
//! Exposes the customer-facing rental API over the car, rental and payment
//! services, with structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use clients::{
    CarClient, ClientError, HttpCarClient, HttpPaymentClient, HttpRentalClient, PaymentClient,
    RentalClient,
};
use metrics_exporter_prometheus::PrometheusHandle;
use saga::{RentalSagaCoordinator, RetryPolicy};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;
use routes::{AppState, SharedState};

/// State of a gateway talking to the real backends.
pub type HttpAppState = AppState<HttpCarClient, HttpRentalClient, HttpPaymentClient>;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<C, R, P>(state: SharedState<C, R, P>, metrics_handle: PrometheusHandle) -> Router
where
    C: CarClient + 'static,
    R: RentalClient + 'static,
    P: PaymentClient + Clone + 'static,
{
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    let api = Router::new()
        .route("/cars", get(routes::cars::list::<C, R, P>))
        .route(
            "/rental",
            get(routes::rentals::list::<C, R, P>).post(routes::rentals::rent::<C, R, P>),
        )
        .route(
            "/rental/{id}",
            get(routes::rentals::get::<C, R, P>).delete(routes::rentals::cancel::<C, R, P>),
        )
        .route(
            "/rental/{id}/finish",
            post(routes::rentals::finish::<C, R, P>),
        );

    Router::new()
        .route("/health", get(routes::health::check))
        .nest("/api/v1", api)
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Wraps the given backend clients in application state.
pub fn create_state<C, R, P>(
    cars: C,
    rentals: R,
    payments: P,
    retry_policy: RetryPolicy,
) -> SharedState<C, R, P>
where
    C: CarClient,
    R: RentalClient,
    P: PaymentClient + Clone + 'static,
{
    let coordinator =
        RentalSagaCoordinator::new(cars, rentals, payments).with_retry_policy(retry_policy);
    Arc::new(AppState { coordinator })
}

/// Creates the state for a gateway talking to the backends named in `config`.
pub fn create_http_state(config: &Config) -> Result<Arc<HttpAppState>, ClientError> {
    let cars = HttpCarClient::new(config.car_service_url.clone(), config.backend_timeout)?;
    let rentals = HttpRentalClient::new(config.rental_service_url.clone(), config.backend_timeout)?;
    let payments =
        HttpPaymentClient::new(config.payment_service_url.clone(), config.backend_timeout)?;
    Ok(create_state(cars, rentals, payments, config.retry_policy))
}
