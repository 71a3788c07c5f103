//! Car listing endpoint.

use axum::Json;
use axum::extract::{Query, State};
use clients::{CarClient, PaymentClient, RentalClient};
use domain::{CarsPage, CarsQuery};

use super::SharedState;
use crate::error::ApiError;

/// GET /api/v1/cars?page=&size=&showAll= : one page of the car catalogue.
#[tracing::instrument(skip(state))]
pub async fn list<C, R, P>(
    State(state): State<SharedState<C, R, P>>,
    Query(query): Query<CarsQuery>,
) -> Result<Json<CarsPage>, ApiError>
where
    C: CarClient + 'static,
    R: RentalClient + 'static,
    P: PaymentClient + Clone + 'static,
{
    let page = state.coordinator.list_cars(query).await?;
    Ok(Json(page))
}
