//! Rental endpoints: list, read, rent, finish and cancel.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequestParts, Path, State};
use axum::http::StatusCode;
use axum::http::request::Parts;
use clients::{CarClient, PaymentClient, RentalClient};
use common::{RentalUid, Username};
use domain::{AggregatedRentalView, RentalConfirmation, RentalRequest};

use super::SharedState;
use crate::error::ApiError;

/// Header carrying the caller's identity.
pub const USER_HEADER: &str = "X-User-Name";

/// The user named by the `X-User-Name` header. A missing or blank header is
/// rejected with 400.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Username);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let name = parts
            .headers
            .get(USER_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| ApiError::BadRequest(format!("{USER_HEADER} header is required")))?;
        Ok(CurrentUser(Username::new(name)))
    }
}

/// GET /api/v1/rental: every rental of the caller with car and payment.
#[tracing::instrument(skip(state))]
pub async fn list<C, R, P>(
    State(state): State<SharedState<C, R, P>>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<AggregatedRentalView>>, ApiError>
where
    C: CarClient + 'static,
    R: RentalClient + 'static,
    P: PaymentClient + Clone + 'static,
{
    let views = state.coordinator.list_user_rentals(&user).await?;
    Ok(Json(views))
}

/// GET /api/v1/rental/{id}: one rental, settling an owed payment
/// cancellation on the way.
#[tracing::instrument(skip(state))]
pub async fn get<C, R, P>(
    State(state): State<SharedState<C, R, P>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<AggregatedRentalView>, ApiError>
where
    C: CarClient + 'static,
    R: RentalClient + 'static,
    P: PaymentClient + Clone + 'static,
{
    let rental_uid = parse_rental_uid(&id)?;
    let settled = state
        .coordinator
        .rental_info_with_settlement(&user, rental_uid)
        .await?;
    if settled.settled_payment {
        tracing::info!(%rental_uid, "owed payment cancellation settled by read");
    }
    Ok(Json(settled.view))
}

/// POST /api/v1/rental: rent a car for the requested period.
#[tracing::instrument(skip(state, body))]
pub async fn rent<C, R, P>(
    State(state): State<SharedState<C, R, P>>,
    CurrentUser(user): CurrentUser,
    body: Result<Json<RentalRequest>, JsonRejection>,
) -> Result<Json<RentalConfirmation>, ApiError>
where
    C: CarClient + 'static,
    R: RentalClient + 'static,
    P: PaymentClient + Clone + 'static,
{
    let Json(request) =
        body.map_err(|e| ApiError::BadRequest(format!("Invalid rental request: {e}")))?;
    let confirmation = state.coordinator.rent_car(&user, request).await?;
    Ok(Json(confirmation))
}

/// POST /api/v1/rental/{id}/finish: return the car. 204 on success, 404 on
/// any failure.
#[tracing::instrument(skip(state))]
pub async fn finish<C, R, P>(
    State(state): State<SharedState<C, R, P>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError>
where
    C: CarClient + 'static,
    R: RentalClient + 'static,
    P: PaymentClient + Clone + 'static,
{
    let rental_uid = parse_rental_uid(&id)?;
    state
        .coordinator
        .end_rental(rental_uid)
        .await
        .map_err(ApiError::rental_not_processed)?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/v1/rental/{id}: cancel the rental and refund it. 204 on
/// success, 404 on any failure, including a payment cancellation left to the
/// background retry.
#[tracing::instrument(skip(state))]
pub async fn cancel<C, R, P>(
    State(state): State<SharedState<C, R, P>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError>
where
    C: CarClient + 'static,
    R: RentalClient + 'static,
    P: PaymentClient + Clone + 'static,
{
    let rental_uid = parse_rental_uid(&id)?;
    state
        .coordinator
        .cancel_rental(rental_uid)
        .await
        .map_err(ApiError::rental_not_processed)?;
    Ok(StatusCode::NO_CONTENT)
}

fn parse_rental_uid(id: &str) -> Result<RentalUid, ApiError> {
    id.parse()
        .map_err(|e| ApiError::BadRequest(format!("Invalid rental ID format: {e}")))
}

#[cfg(test)]
mod tests {
    use axum::http::Request;

    use super::*;

    async fn extract(request: Request<()>) -> Result<CurrentUser, ApiError> {
        let (mut parts, ()) = request.into_parts();
        CurrentUser::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn test_user_header_is_extracted() {
        let request = Request::builder()
            .header(USER_HEADER, "Test Max")
            .body(())
            .unwrap();
        let CurrentUser(user) = extract(request).await.unwrap();
        assert_eq!(user.as_str(), "Test Max");
    }

    #[tokio::test]
    async fn test_missing_or_blank_user_header_is_rejected() {
        let missing = Request::builder().body(()).unwrap();
        assert!(matches!(extract(missing).await, Err(ApiError::BadRequest(_))));

        let blank = Request::builder()
            .header(USER_HEADER, "  ")
            .body(())
            .unwrap();
        assert!(matches!(extract(blank).await, Err(ApiError::BadRequest(_))));
    }

    #[test]
    fn test_rental_uid_parsing() {
        let uid = RentalUid::new();
        assert_eq!(parse_rental_uid(&uid.to_string()).unwrap(), uid);
        assert!(matches!(
            parse_rental_uid("not-a-uuid"),
            Err(ApiError::BadRequest(_))
        ));
    }
}
