//! Rental service client.

use std::time::Duration;

use async_trait::async_trait;
use common::{CarUid, RentalUid, Username};
use domain::{NewRental, Rental};
use reqwest::Url;
use serde::Deserialize;

use crate::error::{Backend, ClientError};
use crate::http::HttpBackend;

/// Operations offered by the rental service.
#[async_trait]
pub trait RentalClient: Send + Sync {
    /// All rentals belonging to a user.
    async fn get_user_rentals(&self, username: &Username) -> Result<Vec<Rental>, ClientError>;

    /// A single rental, scoped to its owner.
    async fn get_rental(
        &self,
        username: &Username,
        rental_uid: RentalUid,
    ) -> Result<Rental, ClientError>;

    /// Opens a rental and returns its identifier.
    async fn create_rental(&self, rental: NewRental) -> Result<RentalUid, ClientError>;

    /// Marks a rental finished and returns the car it was for.
    async fn finish_rental(&self, rental_uid: RentalUid) -> Result<CarUid, ClientError>;

    /// Marks a rental canceled and returns the updated record.
    async fn cancel_rental(&self, rental_uid: RentalUid) -> Result<Rental, ClientError>;
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RentalCreated {
    rental_uid: RentalUid,
}

/// Rental service client over HTTP.
#[derive(Debug, Clone)]
pub struct HttpRentalClient {
    backend: HttpBackend,
}

impl HttpRentalClient {
    /// Creates a client for the rental service rooted at `base`.
    ///
    /// # Errors
    ///
    /// Returns an error when `base` cannot carry a path or the reqwest client
    /// cannot be constructed.
    pub fn new(base: Url, timeout: Duration) -> Result<Self, ClientError> {
        Ok(Self {
            backend: HttpBackend::new(Backend::Rental, base, timeout)?,
        })
    }
}

#[async_trait]
impl RentalClient for HttpRentalClient {
    #[tracing::instrument(skip(self))]
    async fn get_user_rentals(&self, username: &Username) -> Result<Vec<Rental>, ClientError> {
        let url = self.backend.url(&["rentals"])?;
        let request = self
            .backend
            .client()
            .get(url)
            .query(&[("user", username.as_str())]);
        self.backend
            .fetch(request, &format!("rentals of {username}"))
            .await
    }

    #[tracing::instrument(skip(self))]
    async fn get_rental(
        &self,
        username: &Username,
        rental_uid: RentalUid,
    ) -> Result<Rental, ClientError> {
        let id = rental_uid.to_string();
        let url = self.backend.url(&["rentals", &id])?;
        let request = self
            .backend
            .client()
            .get(url)
            .query(&[("user", username.as_str())]);
        self.backend.fetch(request, &format!("rental {id}")).await
    }

    #[tracing::instrument(skip(self, rental), fields(car_uid = %rental.car_uid, payment_uid = %rental.payment_uid))]
    async fn create_rental(&self, rental: NewRental) -> Result<RentalUid, ClientError> {
        let url = self.backend.url(&["rentals"])?;
        let created: RentalCreated = self
            .backend
            .fetch(self.backend.client().post(url).json(&rental), "rentals")
            .await?;
        Ok(created.rental_uid)
    }

    #[tracing::instrument(skip(self))]
    async fn finish_rental(&self, rental_uid: RentalUid) -> Result<CarUid, ClientError> {
        let id = rental_uid.to_string();
        let url = self.backend.url(&["rentals", &id, "finish"])?;
        let rental: Rental = self
            .backend
            .fetch(self.backend.client().post(url), &format!("rental {id}"))
            .await?;
        Ok(rental.car_uid)
    }

    #[tracing::instrument(skip(self))]
    async fn cancel_rental(&self, rental_uid: RentalUid) -> Result<Rental, ClientError> {
        let id = rental_uid.to_string();
        let url = self.backend.url(&["rentals", &id])?;
        self.backend
            .fetch(self.backend.client().delete(url), &format!("rental {id}"))
            .await
    }
}
