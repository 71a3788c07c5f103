//! Car service client.

use std::time::Duration;

use async_trait::async_trait;
use common::CarUid;
use domain::{Car, CarsPage, CarsQuery, ReservedCar};
use reqwest::Url;

use crate::error::{Backend, ClientError};
use crate::http::HttpBackend;

/// Operations offered by the car service.
#[async_trait]
pub trait CarClient: Send + Sync {
    /// Marks the car as reserved and returns its daily price.
    async fn reserve_car(&self, car_uid: CarUid) -> Result<ReservedCar, ClientError>;

    /// Makes a reserved car available again.
    async fn release_car(&self, car_uid: CarUid) -> Result<(), ClientError>;

    /// Loads a single car.
    async fn get_car(&self, car_uid: CarUid) -> Result<Car, ClientError>;

    /// Lists cars one page at a time.
    async fn list_cars(&self, query: CarsQuery) -> Result<CarsPage, ClientError>;
}

/// Car service client over HTTP.
#[derive(Debug, Clone)]
pub struct HttpCarClient {
    backend: HttpBackend,
}

impl HttpCarClient {
    /// Creates a client for the car service rooted at `base`.
    ///
    /// # Errors
    ///
    /// Returns an error when `base` cannot carry a path or the reqwest client
    /// cannot be constructed.
    pub fn new(base: Url, timeout: Duration) -> Result<Self, ClientError> {
        Ok(Self {
            backend: HttpBackend::new(Backend::Car, base, timeout)?,
        })
    }
}

#[async_trait]
impl CarClient for HttpCarClient {
    #[tracing::instrument(skip(self))]
    async fn reserve_car(&self, car_uid: CarUid) -> Result<ReservedCar, ClientError> {
        let id = car_uid.to_string();
        let url = self.backend.url(&["cars", &id, "reserve"])?;
        self.backend
            .fetch(self.backend.client().post(url), &format!("car {id}"))
            .await
    }

    #[tracing::instrument(skip(self))]
    async fn release_car(&self, car_uid: CarUid) -> Result<(), ClientError> {
        let id = car_uid.to_string();
        let url = self.backend.url(&["cars", &id, "release"])?;
        self.backend
            .send(self.backend.client().post(url), &format!("car {id}"))
            .await?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn get_car(&self, car_uid: CarUid) -> Result<Car, ClientError> {
        let id = car_uid.to_string();
        let url = self.backend.url(&["cars", &id])?;
        self.backend
            .fetch(self.backend.client().get(url), &format!("car {id}"))
            .await
    }

    #[tracing::instrument(skip(self))]
    async fn list_cars(&self, query: CarsQuery) -> Result<CarsPage, ClientError> {
        let url = self.backend.url(&["cars"])?;
        let request = self.backend.client().get(url).query(&[
            ("page", query.page.to_string()),
            ("size", query.size.to_string()),
            ("showAll", query.show_all.to_string()),
        ]);
        self.backend.fetch(request, "cars").await
    }
}
