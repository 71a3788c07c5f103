//! Payment service client.

use std::time::Duration;

use async_trait::async_trait;
use common::PaymentUid;
use domain::{Money, Payment, PaymentStatus};
use reqwest::Url;
use serde::Serialize;

use crate::error::{Backend, ClientError};
use crate::http::HttpBackend;

/// Operations offered by the payment service.
#[async_trait]
pub trait PaymentClient: Send + Sync {
    /// Loads a payment.
    async fn get_payment(&self, payment_uid: PaymentUid) -> Result<Payment, ClientError>;

    /// Charges `price` and returns the new payment's identifier.
    ///
    /// Implementations mint the identifier before contacting the service, so
    /// a caller that sees a timeout still knows which payment it may have
    /// created.
    async fn create_payment(&self, price: Money) -> Result<PaymentUid, ClientError>;

    /// Cancels a payment.
    async fn cancel_payment(&self, payment_uid: PaymentUid) -> Result<(), ClientError>;
}

#[derive(Serialize)]
struct StatusUpdate {
    status: PaymentStatus,
}

/// Payment service client over HTTP.
#[derive(Debug, Clone)]
pub struct HttpPaymentClient {
    backend: HttpBackend,
}

impl HttpPaymentClient {
    /// Creates a client for the payment service rooted at `base`.
    ///
    /// # Errors
    ///
    /// Returns an error when `base` cannot carry a path or the reqwest client
    /// cannot be constructed.
    pub fn new(base: Url, timeout: Duration) -> Result<Self, ClientError> {
        Ok(Self {
            backend: HttpBackend::new(Backend::Payment, base, timeout)?,
        })
    }
}

#[async_trait]
impl PaymentClient for HttpPaymentClient {
    #[tracing::instrument(skip(self))]
    async fn get_payment(&self, payment_uid: PaymentUid) -> Result<Payment, ClientError> {
        let id = payment_uid.to_string();
        let url = self.backend.url(&["payments", &id])?;
        self.backend
            .fetch(self.backend.client().get(url), &format!("payment {id}"))
            .await
    }

    #[tracing::instrument(skip(self))]
    async fn create_payment(&self, price: Money) -> Result<PaymentUid, ClientError> {
        let payment = Payment::paid(PaymentUid::new(), price);
        let url = self.backend.url(&["payments"])?;
        self.backend
            .send(self.backend.client().post(url).json(&payment), "payments")
            .await?;
        Ok(payment.payment_uid)
    }

    #[tracing::instrument(skip(self))]
    async fn cancel_payment(&self, payment_uid: PaymentUid) -> Result<(), ClientError> {
        let id = payment_uid.to_string();
        let url = self.backend.url(&["payments", &id])?;
        let update = StatusUpdate {
            status: PaymentStatus::Canceled,
        };
        self.backend
            .send(
                self.backend.client().patch(url).json(&update),
                &format!("payment {id}"),
            )
            .await?;
        Ok(())
    }
}
