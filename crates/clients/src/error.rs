//! Client error types.

use thiserror::Error;

/// The backend a request was sent to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    Car,
    Rental,
    Payment,
}

impl Backend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Car => "car",
            Backend::Rental => "rental",
            Backend::Payment => "payment",
        }
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors returned by backend clients.
#[derive(Debug, Clone, Error)]
pub enum ClientError {
    /// The payment service answered 503.
    #[error("Payment service unavailable")]
    PaymentUnavailable,

    /// The backend does not know the requested resource.
    #[error("{service} service: {resource} not found")]
    NotFound { service: Backend, resource: String },

    /// Connection failure, timeout or unexpected status.
    #[error("{service} service request failed: {reason}")]
    Remote { service: Backend, reason: String },

    /// A successful response whose body could not be decoded.
    #[error("{service} service returned an unreadable body: {reason}")]
    Decode { service: Backend, reason: String },

    /// The configured base URL cannot be used to build request URLs.
    #[error("Invalid {service} service URL: {reason}")]
    InvalidUrl { service: Backend, reason: String },
}

impl ClientError {
    pub fn remote(service: Backend, reason: impl Into<String>) -> Self {
        ClientError::Remote {
            service,
            reason: reason.into(),
        }
    }

    pub fn not_found(service: Backend, resource: impl Into<String>) -> Self {
        ClientError::NotFound {
            service,
            resource: resource.into(),
        }
    }

    /// Returns true for the payment-specific 503 classification.
    pub fn is_payment_unavailable(&self) -> bool {
        matches!(self, ClientError::PaymentUnavailable)
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::NotFound { .. })
    }

    /// The backend this error came from.
    pub fn service(&self) -> Backend {
        match self {
            ClientError::PaymentUnavailable => Backend::Payment,
            ClientError::NotFound { service, .. }
            | ClientError::Remote { service, .. }
            | ClientError::Decode { service, .. }
            | ClientError::InvalidUrl { service, .. } => *service,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_backend() {
        let err = ClientError::remote(Backend::Car, "timed out");
        assert_eq!(err.to_string(), "car service request failed: timed out");
        assert_eq!(err.service(), Backend::Car);

        let err = ClientError::not_found(Backend::Rental, "rental 42");
        assert_eq!(err.to_string(), "rental service: rental 42 not found");
        assert!(err.is_not_found());
    }

    #[test]
    fn payment_unavailable_is_distinct() {
        assert!(ClientError::PaymentUnavailable.is_payment_unavailable());
        assert_eq!(ClientError::PaymentUnavailable.service(), Backend::Payment);
        assert!(!ClientError::remote(Backend::Payment, "boom").is_payment_unavailable());
    }
}
