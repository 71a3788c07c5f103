//! Transport plumbing shared by the reqwest-backed clients: URL building,
//! timeout, HTTP status classification and JSON decoding.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;

use crate::error::{Backend, ClientError};

/// Per-call timeout applied to every backend request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

const BODY_PREVIEW_LIMIT: usize = 256;

#[derive(Debug, Clone)]
pub(crate) struct HttpBackend {
    service: Backend,
    client: Client,
    base: Url,
}

impl HttpBackend {
    pub(crate) fn new(service: Backend, base: Url, timeout: Duration) -> Result<Self, ClientError> {
        if base.cannot_be_a_base() {
            return Err(ClientError::InvalidUrl {
                service,
                reason: format!("{base} cannot be used as a base URL"),
            });
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::remote(service, e.to_string()))?;
        Ok(Self {
            service,
            client,
            base,
        })
    }

    pub(crate) fn client(&self) -> &Client {
        &self.client
    }

    /// Appends path segments to the base URL, percent-encoding each one.
    pub(crate) fn url(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| ClientError::InvalidUrl {
                service: self.service,
                reason: format!("{} cannot be used as a base URL", self.base),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Sends the request and classifies the response status.
    ///
    /// `resource` names what was asked for, for not-found messages.
    pub(crate) async fn send(
        &self,
        request: RequestBuilder,
        resource: &str,
    ) -> Result<Response, ClientError> {
        let response = request.send().await.map_err(|e| self.transport_error(e))?;
        let status = response.status();
        tracing::debug!(service = %self.service, %status, resource, "backend responded");

        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::SERVICE_UNAVAILABLE && self.service == Backend::Payment {
            return Err(ClientError::PaymentUnavailable);
        }
        if status == StatusCode::NOT_FOUND {
            return Err(ClientError::not_found(self.service, resource));
        }

        let body = response.bytes().await.unwrap_or_default();
        Err(ClientError::remote(
            self.service,
            format!("unexpected status {status}: {}", body_preview(&body)),
        ))
    }

    /// Sends the request and decodes a JSON body.
    pub(crate) async fn fetch<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        resource: &str,
    ) -> Result<T, ClientError> {
        let response = self.send(request, resource).await?;
        let body = response.bytes().await.map_err(|e| self.transport_error(e))?;
        serde_json::from_slice(&body).map_err(|e| ClientError::Decode {
            service: self.service,
            reason: e.to_string(),
        })
    }

    fn transport_error(&self, error: reqwest::Error) -> ClientError {
        let reason = if error.is_timeout() {
            "request timed out".to_string()
        } else if error.is_connect() {
            format!("connection failed: {error}")
        } else {
            error.to_string()
        };
        ClientError::remote(self.service, reason)
    }
}

fn body_preview(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    let trimmed = text.trim();
    if trimmed.len() <= BODY_PREVIEW_LIMIT {
        return trimmed.to_string();
    }
    let cut = (0..=BODY_PREVIEW_LIMIT)
        .rev()
        .find(|i| trimmed.is_char_boundary(*i))
        .unwrap_or(0);
    format!("{}...", &trimmed[..cut])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend(base: &str) -> HttpBackend {
        HttpBackend::new(Backend::Car, Url::parse(base).unwrap(), DEFAULT_TIMEOUT).unwrap()
    }

    #[test]
    fn url_appends_segments_to_base_path() {
        let b = backend("http://localhost:8070/api/v1");
        let url = b.url(&["cars", "abc", "reserve"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8070/api/v1/cars/abc/reserve");
    }

    #[test]
    fn url_tolerates_trailing_slash() {
        let b = backend("http://localhost:8070/api/v1/");
        let url = b.url(&["cars"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8070/api/v1/cars");
    }

    #[test]
    fn rejects_non_base_urls() {
        let result = HttpBackend::new(
            Backend::Payment,
            Url::parse("mailto:ops@example.com").unwrap(),
            DEFAULT_TIMEOUT,
        );
        assert!(matches!(result, Err(ClientError::InvalidUrl { .. })));
    }

    #[test]
    fn body_preview_truncates_long_bodies() {
        let long = "x".repeat(1000);
        let preview = body_preview(long.as_bytes());
        assert!(preview.ends_with("..."));
        assert_eq!(preview.len(), BODY_PREVIEW_LIMIT + 3);
        assert_eq!(body_preview(b"  short  "), "short");
    }
}
