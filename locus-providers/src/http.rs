//! HTTP transport shared by the service clients.
//!
//! Wraps a `reqwest::Client` configured with the session timeout and user
//! agent, and classifies transport failures into [`NetworkError`] so the
//! coordinator can map them to stable failure reasons.

use std::time::Duration;

use locus_core::{LocusResult, NetworkError, NetworkSection};
use reqwest::{Client, RequestBuilder};
use serde::Serialize;

/// Longest slice of an error body kept in a `Status` error message.
const MAX_ERROR_BODY: usize = 256;

pub(crate) fn offline(service: &str, reason: impl Into<String>) -> NetworkError {
    NetworkError::Offline {
        service: service.to_string(),
        reason: reason.into(),
    }
}

pub(crate) fn request_failed(
    service: &str,
    status: u16,
    message: impl Into<String>,
) -> NetworkError {
    NetworkError::Status {
        service: service.to_string(),
        status,
        message: message.into(),
    }
}

/// HTTP client for one remote service.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    service: &'static str,
    timeout: Duration,
}

impl HttpClient {
    /// Build a client for `service` using the session network settings.
    pub fn new(service: &'static str, network: &NetworkSection) -> LocusResult<Self> {
        let timeout = network.request_timeout();
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(network.user_agent.as_str())
            .build()
            .map_err(|e| NetworkError::Transport {
                service: service.to_string(),
                reason: format!("Failed to build HTTP client: {}", e),
            })?;
        Ok(Self {
            client,
            service,
            timeout,
        })
    }

    pub fn service(&self) -> &'static str {
        self.service
    }

    /// GET `url` with query parameters and return the body on 2xx.
    pub async fn get_text(&self, url: &str, query: &[(&str, String)]) -> LocusResult<String> {
        self.send(self.client.get(url).query(query)).await
    }

    /// POST a JSON body to `url` and return the response body on 2xx.
    pub async fn post_json<B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
    ) -> LocusResult<String> {
        self.send(self.client.post(url).json(body)).await
    }

    async fn send(&self, request: RequestBuilder) -> LocusResult<String> {
        let response = request.send().await.map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            let message: String = body.chars().take(MAX_ERROR_BODY).collect();
            return Err(request_failed(self.service, status.as_u16(), message).into());
        }

        let body = response.text().await.map_err(|e| self.classify(e))?;
        Ok(body)
    }

    fn classify(&self, error: reqwest::Error) -> NetworkError {
        if error.is_timeout() {
            NetworkError::Timeout {
                service: self.service.to_string(),
                after: self.timeout,
            }
        } else if error.is_connect() {
            offline(self.service, error.to_string())
        } else {
            NetworkError::Transport {
                service: self.service.to_string(),
                reason: error.to_string(),
            }
        }
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("service", &self.service)
            .field("timeout", &self.timeout)
            .finish()
    }
}
