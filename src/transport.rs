//! HTTP transport seam.
//!
//! [`AsyncJobClient`](crate::client::AsyncJobClient) speaks only two verbs:
//! a JSON POST to submit and a bodiless GET to poll. Both go through the
//! [`Transport`] trait so the state machine can be driven by a scripted
//! double in tests. [`HttpTransport`] is the production implementation on
//! top of `reqwest`.

use crate::config::ClientConfig;
use crate::error::{Pdf4meError, TransportError};
use async_trait::async_trait;
use reqwest::header::{HeaderName, AUTHORIZATION, CONTENT_TYPE, LOCATION};
use std::time::Duration;
use tracing::debug;

/// The parts of an HTTP response the client looks at.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub location: Option<String>,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
            ..Default::default()
        }
    }

    pub fn with_content_type(mut self, ct: impl Into<String>) -> Self {
        self.content_type = Some(ct.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Body decoded as (lossy) UTF-8, for error messages.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// One HTTP exchange per call; implementations must not retry on their own.
#[async_trait]
pub trait Transport: Send + Sync {
    /// `POST url` with a JSON body and the given `Authorization` header.
    async fn post_json(
        &self,
        url: &str,
        authorization: &str,
        body: &serde_json::Value,
    ) -> Result<RawResponse, TransportError>;

    /// `GET url` with the given `Authorization` header and no body.
    async fn get(&self, url: &str, authorization: &str) -> Result<RawResponse, TransportError>;
}

/// `reqwest`-backed transport with per-request and connect timeouts.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    request_timeout: Duration,
}

impl HttpTransport {
    /// Build a transport from the client configuration.
    ///
    /// Redirects are not followed: a 202 `Location` is a poll handle, not a
    /// redirect target, and must reach the client untouched.
    pub fn new(config: &ClientConfig) -> Result<Self, Pdf4meError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(config.user_agent.clone())
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| Pdf4meError::HttpClient(e.to_string()))?;

        Ok(Self {
            client,
            request_timeout: config.request_timeout,
        })
    }

    fn map_error(&self, e: reqwest::Error) -> TransportError {
        if e.is_timeout() {
            TransportError::Timeout(self.request_timeout)
        } else if e.is_connect() {
            TransportError::Connect(e.to_string())
        } else {
            TransportError::Other(e.to_string())
        }
    }

    async fn read(&self, response: reqwest::Response) -> Result<RawResponse, TransportError> {
        let status = response.status().as_u16();
        let header = |name: HeaderName| {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        let content_type = header(CONTENT_TYPE);
        let location = header(LOCATION);

        let body = response.bytes().await.map_err(|e| self.map_error(e))?.to_vec();
        debug!(
            "HTTP {} ({} bytes, content-type {:?})",
            status,
            body.len(),
            content_type
        );

        Ok(RawResponse {
            status,
            content_type,
            location,
            body,
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post_json(
        &self,
        url: &str,
        authorization: &str,
        body: &serde_json::Value,
    ) -> Result<RawResponse, TransportError> {
        let response = self
            .client
            .post(url)
            .header(AUTHORIZATION, authorization)
            .header(CONTENT_TYPE, "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| self.map_error(e))?;
        self.read(response).await
    }

    async fn get(&self, url: &str, authorization: &str) -> Result<RawResponse, TransportError> {
        let response = self
            .client
            .get(url)
            .header(AUTHORIZATION, authorization)
            .send()
            .await
            .map_err(|e| self.map_error(e))?;
        self.read(response).await
    }
}
