//! Configuration types for the job client.
//!
//! Everything the client needs to talk to the service lives in
//! [`ClientConfig`], built via [`ClientConfigBuilder`]. Polling cadence is a
//! separate [`PollPolicy`] value because it varies per endpoint while the
//! connection settings do not.

use crate::error::Pdf4meError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Production API root used when no base URL is configured.
pub const DEFAULT_BASE_URL: &str = "https://api.pdf4me.com/";

/// Bounded, fixed-interval polling cadence for one deferred job.
///
/// The worst-case wall-clock wait is `max_attempts * interval` plus the time
/// spent in the requests themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollPolicy {
    /// Maximum number of status GETs before giving up with a timeout. Default: 10.
    pub max_attempts: u32,

    /// Delay between consecutive GETs. Default: 10 s.
    #[serde(with = "duration_secs")]
    pub interval: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            interval: Duration::from_secs(10),
        }
    }
}

impl PollPolicy {
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts,
            interval,
        }
    }

    /// Upper bound on time spent sleeping between attempts. Saturates at
    /// `Duration::MAX`.
    pub fn max_wait(&self) -> Duration {
        self.interval.saturating_mul(self.max_attempts)
    }
}

/// Connection settings for [`crate::client::AsyncJobClient`].
///
/// Built via [`ClientConfig::builder()`].
///
/// # Example
/// ```rust
/// use pdf4me_jobs::ClientConfig;
/// use std::time::Duration;
///
/// let config = ClientConfig::builder()
///     .api_key("dXNlcjpzZWNyZXQ=")
///     .request_timeout(Duration::from_secs(45))
///     .build()
///     .unwrap();
/// assert_eq!(config.base_url, "https://api.pdf4me.com/");
/// ```
#[derive(Clone)]
pub struct ClientConfig {
    /// API root that endpoint paths are joined onto. Default: [`DEFAULT_BASE_URL`].
    pub base_url: String,

    /// Credential sent verbatim as `Authorization: Basic <api_key>`.
    pub api_key: String,

    /// Per-request timeout, independent of the polling cadence. Default: 60 s.
    ///
    /// A hung connection must not stall the attempt counter, so every POST
    /// and GET is bounded by this value.
    pub request_timeout: Duration,

    /// TCP/TLS connect timeout. Default: 30 s.
    pub connect_timeout: Duration,

    /// `User-Agent` header value.
    pub user_agent: String,

    /// Skip TLS certificate verification. Default: false.
    ///
    /// Only meant for local gateways with self-signed certificates.
    pub accept_invalid_certs: bool,

    /// Polling cadence used when the caller does not supply one.
    pub poll: PollPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: String::new(),
            request_timeout: Duration::from_secs(60),
            connect_timeout: Duration::from_secs(30),
            user_agent: concat!("pdf4me-jobs/", env!("CARGO_PKG_VERSION")).to_string(),
            accept_invalid_certs: false,
            poll: PollPolicy::default(),
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field(
                "api_key",
                &if self.api_key.is_empty() {
                    "<unset>"
                } else {
                    "<redacted>"
                },
            )
            .field("request_timeout", &self.request_timeout)
            .field("connect_timeout", &self.connect_timeout)
            .field("user_agent", &self.user_agent)
            .field("accept_invalid_certs", &self.accept_invalid_certs)
            .field("poll", &self.poll)
            .finish()
    }
}

impl ClientConfig {
    /// Create a new builder for `ClientConfig`.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder {
            config: Self::default(),
        }
    }

    /// Value of the `Authorization` header.
    pub fn authorization(&self) -> String {
        format!("Basic {}", self.api_key)
    }
}

/// Builder for [`ClientConfig`].
#[derive(Debug)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = key.into();
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.config.user_agent = ua.into();
        self
    }

    pub fn accept_invalid_certs(mut self, v: bool) -> Self {
        self.config.accept_invalid_certs = v;
        self
    }

    pub fn poll(mut self, policy: PollPolicy) -> Self {
        self.config.poll = policy;
        self
    }

    pub fn max_attempts(mut self, n: u32) -> Self {
        self.config.poll.max_attempts = n;
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll.interval = interval;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(mut self) -> Result<ClientConfig, Pdf4meError> {
        let c = &mut self.config;
        c.api_key = c.api_key.trim().to_string();
        if c.api_key.is_empty() {
            return Err(Pdf4meError::InvalidConfig(
                "API key must not be empty".into(),
            ));
        }
        if reqwest::Url::parse(&c.base_url).is_err() {
            return Err(Pdf4meError::InvalidConfig(format!(
                "base URL is not an absolute URL: '{}'",
                c.base_url
            )));
        }
        // Url::join drops the last path segment unless the base ends in '/'.
        if !c.base_url.ends_with('/') {
            c.base_url.push('/');
        }
        if c.poll.max_attempts == 0 {
            return Err(Pdf4meError::InvalidConfig(
                "max attempts must be ≥ 1".into(),
            ));
        }
        if c.request_timeout.is_zero() {
            return Err(Pdf4meError::InvalidConfig(
                "request timeout must be > 0".into(),
            ));
        }
        Ok(self.config)
    }
}

/// Serialise a `Duration` as (fractional) seconds.
mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Duration::try_from_secs_f64(secs).map_err(|e| {
            serde::de::Error::custom(format!("interval must be a non-negative number of seconds: {e}"))
        })
    }
}
