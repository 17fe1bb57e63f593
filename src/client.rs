//! The job client: submit a document, disambiguate the reply, poll if needed.
//!
//! ## State machine
//!
//! ```text
//! SUBMITTED ──200──▶ COMPLETED
//! SUBMITTED ──202──▶ PENDING ──200──▶ COMPLETED
//!                      │  ▲
//!                      │  └──202 (bounded by max_attempts)
//!                      ├──4xx/5xx──────────▶ FAILED
//!                      ├──attempts exhausted▶ FAILED(timeout)
//!                      └──token cancelled──▶ FAILED(cancelled)
//! SUBMITTED ──other / transport error──▶ FAILED
//! ```
//!
//! Classification is by status code only. Body shape is handled afterwards
//! by the [`Extractor`] for 200 responses.
//!
//! Transport errors are final during submission (there is no handle to
//! retry against) and count as a spent attempt during polling.

use crate::config::{ClientConfig, PollPolicy};
use crate::endpoints::Endpoint;
use crate::error::{JobFailure, Pdf4meError, TransportError};
use crate::extract::Extractor;
use crate::observer::{NoopObserver, SharedObserver};
use crate::outcome::JobOutcome;
use crate::request::JobRequest;
use crate::transport::{HttpTransport, RawResponse, Transport};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Client for one service endpoint.
///
/// Cheap to clone; clones share the transport, observer and extractor.
/// Holds no per-job state, so one client may drive many jobs concurrently.
///
/// # Example
/// ```rust,no_run
/// use pdf4me_jobs::{endpoints, AsyncJobClient, ClientConfig, JobRequest};
///
/// # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
/// let config = ClientConfig::builder().api_key("dXNlcjpzZWNyZXQ=").build()?;
/// let endpoint = endpoints::lookup("CompressPdf")?;
/// let client = AsyncJobClient::for_endpoint(config, endpoint)?;
///
/// let request = JobRequest::from_file("report.pdf")?.param("optimizeProfile", "Web");
/// let (bytes, _kind) = client.run(&request).await.into_result()?;
/// std::fs::write("report.min.pdf", bytes)?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct AsyncJobClient {
    endpoint_url: String,
    authorization: String,
    poll_policy: PollPolicy,
    transport: Arc<dyn Transport>,
    observer: SharedObserver,
    extractor: Arc<Extractor>,
}

impl std::fmt::Debug for AsyncJobClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncJobClient")
            .field("endpoint_url", &self.endpoint_url)
            .field("poll_policy", &self.poll_policy)
            .field("extractor", &self.extractor.strategy_names())
            .finish_non_exhaustive()
    }
}

impl AsyncJobClient {
    /// Create a client for `endpoint`: a path such as `api/v2/Merge`
    /// (joined onto the base URL) or an absolute URL.
    pub fn new(config: ClientConfig, endpoint: &str) -> Result<Self, Pdf4meError> {
        let transport = Arc::new(HttpTransport::new(&config)?);
        Self::with_transport(config, endpoint, transport)
    }

    /// Create a client for a catalog endpoint, adopting its poll defaults.
    pub fn for_endpoint(config: ClientConfig, endpoint: &Endpoint) -> Result<Self, Pdf4meError> {
        Ok(Self::new(config, endpoint.path)?.with_poll_policy(endpoint.poll))
    }

    /// Create a client over a caller-supplied transport.
    pub fn with_transport(
        config: ClientConfig,
        endpoint: &str,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, Pdf4meError> {
        let endpoint_url = resolve_endpoint(&config.base_url, endpoint)?;
        debug!("Job client for {}", endpoint_url);
        Ok(Self {
            endpoint_url,
            authorization: config.authorization(),
            poll_policy: config.poll,
            transport,
            observer: Arc::new(NoopObserver),
            extractor: Arc::new(Extractor::default()),
        })
    }

    pub fn with_observer(mut self, observer: SharedObserver) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_poll_policy(mut self, policy: PollPolicy) -> Self {
        self.poll_policy = policy;
        self
    }

    pub fn with_extractor(mut self, extractor: Extractor) -> Self {
        self.extractor = Arc::new(extractor);
        self
    }

    pub fn endpoint_url(&self) -> &str {
        &self.endpoint_url
    }

    pub fn poll_policy(&self) -> PollPolicy {
        self.poll_policy
    }

    // ── Submission ───────────────────────────────────────────────────────

    /// POST the request and classify the immediate reply.
    ///
    /// Never returns `Err`: transport errors become
    /// [`JobFailure::Transport`], unexpected statuses
    /// [`JobFailure::Protocol`].
    pub async fn submit(&self, request: &JobRequest) -> JobOutcome {
        let url = self.endpoint_url.as_str();
        self.observer.on_submit(url, request.payload().len());
        info!(
            "Submitting '{}' ({} bytes) to {}",
            request.name(),
            request.payload().len(),
            url
        );

        let body = request.to_json();
        let outcome = match self.transport.post_json(url, &self.authorization, &body).await {
            Ok(response) => self.classify_submission(response),
            Err(e) => {
                warn!("Submission to {} failed before a response: {}", url, e);
                JobOutcome::Failed(JobFailure::Transport(e))
            }
        };

        if let JobOutcome::Pending { poll_handle } = &outcome {
            info!("Job accepted; polling handle {}", poll_handle);
            self.observer.on_accepted(poll_handle);
            return outcome;
        }
        self.finish(outcome)
    }

    fn classify_submission(&self, response: RawResponse) -> JobOutcome {
        debug!("Submission answered with HTTP {}", response.status);
        match response.status {
            200 => self.complete(response),
            202 => match response
                .location
                .as_deref()
                .map(str::trim)
                .filter(|l| !l.is_empty())
            {
                Some(location) => match resolve_handle(&self.endpoint_url, location) {
                    Some(poll_handle) => JobOutcome::Pending { poll_handle },
                    None => {
                        warn!("Unusable Location header {:?}", location);
                        JobOutcome::Failed(JobFailure::MissingPollHandle { status: 202 })
                    }
                },
                None => JobOutcome::Failed(JobFailure::MissingPollHandle { status: 202 }),
            },
            status => JobOutcome::Failed(JobFailure::Protocol {
                status,
                body: response.text(),
            }),
        }
    }

    // ── Polling ──────────────────────────────────────────────────────────

    /// Poll `handle` up to `max_attempts` times, `interval` apart.
    ///
    /// Equivalent to [`poll_with_cancel`](Self::poll_with_cancel) with a
    /// token that never fires.
    pub async fn poll(&self, handle: &str, max_attempts: u32, interval: Duration) -> JobOutcome {
        self.poll_with_cancel(handle, max_attempts, interval, &CancellationToken::new())
            .await
    }

    /// Poll `handle` until the job completes, fails, runs out of attempts or
    /// `cancel` fires.
    ///
    /// Per attempt: 200 completes, 202 continues, any other status fails
    /// immediately, and a transport error is logged and the loop moves on to
    /// the next attempt. The token is checked before every GET and raced
    /// against every request and sleep.
    pub async fn poll_with_cancel(
        &self,
        handle: &str,
        max_attempts: u32,
        interval: Duration,
        cancel: &CancellationToken,
    ) -> JobOutcome {
        let start = Instant::now();
        let mut last_transport_error: Option<TransportError> = None;

        for attempt in 1..=max_attempts {
            if cancel.is_cancelled() {
                return self.cancelled(attempt - 1);
            }

            self.observer.on_poll_attempt(handle, attempt, max_attempts);
            debug!("Checking status ({}/{}) at {}", attempt, max_attempts, handle);

            let response = tokio::select! {
                _ = cancel.cancelled() => return self.cancelled(attempt - 1),
                r = self.transport.get(handle, &self.authorization) => r,
            };

            match response {
                Ok(r) if r.status == 200 => return self.finish(self.complete(r)),
                Ok(r) if r.status == 202 => {
                    last_transport_error = None;
                    info!("Still processing ({}/{})", attempt, max_attempts);
                    self.observer.on_still_processing(attempt, max_attempts);
                }
                Ok(r) => {
                    return self.finish(JobOutcome::Failed(JobFailure::Protocol {
                        status: r.status,
                        body: r.text(),
                    }))
                }
                Err(e) => {
                    warn!("Status check {}/{} failed: {}", attempt, max_attempts, e);
                    self.observer.on_transport_retry(attempt, &e);
                    last_transport_error = Some(e);
                }
            }

            if attempt < max_attempts && !interval.is_zero() {
                tokio::select! {
                    _ = cancel.cancelled() => return self.cancelled(attempt),
                    _ = tokio::time::sleep(interval) => {}
                }
            }
        }

        self.finish(JobOutcome::Failed(JobFailure::Timeout {
            attempts: max_attempts,
            elapsed: start.elapsed(),
            last_transport_error,
        }))
    }

    // ── Submit + poll ────────────────────────────────────────────────────

    /// Submit and, if deferred, poll with the client's default policy.
    ///
    /// Never returns [`JobOutcome::Pending`].
    pub async fn run(&self, request: &JobRequest) -> JobOutcome {
        self.run_with(request, self.poll_policy, &CancellationToken::new())
            .await
    }

    /// Submit and, if deferred, poll with an explicit policy and token.
    pub async fn run_with(
        &self,
        request: &JobRequest,
        policy: PollPolicy,
        cancel: &CancellationToken,
    ) -> JobOutcome {
        match self.submit(request).await {
            JobOutcome::Pending { poll_handle } => {
                self.poll_with_cancel(&poll_handle, policy.max_attempts, policy.interval, cancel)
                    .await
            }
            terminal => terminal,
        }
    }

    /// Synchronous wrapper around [`run`](Self::run).
    ///
    /// Creates a temporary tokio runtime internally; must not be called from
    /// inside an async context.
    pub fn run_blocking(&self, request: &JobRequest) -> Result<JobOutcome, Pdf4meError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| Pdf4meError::Internal(format!("Failed to create tokio runtime: {}", e)))?;
        Ok(runtime.block_on(self.run(request)))
    }

    // ── Helpers ──────────────────────────────────────────────────────────

    fn complete(&self, response: RawResponse) -> JobOutcome {
        match self.extractor.extract(
            response.status,
            response.content_type.as_deref(),
            response.body,
        ) {
            Ok((artifact, content_kind)) => JobOutcome::Completed {
                artifact,
                content_kind,
            },
            Err(failure) => JobOutcome::Failed(failure),
        }
    }

    fn cancelled(&self, attempts: u32) -> JobOutcome {
        info!("Polling cancelled after {} attempts", attempts);
        self.finish(JobOutcome::Failed(JobFailure::Cancelled { attempts }))
    }

    /// Report a terminal outcome to logs and the observer.
    fn finish(&self, outcome: JobOutcome) -> JobOutcome {
        match &outcome {
            JobOutcome::Completed {
                artifact,
                content_kind,
            } => {
                info!("Job completed: {} bytes ({})", artifact.len(), content_kind);
                self.observer.on_completed(artifact.len(), *content_kind);
            }
            JobOutcome::Failed(failure) => {
                warn!("Job failed: {}", failure);
                self.observer.on_failed(failure);
            }
            JobOutcome::Pending { .. } => {}
        }
        outcome
    }
}

/// Join an endpoint path onto the base URL, or accept an absolute URL as-is.
pub fn resolve_endpoint(base_url: &str, endpoint: &str) -> Result<String, Pdf4meError> {
    if let Ok(absolute) = reqwest::Url::parse(endpoint) {
        return Ok(absolute.to_string());
    }
    let base = reqwest::Url::parse(base_url).map_err(|e| Pdf4meError::InvalidUrl {
        url: base_url.to_string(),
        reason: e.to_string(),
    })?;
    base.join(endpoint.trim_start_matches('/'))
        .map(|u| u.to_string())
        .map_err(|e| Pdf4meError::InvalidUrl {
            url: endpoint.to_string(),
            reason: e.to_string(),
        })
}

/// Resolve a `Location` header value (absolute or relative) against the
/// URL the request was sent to.
fn resolve_handle(request_url: &str, location: &str) -> Option<String> {
    reqwest::Url::parse(request_url)
        .and_then(|base| base.join(location))
        .ok()
        .map(|u| u.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_endpoint_joins_path() {
        let url = resolve_endpoint("https://api.pdf4me.com/", "/api/v2/Merge").unwrap();
        assert_eq!(url, "https://api.pdf4me.com/api/v2/Merge");
        let url = resolve_endpoint("http://localhost:9000/gw/", "api/v2/Merge").unwrap();
        assert_eq!(url, "http://localhost:9000/gw/api/v2/Merge");
    }

    #[test]
    fn resolve_endpoint_accepts_absolute() {
        let url = resolve_endpoint("https://api.pdf4me.com/", "http://other/x").unwrap();
        assert_eq!(url, "http://other/x");
    }

    #[test]
    fn resolve_handle_absolute_and_relative() {
        assert_eq!(
            resolve_handle("https://api.pdf4me.com/api/v2/Merge", "http://x/job/1").as_deref(),
            Some("http://x/job/1")
        );
        assert_eq!(
            resolve_handle("https://api.pdf4me.com/api/v2/Merge", "/api/v2/Status/abc").as_deref(),
            Some("https://api.pdf4me.com/api/v2/Status/abc")
        );
    }

    #[test]
    fn debug_does_not_leak_authorization() {
        let config = ClientConfig::builder().api_key("s3cr3t").build().unwrap();
        let client = AsyncJobClient::new(config, "api/v2/Merge").unwrap();
        let dbg = format!("{client:?}");
        assert!(!dbg.contains("s3cr3t"));
        assert!(dbg.contains("api/v2/Merge"));
    }
}
