//! Observer trait for job lifecycle events.
//!
//! Inject an [`Arc<dyn JobObserver>`] via
//! [`crate::client::AsyncJobClient::with_observer`] to receive events as a
//! job is submitted and polled. The client itself only logs through
//! `tracing`; anything user-facing (spinners, status lines, metrics) hangs
//! off this trait instead.
//!
//! # Example
//!
//! ```rust
//! use pdf4me_jobs::JobObserver;
//! use std::sync::atomic::{AtomicU32, Ordering};
//!
//! #[derive(Default)]
//! struct CountingObserver {
//!     polls: AtomicU32,
//! }
//!
//! impl JobObserver for CountingObserver {
//!     fn on_poll_attempt(&self, _handle: &str, attempt: u32, max_attempts: u32) {
//!         self.polls.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("checking status {attempt}/{max_attempts}");
//!     }
//! }
//! ```

use crate::error::{JobFailure, TransportError};
use crate::outcome::ContentKind;
use std::sync::Arc;

/// Called by the client as a job moves through its states.
///
/// Implementations must be `Send + Sync` (one client may drive many jobs
/// concurrently). All methods have default no-op implementations so callers
/// only override what they care about.
pub trait JobObserver: Send + Sync {
    /// Called just before the submission POST is sent.
    ///
    /// # Arguments
    /// * `url`: endpoint URL
    /// * `payload_len`: size of the raw document in bytes
    fn on_submit(&self, url: &str, payload_len: usize) {
        let _ = (url, payload_len);
    }

    /// Called when the service accepted the job for deferred completion.
    fn on_accepted(&self, poll_handle: &str) {
        let _ = poll_handle;
    }

    /// Called just before each status GET.
    ///
    /// # Arguments
    /// * `attempt`: 1-indexed attempt number
    /// * `max_attempts`: configured bound
    fn on_poll_attempt(&self, handle: &str, attempt: u32, max_attempts: u32) {
        let _ = (handle, attempt, max_attempts);
    }

    /// Called when a status GET reported the job as still running.
    fn on_still_processing(&self, attempt: u32, max_attempts: u32) {
        let _ = (attempt, max_attempts);
    }

    /// Called when a status GET failed at the transport level and polling
    /// will continue.
    fn on_transport_retry(&self, attempt: u32, error: &TransportError) {
        let _ = (attempt, error);
    }

    /// Called once when the job produced its artifact.
    fn on_completed(&self, artifact_len: usize, content_kind: ContentKind) {
        let _ = (artifact_len, content_kind);
    }

    /// Called once when the job ended in a failure.
    fn on_failed(&self, failure: &JobFailure) {
        let _ = failure;
    }
}

/// A no-op observer; the default when none is configured.
pub struct NoopObserver;

impl JobObserver for NoopObserver {}

/// Convenience alias for the type stored in the client.
pub type SharedObserver = Arc<dyn JobObserver>;
