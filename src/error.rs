//! Error types for the pdf4me-jobs library.
//!
//! Three error types cover three distinct failure modes:
//!
//! * [`Pdf4meError`] (**fatal, caller-side**): the job cannot even be
//!   submitted (input file missing, empty payload, invalid configuration) or
//!   its result cannot be stored. Returned as `Err(Pdf4meError)`.
//!
//! * [`JobFailure`] (**terminal job outcome**): the remote service rejected
//!   the request, the job timed out, the response could not be decoded, etc.
//!   Carried inside [`crate::outcome::JobOutcome::Failed`] as a value so
//!   callers must branch on it explicitly.
//!
//! * [`TransportError`]: a single HTTP exchange failed before any status
//!   was known. Returned by [`crate::transport::Transport`] implementations;
//!   the client turns it into a [`JobFailure::Transport`] during submission
//!   and into a retry during polling.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// All fatal errors returned by the pdf4me-jobs library.
///
/// Remote job failures use [`JobFailure`] and are returned inside
/// [`crate::outcome::JobOutcome`] rather than propagated here.
#[derive(Debug, Error)]
pub enum Pdf4meError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Input file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file could be opened but reading it failed.
    #[error("Failed to read '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The request payload has no bytes; the service always expects a document.
    #[error("Payload for '{name}' is empty; the service requires a non-empty document")]
    EmptyPayload { name: String },

    /// Endpoint name is not in the catalog and is not a path or URL either.
    #[error("Unknown endpoint '{name}'\nRun `pdf4me --list-endpoints` to see the catalog.")]
    UnknownEndpoint { name: String },

    // ── Client errors ─────────────────────────────────────────────────────
    /// The HTTP client could not be constructed (TLS backend, proxy settings).
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),

    /// A URL could not be parsed or joined.
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A failed HTTP exchange with no status code.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// TCP connect, DNS resolution or TLS handshake failed.
    #[error("connection failed: {0}")]
    Connect(String),

    /// The per-request timeout elapsed.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// Any other failure while sending or reading the response body.
    #[error("request failed: {0}")]
    Other(String),
}

/// The terminal failure of a job, carried by
/// [`crate::outcome::JobOutcome::Failed`].
///
/// The `Display` output always includes the HTTP status (when one exists)
/// and a short classification, e.g.
/// `HTTP 401 (bad request or credentials): Unauthorized`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum JobFailure {
    /// The request never got an HTTP status (connection refused, DNS, TLS).
    #[error("network unreachable: {0}")]
    Transport(#[source] TransportError),

    /// The service answered with a status outside {200, 202}.
    #[error("HTTP {status} ({}): {body}", classify_status(*status))]
    Protocol { status: u16, body: String },

    /// A 202 arrived without a `Location` header to poll.
    #[error("HTTP {status} (missing poll handle): job accepted but no Location header was returned")]
    MissingPollHandle { status: u16 },

    /// Every poll attempt reported the job as still running.
    #[error(
        "timeout (still processing): job not finished after {attempts} poll attempts over {elapsed:?}; \
         it may still complete server-side{}",
        last_transport_error.as_ref().map(|e| format!(" (last poll error: {e})")).unwrap_or_default()
    )]
    Timeout {
        attempts: u32,
        elapsed: Duration,
        last_transport_error: Option<TransportError>,
    },

    /// A 200 response could not be turned into artifact bytes.
    #[error("HTTP {status} (undecodable result): {reason}")]
    Decode {
        status: u16,
        reason: String,
        /// Raw response body, kept for diagnosis.
        raw: String,
    },

    /// The caller's cancellation token fired while polling.
    #[error("cancelled after {attempts} poll attempts")]
    Cancelled { attempts: u32 },

    /// A result was requested from a job that was accepted but never polled.
    #[error("not polled (still pending): job accepted at {poll_handle} but its result was requested before polling")]
    NotPolled { poll_handle: String },
}

impl JobFailure {
    /// The failure reported when a `Pending` outcome is used as if it were
    /// final.
    pub fn still_pending(poll_handle: &str) -> Self {
        JobFailure::NotPolled {
            poll_handle: poll_handle.to_string(),
        }
    }

    /// HTTP status associated with the failure, if the server sent one.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            JobFailure::Protocol { status, .. }
            | JobFailure::MissingPollHandle { status }
            | JobFailure::Decode { status, .. } => Some(*status),
            JobFailure::Transport(_)
            | JobFailure::Timeout { .. }
            | JobFailure::Cancelled { .. }
            | JobFailure::NotPolled { .. } => None,
        }
    }

    /// True when polling ran out of attempts while the job was still pending.
    pub fn is_timeout(&self) -> bool {
        matches!(self, JobFailure::Timeout { .. })
    }

    /// True when the failure came from the caller's cancellation token.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, JobFailure::Cancelled { .. })
    }

    /// Short machine-friendly label for logs and JSON output.
    pub fn kind(&self) -> &'static str {
        match self {
            JobFailure::Transport(_) => "transport",
            JobFailure::Protocol { .. } => "protocol",
            JobFailure::MissingPollHandle { .. } => "missing_poll_handle",
            JobFailure::Timeout { .. } => "timeout",
            JobFailure::Decode { .. } => "decode",
            JobFailure::Cancelled { .. } => "cancelled",
            JobFailure::NotPolled { .. } => "not_polled",
        }
    }
}

/// Human classification of an unexpected HTTP status.
pub fn classify_status(status: u16) -> &'static str {
    match status {
        400..=499 => "bad request or credentials",
        500..=599 => "server error",
        _ => "unexpected status",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protocol_display_includes_status_and_class() {
        let f = JobFailure::Protocol {
            status: 401,
            body: "Unauthorized".into(),
        };
        let msg = f.to_string();
        assert!(msg.contains("401"), "got: {msg}");
        assert!(msg.contains("credentials"), "got: {msg}");
        assert!(msg.contains("Unauthorized"), "got: {msg}");
        assert_eq!(f.http_status(), Some(401));
    }

    #[test]
    fn server_error_classification() {
        let f = JobFailure::Protocol {
            status: 503,
            body: String::new(),
        };
        assert!(f.to_string().contains("server error"));
    }

    #[test]
    fn timeout_is_distinguishable() {
        let f = JobFailure::Timeout {
            attempts: 5,
            elapsed: Duration::from_secs(50),
            last_transport_error: None,
        };
        assert!(f.is_timeout());
        assert!(f.to_string().contains("timeout"));
        assert_eq!(f.http_status(), None);
        assert_eq!(f.kind(), "timeout");
    }

    #[test]
    fn timeout_mentions_last_transport_error() {
        let f = JobFailure::Timeout {
            attempts: 3,
            elapsed: Duration::from_secs(3),
            last_transport_error: Some(TransportError::Connect("refused".into())),
        };
        assert!(f.to_string().contains("refused"), "got: {f}");
    }

    #[test]
    fn missing_poll_handle_display() {
        let f = JobFailure::MissingPollHandle { status: 202 };
        let msg = f.to_string();
        assert!(msg.contains("missing poll handle"), "got: {msg}");
        assert_eq!(f.http_status(), Some(202));
    }

    #[test]
    fn transport_display_says_network() {
        let f = JobFailure::Transport(TransportError::Connect("connection refused".into()));
        assert!(f.to_string().contains("network unreachable"));
        assert_eq!(f.http_status(), None);
    }

    #[test]
    fn cancelled_display() {
        let f = JobFailure::Cancelled { attempts: 2 };
        assert!(f.is_cancelled());
        assert!(f.to_string().contains("cancelled"));
    }

    #[test]
    fn unpolled_job_is_not_a_server_reply() {
        let f = JobFailure::still_pending("http://x/job/1");
        let msg = f.to_string();
        assert!(msg.contains("not polled"), "got: {msg}");
        assert!(msg.contains("http://x/job/1"), "got: {msg}");
        assert!(!msg.contains("unexpected status"), "got: {msg}");
        assert_eq!(f.http_status(), None);
        assert_eq!(f.kind(), "not_polled");
    }

    #[test]
    fn empty_payload_display() {
        let e = Pdf4meError::EmptyPayload {
            name: "a.pdf".into(),
        };
        assert!(e.to_string().contains("a.pdf"));
    }
}
