//! The result of a submit or poll call.

use crate::error::JobFailure;
use crate::extract::{self, OutputDocument};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How the artifact bytes should be interpreted by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    /// Opaque bytes: a raw binary body, or bytes decoded from a base64 field.
    Binary,
    /// A JSON document with no recognised base64 wrapper.
    Json,
    /// A `text/*` body.
    Text,
}

impl ContentKind {
    /// Classify a `Content-Type` header value.
    ///
    /// Anything that is neither JSON nor `text/*` (including a missing
    /// header) is treated as binary.
    pub fn from_content_type(content_type: Option<&str>) -> Self {
        let Some(ct) = content_type else {
            return ContentKind::Binary;
        };
        let mime = ct
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        if mime == "application/json" || mime.ends_with("+json") || mime == "text/json" {
            ContentKind::Json
        } else if mime.starts_with("text/") {
            ContentKind::Text
        } else {
            ContentKind::Binary
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentKind::Binary => write!(f, "binary"),
            ContentKind::Json => write!(f, "json"),
            ContentKind::Text => write!(f, "text"),
        }
    }
}

/// Tagged outcome of [`crate::client::AsyncJobClient::submit`] or
/// [`crate::client::AsyncJobClient::poll`].
///
/// `Completed` and `Failed` are terminal. `Pending` is only ever returned by
/// `submit`, and only to be handed to `poll`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// The service returned the result.
    Completed {
        artifact: Vec<u8>,
        content_kind: ContentKind,
    },
    /// The service accepted the job; check `poll_handle` later.
    Pending { poll_handle: String },
    /// The job cannot produce a result.
    Failed(JobFailure),
}

impl JobOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, JobOutcome::Completed { .. })
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, JobOutcome::Pending { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, JobOutcome::Failed(_))
    }

    /// Artifact bytes of a completed job.
    pub fn artifact(&self) -> Option<&[u8]> {
        match self {
            JobOutcome::Completed { artifact, .. } => Some(artifact),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&JobFailure> {
        match self {
            JobOutcome::Failed(f) => Some(f),
            _ => None,
        }
    }

    /// HTTP status of a failed outcome, if the server sent one.
    pub fn http_status(&self) -> Option<u16> {
        self.failure().and_then(JobFailure::http_status)
    }

    /// Short label: `completed`, `pending` or the failure kind.
    pub fn label(&self) -> &'static str {
        match self {
            JobOutcome::Completed { .. } => "completed",
            JobOutcome::Pending { .. } => "pending",
            JobOutcome::Failed(f) => f.kind(),
        }
    }

    /// Split a multi-document JSON artifact into its named documents.
    ///
    /// Returns an empty list for anything other than a completed JSON
    /// artifact carrying a document list (see [`extract::documents`]).
    pub fn documents(&self) -> Result<Vec<OutputDocument>, JobFailure> {
        match self {
            JobOutcome::Completed {
                artifact,
                content_kind: ContentKind::Json,
            } => extract::documents(artifact),
            _ => Ok(Vec::new()),
        }
    }

    /// Convert into a `Result`, treating anything but `Completed` as an error.
    ///
    /// A `Pending` outcome is reported as [`JobFailure::NotPolled`].
    pub fn into_result(self) -> Result<(Vec<u8>, ContentKind), JobFailure> {
        match self {
            JobOutcome::Completed {
                artifact,
                content_kind,
            } => Ok((artifact, content_kind)),
            JobOutcome::Failed(f) => Err(f),
            JobOutcome::Pending { poll_handle } => Err(JobFailure::still_pending(&poll_handle)),
        }
    }
}
