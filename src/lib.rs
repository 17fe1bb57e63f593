//! # pdf4me-jobs
//!
//! Submit documents to the PDF4me API and get the result back, whether the
//! service answers immediately or defers the job.
//!
//! ## Why this crate?
//!
//! Every PDF4me operation has the same shape: POST a base64 document inside
//! a JSON body, then either receive the result directly (`200`) or receive a
//! `202 Accepted` with a `Location` header that has to be polled until the
//! job finishes. This crate implements that protocol once, with bounded
//! polling, cancellation and typed failures, so callers only choose an
//! endpoint and a document.
//!
//! ## Job lifecycle
//!
//! ```text
//! JobRequest
//!  │
//!  ├─ 1. Encode   payload → base64, merged with endpoint parameters
//!  ├─ 2. Submit   POST endpoint          (200 → done, 202 → Location)
//!  ├─ 3. Poll     GET Location × N       (fixed interval, cancellable)
//!  ├─ 4. Extract  raw bytes, or base64 unwrapped from a JSON envelope
//!  └─ 5. Outcome  Completed / Failed(JobFailure)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf4me_jobs::{endpoints, AsyncJobClient, ClientConfig, JobRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClientConfig::builder()
//!         .api_key(std::env::var("PDF4ME_API_KEY")?)
//!         .build()?;
//!     let client = AsyncJobClient::for_endpoint(config, endpoints::lookup("ConvertToPdf")?)?;
//!
//!     let request = JobRequest::from_file("letter.docx")?;
//!     let outcome = client.run(&request).await;
//!     pdf4me_jobs::save::save_outcome(&outcome, "letter.pdf").await??;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf4me` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! pdf4me-jobs = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod client;
pub mod config;
pub mod endpoints;
pub mod error;
pub mod extract;
pub mod observer;
pub mod outcome;
pub mod request;
pub mod save;
pub mod transport;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use client::AsyncJobClient;
pub use config::{ClientConfig, ClientConfigBuilder, PollPolicy, DEFAULT_BASE_URL};
pub use endpoints::Endpoint;
pub use error::{JobFailure, Pdf4meError, TransportError};
pub use extract::{ExtractionStrategy, Extractor, OutputDocument};
pub use observer::{JobObserver, NoopObserver, SharedObserver};
pub use outcome::{ContentKind, JobOutcome};
pub use request::JobRequest;
pub use save::{save_outcome, write_artifact, SavedOutput};
pub use tokio_util::sync::CancellationToken;
pub use transport::{HttpTransport, RawResponse, Transport};
