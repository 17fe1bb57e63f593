//! Job requests: the binary document plus service-specific parameters.
//!
//! Every PDF4me endpoint takes the same envelope: a base64 document field,
//! an output-name field and a flat set of endpoint parameters. A
//! [`JobRequest`] holds those pieces and renders the JSON body on demand;
//! the client never interprets the parameters.

use crate::error::Pdf4meError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::{Map, Value};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// JSON field carrying the base64 document unless overridden.
pub const DEFAULT_PAYLOAD_FIELD: &str = "docContent";

/// JSON field carrying the output document name unless overridden.
pub const DEFAULT_NAME_FIELD: &str = "docName";

/// A document submission for one endpoint.
///
/// Build with [`JobRequest::new`] or [`JobRequest::from_file`], then chain
/// parameter setters. The payload is guaranteed non-empty.
#[derive(Debug, Clone, PartialEq)]
pub struct JobRequest {
    payload: Vec<u8>,
    output_name: String,
    payload_field: String,
    name_field: String,
    async_flag: Option<bool>,
    params: Map<String, Value>,
}

impl JobRequest {
    /// Create a request from in-memory bytes.
    ///
    /// `async` defaults to `true`, matching the convention of the service's
    /// own samples; the server still decides whether to answer 200 or 202.
    pub fn new(payload: impl Into<Vec<u8>>, output_name: impl Into<String>) -> Result<Self, Pdf4meError> {
        let payload = payload.into();
        let output_name = output_name.into();
        if payload.is_empty() {
            return Err(Pdf4meError::EmptyPayload { name: output_name });
        }
        Ok(Self {
            payload,
            output_name,
            payload_field: DEFAULT_PAYLOAD_FIELD.to_string(),
            name_field: DEFAULT_NAME_FIELD.to_string(),
            async_flag: Some(true),
            params: Map::new(),
        })
    }

    /// Read a local file into a request, naming the output after the file.
    ///
    /// Only presence checks are performed (exists, readable, non-empty);
    /// validating the document itself is the service's job.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, Pdf4meError> {
        let path = path.as_ref();
        let payload = read_local(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());
        debug!("Loaded {} ({} bytes)", path.display(), payload.len());
        Self::new(payload, name)
    }

    // ── Builder-style setters ────────────────────────────────────────────

    /// Set one endpoint parameter. Later calls overwrite earlier ones.
    pub fn param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Merge a map of endpoint parameters.
    pub fn params(mut self, params: Map<String, Value>) -> Self {
        self.params.extend(params);
        self
    }

    /// Override the output-name value sent to the service.
    pub fn output_name(mut self, name: impl Into<String>) -> Self {
        self.output_name = name.into();
        self
    }

    /// Override the JSON field that carries the base64 document.
    pub fn payload_field(mut self, field: impl Into<String>) -> Self {
        self.payload_field = field.into();
        self
    }

    /// Override the JSON field that carries the output name.
    pub fn name_field(mut self, field: impl Into<String>) -> Self {
        self.name_field = field.into();
        self
    }

    /// Set (`Some`) or omit (`None`) the `async` flag.
    pub fn async_flag(mut self, flag: Option<bool>) -> Self {
        self.async_flag = flag;
        self
    }

    // ── Accessors ────────────────────────────────────────────────────────

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn name(&self) -> &str {
        &self.output_name
    }

    pub fn get_param(&self, key: &str) -> Option<&Value> {
        self.params.get(key)
    }

    /// Render the JSON request body.
    ///
    /// Parameters go in first; the `async`, document and name fields are
    /// written last so a stray parameter cannot clobber the payload.
    pub fn to_json(&self) -> Value {
        let mut body = self.params.clone();
        if let Some(flag) = self.async_flag {
            body.insert("async".to_string(), Value::Bool(flag));
        }
        body.insert(
            self.payload_field.clone(),
            Value::String(STANDARD.encode(&self.payload)),
        );
        body.insert(
            self.name_field.clone(),
            Value::String(self.output_name.clone()),
        );
        Value::Object(body)
    }
}

/// Read a local file, mapping the common failures to typed errors.
fn read_local(path: &Path) -> Result<Vec<u8>, Pdf4meError> {
    let owned = || PathBuf::from(path);

    if !path.exists() {
        return Err(Pdf4meError::FileNotFound { path: owned() });
    }
    if path.is_dir() {
        return Err(Pdf4meError::ReadFailed {
            path: owned(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "is a directory"),
        });
    }

    let mut file = match std::fs::File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(Pdf4meError::PermissionDenied { path: owned() });
        }
        Err(_) => return Err(Pdf4meError::FileNotFound { path: owned() }),
    };

    let mut buf = Vec::new();
    file.read_to_end(&mut buf)
        .map_err(|source| Pdf4meError::ReadFailed {
            path: owned(),
            source,
        })?;
    Ok(buf)
}
