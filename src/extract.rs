//! Artifact extraction: turn a 200 response body into result bytes.
//!
//! The service wraps results differently per endpoint: raw bytes, a
//! top-level `docContent` / `docData` base64 string, a nested
//! `document.docData`, or a one-element document array (`outputDocuments`,
//! `splitedDocuments`, `attachments` or a bare top-level list). Rather than
//! sniffing per endpoint, every 200 body goes through the same ordered chain
//! of [`ExtractionStrategy`] values:
//!
//! ```text
//! Content-Type
//!  │
//!  ├─ not JSON ─────────────▶ body as-is (Binary / Text)
//!  └─ JSON ─▶ parse ─┬─ error ─────────────▶ Decode failure
//!                    ├─ strategy 1..n hit ─▶ base64-decode (Binary) or Decode failure
//!                    │                       (an empty field is a Decode failure too)
//!                    └─ no hit ────────────▶ body as-is (Json)
//! ```
//!
//! A strategy that finds its field but cannot decode it fails closed; the
//! chain does not fall through to the next strategy.

use crate::error::JobFailure;
use crate::outcome::ContentKind;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

/// Maximum number of raw-body characters echoed into logs.
const LOG_PREVIEW_CHARS: usize = 256;

/// One way of locating a base64 artifact inside a JSON body.
pub trait ExtractionStrategy: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Return the base64 text if this strategy's field is present.
    fn locate<'a>(&self, body: &'a Value) -> Option<&'a str>;
}

/// A top-level string field, e.g. `{"docContent": "..."}`.
pub struct TopLevelField(pub &'static str);

impl ExtractionStrategy for TopLevelField {
    fn name(&self) -> &'static str {
        self.0
    }

    fn locate<'a>(&self, body: &'a Value) -> Option<&'a str> {
        body.get(self.0)?.as_str()
    }
}

/// A string field inside a nested object, e.g. `{"document": {"docData": "..."}}`.
pub struct NestedField {
    pub name: &'static str,
    pub path: &'static [&'static str],
}

impl ExtractionStrategy for NestedField {
    fn name(&self) -> &'static str {
        self.name
    }

    fn locate<'a>(&self, body: &'a Value) -> Option<&'a str> {
        self.path
            .iter()
            .try_fold(body, |v, key| v.get(*key))?
            .as_str()
    }
}

/// A document array holding exactly one element; its first present content
/// field is the artifact. Multi-element arrays are left to [`documents`].
///
/// `path` leads to the array; an empty path means the body itself is the
/// array.
pub struct SingleDocumentArray {
    pub name: &'static str,
    pub path: &'static [&'static str],
    pub content_fields: &'static [&'static str],
}

impl ExtractionStrategy for SingleDocumentArray {
    fn name(&self) -> &'static str {
        self.name
    }

    fn locate<'a>(&self, body: &'a Value) -> Option<&'a str> {
        let array = self.path.iter().try_fold(body, |v, key| v.get(*key))?;
        match array.as_array()?.as_slice() {
            [only] => self
                .content_fields
                .iter()
                .find_map(|f| only.get(*f).and_then(Value::as_str)),
            _ => None,
        }
    }
}

/// The strategies tried, in order, on every JSON 200 body.
pub fn default_strategies() -> Vec<Box<dyn ExtractionStrategy>> {
    vec![
        Box::new(TopLevelField("docContent")),
        Box::new(TopLevelField("docData")),
        Box::new(NestedField {
            name: "document.docData",
            path: &["document", "docData"],
        }),
        Box::new(SingleDocumentArray {
            name: "outputDocuments[0]",
            path: &["outputDocuments"],
            content_fields: &["streamFile", "docContent"],
        }),
        Box::new(SingleDocumentArray {
            name: "splitedDocuments[0]",
            path: &["splitedDocuments"],
            content_fields: &["docContent", "streamFile"],
        }),
        Box::new(SingleDocumentArray {
            name: "attachments[0]",
            path: &["attachments"],
            content_fields: &["docContent", "streamFile"],
        }),
        Box::new(SingleDocumentArray {
            name: "[0]",
            path: &[],
            content_fields: &["docContent", "streamFile"],
        }),
        Box::new(TopLevelField("data")),
    ]
}

/// Ordered chain of extraction strategies.
pub struct Extractor {
    strategies: Vec<Box<dyn ExtractionStrategy>>,
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new(default_strategies())
    }
}

impl Extractor {
    pub fn new(strategies: Vec<Box<dyn ExtractionStrategy>>) -> Self {
        Self { strategies }
    }

    /// Names of the configured strategies, in the order they are tried.
    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Turn a 200 response into artifact bytes.
    ///
    /// `status` is only used to label a decode failure.
    pub fn extract(
        &self,
        status: u16,
        content_type: Option<&str>,
        body: Vec<u8>,
    ) -> Result<(Vec<u8>, ContentKind), JobFailure> {
        let kind = ContentKind::from_content_type(content_type);
        if kind != ContentKind::Json {
            debug!("Artifact is raw {} body ({} bytes)", kind, body.len());
            return Ok((body, kind));
        }

        let parsed: Value = match serde_json::from_slice(&body) {
            Ok(v) => v,
            Err(e) => {
                return Err(decode_failure(
                    status,
                    format!("body declared as JSON but could not be parsed: {e}"),
                    &body,
                ))
            }
        };

        for strategy in &self.strategies {
            let Some(encoded) = strategy.locate(&parsed) else {
                continue;
            };
            if encoded.trim().is_empty() {
                return Err(decode_failure(
                    status,
                    format!("field '{}' is empty", strategy.name()),
                    &body,
                ));
            }
            return match decode_base64(encoded) {
                Ok(bytes) => {
                    debug!(
                        "Artifact extracted via '{}' ({} bytes)",
                        strategy.name(),
                        bytes.len()
                    );
                    Ok((bytes, ContentKind::Binary))
                }
                Err(e) => Err(decode_failure(
                    status,
                    format!("field '{}' is not valid base64: {e}", strategy.name()),
                    &body,
                )),
            };
        }

        debug!("No base64 wrapper found; artifact is the JSON body ({} bytes)", body.len());
        Ok((body, ContentKind::Json))
    }
}

/// Decode base64 text, tolerating embedded line breaks and whitespace.
pub fn decode_base64(text: &str) -> Result<Vec<u8>, base64::DecodeError> {
    if text.bytes().any(|b| b.is_ascii_whitespace()) {
        let compact: String = text.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        STANDARD.decode(compact)
    } else {
        STANDARD.decode(text)
    }
}

fn decode_failure(status: u16, reason: String, body: &[u8]) -> JobFailure {
    let raw = String::from_utf8_lossy(body).into_owned();
    let preview: String = raw.chars().take(LOG_PREVIEW_CHARS).collect();
    warn!("Undecodable result (HTTP {status}): {reason}; body starts with {preview:?}");
    JobFailure::Decode {
        status,
        reason,
        raw,
    }
}

// ── Multi-document envelopes ─────────────────────────────────────────────

/// One named document from a multi-document result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputDocument {
    /// File name suggested by the service, or a positional fallback.
    pub name: String,
    #[serde(skip)]
    pub content: Vec<u8>,
}

/// Envelope keys holding a list of documents.
const DOCUMENT_LISTS: &[&str] = &["outputDocuments", "splitedDocuments", "attachments"];

/// Split a multi-document JSON body into documents.
///
/// Accepts a bare top-level array or an object holding one of
/// `outputDocuments`, `splitedDocuments` or `attachments`. Elements without
/// any content field are skipped; an element whose content is empty fails
/// closed. Returns an empty list when the body carries no document list.
pub fn documents(json_body: &[u8]) -> Result<Vec<OutputDocument>, JobFailure> {
    let parsed: Value = serde_json::from_slice(json_body).map_err(|e| {
        decode_failure(200, format!("result is not JSON: {e}"), json_body)
    })?;

    let items = match &parsed {
        Value::Array(items) => Some(items),
        other => DOCUMENT_LISTS
            .iter()
            .find_map(|k| other.get(*k).and_then(Value::as_array)),
    };
    let Some(items) = items else {
        return Ok(Vec::new());
    };

    let mut docs = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let Some(encoded) = ["streamFile", "docContent", "docData"]
            .iter()
            .find_map(|f| item.get(*f).and_then(Value::as_str))
        else {
            debug!("Document {} has no content field; skipped", i + 1);
            continue;
        };
        if encoded.trim().is_empty() {
            return Err(decode_failure(
                200,
                format!("document {} is empty", i + 1),
                json_body,
            ));
        }
        let content = decode_base64(encoded).map_err(|e| {
            decode_failure(
                200,
                format!("document {} is not valid base64: {e}", i + 1),
                json_body,
            )
        })?;
        let name = ["fileName", "docName", "name"]
            .iter()
            .find_map(|f| item.get(*f).and_then(Value::as_str))
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("document_{}", i + 1));
        docs.push(OutputDocument { name, content });
    }
    Ok(docs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn json_body(v: Value) -> Vec<u8> {
        serde_json::to_vec(&v).unwrap()
    }

    const JSON: Option<&str> = Some("application/json");

    #[test]
    fn raw_binary_body_is_passed_through() {
        let ex = Extractor::default();
        let (bytes, kind) = ex
            .extract(200, Some("application/pdf"), b"%PDF-raw".to_vec())
            .unwrap();
        assert_eq!(bytes, b"%PDF-raw");
        assert_eq!(kind, ContentKind::Binary);
    }

    #[test]
    fn text_body_is_passed_through() {
        let ex = Extractor::default();
        let (bytes, kind) = ex.extract(200, Some("text/plain"), b"hello".to_vec()).unwrap();
        assert_eq!(bytes, b"hello");
        assert_eq!(kind, ContentKind::Text);
    }

    #[test]
    fn doc_content_is_decoded() {
        let ex = Extractor::default();
        let body = json_body(json!({"docContent": STANDARD.encode(b"DECODED")}));
        let (bytes, kind) = ex.extract(200, JSON, body).unwrap();
        assert_eq!(bytes, b"DECODED");
        assert_eq!(kind, ContentKind::Binary);
    }

    #[test]
    fn nested_doc_data_is_decoded() {
        let ex = Extractor::default();
        let body = json_body(json!({"document": {"docData": STANDARD.encode(b"nested")}}));
        let (bytes, _) = ex.extract(200, JSON, body).unwrap();
        assert_eq!(bytes, b"nested");
    }

    #[test]
    fn single_output_document_is_decoded() {
        let ex = Extractor::default();
        let body = json_body(json!({
            "outputDocuments": [{"fileName": "a.png", "streamFile": STANDARD.encode(b"png")}]
        }));
        let (bytes, kind) = ex.extract(200, JSON, body).unwrap();
        assert_eq!(bytes, b"png");
        assert_eq!(kind, ContentKind::Binary);
    }

    #[test]
    fn multi_document_envelope_stays_json() {
        let ex = Extractor::default();
        let body = json_body(json!({
            "splitedDocuments": [
                {"docName": "part1.pdf", "docContent": STANDARD.encode(b"one")},
                {"docName": "part2.pdf", "docContent": STANDARD.encode(b"two")}
            ]
        }));
        let (bytes, kind) = ex.extract(200, JSON, body.clone()).unwrap();
        assert_eq!(kind, ContentKind::Json);
        assert_eq!(bytes, body);

        let docs = documents(&bytes).unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].name, "part1.pdf");
        assert_eq!(docs[0].content, b"one");
        assert_eq!(docs[1].content, b"two");
    }

    #[test]
    fn plain_json_without_wrapper_is_the_artifact() {
        let ex = Extractor::default();
        let body = json_body(json!({"documentType": "invoice", "pageCount": 2}));
        let (bytes, kind) = ex.extract(200, JSON, body.clone()).unwrap();
        assert_eq!(bytes, body);
        assert_eq!(kind, ContentKind::Json);
    }

    #[test]
    fn invalid_base64_fails_closed() {
        let ex = Extractor::default();
        let body = json_body(json!({"docContent": "***not base64***"}));
        let err = ex.extract(200, JSON, body).unwrap_err();
        match err {
            JobFailure::Decode { status, reason, raw } => {
                assert_eq!(status, 200);
                assert!(reason.contains("docContent"), "got: {reason}");
                assert!(raw.contains("not base64"));
            }
            other => panic!("expected decode failure, got {other:?}"),
        }
    }

    #[test]
    fn unparseable_json_is_decode_failure() {
        let ex = Extractor::default();
        let err = ex.extract(200, JSON, b"{oops".to_vec()).unwrap_err();
        assert_eq!(err.kind(), "decode");
    }

    #[test]
    fn strategy_order_prefers_doc_content() {
        let ex = Extractor::default();
        let body = json_body(json!({
            "data": STANDARD.encode(b"data"),
            "docContent": STANDARD.encode(b"doc"),
        }));
        let (bytes, _) = ex.extract(200, JSON, body).unwrap();
        assert_eq!(bytes, b"doc");
        assert_eq!(ex.strategy_names()[0], "docContent");
    }

    #[test]
    fn base64_with_line_breaks() {
        let encoded = STANDARD.encode(b"line broken payload");
        let wrapped = format!("{}\n{}", &encoded[..10], &encoded[10..]);
        assert_eq!(decode_base64(&wrapped).unwrap(), b"line broken payload");
    }

    #[test]
    fn base64_round_trip_identity() {
        let corpus: Vec<u8> = (0..=255u8).cycle().take(4099).collect();
        for n in [0usize, 1, 2, 3, 10, 255, 4099] {
            let original = &corpus[..n];
            let encoded = STANDARD.encode(original);
            assert_eq!(decode_base64(&encoded).unwrap(), original, "n = {n}");
        }
    }

    #[test]
    fn documents_fallback_names() {
        let body = json_body(json!({
            "outputDocuments": [
                {"streamFile": STANDARD.encode(b"a")},
                {"note": "no content"},
                {"fileName": "", "streamFile": STANDARD.encode(b"c")}
            ]
        }));
        let docs = documents(&body).unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].name, "document_1");
        assert_eq!(docs[1].name, "document_3");
    }

    #[test]
    fn bare_list_of_documents_is_split() {
        let ex = Extractor::default();
        let body = json_body(json!([
            {"docName": "book_1.pdf", "docContent": STANDARD.encode(b"first")},
            {"docName": "book_2.pdf", "docContent": STANDARD.encode(b"second")}
        ]));
        let (bytes, kind) = ex.extract(200, JSON, body.clone()).unwrap();
        assert_eq!(kind, ContentKind::Json);
        assert_eq!(bytes, body);

        let docs = documents(&bytes).unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].name, "book_1.pdf");
        assert_eq!(docs[1].content, b"second");
    }

    #[test]
    fn single_element_bare_list_is_decoded() {
        let ex = Extractor::default();
        let body = json_body(json!([
            {"docName": "page.png", "docContent": STANDARD.encode(b"png")}
        ]));
        let (bytes, kind) = ex.extract(200, JSON, body).unwrap();
        assert_eq!(bytes, b"png");
        assert_eq!(kind, ContentKind::Binary);
    }

    #[test]
    fn attachments_envelope_is_split() {
        let body = json_body(json!({
            "attachments": [
                {"docName": "invoice.xml", "docContent": STANDARD.encode(b"<xml/>")},
                {"docName": "terms.txt", "docContent": STANDARD.encode(b"terms")}
            ]
        }));
        let docs = documents(&body).unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].name, "invoice.xml");
        assert_eq!(docs[0].content, b"<xml/>");
        assert_eq!(docs[1].name, "terms.txt");
    }

    #[test]
    fn single_attachment_is_decoded() {
        let ex = Extractor::default();
        let body = json_body(json!({
            "attachments": [{"docName": "a.xml", "docContent": STANDARD.encode(b"one")}]
        }));
        let (bytes, kind) = ex.extract(200, JSON, body).unwrap();
        assert_eq!(bytes, b"one");
        assert_eq!(kind, ContentKind::Binary);
    }

    #[test]
    fn empty_content_field_fails_closed() {
        let ex = Extractor::default();
        let err = ex
            .extract(200, JSON, json_body(json!({"docContent": ""})))
            .unwrap_err();
        match err {
            JobFailure::Decode { status, reason, .. } => {
                assert_eq!(status, 200);
                assert_eq!(reason, "field 'docContent' is empty");
            }
            other => panic!("expected decode failure, got {other:?}"),
        }

        let err = ex
            .extract(200, JSON, json_body(json!({"document": {"docData": "  "}})))
            .unwrap_err();
        assert_eq!(err.kind(), "decode");
    }

    #[test]
    fn empty_document_in_list_fails_closed() {
        let body = json_body(json!({
            "splitedDocuments": [
                {"docName": "a.pdf", "docContent": STANDARD.encode(b"A")},
                {"docName": "b.pdf", "docContent": ""}
            ]
        }));
        let err = documents(&body).unwrap_err();
        assert_eq!(err.kind(), "decode");
        assert!(err.to_string().contains("document 2 is empty"), "got: {err}");
    }

    #[test]
    fn documents_without_envelope_is_empty() {
        let body = json_body(json!({"pageCount": 3}));
        assert!(documents(&body).unwrap().is_empty());
    }
}
