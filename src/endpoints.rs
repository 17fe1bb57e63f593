//! Catalog of known PDF4me endpoints and their polling defaults.
//!
//! The attempt counts and intervals below are the ones the service's own
//! sample clients use per endpoint. They are defaults, not limits: callers
//! can always pass their own [`PollPolicy`].

use crate::config::PollPolicy;
use crate::error::Pdf4meError;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::time::Duration;

/// One service operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoint {
    /// Operation name as used in the path, e.g. `ConvertToPdf`.
    pub name: &'static str,
    /// Path relative to the API root, e.g. `/api/v2/ConvertToPdf`.
    pub path: &'static str,
    /// Default polling cadence for deferred jobs.
    pub poll: PollPolicy,
}

const fn ep(name: &'static str, path: &'static str, attempts: u32, secs: u64) -> Endpoint {
    Endpoint {
        name,
        path,
        poll: PollPolicy {
            max_attempts: attempts,
            interval: Duration::from_secs(secs),
        },
    }
}

/// Every endpoint in the catalog, sorted by name.
pub static ENDPOINTS: &[Endpoint] = &[
    ep("AddAttachmentToPdf", "/api/v2/AddAttachmentToPdf", 10, 10),
    ep("AddBarcode", "/api/v2/addbarcode", 10, 10),
    ep("AddFormField", "/api/v2/AddFormField", 20, 10),
    ep("AddHtmlHeaderFooter", "/api/v2/AddHtmlHeaderFooter", 10, 10),
    ep("AddImageWatermarkToImage", "/api/v2/AddImageWatermarkToImage", 10, 10),
    ep("AddPageNumber", "/api/v2/AddPageNumber", 10, 10),
    ep("AddTextWatermarkToImage", "/api/v2/AddTextWatermarkToImage", 10, 10),
    ep("ClassifyDocument", "/api/v2/ClassifyDocument", 20, 15),
    ep("CompressPdf", "/api/v2/Optimize", 10, 10),
    ep("ConvertHtmlToPdf", "/api/v2/ConvertHtmlToPdf", 10, 10),
    ep("ConvertImageFormat", "/api/v2/ConvertImageFormat", 10, 10),
    ep("ConvertJsonToExcel", "/api/v2/ConvertJsonToExcel", 10, 10),
    ep("ConvertMdToPdf", "/api/v2/ConvertMdToPdf", 10, 10),
    ep("ConvertOcrPdf", "/api/v2/ConvertOcrPdf", 20, 10),
    ep("ConvertPdfToExcel", "/api/v2/ConvertPdfToExcel", 10, 10),
    ep("ConvertPdfToPowerPoint", "/api/v2/ConvertPdfToPowerPoint", 10, 10),
    ep("ConvertPdfToWord", "/api/v2/ConvertPdfToWord", 10, 10),
    ep("ConvertToPdf", "/api/v2/ConvertToPdf", 10, 10),
    ep("ConvertUrlToPdf", "/api/v2/ConvertUrlToPdf", 10, 10),
    ep("ConvertVisio", "/api/v2/ConvertVisio", 10, 10),
    ep("ConvertWordToPdfForm", "/api/v2/ConvertWordToPdfForm", 10, 10),
    ep("CreateBarcode", "/api/v2/CreateBarcode", 10, 10),
    ep("CreateImages", "/api/v2/CreateImages", 20, 10),
    ep("CreatePdfA", "/api/v2/PdfA", 10, 10),
    ep("CreateSwissQrBill", "/api/v2/CreateSwissQrBill", 10, 10),
    ep("CropImage", "/api/v2/CropImage", 10, 10),
    ep("DeleteBlankPages", "/api/v2/DeleteBlankPages", 30, 10),
    ep("DeletePages", "/api/v2/DeletePages", 20, 10),
    ep("DisableTrackingChangesInWord", "/api/v2/DisableTrackingChangesInWord", 10, 10),
    ep("EnableTrackingChangesInWord", "/api/v2/EnableTrackingChangesInWord", 20, 10),
    ep("ExtractAttachmentFromPdf", "/api/v2/ExtractAttachmentFromPdf", 15, 10),
    ep("ExtractPdfFormData", "/api/v2/ExtractPdfFormData", 15, 10),
    ep("ExtractResources", "/api/v2/ExtractResources", 20, 15),
    ep("ExtractTableFromPdf", "/api/v2/ExtractTableFromPdf", 15, 12),
    ep("ExtractTextByExpression", "/api/v2/ExtractTextByExpression", 15, 8),
    ep("ExtractTextFromWord", "/api/v2/ExtractTextFromWord", 15, 10),
    ep("FillPdfForm", "/api/v2/FillPdfForm", 20, 10),
    ep("FlattenPdf", "/api/v2/FlattenPdf", 10, 10),
    ep("GenerateDocumentMultiple", "/api/v2/GenerateDocumentMultiple", 10, 10),
    ep("GenerateDocumentSingle", "/api/v2/GenerateDocumentSingle", 20, 10),
    ep("GetPdfMetadata", "/api/v2/GetPdfMetadata", 10, 10),
    ep("GetTrackingChangesInWord", "/api/v2/GetTrackingChangesInWord", 10, 10),
    ep("ImageStamp", "/api/v2/ImageStamp", 10, 10),
    ep("LinearizePdf", "/api/v2/LinearizePdf", 10, 10),
    ep("Merge", "/api/v2/Merge", 20, 10),
    ep("MergeOverlay", "/api/v2/MergeOverlay", 20, 10),
    ep("ParseDocument", "/api/v2/ParseDocument", 15, 10),
    ep("ReadBarcodes", "/api/v2/ReadBarcodes", 10, 10),
    ep("ReadSwissQrBill", "/api/v2/ReadSwissQRBill", 20, 10),
    ep("ReplaceTextWithImageInWord", "/api/v2/ReplaceTextWithImageInWord", 10, 10),
    ep("RotateImage", "/api/v2/RotateImage", 20, 10),
    ep("RotatePage", "/api/v2/RotatePage", 20, 10),
    ep("SignPdf", "/api/v2/SignPdf", 10, 10),
    ep("SplitPdf", "/api/v2/SplitPdf", 20, 10),
    ep("SplitPdfByBarcode", "/api/v2/SplitPdfByBarcode", 20, 10),
    ep("Stamp", "/api/v2/Stamp", 10, 10),
    ep("UnlockPdf", "/api/v2/Unlock", 10, 10),
    ep("UpdateHyperlinkAnnotation", "/api/v2/UpdateHyperlinkAnnotation", 10, 10),
];

/// Lowercased name and lowercased path (without leading slash) → endpoint.
static INDEX: Lazy<HashMap<String, &'static Endpoint>> = Lazy::new(|| {
    let mut map = HashMap::with_capacity(ENDPOINTS.len() * 2);
    for e in ENDPOINTS {
        map.insert(e.name.to_ascii_lowercase(), e);
        map.insert(e.path.trim_start_matches('/').to_ascii_lowercase(), e);
    }
    map
});

/// Find an endpoint by name (`compresspdf`) or path (`api/v2/Optimize`),
/// case-insensitively.
pub fn lookup(name: &str) -> Result<&'static Endpoint, Pdf4meError> {
    let key = name.trim().trim_start_matches('/').to_ascii_lowercase();
    INDEX
        .get(&key)
        .copied()
        .ok_or_else(|| Pdf4meError::UnknownEndpoint {
            name: name.to_string(),
        })
}

impl Endpoint {
    /// An ad-hoc endpoint for a path that is not in the catalog.
    ///
    /// The name and path are leaked to obtain `'static` strings; intended for
    /// one-off CLI use, not for building endpoints in a loop.
    pub fn custom(path: &str, poll: PollPolicy) -> Endpoint {
        let path: &'static str = Box::leak(path.to_string().into_boxed_str());
        let name = path.rsplit('/').find(|s| !s.is_empty()).unwrap_or(path);
        Endpoint { name, path, poll }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_is_sorted_and_unique() {
        let names: Vec<_> = ENDPOINTS.iter().map(|e| e.name).collect();
        let mut sorted = names.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(names, sorted);
    }

    #[test]
    fn every_path_is_under_api_v2() {
        for e in ENDPOINTS {
            assert!(e.path.starts_with("/api/v2/"), "{}", e.name);
            assert!(e.poll.max_attempts >= 10, "{}", e.name);
        }
    }

    #[test]
    fn lookup_by_name_is_case_insensitive() {
        let e = lookup("convertTOpdf").unwrap();
        assert_eq!(e.path, "/api/v2/ConvertToPdf");
        assert_eq!(e.poll, PollPolicy::new(10, Duration::from_secs(10)));
    }

    #[test]
    fn lookup_by_path() {
        assert_eq!(lookup("api/v2/Optimize").unwrap().name, "CompressPdf");
        assert_eq!(lookup("/api/v2/PdfA").unwrap().name, "CreatePdfA");
    }

    #[test]
    fn per_endpoint_poll_defaults() {
        assert_eq!(lookup("ClassifyDocument").unwrap().poll.interval, Duration::from_secs(15));
        assert_eq!(lookup("DeleteBlankPages").unwrap().poll.max_attempts, 30);
        assert_eq!(lookup("ExtractTextByExpression").unwrap().poll.interval, Duration::from_secs(8));
    }

    #[test]
    fn unknown_endpoint() {
        let err = lookup("MakeCoffee").unwrap_err();
        assert!(matches!(err, Pdf4meError::UnknownEndpoint { .. }));
    }

    #[test]
    fn custom_endpoint_takes_last_segment_as_name() {
        let e = Endpoint::custom("/api/v2/SomethingNew", PollPolicy::default());
        assert_eq!(e.name, "SomethingNew");
        assert_eq!(e.path, "/api/v2/SomethingNew");
    }
}
