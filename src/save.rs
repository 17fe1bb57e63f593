//! Writing job results to disk.
//!
//! Files are written atomically: bytes go to a sibling temp file which is
//! then renamed over the target, so an interrupted run never leaves a
//! truncated document behind.

use crate::error::{JobFailure, Pdf4meError};
use crate::extract::OutputDocument;
use crate::outcome::{ContentKind, JobOutcome};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info};

/// Distinguishes temp files of concurrent writes within one process.
static TEMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// Where a completed outcome was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SavedOutput {
    /// A single artifact file.
    File(PathBuf),
    /// One file per document of a multi-document result.
    Documents(Vec<PathBuf>),
}

impl SavedOutput {
    pub fn paths(&self) -> Vec<&Path> {
        match self {
            SavedOutput::File(p) => vec![p.as_path()],
            SavedOutput::Documents(ps) => ps.iter().map(PathBuf::as_path).collect(),
        }
    }
}

/// Atomically write `bytes` to `path`, creating parent directories.
///
/// Every call uses its own temp name, so concurrent writes to one target
/// never share a temp file; the last rename wins.
pub async fn write_artifact(path: impl AsRef<Path>, bytes: &[u8]) -> Result<(), Pdf4meError> {
    let path = path.as_ref();
    let write_err = |source| Pdf4meError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(format!(
        ".{}-{}.part",
        std::process::id(),
        TEMP_SEQ.fetch_add(1, Ordering::Relaxed)
    ));
    let tmp_path = path.with_file_name(tmp_name);

    tokio::fs::write(&tmp_path, bytes).await.map_err(write_err)?;
    if let Err(e) = tokio::fs::rename(&tmp_path, path).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(write_err(e));
    }

    debug!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}

/// Write the documents of a multi-document result into `dir`.
///
/// Names are sanitised to a bare file name; duplicates get a numeric suffix.
pub async fn write_documents(
    dir: impl AsRef<Path>,
    docs: &[OutputDocument],
) -> Result<Vec<PathBuf>, Pdf4meError> {
    let dir = dir.as_ref();
    let mut written: Vec<PathBuf> = Vec::with_capacity(docs.len());

    for (i, doc) in docs.iter().enumerate() {
        let base = sanitize_file_name(&doc.name).unwrap_or_else(|| format!("document_{}", i + 1));
        let mut path = dir.join(&base);
        let mut n = 2;
        while written.contains(&path) {
            path = dir.join(with_suffix(&base, n));
            n += 1;
        }
        write_artifact(&path, &doc.content).await?;
        written.push(path);
    }
    Ok(written)
}

/// Save a completed outcome.
///
/// Multi-document JSON results are split into `target`'s parent directory
/// (or `target` itself if it is an existing directory); anything else is
/// written to `target` as one file.
pub async fn save_outcome(
    outcome: &JobOutcome,
    target: impl AsRef<Path>,
) -> Result<Result<SavedOutput, JobFailure>, Pdf4meError> {
    let target = target.as_ref();
    let artifact = match outcome {
        JobOutcome::Completed { artifact, .. } => artifact,
        JobOutcome::Failed(failure) => return Ok(Err(failure.clone())),
        JobOutcome::Pending { poll_handle } => return Ok(Err(JobFailure::still_pending(poll_handle))),
    };

    let docs = match outcome.documents() {
        Ok(docs) => docs,
        Err(failure) => return Ok(Err(failure)),
    };

    if docs.is_empty() {
        write_artifact(target, artifact).await?;
        info!("Saved {} ({} bytes)", target.display(), artifact.len());
        return Ok(Ok(SavedOutput::File(target.to_path_buf())));
    }

    let dir = if target.is_dir() {
        target.to_path_buf()
    } else {
        target
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    };
    let paths = write_documents(&dir, &docs).await?;
    info!("Saved {} documents into {}", paths.len(), dir.display());
    Ok(Ok(SavedOutput::Documents(paths)))
}

/// Guess a file extension for an artifact from its leading bytes, falling
/// back to the content kind.
pub fn guess_extension(artifact: &[u8], kind: ContentKind) -> &'static str {
    const SIGNATURES: &[(&[u8], &str)] = &[
        (b"%PDF", "pdf"),
        (b"\x89PNG", "png"),
        (b"\xFF\xD8\xFF", "jpg"),
        (b"GIF8", "gif"),
        (b"BM", "bmp"),
        (b"II*\x00", "tiff"),
        (b"MM\x00*", "tiff"),
        (b"PK\x03\x04", "zip"),
        (b"\xD0\xCF\x11\xE0", "doc"),
    ];
    if let Some((_, ext)) = SIGNATURES.iter().find(|(magic, _)| artifact.starts_with(magic)) {
        return ext;
    }
    match kind {
        ContentKind::Json => "json",
        ContentKind::Text => "txt",
        ContentKind::Binary => "bin",
    }
}

/// Keep only the final path component and reject empty / dot names.
fn sanitize_file_name(name: &str) -> Option<String> {
    let last = name.rsplit(['/', '\\']).next().unwrap_or_default().trim();
    if last.is_empty() || last == "." || last == ".." {
        None
    } else {
        Some(last.to_string())
    }
}

fn with_suffix(name: &str, n: usize) -> String {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{stem}_{n}.{ext}"),
        _ => format!("{name}_{n}"),
    }
}
