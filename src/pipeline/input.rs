//! Input resolution: turn a path, URL or uploaded bytes into a local PDF file.
//!
//! pdfium opens documents by path, so every input ends up as a file on disk.
//! Downloads and uploads land in a per-request temporary location that is
//! removed when the [`ResolvedInput`] is dropped. The `%PDF` magic bytes are
//! checked up front so a wrong upload fails as `NotAPdf` instead of deep
//! inside pdfium.

use crate::error::ExtractError;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::{NamedTempFile, TempDir};
use tracing::{debug, info};

const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// A PDF available on the local file system for the duration of a request.
pub enum ResolvedInput {
    /// Input was already a local file.
    Local(PathBuf),
    /// Input was a URL, downloaded into a temporary directory.
    Downloaded { path: PathBuf, _temp_dir: TempDir },
    /// Input was an in-memory upload, spooled to a temporary file.
    Uploaded(NamedTempFile),
}

impl ResolvedInput {
    /// Path to the PDF regardless of how it was resolved.
    pub fn path(&self) -> &Path {
        match self {
            ResolvedInput::Local(p) => p,
            ResolvedInput::Downloaded { path, .. } => path,
            ResolvedInput::Uploaded(file) => file.path(),
        }
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve a path or URL to a local PDF file.
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<ResolvedInput, ExtractError> {
    if input.trim().is_empty() {
        return Err(ExtractError::InvalidInput {
            input: input.to_string(),
        });
    }
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        resolve_local(input)
    }
}

/// Spool uploaded bytes to a temporary file.
pub fn resolve_bytes(bytes: &[u8]) -> Result<ResolvedInput, ExtractError> {
    let mut tmp = tempfile::Builder::new()
        .prefix("upload-")
        .suffix(".pdf")
        .tempfile()
        .map_err(|e| ExtractError::Internal(format!("tempfile: {e}")))?;

    if let Some(magic) = bad_magic(bytes) {
        return Err(ExtractError::NotAPdf {
            path: tmp.path().to_path_buf(),
            magic,
        });
    }

    tmp.write_all(bytes)
        .map_err(|e| ExtractError::Internal(format!("tempfile write: {e}")))?;
    debug!("Spooled {} uploaded bytes to {}", bytes.len(), tmp.path().display());
    Ok(ResolvedInput::Uploaded(tmp))
}

/// Returns the leading bytes when they are not `%PDF`.
///
/// Inputs shorter than four bytes are reported with zero padding.
fn bad_magic(bytes: &[u8]) -> Option<[u8; 4]> {
    let mut magic = [0u8; 4];
    let n = bytes.len().min(4);
    magic[..n].copy_from_slice(&bytes[..n]);
    (&magic != PDF_MAGIC).then_some(magic)
}

fn resolve_local(path_str: &str) -> Result<ResolvedInput, ExtractError> {
    let path = PathBuf::from(path_str);

    if !path.exists() {
        return Err(ExtractError::FileNotFound { path });
    }

    match std::fs::File::open(&path) {
        Ok(mut f) => {
            let mut head = Vec::with_capacity(4);
            (&mut f)
                .take(4)
                .read_to_end(&mut head)
                .map_err(|e| ExtractError::Internal(format!("read {}: {e}", path.display())))?;
            if let Some(magic) = bad_magic(&head) {
                return Err(ExtractError::NotAPdf { path, magic });
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(ExtractError::PermissionDenied { path });
        }
        Err(_) => {
            return Err(ExtractError::FileNotFound { path });
        }
    }

    debug!("Resolved local PDF: {}", path.display());
    Ok(ResolvedInput::Local(path))
}

async fn download_url(url: &str, timeout_secs: u64) -> Result<ResolvedInput, ExtractError> {
    info!("Downloading PDF from: {}", url);

    let failed = |reason: String| ExtractError::DownloadFailed {
        url: url.to_string(),
        reason,
    };

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| failed(e.to_string()))?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            ExtractError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            failed(e.to_string())
        }
    })?;

    if !response.status().is_success() {
        return Err(failed(format!("HTTP {}", response.status())));
    }

    let bytes = response.bytes().await.map_err(|e| failed(e.to_string()))?;

    let temp_dir = TempDir::new().map_err(|e| ExtractError::Internal(e.to_string()))?;
    let file_path = temp_dir.path().join(filename_from_url(url));

    if let Some(magic) = bad_magic(&bytes) {
        return Err(ExtractError::NotAPdf {
            path: file_path,
            magic,
        });
    }

    tokio::fs::write(&file_path, &bytes)
        .await
        .map_err(|e| ExtractError::Internal(format!("Failed to write temp file: {}", e)))?;

    info!("Downloaded {} bytes to {}", bytes.len(), file_path.display());

    Ok(ResolvedInput::Downloaded {
        path: file_path,
        _temp_dir: temp_dir,
    })
}

/// Last path segment of the URL when it looks like a file name.
fn filename_from_url(url: &str) -> String {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|parsed| {
            parsed
                .path_segments()
                .and_then(|mut segments| segments.next_back().map(str::to_string))
        })
        .filter(|last| !last.is_empty() && last.contains('.'))
        .unwrap_or_else(|| "downloaded.pdf".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/manual.pdf"));
        assert!(is_url("http://example.com/manual.pdf"));
        assert!(!is_url("/tmp/manual.pdf"));
        assert!(!is_url(""));
    }

    #[test]
    fn filename_from_url_segments() {
        assert_eq!(filename_from_url("https://x.org/docs/guide.pdf"), "guide.pdf");
        assert_eq!(filename_from_url("https://x.org/docs/"), "downloaded.pdf");
        assert_eq!(filename_from_url("not a url"), "downloaded.pdf");
    }

    #[test]
    fn bytes_with_pdf_magic_are_spooled() {
        let resolved = resolve_bytes(b"%PDF-1.7\n%%EOF").unwrap();
        let on_disk = std::fs::read(resolved.path()).unwrap();
        assert_eq!(on_disk, b"%PDF-1.7\n%%EOF");
    }

    #[test]
    fn bytes_without_pdf_magic_are_rejected() {
        let err = resolve_bytes(b"PK\x03\x04zip").err().unwrap();
        assert_eq!(err.kind(), ErrorKind::UnreadableDocument);
        assert!(matches!(err, ExtractError::NotAPdf { magic, .. } if &magic == b"PK\x03\x04"));
    }

    #[test]
    fn short_upload_is_rejected() {
        assert!(resolve_bytes(b"%P").is_err());
        assert!(resolve_bytes(b"").is_err());
    }

    #[test]
    fn local_file_checks() {
        let missing = resolve_local("/definitely/not/here.pdf").err().unwrap();
        assert!(matches!(missing, ExtractError::FileNotFound { .. }));

        let mut not_pdf = NamedTempFile::new().unwrap();
        not_pdf.write_all(b"hello world").unwrap();
        let err = resolve_local(not_pdf.path().to_str().unwrap()).err().unwrap();
        assert!(matches!(err, ExtractError::NotAPdf { .. }));

        let mut pdf = NamedTempFile::new().unwrap();
        pdf.write_all(b"%PDF-1.4").unwrap();
        let ok = resolve_local(pdf.path().to_str().unwrap()).unwrap();
        assert_eq!(ok.path(), pdf.path());
    }

    #[test]
    fn local_magic_is_read_from_the_first_four_bytes() {
        let mut long = NamedTempFile::new().unwrap();
        long.write_all(b"%PDF").unwrap();
        long.write_all(&[0xAB; 4096]).unwrap();
        assert!(resolve_local(long.path().to_str().unwrap()).is_ok());

        let mut short = NamedTempFile::new().unwrap();
        short.write_all(b"%PD").unwrap();
        let err = resolve_local(short.path().to_str().unwrap()).err().unwrap();
        assert!(matches!(
            err,
            ExtractError::NotAPdf {
                magic: [b'%', b'P', b'D', 0],
                ..
            }
        ));
    }

    #[tokio::test]
    async fn blank_input_is_invalid() {
        let err = resolve_input("  ", 5).await.err().unwrap();
        assert!(matches!(err, ExtractError::InvalidInput { .. }));
    }
}
