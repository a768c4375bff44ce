//! Input resolution: normalise a user-supplied path or URL to document bytes.
//!
//! pdfium loads documents from byte slices, so resolution only has to fetch
//! bytes and pick a display file name — no temp files involved. Format
//! validation deliberately does NOT happen here: the orchestrator sniffs
//! the magic header during its local validation step, and the rasteriser
//! checks again so its own contract holds standalone.

use crate::error::AnalysisError;
use tracing::{debug, info};

/// The resolved document: raw bytes plus a display file name.
#[derive(Debug)]
pub struct ResolvedDocument {
    pub bytes: Vec<u8>,
    pub file_name: String,
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve the input string to document bytes.
///
/// If the input is a URL, download it with the given timeout.
/// If the input is a local file, read it from disk.
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<ResolvedDocument, AnalysisError> {
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        resolve_local(input).await
    }
}

/// Read a local file.
async fn resolve_local(path_str: &str) -> Result<ResolvedDocument, AnalysisError> {
    let bytes = tokio::fs::read(path_str).await.map_err(|e| {
        AnalysisError::Validation {
            detail: format!("cannot read '{path_str}': {e}"),
        }
    })?;

    let file_name = std::path::Path::new(path_str)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "resume.pdf".to_string());

    debug!("resolved local file: {path_str} ({} bytes)", bytes.len());
    Ok(ResolvedDocument { bytes, file_name })
}

/// Download a URL into memory.
async fn download_url(url: &str, timeout_secs: u64) -> Result<ResolvedDocument, AnalysisError> {
    info!("downloading resume from: {url}");

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| AnalysisError::Validation {
            detail: format!("http client: {e}"),
        })?;

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| AnalysisError::Validation {
            detail: if e.is_timeout() {
                format!("download timed out after {timeout_secs}s for '{url}'")
            } else {
                format!("failed to download '{url}': {e}")
            },
        })?;

    if !response.status().is_success() {
        return Err(AnalysisError::Validation {
            detail: format!("failed to download '{url}': HTTP {}", response.status()),
        });
    }

    let file_name = extract_filename(url);

    let bytes = response
        .bytes()
        .await
        .map_err(|e| AnalysisError::Validation {
            detail: format!("failed to download '{url}': {e}"),
        })?
        .to_vec();

    info!("downloaded {} bytes", bytes.len());
    Ok(ResolvedDocument { bytes, file_name })
}

/// Extract a reasonable file name from the URL path.
fn extract_filename(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() && last.contains('.') {
                    return last.to_string();
                }
            }
        }
    }
    "resume.pdf".to_string()
}
