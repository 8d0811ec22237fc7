//! Subscription normalization
//!
//! Heterogeneous subscription input (single raw URI, multi-line URI list,
//! whole-payload Base64 blob, remote URL) is normalized into an ordered list
//! of candidate URI strings. Detection runs as an explicit ordered sequence
//! of shape attempts, short-circuiting on the first that matches:
//! raw URI -> multi-line list -> whole-input Base64 -> remote URL.
//!
//! Fetching the remote URL is the caller's job (see [`crate::convert`]); this
//! module only classifies and decomposes text.

use tracing::{debug, trace};

use crate::encoding::decode_base64_text;
use crate::error::ConvertError;

/// Recognized URI scheme prefixes for this converter
const SCHEME_PREFIXES: [&str; 2] = ["hysteria2://", "hy2://"];

/// Detected subscription input shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputShape {
    /// A single hysteria2:// or hy2:// URI
    RawUri,
    /// Multiple lines, at least one carrying a URI
    UriList,
    /// Whole input is one Base64 blob wrapping one of the above
    Base64Blob,
    /// A bare http/https URL whose body must be fetched and re-normalized
    RemoteUrl,
    /// None of the recognized shapes
    Unknown,
}

impl std::fmt::Display for InputShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InputShape::RawUri => write!(f, "raw URI"),
            InputShape::UriList => write!(f, "URI list"),
            InputShape::Base64Blob => write!(f, "Base64 blob"),
            InputShape::RemoteUrl => write!(f, "remote URL"),
            InputShape::Unknown => write!(f, "unknown"),
        }
    }
}

/// Checks if a string starts with a recognized hysteria2 scheme prefix
pub fn is_hysteria2_uri(s: &str) -> bool {
    let lower = s.trim().to_ascii_lowercase();
    SCHEME_PREFIXES.iter().any(|p| lower.starts_with(p))
}

/// Checks if input is a bare subscription URL to fetch
pub fn is_remote_url(s: &str) -> bool {
    let trimmed = s.trim();
    trimmed.starts_with("http://") || trimmed.starts_with("https://")
}

/// Detects the shape of subscription input
pub fn detect_input_shape(content: &str) -> InputShape {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return InputShape::Unknown;
    }

    let preview: String = trimmed.chars().take(80).collect();
    debug!(
        "Detecting input shape, length: {} bytes, preview: {:?}",
        trimmed.len(),
        preview
    );

    if is_remote_url(trimmed) {
        return InputShape::RemoteUrl;
    }

    let mut lines = trimmed.lines().filter(|l| !l.trim().is_empty());
    let first = lines.next().unwrap_or("").trim();
    let multi_line = lines.next().is_some();

    if is_hysteria2_uri(first) {
        if multi_line {
            return InputShape::UriList;
        }
        return InputShape::RawUri;
    }

    if multi_line {
        // A list where individual lines may still be Base64-wrapped URIs
        return InputShape::UriList;
    }

    // Single line without a scheme: only remaining option is a Base64 blob
    if decode_base64_text(trimmed).is_ok() {
        return InputShape::Base64Blob;
    }

    InputShape::Unknown
}

/// Normalizes subscription text into an ordered list of candidate URI strings.
///
/// Order is preserved: the first line becomes the first candidate, which
/// drives default tag numbering downstream. Blank lines and `#` comments are
/// skipped. A line without a scheme separator gets one Base64 decode attempt
/// before being passed along (some providers Base64-wrap each line).
///
/// Fails with [`ConvertError::UnrecognizedInputFormat`] only when every shape
/// attempt is exhausted. Remote URLs must be fetched by the caller first.
pub fn normalize(content: &str) -> Result<Vec<String>, ConvertError> {
    let shape = detect_input_shape(content);
    debug!("Detected input shape: {}", shape);

    match shape {
        InputShape::RawUri => Ok(vec![content.trim().to_string()]),
        InputShape::UriList => {
            let candidates = split_candidate_lines(content);
            if candidates.is_empty() {
                return Err(ConvertError::UnrecognizedInputFormat);
            }
            Ok(candidates)
        }
        InputShape::Base64Blob => {
            let decoded = decode_base64_text(content.trim())
                .map_err(|_| ConvertError::UnrecognizedInputFormat)?;
            trace!("Base64 blob decoded to {} bytes", decoded.len());
            // Re-normalize the decoded text; a blob wrapping another bare
            // blob is not a recognized shape, so recursion terminates.
            if detect_input_shape(&decoded) == InputShape::Base64Blob {
                return Err(ConvertError::UnrecognizedInputFormat);
            }
            normalize(&decoded)
        }
        InputShape::RemoteUrl | InputShape::Unknown => {
            Err(ConvertError::UnrecognizedInputFormat)
        }
    }
}

/// Splits multi-line content into candidate URIs, preserving order
fn split_candidate_lines(content: &str) -> Vec<String> {
    let mut candidates = Vec::new();
    for raw in content.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if line.contains("://") {
            candidates.push(line.to_string());
            continue;
        }

        // Per-line Base64 attempt; on failure keep the raw line so the
        // parser can record a per-endpoint error instead of dropping it
        match decode_base64_text(line) {
            Ok(decoded) => {
                let decoded = decoded.trim().to_string();
                trace!("Decoded Base64 line into: {:?}", decoded.chars().take(40).collect::<String>());
                candidates.push(decoded);
            }
            Err(_) => candidates.push(line.to_string()),
        }
    }
    candidates
}

// ============================================================================
// Tests
// ============================================================================
