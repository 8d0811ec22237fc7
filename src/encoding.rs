//! Base64 codecs and content fingerprinting
//!
//! Encoded configuration documents use URL-safe Base64 without padding so
//! they can travel inside a path segment. Decoding is tolerant: it accepts
//! the URL-safe and standard alphabets, with or without padding, since
//! subscription payloads in the wild come in every variant.

use anyhow::{Context, Result, bail};
use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE, URL_SAFE_NO_PAD};
use sha2::{Digest, Sha256};
use tracing::trace;

use crate::error::ConvertError;

// ============================================================================
// Base64 Decoding
// ============================================================================

/// Decodes Base64 content, trying multiple variants
pub fn decode_base64(content: &str) -> Result<Vec<u8>> {
    // Remove all whitespace (handles line breaks within Base64)
    let cleaned: String = content.chars().filter(|c| !c.is_whitespace()).collect();
    trace!(
        "Attempting Base64 decode, cleaned length: {} bytes",
        cleaned.len()
    );

    if let Ok(decoded) = STANDARD.decode(&cleaned) {
        trace!("Decoded using standard Base64");
        return Ok(decoded);
    }

    if let Ok(decoded) = URL_SAFE.decode(&cleaned) {
        trace!("Decoded using URL-safe Base64");
        return Ok(decoded);
    }

    if let Ok(decoded) = URL_SAFE_NO_PAD.decode(&cleaned) {
        trace!("Decoded using URL-safe Base64 without padding");
        return Ok(decoded);
    }

    // Try with padding added if needed
    let padded = add_base64_padding(&cleaned);
    if let Ok(decoded) = STANDARD.decode(&padded) {
        trace!("Decoded using standard Base64 with added padding");
        return Ok(decoded);
    }
    if let Ok(decoded) = URL_SAFE.decode(&padded) {
        trace!("Decoded using URL-safe Base64 with added padding");
        return Ok(decoded);
    }

    bail!("Failed to decode Base64 content")
}

/// Decodes Base64 content into a UTF-8 string
pub fn decode_base64_text(content: &str) -> Result<String> {
    let decoded = decode_base64(content)?;
    String::from_utf8(decoded).context("Decoded Base64 content is not valid UTF-8")
}

/// Adds proper padding to a Base64 string if missing
fn add_base64_padding(s: &str) -> String {
    let mut result = s.to_string();
    while result.len() % 4 != 0 {
        result.push('=');
    }
    result
}

// ============================================================================
// Document Encoding
// ============================================================================

/// Encodes serialized document text as URL-safe Base64 without padding
pub fn encode_document(json: &str) -> String {
    URL_SAFE_NO_PAD.encode(json.as_bytes())
}

/// Decodes an encoded document back into its JSON text.
///
/// Accepts padded and unpadded URL-safe input. Fails with
/// [`ConvertError::DecodeError`] on malformed Base64 or non-UTF-8 payloads.
pub fn decode_document(encoded: &str) -> std::result::Result<String, ConvertError> {
    let trimmed = encoded.trim();
    let bytes = URL_SAFE_NO_PAD
        .decode(trimmed)
        .or_else(|_| URL_SAFE.decode(trimmed))
        .or_else(|_| URL_SAFE.decode(add_base64_padding(trimmed)))
        .map_err(|e| ConvertError::DecodeError(e.to_string()))?;

    String::from_utf8(bytes).map_err(|_| ConvertError::DecodeError("payload is not UTF-8".to_string()))
}

// ============================================================================
// Fingerprinting
// ============================================================================

/// Computes the stable content fingerprint of an encoded document.
///
/// SHA-256 over the encoded text, hex-encoded. Used as the identity key for
/// short-link deduplication.
pub fn fingerprint(encoded: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(encoded.as_bytes());
    hex::encode(hasher.finalize())
}

// ============================================================================
// Tests
// ============================================================================
