//! Conversion pipeline and short-link resolution
//!
//! Glues the stages together: fetch (when the input is a URL), normalize,
//! parse, synthesize, encode, register. Per-endpoint parse failures are
//! recorded and skipped; batch failures abort with a single error.

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::encoding::{decode_document, encode_document};
use crate::error::ConvertError;
use crate::generator::synthesize;
use crate::parser::{SkippedLine, parse_endpoints};
use crate::policy::PolicyConfig;
use crate::store::{SHORT_ID_LEN, ShortLinkStore};
use crate::subscription::{is_remote_url, normalize};

/// Result of one conversion
#[derive(Debug)]
pub struct ConversionOutcome {
    /// URL-safe Base64 of the configuration document
    pub encoded: String,
    /// Short identifier from the store, when one was registered
    pub short_id: Option<String>,
    /// Number of valid nodes in the document
    pub node_count: usize,
    /// Lines that failed endpoint parsing, with their errors
    pub skipped: Vec<SkippedLine>,
}

/// Runs the full conversion pipeline on already-local subscription text.
///
/// Pass a store to also register the result for short-link resolution.
pub fn convert(
    content: &str,
    policy: &PolicyConfig,
    store: Option<&ShortLinkStore>,
) -> std::result::Result<ConversionOutcome, ConvertError> {
    let uris = normalize(content)?;
    debug!("Normalized input into {} candidate lines", uris.len());

    let (endpoints, skipped) = parse_endpoints(&uris);
    for s in &skipped {
        warn!("Skipping line {}: {}", s.index, s.error);
    }

    let document = synthesize(&endpoints, policy)?;
    let json = document.to_json()?;
    let encoded = encode_document(&json);

    let short_id = match store {
        Some(store) => Some(store.register(&encoded)?),
        None => None,
    };

    info!(
        "Converted {} nodes ({} lines skipped)",
        endpoints.len(),
        skipped.len()
    );
    Ok(ConversionOutcome {
        encoded,
        short_id,
        node_count: endpoints.len(),
        skipped,
    })
}

/// Fetches subscription text when the input is a remote URL, otherwise
/// returns the input unchanged
pub async fn fetch_if_url(input: &str) -> Result<String> {
    let trimmed = input.trim();
    if !is_remote_url(trimmed) {
        return Ok(trimmed.to_string());
    }

    debug!("Fetching subscription URL: {}", trimmed);
    let client = reqwest::Client::builder()
        .user_agent(concat!("hy2sing/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")?;

    let response = client
        .get(trimmed)
        .send()
        .await
        .with_context(|| format!("Failed to fetch URL: {}", trimmed))?;

    let status = response.status();
    if !status.is_success() {
        anyhow::bail!("HTTP request failed with status {}: {}", status, trimmed);
    }

    response
        .text()
        .await
        .with_context(|| format!("Failed to read response body from: {}", trimmed))
}

/// Output format for resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveFormat {
    /// The encoded Base64 text as stored
    B64,
    /// The decoded JSON document
    Json,
}

/// Resolves a short identifier or a full encoded document to the requested
/// representation.
///
/// References of identifier length are always store lookups: a random short
/// id can itself decode as Base64, so length decides, not decodability.
/// Longer references that decode to a JSON document are self-contained;
/// anything else is looked up and fails with [`ConvertError::NotFound`] when
/// unknown.
pub fn resolve(
    store: &ShortLinkStore,
    reference: &str,
    format: ResolveFormat,
) -> std::result::Result<String, ConvertError> {
    let reference = reference.trim();

    let encoded = if reference.len() == SHORT_ID_LEN {
        store.resolve(reference)?
    } else {
        match decode_document(reference) {
            Ok(json) if is_document(&json) => {
                debug!("Reference is a self-contained encoded document");
                reference.to_string()
            }
            _ => store.resolve(reference)?,
        }
    };

    match format {
        ResolveFormat::B64 => Ok(encoded),
        ResolveFormat::Json => decode_document(&encoded),
    }
}

/// Whether decoded text is a JSON document, not bytes that merely start
/// with `{`
fn is_document(json: &str) -> bool {
    serde_json::from_str::<serde_json::Value>(json)
        .map(|v| v.is_object())
        .unwrap_or(false)
}

// ============================================================================
// Tests
// ============================================================================
