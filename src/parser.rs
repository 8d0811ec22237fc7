//! Hysteria2 endpoint parsing
//!
//! Parses a single hysteria2:// or hy2:// URI into an [`Endpoint`] record.
//! Query parameter aliases are resolved through static alias tables so the
//! whole mapping stays auditable in one place:
//!
//! - `sni` <- `sni`, `server_name`, `server-name`, `peer`
//! - `insecure` <- `insecure`, `allow_insecure`, `allowInsecure`,
//!   `skip-cert-verify` (truthy values: `1`, `true`, `yes`, `on`)
//! - `obfs-password` <- `obfs-password`, `salamander`
//!
//! Format: hysteria2://password@host:port?params#tag

use std::collections::{HashMap, HashSet};

use tracing::{debug, trace, warn};
use url::Url;

use crate::error::ConvertError;

/// Aliases resolving to the TLS server name
const SNI_ALIASES: [&str; 4] = ["sni", "server_name", "server-name", "peer"];

/// Aliases resolving to the certificate-verification bypass flag
const INSECURE_ALIASES: [&str; 4] = [
    "insecure",
    "allow_insecure",
    "allowInsecure",
    "skip-cert-verify",
];

/// Aliases resolving to the obfuscation password
const OBFS_PASSWORD_ALIASES: [&str; 2] = ["obfs-password", "salamander"];

/// Textual values treated as true for boolean parameters
const TRUTHY_VALUES: [&str; 4] = ["1", "true", "yes", "on"];

// ============================================================================
// Endpoint Record
// ============================================================================

/// One parsed proxy node with connection and TLS parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// Display name, unique within a conversion
    pub tag: String,
    /// Connection target host
    pub address: String,
    /// Connection target port (nonzero)
    pub port: u16,
    /// Authentication secret (required)
    pub password: String,
    /// TLS server name
    pub sni: Option<String>,
    /// Skip TLS certificate verification
    pub insecure: bool,
    /// Ordered ALPN protocol identifiers; empty means "use the default"
    pub alpn: Vec<String>,
    /// Obfuscation type, passed through opaquely
    pub obfs: Option<String>,
    /// Obfuscation password, passed through opaquely
    pub obfs_password: Option<String>,
    /// Upload bandwidth hint in Mbps
    pub up_mbps: Option<u32>,
    /// Download bandwidth hint in Mbps
    pub down_mbps: Option<u32>,
    /// Custom CA certificate (PEM text or Base64-wrapped PEM)
    pub ca: Option<String>,
}

/// A line that failed endpoint parsing, kept for error reporting
#[derive(Debug)]
pub struct SkippedLine {
    /// Zero-based index of the line within the normalized input
    pub index: usize,
    /// The error that disqualified it
    pub error: ConvertError,
}

// ============================================================================
// Single-URI Parsing
// ============================================================================

/// Parses one URI into an endpoint record.
///
/// `index` drives the default tag (`node-<index>`) when the URI carries no
/// fragment. Failures here are per-endpoint, never fatal to a batch.
pub fn parse_endpoint(uri: &str, index: usize) -> Result<Endpoint, ConvertError> {
    trace!("Parsing endpoint URI at index {}", index);

    let scheme = extract_scheme(uri)?;
    if !scheme.eq_ignore_ascii_case("hysteria2") && !scheme.eq_ignore_ascii_case("hy2") {
        return Err(ConvertError::UnsupportedScheme(scheme.to_string()));
    }

    let url = Url::parse(uri)
        .map_err(|e| ConvertError::UnsupportedScheme(format!("{}: {}", scheme, e)))?;

    // Bare address for IPv6, not the bracketed URL form
    let address = match url.host() {
        Some(url::Host::Ipv6(addr)) => addr.to_string(),
        Some(host) => host.to_string(),
        None => return Err(ConvertError::InvalidPort("missing host".to_string())),
    };

    let port = match url.port() {
        Some(p) if p > 0 => p,
        Some(_) => return Err(ConvertError::InvalidPort("port must be nonzero".to_string())),
        None => return Err(ConvertError::InvalidPort("missing port".to_string())),
    };

    let params: HashMap<String, String> = url.query_pairs().into_owned().collect();

    // Password lives in the query or in userinfo; the query wins
    let password = match params.get("password") {
        Some(p) if !p.is_empty() => p.clone(),
        _ => {
            let userinfo = urlencoding::decode(url.username())
                .unwrap_or_else(|_| url.username().into())
                .into_owned();
            if userinfo.is_empty() {
                return Err(ConvertError::MissingCredential);
            }
            userinfo
        }
    };

    let tag = url
        .fragment()
        .map(|f| {
            urlencoding::decode(f)
                .unwrap_or_else(|_| f.into())
                .into_owned()
        })
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| format!("node-{}", index));

    let sni = resolve_alias(&params, &SNI_ALIASES);
    let insecure = resolve_alias(&params, &INSECURE_ALIASES)
        .map(|v| is_truthy(&v))
        .unwrap_or(false);

    let alpn = params.get("alpn").map(|s| split_csv(s)).unwrap_or_default();

    let obfs = params
        .get("obfs")
        .filter(|t| !t.is_empty() && t.as_str() != "none")
        .cloned();
    let obfs_password = resolve_alias(&params, &OBFS_PASSWORD_ALIASES);

    Ok(Endpoint {
        tag,
        address,
        port,
        password,
        sni,
        insecure,
        alpn,
        obfs,
        obfs_password,
        up_mbps: params.get("up").and_then(|s| s.parse().ok()),
        down_mbps: params.get("down").and_then(|s| s.parse().ok()),
        ca: params.get("ca").cloned(),
    })
}

/// Parses a batch of candidate URIs, skipping and recording failures.
///
/// Tags are made unique: a collision gets a numeric suffix (`name-2`,
/// `name-3`, ...). Returns the surviving endpoints in input order plus the
/// skipped lines.
pub fn parse_endpoints(uris: &[String]) -> (Vec<Endpoint>, Vec<SkippedLine>) {
    let mut endpoints: Vec<Endpoint> = Vec::with_capacity(uris.len());
    let mut skipped = Vec::new();
    let mut seen_tags: HashSet<String> = HashSet::new();

    for (index, uri) in uris.iter().enumerate() {
        match parse_endpoint(uri, index) {
            Ok(mut endpoint) => {
                endpoint.tag = dedupe_tag(endpoint.tag, &mut seen_tags);
                debug!(
                    "Parsed endpoint '{}' ({}:{})",
                    endpoint.tag, endpoint.address, endpoint.port
                );
                endpoints.push(endpoint);
            }
            Err(e) => {
                warn!("Skipping line {}: {}", index, e);
                skipped.push(SkippedLine { index, error: e });
            }
        }
    }

    debug!(
        "Batch parsing complete: {} total, {} valid, {} skipped",
        uris.len(),
        endpoints.len(),
        skipped.len()
    );

    (endpoints, skipped)
}

// ============================================================================
// Helpers
// ============================================================================

/// Extracts the scheme from a URI
fn extract_scheme(uri: &str) -> Result<&str, ConvertError> {
    match uri.split_once("://") {
        Some((scheme, _)) if !scheme.is_empty() => Ok(scheme),
        _ => Err(ConvertError::UnsupportedScheme("<none>".to_string())),
    }
}

/// Looks up the first alias present in the query parameters
fn resolve_alias(params: &HashMap<String, String>, aliases: &[&str]) -> Option<String> {
    aliases
        .iter()
        .find_map(|key| params.get(*key))
        .filter(|v| !v.is_empty())
        .cloned()
}

/// Checks a textual boolean against the truthy set
fn is_truthy(value: &str) -> bool {
    TRUTHY_VALUES.contains(&value.trim().to_ascii_lowercase().as_str())
}

/// Splits a comma-separated value, trimming and dropping empties
pub fn split_csv(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Appends a numeric suffix until the tag is unique within the batch
fn dedupe_tag(tag: String, seen: &mut HashSet<String>) -> String {
    if seen.insert(tag.clone()) {
        return tag;
    }
    let mut n = 2;
    loop {
        let candidate = format!("{}-{}", tag, n);
        if seen.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

// ============================================================================
// Tests
// ============================================================================
