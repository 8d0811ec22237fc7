//! Short-link store
//!
//! File-backed table mapping short identifiers to encoded configuration
//! documents, keyed by content fingerprint. `register` is idempotent: the
//! same encoded payload always maps to the same identifier. All mutation
//! happens under one lock and every write goes through a temp-file rename,
//! so a registered identifier stays resolvable across restarts.

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::encoding::fingerprint;
use crate::error::{ConvertError, Result};

/// Environment variable overriding the store location
pub const ENV_STORE_PATH: &str = "SUB_DB_PATH";

/// Default store location, relative to the working directory
pub const DEFAULT_STORE_PATH: &str = "data/subscriptions.json";

/// Random bytes per identifier
const ID_BYTES: usize = 6;

/// Length of every generated identifier (URL-safe Base64 of [`ID_BYTES`])
pub const SHORT_ID_LEN: usize = ID_BYTES * 4 / 3;

/// Attempts before giving up on identifier collisions
const ID_RETRIES: usize = 5;

/// One stored subscription
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ShortLinkRecord {
    /// Short identifier, unique within the store
    pub id: String,
    /// SHA-256 hex fingerprint of the encoded payload
    pub fingerprint: String,
    /// The encoded configuration document
    pub payload: String,
    /// Unix timestamp of first registration
    pub created_at: u64,
}

/// File-backed short-link table
pub struct ShortLinkStore {
    path: PathBuf,
    records: Mutex<Vec<ShortLinkRecord>>,
}

impl ShortLinkStore {
    /// Opens the store at the location given by `SUB_DB_PATH`, falling back
    /// to the default path
    pub fn open_default() -> Result<Self> {
        let path = std::env::var(ENV_STORE_PATH).unwrap_or_else(|_| DEFAULT_STORE_PATH.to_string());
        Self::open(path)
    }

    /// Opens the store at `path`, creating parent directories on first use
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| ConvertError::Store(format!("creating {:?}: {}", parent, e)))?;
            }
        }

        let records = load_records(&path)?;
        debug!("Opened store at {:?} with {} records", path, records.len());
        Ok(Self {
            path,
            records: Mutex::new(records),
        })
    }

    /// Registers an encoded document and returns its short identifier.
    ///
    /// Idempotent on content: re-registering a payload with a known
    /// fingerprint returns the existing identifier without writing.
    pub fn register(&self, payload: &str) -> Result<String> {
        let fp = fingerprint(payload);
        let mut records = self
            .records
            .lock()
            .map_err(|_| ConvertError::Store("store lock poisoned".to_string()))?;

        if let Some(existing) = records.iter().find(|r| r.fingerprint == fp) {
            debug!("Fingerprint already registered as id {}", existing.id);
            return Ok(existing.id.clone());
        }

        let id = generate_id(&records)?;
        let created_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        records.push(ShortLinkRecord {
            id: id.clone(),
            fingerprint: fp,
            payload: payload.to_string(),
            created_at,
        });

        persist(&self.path, &records)?;
        info!("Registered new subscription as id {}", id);
        Ok(id)
    }

    /// Returns the encoded document for `id`, or [`ConvertError::NotFound`]
    pub fn resolve(&self, id: &str) -> Result<String> {
        let records = self
            .records
            .lock()
            .map_err(|_| ConvertError::Store("store lock poisoned".to_string()))?;
        records
            .iter()
            .find(|r| r.id == id)
            .map(|r| r.payload.clone())
            .ok_or_else(|| ConvertError::NotFound(id.to_string()))
    }

    /// Number of stored records
    pub fn len(&self) -> usize {
        self.records.lock().map(|r| r.len()).unwrap_or(0)
    }

    /// Whether the store holds no records
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Generates a short identifier not already present in `records`
fn generate_id(records: &[ShortLinkRecord]) -> Result<String> {
    let mut rng = rand::thread_rng();
    for _ in 0..ID_RETRIES {
        let mut bytes = [0u8; ID_BYTES];
        rng.fill_bytes(&mut bytes);
        let id = URL_SAFE_NO_PAD.encode(bytes);
        if !records.iter().any(|r| r.id == id) {
            return Ok(id);
        }
        warn!("Short identifier collision, retrying");
    }
    Err(ConvertError::Store(
        "exhausted identifier generation attempts".to_string(),
    ))
}

/// Loads existing records, tolerating a missing file
fn load_records(path: &Path) -> Result<Vec<ShortLinkRecord>> {
    match std::fs::read_to_string(path) {
        Ok(content) => serde_json::from_str(&content)
            .map_err(|e| ConvertError::Store(format!("corrupt store file {:?}: {}", path, e))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(ConvertError::Store(format!("reading {:?}: {}", path, e))),
    }
}

/// Writes records durably via a sibling temp file and atomic rename
fn persist(path: &Path, records: &[ShortLinkRecord]) -> Result<()> {
    let json = serde_json::to_string(records)
        .map_err(|e| ConvertError::Store(format!("serializing store: {}", e)))?;

    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json)
        .map_err(|e| ConvertError::Store(format!("writing {:?}: {}", tmp, e)))?;
    std::fs::rename(&tmp, path)
        .map_err(|e| ConvertError::Store(format!("replacing {:?}: {}", path, e)))?;
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
