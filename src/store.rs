// src/store.rs
//! Sealed persistence for the review cache.
//!
//! `SealedFileStore` keeps one file per name with the envelope
//! `{"version":1,"mac":"<hex>","payload":"<base64>"}`. The MAC is
//! HMAC-SHA256 over the raw payload, keyed from `security.key_file`.

use base64::{engine::general_purpose::STANDARD as B64, Engine as _};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use crate::dedup::{CacheEntry, DedupCache};
use crate::error::SecurityError;

const ENVELOPE_VERSION: u32 = 1;
const KEY_LEN: usize = 32;

type HmacSha256 = Hmac<Sha256>;

pub trait SecureStore: Send + Sync {
    /// `Ok(None)` when nothing has been saved under `name` yet.
    fn load(&self, name: &str) -> Result<Option<Vec<u8>>, SecurityError>;
    fn save(&self, name: &str, data: &[u8]) -> Result<(), SecurityError>;
}

#[derive(Serialize, Deserialize)]
struct Envelope {
    version: u32,
    mac: String,
    payload: String,
}

pub struct SealedFileStore {
    key: [u8; KEY_LEN],
}

impl SealedFileStore {
    /// Read the key from `key_file`, generating (and persisting) a fresh one
    /// on first use.
    pub fn open(key_file: &Path) -> Result<Self, SecurityError> {
        let key = match fs::read_to_string(key_file) {
            Ok(s) => decode_key(&s)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let key: [u8; KEY_LEN] = rand::random();
                if let Some(parent) = key_file.parent().filter(|p| !p.as_os_str().is_empty()) {
                    fs::create_dir_all(parent)?;
                }
                write_atomic(key_file, B64.encode(key).as_bytes())?;
                tracing::info!(target: "store", key_file = %key_file.display(), "generated new store key");
                key
            }
            Err(e) => return Err(e.into()),
        };
        Ok(Self { key })
    }

    pub fn with_key(key: [u8; KEY_LEN]) -> Self {
        Self { key }
    }

    fn mac(&self, data: &[u8]) -> Result<HmacSha256, SecurityError> {
        let mut mac = HmacSha256::new_from_slice(&self.key)
            .map_err(|e| SecurityError::Key(e.to_string()))?;
        mac.update(data);
        Ok(mac)
    }
}

impl SecureStore for SealedFileStore {
    fn load(&self, name: &str) -> Result<Option<Vec<u8>>, SecurityError> {
        let raw = match fs::read(name) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let env: Envelope =
            serde_json::from_slice(&raw).map_err(|e| SecurityError::Decode(e.to_string()))?;
        if env.version != ENVELOPE_VERSION {
            return Err(SecurityError::Decode(format!(
                "unsupported envelope version {}",
                env.version
            )));
        }
        let payload = B64
            .decode(env.payload.as_bytes())
            .map_err(|e| SecurityError::Decode(e.to_string()))?;
        let tag = hex::decode(env.mac.trim()).map_err(|_| SecurityError::Tampered)?;
        self.mac(&payload)?
            .verify_slice(&tag)
            .map_err(|_| SecurityError::Tampered)?;
        Ok(Some(payload))
    }

    fn save(&self, name: &str, data: &[u8]) -> Result<(), SecurityError> {
        let env = Envelope {
            version: ENVELOPE_VERSION,
            mac: hex::encode(self.mac(data)?.finalize().into_bytes()),
            payload: B64.encode(data),
        };
        let bytes = serde_json::to_vec(&env).map_err(|e| SecurityError::Decode(e.to_string()))?;
        let path = PathBuf::from(name);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        write_atomic(&path, &bytes)?;
        Ok(())
    }
}

/// Load the persisted cache. Any failure (tampering, bad JSON, io) degrades
/// to an empty cache.
pub fn load_cache(store: &dyn SecureStore, name: &str) -> DedupCache {
    let bytes = match store.load(name) {
        Ok(Some(b)) => b,
        Ok(None) => {
            tracing::info!(target: "store", name, "no persisted cache, starting empty");
            return DedupCache::new();
        }
        Err(e) => {
            tracing::warn!(target: "store", name, error = %e, "persisted cache unreadable, starting empty");
            return DedupCache::new();
        }
    };
    match serde_json::from_slice::<Vec<CacheEntry>>(&bytes) {
        Ok(entries) => {
            let cache = DedupCache::from_entries(entries);
            tracing::info!(target: "store", name, entries = cache.len(), "cache loaded");
            cache
        }
        Err(e) => {
            tracing::warn!(target: "store", name, error = %e, "persisted cache is not a list of entries, starting empty");
            DedupCache::new()
        }
    }
}

/// Persist the cache as an ordered JSON array. Exceeding `max_size` is
/// reported, nothing is evicted.
pub fn save_cache(
    store: &dyn SecureStore,
    name: &str,
    cache: &DedupCache,
    max_size: usize,
) -> Result<(), SecurityError> {
    if cache.len() > max_size {
        tracing::warn!(target: "store", entries = cache.len(), max_size, "cache exceeds configured max_size");
    }
    let bytes = serde_json::to_vec(cache.all()).map_err(|e| SecurityError::Decode(e.to_string()))?;
    store.save(name, &bytes)?;
    tracing::info!(target: "store", name, entries = cache.len(), "cache saved");
    Ok(())
}

fn decode_key(s: &str) -> Result<[u8; KEY_LEN], SecurityError> {
    let bytes = B64
        .decode(s.trim().as_bytes())
        .map_err(|e| SecurityError::Key(format!("key file is not base64: {e}")))?;
    <[u8; KEY_LEN]>::try_from(bytes.as_slice())
        .map_err(|_| SecurityError::Key(format!("key must be {KEY_LEN} bytes, got {}", bytes.len())))
}

fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    {
        let mut f = fs::File::create(&tmp)?;
        f.write_all(bytes)?;
        f.sync_all()?;
    }
    fs::rename(&tmp, path)
}
