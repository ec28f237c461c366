// src/cache/store.rs
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;

use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};

use super::{safe_file_stem, write_atomic};
use crate::error::PersistenceError;

/// Hex SHA-256 of the exact bytes that are about to be processed.
pub fn checksum(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut out = String::with_capacity(64);
    for b in digest.iter() {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

/// Permanent key-value store. No TTL; a checksum key is only ever written once per input.
pub trait ContentStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, PersistenceError>;

    fn set(&self, key: &str, value: &[u8]) -> Result<(), PersistenceError>;

    /// Store raw bytes (e.g. the source image) next to the JSON entries.
    fn set_with_extension(&self, key: &str, ext: &str, value: &[u8])
        -> Result<(), PersistenceError>;
}

/// Typed JSON helpers over any store.
pub trait ContentStoreExt: ContentStore {
    /// Missing entries, read errors and undecodable JSON are all misses.
    fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.get(key) {
            Ok(Some(bytes)) => match serde_json::from_slice(&bytes) {
                Ok(v) => {
                    metrics::counter!("store_hits_total").increment(1);
                    Some(v)
                }
                Err(e) => {
                    tracing::debug!(key, error = %e, "store entry did not decode");
                    metrics::counter!("store_misses_total").increment(1);
                    None
                }
            },
            Ok(None) => {
                metrics::counter!("store_misses_total").increment(1);
                None
            }
            Err(e) => {
                tracing::warn!(key, error = %e, "store read failed");
                metrics::counter!("store_misses_total").increment(1);
                None
            }
        }
    }

    fn set_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), PersistenceError> {
        let data = serde_json::to_vec(value)?;
        self.set(key, &data)
    }
}

impl<S: ContentStore + ?Sized> ContentStoreExt for S {}

/// One file per key under a local directory.
pub struct LocalStore {
    dir: PathBuf,
    lock: Mutex<()>,
}

impl LocalStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, PersistenceError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| PersistenceError::io(&dir, e))?;
        Ok(Self {
            dir,
            lock: Mutex::new(()),
        })
    }

    fn key_path(&self, key: &str, ext: &str) -> PathBuf {
        self.dir.join(format!("{}{}", safe_file_stem(key), ext))
    }
}

impl ContentStore for LocalStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, PersistenceError> {
        let _g = self.lock.lock().unwrap_or_else(|p| p.into_inner());
        let path = self.key_path(key, ".json");
        match fs::read(&path) {
            Ok(d) => Ok(Some(d)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(PersistenceError::io(path, e)),
        }
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), PersistenceError> {
        let _g = self.lock.lock().unwrap_or_else(|p| p.into_inner());
        write_atomic(&self.key_path(key, ".json"), value)
    }

    fn set_with_extension(
        &self,
        key: &str,
        ext: &str,
        value: &[u8],
    ) -> Result<(), PersistenceError> {
        let _g = self.lock.lock().unwrap_or_else(|p| p.into_inner());
        write_atomic(&self.key_path(key, ext), value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksum_is_hex_sha256() {
        assert_eq!(
            checksum(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn json_roundtrip_and_decode_failure_is_miss() {
        let tmp = tempfile::tempdir().unwrap();
        let store = LocalStore::new(tmp.path()).unwrap();
        store.set_json("k", &vec!["a", "b"]).unwrap();
        let back: Option<Vec<String>> = store.get_json("k");
        assert_eq!(back.unwrap(), vec!["a".to_string(), "b".to_string()]);

        store.set("bad", b"not json").unwrap();
        let miss: Option<Vec<String>> = store.get_json("bad");
        assert!(miss.is_none());
        let absent: Option<Vec<String>> = store.get_json("absent");
        assert!(absent.is_none());
    }

    #[test]
    fn raw_blob_uses_given_extension() {
        let tmp = tempfile::tempdir().unwrap();
        let store = LocalStore::new(tmp.path()).unwrap();
        store.set_with_extension("abc", ".png", b"\x89PNG").unwrap();
        assert!(tmp.path().join("abc.png").exists());
    }
}
