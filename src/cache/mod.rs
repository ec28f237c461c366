// src/cache/mod.rs
//! Two cache tiers: a short-TTL response cache keyed by adapter name, and a permanent
//! content-addressed store keyed by SHA-256 of expensive inputs.

pub mod response;
pub mod store;

use std::fs;
use std::io::Write;
use std::path::Path;

use crate::error::PersistenceError;

pub use response::ResponseCache;
pub use store::{checksum, ContentStore, ContentStoreExt, LocalStore};

/// Map an arbitrary key to a filesystem-safe file stem.
pub(crate) fn safe_file_stem(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Write through a temp file and rename, so readers never see a half-written blob.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), PersistenceError> {
    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp = std::path::PathBuf::from(tmp_name);
    let mut f = fs::File::create(&tmp).map_err(|e| PersistenceError::io(&tmp, e))?;
    f.write_all(bytes).map_err(|e| PersistenceError::io(&tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| PersistenceError::io(path, e))?;
    Ok(())
}
