use std::collections::BTreeMap;
use std::fs;

use camino::{Utf8Path, Utf8PathBuf};

use crate::error::SyncError;
use crate::error_log::ErrorLog;
use crate::store::Store;

/// Last synchronized assessment id per asset name.
///
/// Loaded once per run and written through to disk on every update. Entries
/// are never removed; a stale entry only causes a re-download.
#[derive(Debug, Clone)]
pub struct AssessmentIdCache {
    path: Utf8PathBuf,
    entries: BTreeMap<String, u64>,
}

impl AssessmentIdCache {
    /// Reads the cache file. A missing file yields an empty cache; an
    /// unreadable or corrupt one is reported as an error so the caller can
    /// decide whether to start empty.
    pub fn load(path: Utf8PathBuf) -> Result<Self, SyncError> {
        if !path.as_std_path().exists() {
            return Ok(Self::empty(path));
        }
        let content = fs::read_to_string(path.as_std_path())
            .map_err(|err| SyncError::Filesystem(format!("read {path}: {err}")))?;
        let entries: BTreeMap<String, u64> = serde_json::from_str(&content)
            .map_err(|err| SyncError::Filesystem(format!("parse {path}: {err}")))?;
        Ok(Self { path, entries })
    }

    /// Like [`load`](Self::load), but a cache that cannot be read starts
    /// empty. The failure goes to the error log since a lost cache forces a
    /// full map re-download.
    pub fn load_or_empty(path: Utf8PathBuf, errors: &ErrorLog) -> Self {
        match Self::load(path.clone()) {
            Ok(cache) => cache,
            Err(err) => {
                errors.append(&format!("assessment cache ignored: {err}"));
                Self::empty(path)
            }
        }
    }

    pub fn empty(path: Utf8PathBuf) -> Self {
        Self {
            path,
            entries: BTreeMap::new(),
        }
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    pub fn get(&self, asset_name: &str) -> Option<u64> {
        self.entries.get(asset_name).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Updates one entry and persists the whole map before returning.
    pub fn record(&mut self, asset_name: &str, assessment_id: u64) -> Result<(), SyncError> {
        self.entries.insert(asset_name.to_string(), assessment_id);
        self.persist()
    }

    pub fn persist(&self) -> Result<(), SyncError> {
        Store::write_json_atomic(&self.path, &self.entries)
    }
}
