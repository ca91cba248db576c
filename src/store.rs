use std::fs::{self, File};
use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use tempfile::Builder;

use crate::error::SyncError;

pub const MAP_EXTENSION: &str = "jpg";
pub const SOUND_EXTENSION: &str = "mp3";
pub const CREDITS_FILE: &str = "credits.json";

/// On-disk layout of the asset tree.
#[derive(Debug, Clone)]
pub struct Store {
    map_root: Utf8PathBuf,
    sound_root: Utf8PathBuf,
}

impl Store {
    pub fn new(map_root: Utf8PathBuf, sound_root: Utf8PathBuf) -> Self {
        Self {
            map_root,
            sound_root,
        }
    }

    pub fn map_root(&self) -> &Utf8Path {
        &self.map_root
    }

    pub fn sound_root(&self) -> &Utf8Path {
        &self.sound_root
    }

    pub fn map_path(&self, asset_name: &str) -> Utf8PathBuf {
        self.map_root.join(format!("{asset_name}.{MAP_EXTENSION}"))
    }

    pub fn sound_dir(&self, asset_name: &str) -> Utf8PathBuf {
        self.sound_root.join(asset_name)
    }

    pub fn sound_path(&self, asset_name: &str) -> Utf8PathBuf {
        self.sound_dir(asset_name)
            .join(format!("{asset_name}.{SOUND_EXTENSION}"))
    }

    pub fn credits_path(&self, asset_name: &str) -> Utf8PathBuf {
        self.sound_dir(asset_name).join(CREDITS_FILE)
    }

    pub fn ensure_roots(&self) -> Result<(), SyncError> {
        fs::create_dir_all(self.map_root.as_std_path())
            .map_err(|err| SyncError::Filesystem(err.to_string()))?;
        fs::create_dir_all(self.sound_root.as_std_path())
            .map_err(|err| SyncError::Filesystem(err.to_string()))
    }

    /// True if `dir` holds at least one file with the audio extension.
    pub fn has_audio(dir: &Utf8Path) -> Result<bool, SyncError> {
        if !dir.as_std_path().is_dir() {
            return Ok(false);
        }
        let entries =
            fs::read_dir(dir.as_std_path()).map_err(|err| SyncError::Filesystem(err.to_string()))?;
        for entry in entries {
            let entry = entry.map_err(|err| SyncError::Filesystem(err.to_string()))?;
            let path = entry.path();
            if path.is_file()
                && path
                    .extension()
                    .map(|ext| ext == SOUND_EXTENSION)
                    .unwrap_or(false)
            {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Fills a temporary file next to `path` and renames it over `path` only
    /// after `fill` succeeds. On failure the temporary file is removed and
    /// `path` keeps its previous content (or stays absent).
    pub fn write_with_atomic<F>(path: &Utf8Path, fill: F) -> Result<u64, SyncError>
    where
        F: FnOnce(&mut File) -> Result<u64, SyncError>,
    {
        let parent = path
            .parent()
            .ok_or_else(|| SyncError::Filesystem("invalid destination path".to_string()))?;
        let parent = if parent.as_str().is_empty() {
            Utf8Path::new(".")
        } else {
            parent
        };
        fs::create_dir_all(parent.as_std_path())
            .map_err(|err| SyncError::Filesystem(err.to_string()))?;
        let mut temp = Builder::new()
            .prefix(".species-sync")
            .suffix(".tmp")
            .tempfile_in(parent.as_std_path())
            .map_err(|err| SyncError::Filesystem(err.to_string()))?;
        let written = fill(temp.as_file_mut())?;
        temp.as_file()
            .sync_all()
            .map_err(|err| SyncError::Filesystem(err.to_string()))?;
        temp.persist(path.as_std_path())
            .map_err(|err| SyncError::Filesystem(err.to_string()))?;
        Ok(written)
    }

    pub fn write_bytes_atomic(path: &Utf8Path, content: &[u8]) -> Result<(), SyncError> {
        Self::write_with_atomic(path, |file| {
            io::Write::write_all(file, content)
                .map_err(|err| SyncError::Filesystem(err.to_string()))?;
            Ok(content.len() as u64)
        })?;
        Ok(())
    }

    pub fn write_json_atomic<T: Serialize + ?Sized>(
        path: &Utf8Path,
        value: &T,
    ) -> Result<(), SyncError> {
        let content = serde_json::to_vec_pretty(value)
            .map_err(|err| SyncError::Filesystem(err.to_string()))?;
        Self::write_bytes_atomic(path, &content)
    }
}

/// Existence checks used by the completeness report.
pub trait AssetProbe {
    fn exists(&self, path: &Utf8Path) -> bool;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs;

impl AssetProbe for LocalFs {
    fn exists(&self, path: &Utf8Path) -> bool {
        path.as_std_path().exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> (tempfile::TempDir, Store) {
        let temp = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
        let store = Store::new(root.join("Verbreitungskarten"), root.join("sounds"));
        (temp, store)
    }

    #[test]
    fn layout_paths() {
        let (_temp, store) = temp_store();
        assert!(
            store
                .map_path("Amsel")
                .ends_with("Verbreitungskarten/Amsel.jpg")
        );
        assert!(store.sound_path("Amsel").ends_with("sounds/Amsel/Amsel.mp3"));
        assert!(
            store
                .credits_path("Amsel")
                .ends_with("sounds/Amsel/credits.json")
        );
    }

    #[test]
    fn detects_audio_files_only() {
        let (_temp, store) = temp_store();
        let dir = store.sound_dir("Amsel");
        assert!(!Store::has_audio(&dir).unwrap());

        fs::create_dir_all(dir.as_std_path()).unwrap();
        fs::write(dir.join("credits.json").as_std_path(), b"{}").unwrap();
        fs::write(dir.join(".species-sync123.tmp").as_std_path(), b"partial").unwrap();
        assert!(!Store::has_audio(&dir).unwrap());

        fs::write(dir.join("other.mp3").as_std_path(), b"id3").unwrap();
        assert!(Store::has_audio(&dir).unwrap());
    }

    #[test]
    fn failed_fill_leaves_no_file() {
        let (_temp, store) = temp_store();
        let path = store.map_path("Amsel");

        let result = Store::write_with_atomic(&path, |file| {
            io::Write::write_all(file, b"half an ima").unwrap();
            Err(SyncError::RegistryHttp("connection reset".to_string()))
        });

        assert!(result.is_err());
        assert!(!path.as_std_path().exists());
        let leftovers = fs::read_dir(store.map_root().as_std_path()).unwrap().count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn failed_fill_keeps_previous_content() {
        let (_temp, store) = temp_store();
        let path = store.map_path("Amsel");
        Store::write_bytes_atomic(&path, b"old map").unwrap();

        let result = Store::write_with_atomic(&path, |file| {
            io::Write::write_all(file, b"new").unwrap();
            Err(SyncError::RegistryHttp("timeout".to_string()))
        });

        assert!(result.is_err());
        assert_eq!(fs::read(path.as_std_path()).unwrap(), b"old map");
    }
}
