//! Directory-backed store
//!
//! One file per key. File names are the unpadded base64url form of the key so
//! arbitrary keys (`compiler:state:<id>`) map to portable names and can be
//! listed back. Writes go through a temp file and a rename so a crash never
//! leaves a half-written value behind.

use super::{KeyValueStore, StorageError};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// `ENOSPC`: the device has no space left.
#[cfg(unix)]
const NO_SPACE_LEFT: i32 = 28;
/// `ERROR_DISK_FULL`
#[cfg(windows)]
const NO_SPACE_LEFT: i32 = 112;
#[cfg(not(any(unix, windows)))]
const NO_SPACE_LEFT: i32 = -1;

/// [`KeyValueStore`] persisted as files under a directory
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Extension used for in-flight writes
    const TEMP_EXT: &'static str = "tmp";

    /// Create a store rooted at `dir`. The directory is created lazily on
    /// first write.
    pub fn with_dir(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn base_dir(&self) -> &Path {
        &self.dir
    }

    /// Ensure the store directory exists
    pub fn ensure_dir(&self) -> io::Result<()> {
        fs::create_dir_all(&self.dir)
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(URL_SAFE_NO_PAD.encode(key.as_bytes()))
    }

    fn key_for(file_name: &str) -> Option<String> {
        let bytes = URL_SAFE_NO_PAD.decode(file_name).ok()?;
        String::from_utf8(bytes).ok()
    }

    /// Perform an atomic write: write to temp file, then rename
    fn atomic_write(&self, target: &Path, content: &[u8]) -> io::Result<()> {
        let temp_path = target.with_extension(Self::TEMP_EXT);

        let mut file = File::create(&temp_path)?;
        file.write_all(content)?;
        drop(file);

        fs::rename(&temp_path, target)
    }

    fn map_write_error(key: &str, err: io::Error) -> StorageError {
        if err.raw_os_error() == Some(NO_SPACE_LEFT) {
            StorageError::QuotaExceeded {
                key: key.to_string(),
            }
        } else {
            StorageError::Io(err.to_string())
        }
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.ensure_dir()?;
        self.atomic_write(&self.path_for(key), value.as_bytes())
            .map_err(|e| Self::map_write_error(key, e))
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            if let Some(name) = entry.file_name().to_str() {
                if name.ends_with(&format!(".{}", Self::TEMP_EXT)) {
                    continue;
                }
                match Self::key_for(name) {
                    Some(key) => keys.push(key),
                    None => tracing::debug!("Ignoring foreign file in store dir: {}", name),
                }
            }
        }
        keys.sort();
        Ok(keys)
    }
}
