use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::errors::CoreError;

use super::bucket::{validate_key, KeyValueBucket};
use super::encryption::KdfParams;
use super::file_bucket::write_replacing;
use super::manager::StorageManager;

/// File extension for encrypted bucket entries.
pub const FILE_EXTENSION: &str = "cbk";

/// Bucket storing each key as a password-encrypted file `<dir>/<key>.cbk`.
///
/// Every write draws a fresh salt and nonce. Reading with the wrong password
/// fails with `CoreError::Decryption`, which the store treats like any other
/// unreadable value.
pub struct EncryptedFileBucket {
    dir: PathBuf,
    password: String,
    kdf_params: KdfParams,
}

impl std::fmt::Debug for EncryptedFileBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptedFileBucket")
            .field("dir", &self.dir)
            .field("kdf_params", &self.kdf_params)
            .finish_non_exhaustive()
    }
}

impl EncryptedFileBucket {
    pub fn new(dir: impl Into<PathBuf>, password: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            password: password.into(),
            kdf_params: KdfParams::default(),
        }
    }

    /// Use custom key-derivation cost for new writes.
    pub fn with_kdf_params(mut self, kdf_params: KdfParams) -> Self {
        self.kdf_params = kdf_params;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &str) -> Result<PathBuf, CoreError> {
        validate_key(key)?;
        Ok(self.dir.join(format!("{key}.{FILE_EXTENSION}")))
    }
}

impl KeyValueBucket for EncryptedFileBucket {
    fn name(&self) -> &str {
        "encrypted-file"
    }

    fn get(&self, key: &str) -> Result<Option<String>, CoreError> {
        let path = self.path_for(key)?;
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        StorageManager::open_text(&bytes, &self.password).map(Some)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), CoreError> {
        let path = self.path_for(key)?;
        let bytes = StorageManager::seal_text(value, &self.password, &self.kdf_params)?;
        write_replacing(&self.dir, &path, &bytes)
    }
}
