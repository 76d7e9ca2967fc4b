use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::errors::CoreError;

use super::bucket::{validate_key, KeyValueBucket};

/// File extension for plain bucket entries.
pub const FILE_EXTENSION: &str = "json";

/// Bucket storing each key as a plain text file `<dir>/<key>.json`.
///
/// The directory is created on the first write. Writes go to a temporary
/// file that is then renamed over the target, so a crash mid-write leaves
/// the previous value intact.
#[derive(Debug, Clone)]
pub struct FileBucket {
    dir: PathBuf,
}

impl FileBucket {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file holding `key`.
    pub fn path_for(&self, key: &str) -> Result<PathBuf, CoreError> {
        validate_key(key)?;
        Ok(self.dir.join(format!("{key}.{FILE_EXTENSION}")))
    }
}

impl KeyValueBucket for FileBucket {
    fn name(&self) -> &str {
        "file"
    }

    fn get(&self, key: &str) -> Result<Option<String>, CoreError> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), CoreError> {
        let path = self.path_for(key)?;
        write_replacing(&self.dir, &path, value.as_bytes())
    }
}

/// Write `bytes` to `path` through a sibling temp file and a rename.
pub(crate) fn write_replacing(dir: &Path, path: &Path, bytes: &[u8]) -> Result<(), CoreError> {
    fs::create_dir_all(dir)?;
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)?;
    Ok(())
}
