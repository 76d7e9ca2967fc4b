use std::collections::HashMap;

use crate::errors::CoreError;

/// Durable key-value storage the store persists collections into.
///
/// The store never talks to a storage backend directly: it is handed one of
/// these and calls `get` on start-up and `set` after each write. Swapping
/// backends (memory, plain files, encrypted files, a host-provided
/// local-storage shim) touches nothing else.
pub trait KeyValueBucket: Send {
    /// Human-readable name of this bucket (for logs/errors).
    fn name(&self) -> &str;

    /// Stored value for `key`, or `None` if nothing was ever stored.
    fn get(&self, key: &str) -> Result<Option<String>, CoreError>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&mut self, key: &str, value: &str) -> Result<(), CoreError>;
}

/// Volatile bucket backed by a `HashMap`. Lives as long as the process.
#[derive(Debug, Clone, Default)]
pub struct MemoryBucket {
    entries: HashMap<String, String>,
}

impl MemoryBucket {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bucket pre-filled with `(key, value)` pairs.
    pub fn with_entries<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyValueBucket for MemoryBucket {
    fn name(&self) -> &str {
        "memory"
    }

    fn get(&self, key: &str) -> Result<Option<String>, CoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), CoreError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Check that `key` is safe to use as a file name stem.
///
/// Allowed: ASCII letters, digits, `.`, `_`, `-`; must not start with `.`.
pub fn validate_key(key: &str) -> Result<(), CoreError> {
    let valid = !key.is_empty()
        && !key.starts_with('.')
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
    if valid {
        Ok(())
    } else {
        Err(CoreError::InvalidKey(key.to_string()))
    }
}
