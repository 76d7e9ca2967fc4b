use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

/// Store configuration.
///
/// Can be built in code or parsed from JSON, e.g.
/// `{"persistWrites": false, "keyPrefix": "tab-1"}`. Missing fields take
/// their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoreSettings {
    /// Write each affected collection to the bucket after every mutation.
    pub persist_writes: bool,

    /// Fall back to the built-in seed data when a collection has nothing
    /// stored. When off, the collection starts empty instead.
    pub seed_when_empty: bool,

    /// Optional namespace for bucket keys. With a prefix `p` the keys become
    /// `p.clients` and `p.portfolios`; without one they are the bare
    /// collection names.
    pub key_prefix: Option<String>,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            persist_writes: true,
            seed_when_empty: true,
            key_prefix: None,
        }
    }
}

impl StoreSettings {
    /// Parse settings from a JSON document.
    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        let settings: StoreSettings = serde_json::from_str(json)
            .map_err(|e| CoreError::InvalidSettings(e.to_string()))?;
        if let Some(prefix) = &settings.key_prefix {
            if prefix.trim().is_empty() {
                return Err(CoreError::InvalidSettings(
                    "keyPrefix must not be blank".into(),
                ));
            }
        }
        Ok(settings)
    }

    /// Bucket key for a collection name, honoring `key_prefix`.
    pub fn key_for(&self, collection: &str) -> String {
        match &self.key_prefix {
            Some(prefix) => format!("{prefix}.{collection}"),
            None => collection.to_string(),
        }
    }
}
