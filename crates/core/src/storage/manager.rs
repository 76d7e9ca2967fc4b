use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::errors::CoreError;

use super::bucket::KeyValueBucket;
use super::encryption::{self, KdfParams};
use super::format::{Envelope, CURRENT_VERSION};

/// High-level storage operations: collections to/from JSON text, and
/// JSON text to/from encrypted bytes.
pub struct StorageManager;

impl StorageManager {
    /// Serialize a whole collection to JSON text.
    pub fn serialize_collection<T: Serialize>(records: &[T]) -> Result<String, CoreError> {
        serde_json::to_string(records)
            .map_err(|e| CoreError::Serialization(format!("Failed to serialize collection: {e}")))
    }

    /// Parse a whole collection from JSON text.
    pub fn deserialize_collection<T: DeserializeOwned>(json: &str) -> Result<Vec<T>, CoreError> {
        serde_json::from_str(json)
            .map_err(|e| CoreError::Deserialization(format!("Failed to deserialize collection: {e}")))
    }

    /// Read the collection stored under `key`.
    /// `Ok(None)` means the bucket holds nothing for that key.
    pub fn load_collection<T: DeserializeOwned>(
        bucket: &dyn KeyValueBucket,
        key: &str,
    ) -> Result<Option<Vec<T>>, CoreError> {
        match bucket.get(key)? {
            Some(json) => Self::deserialize_collection(&json).map(Some),
            None => Ok(None),
        }
    }

    /// Overwrite the value under `key` with the full collection.
    pub fn persist_collection<T: Serialize>(
        bucket: &mut dyn KeyValueBucket,
        key: &str,
        records: &[T],
    ) -> Result<(), CoreError> {
        let json = Self::serialize_collection(records)?;
        bucket.set(key, &json)
    }

    /// Encrypt text into envelope bytes.
    ///
    /// Flow: text → AES-256-GCM(Argon2id(password, fresh salt)) → CBKT bytes
    pub fn seal_text(text: &str, password: &str, kdf_params: &KdfParams) -> Result<Vec<u8>, CoreError> {
        let salt = encryption::random_salt()?;
        let key = encryption::derive_key(password, &salt, kdf_params)?;
        let (nonce, ciphertext) = encryption::seal(text.as_bytes(), &key)?;

        Ok(Envelope {
            version: CURRENT_VERSION,
            kdf_params: *kdf_params,
            salt,
            nonce,
            ciphertext,
        }
        .to_bytes())
    }

    /// Decrypt envelope bytes back into text.
    ///
    /// Flow: CBKT bytes → header → Argon2id(password, stored salt) → AES-256-GCM → UTF-8
    pub fn open_text(data: &[u8], password: &str) -> Result<String, CoreError> {
        let envelope = Envelope::from_bytes(data)?;
        let key = encryption::derive_key(password, &envelope.salt, &envelope.kdf_params)?;
        let plaintext = encryption::open(&envelope.ciphertext, &key, &envelope.nonce)?;
        String::from_utf8(plaintext)
            .map_err(|e| CoreError::Deserialization(format!("Decrypted value is not UTF-8: {e}")))
    }
}
