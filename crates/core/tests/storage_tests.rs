// ═══════════════════════════════════════════════════════════════════
// Storage Tests — buckets, encryption, envelope format, StorageManager
// ═══════════════════════════════════════════════════════════════════

use chrono::NaiveDate;
use serde_json::json;

use clientbook_core::errors::CoreError;
use clientbook_core::models::client::{Client, ClientStatus};
use clientbook_core::models::portfolio::{Holding, HoldingType, Portfolio, PortfolioStatus};
use clientbook_core::storage::bucket::{validate_key, KeyValueBucket, MemoryBucket};
use clientbook_core::storage::encrypted_bucket::EncryptedFileBucket;
use clientbook_core::storage::encryption::{derive_key, open, random_salt, seal, KdfParams};
use clientbook_core::storage::file_bucket::FileBucket;
use clientbook_core::storage::format::{Envelope, CURRENT_VERSION, HEADER_LEN, MAGIC};
use clientbook_core::storage::manager::StorageManager;
use clientbook_core::storage::seed::{seed_clients, seed_portfolios};

/// Cheap Argon2 settings so tests stay fast.
fn fast_kdf() -> KdfParams {
    KdfParams {
        memory_cost: 1024,
        time_cost: 1,
        parallelism: 1,
    }
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn sealed_sample() -> Vec<u8> {
    StorageManager::seal_text("hello", "pw", &fast_kdf()).unwrap()
}

// ═══════════════════════════════════════════════════════════════════
// MemoryBucket & key validation
// ═══════════════════════════════════════════════════════════════════

mod memory_bucket {
    use super::*;

    #[test]
    fn missing_key_is_none() {
        let bucket = MemoryBucket::new();
        assert_eq!(bucket.get("clients").unwrap(), None);
        assert!(bucket.is_empty());
    }

    #[test]
    fn set_then_get() {
        let mut bucket = MemoryBucket::new();
        bucket.set("clients", "[]").unwrap();
        assert_eq!(bucket.get("clients").unwrap().as_deref(), Some("[]"));
        assert_eq!(bucket.len(), 1);
    }

    #[test]
    fn set_overwrites() {
        let mut bucket = MemoryBucket::with_entries([("clients", "old")]);
        bucket.set("clients", "new").unwrap();
        assert_eq!(bucket.get("clients").unwrap().as_deref(), Some("new"));
        assert_eq!(bucket.len(), 1);
    }

    #[test]
    fn name() {
        assert_eq!(MemoryBucket::new().name(), "memory");
    }
}

mod keys {
    use super::*;

    #[test]
    fn accepts_plain_and_prefixed_keys() {
        assert!(validate_key("clients").is_ok());
        assert!(validate_key("tab-1.portfolios").is_ok());
        assert!(validate_key("a_b").is_ok());
    }

    #[test]
    fn rejects_unsafe_keys() {
        for key in ["", ".hidden", "../up", "a/b", "a b", "ключ"] {
            assert!(
                matches!(validate_key(key), Err(CoreError::InvalidKey(_))),
                "key {key:?} should be rejected"
            );
        }
    }
}

// ═══════════════════════════════════════════════════════════════════
// FileBucket
// ═══════════════════════════════════════════════════════════════════

mod file_bucket {
    use super::*;

    #[test]
    fn missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let bucket = FileBucket::new(dir.path());
        assert_eq!(bucket.get("clients").unwrap(), None);
    }

    #[test]
    fn set_writes_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut bucket = FileBucket::new(dir.path());
        bucket.set("clients", "[1,2]").unwrap();

        let on_disk = std::fs::read_to_string(dir.path().join("clients.json")).unwrap();
        assert_eq!(on_disk, "[1,2]");
        assert_eq!(bucket.get("clients").unwrap().as_deref(), Some("[1,2]"));
    }

    #[test]
    fn creates_directory_lazily() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("data").join("clientbook");
        let mut bucket = FileBucket::new(&nested);
        assert!(!nested.exists());
        bucket.set("portfolios", "[]").unwrap();
        assert!(nested.join("portfolios.json").exists());
        assert!(!nested.join("portfolios.tmp").exists());
    }

    #[test]
    fn rejects_path_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let mut bucket = FileBucket::new(dir.path());
        assert!(matches!(
            bucket.set("../escape", "x"),
            Err(CoreError::InvalidKey(_))
        ));
    }

    #[test]
    fn unicode_values_survive() {
        let dir = tempfile::tempdir().unwrap();
        let mut bucket = FileBucket::new(dir.path());
        bucket.set("clients", "Zoë 日本語 🚀").unwrap();
        assert_eq!(bucket.get("clients").unwrap().as_deref(), Some("Zoë 日本語 🚀"));
    }
}

// ═══════════════════════════════════════════════════════════════════
// Encryption primitives
// ═══════════════════════════════════════════════════════════════════

mod encryption {
    use super::*;

    #[test]
    fn default_kdf_params_are_valid() {
        assert!(KdfParams::default().validate().is_ok());
    }

    #[test]
    fn derive_key_is_deterministic() {
        let salt = [3u8; 16];
        let k1 = derive_key("secret", &salt, &fast_kdf()).unwrap();
        let k2 = derive_key("secret", &salt, &fast_kdf()).unwrap();
        assert_eq!(k1, k2);
    }

    #[test]
    fn derive_key_depends_on_password_and_salt() {
        let k1 = derive_key("a", &[1u8; 16], &fast_kdf()).unwrap();
        let k2 = derive_key("b", &[1u8; 16], &fast_kdf()).unwrap();
        let k3 = derive_key("a", &[2u8; 16], &fast_kdf()).unwrap();
        assert_ne!(k1, k2);
        assert_ne!(k1, k3);
    }

    #[test]
    fn random_salts_differ() {
        assert_ne!(random_salt().unwrap(), random_salt().unwrap());
    }

    #[test]
    fn seal_then_open() {
        let key = derive_key("pw", &[9u8; 16], &fast_kdf()).unwrap();
        let (nonce, ciphertext) = seal(b"payload", &key).unwrap();
        assert_ne!(ciphertext.as_slice(), b"payload");
        assert_eq!(open(&ciphertext, &key, &nonce).unwrap(), b"payload");
    }

    #[test]
    fn open_with_wrong_key_fails() {
        let key = derive_key("pw", &[9u8; 16], &fast_kdf()).unwrap();
        let other = derive_key("other", &[9u8; 16], &fast_kdf()).unwrap();
        let (nonce, ciphertext) = seal(b"payload", &key).unwrap();
        assert!(matches!(open(&ciphertext, &other, &nonce), Err(CoreError::Decryption)));
    }

    #[test]
    fn tampered_ciphertext_fails() {
        let key = derive_key("pw", &[9u8; 16], &fast_kdf()).unwrap();
        let (nonce, mut ciphertext) = seal(b"payload", &key).unwrap();
        ciphertext[0] ^= 0xff;
        assert!(matches!(open(&ciphertext, &key, &nonce), Err(CoreError::Decryption)));
    }
}

// ═══════════════════════════════════════════════════════════════════
// Envelope format
// ═══════════════════════════════════════════════════════════════════

mod envelope {
    use super::*;

    #[test]
    fn header_layout() {
        let bytes = sealed_sample();
        assert_eq!(&bytes[..4], MAGIC);
        assert_eq!(u16::from_le_bytes([bytes[4], bytes[5]]), CURRENT_VERSION);
        assert!(bytes.len() > HEADER_LEN);
    }

    #[test]
    fn parse_recovers_fields() {
        let envelope = Envelope {
            version: CURRENT_VERSION,
            kdf_params: fast_kdf(),
            salt: [1u8; 16],
            nonce: [2u8; 12],
            ciphertext: vec![7, 8, 9],
        };
        let parsed = Envelope::from_bytes(&envelope.to_bytes()).unwrap();
        assert_eq!(parsed, envelope);
    }

    #[test]
    fn too_short() {
        let err = Envelope::from_bytes(b"CBKT").unwrap_err();
        assert!(matches!(err, CoreError::InvalidFileFormat(_)));
    }

    #[test]
    fn bad_magic() {
        let mut bytes = sealed_sample();
        bytes[0] = b'X';
        assert!(matches!(
            Envelope::from_bytes(&bytes),
            Err(CoreError::InvalidFileFormat(_))
        ));
    }

    #[test]
    fn version_zero_and_future_versions_rejected() {
        for version in [0u16, CURRENT_VERSION + 1] {
            let mut bytes = sealed_sample();
            bytes[4..6].copy_from_slice(&version.to_le_bytes());
            assert!(matches!(
                Envelope::from_bytes(&bytes),
                Err(CoreError::UnsupportedVersion(v)) if v == version
            ));
        }
    }

    #[test]
    fn out_of_range_kdf_params_rejected() {
        let mut bytes = sealed_sample();
        bytes[6..10].copy_from_slice(&0u32.to_le_bytes());
        assert!(matches!(
            Envelope::from_bytes(&bytes),
            Err(CoreError::InvalidFileFormat(_))
        ));
    }

    #[test]
    fn truncated_ciphertext_rejected() {
        let mut bytes = sealed_sample();
        bytes.pop();
        assert!(matches!(
            Envelope::from_bytes(&bytes),
            Err(CoreError::InvalidFileFormat(_))
        ));
    }
}

// ═══════════════════════════════════════════════════════════════════
// StorageManager
// ═══════════════════════════════════════════════════════════════════

mod manager {
    use super::*;

    #[test]
    fn empty_collection_round_trip() {
        let json = StorageManager::serialize_collection::<Client>(&[]).unwrap();
        assert_eq!(json, "[]");
        let back: Vec<Client> = StorageManager::deserialize_collection(&json).unwrap();
        assert!(back.is_empty());
    }

    #[test]
    fn clients_round_trip_with_unicode() {
        let clients = vec![
            Client::new("Zoë Ångström", "zoe@例え.jp", "+48 600 000 000", ClientStatus::Pending)
                .with_id("1"),
            Client::new("", "", "", ClientStatus::Inactive).with_id("2"),
        ];
        let json = StorageManager::serialize_collection(&clients).unwrap();
        let back: Vec<Client> = StorageManager::deserialize_collection(&json).unwrap();
        assert_eq!(back, clients);
    }

    #[test]
    fn portfolios_round_trip_with_optional_fields() {
        let mut odd = Holding::new("9", "GLD", HoldingType::Commodity, 5.0, 50.0);
        odd.extra.insert("note".into(), json!("legacy field"));

        let portfolios = vec![
            Portfolio::new("No Holdings", "A", date(2025, 1, 1), PortfolioStatus::Upcoming).with_id("p1"),
            Portfolio::new("Empty Holdings", "B", date(2024, 2, 29), PortfolioStatus::Closed)
                .with_id("p2")
                .with_holdings(Vec::new()),
            Portfolio::new("Mixed", "Ça va", date(2023, 12, 31), PortfolioStatus::Active)
                .with_id("p3")
                .with_returns(-1.25)
                .with_total_value(1234.5)
                .with_holdings(vec![
                    Holding::new("1", "AAPL", HoldingType::Stock, 50.0, 100.0).with_initial_value(90.0),
                    Holding::new("2", "VTI", HoldingType::Etf, 45.0, 80.0).with_gain_loss(3.5),
                    odd,
                ]),
        ];
        let json = StorageManager::serialize_collection(&portfolios).unwrap();
        let back: Vec<Portfolio> = StorageManager::deserialize_collection(&json).unwrap();
        assert_eq!(back, portfolios);
    }

    #[test]
    fn deserialize_garbage_fails() {
        let err = StorageManager::deserialize_collection::<Client>("{oops").unwrap_err();
        assert!(matches!(err, CoreError::Deserialization(_)));
    }

    #[test]
    fn load_absent_key_is_none() {
        let bucket = MemoryBucket::new();
        let loaded = StorageManager::load_collection::<Client>(&bucket, "clients").unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn persist_then_load() {
        let mut bucket = MemoryBucket::new();
        let clients = seed_clients();
        StorageManager::persist_collection(&mut bucket, "clients", &clients).unwrap();
        let loaded: Vec<Client> = StorageManager::load_collection(&bucket, "clients")
            .unwrap()
            .unwrap();
        assert_eq!(loaded, clients);
    }

    #[test]
    fn seal_and_open_text() {
        let bytes = StorageManager::seal_text("[\"é\"]", "pw", &fast_kdf()).unwrap();
        assert_eq!(StorageManager::open_text(&bytes, "pw").unwrap(), "[\"é\"]");
    }

    #[test]
    fn open_text_wrong_password() {
        let bytes = sealed_sample();
        assert!(matches!(
            StorageManager::open_text(&bytes, "nope"),
            Err(CoreError::Decryption)
        ));
    }

    #[test]
    fn each_seal_uses_fresh_salt_and_nonce() {
        assert_ne!(sealed_sample(), sealed_sample());
    }
}

// ═══════════════════════════════════════════════════════════════════
// EncryptedFileBucket
// ═══════════════════════════════════════════════════════════════════

mod encrypted_bucket {
    use super::*;

    #[test]
    fn set_then_get() {
        let dir = tempfile::tempdir().unwrap();
        let mut bucket = EncryptedFileBucket::new(dir.path(), "pw").with_kdf_params(fast_kdf());
        bucket.set("clients", "[]").unwrap();
        assert!(dir.path().join("clients.cbk").exists());
        assert_eq!(bucket.get("clients").unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn file_is_not_plain_text() {
        let dir = tempfile::tempdir().unwrap();
        let mut bucket = EncryptedFileBucket::new(dir.path(), "pw").with_kdf_params(fast_kdf());
        bucket.set("clients", "John Smith").unwrap();
        let raw = std::fs::read(dir.path().join("clients.cbk")).unwrap();
        assert!(!raw.windows(10).any(|w| w == b"John Smith"));
    }

    #[test]
    fn missing_key_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let bucket = EncryptedFileBucket::new(dir.path(), "pw");
        assert_eq!(bucket.get("portfolios").unwrap(), None);
    }

    #[test]
    fn wrong_password_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = EncryptedFileBucket::new(dir.path(), "right").with_kdf_params(fast_kdf());
        writer.set("clients", "[]").unwrap();

        let reader = EncryptedFileBucket::new(dir.path(), "wrong");
        assert!(matches!(reader.get("clients"), Err(CoreError::Decryption)));
    }

    #[test]
    fn debug_hides_password() {
        let bucket = EncryptedFileBucket::new("/tmp/x", "hunter2");
        let debug = format!("{bucket:?}");
        assert!(debug.contains("EncryptedFileBucket"));
        assert!(!debug.contains("hunter2"));
    }
}

// ═══════════════════════════════════════════════════════════════════
// Seed data
// ═══════════════════════════════════════════════════════════════════

mod seed {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn seed_ids_are_unique_and_present() {
        let clients = seed_clients();
        let ids: HashSet<_> = clients.iter().filter_map(|c| c.id.clone()).collect();
        assert_eq!(ids.len(), clients.len());

        let portfolios = seed_portfolios();
        let ids: HashSet<_> = portfolios.iter().filter_map(|p| p.id.clone()).collect();
        assert_eq!(ids.len(), portfolios.len());
    }

    #[test]
    fn seed_covers_every_status_and_a_portfolio_without_holdings() {
        let portfolios = seed_portfolios();
        for status in PortfolioStatus::ALL {
            assert!(portfolios.iter().any(|p| p.status == status));
        }
        assert!(portfolios.iter().any(|p| p.holdings.is_none()));
    }

    #[test]
    fn seed_portfolio_owners_are_seed_clients() {
        let names: HashSet<String> = seed_clients().into_iter().map(|c| c.name).collect();
        assert!(seed_portfolios().iter().all(|p| names.contains(&p.client)));
    }
}
