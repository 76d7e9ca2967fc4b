use crate::errors::CoreError;

use super::encryption::{KdfParams, NONCE_LEN, SALT_LEN};

/// Magic bytes identifying a Clientbook encrypted bucket entry.
pub const MAGIC: &[u8; 4] = b"CBKT";

/// Current envelope version.
pub const CURRENT_VERSION: u16 = 1;

/// magic(4) + version(2) + kdf params(12) + salt(16) + nonce(12) + ciphertext_len(8)
pub const HEADER_LEN: usize = 4 + 2 + 12 + SALT_LEN + NONCE_LEN + 8;

/// One encrypted value as laid out on disk.
///
/// ```text
/// [CBKT: 4B] [version: 2B LE] [memory_cost: 4B LE] [time_cost: 4B LE]
/// [parallelism: 4B LE] [salt: 16B] [nonce: 12B] [ciphertext_len: 8B LE]
/// [ciphertext: variable]
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub version: u16,
    pub kdf_params: KdfParams,
    pub salt: [u8; SALT_LEN],
    pub nonce: [u8; NONCE_LEN],
    pub ciphertext: Vec<u8>,
}

impl Envelope {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(HEADER_LEN + self.ciphertext.len());
        buf.extend_from_slice(MAGIC);
        buf.extend_from_slice(&self.version.to_le_bytes());
        buf.extend_from_slice(&self.kdf_params.memory_cost.to_le_bytes());
        buf.extend_from_slice(&self.kdf_params.time_cost.to_le_bytes());
        buf.extend_from_slice(&self.kdf_params.parallelism.to_le_bytes());
        buf.extend_from_slice(&self.salt);
        buf.extend_from_slice(&self.nonce);
        buf.extend_from_slice(&(self.ciphertext.len() as u64).to_le_bytes());
        buf.extend_from_slice(&self.ciphertext);
        buf
    }

    /// Parse and sanity-check an envelope. Trailing bytes after the
    /// declared ciphertext are ignored.
    pub fn from_bytes(data: &[u8]) -> Result<Self, CoreError> {
        if data.len() < HEADER_LEN {
            return Err(CoreError::InvalidFileFormat(
                "Data too small to be a CBKT envelope".into(),
            ));
        }
        if &data[..4] != MAGIC {
            return Err(CoreError::InvalidFileFormat(
                "Invalid magic bytes — not a CBKT envelope".into(),
            ));
        }

        let mut reader = Reader { data, offset: 4 };

        let version = u16::from_le_bytes(reader.take::<2>()?);
        if version == 0 || version > CURRENT_VERSION {
            return Err(CoreError::UnsupportedVersion(version));
        }

        let kdf_params = KdfParams {
            memory_cost: u32::from_le_bytes(reader.take::<4>()?),
            time_cost: u32::from_le_bytes(reader.take::<4>()?),
            parallelism: u32::from_le_bytes(reader.take::<4>()?),
        };
        kdf_params.validate()?;

        let salt = reader.take::<SALT_LEN>()?;
        let nonce = reader.take::<NONCE_LEN>()?;
        let declared = u64::from_le_bytes(reader.take::<8>()?);

        let remaining = data.len() - reader.offset;
        let ciphertext_len = usize::try_from(declared)
            .ok()
            .filter(|&len| len <= remaining)
            .ok_or_else(|| {
                CoreError::InvalidFileFormat(format!(
                    "Envelope truncated: expected {declared} bytes of ciphertext, got {remaining}"
                ))
            })?;

        Ok(Self {
            version,
            kdf_params,
            salt,
            nonce,
            ciphertext: data[reader.offset..reader.offset + ciphertext_len].to_vec(),
        })
    }
}

struct Reader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl Reader<'_> {
    fn take<const N: usize>(&mut self) -> Result<[u8; N], CoreError> {
        let bytes: [u8; N] = self
            .data
            .get(self.offset..self.offset + N)
            .and_then(|s| s.try_into().ok())
            .ok_or_else(|| CoreError::InvalidFileFormat("Unexpected end of header".into()))?;
        self.offset += N;
        Ok(bytes)
    }
}
