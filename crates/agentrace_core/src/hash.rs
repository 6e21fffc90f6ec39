//! State fingerprints for checkpoint identity.
//!
//! A state hash is the first 8 bytes (16 lowercase hex characters) of a
//! cryptographic digest over the canonical state bytes. SHA-256 is the
//! default; BLAKE3 is available for deployments that prefer it.

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Digest used to fingerprint checkpoint state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    /// SHA-256
    #[default]
    Sha256,
    /// BLAKE3
    Blake3,
}

impl HashAlgorithm {
    /// Get algorithm name
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
            Self::Blake3 => "blake3",
        }
    }

    /// Full digest of `data`
    #[must_use]
    pub fn digest(&self, data: &[u8]) -> Vec<u8> {
        match self {
            Self::Sha256 => Sha256::digest(data).to_vec(),
            Self::Blake3 => blake3::hash(data).as_bytes().to_vec(),
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Truncated state fingerprint (16 lowercase hex characters)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StateHash(String);

impl StateHash {
    /// Number of hex characters in a state hash
    pub const LEN: usize = 16;

    /// Fingerprint data with the default algorithm
    #[must_use]
    pub fn compute(data: &[u8]) -> Self {
        Self::compute_with(HashAlgorithm::default(), data)
    }

    /// Fingerprint data with an explicit algorithm
    #[must_use]
    pub fn compute_with(algorithm: HashAlgorithm, data: &[u8]) -> Self {
        let digest = algorithm.digest(data);
        Self(hex::encode(&digest[..Self::LEN / 2]))
    }

    /// Parse from hex string
    ///
    /// # Errors
    ///
    /// Returns error unless `hex` is exactly 16 lowercase hex characters
    pub fn from_hex(hex: &str) -> CoreResult<Self> {
        if hex.len() != Self::LEN {
            return Err(CoreError::InvalidHash {
                reason: format!("expected {} hex characters, got {}", Self::LEN, hex.len()),
            });
        }
        if !hex.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) {
            return Err(CoreError::InvalidHash {
                reason: format!("not lowercase hex: {hex}"),
            });
        }
        Ok(Self(hex.to_string()))
    }

    /// Get as hex string
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check that `data` fingerprints to this hash
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::HashMismatch`] when the recomputed hash differs
    pub fn verify(&self, algorithm: HashAlgorithm, data: &[u8]) -> CoreResult<()> {
        let actual = Self::compute_with(algorithm, data);
        if actual == *self {
            Ok(())
        } else {
            Err(CoreError::HashMismatch {
                expected: self.0.clone(),
                actual: actual.0,
            })
        }
    }
}

impl fmt::Display for StateHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for StateHash {
    type Error = CoreError;

    fn try_from(value: String) -> CoreResult<Self> {
        Self::from_hex(&value)
    }
}

impl From<StateHash> for String {
    fn from(hash: StateHash) -> Self {
        hash.0
    }
}
