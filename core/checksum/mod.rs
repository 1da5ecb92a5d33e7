//! # Checksum Resolution
//!
//! Turns the user-supplied checksum string and algorithm name into an [ExpectedChecksum] that the
//! fetch engine verifies downloads against.
//!
//! Resolution rules:
//!
//! * An empty checksum string means no verification. This is a valid configuration.
//! * A checksum that is not valid hex (odd length, non-hex characters) is a configuration error.
//! * The algorithm `none` means no verification.
//! * An empty algorithm name is inferred from the length of the decoded digest: 16 bytes is MD5,
//!   20 is SHA-1, 32 is SHA-256 and 64 is SHA-512. Any other length skips verification.
//! * An algorithm we don't know skips verification.
//!
mod hasher;

pub use hasher::*;

use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::warn;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChecksumType {
    Md5,
    Sha1,
    Sha256,
    Sha512,
}

impl ChecksumType {
    /// Guess the algorithm that produces digests of `len` bytes.
    pub fn from_digest_len(len: usize) -> Option<ChecksumType> {
        match len {
            16 => Some(ChecksumType::Md5),
            20 => Some(ChecksumType::Sha1),
            32 => Some(ChecksumType::Sha256),
            64 => Some(ChecksumType::Sha512),
            _ => None,
        }
    }

    /// The length in bytes of a digest produced by this algorithm.
    pub fn digest_len(&self) -> usize {
        match self {
            ChecksumType::Md5 => 16,
            ChecksumType::Sha1 => 20,
            ChecksumType::Sha256 => 32,
            ChecksumType::Sha512 => 64,
        }
    }

    pub fn hasher(&self) -> ChecksumHasher {
        ChecksumHasher::new(*self)
    }
}

impl fmt::Display for ChecksumType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChecksumType::Md5 => "md5",
            ChecksumType::Sha1 => "sha1",
            ChecksumType::Sha256 => "sha256",
            ChecksumType::Sha512 => "sha512",
        };
        f.write_str(name)
    }
}

impl FromStr for ChecksumType {
    type Err = ChecksumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "md5" => Ok(ChecksumType::Md5),
            "sha1" => Ok(ChecksumType::Sha1),
            "sha256" => Ok(ChecksumType::Sha256),
            "sha512" => Ok(ChecksumType::Sha512),
            _ => Err(ChecksumError::UnknownType {
                name: s.to_string(),
            }),
        }
    }
}

/// A digest we expect a downloaded file to have, together with the algorithm that produces it.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ExpectedChecksum {
    kind: ChecksumType,
    digest: Vec<u8>,
}

impl ExpectedChecksum {
    pub fn new(kind: ChecksumType, digest: Vec<u8>) -> Self {
        Self { kind, digest }
    }

    /// Resolve a hex-encoded `checksum` and an algorithm name into the checksum a download should
    /// be verified against. `Ok(None)` means verification is skipped.
    pub fn resolve(
        checksum: &str,
        checksum_type: &str,
    ) -> Result<Option<ExpectedChecksum>, ChecksumError> {
        let checksum = checksum.trim();
        if checksum.is_empty() {
            return Ok(None);
        }

        let digest = hex::decode(checksum).map_err(|err| ChecksumError::InvalidHex {
            checksum: checksum.to_string(),
            err,
        })?;

        let name = checksum_type.trim();
        if name.eq_ignore_ascii_case("none") {
            return Ok(None);
        }

        let kind = if name.is_empty() {
            match ChecksumType::from_digest_len(digest.len()) {
                Some(kind) => kind,
                None => {
                    warn!(
                        "Could not infer a checksum type for a {} byte digest, skipping verification",
                        digest.len()
                    );
                    return Ok(None);
                }
            }
        } else {
            match name.parse::<ChecksumType>() {
                Ok(kind) => kind,
                Err(err) => {
                    warn!("{}, skipping verification", err);
                    return Ok(None);
                }
            }
        };

        Ok(Some(ExpectedChecksum { kind, digest }))
    }

    pub fn kind(&self) -> ChecksumType {
        self.kind
    }

    pub fn digest(&self) -> &[u8] {
        &self.digest
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.digest)
    }

    pub fn matches(&self, found: &[u8]) -> bool {
        self.digest == found
    }
}

#[derive(Error, Debug)]
pub enum ChecksumError {
    #[error("Error parsing checksum {checksum:?}: {err}")]
    InvalidHex {
        checksum: String,
        err: hex::FromHexError,
    },

    #[error("Unsupported checksum type {name:?}")]
    UnknownType { name: String },
}
