//! Content digests.
//!
//! A digest has the form `algorithm:encoded` (for example
//! `sha256:4a8b...`) and uniquely identifies a blob or manifest.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256, Sha512};

use crate::error::{CoreError, Result};

/// A validated content digest.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentDigest {
    value: String,
    split: usize,
}

impl ContentDigest {
    /// The SHA-256 algorithm identifier.
    pub const SHA256: &'static str = "sha256";

    /// The SHA-512 algorithm identifier.
    pub const SHA512: &'static str = "sha512";

    /// Parses and validates a digest string.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidDigest`] if the string is not of the form
    /// `algorithm:encoded`, or if a known algorithm has an encoded part of the
    /// wrong length.
    ///
    /// # Examples
    ///
    /// ```
    /// use pullcache_core::ContentDigest;
    ///
    /// let digest = ContentDigest::parse(
    ///     "sha256:2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824",
    /// )?;
    /// assert_eq!(digest.algorithm(), "sha256");
    /// # Ok::<(), pullcache_core::CoreError>(())
    /// ```
    pub fn parse(input: &str) -> Result<Self> {
        let invalid = |reason: &str| CoreError::InvalidDigest {
            digest: input.to_string(),
            reason: reason.to_string(),
        };

        let split = input
            .find(':')
            .ok_or_else(|| invalid("missing algorithm separator"))?;
        let (algorithm, encoded) = (&input[..split], &input[split + 1..]);

        if !is_valid_algorithm(algorithm) {
            return Err(invalid("malformed algorithm"));
        }
        if encoded.is_empty()
            || !encoded
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'=' | b'_' | b'-'))
        {
            return Err(invalid("malformed encoded value"));
        }

        let expected_len = match algorithm {
            Self::SHA256 => Some(64),
            Self::SHA512 => Some(128),
            _ => None,
        };
        if let Some(len) = expected_len {
            if encoded.len() != len
                || !encoded
                    .bytes()
                    .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
            {
                return Err(invalid(&format!(
                    "{algorithm} requires {len} lowercase hex characters"
                )));
            }
        }

        Ok(Self {
            value: input.to_string(),
            split,
        })
    }

    /// Computes the SHA-256 digest of `data`.
    #[must_use]
    pub fn sha256_of(data: &[u8]) -> Self {
        let value = format!("{}:{}", Self::SHA256, hex::encode(Sha256::digest(data)));
        Self {
            value,
            split: Self::SHA256.len(),
        }
    }

    /// Returns the algorithm portion (e.g. `sha256`).
    #[must_use]
    pub fn algorithm(&self) -> &str {
        &self.value[..self.split]
    }

    /// Returns the encoded portion without the algorithm prefix.
    #[must_use]
    pub fn encoded(&self) -> &str {
        &self.value[self.split + 1..]
    }

    /// Returns the full digest string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// Creates an incremental hasher for this digest's algorithm.
    ///
    /// Returns `None` for algorithms that cannot be verified locally.
    #[must_use]
    pub fn hasher(&self) -> Option<DigestHasher> {
        match self.algorithm() {
            Self::SHA256 => Some(DigestHasher::Sha256(Sha256::new())),
            Self::SHA512 => Some(DigestHasher::Sha512(Sha512::new())),
            _ => None,
        }
    }
}

/// Incremental hasher producing a [`ContentDigest`].
#[derive(Debug, Clone)]
pub enum DigestHasher {
    /// SHA-256 state.
    Sha256(Sha256),
    /// SHA-512 state.
    Sha512(Sha512),
}

impl DigestHasher {
    /// Feeds more bytes into the hasher.
    pub fn update(&mut self, data: &[u8]) {
        match self {
            Self::Sha256(h) => h.update(data),
            Self::Sha512(h) => h.update(data),
        }
    }

    /// Consumes the hasher and returns the digest.
    #[must_use]
    pub fn finalize(self) -> ContentDigest {
        let (algorithm, encoded) = match self {
            Self::Sha256(h) => (ContentDigest::SHA256, hex::encode(h.finalize())),
            Self::Sha512(h) => (ContentDigest::SHA512, hex::encode(h.finalize())),
        };
        ContentDigest {
            value: format!("{algorithm}:{encoded}"),
            split: algorithm.len(),
        }
    }
}

fn is_valid_algorithm(algorithm: &str) -> bool {
    if algorithm.is_empty() {
        return false;
    }
    let mut prev_sep = true;
    for b in algorithm.bytes() {
        if b.is_ascii_lowercase() || b.is_ascii_digit() {
            prev_sep = false;
        } else if matches!(b, b'+' | b'.' | b'_' | b'-') {
            if prev_sep {
                return false;
            }
            prev_sep = true;
        } else {
            return false;
        }
    }
    !prev_sep
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

impl FromStr for ContentDigest {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl AsRef<str> for ContentDigest {
    fn as_ref(&self) -> &str {
        &self.value
    }
}

impl Serialize for ContentDigest {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.value)
    }
}

impl<'de> Deserialize<'de> for ContentDigest {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}
