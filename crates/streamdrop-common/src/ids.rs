//! Share identifiers.
//!
//! A [`ShareId`] is the public capability token embedded in every link: eight
//! characters from `[A-Za-z0-9]`, drawn from the operating system's CSPRNG.
//! The generator never narrows the alphabet; if the random source fails the
//! caller gets [`Error::RandomSource`] and must not persist anything.

use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Number of characters in a share ID.
pub const SHARE_ID_LEN: usize = 8;

const ALPHABET: &[u8; 62] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Largest multiple of 62 that fits in a byte; bytes at or above it are
/// rejected so every symbol is equally likely.
const REJECT_AT: u8 = 248;

/// Public identifier of a registered file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ShareId(String);

impl ShareId {
    /// Generate a new random ID from the OS random source.
    pub fn generate() -> Result<Self> {
        Self::generate_from(&mut OsRng)
    }

    /// Generate a new ID from an arbitrary RNG.
    pub fn generate_from<R: RngCore + ?Sized>(rng: &mut R) -> Result<Self> {
        let mut id = String::with_capacity(SHARE_ID_LEN);
        let mut buf = [0u8; 16];

        while id.len() < SHARE_ID_LEN {
            rng.try_fill_bytes(&mut buf)
                .map_err(|e| Error::RandomSource(e.to_string()))?;

            for &b in &buf {
                if b >= REJECT_AT {
                    continue;
                }
                id.push(ALPHABET[(b % 62) as usize] as char);
                if id.len() == SHARE_ID_LEN {
                    break;
                }
            }
        }

        Ok(Self(id))
    }

    /// Borrow the ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check whether `s` has the shape of a share ID.
    pub fn is_valid(s: &str) -> bool {
        s.len() == SHARE_ID_LEN && s.bytes().all(|b| b.is_ascii_alphanumeric())
    }
}

impl fmt::Display for ShareId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ShareId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if Self::is_valid(s) {
            Ok(Self(s.to_string()))
        } else {
            Err(Error::Validation(format!("malformed share id: {s:?}")))
        }
    }
}

impl TryFrom<String> for ShareId {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        if Self::is_valid(&s) {
            Ok(Self(s))
        } else {
            Err(Error::Validation(format!("malformed share id: {s:?}")))
        }
    }
}

impl From<ShareId> for String {
    fn from(id: ShareId) -> Self {
        id.0
    }
}

impl AsRef<str> for ShareId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
