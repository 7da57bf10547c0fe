//! Stored hash records and the read-only inspection used to decide how a
//! record is verified. Inspection never attempts to recover the secret; it
//! only reads the algorithm identifier and work factor that the encoded
//! string carries in the clear.

use std::fmt;
use std::str::FromStr;

use argon2::password_hash::PasswordHash;
use argon2::{Algorithm, Params};
use serde::{Deserialize, Serialize};

/// bcrypt records are always `$2?$NN$` + 22 chars of salt + 31 chars of hash.
const BCRYPT_RECORD_LEN: usize = 60;
const BCRYPT_HEADER_LEN: usize = 7;

pub const BCRYPT_MIN_COST: u32 = 4;
pub const BCRYPT_MAX_COST: u32 = 31;

/// Opaque encoded hash owned by the persistence layer.
/// Serializes as a bare string so it drops straight into a text column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HashRecord(String);

impl HashRecord {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Reads the scheme and work factor embedded in the record, if it is well formed.
    pub fn scheme(&self) -> Option<RecordScheme> {
        RecordScheme::parse(&self.0)
    }
}

impl From<String> for HashRecord {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for HashRecord {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl AsRef<str> for HashRecord {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HashRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Algorithm family used to produce new records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashScheme {
    #[default]
    Bcrypt,
    #[serde(alias = "argon2")]
    Argon2id,
}

impl fmt::Display for HashScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HashScheme::Bcrypt => f.write_str("bcrypt"),
            HashScheme::Argon2id => f.write_str("argon2id"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown hash scheme `{0}`; expected `bcrypt` or `argon2id`")]
pub struct UnknownScheme(pub String);

impl FromStr for HashScheme {
    type Err = UnknownScheme;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bcrypt" => Ok(HashScheme::Bcrypt),
            "argon2id" | "argon2" => Ok(HashScheme::Argon2id),
            other => Err(UnknownScheme(other.to_string())),
        }
    }
}

/// Scheme and work factor read back out of a stored record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordScheme {
    Bcrypt {
        cost: u32,
    },
    Argon2id {
        memory_cost_kib: u32,
        time_cost: u32,
        parallelism: u32,
    },
}

impl RecordScheme {
    /// Returns `None` for anything this crate could not have produced.
    pub fn parse(record: &str) -> Option<Self> {
        if record.starts_with("$2") {
            parse_bcrypt(record)
        } else if record.starts_with("$argon2") {
            parse_argon2id(record)
        } else {
            None
        }
    }

    pub fn kind(&self) -> HashScheme {
        match self {
            RecordScheme::Bcrypt { .. } => HashScheme::Bcrypt,
            RecordScheme::Argon2id { .. } => HashScheme::Argon2id,
        }
    }
}

fn is_bcrypt_base64(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'.' || byte == b'/'
}

fn parse_bcrypt(record: &str) -> Option<RecordScheme> {
    let bytes = record.as_bytes();
    if bytes.len() != BCRYPT_RECORD_LEN {
        return None;
    }
    if !matches!(bytes[2], b'a' | b'b' | b'x' | b'y') || bytes[3] != b'$' || bytes[6] != b'$' {
        return None;
    }
    if !bytes[4].is_ascii_digit() || !bytes[5].is_ascii_digit() {
        return None;
    }
    let cost = u32::from(bytes[4] - b'0') * 10 + u32::from(bytes[5] - b'0');
    if !(BCRYPT_MIN_COST..=BCRYPT_MAX_COST).contains(&cost) {
        return None;
    }
    if !bytes[BCRYPT_HEADER_LEN..].iter().copied().all(is_bcrypt_base64) {
        return None;
    }
    Some(RecordScheme::Bcrypt { cost })
}

fn parse_argon2id(record: &str) -> Option<RecordScheme> {
    let parsed = PasswordHash::new(record).ok()?;
    if parsed.algorithm != Algorithm::Argon2id.ident() {
        return None;
    }
    if parsed.salt.is_none() || parsed.hash.is_none() {
        return None;
    }
    let params = Params::try_from(&parsed).ok()?;
    Some(RecordScheme::Argon2id {
        memory_cost_kib: params.m_cost(),
        time_cost: params.t_cost(),
        parallelism: params.p_cost(),
    })
}
