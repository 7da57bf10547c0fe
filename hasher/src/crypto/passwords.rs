//! Credential hashing built around bcrypt, with Argon2id as an alternative
//! scheme. The work factor is fixed per `CredentialHasher` so that every
//! record it produces carries the same cost parameters.
//!
//! Verification fails closed: malformed records, records from a scheme other
//! than the configured one, records whose work factor exceeds the ceiling
//! above the configured one, and library errors all verify as `false`.

use argon2::password_hash::{PasswordHash, SaltString};
use argon2::{Algorithm, Argon2, Params, PasswordHasher, PasswordVerifier, Version};
use rand::rngs::OsRng;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::HasherConfig;
use crate::crypto::record::{
    HashRecord, HashScheme, RecordScheme, BCRYPT_MAX_COST, BCRYPT_MIN_COST,
};

/// bcrypt cost used unless configured otherwise (2^10 key-expansion rounds).
pub const DEFAULT_BCRYPT_COST: u32 = 10;

/// Argon2id defaults for deployments that select it: 19 MiB, 3 passes, 1 lane.
pub const DEFAULT_ARGON2_MEMORY_COST_KIB: u32 = 19 * 1024;
pub const DEFAULT_ARGON2_TIME_COST: u32 = 3;
pub const DEFAULT_ARGON2_PARALLELISM: u32 = 1;

/// Verification ceiling: a bcrypt record may carry at most this many cost
/// steps above the configured cost. Each step doubles the work.
pub const BCRYPT_COST_HEADROOM: u32 = 2;

/// Verification ceiling: an argon2id record's memory, passes and lanes may be
/// at most this multiple of the configured parameters.
pub const ARGON2_PARAM_HEADROOM: u32 = 4;

#[derive(Debug, Error)]
pub enum HasherError {
    #[error("hash computation failed: {0}")]
    ComputationFailure(String),
    #[error("invalid hasher configuration: {0}")]
    InvalidConfig(String),
}

#[derive(Debug, Clone)]
enum Policy {
    Bcrypt { cost: u32 },
    Argon2id(Params),
}

/// Produces and verifies salted one-way hashes of secrets.
///
/// The hasher holds only immutable cost parameters, so it is cheap to clone
/// and safe to share across threads. Every call blocks the calling thread
/// for the full cost of the transform.
#[derive(Debug, Clone)]
pub struct CredentialHasher {
    policy: Policy,
}

impl Default for CredentialHasher {
    fn default() -> Self {
        Self {
            policy: Policy::Bcrypt {
                cost: DEFAULT_BCRYPT_COST,
            },
        }
    }
}

impl CredentialHasher {
    /// bcrypt with the default cost factor of 10.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bcrypt(cost: u32) -> Result<Self, HasherError> {
        if !(BCRYPT_MIN_COST..=BCRYPT_MAX_COST).contains(&cost) {
            return Err(HasherError::InvalidConfig(format!(
                "bcrypt cost {cost} outside {BCRYPT_MIN_COST}..={BCRYPT_MAX_COST}"
            )));
        }
        Ok(Self {
            policy: Policy::Bcrypt { cost },
        })
    }

    pub fn argon2id(
        memory_cost_kib: u32,
        time_cost: u32,
        parallelism: u32,
    ) -> Result<Self, HasherError> {
        let params = Params::new(memory_cost_kib, time_cost, parallelism, None)
            .map_err(|e| HasherError::InvalidConfig(format!("argon2 parameters rejected: {e}")))?;
        Ok(Self {
            policy: Policy::Argon2id(params),
        })
    }

    pub fn from_config(config: &HasherConfig) -> Result<Self, HasherError> {
        match config.scheme {
            HashScheme::Bcrypt => Self::bcrypt(config.bcrypt_cost),
            HashScheme::Argon2id => Self::argon2id(
                config.argon2.memory_cost_kib,
                config.argon2.time_cost,
                config.argon2.parallelism,
            ),
        }
    }

    pub fn scheme(&self) -> HashScheme {
        match self.policy {
            Policy::Bcrypt { .. } => HashScheme::Bcrypt,
            Policy::Argon2id(_) => HashScheme::Argon2id,
        }
    }

    /// The work factor new records carry, in the form a stored record reports it.
    pub fn cost(&self) -> RecordScheme {
        match &self.policy {
            Policy::Bcrypt { cost } => RecordScheme::Bcrypt { cost: *cost },
            Policy::Argon2id(params) => RecordScheme::Argon2id {
                memory_cost_kib: params.m_cost(),
                time_cost: params.t_cost(),
                parallelism: params.p_cost(),
            },
        }
    }

    /// Hashes a secret with a fresh random salt. Emptiness is the caller's
    /// concern; an empty secret hashes like any other.
    ///
    /// bcrypt only reads the first 72 bytes of its input.
    pub fn hash(&self, secret: impl AsRef<str>) -> Result<HashRecord, HasherError> {
        let plaintext = secret.as_ref().as_bytes();
        let encoded = match &self.policy {
            Policy::Bcrypt { cost } => bcrypt::hash(plaintext, *cost)
                .map_err(|e| HasherError::ComputationFailure(format!("bcrypt: {e}")))?,
            Policy::Argon2id(params) => {
                let salt = SaltString::generate(&mut OsRng);
                argon2_with(params)
                    .hash_password(plaintext, &salt)
                    .map_err(|e| HasherError::ComputationFailure(format!("argon2: {e}")))?
                    .to_string()
            }
        };
        Ok(HashRecord::from(encoded))
    }

    /// Checks a secret against a stored record using the salt and work factor
    /// embedded in the record. Never errors; anything unverifiable is `false`.
    pub fn verify(&self, secret: impl AsRef<str>, record: impl AsRef<str>) -> bool {
        let record = record.as_ref();
        let Some(found) = RecordScheme::parse(record) else {
            debug!("rejecting malformed hash record");
            return false;
        };
        if found.kind() != self.scheme() {
            warn!(
                expected = %self.scheme(),
                found = %found.kind(),
                "hash record was produced by a different scheme"
            );
            return false;
        }
        if self.exceeds_ceiling(&found) {
            warn!(
                found = ?found,
                policy = ?self.cost(),
                "hash record work factor exceeds the verification ceiling"
            );
            return false;
        }

        let plaintext = secret.as_ref().as_bytes();
        match &self.policy {
            Policy::Bcrypt { .. } => match bcrypt::verify(plaintext, record) {
                Ok(matches) => matches,
                Err(err) => {
                    debug!(error = %err, "bcrypt could not verify record");
                    false
                }
            },
            Policy::Argon2id(params) => {
                let parsed = match PasswordHash::new(record) {
                    Ok(hash) => hash,
                    Err(err) => {
                        debug!(error = %err, "argon2 record failed to parse");
                        return false;
                    }
                };
                argon2_with(params)
                    .verify_password(plaintext, &parsed)
                    .is_ok()
            }
        }
    }

    /// Records demanding far more work than the configured policy are refused
    /// before any computation starts.
    fn exceeds_ceiling(&self, found: &RecordScheme) -> bool {
        let over = |value: u32, policy: u32| {
            u64::from(value) > u64::from(policy) * u64::from(ARGON2_PARAM_HEADROOM)
        };
        match (*found, self.cost()) {
            (RecordScheme::Bcrypt { cost }, RecordScheme::Bcrypt { cost: policy }) => {
                cost > policy + BCRYPT_COST_HEADROOM
            }
            (
                RecordScheme::Argon2id {
                    memory_cost_kib,
                    time_cost,
                    parallelism,
                },
                RecordScheme::Argon2id {
                    memory_cost_kib: policy_memory,
                    time_cost: policy_time,
                    parallelism: policy_lanes,
                },
            ) => {
                over(memory_cost_kib, policy_memory)
                    || over(time_cost, policy_time)
                    || over(parallelism, policy_lanes)
            }
            _ => true,
        }
    }

    /// True when a stored record should be replaced with a fresh hash: it is
    /// malformed, uses another scheme, or carries a different work factor.
    pub fn needs_rehash(&self, record: impl AsRef<str>) -> bool {
        match RecordScheme::parse(record.as_ref()) {
            Some(found) => found != self.cost(),
            None => true,
        }
    }
}

fn argon2_with(params: &Params) -> Argon2<'static> {
    Argon2::new(Algorithm::Argon2id, Version::V0x13, params.clone())
}

#[cfg(test)]
mod tests {
    use super::{
        CredentialHasher, HasherError, ARGON2_PARAM_HEADROOM, BCRYPT_COST_HEADROOM,
        DEFAULT_BCRYPT_COST,
    };
    use crate::crypto::record::{HashScheme, RecordScheme};

    // cost 4 is the bcrypt floor; keeps the suite fast without changing behavior
    fn fast_bcrypt() -> CredentialHasher {
        CredentialHasher::bcrypt(4).expect("cost 4 is valid")
    }

    fn fast_argon2id() -> CredentialHasher {
        CredentialHasher::argon2id(1024, 1, 1).expect("small params are valid")
    }

    #[test]
    fn default_is_bcrypt_cost_ten() {
        let hasher = CredentialHasher::new();
        assert_eq!(hasher.scheme(), HashScheme::Bcrypt);
        assert_eq!(hasher.cost(), RecordScheme::Bcrypt { cost: DEFAULT_BCRYPT_COST });
        let record = hasher.hash("hasher-test-password").expect("hashing should succeed");
        assert!(record.as_str().starts_with("$2b$10$"));
        assert_eq!(record.as_str().len(), 60);
    }

    #[test]
    fn hashes_and_verifies_secrets() {
        let hasher = fast_bcrypt();
        let record = hasher.hash("correct horse battery staple").expect("hashing should succeed");
        assert!(hasher.verify("correct horse battery staple", &record));
        assert!(!hasher.verify("Correct Horse Battery Staple", &record));
    }

    #[test]
    fn same_secret_gets_fresh_salt() {
        let hasher = fast_bcrypt();
        let first = hasher.hash("same-secret").unwrap();
        let second = hasher.hash("same-secret").unwrap();
        assert_ne!(first, second);
        assert!(hasher.verify("same-secret", &first));
        assert!(hasher.verify("same-secret", &second));
    }

    #[test]
    fn empty_secret_still_hashes() {
        let hasher = fast_bcrypt();
        let record = hasher.hash("").unwrap();
        assert!(hasher.verify("", &record));
        assert!(!hasher.verify("not-empty", &record));
    }

    #[test]
    fn unicode_secret_round_trips() {
        let hasher = fast_bcrypt();
        let record = hasher.hash("pässwörd-🔐").unwrap();
        assert!(hasher.verify("pässwörd-🔐", &record));
        assert!(!hasher.verify("passwort-🔐", &record));
    }

    #[test]
    fn bcrypt_ignores_bytes_past_seventy_two() {
        let hasher = fast_bcrypt();
        let base = "a".repeat(72);
        let record = hasher.hash(format!("{base}tail-one")).unwrap();
        assert!(hasher.verify(format!("{base}tail-two"), &record));
        assert!(!hasher.verify("a".repeat(71), &record));
    }

    #[test]
    fn malformed_records_verify_false() {
        let hasher = fast_bcrypt();
        for junk in ["", "not-a-hash", "$2b$10$short", "$argon2id$v=19$garbage"] {
            assert!(!hasher.verify("anything", junk), "accepted {junk:?}");
        }
    }

    #[test]
    fn verifies_records_from_another_cost() {
        let older = fast_bcrypt().hash("rotated").unwrap();
        let hasher = CredentialHasher::bcrypt(5).unwrap();
        assert!(hasher.verify("rotated", &older));
        assert!(hasher.needs_rehash(&older));
    }

    #[test]
    fn refuses_records_above_bcrypt_ceiling() {
        let hasher = fast_bcrypt();
        // cost 31 would run for hours if attempted
        let planted = "$2b$31$N9qo8uLOickgx2ZMRZoMyeIjZAgcfl7p92ldGxad68LJZdL17lhWy";
        assert!(!hasher.verify("anything", planted));
        assert!(hasher.needs_rehash(planted));

        let at_ceiling = CredentialHasher::bcrypt(4 + BCRYPT_COST_HEADROOM)
            .unwrap()
            .hash("headroom")
            .unwrap();
        assert!(hasher.verify("headroom", &at_ceiling));

        let above_ceiling = CredentialHasher::bcrypt(5 + BCRYPT_COST_HEADROOM)
            .unwrap()
            .hash("headroom")
            .unwrap();
        assert!(!hasher.verify("headroom", &above_ceiling));
    }

    #[test]
    fn refuses_records_above_argon2id_ceiling() {
        let hasher = fast_argon2id();
        let planted = "$argon2id$v=19$m=65536,t=1,p=1$c29tZXNhbHR2YWx1ZTEy$ZGVhZGJlZWZkZWFkYmVlZmRlYWRiZWVmZGVhZGJlZWY";
        assert!(!hasher.verify("anything", planted));

        let at_ceiling = CredentialHasher::argon2id(1024 * ARGON2_PARAM_HEADROOM, 1, 1)
            .unwrap()
            .hash("headroom")
            .unwrap();
        assert!(hasher.verify("headroom", &at_ceiling));
    }

    #[test]
    fn foreign_scheme_fails_closed() {
        let bcrypt = fast_bcrypt();
        let argon = fast_argon2id();
        let bcrypt_record = bcrypt.hash("shared").unwrap();
        let argon_record = argon.hash("shared").unwrap();
        assert!(!argon.verify("shared", &bcrypt_record));
        assert!(!bcrypt.verify("shared", &argon_record));
    }

    #[test]
    fn argon2id_hashes_and_verifies() {
        let hasher = fast_argon2id();
        let record = hasher.hash("argon-secret").unwrap();
        assert!(record.as_str().starts_with("$argon2id$v=19$m=1024,t=1,p=1$"));
        assert!(hasher.verify("argon-secret", &record));
        assert!(!hasher.verify("wrong-secret", &record));
        assert!(!hasher.needs_rehash(&record));
    }

    #[test]
    fn needs_rehash_tracks_policy() {
        let hasher = fast_bcrypt();
        let fresh = hasher.hash("secret").unwrap();
        assert!(!hasher.needs_rehash(&fresh));
        assert!(hasher.needs_rehash("garbage"));

        let stronger_argon = CredentialHasher::argon2id(2048, 1, 1).unwrap();
        let weaker = fast_argon2id().hash("secret").unwrap();
        assert!(stronger_argon.needs_rehash(&weaker));
        assert!(stronger_argon.needs_rehash(&fresh));
    }

    #[test]
    fn rejects_unusable_work_factors() {
        assert!(matches!(
            CredentialHasher::bcrypt(3),
            Err(HasherError::InvalidConfig(_))
        ));
        assert!(matches!(
            CredentialHasher::bcrypt(32),
            Err(HasherError::InvalidConfig(_))
        ));
        assert!(matches!(
            CredentialHasher::argon2id(1024, 1, 0),
            Err(HasherError::InvalidConfig(_))
        ));
    }
}
