//! Salted one-way hashing of user credentials.
//!
//! `CredentialHasher` turns a plaintext secret into a storable `HashRecord`
//! and later checks a secret against that record. Records are opaque strings
//! that embed their own salt and work factor; the persistence layer stores
//! them verbatim.
//!
//! ```no_run
//! use credential_hasher::CredentialHasher;
//!
//! let hasher = CredentialHasher::new();
//! let record = hasher.hash("correct horse battery staple").unwrap();
//! assert!(hasher.verify("correct horse battery staple", &record));
//! assert!(!hasher.verify("Correct Horse Battery Staple", &record));
//! ```

pub mod config;
pub mod crypto;

pub use config::{load_config, ConfigError, HasherConfig};
pub use crypto::passwords::{CredentialHasher, HasherError, DEFAULT_BCRYPT_COST};
pub use crypto::record::{HashRecord, HashScheme, RecordScheme};
pub use crypto::secret::Secret;
