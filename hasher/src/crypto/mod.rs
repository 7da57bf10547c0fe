//! Credential hashing: the `CredentialHasher` itself, the zeroizing `Secret`
//! holder, and the `HashRecord` type with its scheme inspection.

pub mod passwords;
pub mod record;
pub mod secret;
