//! Hasher configuration. Settings come from an optional JSON file and can be
//! overridden through environment variables; every field has a default so an
//! empty object (or no file at all) yields bcrypt at cost 10.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::crypto::passwords::{
    CredentialHasher, DEFAULT_ARGON2_MEMORY_COST_KIB, DEFAULT_ARGON2_PARALLELISM,
    DEFAULT_ARGON2_TIME_COST, DEFAULT_BCRYPT_COST,
};
use crate::crypto::record::HashScheme;

pub const SCHEME_ENV: &str = "CREDENTIAL_HASHER_SCHEME";
pub const COST_ENV: &str = "CREDENTIAL_HASHER_COST";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file unreadable: {0}")]
    Io(String),
    #[error("config parse failed: {0}")]
    Parse(String),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Argon2Settings {
    #[serde(rename = "memoryCostKib")]
    pub memory_cost_kib: u32,
    #[serde(rename = "timeCost")]
    pub time_cost: u32,
    pub parallelism: u32,
}

impl Default for Argon2Settings {
    fn default() -> Self {
        Self {
            memory_cost_kib: DEFAULT_ARGON2_MEMORY_COST_KIB,
            time_cost: DEFAULT_ARGON2_TIME_COST,
            parallelism: DEFAULT_ARGON2_PARALLELISM,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HasherConfig {
    pub scheme: HashScheme,
    #[serde(rename = "bcryptCost")]
    pub bcrypt_cost: u32,
    pub argon2: Argon2Settings,
}

impl Default for HasherConfig {
    fn default() -> Self {
        Self {
            scheme: HashScheme::Bcrypt,
            bcrypt_cost: DEFAULT_BCRYPT_COST,
            argon2: Argon2Settings::default(),
        }
    }
}

impl HasherConfig {
    /// Applies `CREDENTIAL_HASHER_SCHEME` and `CREDENTIAL_HASHER_COST` from the
    /// process environment.
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides from an arbitrary key lookup. The cost override is a
    /// bcrypt cost; setting it while the effective scheme is argon2id is an error.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(SCHEME_ENV) {
            self.scheme = raw
                .parse()
                .map_err(|e| ConfigError::Invalid(format!("{SCHEME_ENV}: {e}")))?;
        }
        if let Some(raw) = lookup(COST_ENV) {
            if self.scheme != HashScheme::Bcrypt {
                return Err(ConfigError::Invalid(format!(
                    "{COST_ENV} sets a bcrypt cost but the scheme is {}; use the argon2 settings in the config file",
                    self.scheme
                )));
            }
            self.bcrypt_cost = raw
                .trim()
                .parse()
                .map_err(|e| ConfigError::Invalid(format!("{COST_ENV}: {e}")))?;
        }
        Ok(self)
    }

    /// Confirms the selected scheme can actually be built with these parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        CredentialHasher::from_config(self)
            .map(|_| ())
            .map_err(|e| ConfigError::Invalid(format!("{e}")))
    }

    pub fn build_hasher(&self) -> Result<CredentialHasher, ConfigError> {
        CredentialHasher::from_config(self).map_err(|e| ConfigError::Invalid(format!("{e}")))
    }
}

/// Loads and validates the JSON configuration file.
pub fn load_config(path: impl AsRef<Path>) -> Result<HasherConfig, ConfigError> {
    let raw_json = fs::read_to_string(&path).map_err(|e| ConfigError::Io(format!("{e}")))?;
    let config: HasherConfig =
        serde_json::from_str(&raw_json).map_err(|e| ConfigError::Parse(format!("{e}")))?;
    config.validate()?;
    tracing::debug!(path = %path.as_ref().display(), scheme = %config.scheme, "loaded hasher config");
    Ok(config)
}
