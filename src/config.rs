//! Runtime configuration read from the environment
//!
//! - `TOKENGATE_ISSUER_SEED`: hex seed of the issuer wallet. A fresh issuer
//!   is generated when unset.
//! - `TOKENGATE_FRESHNESS_MS`: proof freshness window in milliseconds.

use std::env;

use crate::auth::VerifierConfig;
use crate::error::{Error, Result};
use crate::freshness::FreshnessWindow;
use crate::identity::Identity;

pub const ISSUER_SEED_VAR: &str = "TOKENGATE_ISSUER_SEED";
pub const FRESHNESS_MS_VAR: &str = "TOKENGATE_FRESHNESS_MS";

#[derive(Debug, Clone, Default)]
pub struct Config {
    issuer_seed: Option<String>,
    pub verifier: VerifierConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let issuer_seed = lookup(ISSUER_SEED_VAR).filter(|s| !s.trim().is_empty());

        let mut verifier = VerifierConfig::default();
        if let Some(raw) = lookup(FRESHNESS_MS_VAR) {
            let ms: i64 = raw
                .trim()
                .parse()
                .map_err(|e| Error::MalformedInput(format!("{FRESHNESS_MS_VAR}={raw:?}: {e}")))?;
            if ms <= 0 {
                return Err(Error::MalformedInput(format!(
                    "{FRESHNESS_MS_VAR} must be positive, got {ms}"
                )));
            }
            verifier.freshness = FreshnessWindow::from_millis(ms);
        }

        Ok(Self {
            issuer_seed,
            verifier,
        })
    }

    /// The configured issuer, or `None` when no seed was provided
    pub fn issuer(&self) -> Result<Option<Identity>> {
        self.issuer_seed
            .as_deref()
            .map(Identity::from_seed_hex)
            .transpose()
    }
}
