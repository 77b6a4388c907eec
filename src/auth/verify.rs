//! Proof and capability verification
//!
//! A pure decision over the proof and the ledger's current snapshot. Checks
//! run in a fixed order and stop at the first failure:
//!
//! 1. Structure: message, signature and public key are well-formed
//! 2. Address binding: the public key derives the claimed address
//! 3. Signature over the message
//! 4. Service match between the claim and this verifier
//! 5. Freshness of the claimed timestamp against trusted time
//! 6. Capability lookup over the holder's tokens from the trusted issuer
//!
//! Denials are values. The only error is an unreachable ledger, which is
//! neither a grant nor a deny.

use log::{debug, info, warn};

use crate::error::Result;
use crate::freshness::{FreshnessResult, FreshnessWindow};
use crate::identity::{
    derive_address, verify_signature, Address, PublicKey, PUBLIC_KEY_LEN, SIGNATURE_LEN,
};
use crate::ledger::{LedgerDirectory, TokenId};
use crate::metadata::{ServiceScope, TokenMetadata};
use crate::proof::{Claim, Proof};

/// Why a proof was turned away
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Denial {
    Malformed(String),
    AddressMismatch,
    SignatureInvalid,
    ServiceMismatch,
    FromFuture { ahead_ms: i64 },
    Stale { age_ms: i64 },
    NoTokens,
    NoGrantingToken,
}

/// Outcome of a verification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Granted { token_id: TokenId },
    Denied(Denial),
}

impl Decision {
    pub fn is_granted(&self) -> bool {
        matches!(self, Decision::Granted { .. })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VerifierConfig {
    pub freshness: FreshnessWindow,
}

/// Guards one service (or any capability) on behalf of one issuer
#[derive(Debug, Clone)]
pub struct Verifier {
    service: ServiceScope,
    issuer: Address,
    config: VerifierConfig,
}

impl Verifier {
    pub fn new(service: ServiceScope, issuer: Address) -> Self {
        Self::with_config(service, issuer, VerifierConfig::default())
    }

    pub fn with_config(service: ServiceScope, issuer: Address, config: VerifierConfig) -> Self {
        Self {
            service,
            issuer,
            config,
        }
    }

    pub fn service(&self) -> &ServiceScope {
        &self.service
    }

    pub fn issuer(&self) -> &Address {
        &self.issuer
    }

    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }

    /// Admit or deny; `Err` only when the ledger could not be consulted
    pub fn verify<L>(&self, ledger: &L, claimed: &Address, proof: &Proof) -> Result<bool>
    where
        L: LedgerDirectory + ?Sized,
    {
        Ok(self.decide(ledger, claimed, proof)?.is_granted())
    }

    /// Like [`Verifier::verify`] but keeps the reason for a denial
    pub fn decide<L>(&self, ledger: &L, claimed: &Address, proof: &Proof) -> Result<Decision>
    where
        L: LedgerDirectory + ?Sized,
    {
        let decision = self.evaluate(ledger, claimed, proof)?;
        match &decision {
            Decision::Granted { token_id } => {
                info!("granted {claimed} access to {} via token {token_id}", self.service)
            }
            Decision::Denied(reason) => {
                debug!("denied {claimed} access to {}: {reason:?}", self.service)
            }
        }
        Ok(decision)
    }

    fn evaluate<L>(&self, ledger: &L, claimed: &Address, proof: &Proof) -> Result<Decision>
    where
        L: LedgerDirectory + ?Sized,
    {
        use Decision::Denied;

        // 1. structure
        let Ok(key_bytes) = <[u8; PUBLIC_KEY_LEN]>::try_from(proof.public_key.as_slice()) else {
            return Ok(Denied(Denial::Malformed(format!(
                "public key is {} bytes",
                proof.public_key.len()
            ))));
        };
        if proof.message.is_empty() {
            return Ok(Denied(Denial::Malformed("empty message".into())));
        }
        if proof.signature.len() != SIGNATURE_LEN {
            return Ok(Denied(Denial::Malformed(format!(
                "signature is {} bytes",
                proof.signature.len()
            ))));
        }

        // 2. address binding
        if derive_address(&PublicKey::from_bytes(key_bytes)) != *claimed {
            return Ok(Denied(Denial::AddressMismatch));
        }

        // 3. signature
        if !verify_signature(&proof.message, &proof.signature, &proof.public_key) {
            return Ok(Denied(Denial::SignatureInvalid));
        }

        // 4. service
        let claim = match Claim::decode(&proof.message) {
            Ok(claim) => claim,
            Err(err) => return Ok(Denied(Denial::Malformed(err.to_string()))),
        };
        if claim.service != self.service {
            return Ok(Denied(Denial::ServiceMismatch));
        }

        // 5. freshness
        let now = ledger.trusted_time()?;
        match self.config.freshness.check(claim.timestamp, now) {
            FreshnessResult::Fresh => {}
            FreshnessResult::FromFuture { ahead_ms } => {
                return Ok(Denied(Denial::FromFuture { ahead_ms }))
            }
            FreshnessResult::Stale { age_ms } => return Ok(Denied(Denial::Stale { age_ms })),
        }

        // 6. capability lookup
        let tokens = ledger.tokens_owned_by(claimed)?;
        if tokens.is_empty() {
            return Ok(Denied(Denial::NoTokens));
        }
        for token in tokens.iter().filter(|t| t.issuer == self.issuer) {
            let metadata = match TokenMetadata::decode(&token.metadata) {
                Ok(metadata) => metadata,
                Err(err) => {
                    warn!("skipping token {} held by {claimed}: {err}", token.token_id);
                    continue;
                }
            };
            if metadata.grants(now, &self.service) {
                return Ok(Decision::Granted {
                    token_id: token.token_id.clone(),
                });
            }
        }
        Ok(Denied(Denial::NoGrantingToken))
    }
}

/// Stateless form of [`Verifier::verify`] with the default freshness window
pub fn verify<L>(
    ledger: &L,
    claimed: &Address,
    proof: &Proof,
    expected_service: &ServiceScope,
    expected_issuer: &Address,
) -> Result<bool>
where
    L: LedgerDirectory + ?Sized,
{
    Verifier::new(expected_service.clone(), *expected_issuer).verify(ledger, claimed, proof)
}
