//! Proof-of-possession construction
//!
//! A holder proves control of its key by signing a claim that binds:
//! - The ledger's trusted time (never the local clock)
//! - The service the holder is asking to use
//!
//! The claim is encoded canonically with postcard, signed, and shipped with
//! the holder's public key. Proofs are single-use and never persisted.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::identity::Identity;
use crate::ledger::LedgerDirectory;
use crate::metadata::{ServiceScope, Timestamp};

/// The payload that gets signed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    /// Trusted ledger time, nanoseconds since the Unix epoch on the wire
    #[serde(with = "chrono::serde::ts_nanoseconds")]
    pub timestamp: Timestamp,
    /// Service the proof is scoped to
    pub service: ServiceScope,
}

impl Claim {
    /// Canonical byte encoding (deterministic)
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(postcard::to_allocvec(self)?)
    }

    /// Decode a canonical claim; trailing bytes are rejected
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let (claim, rest) = postcard::take_from_bytes::<Self>(bytes)?;
        if !rest.is_empty() {
            return Err(Error::MalformedInput(format!(
                "{} trailing bytes after claim",
                rest.len()
            )));
        }
        Ok(claim)
    }
}

/// A signed claim plus the key that signed it
///
/// On the wire each field is lowercase hex inside a JSON object:
/// `{"message": "...", "signature": "...", "public_key": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Proof {
    #[serde(with = "hex::serde")]
    pub message: Vec<u8>,
    #[serde(with = "hex::serde")]
    pub signature: Vec<u8>,
    #[serde(with = "hex::serde")]
    pub public_key: Vec<u8>,
}

impl Proof {
    /// Sign a claim for `scope` at `timestamp`
    ///
    /// Use [`authenticate`] outside of tests so the timestamp comes from the
    /// ledger.
    pub fn create(holder: &Identity, timestamp: Timestamp, scope: ServiceScope) -> Result<Self> {
        let claim = Claim {
            timestamp,
            service: scope,
        };
        let message = claim.encode()?;
        let signature = holder.sign(&message);

        Ok(Self {
            message,
            signature: signature.to_bytes().to_vec(),
            public_key: holder.public_key().as_bytes().to_vec(),
        })
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Build a fresh proof for `scope`, timestamped by the ledger's trusted clock
pub fn authenticate<L>(ledger: &L, holder: &Identity, scope: ServiceScope) -> Result<Proof>
where
    L: LedgerDirectory + ?Sized,
{
    let now = ledger.trusted_time()?;
    Proof::create(holder, now, scope)
}
