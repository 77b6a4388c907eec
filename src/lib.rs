//! tokengate - proof-of-possession access control over ledger-held capabilities
//!
//! A holder proves to a verifier that it:
//! 1. Controls a specific private key (signed, timestamped claim)
//! 2. Currently holds a capability token from a trusted issuer that covers
//!    the requested service at the ledger's current time
//!
//! No session state survives between attempts. The ledger is reached only
//! through [`ledger::LedgerDirectory`].

pub mod auth;
pub mod config;
pub mod error;
pub mod freshness;
pub mod identity;
pub mod ledger;
pub mod metadata;
pub mod proof;

pub use auth::{issue, verify, Decision, Denial, Verifier, VerifierConfig};
pub use error::{Error, Result};
pub use freshness::{FreshnessWindow, DEFAULT_FRESHNESS_MS};
pub use identity::{derive_address, sign, verify_signature, Address, Identity, PublicKey};
pub use ledger::{CapabilityToken, LedgerDirectory, LedgerError, MemoryLedger};
pub use metadata::{ServiceId, ServiceScope, Timestamp, TokenMetadata};
pub use proof::{authenticate, Proof};
