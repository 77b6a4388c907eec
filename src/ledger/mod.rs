//! Ledger Directory boundary
//!
//! The ledger is an external collaborator: it keeps balances, token
//! ownership and a trusted clock, and it confirms mints and transfers.
//! Everything in this crate talks to it through [`LedgerDirectory`] so the
//! core stays independent of any particular ledger's wire format.
//!
//! Calls are blocking and may fail. Timeouts and retries belong to the
//! implementation, not to callers.

pub mod memory;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::identity::{Address, Identity};
use crate::metadata::Timestamp;

pub use memory::MemoryLedger;

/// Ledger identifier of a minted token
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenId(pub String);

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ledger identifier of a pending transfer offer
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OfferId(pub String);

impl fmt::Display for OfferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A token as currently recorded on the ledger
///
/// `metadata` is the raw byte string fixed at mint time; decode it with
/// [`TokenMetadata::decode`](crate::metadata::TokenMetadata::decode).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityToken {
    pub token_id: TokenId,
    pub issuer: Address,
    pub holder: Address,
    #[serde(with = "hex::serde")]
    pub metadata: Vec<u8>,
}

/// Handshake artifact between mint and accepted transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferOffer {
    pub offer_id: OfferId,
    pub token_id: TokenId,
    pub from: Address,
    pub to: Address,
}

/// Account metadata kept by the ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInfo {
    pub address: Address,
    pub tokens_owned: usize,
    pub sequence: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    /// Transport failure, timeout, or the ledger is down
    #[error("ledger unreachable: {0}")]
    Unavailable(String),

    /// The ledger processed the request and refused it
    #[error("{operation} rejected: {reason}")]
    Rejected {
        operation: &'static str,
        reason: String,
    },
}

/// Operations the core needs from the ledger
pub trait LedgerDirectory {
    /// Tamper-resistant current time shared by all parties
    fn trusted_time(&self) -> Result<Timestamp, LedgerError>;

    fn account_info(&self, address: &Address) -> Result<AccountInfo, LedgerError>;

    /// Snapshot of the tokens currently owned by `address`
    fn tokens_owned_by(&self, address: &Address) -> Result<Vec<CapabilityToken>, LedgerError>;

    /// Mint a token owned by the issuer; atomic, nothing exists on failure
    fn mint_token(&self, issuer: &Identity, metadata: &[u8]) -> Result<TokenId, LedgerError>;

    fn create_transfer_offer(
        &self,
        token_id: &TokenId,
        from: &Identity,
        to: &Address,
    ) -> Result<OfferId, LedgerError>;

    /// Returns true iff the holder now owns the offered token
    fn accept_transfer_offer(
        &self,
        holder: &Identity,
        offer_id: &OfferId,
    ) -> Result<bool, LedgerError>;
}
