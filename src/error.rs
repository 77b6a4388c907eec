//! Error taxonomy
//!
//! Authorization denials are not errors: the verifier reports them as a
//! [`Decision`](crate::auth::Decision). The variants here are the failures a
//! caller has to handle, either because input could not be parsed, because
//! issuance did not complete, or because the ledger could not be reached.

use crate::identity::Address;
use crate::ledger::{LedgerError, TokenId};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Proof, metadata or configuration is missing fields or unparseable
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// The ledger refused to mint the capability token
    #[error("mint rejected: {0}")]
    MintFailed(String),

    /// The issuer side could not create the transfer offer
    #[error("transfer offer for token {token_id} failed: {reason}")]
    OfferFailed { token_id: TokenId, reason: String },

    /// The transfer completed (or claimed to) but the holder does not own the token
    #[error("token {token_id} was not delivered to {holder}")]
    DeliveryFailure { token_id: TokenId, holder: Address },

    /// Any Ledger Directory call failed; never a grant, never a plain deny
    #[error("ledger unavailable: {0}")]
    LedgerUnavailable(String),
}

impl From<LedgerError> for Error {
    fn from(err: LedgerError) -> Self {
        Error::LedgerUnavailable(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::MalformedInput(err.to_string())
    }
}

impl From<postcard::Error> for Error {
    fn from(err: postcard::Error) -> Self {
        Error::MalformedInput(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
