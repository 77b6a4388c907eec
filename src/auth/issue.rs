//! Capability issuance
//!
//! Mint, offer, accept, confirm. The only state this crate checks is the
//! post-condition: after the handshake the holder must own the token. A
//! token that never reached its holder is not an active grant, so a missing
//! token is a hard [`Error::DeliveryFailure`], never a warning.
//!
//! Not safe to run twice concurrently for the same (issuer, holder, grant);
//! callers must prevent that.

use std::collections::BTreeMap;

use log::{info, warn};

use crate::error::{Error, Result};
use crate::identity::{Address, Identity};
use crate::ledger::{CapabilityToken, LedgerDirectory, LedgerError};
use crate::metadata::{ServiceId, Timestamp, TokenMetadata};

/// Mint a capability token for `holder` and confirm delivery
///
/// Returns the holder's address and the token as it now sits in the
/// holder's holdings.
pub fn issue<L>(
    ledger: &L,
    issuer: &Identity,
    holder: &Identity,
    valid_from: Timestamp,
    valid_until: Timestamp,
    services: BTreeMap<ServiceId, bool>,
) -> Result<(Address, CapabilityToken)>
where
    L: LedgerDirectory + ?Sized,
{
    let metadata = TokenMetadata::new(valid_from, valid_until, services)?.encode()?;
    let holder_address = *holder.address();

    let token_id = ledger
        .mint_token(issuer, &metadata)
        .map_err(|err| match err {
            LedgerError::Rejected { reason, .. } => Error::MintFailed(reason),
            other => other.into(),
        })?;
    info!("minted token {token_id} for {holder_address}");

    let offer_id = ledger
        .create_transfer_offer(&token_id, issuer, &holder_address)
        .map_err(|err| match err {
            LedgerError::Rejected { reason, .. } => Error::OfferFailed {
                token_id: token_id.clone(),
                reason,
            },
            other => other.into(),
        })?;

    let accepted = ledger
        .accept_transfer_offer(holder, &offer_id)
        .map_err(|err| match err {
            LedgerError::Rejected { reason, .. } => {
                warn!("offer {offer_id} rejected on accept: {reason}");
                Error::DeliveryFailure {
                    token_id: token_id.clone(),
                    holder: holder_address,
                }
            }
            other => other.into(),
        })?;

    let delivered = if accepted {
        ledger
            .tokens_owned_by(&holder_address)?
            .into_iter()
            .find(|token| token.token_id == token_id)
    } else {
        None
    };

    match delivered {
        Some(token) => {
            info!("token {token_id} delivered to {holder_address}");
            Ok((holder_address, token))
        }
        None => {
            warn!("token {token_id} not present in holdings of {holder_address}");
            Err(Error::DeliveryFailure {
                token_id,
                holder: holder_address,
            })
        }
    }
}
