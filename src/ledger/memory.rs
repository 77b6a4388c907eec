//! In-process Ledger Directory
//!
//! Keeps accounts, tokens and offers in memory behind a mutex, with a clock
//! that only moves when told to. Fault switches let callers reproduce the
//! failure modes a real ledger exhibits: unreachable, transfers that report
//! success without delivering, and refused acceptance.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use chrono::Duration;
use log::debug;
use sha2::{Digest, Sha256};

use super::{
    AccountInfo, CapabilityToken, LedgerDirectory, LedgerError, OfferId, TokenId, TransferOffer,
};
use crate::identity::{Address, Identity};
use crate::metadata::Timestamp;

const TOKEN_ID_DOMAIN: &[u8] = b"tokengate:token:v1\0";
const OFFER_ID_DOMAIN: &[u8] = b"tokengate:offer:v1\0";

#[derive(Debug, Default, Clone, Copy)]
struct Faults {
    unavailable: bool,
    drop_deliveries: bool,
    refuse_acceptance: bool,
}

#[derive(Debug)]
struct State {
    now: Timestamp,
    tokens: BTreeMap<TokenId, CapabilityToken>,
    offers: HashMap<OfferId, TransferOffer>,
    sequences: HashMap<Address, u64>,
    faults: Faults,
}

impl State {
    fn next_sequence(&mut self, address: &Address) -> u64 {
        let seq = self.sequences.entry(*address).or_insert(0);
        *seq += 1;
        *seq
    }
}

#[derive(Debug)]
pub struct MemoryLedger {
    state: Mutex<State>,
}

impl MemoryLedger {
    /// Create an empty ledger whose trusted clock reads `now`
    pub fn new(now: Timestamp) -> Self {
        Self {
            state: Mutex::new(State {
                now,
                tokens: BTreeMap::new(),
                offers: HashMap::new(),
                sequences: HashMap::new(),
                faults: Faults::default(),
            }),
        }
    }

    pub fn set_time(&self, now: Timestamp) -> Result<(), LedgerError> {
        self.lock()?.now = now;
        Ok(())
    }

    pub fn advance(&self, by: Duration) -> Result<(), LedgerError> {
        let mut state = self.lock()?;
        state.now += by;
        Ok(())
    }

    /// Make every call fail with [`LedgerError::Unavailable`]
    pub fn set_unavailable(&self, unavailable: bool) -> Result<(), LedgerError> {
        self.faults_mut(|f| f.unavailable = unavailable)
    }

    /// Accepting an offer reports success but ownership does not change
    pub fn drop_deliveries(&self, drop: bool) -> Result<(), LedgerError> {
        self.faults_mut(|f| f.drop_deliveries = drop)
    }

    /// Accepting an offer reports failure and ownership does not change
    pub fn refuse_acceptance(&self, refuse: bool) -> Result<(), LedgerError> {
        self.faults_mut(|f| f.refuse_acceptance = refuse)
    }

    /// Record a token directly, bypassing mint checks
    ///
    /// Lets tests place tokens with arbitrary (even malformed) metadata.
    pub fn insert_token(&self, token: CapabilityToken) -> Result<(), LedgerError> {
        self.lock()?.tokens.insert(token.token_id.clone(), token);
        Ok(())
    }

    fn faults_mut(&self, f: impl FnOnce(&mut Faults)) -> Result<(), LedgerError> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| LedgerError::Unavailable("ledger state poisoned".into()))?;
        f(&mut state.faults);
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, LedgerError> {
        let state = self
            .state
            .lock()
            .map_err(|_| LedgerError::Unavailable("ledger state poisoned".into()))?;
        if state.faults.unavailable {
            return Err(LedgerError::Unavailable("ledger is offline".into()));
        }
        Ok(state)
    }
}

fn derive_id(domain: &[u8], account: &Address, sequence: u64) -> String {
    let digest = Sha256::new()
        .chain_update(domain)
        .chain_update(account.as_bytes())
        .chain_update(sequence.to_be_bytes())
        .finalize();
    hex::encode_upper(digest)
}

impl LedgerDirectory for MemoryLedger {
    fn trusted_time(&self) -> Result<Timestamp, LedgerError> {
        Ok(self.lock()?.now)
    }

    fn account_info(&self, address: &Address) -> Result<AccountInfo, LedgerError> {
        let state = self.lock()?;
        Ok(AccountInfo {
            address: *address,
            tokens_owned: state.tokens.values().filter(|t| t.holder == *address).count(),
            sequence: state.sequences.get(address).copied().unwrap_or(0),
        })
    }

    fn tokens_owned_by(&self, address: &Address) -> Result<Vec<CapabilityToken>, LedgerError> {
        let state = self.lock()?;
        Ok(state
            .tokens
            .values()
            .filter(|t| t.holder == *address)
            .cloned()
            .collect())
    }

    fn mint_token(&self, issuer: &Identity, metadata: &[u8]) -> Result<TokenId, LedgerError> {
        if metadata.is_empty() {
            return Err(LedgerError::Rejected {
                operation: "mint_token",
                reason: "empty metadata".into(),
            });
        }
        let mut state = self.lock()?;
        let issuer_address = *issuer.address();
        let seq = state.next_sequence(&issuer_address);
        let token_id = TokenId(derive_id(TOKEN_ID_DOMAIN, &issuer_address, seq));
        state.tokens.insert(
            token_id.clone(),
            CapabilityToken {
                token_id: token_id.clone(),
                issuer: issuer_address,
                holder: issuer_address,
                metadata: metadata.to_vec(),
            },
        );
        debug!("minted {token_id} for {issuer_address}");
        Ok(token_id)
    }

    fn create_transfer_offer(
        &self,
        token_id: &TokenId,
        from: &Identity,
        to: &Address,
    ) -> Result<OfferId, LedgerError> {
        let mut state = self.lock()?;
        let from_address = *from.address();
        match state.tokens.get(token_id) {
            None => {
                return Err(LedgerError::Rejected {
                    operation: "create_transfer_offer",
                    reason: format!("unknown token {token_id}"),
                })
            }
            Some(token) if token.holder != from_address => {
                return Err(LedgerError::Rejected {
                    operation: "create_transfer_offer",
                    reason: format!("{from_address} does not own {token_id}"),
                })
            }
            Some(_) => {}
        }
        if *to == from_address {
            return Err(LedgerError::Rejected {
                operation: "create_transfer_offer",
                reason: "destination is the current owner".into(),
            });
        }

        let seq = state.next_sequence(&from_address);
        let offer_id = OfferId(derive_id(OFFER_ID_DOMAIN, &from_address, seq));
        state.offers.insert(
            offer_id.clone(),
            TransferOffer {
                offer_id: offer_id.clone(),
                token_id: token_id.clone(),
                from: from_address,
                to: *to,
            },
        );
        debug!("offer {offer_id}: {token_id} from {from_address} to {to}");
        Ok(offer_id)
    }

    fn accept_transfer_offer(
        &self,
        holder: &Identity,
        offer_id: &OfferId,
    ) -> Result<bool, LedgerError> {
        let mut state = self.lock()?;
        let holder_address = *holder.address();
        let offer = match state.offers.get(offer_id) {
            Some(offer) if offer.to == holder_address => offer.clone(),
            Some(_) => {
                return Err(LedgerError::Rejected {
                    operation: "accept_transfer_offer",
                    reason: format!("offer {offer_id} is not addressed to {holder_address}"),
                })
            }
            None => {
                return Err(LedgerError::Rejected {
                    operation: "accept_transfer_offer",
                    reason: format!("unknown offer {offer_id}"),
                })
            }
        };

        let faults = state.faults;
        if faults.refuse_acceptance {
            return Ok(false);
        }
        state.offers.remove(offer_id);
        state.next_sequence(&holder_address);
        if faults.drop_deliveries {
            return Ok(true);
        }

        match state.tokens.get_mut(&offer.token_id) {
            Some(token) if token.holder == offer.from => {
                token.holder = holder_address;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn ledger() -> MemoryLedger {
        MemoryLedger::new(Utc.with_ymd_and_hms(2024, 11, 21, 12, 0, 0).unwrap())
    }

    #[test]
    fn test_mint_offer_accept() {
        let ledger = ledger();
        let issuer = Identity::from_seed(&[1u8; 32]);
        let holder = Identity::from_seed(&[2u8; 32]);

        let token_id = ledger.mint_token(&issuer, b"{}").unwrap();
        assert_eq!(ledger.tokens_owned_by(issuer.address()).unwrap().len(), 1);

        let offer = ledger
            .create_transfer_offer(&token_id, &issuer, holder.address())
            .unwrap();
        assert!(ledger.accept_transfer_offer(&holder, &offer).unwrap());

        assert!(ledger.tokens_owned_by(issuer.address()).unwrap().is_empty());
        let held = ledger.tokens_owned_by(holder.address()).unwrap();
        assert_eq!(held[0].token_id, token_id);
        assert_eq!(held[0].issuer, *issuer.address());

        // offers are one-shot
        assert!(ledger.accept_transfer_offer(&holder, &offer).is_err());

        let info = ledger.account_info(holder.address()).unwrap();
        assert_eq!(info.tokens_owned, 1);
        assert_eq!(info.sequence, 1);
    }

    #[test]
    fn test_only_destination_accepts() {
        let ledger = ledger();
        let issuer = Identity::from_seed(&[1u8; 32]);
        let holder = Identity::from_seed(&[2u8; 32]);
        let thief = Identity::from_seed(&[3u8; 32]);

        let token_id = ledger.mint_token(&issuer, b"{}").unwrap();
        let offer = ledger
            .create_transfer_offer(&token_id, &issuer, holder.address())
            .unwrap();
        assert!(matches!(
            ledger.accept_transfer_offer(&thief, &offer),
            Err(LedgerError::Rejected { .. })
        ));
        assert!(ledger
            .create_transfer_offer(&token_id, &thief, thief.address())
            .is_err());
    }

    #[test]
    fn test_faults() {
        let ledger = ledger();
        let issuer = Identity::from_seed(&[1u8; 32]);
        let holder = Identity::from_seed(&[2u8; 32]);
        let token_id = ledger.mint_token(&issuer, b"{}").unwrap();

        ledger.drop_deliveries(true).unwrap();
        let offer = ledger
            .create_transfer_offer(&token_id, &issuer, holder.address())
            .unwrap();
        assert!(ledger.accept_transfer_offer(&holder, &offer).unwrap());
        assert!(ledger.tokens_owned_by(holder.address()).unwrap().is_empty());
        ledger.drop_deliveries(false).unwrap();

        ledger.refuse_acceptance(true).unwrap();
        let offer = ledger
            .create_transfer_offer(&token_id, &issuer, holder.address())
            .unwrap();
        assert!(!ledger.accept_transfer_offer(&holder, &offer).unwrap());
        ledger.refuse_acceptance(false).unwrap();

        ledger.set_unavailable(true).unwrap();
        assert!(matches!(
            ledger.trusted_time(),
            Err(LedgerError::Unavailable(_))
        ));
        ledger.set_unavailable(false).unwrap();
        assert!(ledger.trusted_time().is_ok());
    }

    #[test]
    fn test_clock_only_moves_when_told() {
        let ledger = ledger();
        let t0 = ledger.trusted_time().unwrap();
        ledger.advance(Duration::seconds(20)).unwrap();
        assert_eq!(ledger.trusted_time().unwrap() - t0, Duration::seconds(20));
    }

    #[test]
    fn test_mint_rejects_empty_metadata() {
        let ledger = ledger();
        let issuer = Identity::from_seed(&[1u8; 32]);
        assert!(matches!(
            ledger.mint_token(&issuer, b""),
            Err(LedgerError::Rejected { .. })
        ));
        assert!(ledger.tokens_owned_by(issuer.address()).unwrap().is_empty());
    }
}
