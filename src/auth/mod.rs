//! Capability-based authorization
//!
//! # Philosophy
//!
//! Authorization here is **capability-based**, not **session-based**.
//!
//! This means:
//! - No session store: every access attempt is a fresh proof and decision
//! - No "who are you?" lookup table, only "which tokens do you hold right now?"
//! - The ledger is the single source of truth for ownership and time
//!
//! # Flow
//!
//! 1. [`issue`] mints a token carrying a validity window and service map,
//!    hands it to the holder through an offer/accept handshake, and confirms
//!    the holder actually owns it before returning.
//! 2. The holder builds a proof with [`authenticate`](crate::proof::authenticate).
//! 3. A [`Verifier`] checks the proof and the holder's current holdings.
//!
//! # Out of scope
//!
//! - Revocation: a token grants until its window closes
//! - Key custody or recovery
//! - Federation across issuers: a verifier trusts exactly one issuer address

pub mod issue;
pub mod verify;

pub use issue::issue;
pub use verify::{verify, Decision, Denial, Verifier, VerifierConfig};
