//! Identity and signing primitives
//!
//! An [`Identity`] is an Ed25519 keypair plus the address derived from its
//! public key:
//! - The address is a one-way function of the public key, never chosen
//! - The private key lives in a wrapper that zeroizes on drop
//! - Signature checks fail closed on malformed input
//!
//! The private key is never serialized, logged or handed to callers.

use std::fmt;
use std::str::FromStr;

use ed25519_dalek::{Signer, SigningKey, VerifyingKey};
use rand_core::CryptoRngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{Error, Result};

pub const PUBLIC_KEY_LEN: usize = 32;
pub const SIGNATURE_LEN: usize = 64;
pub const ADDRESS_LEN: usize = 20;
pub const SEED_LEN: usize = 32;

/// Domain separator for address derivation
const ADDRESS_DOMAIN: &[u8] = b"tokengate:address:v1\0";

/// Raw Ed25519 public key bytes
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PublicKey(#[serde(with = "hex::serde")] [u8; PUBLIC_KEY_LEN]);

impl PublicKey {
    pub fn from_bytes(bytes: [u8; PUBLIC_KEY_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; PUBLIC_KEY_LEN] {
        &self.0
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", hex::encode(self.0))
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// Account address on the ledger, derived from a public key
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address([u8; ADDRESS_LEN]);

impl Address {
    pub fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", hex::encode(self.0))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl FromStr for Address {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut bytes = [0u8; ADDRESS_LEN];
        hex::decode_to_slice(s, &mut bytes)
            .map_err(|e| Error::MalformedInput(format!("address {s:?}: {e}")))?;
        Ok(Self(bytes))
    }
}

impl Serialize for Address {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Raw Ed25519 signature bytes
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Signature([u8; SIGNATURE_LEN]);

impl Signature {
    pub fn to_bytes(&self) -> [u8; SIGNATURE_LEN] {
        self.0
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({})", hex::encode(self.0))
    }
}

/// Wrapper for the signing key that guarantees zeroization
#[derive(ZeroizeOnDrop)]
struct SecretKey {
    #[zeroize(skip)] // ed25519_dalek::SigningKey zeroizes itself on drop
    inner: SigningKey,
}

impl SecretKey {
    fn from_seed(seed: &[u8; SEED_LEN]) -> Self {
        Self {
            inner: SigningKey::from_bytes(seed),
        }
    }

    fn verifying_key(&self) -> VerifyingKey {
        self.inner.verifying_key()
    }

    fn sign(&self, message: &[u8]) -> Signature {
        Signature(self.inner.sign(message).to_bytes())
    }
}

/// A keypair and its derived address
pub struct Identity {
    secret: SecretKey,
    public_key: PublicKey,
    address: Address,
}

impl Identity {
    /// Generate a fresh identity from a cryptographically secure RNG
    pub fn generate<R: CryptoRngCore + ?Sized>(rng: &mut R) -> Self {
        let mut seed = [0u8; SEED_LEN];
        rng.fill_bytes(&mut seed);
        let identity = Self::from_seed(&seed);
        seed.zeroize();
        identity
    }

    /// Rebuild an identity from a stored 32-byte seed
    pub fn from_seed(seed: &[u8; SEED_LEN]) -> Self {
        let secret = SecretKey::from_seed(seed);
        let public_key = PublicKey(secret.verifying_key().to_bytes());
        let address = derive_address(&public_key);
        Self {
            secret,
            public_key,
            address,
        }
    }

    /// Rebuild an identity from a hex-encoded seed
    pub fn from_seed_hex(seed_hex: &str) -> Result<Self> {
        let mut seed = [0u8; SEED_LEN];
        let decoded = hex::decode_to_slice(seed_hex.trim(), &mut seed);
        if let Err(e) = decoded {
            seed.zeroize();
            return Err(Error::MalformedInput(format!("seed: {e}")));
        }
        let identity = Self::from_seed(&seed);
        seed.zeroize();
        Ok(identity)
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    /// Sign the exact byte sequence given
    pub fn sign(&self, message: &[u8]) -> Signature {
        self.secret.sign(message)
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("address", &self.address)
            .field("public_key", &self.public_key)
            .finish_non_exhaustive()
    }
}

/// Derive the ledger address for a public key
pub fn derive_address(public_key: &PublicKey) -> Address {
    let digest = Sha256::new()
        .chain_update(ADDRESS_DOMAIN)
        .chain_update(public_key.as_bytes())
        .finalize();
    let mut address = [0u8; ADDRESS_LEN];
    address.copy_from_slice(&digest[..ADDRESS_LEN]);
    Address(address)
}

/// Sign `message` with the identity's private key
pub fn sign(message: &[u8], identity: &Identity) -> Signature {
    identity.sign(message)
}

/// Check an Ed25519 signature over `message`.
///
/// Returns `false` for wrong-length or invalid keys and signatures, and
/// for non-canonical signatures.
pub fn verify_signature(message: &[u8], signature: &[u8], public_key: &[u8]) -> bool {
    let Ok(key_bytes) = <[u8; PUBLIC_KEY_LEN]>::try_from(public_key) else {
        return false;
    };
    let Ok(sig_bytes) = <[u8; SIGNATURE_LEN]>::try_from(signature) else {
        return false;
    };
    let Ok(key) = VerifyingKey::from_bytes(&key_bytes) else {
        return false;
    };
    let sig = ed25519_dalek::Signature::from_bytes(&sig_bytes);
    key.verify_strict(message, &sig).is_ok()
}
