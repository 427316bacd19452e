//! secp256k1 implementations of the signing ports.
//!
//! Messages are hashed with blake3 before ECDSA signing. Signatures are 64-byte compact
//! encodings; public keys are 33-byte compressed points.

use crate::domain::{InputSigner, MessageSigner, MessageVerifier, Transaction};
use crate::foundation::util::encoding::parse_hex_32bytes;
use crate::foundation::{Hash32, MixError, Result};
use rand::rngs::OsRng;
use secp256k1::ecdsa::Signature;
use secp256k1::{All, Message, PublicKey, Secp256k1, SecretKey};

pub const COMPACT_SIGNATURE_LEN: usize = 64;
pub const COMPRESSED_PUBKEY_LEN: usize = 33;
/// Unlocking data for a pay-to-pubkey-hash input: signature followed by public key.
pub const SCRIPT_SIG_LEN: usize = COMPACT_SIGNATURE_LEN + COMPRESSED_PUBKEY_LEN;

fn message_digest(message: &[u8]) -> Hash32 {
    *blake3::hash(message).as_bytes()
}

/// Key hash committed to by pay-to-pubkey-hash scripts.
pub fn pubkey_hash(public_key: &[u8]) -> [u8; 20] {
    let digest = blake3::hash(public_key);
    let mut out = [0u8; 20];
    out.copy_from_slice(&digest.as_bytes()[..20]);
    out
}

fn parse_secret_key(secret_hex: &str) -> Result<SecretKey> {
    let bytes = parse_hex_32bytes(secret_hex)?;
    SecretKey::from_slice(&bytes).map_err(|err| MixError::CryptoError { operation: "parse_secret_key".to_string(), details: err.to_string() })
}

/// Verify a compact ECDSA signature over a 32-byte digest.
pub fn verify_digest(secp: &Secp256k1<All>, digest: Hash32, signature: &[u8], public_key: &[u8]) -> bool {
    let Ok(public_key) = PublicKey::from_slice(public_key) else {
        return false;
    };
    let Ok(signature) = Signature::from_compact(signature) else {
        return false;
    };
    secp.verify_ecdsa(&Message::from_digest(digest), &signature, &public_key).is_ok()
}

/// Fixed coordinator key.
pub struct Secp256k1MessageSigner {
    secp: Secp256k1<All>,
    secret_key: SecretKey,
    public_key: PublicKey,
}

impl Secp256k1MessageSigner {
    pub fn new(secret_key: SecretKey) -> Self {
        let secp = Secp256k1::new();
        let public_key = PublicKey::from_secret_key(&secp, &secret_key);
        Self { secp, secret_key, public_key }
    }

    pub fn from_secret_hex(secret_hex: &str) -> Result<Self> {
        Ok(Self::new(parse_secret_key(secret_hex)?))
    }

    pub fn generate() -> Self {
        Self::new(SecretKey::new(&mut OsRng))
    }

    pub fn secret_hex(&self) -> String {
        hex::encode(self.secret_key.secret_bytes())
    }
}

impl MessageSigner for Secp256k1MessageSigner {
    fn sign(&self, message: &[u8]) -> Result<Vec<u8>> {
        let signature = self.secp.sign_ecdsa(&Message::from_digest(message_digest(message)), &self.secret_key);
        Ok(signature.serialize_compact().to_vec())
    }

    fn public_key(&self) -> Vec<u8> {
        self.public_key.serialize().to_vec()
    }
}

pub struct Secp256k1MessageVerifier {
    secp: Secp256k1<All>,
}

impl Secp256k1MessageVerifier {
    pub fn new() -> Self {
        Self { secp: Secp256k1::new() }
    }
}

impl Default for Secp256k1MessageVerifier {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageVerifier for Secp256k1MessageVerifier {
    fn verify(&self, message: &[u8], signature: &[u8], public_key: &[u8]) -> bool {
        verify_digest(&self.secp, message_digest(message), signature, public_key)
    }
}

/// Wallet key signing pay-to-pubkey-hash inputs it owns.
pub struct KeyInputSigner {
    secp: Secp256k1<All>,
    secret_key: SecretKey,
    public_key: PublicKey,
}

impl KeyInputSigner {
    pub fn new(secret_key: SecretKey) -> Self {
        let secp = Secp256k1::new();
        let public_key = PublicKey::from_secret_key(&secp, &secret_key);
        Self { secp, secret_key, public_key }
    }

    pub fn from_secret_hex(secret_hex: &str) -> Result<Self> {
        Ok(Self::new(parse_secret_key(secret_hex)?))
    }

    pub fn generate() -> Self {
        Self::new(SecretKey::new(&mut OsRng))
    }

    pub fn public_key(&self) -> [u8; COMPRESSED_PUBKEY_LEN] {
        self.public_key.serialize()
    }

    pub fn pubkey_hash(&self) -> [u8; 20] {
        pubkey_hash(&self.public_key.serialize())
    }
}

impl InputSigner for KeyInputSigner {
    fn sign_input(&self, tx: &Transaction, index: usize) -> Result<Vec<u8>> {
        let digest = tx.signature_hash(index)?;
        let signature = self.secp.sign_ecdsa(&Message::from_digest(digest), &self.secret_key);
        let mut script_sig = Vec::with_capacity(SCRIPT_SIG_LEN);
        script_sig.extend_from_slice(&signature.serialize_compact());
        script_sig.extend_from_slice(&self.public_key.serialize());
        Ok(script_sig)
    }
}
