use crate::errors::ValidationError;
use crate::{AccountAddress, Hash};
use secp256k1::{ecdsa, All, Message, PublicKey, Secp256k1, SecretKey};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

pub const PUBLIC_KEY_SIZE: usize = 33;
pub const SIGNATURE_SIZE: usize = 64;

fn context() -> &'static Secp256k1<All> {
    static CONTEXT: OnceLock<Secp256k1<All>> = OnceLock::new();
    CONTEXT.get_or_init(Secp256k1::new)
}

/// Compressed public key plus compact ECDSA signature over a block's signing digest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockSignature {
    pub public_key: Vec<u8>,
    pub signature: Vec<u8>,
}

impl BlockSignature {
    /// Signs `digest` with `secret_key`
    pub fn sign(digest: &Hash, secret_key: &SecretKey) -> Result<Self, ValidationError> {
        let secp = context();
        let message = Message::from_slice(digest.as_bytes())
            .map_err(|e| ValidationError::InvalidSignature(e.to_string()))?;
        let signature = secp.sign_ecdsa(&message, secret_key);
        let public_key = PublicKey::from_secret_key(secp, secret_key);
        Ok(Self {
            public_key: public_key.serialize().to_vec(),
            signature: signature.serialize_compact().to_vec(),
        })
    }

    /// Verifies the signature against `digest`
    pub fn verify(&self, digest: &Hash) -> Result<(), ValidationError> {
        let public_key = PublicKey::from_slice(&self.public_key)
            .map_err(|e| ValidationError::InvalidPublicKey(e.to_string()))?;
        let signature = ecdsa::Signature::from_compact(&self.signature)
            .map_err(|e| ValidationError::InvalidSignature(e.to_string()))?;
        let message = Message::from_slice(digest.as_bytes())
            .map_err(|e| ValidationError::InvalidSignature(e.to_string()))?;
        context()
            .verify_ecdsa(&message, &signature, &public_key)
            .map_err(|e| ValidationError::InvalidSignature(e.to_string()))
    }

    /// Account controlled by the signing key
    pub fn account(&self) -> AccountAddress {
        AccountAddress::from_public_key(&self.public_key)
    }
}

/// Account address for a secret key
pub fn account_of(secret_key: &SecretKey) -> AccountAddress {
    let public_key = PublicKey::from_secret_key(context(), secret_key);
    AccountAddress::from_public_key(&public_key.serialize())
}
