//! The custodial faucet account.

use crate::encoding::AccountId;
use ed25519_dalek::{Signer, SigningKey};
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyError {
    #[error("private key is not hex: {0}")]
    Hex(String),

    #[error("private key must be 32 or 64 bytes, got {0}")]
    Length(usize),

    #[error("public half of the private key does not match its seed")]
    Mismatch,
}

/// Keypair funding every top-up. The secret never leaves this type.
pub struct FaucetAccount {
    signing_key: SigningKey,
    id: AccountId,
}

impl FaucetAccount {
    /// Accepts either the 64-byte secret key produced by the SDKs
    /// (seed followed by public key) or the bare 32-byte seed, hex encoded.
    pub fn from_hex(private_key: &str) -> Result<Self, KeyError> {
        let trimmed = private_key.trim();
        let hex_str = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        let bytes = hex::decode(hex_str).map_err(|e| KeyError::Hex(e.to_string()))?;

        let signing_key = match bytes.len() {
            32 => {
                let mut seed = [0u8; 32];
                seed.copy_from_slice(&bytes);
                SigningKey::from_bytes(&seed)
            }
            64 => {
                let mut keypair = [0u8; 64];
                keypair.copy_from_slice(&bytes);
                SigningKey::from_keypair_bytes(&keypair).map_err(|_| KeyError::Mismatch)?
            }
            n => return Err(KeyError::Length(n)),
        };

        let id = AccountId(signing_key.verifying_key().to_bytes());
        Ok(Self { signing_key, id })
    }

    pub fn id(&self) -> AccountId {
        self.id
    }

    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.signing_key.sign(message).to_bytes()
    }
}

impl fmt::Debug for FaucetAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FaucetAccount").field("id", &self.id.to_string()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signature, Verifier, VerifyingKey};

    const SEED: &str = "0101010101010101010101010101010101010101010101010101010101010101";

    #[test]
    fn test_seed_and_keypair_forms_agree() {
        let from_seed = FaucetAccount::from_hex(SEED).unwrap();
        let public = hex::encode(from_seed.id().as_bytes());
        let from_pair = FaucetAccount::from_hex(&format!("{}{}", SEED, public)).unwrap();

        assert_eq!(from_seed.id(), from_pair.id());
        assert!(from_seed.id().to_string().starts_with("ak_"));
    }

    #[test]
    fn test_rejects_bad_keys() {
        assert!(matches!(FaucetAccount::from_hex("zz"), Err(KeyError::Hex(_))));
        assert_eq!(FaucetAccount::from_hex("abcd").unwrap_err(), KeyError::Length(2));

        let wrong_public = format!("{}{}", SEED, "02".repeat(32));
        assert_eq!(FaucetAccount::from_hex(&wrong_public).unwrap_err(), KeyError::Mismatch);
    }

    #[test]
    fn test_signature_verifies_against_account_id() {
        let account = FaucetAccount::from_hex(SEED).unwrap();
        let signature = account.sign(b"ae_uat payload");

        let key = VerifyingKey::from_bytes(account.id().as_bytes()).unwrap();
        assert!(key.verify(b"ae_uat payload", &Signature::from_bytes(&signature)).is_ok());
    }

    #[test]
    fn test_debug_hides_secret() {
        let account = FaucetAccount::from_hex(SEED).unwrap();
        let rendered = format!("{:?}", account);
        assert!(!rendered.contains(SEED));
        assert!(rendered.contains("ak_"));
    }
}
