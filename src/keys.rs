use ed25519_dalek::SigningKey;
use rand::RngCore;
use stellar_strkey::ed25519::{PrivateKey, PublicKey};

use crate::error::{AppError, AppResult};

/// Random ed25519 keypair rendered as Stellar strkeys
#[derive(Clone)]
pub struct StellarKeypair {
    /// `G...` account address
    pub address: String,
    /// `S...` secret seed
    pub secret: String,
}

impl StellarKeypair {
    pub fn random() -> Self {
        let mut seed = [0u8; 32];
        rand::rng().fill_bytes(&mut seed);
        Self::from_seed(seed)
    }

    pub fn from_seed(seed: [u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(&seed);
        let public = signing_key.verifying_key().to_bytes();

        Self {
            address: PublicKey(public).to_string(),
            secret: PrivateKey(seed).to_string(),
        }
    }
}

impl std::fmt::Debug for StellarKeypair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StellarKeypair")
            .field("address", &self.address)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Checks that `address` is a well-formed `G...` account id
pub fn validate_account(address: &str) -> AppResult<()> {
    PublicKey::from_string(address)
        .map(|_| ())
        .map_err(|_| AppError::InvalidAddress(address.to_string()))
}
