// Testnet account funding through friendbot
//
// Creates random keypairs and asks the testnet faucet to fund them.
// Accounts the faucet refuses are dropped from the result.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

use crate::error::{AppResult, FundingError};
use crate::keys::StellarKeypair;

pub const DEFAULT_FRIENDBOT_URL: &str = "https://horizon-testnet.stellar.org/friendbot";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundedAccount {
    pub address: String,
    pub secret: String,
}

/// Output document: `{"accounts": [{"address": ..., "secret": ...}]}`
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct FundedAccounts {
    pub accounts: Vec<FundedAccount>,
}

impl FundedAccounts {
    pub async fn write_to(&self, output: &Path) -> AppResult<()> {
        let body = serde_json::to_vec_pretty(self)?;
        tokio::fs::write(output, body).await?;
        Ok(())
    }
}

pub struct FriendbotClient {
    friendbot_url: String,
    client: reqwest::Client,
}

impl FriendbotClient {
    pub fn new(friendbot_url: impl Into<String>) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            friendbot_url: friendbot_url.into(),
            client,
        })
    }

    pub async fn fund(&self, address: &str) -> AppResult<()> {
        info!("Funding account {}", address);

        let response = self
            .client
            .get(&self.friendbot_url)
            .query(&[("addr", address)])
            .send()
            .await
            .map_err(|e| FundingError::Request {
                address: address.to_string(),
                message: e.to_string(),
            })?;

        if response.status() != reqwest::StatusCode::OK {
            warn!("Error funding account {}", address);
            return Err(FundingError::NotFunded {
                address: address.to_string(),
                status: response.status().as_u16(),
            }
            .into());
        }

        info!("Account {} funded", address);
        Ok(())
    }

    /// Generate a keypair and fund it
    pub async fn create_and_fund(&self) -> AppResult<FundedAccount> {
        let keypair = StellarKeypair::random();
        info!("Created account {}", keypair.address);

        self.fund(&keypair.address).await?;

        Ok(FundedAccount {
            address: keypair.address,
            secret: keypair.secret,
        })
    }

    /// Create `count` accounts, keeping only the ones friendbot funded
    pub async fn create_funded_accounts(&self, count: usize) -> FundedAccounts {
        let mut accounts = Vec::with_capacity(count);

        for _ in 0..count {
            match self.create_and_fund().await {
                Ok(account) => accounts.push(account),
                Err(e) => warn!("Skipping account: {}", e),
            }
        }

        info!("✓ Funded {}/{} accounts", accounts.len(), count);
        FundedAccounts { accounts }
    }
}
