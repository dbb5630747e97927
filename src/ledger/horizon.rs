use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::Duration;
use tracing::debug;

use crate::{
    error::{AppResult, LedgerError},
    ledger::{
        models::{Cursor, PaymentRecord, PaymentsPage},
        PaymentSource,
    },
};

#[derive(Debug, Clone)]
pub struct HorizonConfig {
    pub horizon_url: String,
    pub page_size: u32,
    pub request_timeout: Duration,
}

impl Default for HorizonConfig {
    fn default() -> Self {
        Self {
            horizon_url: "https://horizon.stellar.org".to_string(),
            page_size: 10,
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Horizon REST client for the payments endpoint
pub struct HorizonClient {
    config: HorizonConfig,
    client: reqwest::Client,
}

impl HorizonClient {
    pub fn new(config: HorizonConfig) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self { config, client })
    }

    fn payments_url(&self, account: &str) -> String {
        format!(
            "{}/accounts/{}/payments",
            self.config.horizon_url.trim_end_matches('/'),
            account
        )
    }
}

#[async_trait]
impl PaymentSource for HorizonClient {
    async fn fetch_payments(
        &self,
        account: &str,
        since: Option<Cursor>,
    ) -> AppResult<Vec<PaymentRecord>> {
        let mut query = vec![
            ("order", "asc".to_string()),
            ("limit", self.config.page_size.to_string()),
        ];
        if let Some(cursor) = since {
            query.push(("cursor", cursor.to_string()));
        }

        debug!("Fetching payments for {} since {:?}", account, since);

        let response = self
            .client
            .get(self.payments_url(account))
            .query(&query)
            .send()
            .await
            .map_err(|e| LedgerError::Request(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(LedgerError::AccountNotFound(account.to_string()).into());
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LedgerError::Status {
                status: status.as_u16(),
                body,
            }
            .into());
        }

        let page: PaymentsPage = response
            .json()
            .await
            .map_err(|e| LedgerError::Request(format!("Failed to parse payments page: {}", e)))?;

        debug!("Fetched {} records for {}", page.embedded.records.len(), account);

        Ok(page.embedded.records)
    }
}
