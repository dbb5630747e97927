// Ledger access: Horizon payment history for a tracked account
pub mod horizon;
pub mod models;

use async_trait::async_trait;

use crate::error::AppResult;
use models::{Cursor, PaymentRecord};

/// Read-only source of payment records for an account
#[async_trait]
pub trait PaymentSource: Send + Sync {
    /// Records strictly after `since`, oldest first, at most one page
    async fn fetch_payments(
        &self,
        account: &str,
        since: Option<Cursor>,
    ) -> AppResult<Vec<PaymentRecord>>;
}
