use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{AppResult, LedgerError};

/// Horizon `type_i` discriminator for plain payment operations
pub const PAYMENT_TYPE_I: i32 = 1;

/// Native asset symbol used in notification messages
pub const NATIVE_ASSET_CODE: &str = "XLM";

/// Position in an account's payment history (Horizon paging token)
///
/// Tokens are decimal integers on Horizon, so the cursor is ordered and
/// monotonicity can be checked before persisting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Cursor(u64);

impl Cursor {
    pub fn new(token: u64) -> Self {
        Self(token)
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Cursor {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<u64>().map(Cursor::new)
    }
}

/// Single operation record from `/accounts/{id}/payments`
///
/// Non-payment operations (account creation, merges, path payments) share
/// the endpoint, so the payment fields are optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub paging_token: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    pub type_i: i32,
    #[serde(default)]
    pub amount: Option<String>,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default)]
    pub asset_type: Option<String>,
    #[serde(default)]
    pub asset_code: Option<String>,
    pub transaction_hash: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl PaymentRecord {
    pub fn is_payment(&self) -> bool {
        self.type_i == PAYMENT_TYPE_I
    }

    /// Paging token of this record as a cursor
    pub fn cursor(&self) -> AppResult<Cursor> {
        self.paging_token
            .parse::<Cursor>()
            .map_err(|_| LedgerError::MalformedToken(self.paging_token.clone()).into())
    }

    /// Asset symbol for display, `XLM` for native payments
    pub fn asset_symbol(&self) -> &str {
        match (self.asset_type.as_deref(), self.asset_code.as_deref()) {
            (Some("native"), _) | (None, None) => NATIVE_ASSET_CODE,
            (_, Some(code)) => code,
            (Some(_), None) => NATIVE_ASSET_CODE,
        }
    }
}

/// HAL envelope returned by Horizon collection endpoints
#[derive(Debug, Deserialize)]
pub struct PaymentsPage {
    #[serde(rename = "_embedded")]
    pub embedded: EmbeddedRecords,
}

#[derive(Debug, Deserialize)]
pub struct EmbeddedRecords {
    #[serde(default)]
    pub records: Vec<PaymentRecord>,
}
