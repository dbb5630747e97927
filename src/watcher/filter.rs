use rust_decimal::Decimal;
use std::str::FromStr;
use tracing::warn;

use crate::ledger::models::PaymentRecord;

/// Decides whether a fetched record is worth a notification.
///
/// Rejected records are skipped but still count as processed, so the
/// cursor moves past them.
pub trait PaymentFilter: Send + Sync {
    fn name(&self) -> &'static str;

    fn accepts(&self, record: &PaymentRecord) -> bool;
}

/// Drops every operation that is not a plain payment
pub struct PaymentsOnly;

impl PaymentFilter for PaymentsOnly {
    fn name(&self) -> &'static str {
        "not a payment"
    }

    fn accepts(&self, record: &PaymentRecord) -> bool {
        record.is_payment()
    }
}

/// Drops payments below a configured amount
pub struct MinimumAmount {
    minimum: Decimal,
}

impl MinimumAmount {
    pub fn new(minimum: Decimal) -> Self {
        Self { minimum }
    }
}

impl PaymentFilter for MinimumAmount {
    fn name(&self) -> &'static str {
        "amount too small"
    }

    fn accepts(&self, record: &PaymentRecord) -> bool {
        let Some(raw) = record.amount.as_deref() else {
            return true;
        };

        match Decimal::from_str(raw) {
            Ok(amount) => amount >= self.minimum,
            Err(e) => {
                // an unparseable amount is still reported
                warn!("Unparseable amount {:?} on {}: {}", raw, record.paging_token, e);
                true
            }
        }
    }
}

/// Filter chain for a watcher: always payments-only, plus the minimum
/// amount when it is above zero
pub fn default_filters(minimum_amount: Decimal) -> Vec<Box<dyn PaymentFilter>> {
    let mut filters: Vec<Box<dyn PaymentFilter>> = vec![Box::new(PaymentsOnly)];
    if minimum_amount > Decimal::ZERO {
        filters.push(Box::new(MinimumAmount::new(minimum_amount)));
    }
    filters
}
