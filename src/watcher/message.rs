use crate::ledger::models::PaymentRecord;

pub const DEFAULT_EXPLORER_URL: &str = "https://stellar.expert/explorer/tx";

pub fn welcome_message(account: &str) -> String {
    format!(
        "Hi there! I'll let you know if there are transaction from/to {}.",
        account
    )
}

pub fn transaction_url(explorer_url: &str, transaction_hash: &str) -> String {
    format!("{}/{}", explorer_url.trim_end_matches('/'), transaction_hash)
}

/// Describes a payment from the tracked account's point of view
pub fn payment_message(account: &str, record: &PaymentRecord, explorer_url: &str) -> String {
    let amount = record.amount.as_deref().unwrap_or("?");
    let asset = record.asset_symbol();
    let url = transaction_url(explorer_url, &record.transaction_hash);

    if record.to.as_deref() == Some(account) {
        format!(
            "{} {} Received from {}. Details: {}",
            amount,
            asset,
            record.from.as_deref().unwrap_or("unknown"),
            url
        )
    } else {
        format!(
            "{} {} sent to {}. Details: {}",
            amount,
            asset,
            record.to.as_deref().unwrap_or("unknown"),
            url
        )
    }
}
