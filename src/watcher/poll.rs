use std::future::Future;
use std::sync::Arc;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::{
    cursor::CursorStore,
    error::AppResult,
    ledger::{
        models::{Cursor, PaymentRecord},
        PaymentSource,
    },
    notify::Notifier,
    watcher::{
        filter::PaymentFilter,
        message::{payment_message, welcome_message},
    },
};

/// What a single poll cycle did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollOutcome {
    pub notified: usize,
    pub skipped: usize,
    /// A notification failed and the rest of the page was left for later
    pub halted: bool,
    /// Cursor written to the store during this cycle
    pub cursor: Option<Cursor>,
}

/// Watches the payment history of one account
pub struct Watcher {
    account: String,
    explorer_url: String,
    source: Arc<dyn PaymentSource>,
    store: Arc<dyn CursorStore>,
    notifier: Arc<dyn Notifier>,
    filters: Vec<Box<dyn PaymentFilter>>,
}

impl Watcher {
    pub fn new(
        account: String,
        explorer_url: String,
        source: Arc<dyn PaymentSource>,
        store: Arc<dyn CursorStore>,
        notifier: Arc<dyn Notifier>,
        filters: Vec<Box<dyn PaymentFilter>>,
    ) -> Self {
        Self {
            account,
            explorer_url,
            source,
            store,
            notifier,
            filters,
        }
    }

    /// Run one cycle: notify new payments and advance the cursor as far as
    /// notifications succeeded
    pub async fn poll(&self) -> AppResult<PollOutcome> {
        let mut outcome = PollOutcome::default();

        let last_cursor = self.store.load(&self.account).await?;
        if last_cursor.is_none() {
            info!("👋 No cursor for {}, sending welcome message", self.account);
            // welcome outcome is not tracked
            let _ = self.notifier.notify(&welcome_message(&self.account)).await;
        }

        let records = self.source.fetch_payments(&self.account, last_cursor).await?;
        if records.is_empty() {
            return Ok(outcome);
        }

        // a malformed token anywhere in the page fails the cycle before anything is sent
        let cursors = records
            .iter()
            .map(PaymentRecord::cursor)
            .collect::<AppResult<Vec<Cursor>>>()?;

        let mut last_processed: Option<Cursor> = None;
        for (record, current) in records.iter().zip(cursors) {

            if let Some(filter) = self.filters.iter().find(|f| !f.accepts(record)) {
                info!(
                    "Discarding {} {} ({})",
                    record.kind,
                    record.paging_token,
                    filter.name()
                );
                last_processed = Some(current);
                outcome.skipped += 1;
                continue;
            }

            debug!(
                "Notifying {} created at {:?}",
                record.paging_token, record.created_at
            );
            let message = payment_message(&self.account, record, &self.explorer_url);
            if self.notifier.notify(&message).await {
                last_processed = Some(current);
                outcome.notified += 1;
            } else {
                warn!(
                    "Notification failed at {}, bailing out until next cycle",
                    record.paging_token
                );
                outcome.halted = true;
                break;
            }
        }

        if let Some(cursor) = last_processed {
            if last_cursor.map_or(true, |previous| cursor > previous) {
                self.store.save(&self.account, cursor).await?;
                outcome.cursor = Some(cursor);
            } else {
                warn!(
                    "Refusing to move cursor for {} backwards ({:?} -> {})",
                    self.account, last_cursor, cursor
                );
            }
        }

        info!(
            "✓ Poll cycle for {}: {} notified, {} skipped{}",
            self.account,
            outcome.notified,
            outcome.skipped,
            if outcome.halted { ", halted" } else { "" }
        );

        Ok(outcome)
    }

    /// Poll on a fixed interval until Ctrl+C.
    ///
    /// A failed cycle is logged and retried on the next tick.
    pub async fn run(&self, every: Duration) -> AppResult<()> {
        info!(
            "⏰ Watching {} every {}s, press Ctrl+C to stop",
            self.account,
            every.as_secs()
        );
        self.run_until(every, tokio::signal::ctrl_c()).await
    }

    /// Poll on a fixed interval until `shutdown` resolves
    pub async fn run_until<F: Future>(&self, every: Duration, shutdown: F) -> AppResult<()> {
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        // created once so a signal received during a cycle is seen on the next pass
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.poll().await {
                        error!("❌ Poll cycle for {} failed: {}", self.account, e);
                    }
                }
                _ = &mut shutdown => {
                    info!("Received shutdown signal, exiting gracefully...");
                    return Ok(());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AppError, LedgerError};
    use crate::watcher::filter::default_filters;
    use crate::watcher::message::DEFAULT_EXPLORER_URL;
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;
    use tokio::sync::oneshot;

    const ACCOUNT: &str = "A";

    /// Serves records strictly after the requested cursor, like Horizon with
    /// `order=asc`
    struct FakeLedger {
        records: Vec<PaymentRecord>,
        page_size: usize,
        requests: Mutex<Vec<Option<Cursor>>>,
    }

    impl FakeLedger {
        fn new(records: Vec<PaymentRecord>) -> Self {
            Self {
                records,
                page_size: 10,
                requests: Mutex::new(Vec::new()),
            }
        }

        fn requests(&self) -> Vec<Option<Cursor>> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PaymentSource for FakeLedger {
        async fn fetch_payments(
            &self,
            _account: &str,
            since: Option<Cursor>,
        ) -> AppResult<Vec<PaymentRecord>> {
            self.requests.lock().unwrap().push(since);
            Ok(self
                .records
                .iter()
                .filter(|r| since.map_or(true, |c| r.cursor().unwrap() > c))
                .take(self.page_size)
                .cloned()
                .collect())
        }
    }

    struct FailingLedger;

    #[async_trait]
    impl PaymentSource for FailingLedger {
        async fn fetch_payments(
            &self,
            _account: &str,
            _since: Option<Cursor>,
        ) -> AppResult<Vec<PaymentRecord>> {
            Err(LedgerError::Request("connection refused".to_string()).into())
        }
    }

    #[derive(Default)]
    struct MemoryStore {
        cursors: Mutex<HashMap<String, Cursor>>,
        saves: Mutex<Vec<Cursor>>,
    }

    impl MemoryStore {
        fn with_cursor(cursor: Cursor) -> Self {
            let store = Self::default();
            store
                .cursors
                .lock()
                .unwrap()
                .insert(ACCOUNT.to_string(), cursor);
            store
        }

        fn current(&self) -> Option<Cursor> {
            self.cursors.lock().unwrap().get(ACCOUNT).copied()
        }

        fn saves(&self) -> Vec<Cursor> {
            self.saves.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CursorStore for MemoryStore {
        async fn load(&self, account: &str) -> AppResult<Option<Cursor>> {
            Ok(self.cursors.lock().unwrap().get(account).copied())
        }

        async fn save(&self, account: &str, cursor: Cursor) -> AppResult<()> {
            self.cursors
                .lock()
                .unwrap()
                .insert(account.to_string(), cursor);
            self.saves.lock().unwrap().push(cursor);
            Ok(())
        }
    }

    /// Replays scripted outcomes, then succeeds
    #[derive(Default)]
    struct ScriptedNotifier {
        outcomes: Mutex<VecDeque<bool>>,
        sent: Mutex<Vec<String>>,
    }

    impl ScriptedNotifier {
        fn with_outcomes(outcomes: &[bool]) -> Self {
            Self {
                outcomes: Mutex::new(outcomes.iter().copied().collect()),
                sent: Mutex::new(Vec::new()),
            }
        }

        fn sent(&self) -> Vec<String> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Notifier for ScriptedNotifier {
        async fn notify(&self, message: &str) -> bool {
            self.sent.lock().unwrap().push(message.to_string());
            self.outcomes.lock().unwrap().pop_front().unwrap_or(true)
        }
    }

    fn payment(token: u64, from: &str, to: &str, amount: &str) -> PaymentRecord {
        PaymentRecord {
            paging_token: token.to_string(),
            kind: "payment".to_string(),
            type_i: 1,
            amount: Some(amount.to_string()),
            from: Some(from.to_string()),
            to: Some(to.to_string()),
            asset_type: Some("native".to_string()),
            asset_code: None,
            transaction_hash: format!("h{}", token),
            created_at: None,
        }
    }

    fn create_account(token: u64) -> PaymentRecord {
        PaymentRecord {
            paging_token: token.to_string(),
            kind: "create_account".to_string(),
            type_i: 0,
            amount: None,
            from: None,
            to: None,
            asset_type: None,
            asset_code: None,
            transaction_hash: format!("h{}", token),
            created_at: None,
        }
    }

    fn watcher(
        ledger: Arc<dyn PaymentSource>,
        store: Arc<MemoryStore>,
        notifier: Arc<ScriptedNotifier>,
        minimum: Decimal,
    ) -> Watcher {
        Watcher::new(
            ACCOUNT.to_string(),
            DEFAULT_EXPLORER_URL.to_string(),
            ledger,
            store,
            notifier,
            default_filters(minimum),
        )
    }

    #[tokio::test]
    async fn test_first_run_notifies_and_persists() {
        let ledger = Arc::new(FakeLedger::new(vec![payment(100, "B", "A", "5.0")]));
        let store = Arc::new(MemoryStore::default());
        let notifier = Arc::new(ScriptedNotifier::default());

        let outcome = watcher(ledger, store.clone(), notifier.clone(), Decimal::ZERO)
            .poll()
            .await
            .unwrap();

        assert_eq!(store.current(), Some(Cursor::new(100)));
        assert_eq!(outcome.notified, 1);
        assert_eq!(outcome.cursor, Some(Cursor::new(100)));

        let sent = notifier.sent();
        assert_eq!(sent.len(), 2);
        assert!(sent[0].contains("I'll let you know"));
        assert!(sent[1].contains("Received"));
        assert!(sent[1].contains("B"));
        assert!(sent[1].contains("h100"));
    }

    #[tokio::test]
    async fn test_first_payment_failure_leaves_store_untouched() {
        let ledger = Arc::new(FakeLedger::new(vec![payment(100, "B", "A", "5.0")]));
        let store = Arc::new(MemoryStore::default());
        // welcome succeeds, payment fails
        let notifier = Arc::new(ScriptedNotifier::with_outcomes(&[true, false]));

        let outcome = watcher(ledger, store.clone(), notifier, Decimal::ZERO)
            .poll()
            .await
            .unwrap();

        assert!(outcome.halted);
        assert_eq!(outcome.cursor, None);
        assert_eq!(store.current(), None);
        assert!(store.saves().is_empty());
    }

    #[tokio::test]
    async fn test_failure_mid_page_keeps_previous_cursor() {
        let ledger = Arc::new(FakeLedger::new(vec![
            payment(100, "B", "A", "5.0"),
            payment(101, "A", "C", "1.0"),
            payment(102, "B", "A", "2.0"),
        ]));
        let store = Arc::new(MemoryStore::with_cursor(Cursor::new(99)));
        let notifier = Arc::new(ScriptedNotifier::with_outcomes(&[true, false]));

        let outcome = watcher(ledger, store.clone(), notifier.clone(), Decimal::ZERO)
            .poll()
            .await
            .unwrap();

        assert_eq!(store.current(), Some(Cursor::new(100)));
        assert_eq!(outcome.notified, 1);
        assert!(outcome.halted);
        // record 102 was never attempted
        assert_eq!(notifier.sent().len(), 2);
    }

    #[tokio::test]
    async fn test_failed_records_are_retried_next_cycle() {
        let ledger = Arc::new(FakeLedger::new(vec![
            payment(100, "B", "A", "5.0"),
            payment(101, "A", "C", "1.0"),
            payment(102, "B", "A", "2.0"),
        ]));
        let store = Arc::new(MemoryStore::with_cursor(Cursor::new(99)));
        let notifier = Arc::new(ScriptedNotifier::with_outcomes(&[true, false]));
        let watcher = watcher(ledger.clone(), store.clone(), notifier.clone(), Decimal::ZERO);

        watcher.poll().await.unwrap();
        let outcome = watcher.poll().await.unwrap();

        assert_eq!(outcome.notified, 2);
        assert!(!outcome.halted);
        assert_eq!(store.current(), Some(Cursor::new(102)));
        assert_eq!(
            ledger.requests(),
            vec![Some(Cursor::new(99)), Some(Cursor::new(100))]
        );

        let sent = notifier.sent();
        assert!(sent[1].contains("sent to C"));
        assert_eq!(sent[1], sent[2]);
        assert!(sent[3].contains("h102"));
    }

    #[tokio::test]
    async fn test_non_payments_are_skipped_and_advance() {
        let ledger = Arc::new(FakeLedger::new(vec![
            create_account(100),
            payment(101, "B", "A", "5.0"),
            create_account(102),
        ]));
        let store = Arc::new(MemoryStore::with_cursor(Cursor::new(50)));
        let notifier = Arc::new(ScriptedNotifier::default());

        let outcome = watcher(ledger, store.clone(), notifier.clone(), Decimal::ZERO)
            .poll()
            .await
            .unwrap();

        assert_eq!(outcome.skipped, 2);
        assert_eq!(outcome.notified, 1);
        assert_eq!(store.current(), Some(Cursor::new(102)));
        assert_eq!(notifier.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_skipped_records_advance_even_if_later_failure() {
        let ledger = Arc::new(FakeLedger::new(vec![
            create_account(100),
            payment(101, "B", "A", "5.0"),
        ]));
        let store = Arc::new(MemoryStore::with_cursor(Cursor::new(50)));
        let notifier = Arc::new(ScriptedNotifier::with_outcomes(&[false]));

        let outcome = watcher(ledger, store.clone(), notifier, Decimal::ZERO)
            .poll()
            .await
            .unwrap();

        assert!(outcome.halted);
        assert_eq!(store.current(), Some(Cursor::new(100)));
    }

    #[tokio::test]
    async fn test_minimum_amount_filter() {
        let ledger = Arc::new(FakeLedger::new(vec![
            payment(100, "B", "A", "0.0500000"),
            payment(101, "B", "A", "0.1000000"),
        ]));
        let store = Arc::new(MemoryStore::with_cursor(Cursor::new(1)));
        let notifier = Arc::new(ScriptedNotifier::default());

        let outcome = watcher(ledger, store.clone(), notifier.clone(), dec!(0.1))
            .poll()
            .await
            .unwrap();

        assert_eq!(outcome.skipped, 1);
        assert_eq!(outcome.notified, 1);
        assert_eq!(store.current(), Some(Cursor::new(101)));

        let sent = notifier.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].starts_with("0.1000000 XLM"));
    }

    #[tokio::test]
    async fn test_empty_page_is_a_no_op() {
        let ledger = Arc::new(FakeLedger::new(vec![]));
        let store = Arc::new(MemoryStore::with_cursor(Cursor::new(10)));
        let notifier = Arc::new(ScriptedNotifier::default());

        let outcome = watcher(ledger, store.clone(), notifier.clone(), Decimal::ZERO)
            .poll()
            .await
            .unwrap();

        assert_eq!(outcome, PollOutcome::default());
        assert!(notifier.sent().is_empty());
        assert!(store.saves().is_empty());
    }

    #[tokio::test]
    async fn test_failed_welcome_does_not_block_cycle() {
        let ledger = Arc::new(FakeLedger::new(vec![payment(100, "A", "B", "3")]));
        let store = Arc::new(MemoryStore::default());
        let notifier = Arc::new(ScriptedNotifier::with_outcomes(&[false, true]));

        let outcome = watcher(ledger, store.clone(), notifier.clone(), Decimal::ZERO)
            .poll()
            .await
            .unwrap();

        assert_eq!(outcome.notified, 1);
        assert_eq!(store.current(), Some(Cursor::new(100)));
        assert_eq!(notifier.sent().len(), 2);
    }

    #[tokio::test]
    async fn test_empty_page_on_first_run_sends_welcome_only() {
        let ledger = Arc::new(FakeLedger::new(vec![]));
        let store = Arc::new(MemoryStore::default());
        let notifier = Arc::new(ScriptedNotifier::default());

        watcher(ledger, store.clone(), notifier.clone(), Decimal::ZERO)
            .poll()
            .await
            .unwrap();

        assert_eq!(notifier.sent().len(), 1);
        assert_eq!(store.current(), None);
    }

    #[tokio::test]
    async fn test_cursor_never_decreases_across_cycles() {
        let records: Vec<_> = (100..125)
            .map(|t| {
                if t % 4 == 0 {
                    create_account(t)
                } else {
                    payment(t, "B", "A", "1")
                }
            })
            .collect();
        let ledger = Arc::new(FakeLedger::new(records));
        let store = Arc::new(MemoryStore::default());
        // failures scattered across cycles
        let notifier = Arc::new(ScriptedNotifier::with_outcomes(&[
            true, true, false, true, true, true, false, false, true,
        ]));
        let watcher = watcher(ledger, store.clone(), notifier, Decimal::ZERO);

        for _ in 0..8 {
            watcher.poll().await.unwrap();
        }

        let saves = store.saves();
        assert!(!saves.is_empty());
        assert!(saves.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(store.current(), Some(Cursor::new(124)));
    }

    #[tokio::test]
    async fn test_ledger_failure_propagates() {
        let store = Arc::new(MemoryStore::with_cursor(Cursor::new(5)));
        let notifier = Arc::new(ScriptedNotifier::default());

        let err = watcher(Arc::new(FailingLedger), store.clone(), notifier, Decimal::ZERO)
            .poll()
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Ledger(_)));
        assert_eq!(store.current(), Some(Cursor::new(5)));
    }

    #[tokio::test]
    async fn test_malformed_token_fails_cycle_without_saving() {
        let mut bad = payment(100, "B", "A", "1");
        bad.paging_token = "oops".to_string();
        let ledger = Arc::new(FakeLedger {
            records: vec![bad],
            page_size: 10,
            requests: Mutex::new(Vec::new()),
        });
        // FakeLedger would parse tokens when filtering by cursor, so start fresh
        let store = Arc::new(MemoryStore::default());
        let notifier = Arc::new(ScriptedNotifier::default());

        let err = watcher(ledger, store.clone(), notifier, Decimal::ZERO)
            .poll()
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Ledger(LedgerError::MalformedToken(_))));
        assert!(store.saves().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_token_later_in_page_sends_nothing() {
        let mut bad = payment(102, "B", "A", "1");
        bad.paging_token = "oops".to_string();
        let ledger = Arc::new(FakeLedger::new(vec![
            payment(100, "B", "A", "5.0"),
            payment(101, "A", "C", "1.0"),
            bad,
        ]));
        let store = Arc::new(MemoryStore::default());
        let notifier = Arc::new(ScriptedNotifier::default());
        let watcher = watcher(ledger, store.clone(), notifier.clone(), Decimal::ZERO);

        for _ in 0..2 {
            let err = watcher.poll().await.unwrap_err();
            assert!(matches!(err, AppError::Ledger(LedgerError::MalformedToken(_))));
        }

        // only the welcome message of each cycle went out
        let sent = notifier.sent();
        assert_eq!(sent.len(), 2);
        assert!(sent.iter().all(|m| m.contains("I'll let you know")));
        assert!(store.saves().is_empty());
    }

    /// Fires the shutdown channel on its first message, then succeeds
    struct ShutdownOnNotify {
        shutdown: Mutex<Option<oneshot::Sender<()>>>,
    }

    #[async_trait]
    impl Notifier for ShutdownOnNotify {
        async fn notify(&self, _message: &str) -> bool {
            if let Some(tx) = self.shutdown.lock().unwrap().take() {
                let _ = tx.send(());
            }
            true
        }
    }

    #[tokio::test]
    async fn test_shutdown_during_cycle_stops_loop() {
        let (tx, rx) = oneshot::channel();
        let ledger = Arc::new(FakeLedger::new(vec![payment(100, "B", "A", "5.0")]));
        let store = Arc::new(MemoryStore::default());
        let watcher = Watcher::new(
            ACCOUNT.to_string(),
            DEFAULT_EXPLORER_URL.to_string(),
            ledger,
            store.clone(),
            Arc::new(ShutdownOnNotify {
                shutdown: Mutex::new(Some(tx)),
            }),
            default_filters(Decimal::ZERO),
        );

        tokio::time::timeout(
            Duration::from_secs(5),
            watcher.run_until(Duration::from_secs(3600), rx),
        )
        .await
        .expect("loop should stop after the signal")
        .unwrap();

        assert_eq!(store.current(), Some(Cursor::new(100)));
    }
}
