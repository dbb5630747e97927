// Durable per-account cursor persistence
pub mod file;

use async_trait::async_trait;

use crate::error::AppResult;
use crate::ledger::models::Cursor;

pub use file::FileCursorStore;

#[async_trait]
pub trait CursorStore: Send + Sync {
    /// Last processed cursor, `None` when absent or unreadable as a cursor
    async fn load(&self, account: &str) -> AppResult<Option<Cursor>>;

    /// Overwrite the stored cursor for `account`
    async fn save(&self, account: &str, cursor: Cursor) -> AppResult<()>;
}
