use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

use crate::{
    cursor::CursorStore,
    error::{AppResult, CursorError},
    ledger::models::Cursor,
};

const CURSOR_FILE_SUFFIX: &str = "_cursor";

/// One plain-text file per account: `<data_dir>/<account>_cursor`
pub struct FileCursorStore {
    data_dir: PathBuf,
}

impl FileCursorStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn cursor_path(&self, account: &str) -> PathBuf {
        self.data_dir.join(format!("{}{}", account, CURSOR_FILE_SUFFIX))
    }

    async fn ensure_data_dir(&self) -> AppResult<()> {
        fs::create_dir_all(&self.data_dir)
            .await
            .map_err(|source| CursorError::Write {
                path: self.data_dir.display().to_string(),
                source,
            })?;
        Ok(())
    }
}

#[async_trait]
impl CursorStore for FileCursorStore {
    async fn load(&self, account: &str) -> AppResult<Option<Cursor>> {
        self.ensure_data_dir().await?;

        let path = self.cursor_path(account);
        let contents = match fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(CursorError::Read {
                    path: path.display().to_string(),
                    source,
                }
                .into())
            }
        };

        match contents.parse::<Cursor>() {
            Ok(cursor) => Ok(Some(cursor)),
            Err(_) => {
                warn!(
                    "Ignoring unreadable cursor {:?} in {}",
                    contents,
                    path.display()
                );
                Ok(None)
            }
        }
    }

    async fn save(&self, account: &str, cursor: Cursor) -> AppResult<()> {
        self.ensure_data_dir().await?;

        let path = self.cursor_path(account);
        let tmp_path = path.with_extension("tmp");
        let write_err = |source: std::io::Error| CursorError::Write {
            path: path.display().to_string(),
            source,
        };

        // rename within one directory replaces the file in a single step
        fs::write(&tmp_path, cursor.to_string())
            .await
            .map_err(write_err)?;
        fs::rename(&tmp_path, &path).await.map_err(write_err)?;

        debug!("Saved cursor {} for {}", cursor, account);
        Ok(())
    }
}
