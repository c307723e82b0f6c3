use std::path::{Path, PathBuf};
#[cfg(test)]
use std::sync::Mutex;

use async_trait::async_trait;
use log::info;
use sqlx::{MySqlPool, Row};

use crate::error::SessionStoreError;
use crate::models::session::CheckerState;

// `save` always replaces the whole stored state.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self) -> Result<Option<CheckerState>, SessionStoreError>;
    async fn save(&self, state: &CheckerState) -> Result<(), SessionStoreError>;
    async fn clear(&self) -> Result<(), SessionStoreError>;
}

#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        FileSessionStore { path: path.as_ref().to_path_buf() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn load(&self) -> Result<Option<CheckerState>, SessionStoreError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_str(&raw)?))
    }

    async fn save(&self, state: &CheckerState) -> Result<(), SessionStoreError> {
        let raw = serde_json::to_vec(state)?;
        // Write-then-rename so a crash mid-write leaves the previous session.
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, raw).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    async fn clear(&self) -> Result<(), SessionStoreError> {
        match tokio::fs::remove_file(&self.path).await {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

// One row per session key.
#[derive(Debug, Clone)]
pub struct MySqlSessionStore {
    pool: MySqlPool,
    key: String,
}

impl MySqlSessionStore {
    pub async fn connect(pool: MySqlPool, key: &str) -> Result<Self, SessionStoreError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS CheckerSessions_ (
                session_key VARCHAR(64) PRIMARY KEY,
                payload LONGTEXT NOT NULL,
                updated_at DATETIME NOT NULL
            )",
        )
        .execute(&pool)
        .await?;
        info!("Using MySQL session store with key {}", key);
        Ok(MySqlSessionStore { pool, key: key.to_string() })
    }
}

#[async_trait]
impl SessionStore for MySqlSessionStore {
    async fn load(&self) -> Result<Option<CheckerState>, SessionStoreError> {
        let row = sqlx::query("SELECT payload FROM CheckerSessions_ WHERE session_key = ?")
            .bind(&self.key)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let payload: String = row.try_get("payload")?;
                Ok(Some(serde_json::from_str(&payload)?))
            }
            None => Ok(None),
        }
    }

    async fn save(&self, state: &CheckerState) -> Result<(), SessionStoreError> {
        let payload = serde_json::to_string(state)?;
        sqlx::query(
            "INSERT INTO CheckerSessions_ (session_key, payload, updated_at) VALUES (?, ?, ?)
             ON DUPLICATE KEY UPDATE payload = VALUES(payload), updated_at = VALUES(updated_at)",
        )
        .bind(&self.key)
        .bind(payload)
        .bind(chrono::Utc::now().naive_utc())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn clear(&self) -> Result<(), SessionStoreError> {
        sqlx::query("DELETE FROM CheckerSessions_ WHERE session_key = ?")
            .bind(&self.key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    slot: Mutex<Option<String>>,
}

#[cfg(test)]
impl MemorySessionStore {
    pub fn with_raw(raw: &str) -> Self {
        MemorySessionStore { slot: Mutex::new(Some(raw.to_string())) }
    }

    pub fn is_empty(&self) -> bool {
        self.slot.lock().map(|slot| slot.is_none()).unwrap_or(true)
    }

    pub fn snapshot(&self) -> Option<CheckerState> {
        let raw = self.slot.lock().ok().and_then(|slot| slot.clone())?;
        serde_json::from_str(&raw).ok()
    }
}

#[cfg(test)]
#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self) -> Result<Option<CheckerState>, SessionStoreError> {
        let raw = self.slot.lock().ok().and_then(|slot| slot.clone());
        match raw {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, state: &CheckerState) -> Result<(), SessionStoreError> {
        let raw = serde_json::to_string(state)?;
        if let Ok(mut slot) = self.slot.lock() {
            *slot = Some(raw);
        }
        Ok(())
    }

    async fn clear(&self) -> Result<(), SessionStoreError> {
        if let Ok(mut slot) = self.slot.lock() {
            *slot = None;
        }
        Ok(())
    }
}

// Server-side jobs are not resumable.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSessionStore;

#[async_trait]
impl SessionStore for NullSessionStore {
    async fn load(&self) -> Result<Option<CheckerState>, SessionStoreError> {
        Ok(None)
    }

    async fn save(&self, _: &CheckerState) -> Result<(), SessionStoreError> {
        Ok(())
    }

    async fn clear(&self) -> Result<(), SessionStoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::check_result::CheckResult;

    fn state() -> CheckerState {
        let mut state = CheckerState::new(vec!["a".into(), "b".into()], 1, 2, "names.txt");
        state.results.push(CheckResult::dated("a", "2023-11-14".into()));
        state.current_index = 1;
        state
    }

    #[tokio::test]
    async fn file_store_round_trip_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path().join("session.json"));

        assert_eq!(store.load().await.unwrap(), None);
        store.save(&state()).await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some(state()));

        store.clear().await.unwrap();
        assert_eq!(store.load().await.unwrap(), None);
        // Clearing twice is fine.
        store.clear().await.unwrap();
    }

    #[tokio::test]
    async fn file_store_overwrites_wholesale() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path().join("session.json"));
        store.save(&state()).await.unwrap();

        let mut next = state();
        next.results.push(CheckResult::dated("b", "2024-01-01".into()));
        next.current_index = 2;
        store.save(&next).await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some(next));
    }

    #[tokio::test]
    async fn corrupt_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "{not json").unwrap();
        let store = FileSessionStore::new(&path);
        assert!(matches!(store.load().await, Err(SessionStoreError::Corrupt(_))));
    }

    #[tokio::test]
    async fn memory_store_behaves_like_a_slot() {
        let store = MemorySessionStore::default();
        assert!(store.is_empty());
        store.save(&state()).await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some(state()));
        store.clear().await.unwrap();
        assert!(store.is_empty());
    }
}
