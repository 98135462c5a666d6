use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard},
};

use chrono::Utc;

use super::{ProgressStore, ReadingCatalog};
use crate::domain::{
    catalog::BookLanguage,
    models::{Percent, ProgressKey, ReadingProgress},
};

/// In-process store. Same conflict semantics as the relational backends.
#[derive(Debug, Default)]
pub struct MemoryStore {
    reads: Mutex<HashMap<ProgressKey, ReadingProgress>>,
    catalog: Mutex<HashMap<String, Vec<BookLanguage>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_book(self, book_id: impl Into<String>, languages: Vec<BookLanguage>) -> Self {
        lock(&self.catalog).insert(book_id.into(), languages);
        self
    }

    fn reads(&self) -> MutexGuard<'_, HashMap<ProgressKey, ReadingProgress>> {
        lock(&self.reads)
    }
}

// A poisoned map is still consistent: every write is a single insert.
fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait::async_trait]
impl ProgressStore for MemoryStore {
    async fn read(&self, key: &ProgressKey) -> anyhow::Result<Option<ReadingProgress>> {
        Ok(self.reads().get(key).cloned())
    }

    async fn insert_if_absent(&self, key: &ProgressKey) -> anyhow::Result<()> {
        self.reads()
            .entry(key.clone())
            .or_insert_with(|| ReadingProgress {
                key: key.clone(),
                percent: Percent::ZERO,
                updated_at: Some(Utc::now()),
            });
        Ok(())
    }

    async fn upsert(&self, key: &ProgressKey, percent: Percent) -> anyhow::Result<()> {
        self.reads().insert(
            key.clone(),
            ReadingProgress {
                key: key.clone(),
                percent,
                updated_at: Some(Utc::now()),
            },
        );
        Ok(())
    }

    async fn list_for_user(&self, user_id: &str) -> anyhow::Result<Vec<ReadingProgress>> {
        let mut rows: Vec<ReadingProgress> = self
            .reads()
            .values()
            .filter(|r| r.key.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(rows)
    }
}

#[async_trait::async_trait]
impl ReadingCatalog for MemoryStore {
    async fn book_languages(&self, book_id: &str) -> anyhow::Result<Vec<BookLanguage>> {
        Ok(lock(&self.catalog).get(book_id).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn insert_if_absent_keeps_existing_progress() {
        let store = MemoryStore::new();
        let key = ProgressKey::new("u1", "b1", "en");
        store.upsert(&key, Percent::new(64).unwrap()).await.unwrap();
        store.insert_if_absent(&key).await.unwrap();
        let row = store.read(&key).await.unwrap().unwrap();
        assert_eq!(row.percent.get(), 64);
    }

    #[tokio::test]
    async fn languages_are_independent_rows() {
        let store = MemoryStore::new();
        let en = ProgressKey::new("u1", "b1", "en");
        let vi = en.with_language("vi");
        store.upsert(&en, Percent::new(10).unwrap()).await.unwrap();
        assert!(store.read(&vi).await.unwrap().is_none());
        store.insert_if_absent(&vi).await.unwrap();
        assert_eq!(store.list_for_user("u1").await.unwrap().len(), 2);
        assert!(store.list_for_user("u2").await.unwrap().is_empty());
    }
}
