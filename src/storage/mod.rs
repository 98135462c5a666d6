// Persistence seams for reading progress and the book catalog

pub mod database;
pub mod memory;

use crate::domain::{
    catalog::BookLanguage,
    models::{Percent, ProgressKey, ReadingProgress},
};

/// Remote record store holding one progress row per (user, book, language).
#[async_trait::async_trait]
pub trait ProgressStore: Send + Sync {
    async fn read(&self, key: &ProgressKey) -> anyhow::Result<Option<ReadingProgress>>;
    /// Create the row at 0% unless one already exists; an existing row is left untouched.
    async fn insert_if_absent(&self, key: &ProgressKey) -> anyhow::Result<()>;
    /// Insert or update on the (user, book, language) conflict key.
    async fn upsert(&self, key: &ProgressKey, percent: Percent) -> anyhow::Result<()>;
    /// Every book the user has opened, most recently updated first.
    async fn list_for_user(&self, user_id: &str) -> anyhow::Result<Vec<ReadingProgress>>;
}

#[async_trait::async_trait]
pub trait ReadingCatalog: Send + Sync {
    async fn book_languages(&self, book_id: &str) -> anyhow::Result<Vec<BookLanguage>>;
}
