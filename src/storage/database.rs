// Relational store backed by sea-orm (SQLite by default, see DB_CONNECTION_STRING)

use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use entities::{book_content, user_reads};
use sea_orm::{
    ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    sea_query::OnConflict,
};
use uuid::Uuid;

use super::{ProgressStore, ReadingCatalog};
use crate::domain::{
    catalog::BookLanguage,
    mapping::{map_content_model, map_read_model},
    models::{Percent, ProgressKey, ReadingProgress},
};

#[derive(Clone, Debug)]
pub struct SeaOrmStore {
    db: Arc<DatabaseConnection>,
}

impl SeaOrmStore {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    fn conflict_key() -> OnConflict {
        OnConflict::columns([
            user_reads::Column::UserId,
            user_reads::Column::BookId,
            user_reads::Column::LanguageId,
        ])
    }

    fn new_row(key: &ProgressKey, percent: Percent) -> user_reads::ActiveModel {
        user_reads::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(key.user_id.clone()),
            book_id: Set(key.book_id.clone()),
            language_id: Set(key.language_id.clone()),
            progress: Set(i16::from(percent.get())),
            updated_at: Set(Utc::now()),
        }
    }
}

#[async_trait::async_trait]
impl ProgressStore for SeaOrmStore {
    #[tracing::instrument(level = "debug", skip(self), fields(key = %key))]
    async fn read(&self, key: &ProgressKey) -> anyhow::Result<Option<ReadingProgress>> {
        let row = user_reads::Entity::find()
            .filter(user_reads::Column::UserId.eq(key.user_id.as_str()))
            .filter(user_reads::Column::BookId.eq(key.book_id.as_str()))
            .filter(user_reads::Column::LanguageId.eq(key.language_id.as_str()))
            .one(self.db.as_ref())
            .await
            .with_context(|| format!("Failed to read progress for {}", key))?;
        Ok(row.as_ref().map(map_read_model))
    }

    #[tracing::instrument(level = "debug", skip(self), fields(key = %key))]
    async fn insert_if_absent(&self, key: &ProgressKey) -> anyhow::Result<()> {
        user_reads::Entity::insert(Self::new_row(key, Percent::ZERO))
            .on_conflict(Self::conflict_key().do_nothing().to_owned())
            .exec_without_returning(self.db.as_ref())
            .await
            .with_context(|| format!("Failed to create progress row for {}", key))?;
        Ok(())
    }

    #[tracing::instrument(level = "debug", skip(self), fields(key = %key, percent = percent.get()))]
    async fn upsert(&self, key: &ProgressKey, percent: Percent) -> anyhow::Result<()> {
        user_reads::Entity::insert(Self::new_row(key, percent))
            .on_conflict(
                Self::conflict_key()
                    .update_columns([user_reads::Column::Progress, user_reads::Column::UpdatedAt])
                    .to_owned(),
            )
            .exec_without_returning(self.db.as_ref())
            .await
            .with_context(|| format!("Failed to upsert progress for {}", key))?;
        Ok(())
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn list_for_user(&self, user_id: &str) -> anyhow::Result<Vec<ReadingProgress>> {
        let rows = user_reads::Entity::find()
            .filter(user_reads::Column::UserId.eq(user_id))
            .order_by_desc(user_reads::Column::UpdatedAt)
            .all(self.db.as_ref())
            .await
            .with_context(|| format!("Failed to list reads for user {}", user_id))?;
        Ok(rows.iter().map(map_read_model).collect())
    }
}

#[async_trait::async_trait]
impl ReadingCatalog for SeaOrmStore {
    #[tracing::instrument(level = "debug", skip(self))]
    async fn book_languages(&self, book_id: &str) -> anyhow::Result<Vec<BookLanguage>> {
        let rows = book_content::Entity::find()
            .filter(book_content::Column::BookId.eq(book_id))
            .order_by_asc(book_content::Column::LanguageId)
            .all(self.db.as_ref())
            .await
            .with_context(|| format!("Failed to load content rows for book {}", book_id))?;
        Ok(rows.iter().map(map_content_model).collect())
    }
}

#[cfg(test)]
mod tests {
    use migration::MigratorTrait;
    use sea_orm::{ConnectOptions, Database};

    use super::*;

    async fn store() -> SeaOrmStore {
        let mut opts = ConnectOptions::new("sqlite::memory:");
        opts.max_connections(1).min_connections(1).sqlx_logging(false);
        let db = Database::connect(opts).await.unwrap();
        migration::Migrator::up(&db, None).await.unwrap();
        SeaOrmStore::new(Arc::new(db))
    }

    #[tokio::test]
    async fn upsert_updates_single_row() {
        let store = store().await;
        let key = ProgressKey::new("u1", "b1", "en");

        assert!(store.read(&key).await.unwrap().is_none());
        store.insert_if_absent(&key).await.unwrap();
        assert_eq!(store.read(&key).await.unwrap().unwrap().percent, Percent::ZERO);

        store.upsert(&key, Percent::new(30).unwrap()).await.unwrap();
        store.upsert(&key, Percent::new(60).unwrap()).await.unwrap();

        let rows = store.list_for_user("u1").await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].percent.get(), 60);
    }

    #[tokio::test]
    async fn insert_if_absent_does_not_reset_progress() {
        let store = store().await;
        let key = ProgressKey::new("u1", "b1", "en");
        store.upsert(&key, Percent::new(45).unwrap()).await.unwrap();
        store.insert_if_absent(&key).await.unwrap();
        assert_eq!(store.read(&key).await.unwrap().unwrap().percent.get(), 45);
    }

    #[tokio::test]
    async fn languages_from_content_rows() {
        let store = store().await;
        for (lang, name) in [("vi", Some("Tiếng Việt")), ("en", None)] {
            book_content::Entity::insert(book_content::ActiveModel {
                id: Set(Uuid::new_v4()),
                book_id: Set("b1".into()),
                language_id: Set(lang.into()),
                language_name: Set(name.map(String::from)),
                title: Set(Some(format!("title-{lang}"))),
                pdf_url: Set(Some(format!("https://cdn/{lang}.pdf"))),
                epub_url: Set(None),
            })
            .exec_without_returning(store.db.as_ref())
            .await
            .unwrap();
        }

        let langs = store.book_languages("b1").await.unwrap();
        assert_eq!(langs.len(), 2);
        assert_eq!(langs[0].language_id, "en");
        assert_eq!(langs[0].name, "en");
        assert_eq!(langs[1].name, "Tiếng Việt");
        assert!(store.book_languages("missing").await.unwrap().is_empty());
    }
}
