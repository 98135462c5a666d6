// PostgREST client for the hosted backend's `user_reads` and `book_content` tables

use anyhow::Context;
use chrono::{DateTime, Utc};
use reqwest::{Method, RequestBuilder};
use serde::{Deserialize, Serialize};

use crate::{
    domain::{
        catalog::BookLanguage,
        mapping::{map_content_row, map_read_row},
        models::{Percent, ProgressKey, ReadingProgress},
    },
    storage::{ProgressStore, ReadingCatalog},
};

const USER_READS: &str = "/rest/v1/user_reads";
const BOOK_CONTENT: &str = "/rest/v1/book_content";
const READ_COLUMNS: &str = "user_id,book_id,language_id,progress,updated_at";
const CONFLICT_COLUMNS: &str = "user_id,book_id,language_id";

#[derive(Clone, Debug)]
pub struct SupabaseClient {
    base_url: String,
    api_key: String,
    access_token: Option<String>,
    client: reqwest::Client,
}

impl SupabaseClient {
    /// Create a new client for a project URL (e.g. "https://abcd.supabase.co") and its anon key.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .context("Failed to build HTTP client")?;
        let base_url_str = base_url.into();
        tracing::debug!(base_url = %base_url_str, "creating SupabaseClient");
        Ok(SupabaseClient {
            base_url: base_url_str.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            access_token: None,
            client,
        })
    }

    /// Act as a signed-in user so row level security applies to that user's rows.
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        self.access_token = (!token.is_empty()).then_some(token);
        self
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    fn bearer(&self) -> &str {
        self.access_token.as_deref().unwrap_or(&self.api_key)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, self.url(path))
            .header("apikey", &self.api_key)
            .bearer_auth(self.bearer())
    }

    fn key_filter(key: &ProgressKey) -> [(&'static str, String); 3] {
        [
            ("user_id", format!("eq.{}", key.user_id)),
            ("book_id", format!("eq.{}", key.book_id)),
            ("language_id", format!("eq.{}", key.language_id)),
        ]
    }

    /// POST a single row to `user_reads`, resolving conflicts as requested.
    async fn write_read_row(&self, row: &UserReadWrite<'_>, resolution: &str) -> anyhow::Result<()> {
        let resp = self
            .request(Method::POST, USER_READS)
            .query(&[("on_conflict", CONFLICT_COLUMNS)])
            .header("Prefer", format!("resolution={},return=minimal", resolution))
            .json(&[row])
            .send()
            .await?;
        resp.error_for_status()?;
        Ok(())
    }

    /// GET /rest/v1/user_reads for one key
    #[tracing::instrument(level = "debug", skip(self), fields(key = %key))]
    pub async fn get_user_read(&self, key: &ProgressKey) -> anyhow::Result<Option<UserReadRow>> {
        let resp = self
            .request(Method::GET, USER_READS)
            .query(&[("select", READ_COLUMNS), ("limit", "1")])
            .query(&Self::key_filter(key))
            .send()
            .await?;
        let body = resp.error_for_status()?.text().await?;
        let mut rows: Vec<UserReadRow> = serde_json::from_str(&body)
            .with_context(|| "Failed to parse user_reads rows")?;
        Ok(rows.pop())
    }

    /// GET /rest/v1/user_reads for every book a user opened
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn get_user_reads(&self, user_id: &str) -> anyhow::Result<Vec<UserReadRow>> {
        let resp = self
            .request(Method::GET, USER_READS)
            .query(&[
                ("select", READ_COLUMNS.to_string()),
                ("user_id", format!("eq.{}", user_id)),
                ("order", "updated_at.desc.nullslast".to_string()),
            ])
            .send()
            .await?;
        let body = resp.error_for_status()?.text().await?;
        match serde_json::from_str::<Vec<UserReadRow>>(&body) {
            Ok(rows) => Ok(rows),
            Err(e) => {
                let snippet_len = body.len().min(2000);
                let snippet = body.get(..snippet_len).unwrap_or("");
                tracing::error!(error = %e, body_snippet = %snippet, "failed to parse user_reads rows");
                Err(e.into())
            }
        }
    }

    /// GET /rest/v1/book_content with the embedded language name
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn get_book_content(&self, book_id: &str) -> anyhow::Result<Vec<BookContentRow>> {
        let resp = self
            .request(Method::GET, BOOK_CONTENT)
            .query(&[
                ("select", "language_id,title,pdf_url,epub_url,languages(name)".to_string()),
                ("book_id", format!("eq.{}", book_id)),
            ])
            .send()
            .await?;
        let body = resp.error_for_status()?.text().await?;
        let rows: Vec<BookContentRow> = serde_json::from_str(&body)
            .with_context(|| "Failed to parse book_content rows")?;
        Ok(rows)
    }
}

#[async_trait::async_trait]
impl ProgressStore for SupabaseClient {
    async fn read(&self, key: &ProgressKey) -> anyhow::Result<Option<ReadingProgress>> {
        Ok(self.get_user_read(key).await?.as_ref().map(map_read_row))
    }

    #[tracing::instrument(level = "debug", skip(self), fields(key = %key))]
    async fn insert_if_absent(&self, key: &ProgressKey) -> anyhow::Result<()> {
        let row = UserReadWrite::new(key, Percent::ZERO);
        self.write_read_row(&row, "ignore-duplicates")
            .await
            .with_context(|| format!("Failed to create progress row for {}", key))
    }

    #[tracing::instrument(level = "debug", skip(self), fields(key = %key, percent = percent.get()))]
    async fn upsert(&self, key: &ProgressKey, percent: Percent) -> anyhow::Result<()> {
        let row = UserReadWrite::new(key, percent);
        self.write_read_row(&row, "merge-duplicates")
            .await
            .with_context(|| format!("Failed to upsert progress for {}", key))
    }

    async fn list_for_user(&self, user_id: &str) -> anyhow::Result<Vec<ReadingProgress>> {
        Ok(self
            .get_user_reads(user_id)
            .await?
            .iter()
            .map(map_read_row)
            .collect())
    }
}

#[async_trait::async_trait]
impl ReadingCatalog for SupabaseClient {
    async fn book_languages(&self, book_id: &str) -> anyhow::Result<Vec<BookLanguage>> {
        Ok(self
            .get_book_content(book_id)
            .await?
            .iter()
            .map(map_content_row)
            .collect())
    }
}

#[derive(Debug, Deserialize, PartialEq)]
pub struct UserReadRow {
    pub user_id: String,
    pub book_id: String,
    pub language_id: String,
    pub progress: Option<i64>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
struct UserReadWrite<'a> {
    user_id: &'a str,
    book_id: &'a str,
    language_id: &'a str,
    progress: u8,
    updated_at: DateTime<Utc>,
}

impl<'a> UserReadWrite<'a> {
    fn new(key: &'a ProgressKey, percent: Percent) -> Self {
        Self {
            user_id: &key.user_id,
            book_id: &key.book_id,
            language_id: &key.language_id,
            progress: percent.get(),
            updated_at: Utc::now(),
        }
    }
}

#[derive(Debug, Deserialize, PartialEq)]
pub struct BookContentRow {
    pub language_id: String,
    pub title: Option<String>,
    pub pdf_url: Option<String>,
    pub epub_url: Option<String>,
    /// Embedded `languages(name)` relation; null when the language row is gone
    pub languages: Option<LanguageRef>,
}

#[derive(Debug, Deserialize, PartialEq)]
pub struct LanguageRef {
    pub name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joins_paths() {
        let c = SupabaseClient::new("https://abcd.supabase.co/", "anon").unwrap();
        assert_eq!(c.url(USER_READS), "https://abcd.supabase.co/rest/v1/user_reads");
        assert_eq!(
            c.url("rest/v1/book_content"),
            "https://abcd.supabase.co/rest/v1/book_content"
        );
    }

    #[test]
    fn access_token_overrides_anon_key() {
        let c = SupabaseClient::new("https://abcd.supabase.co", "anon").unwrap();
        assert_eq!(c.bearer(), "anon");
        let c = c.with_access_token("");
        assert_eq!(c.bearer(), "anon");
        let c = c.with_access_token("user-jwt");
        assert_eq!(c.bearer(), "user-jwt");
    }

    #[test]
    fn write_row_serializes_conflict_columns() {
        let key = ProgressKey::new("u1", "b1", "vi");
        let row = UserReadWrite::new(&key, Percent::new(30).unwrap());
        let v = serde_json::to_value(&row).unwrap();
        assert_eq!(v["user_id"], "u1");
        assert_eq!(v["book_id"], "b1");
        assert_eq!(v["language_id"], "vi");
        assert_eq!(v["progress"], 30);
    }

    #[test]
    fn user_reads_deserialize() {
        let json = r#"[
            { "user_id": "7c1f", "book_id": "b-42", "language_id": "en", "progress": 55, "updated_at": "2025-10-01T08:30:00+00:00" },
            { "user_id": "7c1f", "book_id": "b-43", "language_id": "vi", "progress": null, "updated_at": null }
        ]"#;
        let rows: Vec<UserReadRow> = serde_json::from_str(json).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].progress, Some(55));
        assert!(rows[0].updated_at.is_some());
        assert_eq!(rows[1].progress, None);
    }

    #[test]
    fn book_content_deserialize_with_embedded_language() {
        let json = r#"[
            { "language_id": "vi", "title": "Chú mèo", "pdf_url": "https://cdn/vi.pdf", "epub_url": null, "languages": { "name": "Vietnamese" } },
            { "language_id": "en", "title": "The cat", "pdf_url": null, "epub_url": "https://cdn/en.epub", "languages": null }
        ]"#;
        let rows: Vec<BookContentRow> = serde_json::from_str(json).unwrap();
        assert_eq!(rows[0].languages.as_ref().unwrap().name.as_deref(), Some("Vietnamese"));
        assert_eq!(rows[1].languages, None);
        assert_eq!(rows[1].epub_url.as_deref(), Some("https://cdn/en.epub"));
    }
}
