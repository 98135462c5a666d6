use poem_openapi::payload::Json;

use crate::{
    reader_api::models::{BookLanguagesResponseDto, ErrorDto, ReadShelfResponseDto},
    storage::{ProgressStore, ReadingCatalog},
};

pub struct LibraryService<'a> {
    pub store: &'a dyn ProgressStore,
    pub catalog: &'a dyn ReadingCatalog,
}

impl<'a> LibraryService<'a> {
    pub fn new(store: &'a dyn ProgressStore, catalog: &'a dyn ReadingCatalog) -> Self {
        Self { store, catalog }
    }

    /// Books the user has opened, with their progress per language
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn read_shelf(&self, user_id: &str) -> ReadShelfResponseDto {
        match self.store.list_for_user(user_id).await {
            Ok(reads) => {
                ReadShelfResponseDto::Ok(Json(reads.into_iter().map(Into::into).collect()))
            }
            Err(e) => {
                tracing::error!(error = %format!("{:?}", e), user_id = %user_id, "failed to list reads");
                ReadShelfResponseDto::BadGateway(ErrorDto::new(format!("store error: {}", e)))
            }
        }
    }

    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn book_languages(&self, book_id: &str) -> BookLanguagesResponseDto {
        match self.catalog.book_languages(book_id).await {
            Ok(langs) => {
                BookLanguagesResponseDto::Ok(Json(langs.into_iter().map(Into::into).collect()))
            }
            Err(e) => {
                tracing::error!(error = %format!("{:?}", e), book_id = %book_id, "failed to list languages");
                BookLanguagesResponseDto::BadGateway(ErrorDto::new(format!("catalog error: {}", e)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{
            catalog::{BookLanguage, ContentFormat, ContentRef},
            models::{Percent, ProgressKey},
        },
        storage::memory::MemoryStore,
    };

    #[tokio::test]
    async fn shelf_lists_only_the_users_reads() {
        let store = MemoryStore::new();
        store
            .upsert(&ProgressKey::new("u1", "b1", "en"), Percent::new(12).unwrap())
            .await
            .unwrap();
        store
            .upsert(&ProgressKey::new("u2", "b2", "en"), Percent::new(90).unwrap())
            .await
            .unwrap();

        let ReadShelfResponseDto::Ok(Json(entries)) =
            LibraryService::new(&store, &store).read_shelf("u1").await
        else {
            panic!("expected shelf");
        };
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].book_id, "b1");
        assert_eq!(entries[0].percent, 12);
    }

    #[tokio::test]
    async fn languages_expose_formats() {
        let store = MemoryStore::new().with_book(
            "b1",
            vec![BookLanguage {
                language_id: "vi".into(),
                name: "Vietnamese".into(),
                title: Some("Chú mèo".into()),
                formats: vec![ContentRef {
                    format: ContentFormat::Epub,
                    url: "https://cdn/vi.epub".into(),
                }],
            }],
        );

        let BookLanguagesResponseDto::Ok(Json(langs)) =
            LibraryService::new(&store, &store).book_languages("b1").await
        else {
            panic!("expected languages");
        };
        assert_eq!(langs[0].formats[0].format, "epub");
    }
}
