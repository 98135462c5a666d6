use std::sync::Arc;

use poem_openapi::{
    OpenApi,
    param::Path,
    payload::{Json, PlainText},
};
use uuid::Uuid;

use super::models::{
    BookLanguagesResponseDto, CloseSessionResponseDto, LanguageChangeRequestDto,
    LanguageChangeResponseDto, OpenSessionRequestDto, OpenSessionResponseDto, PositionPayload,
    PositionResponseDto, ReadShelfResponseDto, SessionResponseDto,
};
use super::services::{health::HealthService, library::LibraryService, session::SessionService};
use crate::{
    sessions::SessionRegistry,
    storage::{ProgressStore, ReadingCatalog},
};

pub struct ReaderApi {
    pub registry: Arc<SessionRegistry>,
    pub store: Arc<dyn ProgressStore>,
    pub catalog: Arc<dyn ReadingCatalog>,
    /// Store backend name, reported by /status
    pub backend: &'static str,
}

impl ReaderApi {
    fn sessions(&self) -> SessionService<'_> {
        SessionService::new(&self.registry, self.catalog.as_ref())
    }

    fn library(&self) -> LibraryService<'_> {
        LibraryService::new(self.store.as_ref(), self.catalog.as_ref())
    }
}

#[OpenApi]
impl ReaderApi {
    #[oai(path = "/status", method = "get")]
    #[tracing::instrument(level = "debug", skip(self))]
    async fn status(&self) -> PlainText<String> {
        HealthService::new(self.backend).status_text().await
    }

    // ===== Reading sessions =====

    /// Start a reading session and load the initial progress
    #[oai(path = "/v1/sessions", method = "post")]
    #[tracing::instrument(level = "debug", skip(self, body))]
    async fn open_session(&self, body: Json<OpenSessionRequestDto>) -> OpenSessionResponseDto {
        self.sessions().open(body.0).await
    }

    /// Current state and displayed progress of a session
    #[oai(path = "/v1/sessions/:session_id", method = "get")]
    #[tracing::instrument(level = "debug", skip(self, session_id))]
    async fn get_session(&self, session_id: Path<Uuid>) -> SessionResponseDto {
        self.sessions().get(session_id.0).await
    }

    /// Position signal from the content viewer: a number or numeric string, 0 - 100,
    /// sent as JSON or as a plain-text body
    #[oai(path = "/v1/sessions/:session_id/position", method = "post")]
    #[tracing::instrument(level = "trace", skip(self, session_id, body))]
    async fn post_position(
        &self,
        session_id: Path<Uuid>,
        body: PositionPayload,
    ) -> PositionResponseDto {
        self.sessions().position(session_id.0, body).await
    }

    /// Switch the session to another translation
    #[oai(path = "/v1/sessions/:session_id/language", method = "put")]
    #[tracing::instrument(level = "debug", skip(self, session_id, body))]
    async fn change_language(
        &self,
        session_id: Path<Uuid>,
        body: Json<LanguageChangeRequestDto>,
    ) -> LanguageChangeResponseDto {
        self.sessions().change_language(session_id.0, body.0).await
    }

    /// End a session (viewer closed)
    #[oai(path = "/v1/sessions/:session_id", method = "delete")]
    #[tracing::instrument(level = "debug", skip(self, session_id))]
    async fn close_session(&self, session_id: Path<Uuid>) -> CloseSessionResponseDto {
        self.sessions().close(session_id.0).await
    }

    // ===== Library =====

    /// Books a user has opened, with progress per language
    #[oai(path = "/v1/users/:user_id/reads", method = "get")]
    #[tracing::instrument(level = "debug", skip(self, user_id))]
    async fn read_shelf(&self, user_id: Path<String>) -> ReadShelfResponseDto {
        self.library().read_shelf(&user_id.0).await
    }

    /// Translations available for a book
    #[oai(path = "/v1/books/:book_id/languages", method = "get")]
    #[tracing::instrument(level = "debug", skip(self, book_id))]
    async fn book_languages(&self, book_id: Path<String>) -> BookLanguagesResponseDto {
        self.library().book_languages(&book_id.0).await
    }
}
