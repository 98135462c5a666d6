use poem_openapi::payload::Json;
use uuid::Uuid;

use crate::{
    domain::{
        catalog::resolve_language,
        models::ProgressKey,
    },
    reader_api::models::{
        CloseSessionResponseDto, ErrorDto, LanguageChangeRequestDto, LanguageChangeResponseDto,
        OpenSessionRequestDto, OpenSessionResponseDto, PositionPayload, PositionResponseDto,
        SessionResponseDto, SessionStartDto,
    },
    sessions::SessionRegistry,
    storage::ReadingCatalog,
};

pub struct SessionService<'a> {
    pub registry: &'a SessionRegistry,
    pub catalog: &'a dyn ReadingCatalog,
}

fn not_found(id: Uuid) -> Json<ErrorDto> {
    ErrorDto::new(format!("No session {}", id))
}

impl<'a> SessionService<'a> {
    pub fn new(registry: &'a SessionRegistry, catalog: &'a dyn ReadingCatalog) -> Self {
        Self { registry, catalog }
    }

    /// Pick the translation to read. A catalog outage does not block reading
    /// when the caller named a language.
    async fn pick_language(&self, book_id: &str, requested: Option<&str>) -> Option<String> {
        let requested = requested.map(str::trim).filter(|r| !r.is_empty());
        match self.catalog.book_languages(book_id).await {
            Ok(langs) if !langs.is_empty() => resolve_language(requested, &langs),
            Ok(_) => requested.map(String::from),
            Err(e) => {
                tracing::warn!(error = %format!("{:#}", e), %book_id, "catalog unavailable, using requested language");
                requested.map(String::from)
            }
        }
    }

    #[tracing::instrument(level = "debug", skip(self, req), fields(user_id = %req.user_id, book_id = %req.book_id))]
    pub async fn open(&self, req: OpenSessionRequestDto) -> OpenSessionResponseDto {
        if req.user_id.trim().is_empty() || req.book_id.trim().is_empty() {
            return OpenSessionResponseDto::BadRequest(ErrorDto::new(
                "user_id and book_id are required",
            ));
        }
        let Some(language_id) = self
            .pick_language(&req.book_id, req.language_id.as_deref())
            .await
        else {
            return OpenSessionResponseDto::BadRequest(ErrorDto::new(format!(
                "No language available for book {}",
                req.book_id
            )));
        };

        let key = ProgressKey::new(req.user_id, req.book_id, language_id.clone());
        let (id, start) = self.registry.open(key).await;
        tracing::info!(session_id = %id, %language_id, percent = start.percent().get(), "reading session started");
        OpenSessionResponseDto::Created(Json(SessionStartDto::new(id, Some(language_id), &start)))
    }

    pub async fn get(&self, id: Uuid) -> SessionResponseDto {
        match self.registry.snapshot(id).await {
            Some(snap) => SessionResponseDto::Ok(Json(snap.into())),
            None => SessionResponseDto::NotFound(not_found(id)),
        }
    }

    #[tracing::instrument(level = "trace", skip(self, payload))]
    pub async fn position(&self, id: Uuid, payload: PositionPayload) -> PositionResponseDto {
        let signal = payload.into_signal();
        match self.registry.signal(id, &signal).await {
            Some(outcome) => PositionResponseDto::Ok(Json(outcome.into())),
            None => PositionResponseDto::NotFound(not_found(id)),
        }
    }

    #[tracing::instrument(level = "debug", skip(self, req))]
    pub async fn change_language(
        &self,
        id: Uuid,
        req: LanguageChangeRequestDto,
    ) -> LanguageChangeResponseDto {
        let language_id = req.language_id.trim().to_string();
        if language_id.is_empty() {
            return LanguageChangeResponseDto::BadRequest(ErrorDto::new("language_id is required"));
        }
        match self.registry.change_language(id, language_id.clone()).await {
            Some(start) => LanguageChangeResponseDto::Ok(Json(SessionStartDto::new(
                id,
                Some(language_id),
                &start,
            ))),
            None => LanguageChangeResponseDto::NotFound(not_found(id)),
        }
    }

    pub async fn close(&self, id: Uuid) -> CloseSessionResponseDto {
        if self.registry.close(id).await {
            CloseSessionResponseDto::NoContent
        } else {
            CloseSessionResponseDto::NotFound(not_found(id))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use poem_openapi::payload::PlainText;
    use serde_json::json;

    use super::*;
    use crate::{
        domain::catalog::BookLanguage,
        reader_api::models::{OutcomeKindDto, StartKindDto},
        storage::memory::MemoryStore,
        sync::SyncSettings,
    };

    fn lang(id: &str) -> BookLanguage {
        BookLanguage {
            language_id: id.into(),
            name: id.into(),
            title: None,
            formats: vec![],
        }
    }

    fn setup() -> (Arc<MemoryStore>, SessionRegistry) {
        let store = Arc::new(MemoryStore::new().with_book("b1", vec![lang("en"), lang("vi")]));
        let registry = SessionRegistry::new(store.clone(), SyncSettings::default());
        (store, registry)
    }

    fn json_body(value: serde_json::Value) -> PositionPayload {
        PositionPayload::Json(Json(value))
    }

    fn text_body(text: &str) -> PositionPayload {
        PositionPayload::Text(PlainText(text.into()))
    }

    fn open_req(language_id: Option<&str>) -> OpenSessionRequestDto {
        OpenSessionRequestDto {
            user_id: "u1".into(),
            book_id: "b1".into(),
            language_id: language_id.map(String::from),
        }
    }

    #[tokio::test]
    async fn open_falls_back_to_first_language() {
        let (store, registry) = setup();
        let service = SessionService::new(&registry, store.as_ref());

        let OpenSessionResponseDto::Created(Json(started)) = service.open(open_req(Some("fr"))).await
        else {
            panic!("expected session");
        };
        assert_eq!(started.language_id.as_deref(), Some("en"));
        assert_eq!(started.start, StartKindDto::Created);
        assert_eq!(started.percent, 0);
    }

    #[tokio::test]
    async fn open_requires_identifiers_and_a_language() {
        let (store, registry) = setup();
        let service = SessionService::new(&registry, store.as_ref());

        let mut req = open_req(None);
        req.user_id = " ".into();
        assert!(matches!(service.open(req).await, OpenSessionResponseDto::BadRequest(_)));

        let mut req = open_req(None);
        req.book_id = "unknown".into();
        assert!(matches!(service.open(req).await, OpenSessionResponseDto::BadRequest(_)));
    }

    #[tokio::test]
    async fn position_payloads() {
        let (store, registry) = setup();
        let service = SessionService::new(&registry, store.as_ref());
        let OpenSessionResponseDto::Created(Json(started)) = service.open(open_req(Some("vi"))).await
        else {
            panic!("expected session");
        };
        let id = started.session_id;

        let PositionResponseDto::Ok(Json(outcome)) = service.position(id, json_body(json!("42"))).await else {
            panic!("expected outcome");
        };
        assert_eq!(outcome.outcome, OutcomeKindDto::Persisted);
        assert_eq!(outcome.percent, Some(42));

        let PositionResponseDto::Ok(Json(outcome)) = service.position(id, json_body(json!(null))).await else {
            panic!("expected outcome");
        };
        assert_eq!(outcome.outcome, OutcomeKindDto::Rejected);

        let SessionResponseDto::Ok(Json(session)) = service.get(id).await else {
            panic!("expected session");
        };
        assert_eq!(session.percent, 42);
        assert_eq!(session.language_id.as_deref(), Some("vi"));

        assert!(matches!(service.close(id).await, CloseSessionResponseDto::NoContent));
        assert!(matches!(
            service.position(id, json_body(json!(50))).await,
            PositionResponseDto::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn plain_text_positions() {
        let (store, registry) = setup();
        let service = SessionService::new(&registry, store.as_ref());
        let OpenSessionResponseDto::Created(Json(started)) = service.open(open_req(Some("en"))).await
        else {
            panic!("expected session");
        };
        let id = started.session_id;

        let PositionResponseDto::Ok(Json(outcome)) = service.position(id, text_body(" 57 ")).await
        else {
            panic!("expected outcome");
        };
        assert_eq!(outcome.outcome, OutcomeKindDto::Persisted);
        assert_eq!(outcome.percent, Some(57));

        let PositionResponseDto::Ok(Json(outcome)) = service.position(id, text_body("abc")).await
        else {
            panic!("expected outcome");
        };
        assert_eq!(outcome.outcome, OutcomeKindDto::Rejected);

        let SessionResponseDto::Ok(Json(session)) = service.get(id).await else {
            panic!("expected session");
        };
        assert_eq!(session.percent, 57);
    }

    #[tokio::test]
    async fn language_change_validates_input() {
        let (store, registry) = setup();
        let service = SessionService::new(&registry, store.as_ref());
        let req = LanguageChangeRequestDto {
            language_id: "".into(),
        };
        assert!(matches!(
            service.change_language(Uuid::new_v4(), req).await,
            LanguageChangeResponseDto::BadRequest(_)
        ));
        let req = LanguageChangeRequestDto {
            language_id: "vi".into(),
        };
        assert!(matches!(
            service.change_language(Uuid::new_v4(), req).await,
            LanguageChangeResponseDto::NotFound(_)
        ));
    }
}
