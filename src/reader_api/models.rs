use chrono::{DateTime, Utc};
use poem_openapi::{
    ApiRequest, ApiResponse, Enum, Object,
    payload::{Json, PlainText},
};
use uuid::Uuid;

use crate::{
    domain::{
        catalog::{BookLanguage, ContentRef},
        models::{PositionSignal, ReadingProgress},
    },
    sessions::SessionSnapshot,
    sync::{SessionStart, SessionState, SyncOutcome},
};

#[derive(Debug, Clone, Object)]
pub struct ErrorDto {
    /// Human-readable error message
    pub message: String,
}

impl ErrorDto {
    pub fn new(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            message: message.into(),
        })
    }
}

// ===== Requests =====

#[derive(Debug, Clone, Object)]
pub struct OpenSessionRequestDto {
    pub user_id: String,
    pub book_id: String,
    /// Preferred translation; the book's first language is used when absent or unavailable
    pub language_id: Option<String>,
}

#[derive(Debug, Clone, Object)]
pub struct LanguageChangeRequestDto {
    pub language_id: String,
}

// ===== Payloads =====

#[derive(Debug, Clone, Copy, PartialEq, Eq, Enum)]
#[oai(rename_all = "snake_case")]
pub enum SessionStateDto {
    Uninitialized,
    Loading,
    Ready,
}

impl From<SessionState> for SessionStateDto {
    fn from(state: SessionState) -> Self {
        match state {
            SessionState::Uninitialized => SessionStateDto::Uninitialized,
            SessionState::Loading => SessionStateDto::Loading,
            SessionState::Ready => SessionStateDto::Ready,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Enum)]
#[oai(rename_all = "snake_case")]
pub enum StartKindDto {
    Resumed,
    Created,
    Fallback,
    Skipped,
}

#[derive(Debug, Clone, Object)]
pub struct SessionStartDto {
    pub session_id: Uuid,
    pub language_id: Option<String>,
    /// Initial displayed progress, 0 - 100
    pub percent: u8,
    pub start: StartKindDto,
    pub reason: Option<String>,
}

impl SessionStartDto {
    pub fn new(session_id: Uuid, language_id: Option<String>, start: &SessionStart) -> Self {
        let (kind, reason) = match start {
            SessionStart::Resumed(_) => (StartKindDto::Resumed, None),
            SessionStart::Created => (StartKindDto::Created, None),
            SessionStart::Fallback { reason } => (StartKindDto::Fallback, Some(reason.clone())),
            SessionStart::Skipped => (StartKindDto::Skipped, None),
        };
        Self {
            session_id,
            language_id,
            percent: start.percent().get(),
            start: kind,
            reason,
        }
    }
}

#[derive(Debug, Clone, Object)]
pub struct SessionDto {
    pub session_id: Uuid,
    pub user_id: Option<String>,
    pub book_id: Option<String>,
    pub language_id: Option<String>,
    pub state: SessionStateDto,
    pub percent: u8,
}

impl From<SessionSnapshot> for SessionDto {
    fn from(s: SessionSnapshot) -> Self {
        let (user_id, book_id, language_id) = match s.key {
            Some(k) => (Some(k.user_id), Some(k.book_id), Some(k.language_id)),
            None => (None, None, None),
        };
        Self {
            session_id: s.id,
            user_id,
            book_id,
            language_id,
            state: s.state.into(),
            percent: s.percent.get(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Enum)]
#[oai(rename_all = "snake_case")]
pub enum OutcomeKindDto {
    Persisted,
    LocalOnly,
    Rejected,
}

#[derive(Debug, Clone, Object)]
pub struct SyncOutcomeDto {
    pub outcome: OutcomeKindDto,
    /// Value now displayed, absent when the signal was rejected
    pub percent: Option<u8>,
    pub reason: Option<String>,
}

impl From<SyncOutcome> for SyncOutcomeDto {
    fn from(outcome: SyncOutcome) -> Self {
        match outcome {
            SyncOutcome::Persisted(p) => Self {
                outcome: OutcomeKindDto::Persisted,
                percent: Some(p.get()),
                reason: None,
            },
            SyncOutcome::LocalOnly { percent, reason } => Self {
                outcome: OutcomeKindDto::LocalOnly,
                percent: Some(percent.get()),
                reason: Some(reason.to_string()),
            },
            SyncOutcome::Rejected(reason) => Self {
                outcome: OutcomeKindDto::Rejected,
                percent: None,
                reason: Some(reason.to_string()),
            },
        }
    }
}

#[derive(Debug, Clone, Object)]
pub struct ReadEntryDto {
    pub book_id: String,
    pub language_id: String,
    pub percent: u8,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<ReadingProgress> for ReadEntryDto {
    fn from(r: ReadingProgress) -> Self {
        Self {
            book_id: r.key.book_id,
            language_id: r.key.language_id,
            percent: r.percent.get(),
            updated_at: r.updated_at,
        }
    }
}

#[derive(Debug, Clone, Object)]
pub struct ContentRefDto {
    /// "pdf" or "epub"
    pub format: String,
    pub url: String,
}

impl From<ContentRef> for ContentRefDto {
    fn from(c: ContentRef) -> Self {
        Self {
            format: c.format.as_str().to_string(),
            url: c.url,
        }
    }
}

#[derive(Debug, Clone, Object)]
pub struct BookLanguageDto {
    pub language_id: String,
    pub name: String,
    pub title: Option<String>,
    pub formats: Vec<ContentRefDto>,
}

impl From<BookLanguage> for BookLanguageDto {
    fn from(l: BookLanguage) -> Self {
        Self {
            language_id: l.language_id,
            name: l.name,
            title: l.title,
            formats: l.formats.into_iter().map(Into::into).collect(),
        }
    }
}

// ===== Responses =====

#[derive(ApiResponse)]
pub enum OpenSessionResponseDto {
    /// Session started; percent is the initial displayed value
    #[oai(status = 201)]
    Created(Json<SessionStartDto>),

    /// Missing identifiers or no language to read in
    #[oai(status = 400)]
    BadRequest(Json<ErrorDto>),
}

#[derive(ApiResponse)]
pub enum SessionResponseDto {
    #[oai(status = 200)]
    Ok(Json<SessionDto>),

    #[oai(status = 404)]
    NotFound(Json<ErrorDto>),
}

#[derive(ApiResponse)]
pub enum PositionResponseDto {
    /// Signal handled; see `outcome` for whether it reached the store
    #[oai(status = 200)]
    Ok(Json<SyncOutcomeDto>),

    #[oai(status = 404)]
    NotFound(Json<ErrorDto>),
}

#[derive(ApiResponse)]
pub enum LanguageChangeResponseDto {
    #[oai(status = 200)]
    Ok(Json<SessionStartDto>),

    #[oai(status = 400)]
    BadRequest(Json<ErrorDto>),

    #[oai(status = 404)]
    NotFound(Json<ErrorDto>),
}

#[derive(ApiResponse)]
pub enum CloseSessionResponseDto {
    #[oai(status = 204)]
    NoContent,

    #[oai(status = 404)]
    NotFound(Json<ErrorDto>),
}

#[derive(ApiResponse)]
pub enum ReadShelfResponseDto {
    #[oai(status = 200)]
    Ok(Json<Vec<ReadEntryDto>>),

    /// Progress store error
    #[oai(status = 502)]
    BadGateway(Json<ErrorDto>),
}

#[derive(ApiResponse)]
pub enum BookLanguagesResponseDto {
    #[oai(status = 200)]
    Ok(Json<Vec<BookLanguageDto>>),

    /// Catalog error
    #[oai(status = 502)]
    BadGateway(Json<ErrorDto>),
}

/// Body of a position signal. Viewers that cannot send JSON post the raw
/// number as `text/plain`.
#[derive(Debug, ApiRequest)]
pub enum PositionPayload {
    /// A JSON number or numeric string
    Json(Json<serde_json::Value>),
    /// The position as plain text, e.g. `42.5`
    Text(PlainText<String>),
}

impl PositionPayload {
    pub fn into_signal(self) -> PositionSignal {
        match self {
            PositionPayload::Json(Json(value)) => PositionSignal::from_json(value),
            PositionPayload::Text(PlainText(text)) => PositionSignal::Text(text),
        }
    }
}
