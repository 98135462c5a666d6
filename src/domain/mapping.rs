// Mapping from store rows (PostgREST DTOs and sea-orm models) to domain models

use super::catalog::{BookLanguage, ContentFormat, ContentRef};
use super::models::{Percent, ProgressKey, ReadingProgress};
use crate::supabase_client::{BookContentRow, UserReadRow};

/// Content rows keep one column per format; blank columns are skipped.
pub fn content_refs(pdf_url: Option<&str>, epub_url: Option<&str>) -> Vec<ContentRef> {
    [(ContentFormat::Pdf, pdf_url), (ContentFormat::Epub, epub_url)]
        .into_iter()
        .filter_map(|(format, url)| {
            let url = url?.trim();
            if url.is_empty() {
                return None;
            }
            Some(ContentRef {
                format,
                url: url.to_string(),
            })
        })
        .collect()
}

pub fn map_content_row(row: &BookContentRow) -> BookLanguage {
    let name = row
        .languages
        .as_ref()
        .and_then(|l| l.name.clone())
        .unwrap_or_else(|| row.language_id.clone());
    BookLanguage {
        language_id: row.language_id.clone(),
        name,
        title: row.title.clone(),
        formats: content_refs(row.pdf_url.as_deref(), row.epub_url.as_deref()),
    }
}

pub fn map_content_model(model: &entities::book_content::Model) -> BookLanguage {
    BookLanguage {
        language_id: model.language_id.clone(),
        name: model
            .language_name
            .clone()
            .unwrap_or_else(|| model.language_id.clone()),
        title: model.title.clone(),
        formats: content_refs(model.pdf_url.as_deref(), model.epub_url.as_deref()),
    }
}

pub fn map_read_row(row: &UserReadRow) -> ReadingProgress {
    ReadingProgress {
        key: ProgressKey::new(&row.user_id, &row.book_id, &row.language_id),
        percent: Percent::from_stored(row.progress.unwrap_or(0)),
        updated_at: row.updated_at,
    }
}

pub fn map_read_model(model: &entities::user_reads::Model) -> ReadingProgress {
    ReadingProgress {
        key: ProgressKey::new(&model.user_id, &model.book_id, &model.language_id),
        percent: Percent::from_stored(i64::from(model.progress)),
        updated_at: Some(model.updated_at),
    }
}
