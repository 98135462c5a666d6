// Catalog view of a book's translations, used to pick the language a session reads in

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentFormat {
    Pdf,
    Epub,
}

impl ContentFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            ContentFormat::Pdf => "pdf",
            ContentFormat::Epub => "epub",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContentRef {
    pub format: ContentFormat,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BookLanguage {
    pub language_id: String,
    /// Display name, falls back to the id when the language row is missing
    pub name: String,
    pub title: Option<String>,
    pub formats: Vec<ContentRef>,
}

/// Keep the requested language when the book offers it, otherwise use the
/// book's first translation.
pub fn resolve_language(requested: Option<&str>, available: &[BookLanguage]) -> Option<String> {
    let requested = requested.map(str::trim).filter(|r| !r.is_empty());
    if let Some(req) = requested {
        if available.iter().any(|l| l.language_id == req) {
            return Some(req.to_string());
        }
    }
    available.first().map(|l| l.language_id.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lang(id: &str) -> BookLanguage {
        BookLanguage {
            language_id: id.into(),
            name: id.into(),
            title: None,
            formats: vec![],
        }
    }

    #[test]
    fn keeps_offered_language() {
        let langs = [lang("en"), lang("vi")];
        assert_eq!(resolve_language(Some("vi"), &langs).as_deref(), Some("vi"));
    }

    #[test]
    fn falls_back_to_first_translation() {
        let langs = [lang("en"), lang("vi")];
        assert_eq!(resolve_language(Some("fr"), &langs).as_deref(), Some("en"));
        assert_eq!(resolve_language(None, &langs).as_deref(), Some("en"));
        assert_eq!(resolve_language(Some(" "), &langs).as_deref(), Some("en"));
    }

    #[test]
    fn nothing_to_resolve() {
        assert_eq!(resolve_language(Some("en"), &[]), None);
    }
}
