// Domain models shared by the synchronizer, the store backends and the HTTP surface

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Identifies one progress record. Progress is tracked per language, so all
/// three identifiers are part of the store's uniqueness constraint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProgressKey {
    pub user_id: String,
    pub book_id: String,
    pub language_id: String,
}

impl ProgressKey {
    pub fn new(
        user_id: impl Into<String>,
        book_id: impl Into<String>,
        language_id: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            book_id: book_id.into(),
            language_id: language_id.into(),
        }
    }

    /// False when any identifier is blank (no signed-in user, no book selected, ...).
    pub fn is_complete(&self) -> bool {
        [&self.user_id, &self.book_id, &self.language_id]
            .iter()
            .all(|id| !id.trim().is_empty())
    }

    /// Same user and book, different language variant.
    pub fn with_language(&self, language_id: impl Into<String>) -> Self {
        Self {
            user_id: self.user_id.clone(),
            book_id: self.book_id.clone(),
            language_id: language_id.into(),
        }
    }
}

impl fmt::Display for ProgressKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.user_id, self.book_id, self.language_id)
    }
}

/// Whole-number completion percentage, always within 0..=100.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Percent(u8);

impl Percent {
    pub const ZERO: Percent = Percent(0);
    pub const FULL: Percent = Percent(100);

    pub fn new(value: u8) -> Option<Self> {
        (value <= 100).then_some(Percent(value))
    }

    /// Clamp then round an untrusted viewer value. Non-finite input has no percentage.
    pub fn from_raw(raw: f64) -> Option<Self> {
        if !raw.is_finite() {
            return None;
        }
        let clamped = raw.clamp(0.0, 100.0).round();
        Some(Percent(clamped as u8))
    }

    /// Values read back from a store are clamped as well; rows may predate validation.
    pub fn from_stored(value: i64) -> Self {
        Percent(value.clamp(0, 100) as u8)
    }

    pub fn get(self) -> u8 {
        self.0
    }

    pub fn abs_diff(self, other: Percent) -> u8 {
        self.0.abs_diff(other.0)
    }
}

impl fmt::Display for Percent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

/// Raw scroll position emitted by the content viewer. Renderers post either a
/// number or the number's text form, so both are accepted.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum PositionSignal {
    Number(f64),
    Text(String),
}

impl PositionSignal {
    /// Numeric value of the signal, if it has one. Unparseable text yields `None`.
    pub fn value(&self) -> Option<f64> {
        match self {
            PositionSignal::Number(n) => Some(*n),
            PositionSignal::Text(s) => s.trim().parse::<f64>().ok(),
        }
    }

    /// Parse a JSON payload; anything that is neither a number nor a string is
    /// mapped to an empty text signal so the synchronizer rejects it as non-numeric.
    pub fn from_json(value: serde_json::Value) -> Self {
        serde_json::from_value(value).unwrap_or_else(|_| PositionSignal::Text(String::new()))
    }
}

impl From<f64> for PositionSignal {
    fn from(value: f64) -> Self {
        PositionSignal::Number(value)
    }
}

impl From<&str> for PositionSignal {
    fn from(value: &str) -> Self {
        PositionSignal::Text(value.to_string())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReadingProgress {
    pub key: ProgressKey,
    pub percent: Percent,
    pub updated_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_clamps_and_rounds() {
        assert_eq!(Percent::from_raw(-5.0), Some(Percent::ZERO));
        assert_eq!(Percent::from_raw(150.0), Some(Percent::FULL));
        assert_eq!(Percent::from_raw(40.4).map(Percent::get), Some(40));
        assert_eq!(Percent::from_raw(40.5).map(Percent::get), Some(41));
    }

    #[test]
    fn percent_rejects_non_finite() {
        assert_eq!(Percent::from_raw(f64::NAN), None);
        assert_eq!(Percent::from_raw(f64::INFINITY), None);
        assert_eq!(Percent::from_raw(f64::NEG_INFINITY), None);
    }

    #[test]
    fn stored_values_are_clamped() {
        assert_eq!(Percent::from_stored(-1), Percent::ZERO);
        assert_eq!(Percent::from_stored(250), Percent::FULL);
        assert_eq!(Percent::from_stored(57).get(), 57);
    }

    #[test]
    fn signal_accepts_number_or_text() {
        let n: PositionSignal = serde_json::from_str("42").unwrap();
        let s: PositionSignal = serde_json::from_str(r#"" 42 ""#).unwrap();
        assert_eq!(n.value(), Some(42.0));
        assert_eq!(s.value(), Some(42.0));
        assert_eq!(PositionSignal::from("abc").value(), None);
        assert_eq!(PositionSignal::from_json(serde_json::json!({"p": 1})).value(), None);
    }

    #[test]
    fn incomplete_keys() {
        assert!(ProgressKey::new("u", "b", "vi").is_complete());
        assert!(!ProgressKey::new("", "b", "vi").is_complete());
        assert!(!ProgressKey::new("u", "  ", "vi").is_complete());
        assert!(!ProgressKey::new("u", "b", "").is_complete());
    }
}
