//! Clan language tagging.

use crate::db::models::UNKNOWN_LANGUAGE;

/// Minimum confidence for a language to be assigned.
pub const MIN_CONFIDENCE: f64 = 0.50;

/// Given text, return candidate languages with a confidence in [0, 1],
/// most confident first.
pub trait LanguageClassifier: Send + Sync {
    fn confidence_values(&self, text: &str) -> Vec<(String, f64)>;
}

/// Trigram detector from `whatlang`; yields at most one candidate.
#[derive(Debug, Default, Clone, Copy)]
pub struct WhatlangClassifier;

impl LanguageClassifier for WhatlangClassifier {
    fn confidence_values(&self, text: &str) -> Vec<(String, f64)> {
        whatlang::detect(text)
            .map(|info| vec![(info.lang().eng_name().to_string(), info.confidence())])
            .unwrap_or_default()
    }
}

/// First candidate reaching [`MIN_CONFIDENCE`], otherwise `"Unknown"`.
pub fn detect_language(classifier: &dyn LanguageClassifier, text: &str) -> String {
    classifier
        .confidence_values(text)
        .into_iter()
        .find(|(_, confidence)| *confidence >= MIN_CONFIDENCE)
        .map(|(language, _)| language)
        .unwrap_or_else(|| UNKNOWN_LANGUAGE.to_string())
}

/// Text fed to the classifier: the name, plus the description when present.
pub fn clan_text(name: &str, description: Option<&str>) -> String {
    match description {
        Some(d) if !d.trim().is_empty() => format!("{name} {d}"),
        _ => name.to_string(),
    }
}
