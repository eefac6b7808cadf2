// src/core/types.rs
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::collections::BTreeSet;

/// A stable identifier for a vocabulary or kanji subject.
pub type SubjectId = u32;

/// One subject of the reference dataset. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectRecord {
    /// Filled from the subject table key when absent from the record itself.
    #[serde(default)]
    pub id: SubjectId,
    pub primary_meaning: String,
    /// Non-primary meanings, in the order the host page displays them.
    #[serde(default)]
    pub other_meanings: Vec<String>,
    pub characters: String,
    /// Every accepted kana reading, e.g. {"ひとつ"} for "一つ".
    #[serde(default)]
    pub readings: BTreeSet<String>,
    #[serde(default)]
    pub auxiliary_meanings: Vec<String>,
    #[serde(default)]
    pub parts_of_speech: Vec<String>,
}

impl SubjectRecord {
    /// True if `answer` is this subject's written form or one of its readings.
    pub fn accepts(&self, answer: &str) -> bool {
        self.characters == answer || self.readings.contains(answer)
    }

    /// Primary meaning followed by the other meanings.
    pub fn meanings(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.primary_meaning.as_str())
            .chain(self.other_meanings.iter().map(String::as_str))
    }

    /// Exact meaning match: same primary, and the same secondary meanings position by position.
    pub fn has_meanings(&self, hints: &QuestionHints) -> bool {
        self.primary_meaning == hints.primary && self.other_meanings == hints.secondary
    }

    /// The hints the host page would show for this subject.
    pub fn hints(&self) -> QuestionHints {
        QuestionHints::new(
            self.primary_meaning.clone(),
            self.other_meanings.clone(),
            self.parts_of_speech.clone(),
        )
    }
}

/// What the question shows: meanings and parts of speech, captured fresh per submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionHints {
    pub primary: String,
    pub secondary: Vec<String>,
    /// Always lowercase.
    pub parts_of_speech: Vec<String>,
}

impl QuestionHints {
    /// Builds hints in canonical form: meanings trimmed with empty entries dropped,
    /// parts of speech trimmed and case-folded.
    pub fn new(
        primary: impl Into<String>,
        secondary: Vec<String>,
        parts_of_speech: Vec<String>,
    ) -> Self {
        let primary = primary.into().trim().to_string();
        let secondary = secondary
            .into_iter()
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .collect();
        let parts_of_speech = parts_of_speech
            .into_iter()
            .map(|p| p.trim().to_lowercase())
            .filter(|p| !p.is_empty())
            .collect();
        Self { primary, secondary, parts_of_speech }
    }

    /// Parses the secondary-meanings display text ("a, b, c").
    pub fn split_secondary(text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return Vec::new();
        }
        text.split(", ").map(str::to_string).collect()
    }

    /// Primary meaning followed by the secondary meanings.
    pub fn meanings(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.primary.as_str()).chain(self.secondary.iter().map(String::as_str))
    }
}

/// Composite key of the twin index: (primary, secondary meanings, parts of speech).
///
/// Serialized as `[primary, [secondary...], [pos...]]`. The index builder and the
/// lookup both derive it from canonical [`QuestionHints`], so the two always agree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HintKey(pub String, pub Vec<String>, pub Vec<String>);

impl From<&QuestionHints> for HintKey {
    fn from(hints: &QuestionHints) -> Self {
        let canonical = QuestionHints::new(
            hints.primary.clone(),
            hints.secondary.clone(),
            hints.parts_of_speech.clone(),
        );
        HintKey(canonical.primary, canonical.secondary, canonical.parts_of_speech)
    }
}

/// The event context handed to every submit hook callback.
#[derive(Debug)]
pub struct SubmissionPayload {
    pub answer: String,
    pub question: QuestionHints,
    cancelled: Cell<bool>,
}

impl SubmissionPayload {
    pub fn new(answer: impl Into<String>, question: QuestionHints) -> Self {
        Self { answer: answer.into(), question, cancelled: Cell::new(false) }
    }

    /// Stops the hook chain after the current callback returns.
    pub fn cancel(&self) {
        self.cancelled.set(true);
    }
}

impl crate::core::hook::HookContext for SubmissionPayload {
    fn is_cancelled(&self) -> bool {
        self.cancelled.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hints_are_canonicalised() {
        let hints = QuestionHints::new(
            " One Thing ",
            vec!["".into(), "thing".into()],
            vec!["Noun".into(), " Counter ".into()],
        );
        assert_eq!(hints.primary, "One Thing");
        assert_eq!(hints.secondary, vec!["thing"]);
        assert_eq!(hints.parts_of_speech, vec!["noun", "counter"]);
    }

    #[test]
    fn hint_key_ignores_casing_of_parts_of_speech_only() {
        let a = QuestionHints {
            primary: "Up".into(),
            secondary: vec![],
            parts_of_speech: vec!["Noun".into()],
        };
        let b = QuestionHints::new("Up", vec![], vec!["noun".into()]);
        assert_eq!(HintKey::from(&a), HintKey::from(&b));

        let c = QuestionHints::new("up", vec![], vec!["noun".into()]);
        assert_ne!(HintKey::from(&a), HintKey::from(&c));
    }

    #[test]
    fn hint_key_serializes_as_nested_array() {
        let key = HintKey("Up".into(), vec!["Above".into()], vec!["noun".into()]);
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, r#"["Up",["Above"],["noun"]]"#);
    }

    #[test]
    fn secondary_display_is_split_on_comma_space() {
        assert!(QuestionHints::split_secondary("").is_empty());
        assert_eq!(QuestionHints::split_secondary("a, b"), vec!["a", "b"]);
    }
}
