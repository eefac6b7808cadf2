// src/core/matcher.rs
use crate::core::store::EquivalenceStore;
use crate::core::types::{QuestionHints, SubjectRecord};
use crate::error::{CheckerError, Result};
use std::fmt;
use tracing::{debug, error};

/// The matcher's opinion on one submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verdict {
    /// The answer is the subject the question asks for.
    Accept,
    /// The answer is a known synonym, but the question is one of several
    /// near-identical twins; it needs manual handling.
    AmbiguousTwin,
    /// No synonym covers the question or the answer; the host page decides alone.
    NoSynonymData,
    /// The answer is a synonym of the question but not the subject it asks for.
    Reject,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Accept => write!(f, "accept"),
            Verdict::AmbiguousTwin => write!(f, "ambiguous twin"),
            Verdict::NoSynonymData => write!(f, "no synonym data"),
            Verdict::Reject => write!(f, "reject"),
        }
    }
}

/// Decides whether `answer` (already normalized) is acceptable for the question.
///
/// Fails with [`CheckerError::DataConsistency`] when the question's meanings do
/// not identify exactly one subject.
pub fn decide(hints: &QuestionHints, answer: &str, store: &EquivalenceStore) -> Result<Verdict> {
    let synonyms = store.synonyms_of(hints.meanings());
    if synonyms.is_empty() {
        debug!(primary = %hints.primary, "No synonym group");
        return Ok(Verdict::NoSynonymData);
    }

    let matching: Vec<&SubjectRecord> =
        synonyms.into_iter().filter(|s| s.accepts(answer)).collect();
    if matching.is_empty() {
        debug!(primary = %hints.primary, answer, "Answer is not a known synonym");
        return Ok(Verdict::NoSynonymData);
    }

    let twins = store.twins_of(hints);
    if !twins.is_empty() {
        debug!(primary = %hints.primary, twins = twins.len(), "Question has twins");
        return Ok(Verdict::AmbiguousTwin);
    }

    let expected = store.subjects_with_meanings(hints);
    let correct = match expected.as_slice() {
        [single] => *single,
        _ => {
            error!(
                primary = %hints.primary,
                secondary = ?hints.secondary,
                matches = expected.len(),
                "Question does not identify one subject"
            );
            return Err(CheckerError::DataConsistency {
                primary: hints.primary.clone(),
                matches: expected.len(),
            });
        }
    };

    let verdict = if matching.iter().any(|s| s.id == correct.id) {
        Verdict::Accept
    } else {
        Verdict::Reject
    };
    debug!(expected = %correct.characters, answer, %verdict, "Matched synonym");
    Ok(verdict)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::tests::{record, sample_store, sample_tables};

    fn one_thing() -> QuestionHints {
        QuestionHints::new("One Thing", vec![], vec!["noun".into()])
    }

    #[test]
    fn exact_subject_is_accepted() {
        let store = sample_store();
        assert_eq!(decide(&one_thing(), "一つ", &store).unwrap(), Verdict::Accept);
        assert_eq!(decide(&one_thing(), "ひとつ", &store).unwrap(), Verdict::Accept);
    }

    #[test]
    fn synonym_of_another_subject_is_rejected() {
        let store = sample_store();
        assert_eq!(decide(&one_thing(), "一個", &store).unwrap(), Verdict::Reject);
    }

    #[test]
    fn unknown_answer_defers_to_host() {
        let store = sample_store();
        assert_eq!(decide(&one_thing(), "二つ", &store).unwrap(), Verdict::NoSynonymData);
    }

    #[test]
    fn question_without_group_defers_to_host() {
        let store = sample_store();
        let hints = QuestionHints::new("Dog", vec![], vec!["noun".into()]);
        assert_eq!(decide(&hints, "犬", &store).unwrap(), Verdict::NoSynonymData);
    }

    #[test]
    fn twins_are_always_ambiguous() {
        let store = sample_store();
        let hints = QuestionHints::new("Up", vec!["Above".into()], vec!["noun".into()]);
        for answer in ["上方", "上部", "上"] {
            assert_eq!(decide(&hints, answer, &store).unwrap(), Verdict::AmbiguousTwin);
        }
    }

    #[test]
    fn duplicate_exact_meanings_are_a_data_error() {
        let mut tables = sample_tables();
        let clone = record(9000, "One Thing", &[], "ひとつ", &["ひとつ"]);
        tables.subjects.insert("9000".into(), clone);
        tables.synonyms.insert("One Thing".into(), vec![2468, 4258, 9000]);
        let store = EquivalenceStore::from_tables(tables).unwrap();

        let err = decide(&one_thing(), "一つ", &store).unwrap_err();
        assert!(matches!(err, CheckerError::DataConsistency { matches: 2, .. }));
    }

    #[test]
    fn missing_exact_subject_is_a_data_error() {
        let store = sample_store();
        let hints =
            QuestionHints::new("One Thing", vec!["Single Item".into()], vec!["noun".into()]);
        let err = decide(&hints, "一つ", &store).unwrap_err();
        assert!(matches!(err, CheckerError::DataConsistency { matches: 0, .. }));
    }
}
