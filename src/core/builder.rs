// src/core/builder.rs
//! Builds the three source tables from a WaniKani subject export.

use crate::core::store::SourceTables;
use crate::core::types::{HintKey, SubjectId, SubjectRecord};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

/// Subject kinds the export contains. Radicals have no readings and are skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectKind {
    Radical,
    Kanji,
    Vocabulary,
    KanaVocabulary,
}

/// One entry of the export, as returned by the `/v2/subjects` endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ExportedSubject {
    pub id: SubjectId,
    pub object: SubjectKind,
    pub data: ExportedData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExportedData {
    #[serde(default)]
    pub characters: Option<String>,
    #[serde(default)]
    pub meanings: Vec<ExportedMeaning>,
    #[serde(default)]
    pub auxiliary_meanings: Vec<AuxiliaryMeaning>,
    #[serde(default)]
    pub readings: Vec<ExportedReading>,
    #[serde(default)]
    pub parts_of_speech: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExportedMeaning {
    pub meaning: String,
    pub primary: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuxiliaryMeaning {
    pub meaning: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExportedReading {
    pub reading: String,
    #[serde(default = "accepted")]
    pub accepted_answer: bool,
}

fn accepted() -> bool {
    true
}

#[derive(Debug, Clone, Copy)]
pub struct BuildOptions {
    pub kind: SubjectKind,
    /// Group subjects on their primary meaning only.
    pub only_primary: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self { kind: SubjectKind::Vocabulary, only_primary: false }
    }
}

/// Flattens one exported subject. Other meanings are the non-primary meanings
/// followed by whitelisted auxiliary meanings. Returns `None` for subjects
/// without a primary meaning or written form.
pub fn extract_record(subject: &ExportedSubject) -> Option<SubjectRecord> {
    let data = &subject.data;
    let primary_meaning = data.meanings.iter().find(|m| m.primary)?.meaning.clone();
    let characters = data.characters.clone()?;

    let auxiliary_meanings: Vec<String> = data
        .auxiliary_meanings
        .iter()
        .filter(|m| m.kind == "whitelist")
        .map(|m| m.meaning.clone())
        .collect();
    let other_meanings = data
        .meanings
        .iter()
        .filter(|m| !m.primary)
        .map(|m| m.meaning.clone())
        .chain(auxiliary_meanings.iter().cloned())
        .collect();

    Some(SubjectRecord {
        id: subject.id,
        primary_meaning,
        other_meanings,
        characters,
        readings: data
            .readings
            .iter()
            .filter(|r| r.accepted_answer)
            .map(|r| r.reading.clone())
            .collect(),
        auxiliary_meanings,
        parts_of_speech: data.parts_of_speech.iter().map(|p| p.to_lowercase()).collect(),
    })
}

/// Builds subjects, synonyms (meanings shared by more than one subject) and
/// twins (hint keys shared by more than one subject) for one subject kind.
pub fn build_tables(export: &[ExportedSubject], options: BuildOptions) -> SourceTables {
    let records: Vec<SubjectRecord> = export
        .iter()
        .filter(|s| s.object == options.kind)
        .filter_map(extract_record)
        .collect();
    debug!(kind = ?options.kind, subjects = records.len(), "Extracted subjects");

    let mut by_meaning: BTreeMap<String, BTreeSet<SubjectId>> = BTreeMap::new();
    let mut by_hints: BTreeMap<HintKey, BTreeSet<SubjectId>> = BTreeMap::new();

    for record in &records {
        let meanings: Vec<&str> = if options.only_primary {
            vec![record.primary_meaning.as_str()]
        } else {
            record.meanings().collect()
        };
        for meaning in meanings {
            by_meaning.entry(meaning.to_string()).or_default().insert(record.id);
        }
        by_hints.entry(HintKey::from(&record.hints())).or_default().insert(record.id);
    }

    let synonyms: BTreeMap<String, Vec<SubjectId>> = by_meaning
        .into_iter()
        .filter(|(_, ids)| ids.len() > 1)
        .map(|(meaning, ids)| (meaning, ids.into_iter().collect()))
        .collect();
    let twins: Vec<(HintKey, Vec<SubjectId>)> = by_hints
        .into_iter()
        .filter(|(_, ids)| ids.len() > 1)
        .map(|(key, ids)| (key, ids.into_iter().collect()))
        .collect();

    info!(
        subjects = records.len(),
        synonym_groups = synonyms.len(),
        twin_groups = twins.len(),
        "Built tables"
    );

    SourceTables {
        subjects: records.into_iter().map(|r| (r.id.to_string(), r)).collect(),
        synonyms,
        twins,
    }
}

/// The meaning with the most synonymous subjects.
pub fn largest_group(tables: &SourceTables) -> Option<(&str, usize)> {
    tables
        .synonyms
        .iter()
        .map(|(meaning, ids)| (meaning.as_str(), ids.len()))
        .fold(None, |best, candidate| match best {
            Some((_, size)) if size >= candidate.1 => best,
            _ => Some(candidate),
        })
}
