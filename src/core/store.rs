// src/core/store.rs
use crate::core::provider::{DataProvider, Table};
use crate::core::types::{HintKey, QuestionHints, SubjectId, SubjectRecord};
use crate::error::{CheckerError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, info};

/// The three tables as they appear on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceTables {
    /// Subject id (as a string) to record.
    pub subjects: BTreeMap<String, SubjectRecord>,
    /// Meaning to the ids of every subject carrying it.
    pub synonyms: BTreeMap<String, Vec<SubjectId>>,
    /// `[hint key, [subject ids]]` pairs.
    pub twins: Vec<(HintKey, Vec<SubjectId>)>,
}

/// Read-only lookup over subjects, synonym groups and twin groups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquivalenceStore {
    subjects: BTreeMap<SubjectId, SubjectRecord>,
    synonyms: HashMap<String, BTreeSet<SubjectId>>,
    twins: HashMap<HintKey, BTreeSet<SubjectId>>,
}

impl EquivalenceStore {
    /// Fetches and parses all three tables. Fails if any one of them is missing
    /// or malformed.
    pub async fn load(provider: &dyn DataProvider) -> Result<Self> {
        let (subjects, synonyms, twins) = tokio::try_join!(
            fetch_table(provider, Table::Subjects),
            fetch_table(provider, Table::Synonyms),
            fetch_table(provider, Table::Twins),
        )?;
        Self::from_tables(SourceTables { subjects, synonyms, twins })
    }

    /// Validates and indexes already-parsed tables. Every id referenced by the
    /// synonym and twin tables must exist in the subject table.
    pub fn from_tables(tables: SourceTables) -> Result<Self> {
        let mut subjects = BTreeMap::new();
        for (key, mut record) in tables.subjects {
            let id: SubjectId = key.parse().map_err(|_| CheckerError::DataUnavailable {
                table: Table::Subjects,
                reason: format!("subject key {key:?} is not a numeric id"),
            })?;
            record.id = id;
            subjects.insert(id, record);
        }

        let check_ids = |table: Table, ids: &[SubjectId]| -> Result<BTreeSet<SubjectId>> {
            match ids.iter().find(|id| !subjects.contains_key(*id)) {
                Some(missing) => Err(CheckerError::DataUnavailable {
                    table,
                    reason: format!("unknown subject id {missing}"),
                }),
                None => Ok(ids.iter().copied().collect()),
            }
        };

        let mut synonyms = HashMap::with_capacity(tables.synonyms.len());
        for (meaning, ids) in &tables.synonyms {
            synonyms.insert(meaning.clone(), check_ids(Table::Synonyms, ids)?);
        }

        let mut twins: HashMap<HintKey, BTreeSet<SubjectId>> =
            HashMap::with_capacity(tables.twins.len());
        for (key, ids) in &tables.twins {
            let hints = QuestionHints::new(key.0.clone(), key.1.clone(), key.2.clone());
            let key = HintKey::from(&hints);
            twins.entry(key).or_default().extend(check_ids(Table::Twins, ids)?);
        }

        info!(
            subjects = subjects.len(),
            synonym_groups = synonyms.len(),
            twin_groups = twins.len(),
            "Equivalence store ready"
        );
        Ok(Self { subjects, synonyms, twins })
    }

    pub fn subject(&self, id: SubjectId) -> Option<&SubjectRecord> {
        self.subjects.get(&id)
    }

    pub fn subjects(&self) -> impl Iterator<Item = &SubjectRecord> {
        self.subjects.values()
    }

    /// Union of the synonym groups of `meanings`, ordered by subject id.
    /// Meanings without a group contribute nothing.
    pub fn synonyms_of<'a, I>(&self, meanings: I) -> Vec<&SubjectRecord>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let ids: BTreeSet<SubjectId> = meanings
            .into_iter()
            .filter_map(|meaning| self.synonyms.get(meaning))
            .flatten()
            .copied()
            .collect();
        self.resolve(&ids)
    }

    /// Twins registered under exactly these hints; empty if there are none.
    pub fn twins_of(&self, hints: &QuestionHints) -> Vec<&SubjectRecord> {
        let key = HintKey::from(hints);
        match self.twins.get(&key) {
            Some(ids) => self.resolve(ids),
            None => Vec::new(),
        }
    }

    /// Every subject whose meanings are exactly those shown by `hints`.
    pub fn subjects_with_meanings(&self, hints: &QuestionHints) -> Vec<&SubjectRecord> {
        self.subjects.values().filter(|s| s.has_meanings(hints)).collect()
    }

    fn resolve(&self, ids: &BTreeSet<SubjectId>) -> Vec<&SubjectRecord> {
        ids.iter().filter_map(|id| self.subjects.get(id)).collect()
    }
}

async fn fetch_table<T: DeserializeOwned>(provider: &dyn DataProvider, table: Table) -> Result<T> {
    let bytes = provider
        .fetch(table)
        .await
        .map_err(|reason| CheckerError::DataUnavailable { table, reason })?;
    debug!(%table, bytes = bytes.len(), "Fetched table");
    serde_json::from_slice(&bytes)
        .map_err(|e| CheckerError::DataUnavailable { table, reason: e.to_string() })
}
