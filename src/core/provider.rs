// src/core/provider.rs
//! Sources for the three reference tables.

use async_trait::async_trait;
use std::fmt;
use std::path::PathBuf;
use tracing::debug;

/// The three documents the equivalence store is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Table {
    Subjects,
    Synonyms,
    Twins,
}

impl Table {
    pub fn file_name(self) -> &'static str {
        match self {
            Table::Subjects => "vocab_subjects.json",
            Table::Synonyms => "vocab_synonyms.json",
            Table::Twins => "twins.json",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Table::Subjects => write!(f, "subjects"),
            Table::Synonyms => write!(f, "synonyms"),
            Table::Twins => write!(f, "twins"),
        }
    }
}

/// Fetches the raw JSON bytes of one table. Errors are reported as plain strings
/// and turned into `DataUnavailable` by the store.
#[async_trait]
pub trait DataProvider: Send + Sync {
    async fn fetch(&self, table: Table) -> Result<Vec<u8>, String>;
}

/// Reads tables from a local directory.
#[derive(Debug, Clone)]
pub struct DirectoryProvider {
    root: PathBuf,
}

impl DirectoryProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl DataProvider for DirectoryProvider {
    async fn fetch(&self, table: Table) -> Result<Vec<u8>, String> {
        let path = self.root.join(table.file_name());
        debug!(path = %path.display(), "Reading table");
        tokio::fs::read(&path)
            .await
            .map_err(|e| format!("{}: {e}", path.display()))
    }
}

/// Downloads tables from `<base_url><file name>`.
#[derive(Debug, Clone)]
pub struct HttpProvider {
    client: reqwest::Client,
    base_url: String,
}

impl HttpProvider {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { client: reqwest::Client::new(), base_url: base_url.into() }
    }
}

#[async_trait]
impl DataProvider for HttpProvider {
    async fn fetch(&self, table: Table) -> Result<Vec<u8>, String> {
        let url = format!("{}{}", self.base_url, table.file_name());
        debug!(%url, "Downloading table");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| e.to_string())?;
        let bytes = response.bytes().await.map_err(|e| e.to_string())?;
        Ok(bytes.to_vec())
    }
}
