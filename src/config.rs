// src/config.rs
//! Runtime configuration, read from a TOML file. Every field has a default that
//! matches the KaniWani review page.

use crate::error::{CheckerError, Result};
use crate::session::host::{ElementRole, Locator};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_BASE_URL: &str =
    "https://raw.githubusercontent.com/panda-byte/kaniwani-synonym-checker/main/data/";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub session: SessionConfig,
    pub data: DataConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub poll_interval_ms: u64,
    /// The page is a quiz session when its URL ends with this.
    pub session_url_suffix: String,
    pub confirm_key: String,
    pub retry_key: String,
    pub locators: LocatorConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 100,
            session_url_suffix: "/reviews/session".to_string(),
            confirm_key: "Enter".to_string(),
            retry_key: "Backspace".to_string(),
            locators: LocatorConfig::default(),
        }
    }
}

impl SessionConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocatorConfig {
    pub answer_input: String,
    pub question_box: String,
    pub primary_meaning: String,
    pub secondary_meanings: String,
    pub parts_of_speech: String,
    /// Resolved inside the parts-of-speech list; one match per tag.
    pub parts_of_speech_item: String,
    pub submit_control: String,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            answer_input: "#answer".to_string(),
            question_box: "div.lltPfd".to_string(),
            primary_meaning: "div[data-question-primary]".to_string(),
            secondary_meanings: "div[data-question-secondary]".to_string(),
            parts_of_speech: "ul.hyPboY".to_string(),
            parts_of_speech_item: "li > span".to_string(),
            submit_control: r#"button[aria-label="Submit answer"]"#.to_string(),
        }
    }
}

impl LocatorConfig {
    pub fn locator(&self, role: ElementRole) -> Locator {
        let selector = match role {
            ElementRole::AnswerInput => &self.answer_input,
            ElementRole::QuestionBox => &self.question_box,
            ElementRole::PrimaryMeaning => &self.primary_meaning,
            ElementRole::SecondaryMeanings => &self.secondary_meanings,
            ElementRole::PartsOfSpeech => &self.parts_of_speech,
            ElementRole::SubmitControl => &self.submit_control,
        };
        Locator::new(selector.clone())
    }

    pub fn item_locator(&self) -> Locator {
        Locator::new(self.parts_of_speech_item.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub base_url: String,
    /// Read tables from here instead of `base_url` when set.
    pub local_dir: Option<PathBuf>,
    pub snapshot_path: Option<PathBuf>,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            local_dir: None,
            snapshot_path: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self { level: "info".to_string() }
    }
}

impl Config {
    /// Reads `path`, falling back to defaults when the file does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::parse(&text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn parse(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| CheckerError::Config(e.to_string()))
    }
}

/// Parses a log level name, defaulting to INFO.
pub fn parse_log_level(level: &str) -> tracing::Level {
    match level.to_lowercase().as_str() {
        "off" | "error" => tracing::Level::ERROR,
        "warn" => tracing::Level::WARN,
        "debug" => tracing::Level::DEBUG,
        "trace" => tracing::Level::TRACE,
        _ => tracing::Level::INFO,
    }
}
