//! synonym-tables: builds, inspects and caches the synonym data the checker uses.

use anyhow::{bail, Context, Result};
use checker_core::{
    config::{parse_log_level, Config, DataConfig},
    controller::load_store,
    core::builder::{build_tables, largest_group, BuildOptions, ExportedSubject, SubjectKind},
    core::provider::Table,
    core::script::{is_valid_answer, normalize_answer, KanaConverter},
    core::types::QuestionHints,
    decide,
    persistence::save_snapshot,
    CheckerError,
};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG: &str = "synonym-checker.toml";

#[derive(Parser)]
#[command(name = "synonym-tables")]
#[command(about = "Build and query KaniWani synonym tables")]
struct Cli {
    /// Configuration file
    #[arg(long, global = true, default_value = DEFAULT_CONFIG)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the three tables from a subject export (a JSON array of subjects)
    Build {
        #[arg(long, value_name = "FILE")]
        export: PathBuf,
        /// Directory the tables are written to
        #[arg(long, value_name = "DIR")]
        out: PathBuf,
        #[arg(long, value_enum, default_value_t = Kind::Vocabulary)]
        kind: Kind,
        /// Group subjects by primary meaning only
        #[arg(long)]
        only_primary: bool,
    },
    /// Run the matcher against one question and answer
    Check {
        /// Directory holding the tables (default: configured data source)
        #[arg(long, value_name = "DIR")]
        data: Option<PathBuf>,
        #[arg(long)]
        primary: String,
        /// Secondary meanings as shown on the page, comma separated
        #[arg(long, default_value = "")]
        secondary: String,
        /// Part of speech tag, repeatable
        #[arg(long = "pos")]
        parts_of_speech: Vec<String>,
        /// The answer, in kana/kanji or romaji
        answer: String,
    },
    /// Load the tables and write a binary snapshot of the store
    Snapshot {
        #[arg(long, value_name = "DIR")]
        data: Option<PathBuf>,
        #[arg(long, value_name = "FILE")]
        out: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Kind {
    Kanji,
    Vocabulary,
    KanaVocabulary,
}

impl From<Kind> for SubjectKind {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::Kanji => SubjectKind::Kanji,
            Kind::Vocabulary => SubjectKind::Vocabulary,
            Kind::KanaVocabulary => SubjectKind::KanaVocabulary,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load(&cli.config)
        .with_context(|| format!("reading {}", cli.config.display()))?;
    init_logging(&config.log.level);

    match cli.command {
        Commands::Build { export, out, kind, only_primary } => {
            cmd_build(&export, &out, BuildOptions { kind: kind.into(), only_primary })
        }
        Commands::Check { data, primary, secondary, parts_of_speech, answer } => {
            let secondary = QuestionHints::split_secondary(&secondary);
            let hints = QuestionHints::new(primary, secondary, parts_of_speech);
            cmd_check(data_config(&config, data), hints, &answer).await
        }
        Commands::Snapshot { data, out } => {
            let store = load_store(&data_config(&config, data)).await?;
            save_snapshot(&store, &out)?;
            println!("Snapshot written to {}", out.display());
            Ok(())
        }
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::builder()
        .with_default_directive(parse_log_level(level).into())
        .from_env_lossy();
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

/// A `--data` directory overrides the configured source and skips the snapshot.
fn data_config(config: &Config, data: Option<PathBuf>) -> DataConfig {
    match data {
        Some(dir) => DataConfig {
            local_dir: Some(dir),
            snapshot_path: None,
            ..config.data.clone()
        },
        None => config.data.clone(),
    }
}

fn cmd_build(export: &Path, out: &Path, options: BuildOptions) -> Result<()> {
    let text = std::fs::read_to_string(export)
        .with_context(|| format!("reading {}", export.display()))?;
    let subjects: Vec<ExportedSubject> =
        serde_json::from_str(&text).with_context(|| format!("parsing {}", export.display()))?;

    let tables = build_tables(&subjects, options);
    if tables.subjects.is_empty() {
        bail!("no {:?} subjects in {}", options.kind, export.display());
    }

    std::fs::create_dir_all(out).with_context(|| format!("creating {}", out.display()))?;
    write_table(out, Table::Subjects, &tables.subjects)?;
    write_table(out, Table::Synonyms, &tables.synonyms)?;
    write_table(out, Table::Twins, &tables.twins)?;

    if let Some((meaning, size)) = largest_group(&tables) {
        info!(meaning, size, "Largest synonym group");
    }
    println!(
        "{} subjects, {} synonym groups, {} twin groups written to {}",
        tables.subjects.len(),
        tables.synonyms.len(),
        tables.twins.len(),
        out.display()
    );
    Ok(())
}

fn write_table<T: serde::Serialize>(dir: &Path, table: Table, value: &T) -> Result<()> {
    let path = dir.join(table.file_name());
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(&path, json).with_context(|| format!("writing {}", path.display()))
}

async fn cmd_check(data: DataConfig, hints: QuestionHints, raw: &str) -> Result<()> {
    let converter = KanaConverter::new();
    let answer = normalize_answer(raw, &converter);
    if !is_valid_answer(&answer, &converter) {
        return Err(CheckerError::InvalidAnswerInput(answer).into());
    }

    let store = load_store(&data).await?;
    let verdict = decide(&hints, &answer, &store)?;
    println!("{answer}: {verdict}");

    for record in store.synonyms_of(hints.meanings()) {
        let meanings = record.meanings().collect::<Vec<_>>().join(", ");
        println!("  {} {} ({meanings})", record.id, record.characters);
    }
    Ok(())
}
