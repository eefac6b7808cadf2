// File: src/persistence.rs
use crate::core::store::EquivalenceStore;
use crate::error::{CheckerError, Result};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::info;

const SNAPSHOT_VERSION: u32 = 1;

#[derive(serde::Serialize, serde::Deserialize)]
struct Snapshot {
    version: u32,
    store: EquivalenceStore,
}

/// Writes the store next to `path` and atomically moves it into place.
pub fn save_snapshot(store: &EquivalenceStore, path: &Path) -> Result<()> {
    let parent_dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent_dir)?;

    let snapshot = Snapshot { version: SNAPSHOT_VERSION, store: store.clone() };

    let temp_file = NamedTempFile::new_in(parent_dir)?;
    {
        let mut writer = BufWriter::new(&temp_file);
        bincode::serialize_into(&mut writer, &snapshot)
            .map_err(|e| CheckerError::Snapshot(e.to_string()))?;
        writer.flush()?;
    }

    temp_file.persist(path).map_err(|e| CheckerError::Io(e.error))?;
    info!(path = %path.display(), "Snapshot saved");
    Ok(())
}

pub fn load_snapshot(path: &Path) -> Result<EquivalenceStore> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let snapshot: Snapshot = bincode::deserialize_from(reader)
        .map_err(|e| CheckerError::Snapshot(e.to_string()))?;

    if snapshot.version != SNAPSHOT_VERSION {
        return Err(CheckerError::Snapshot(format!(
            "unsupported snapshot version {} (expected {SNAPSHOT_VERSION})",
            snapshot.version
        )));
    }
    Ok(snapshot.store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::tests::sample_store;

    #[test]
    fn snapshot_survives_a_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache").join("store.bin");
        let store = sample_store();

        save_snapshot(&store, &path).unwrap();
        assert_eq!(load_snapshot(&path).unwrap(), store);
    }

    #[test]
    fn garbage_is_a_snapshot_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.bin");
        fs::write(&path, b"not bincode").unwrap();
        assert!(matches!(load_snapshot(&path), Err(CheckerError::Snapshot(_))));
    }
}
