use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use ledger_core::StateSnapshot;
use serde_json::Value;
use tempfile::NamedTempFile;
use thiserror::Error;

/// Key holding the per-address emitted counts.
pub const ADDRESSES_KEY: &str = "ADDRESSES";
/// Key holding the emitted record identities.
pub const TRANSACTIONS_KEY: &str = "TXS";

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("output directory missing or not writable: {0}")]
    OutputDir(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("state value under {key} is malformed: {source}")]
    Malformed {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("could not serialize record: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Key-value store for crawl state that must survive restarts.
pub trait StateStore: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<Value>, PersistError>;
    fn save(&self, key: &str, value: &Value) -> Result<(), PersistError>;
}

#[derive(Debug, Default)]
pub struct MemoryStateStore {
    values: Mutex<HashMap<String, Value>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }
}

impl StateStore for MemoryStateStore {
    fn load(&self, key: &str) -> Result<Option<Value>, PersistError> {
        Ok(self.get(key))
    }

    fn save(&self, key: &str, value: &Value) -> Result<(), PersistError> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.clone());
        Ok(())
    }
}

/// One `{key}.json` file per key, replaced atomically on every save.
#[derive(Debug, Clone)]
pub struct FileStateStore {
    writer: AtomicFileWriter,
}

impl FileStateStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            writer: AtomicFileWriter::new(dir.into()),
        }
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.writer.dir().join(format!("{key}.json"))
    }
}

impl StateStore for FileStateStore {
    fn load(&self, key: &str) -> Result<Option<Value>, PersistError> {
        let content = match fs::read_to_string(self.path_for(key)) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|source| PersistError::Malformed {
                key: key.to_string(),
                source,
            })
    }

    fn save(&self, key: &str, value: &Value) -> Result<(), PersistError> {
        let content = serde_json::to_string_pretty(value)?;
        self.writer.write(&format!("{key}.json"), &content)?;
        Ok(())
    }
}

/// Read the dedup/quota state saved by a previous run. Missing keys start
/// empty.
pub fn load_snapshot(store: &dyn StateStore) -> Result<StateSnapshot, PersistError> {
    let addresses = match store.load(ADDRESSES_KEY)? {
        Some(value) => decode(ADDRESSES_KEY, value)?,
        None => Vec::new(),
    };
    let transactions = match store.load(TRANSACTIONS_KEY)? {
        Some(value) => decode(TRANSACTIONS_KEY, value)?,
        None => Vec::new(),
    };
    Ok(StateSnapshot {
        addresses,
        transactions,
    })
}

pub fn save_snapshot(store: &dyn StateStore, snapshot: &StateSnapshot) -> Result<(), PersistError> {
    store.save(ADDRESSES_KEY, &serde_json::to_value(&snapshot.addresses)?)?;
    store.save(TRANSACTIONS_KEY, &serde_json::to_value(&snapshot.transactions)?)?;
    Ok(())
}

fn decode<T: serde::de::DeserializeOwned>(key: &str, value: Value) -> Result<T, PersistError> {
    serde_json::from_value(value).map_err(|source| PersistError::Malformed {
        key: key.to_string(),
        source,
    })
}

/// Ensure output directory exists; create if missing.
pub fn ensure_output_dir(dir: &Path) -> Result<(), PersistError> {
    if dir.exists() {
        let meta = fs::metadata(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
        if !meta.is_dir() {
            return Err(PersistError::OutputDir("path is not a directory".into()));
        }
    } else {
        fs::create_dir_all(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
    }
    Ok(())
}

/// Atomically write content to `{dir}/{filename}` by writing a temp file then renaming.
#[derive(Debug, Clone)]
pub struct AtomicFileWriter {
    dir: PathBuf,
}

impl AtomicFileWriter {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn write(&self, filename: &str, content: &str) -> Result<PathBuf, PersistError> {
        ensure_output_dir(&self.dir)?;

        let target = self.dir.join(filename);
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.flush()?;
        tmp.as_file_mut().sync_all()?;

        tmp.persist(&target).map_err(|e| PersistError::Io(e.error))?;
        Ok(target)
    }
}
