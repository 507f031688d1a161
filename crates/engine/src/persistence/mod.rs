//! Key/value text storage for save data.
//!
//! Keys are short slot names such as `village`. Values are opaque text; the
//! game decides the encoding.

mod atomic_io;

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use atomic_io::{read_text_if_exists, write_text_atomic};

const SAVE_FILE_EXTENSION: &str = "json";

#[derive(Debug, Error)]
pub enum SaveStoreError {
    #[error("invalid save key '{key}': use 1-64 ASCII letters, digits, '-' or '_'")]
    InvalidKey { key: String },
    #[error("failed to read save '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write save '{}': {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("save store is unavailable: {reason}")]
    Unavailable { reason: String },
}

pub trait SaveStore {
    /// `Ok(None)` when nothing has been saved under `key`.
    fn read(&self, key: &str) -> Result<Option<String>, SaveStoreError>;
    fn write(&mut self, key: &str, contents: &str) -> Result<(), SaveStoreError>;

    fn contains(&self, key: &str) -> Result<bool, SaveStoreError> {
        Ok(self.read(key)?.is_some())
    }
}

impl<S: SaveStore + ?Sized> SaveStore for Box<S> {
    fn read(&self, key: &str) -> Result<Option<String>, SaveStoreError> {
        (**self).read(key)
    }

    fn write(&mut self, key: &str, contents: &str) -> Result<(), SaveStoreError> {
        (**self).write(key, contents)
    }
}

fn validate_key(key: &str) -> Result<(), SaveStoreError> {
    let valid = !key.is_empty()
        && key.len() <= 64
        && key
            .bytes()
            .all(|byte| byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_');
    if valid {
        Ok(())
    } else {
        Err(SaveStoreError::InvalidKey {
            key: key.to_string(),
        })
    }
}

/// One file per key under a directory, written atomically.
#[derive(Debug, Clone)]
pub struct FileSaveStore {
    dir: PathBuf,
}

impl FileSaveStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &str) -> Result<PathBuf, SaveStoreError> {
        validate_key(key)?;
        Ok(self.dir.join(format!("{key}.{SAVE_FILE_EXTENSION}")))
    }
}

impl SaveStore for FileSaveStore {
    fn read(&self, key: &str) -> Result<Option<String>, SaveStoreError> {
        let path = self.path_for(key)?;
        read_text_if_exists(&path).map_err(|source| SaveStoreError::Read { path, source })
    }

    fn write(&mut self, key: &str, contents: &str) -> Result<(), SaveStoreError> {
        let path = self.path_for(key)?;
        write_text_atomic(&path, contents).map_err(|source| SaveStoreError::Write { path, source })
    }
}

/// In-memory store with switchable failures, for exercising error paths.
#[derive(Debug, Default, Clone)]
pub struct MemorySaveStore {
    entries: HashMap<String, String>,
    fail_reads: bool,
    fail_writes: bool,
}

impl MemorySaveStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_reads(&mut self, fail: bool) {
        self.fail_reads = fail;
    }

    pub fn set_fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    pub fn insert_raw(&mut self, key: &str, contents: &str) {
        self.entries.insert(key.to_string(), contents.to_string());
    }

    pub fn raw(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }
}

impl SaveStore for MemorySaveStore {
    fn read(&self, key: &str) -> Result<Option<String>, SaveStoreError> {
        validate_key(key)?;
        if self.fail_reads {
            return Err(SaveStoreError::Unavailable {
                reason: "reads disabled".to_string(),
            });
        }
        Ok(self.entries.get(key).cloned())
    }

    fn write(&mut self, key: &str, contents: &str) -> Result<(), SaveStoreError> {
        validate_key(key)?;
        if self.fail_writes {
            return Err(SaveStoreError::Unavailable {
                reason: "writes disabled".to_string(),
            });
        }
        self.entries.insert(key.to_string(), contents.to_string());
        Ok(())
    }
}
