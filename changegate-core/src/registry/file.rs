//! JSON snapshot store that survives process restarts.

use super::record::WaitRecord;
use super::store::RegistryStore;
use crate::error::{GateError, Result};
use crate::types::Token;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Snapshot format version.
const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct Snapshot {
    version: u32,
    records: Vec<WaitRecord>,
}

/// File-backed registry store.
///
/// Holds a mirror of all records and rewrites the whole snapshot on every
/// change: serialize, write to `<path>.tmp`, fsync, then rename over `<path>`.
/// A crash mid-write leaves the previous snapshot intact.
///
/// Writes are synchronous and hold the mirror's mutex for the full
/// write-fsync-rename cycle, so concurrent transitions on different tokens
/// queue behind each other and run on the caller's thread (a hyper connection
/// task for callbacks). Sized for gates with tens to hundreds of outstanding
/// waits; a higher-volume deployment needs an append-only store behind
/// [`RegistryStore`] instead.
#[derive(Debug)]
pub struct FileRegistryStore {
    path: PathBuf,
    records: Mutex<BTreeMap<Token, WaitRecord>>,
}

impl FileRegistryStore {
    /// Open (or create) a store at `path`, reading any existing snapshot.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| GateError::Io {
                path: parent.to_path_buf(),
                cause: e.to_string(),
            })?;
        }

        let records = if path.exists() {
            read_snapshot(&path)?
                .into_iter()
                .map(|r| (r.wait.token.clone(), r))
                .collect()
        } else {
            BTreeMap::new()
        };

        tracing::debug!(path = %path.display(), records = records.len(), "Opened registry store");

        Ok(Self {
            path,
            records: Mutex::new(records),
        })
    }

    /// Location of the snapshot file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_snapshot(&self, records: &BTreeMap<Token, WaitRecord>) -> Result<()> {
        let snapshot = Snapshot {
            version: SNAPSHOT_VERSION,
            records: records.values().cloned().collect(),
        };
        let data = serde_json::to_vec_pretty(&snapshot)?;

        let temp_path = self.path.with_extension("tmp");
        let store_err = |cause: String| GateError::Store {
            path: self.path.clone(),
            cause,
        };

        let file = File::create(&temp_path)
            .map_err(|e| store_err(format!("Failed to create temp snapshot: {}", e)))?;
        let mut writer = BufWriter::new(file);
        writer
            .write_all(&data)
            .map_err(|e| store_err(format!("Failed to write snapshot: {}", e)))?;
        writer
            .flush()
            .map_err(|e| store_err(format!("Failed to flush snapshot: {}", e)))?;
        writer
            .get_ref()
            .sync_all()
            .map_err(|e| store_err(format!("Failed to sync snapshot: {}", e)))?;

        fs::rename(&temp_path, &self.path)
            .map_err(|e| store_err(format!("Failed to rename snapshot: {}", e)))?;

        Ok(())
    }
}

fn read_snapshot(path: &Path) -> Result<Vec<WaitRecord>> {
    let data = fs::read(path).map_err(|e| GateError::Store {
        path: path.to_path_buf(),
        cause: format!("Failed to read snapshot: {}", e),
    })?;
    if data.is_empty() {
        return Ok(Vec::new());
    }

    let snapshot: Snapshot = serde_json::from_slice(&data).map_err(|e| GateError::Store {
        path: path.to_path_buf(),
        cause: format!("Corrupt snapshot: {}", e),
    })?;
    if snapshot.version != SNAPSHOT_VERSION {
        return Err(GateError::Store {
            path: path.to_path_buf(),
            cause: format!("Unsupported snapshot version {}", snapshot.version),
        });
    }
    Ok(snapshot.records)
}

impl RegistryStore for FileRegistryStore {
    fn load(&self) -> Result<Vec<WaitRecord>> {
        Ok(self.records.lock().values().cloned().collect())
    }

    fn put(&self, record: &WaitRecord) -> Result<()> {
        let mut records = self.records.lock();
        records.insert(record.wait.token.clone(), record.clone());
        self.write_snapshot(&records)
    }

    fn delete(&self, token: &Token) -> Result<()> {
        let mut records = self.records.lock();
        if records.remove(token).is_none() {
            return Ok(());
        }
        self.write_snapshot(&records)
    }

    fn name(&self) -> &'static str {
        "file"
    }
}
