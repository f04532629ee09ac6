use log::warn;
use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::path::Path;
use std::rc::Rc;
use thiserror::Error;

/// Storage key holding the task collection snapshot
pub const TASKS_KEY: &str = "task-store";
/// Storage key holding the filter criteria snapshot
pub const FILTERS_KEY: &str = "task-manager-filters";

/// Snapshot format version written into every envelope
pub const SNAPSHOT_VERSION: u32 = 0;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    SqliteError(#[from] rusqlite::Error),
    #[error("Failed to create storage directory: {0}")]
    DirectoryError(String),
    #[error("Invalid snapshot: {0}")]
    SnapshotError(#[from] serde_json::Error),
    #[error("Unsupported snapshot version {found} (expected {expected})")]
    VersionMismatch { found: u32, expected: u32 },
}

/// Durable key-value storage for whole-state snapshots.
///
/// Each key holds one serialized snapshot which is overwritten wholesale on save.
pub trait SnapshotStorage {
    fn load(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn save(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

#[derive(Serialize)]
struct EnvelopeRef<'a, T> {
    version: u32,
    state: &'a T,
}

#[derive(serde::Deserialize)]
struct Envelope<T> {
    version: u32,
    state: T,
}

/// Serialize `state` into a versioned envelope and store it under `key`
pub fn save_snapshot<T: Serialize>(
    storage: &dyn SnapshotStorage,
    key: &str,
    state: &T,
) -> Result<(), StorageError> {
    let json = serde_json::to_string(&EnvelopeRef {
        version: SNAPSHOT_VERSION,
        state,
    })?;
    storage.save(key, &json)
}

/// Read and decode the snapshot under `key`; `Ok(None)` when nothing was stored yet
pub fn load_snapshot<T: DeserializeOwned>(
    storage: &dyn SnapshotStorage,
    key: &str,
) -> Result<Option<T>, StorageError> {
    let Some(json) = storage.load(key)? else {
        return Ok(None);
    };
    let envelope: Envelope<T> = serde_json::from_str(&json)?;
    if envelope.version != SNAPSHOT_VERSION {
        return Err(StorageError::VersionMismatch {
            found: envelope.version,
            expected: SNAPSHOT_VERSION,
        });
    }
    Ok(Some(envelope.state))
}

/// SQLite-backed storage: a single `kv` table in a local database file
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Open (or create) the database file and initialize the schema
    pub fn new(path: &Path) -> Result<Self, StorageError> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| StorageError::DirectoryError(e.to_string()))?;
            }
        }

        let conn = Connection::open(path)?;
        let storage = SqliteStorage { conn };
        storage.initialize_schema()?;
        Ok(storage)
    }

    /// In-memory database, lost when dropped
    pub fn open_in_memory() -> Result<Self, StorageError> {
        let storage = SqliteStorage {
            conn: Connection::open_in_memory()?,
        };
        storage.initialize_schema()?;
        Ok(storage)
    }

    fn initialize_schema(&self) -> Result<(), StorageError> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS kv (
                key             TEXT PRIMARY KEY,
                value           TEXT NOT NULL,
                updated_at      TEXT NOT NULL
            )",
            [],
        )?;
        Ok(())
    }
}

impl SnapshotStorage for SqliteStorage {
    fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM kv WHERE key = ?1",
                rusqlite::params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn save(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.conn.execute(
            "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            rusqlite::params![
                key,
                value,
                chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string()
            ],
        )?;
        Ok(())
    }
}

/// In-memory fake backend for tests
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: RefCell<HashMap<String, String>>,
    writes: Cell<usize>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw value stored under `key`
    pub fn get(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }

    /// Number of successful saves since creation
    pub fn write_count(&self) -> usize {
        self.writes.get()
    }
}

impl SnapshotStorage for MemoryStorage {
    fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn save(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        self.writes.set(self.writes.get() + 1);
        Ok(())
    }
}

/// Storage chosen at startup by `open_or_memory`
pub struct OpenedStorage {
    pub storage: Rc<dyn SnapshotStorage>,
    /// Why the database could not be opened; `None` when it is persistent
    pub fallback_reason: Option<StorageError>,
}

impl OpenedStorage {
    pub fn is_persistent(&self) -> bool {
        self.fallback_reason.is_none()
    }
}

/// Open the database at `path`, falling back to session-only memory storage
/// when it cannot be opened. Nothing written after a fallback survives exit.
pub fn open_or_memory(path: &Path) -> OpenedStorage {
    match SqliteStorage::new(path) {
        Ok(storage) => OpenedStorage {
            storage: Rc::new(storage),
            fallback_reason: None,
        },
        Err(e) => {
            warn!("event=storage_open status=failed path={} error={}", path.display(), e);
            OpenedStorage {
                storage: Rc::new(MemoryStorage::new()),
                fallback_reason: Some(e),
            }
        }
    }
}
