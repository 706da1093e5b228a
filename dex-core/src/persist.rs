//! Snapshot persistence for assembled collections.
//!
//! Each collection lives in its own JSON file inside the cache directory,
//! wrapped in an envelope carrying a format version and the collection
//! kind. Writes go to a temporary sibling first and are renamed into place,
//! so an interrupted save never leaves a truncated snapshot behind.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;

/// Errors from persistence operations.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid save format: {0}")]
    InvalidFormat(String),

    #[error("Version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },

    #[error("Snapshot holds {found}, expected {expected}")]
    KindMismatch {
        expected: EntityKind,
        found: EntityKind,
    },
}

/// Current snapshot format version.
const SNAPSHOT_VERSION: u32 = 1;

/// The four persisted collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Types,
    Moves,
    Abilities,
    Creatures,
}

impl EntityKind {
    /// All kinds in dependency order.
    pub const ALL: [EntityKind; 4] = [
        EntityKind::Types,
        EntityKind::Moves,
        EntityKind::Abilities,
        EntityKind::Creatures,
    ];

    pub fn file_name(self) -> &'static str {
        match self {
            EntityKind::Types => "types.json",
            EntityKind::Moves => "moves.json",
            EntityKind::Abilities => "abilities.json",
            EntityKind::Creatures => "creatures.json",
        }
    }

    /// Kinds whose snapshots hold handles into this kind.
    pub fn dependents(self) -> &'static [EntityKind] {
        match self {
            EntityKind::Types => &[EntityKind::Moves, EntityKind::Creatures],
            EntityKind::Moves | EntityKind::Abilities => &[EntityKind::Creatures],
            EntityKind::Creatures => &[],
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EntityKind::Types => "types",
            EntityKind::Moves => "moves",
            EntityKind::Abilities => "abilities",
            EntityKind::Creatures => "creatures",
        };
        f.write_str(label)
    }
}

#[derive(Serialize)]
struct EnvelopeRef<'a, T> {
    version: u32,
    kind: EntityKind,
    saved_at: String,
    entries: &'a T,
}

#[derive(Deserialize)]
struct Envelope<T> {
    version: u32,
    kind: EntityKind,
    entries: T,
}

/// Reads and writes collection snapshots under one directory.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, kind: EntityKind) -> PathBuf {
        self.dir.join(kind.file_name())
    }

    /// Whether a snapshot file for `kind` exists.
    ///
    /// Only a missing file is a miss; any other IO failure is returned.
    pub async fn has_snapshot(&self, kind: EntityKind) -> Result<bool, PersistError> {
        Ok(fs::try_exists(self.path(kind)).await?)
    }

    /// Load the snapshot of `kind`.
    pub async fn load<T: DeserializeOwned>(&self, kind: EntityKind) -> Result<T, PersistError> {
        let content = fs::read_to_string(self.path(kind)).await?;
        let envelope: Envelope<T> = serde_json::from_str(&content)?;
        check_header(kind, envelope.version, envelope.kind)?;
        Ok(envelope.entries)
    }

    /// Save `entries` as the snapshot of `kind`, replacing any previous one.
    pub async fn save<T: Serialize>(&self, kind: EntityKind, entries: &T) -> Result<(), PersistError> {
        fs::create_dir_all(&self.dir).await?;

        let content = serde_json::to_string(&EnvelopeRef {
            version: SNAPSHOT_VERSION,
            kind,
            saved_at: timestamp_now(),
            entries,
        })?;
        write_atomic(&self.path(kind), content.as_bytes()).await
    }

    /// Delete the snapshot of `kind`. Missing files are not an error.
    pub async fn remove(&self, kind: EntityKind) -> Result<(), PersistError> {
        match fs::remove_file(self.path(kind)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete every snapshot.
    pub async fn clear(&self) -> Result<(), PersistError> {
        for kind in EntityKind::ALL {
            self.remove(kind).await?;
        }
        Ok(())
    }
}

fn check_header(expected: EntityKind, version: u32, found: EntityKind) -> Result<(), PersistError> {
    if version != SNAPSHOT_VERSION {
        return Err(PersistError::VersionMismatch {
            expected: SNAPSHOT_VERSION,
            found: version,
        });
    }
    if found != expected {
        return Err(PersistError::KindMismatch { expected, found });
    }
    Ok(())
}

/// Write `content` to a temporary sibling of `path`, then rename it over `path`.
pub(crate) async fn write_atomic(path: &Path, content: &[u8]) -> Result<(), PersistError> {
    let mut temp = path.as_os_str().to_owned();
    temp.push(".tmp");
    let temp = PathBuf::from(temp);

    fs::write(&temp, content).await?;
    if let Err(e) = fs::rename(&temp, path).await {
        let _ = fs::remove_file(&temp).await;
        return Err(e.into());
    }
    Ok(())
}

/// Current time as seconds since the Unix epoch.
fn timestamp_now() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    now.as_secs().to_string()
}
