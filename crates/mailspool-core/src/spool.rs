//! Durable per-stream artifact storage.
//!
//! The spool is a directory tree owned exclusively by this module:
//!
//! ```text
//! <spool_root>/
//!   <stream>/
//!     2024-05-01T12:00:00-2cf24dba.json
//!     2024-05-01T12:00:03-9b74c989.json
//! ```
//!
//! One file per received notification, never modified after creation.
//! Stream directories are created lazily on first write.
//!
//! # Durability
//!
//! A write is published with a temp-write-then-link sequence:
//! 1. Write to a hidden `.{name}.{uuid}.tmp` file in the stream dir
//! 2. fsync the temp file
//! 3. `hard_link` the temp file to the final name
//! 4. Unlink the temp file and fsync the directory
//!
//! Readers never observe partial artifacts: `list` skips hidden files,
//! and the final name only appears once its contents are complete and
//! synced. `hard_link` fails if the final name already exists, so a
//! same-name race loses no payload; the caller retries under a
//! different name. Directory fsync is required for crash safety: a
//! created directory entry may not survive power loss otherwise.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tokio::task;
use uuid::Uuid;

use crate::error::{Error, Result};

/// File extension of spooled artifacts.
pub const ARTIFACT_EXT: &str = "json";

/// Handle to the spool directory tree.
///
/// Cheap to clone; every operation runs its blocking I/O on the tokio
/// blocking pool so one slow write never stalls unrelated requests.
#[derive(Debug, Clone)]
pub struct SpoolStore {
    root: PathBuf,
}

impl SpoolStore {
    /// Opens the spool at `root`, creating the directory if absent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the root cannot be created.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// The spool root path.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Durably writes `payload` as `{stream}/{name}`.
    ///
    /// Once this returns `Ok`, the artifact is fully visible to
    /// [`list`](Self::list) and [`read`](Self::read) and has been
    /// synced to disk. The write keeps running on the blocking pool
    /// even if the calling task is cancelled, so a client disconnect
    /// never produces a half-spooled artifact.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ArtifactExists`] if the name is already taken
    /// (the store never overwrites) and [`Error::Storage`] on I/O
    /// failure.
    pub async fn write(&self, stream: &str, name: &str, payload: Vec<u8>) -> Result<()> {
        let root = self.root.clone();
        let stream = stream.to_string();
        let name = name.to_string();
        run_blocking(move || write_sync(&root, &stream, &name, &payload)).await
    }

    /// Lists artifact names in `stream`, lexically sorted.
    ///
    /// Names are timestamp-prefixed, so lexical order is also receipt
    /// order. A stream with no directory yet yields an empty list, as
    /// streams are created lazily.
    pub async fn list(&self, stream: &str) -> Result<Vec<String>> {
        let root = self.root.clone();
        let stream = stream.to_string();
        run_blocking(move || list_sync(&root, &stream)).await
    }

    /// Reads the artifact `{stream}/{name}`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the artifact does not exist.
    pub async fn read(&self, stream: &str, name: &str) -> Result<Vec<u8>> {
        let root = self.root.clone();
        let stream = stream.to_string();
        let name = name.to_string();
        run_blocking(move || read_sync(&root, &stream, &name)).await
    }

    /// Deletes the artifact `{stream}/{name}`.
    ///
    /// Not idempotent: deleting an absent artifact is
    /// [`Error::NotFound`]. Callers needing idempotence catch and
    /// ignore that case.
    pub async fn delete(&self, stream: &str, name: &str) -> Result<()> {
        let root = self.root.clone();
        let stream = stream.to_string();
        let name = name.to_string();
        run_blocking(move || delete_sync(&root, &stream, &name)).await
    }
}

async fn run_blocking<T, F>(op: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    task::spawn_blocking(op).await.map_err(|e| Error::Storage(io::Error::other(e)))?
}

/// Rejects path components that could escape the spool tree or expose
/// in-flight temp files. Checked before any filesystem access.
fn valid_component(value: &str) -> bool {
    !value.is_empty() && !value.starts_with('.') && !value.contains(['/', '\\', '\0'])
}

fn check_names(stream: &str, name: &str) -> Result<()> {
    if !valid_component(stream) || !valid_component(name) {
        return Err(Error::NotFound { stream: stream.to_string(), name: name.to_string() });
    }
    Ok(())
}

fn write_sync(root: &Path, stream: &str, name: &str, payload: &[u8]) -> Result<()> {
    check_names(stream, name)?;

    let dir = root.join(stream);
    // Concurrent creation of an existing stream directory is fine.
    fs::create_dir_all(&dir)?;

    let tmp_path = dir.join(format!(".{name}.{}.tmp", Uuid::new_v4().simple()));
    {
        let mut file = OpenOptions::new().write(true).create_new(true).open(&tmp_path)?;
        file.write_all(payload)?;
        fsync_file(&file)?;
    }

    // Publish without overwriting: hard_link fails if the name is taken.
    let final_path = dir.join(name);
    if let Err(e) = fs::hard_link(&tmp_path, &final_path) {
        let _ = fs::remove_file(&tmp_path);
        if e.kind() == io::ErrorKind::AlreadyExists {
            return Err(Error::ArtifactExists {
                stream: stream.to_string(),
                name: name.to_string(),
            });
        }
        return Err(Error::Storage(e));
    }

    fs::remove_file(&tmp_path)?;
    fsync_dir(&dir)?;
    Ok(())
}

fn list_sync(root: &Path, stream: &str) -> Result<Vec<String>> {
    if !valid_component(stream) {
        return Err(Error::NotFound { stream: stream.to_string(), name: String::new() });
    }

    let dir = root.join(stream);
    let entries = match fs::read_dir(&dir) {
        Ok(entries) => entries,
        // Lazily created stream that has never seen a write.
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(Error::Storage(e)),
    };

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(Error::Storage)?;
        let Ok(name) = entry.file_name().into_string() else { continue };
        if name.starts_with('.') || !entry.file_type().map_err(Error::Storage)?.is_file() {
            continue;
        }
        names.push(name);
    }
    names.sort();
    Ok(names)
}

fn read_sync(root: &Path, stream: &str, name: &str) -> Result<Vec<u8>> {
    check_names(stream, name)?;

    fs::read(root.join(stream).join(name)).map_err(|e| {
        if e.kind() == io::ErrorKind::NotFound {
            Error::NotFound { stream: stream.to_string(), name: name.to_string() }
        } else {
            Error::Storage(e)
        }
    })
}

fn delete_sync(root: &Path, stream: &str, name: &str) -> Result<()> {
    check_names(stream, name)?;

    fs::remove_file(root.join(stream).join(name)).map_err(|e| {
        if e.kind() == io::ErrorKind::NotFound {
            Error::NotFound { stream: stream.to_string(), name: name.to_string() }
        } else {
            Error::Storage(e)
        }
    })
}

/// Syncs a file's contents and metadata to disk (`fsync(2)`).
fn fsync_file(file: &File) -> io::Result<()> {
    file.sync_all()
}

/// Syncs a directory so new or removed entries survive a crash.
fn fsync_dir(dir: &Path) -> io::Result<()> {
    let dir = OpenOptions::new().read(true).open(dir)?;
    dir.sync_all()
}
