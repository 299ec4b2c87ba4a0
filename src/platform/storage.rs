//! Durable key/value storage
//!
//! Backends move opaque strings; serialization and caching live in
//! `persistence`. Reads of a missing key are `Ok(None)`, removing a missing
//! key is not an error.

use std::collections::HashMap;
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Async durable storage
pub trait StorageBackend: Send + Sync {
    fn read(&self, key: &str) -> impl Future<Output = io::Result<Option<String>>> + Send;
    fn write(&self, key: &str, value: &str) -> impl Future<Output = io::Result<()>> + Send;
    fn remove(&self, key: &str) -> impl Future<Output = io::Result<()>> + Send;
}

impl<B: StorageBackend> StorageBackend for Arc<B> {
    fn read(&self, key: &str) -> impl Future<Output = io::Result<Option<String>>> + Send {
        self.as_ref().read(key)
    }

    fn write(&self, key: &str, value: &str) -> impl Future<Output = io::Result<()>> + Send {
        self.as_ref().write(key, value)
    }

    fn remove(&self, key: &str) -> impl Future<Output = io::Result<()>> + Send {
        self.as_ref().remove(key)
    }
}

/// One `<key>.json` file per key inside a directory
///
/// Writes go to `<key>.json.tmp` first and are renamed into place, so a
/// crash mid-write leaves the previous value intact.
#[derive(Debug, Clone)]
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    /// The directory is created on first write
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> io::Result<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '@' | '_' | '-' | '.'))
            && !key.starts_with('.');
        if !valid {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid storage key: {key:?}"),
            ));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl StorageBackend for FileBackend {
    async fn read(&self, key: &str) -> io::Result<Option<String>> {
        let path = self.path_for(key)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn write(&self, key: &str, value: &str) -> io::Result<()> {
        let path = self.path_for(key)?;
        tokio::fs::create_dir_all(&self.dir).await?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, value).await?;
        tokio::fs::rename(&tmp, &path).await
    }

    async fn remove(&self, key: &str) -> io::Result<()> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

/// In-process backend with read counting and failure injection
#[derive(Debug, Default)]
pub struct MemoryBackend {
    values: Mutex<HashMap<String, String>>,
    reads: AtomicUsize,
    fail_writes: AtomicBool,
    fail_removes: Mutex<Vec<String>>,
    read_stall: Mutex<Option<Duration>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of durable reads served so far
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Make every subsequent write fail
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make removal of one key fail
    pub fn fail_remove_of(&self, key: &str) {
        self.lock_fail_removes().push(key.to_string());
    }

    /// The next read takes its value immediately but only returns after
    /// `delay`, so writes can land while it is in flight
    pub fn stall_next_read(&self, delay: Duration) {
        *self
            .read_stall
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(delay);
    }

    /// Store raw text, bypassing any serialization
    pub fn insert_raw(&self, key: &str, value: &str) {
        self.lock_values().insert(key.to_string(), value.to_string());
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.lock_values().get(key).cloned()
    }

    fn lock_values(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.values.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_fail_removes(&self) -> std::sync::MutexGuard<'_, Vec<String>> {
        self.fail_removes
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl StorageBackend for MemoryBackend {
    async fn read(&self, key: &str) -> io::Result<Option<String>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let value = self.raw(key);
        let stall = self
            .read_stall
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(delay) = stall {
            tokio::time::sleep(delay).await;
        }
        Ok(value)
    }

    async fn write(&self, key: &str, value: &str) -> io::Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(io::Error::other(format!("write to {key} refused")));
        }
        self.insert_raw(key, value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> io::Result<()> {
        if self.lock_fail_removes().iter().any(|k| k == key) {
            return Err(io::Error::other(format!("remove of {key} refused")));
        }
        self.lock_values().remove(key);
        Ok(())
    }
}
