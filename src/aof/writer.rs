//! AOF writer
//!
//! Owns the file handle. Appends, replay and background syncs all go through
//! the same mutex, so at most one of them touches the file at a time.

use super::SyncPolicy;
use crate::error::{Error, Result};
use crate::protocol::{RespEncoder, RespValue};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Period of the background sync under `SyncPolicy::EverySecond`
pub const SYNC_INTERVAL: Duration = Duration::from_secs(1);

/// Append-only log of write commands
pub struct Aof {
    /// `None` once the log has been closed
    file: Mutex<Option<File>>,
    path: PathBuf,
    sync_policy: SyncPolicy,
    shutdown: CancellationToken,
}

impl Aof {
    /// Open the AOF, creating the file if it does not exist
    pub fn open<P: AsRef<Path>>(path: P, sync_policy: SyncPolicy) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&path)?;

        info!("AOF opened at {:?} (appendfsync {})", path, sync_policy);

        Ok(Aof {
            file: Mutex::new(Some(file)),
            path,
            sync_policy,
            shutdown: CancellationToken::new(),
        })
    }

    /// Append one command to the end of the log
    ///
    /// Returns once the write call has completed. Whether the bytes are on
    /// stable storage depends on the sync policy. On failure the command must
    /// be treated as not persisted.
    pub fn append(&self, value: &RespValue) -> Result<()> {
        self.append_then(value, || ())
    }

    /// Append one command, then run `apply` before releasing the log
    ///
    /// Callers that mutate state after logging pass the mutation here, so the
    /// order of records in the file is the order in which they took effect.
    /// `apply` is not called when the append fails.
    pub fn append_then<T>(&self, value: &RespValue, apply: impl FnOnce() -> T) -> Result<T> {
        let bytes = RespEncoder::encode(value);

        let mut guard = self.lock();
        let file = guard.as_mut().ok_or(Error::Closed)?;
        write_record(file, &bytes, self.sync_policy == SyncPolicy::Always)?;

        Ok(apply())
    }

    /// Force sync to disk
    pub fn sync(&self) -> Result<()> {
        let guard = self.lock();
        let file = guard.as_ref().ok_or(Error::Closed)?;
        file.sync_all()?;
        Ok(())
    }

    /// Spawn the once-per-second sync task
    ///
    /// Only `SyncPolicy::EverySecond` has a background task; other policies
    /// return `None`. The task stops when the log is closed. Must be called
    /// from within a Tokio runtime.
    pub fn spawn_sync_task(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        if self.sync_policy != SyncPolicy::EverySecond {
            return None;
        }

        let aof = Arc::clone(self);
        let shutdown = self.shutdown.clone();

        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(SYNC_INTERVAL);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        let aof = Arc::clone(&aof);
                        match tokio::task::spawn_blocking(move || aof.sync()).await {
                            Ok(Ok(())) => {}
                            Ok(Err(Error::Closed)) => break,
                            Ok(Err(e)) => error!("AOF background sync failed: {}", e),
                            Err(e) => error!("AOF sync task failed: {}", e),
                        }
                    }
                }
            }

            debug!("AOF sync task stopped");
        }))
    }

    /// Close the log
    ///
    /// Stops the background sync, syncs one last time and releases the file.
    /// Later appends and replays fail with `Error::Closed`. Closing twice is a
    /// no-op.
    pub fn close(&self) -> Result<()> {
        self.shutdown.cancel();

        let Some(file) = self.lock().take() else {
            return Ok(());
        };

        file.sync_all()?;
        info!("AOF closed at {:?}", self.path);
        Ok(())
    }

    /// Whether `close` has been called
    pub fn is_closed(&self) -> bool {
        self.lock().is_none()
    }

    /// Path of the AOF file
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub(super) fn lock(&self) -> MutexGuard<'_, Option<File>> {
        self.file.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// What `write_record` needs from the log file
trait LogFile: Write {
    fn size(&self) -> io::Result<u64>;
    fn truncate(&mut self, len: u64) -> io::Result<()>;
    fn sync(&self) -> io::Result<()>;
}

impl LogFile for File {
    fn size(&self) -> io::Result<u64> {
        Ok(self.metadata()?.len())
    }

    fn truncate(&mut self, len: u64) -> io::Result<()> {
        self.set_len(len)
    }

    fn sync(&self) -> io::Result<()> {
        self.sync_all()
    }
}

/// Write one encoded record at the end of the file, syncing it if asked
///
/// If the write or the sync fails, the file is cut back to its previous
/// length so replay never sees a record the caller was told did not persist.
fn write_record<F: LogFile>(file: &mut F, bytes: &[u8], sync: bool) -> io::Result<()> {
    let start = file.size()?;

    let result = file
        .write_all(bytes)
        .and_then(|()| if sync { file.sync() } else { Ok(()) });

    if let Err(e) = result {
        if let Err(rollback) = file.truncate(start) {
            warn!("Failed to roll back AOF record: {}", rollback);
        }
        return Err(e);
    }

    Ok(())
}
