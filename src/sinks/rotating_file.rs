//! Size-rotated log files with count-based retention
//!
//! A [`FileTransport`] owns one directory of rotation files named
//! `<prefix>-<UTC timestamp>-<sequence>.log`. Names sort in creation order,
//! which is what retention relies on. Everything that touches the open
//! handle or the byte counter happens under one lock, so concurrent writers
//! never interleave bytes or rotate twice.

use super::compress::{gz_path_for, Compressor};
use crate::core::config::FileConfig;
use crate::core::error::{LoggerError, Result};
use chrono::Utc;
use parking_lot::{Mutex, MutexGuard};
use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Longest a write waits for the rotation lock before giving up
pub const WRITE_LOCK_TIMEOUT: Duration = Duration::from_millis(500);

pub const DEFAULT_FILE_PREFIX: &str = "app";

/// When to rotate and what to keep
///
/// # Examples
///
/// ```
/// use applog::sinks::RotationPolicy;
///
/// let policy = RotationPolicy::new()
///     .with_max_size(50 * 1024 * 1024)
///     .with_max_files(7)
///     .with_compression(true);
/// assert_eq!(policy.max_files, 7);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationPolicy {
    /// Rotate before a write would push the file past this many bytes.
    /// `0` behaves like `1`: every line gets its own file.
    pub max_bytes: u64,
    /// Files kept including the active one; `0` disables pruning
    pub max_files: usize,
    /// Gzip rotated files in the background
    pub compress: bool,
    /// File name prefix, also the retention match pattern
    pub prefix: String,
}

impl Default for RotationPolicy {
    fn default() -> Self {
        Self {
            max_bytes: crate::core::config::DEFAULT_MAX_BYTES,
            max_files: 30,
            compress: false,
            prefix: DEFAULT_FILE_PREFIX.to_string(),
        }
    }
}

impl RotationPolicy {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_max_size(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_max_files(mut self, count: usize) -> Self {
        self.max_files = count;
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_compression(mut self, enabled: bool) -> Self {
        self.compress = enabled;
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }
}

impl From<&FileConfig> for RotationPolicy {
    fn from(config: &FileConfig) -> Self {
        RotationPolicy::new()
            .with_max_size(config.max_bytes())
            .with_max_files(config.max_files)
            .with_compression(config.compress)
    }
}

/// Mutable rotation state; only ever touched with the lock held
struct RotationState {
    file: Option<File>,
    current_path: Option<PathBuf>,
    current_size: u64,
    rotation_count: u64,
    sequence: u64,
    closed: bool,
    compressor: Option<Compressor>,
}

/// Count-based pruning of one directory's rotation files.
///
/// Runs on the writer thread when compression is off. With compression on
/// it runs on the compressor thread after each job, so a file is never
/// pruned while it is being compressed.
#[derive(Debug, Clone)]
pub(crate) struct Retention {
    directory: PathBuf,
    prefix: String,
    max_files: usize,
}

impl Retention {
    fn new(directory: &Path, policy: &RotationPolicy) -> Self {
        Self {
            directory: directory.to_path_buf(),
            prefix: policy.prefix.clone(),
            max_files: policy.max_files,
        }
    }

    /// Delete the oldest rotation files beyond `max_files`. `active` and
    /// anything named after it are never touched.
    ///
    /// Best effort: failures are reported and retried on the next call.
    pub(crate) fn prune(&self, active: &Path) {
        if self.max_files == 0 {
            return;
        }

        let groups = match self.rotation_files() {
            Ok(groups) => groups,
            Err(e) => {
                eprintln!(
                    "[LOGGER WARNING] Cannot list {} for retention: {}",
                    self.directory.display(),
                    e
                );
                return;
            }
        };

        let active_name = active
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        let excess = groups.len().saturating_sub(self.max_files);
        for (stem, paths) in groups.into_iter().take(excess) {
            if stem.as_str() >= active_name {
                continue;
            }
            for path in paths {
                match fs::remove_file(&path) {
                    Ok(()) => {}
                    Err(e) if e.kind() == ErrorKind::NotFound => {}
                    Err(e) => eprintln!(
                        "[LOGGER WARNING] Failed to remove old log file {}: {}",
                        path.display(),
                        e
                    ),
                }
            }
        }
    }

    /// Rotation files in the directory, oldest first.
    ///
    /// A file and its `.gz` twin share one entry.
    fn rotation_files(&self) -> std::io::Result<BTreeMap<String, Vec<PathBuf>>> {
        let prefix = format!("{}-", self.prefix);
        let mut groups: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();

        for entry in fs::read_dir(&self.directory)? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if !name.starts_with(&prefix) {
                continue;
            }
            let stem = name.strip_suffix(".gz").unwrap_or(name);
            if !stem.ends_with(".log") {
                continue;
            }
            groups.entry(stem.to_string()).or_default().push(entry.path());
        }

        Ok(groups)
    }
}

pub struct FileTransport {
    directory: PathBuf,
    policy: RotationPolicy,
    retention: Retention,
    state: Mutex<RotationState>,
}

impl FileTransport {
    /// Open a transport as described by the `file` section of the config
    ///
    /// # Errors
    ///
    /// Returns error if the directory or the first file cannot be created
    pub fn from_config(config: &FileConfig) -> Result<Self> {
        Self::open(&config.directory, RotationPolicy::from(config))
    }

    /// Create `directory` if needed and open the first rotation file
    ///
    /// # Errors
    ///
    /// Returns error if the prefix is empty or contains a path separator, or
    /// if the directory or the first file cannot be created
    pub fn open(directory: impl AsRef<Path>, policy: RotationPolicy) -> Result<Self> {
        if policy.prefix.is_empty() || policy.prefix.contains(['/', '\\']) {
            return Err(LoggerError::config(
                "rotation prefix",
                format!("'{}' is not a plain file name prefix", policy.prefix),
            ));
        }
        let directory = directory.as_ref().to_path_buf();
        fs::create_dir_all(&directory).map_err(|e| {
            LoggerError::io_operation(
                "create log directory",
                format!("Failed to create directory '{}'", directory.display()),
                e,
            )
        })?;

        let retention = Retention::new(&directory, &policy);
        let compressor = if policy.compress {
            match Compressor::spawn(Some(retention.clone())) {
                Ok(compressor) => Some(compressor),
                Err(e) => {
                    eprintln!("[LOGGER WARNING] {}. Rotated files stay uncompressed.", e);
                    None
                }
            }
        } else {
            None
        };

        let transport = Self {
            directory,
            policy,
            retention,
            state: Mutex::new(RotationState {
                file: None,
                current_path: None,
                current_size: 0,
                rotation_count: 0,
                sequence: 0,
                closed: false,
                compressor,
            }),
        };

        {
            let mut state = transport.state.lock();
            transport.rotate(&mut state)?;
        }

        Ok(transport)
    }

    /// Append `line` plus a newline, rotating first if it would not fit.
    ///
    /// # Errors
    ///
    /// `WriteTimeout` if another writer holds the lock too long,
    /// `TransportClosed` after [`close`](Self::close), IO errors otherwise.
    pub fn write(&self, line: &str) -> Result<()> {
        let mut state = self.lock_for_write()?;
        if state.closed {
            return Err(LoggerError::TransportClosed);
        }

        let mut buf = Vec::with_capacity(line.len() + 1);
        buf.extend_from_slice(line.as_bytes());
        buf.push(b'\n');
        let len = buf.len() as u64;

        if self.needs_rotation(&state, len) {
            self.rotate(&mut state)?;
        }

        let path = state.current_path.clone().unwrap_or_default();
        let Some(file) = state.file.as_mut() else {
            return Err(LoggerError::file_transport(
                path.display().to_string(),
                "no open log file",
            ));
        };

        if let Err(e) = file.write_all(&buf) {
            // Drop the handle; the next write starts a fresh file
            state.file = None;
            return Err(LoggerError::file_transport(
                path.display().to_string(),
                format!("Failed to write log line: {}", e),
            ));
        }

        state.current_size += len;
        Ok(())
    }

    /// Flush the current file to disk
    pub fn flush(&self) -> Result<()> {
        let mut state = self.lock_for_write()?;
        if let Some(ref mut file) = state.file {
            file.flush()?;
            file.sync_data()?;
        }
        Ok(())
    }

    /// Sync and close the current file, then wait for pending compression.
    ///
    /// Calling it again is a no-op.
    pub fn close(&self) -> Result<()> {
        let (synced, compressor) = {
            let mut state = self.state.lock();
            if state.closed {
                return Ok(());
            }
            state.closed = true;
            let synced = match state.file.take() {
                Some(file) => file.sync_all(),
                None => Ok(()),
            };
            (synced, state.compressor.take())
        };

        if let Some(mut compressor) = compressor {
            compressor.shutdown();
        }

        synced.map_err(|e| LoggerError::io_operation("closing log file", "sync failed", e))
    }

    fn lock_for_write(&self) -> Result<MutexGuard<'_, RotationState>> {
        self.state
            .try_lock_for(WRITE_LOCK_TIMEOUT)
            .ok_or(LoggerError::WriteTimeout(WRITE_LOCK_TIMEOUT))
    }

    fn needs_rotation(&self, state: &RotationState, incoming: u64) -> bool {
        let max = self.policy.max_bytes.max(1);
        state.file.is_none()
            || state.current_size >= max
            || (state.current_size > 0 && state.current_size + incoming > max)
    }

    /// Close the current file, open the next one, prune old ones
    fn rotate(&self, state: &mut RotationState) -> Result<()> {
        let previous = state.current_path.take();
        if let Some(mut file) = state.file.take() {
            if let Err(e) = file.flush() {
                eprintln!("[LOGGER WARNING] Failed to flush before rotation: {}", e);
            }
        }

        if previous.is_some() {
            state.rotation_count += 1;
        }

        state.sequence += 1;
        let path = self.directory.join(format!(
            "{}-{}-{:06}.log",
            self.policy.prefix,
            Utc::now().format("%Y%m%dT%H%M%S%3fZ"),
            state.sequence
        ));

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| {
                LoggerError::file_rotation(
                    path.display().to_string(),
                    format!("Failed to create new log file: {}", e),
                )
            })?;

        state.file = Some(file);
        state.current_path = Some(path.clone());
        state.current_size = 0;

        // Pruning follows compression when a compressor owns the old file
        match (previous, state.compressor.as_ref()) {
            (Some(previous), Some(compressor)) => compressor.submit(previous, path),
            _ => self.retention.prune(&path),
        }
        Ok(())
    }

    /// Path of the file currently being written
    pub fn current_path(&self) -> Option<PathBuf> {
        self.state.lock().current_path.clone()
    }

    /// Bytes written to the current file
    pub fn current_size(&self) -> u64 {
        self.state.lock().current_size
    }

    /// Rotations performed since open; the initial file does not count
    pub fn rotation_count(&self) -> u64 {
        self.state.lock().rotation_count
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    pub fn max_bytes(&self) -> u64 {
        self.policy.max_bytes
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn policy(&self) -> &RotationPolicy {
        &self.policy
    }

    /// Expected compressed name for a rotation file
    pub fn compressed_path(path: &Path) -> PathBuf {
        gz_path_for(path)
    }
}

impl Drop for FileTransport {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
