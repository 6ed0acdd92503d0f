//! Background gzip compression of rotated log files

use super::rotating_file::Retention;
use crate::core::error::{LoggerError, Result};
use crossbeam_channel::{unbounded, Sender};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};

/// A closed file to compress, and the file active when it was rotated
struct Job {
    path: PathBuf,
    active: PathBuf,
}

/// Single worker thread compressing closed log files, in submission order.
///
/// The rotation path only pays for a channel send; the file is already
/// closed and renamed out of the write path when it is queued. When given
/// a [`Retention`], the worker prunes after every job, so compression and
/// pruning never touch the same file at once.
pub(crate) struct Compressor {
    sender: Option<Sender<Job>>,
    worker: Option<JoinHandle<()>>,
}

impl Compressor {
    pub(crate) fn spawn(retention: Option<Retention>) -> Result<Self> {
        let (sender, receiver) = unbounded::<Job>();

        let worker = thread::Builder::new()
            .name("applog-compress".to_string())
            .spawn(move || {
                for job in receiver {
                    match compress_file(&job.path) {
                        Ok(_) => {}
                        // Removed by someone else before its turn
                        Err(_) if !job.path.exists() => {}
                        Err(e) => {
                            eprintln!("[LOGGER WARNING] {}. Keeping uncompressed file.", e)
                        }
                    }
                    if let Some(ref retention) = retention {
                        retention.prune(&job.active);
                    }
                }
            })
            .map_err(|e| {
                LoggerError::io_operation("spawn compressor", "cannot start worker thread", e)
            })?;

        Ok(Self {
            sender: Some(sender),
            worker: Some(worker),
        })
    }

    /// Queue a closed file. `active` and newer files survive the pruning
    /// that follows. Never blocks.
    pub(crate) fn submit(&self, path: PathBuf, active: PathBuf) {
        let Some(ref sender) = self.sender else {
            return;
        };
        if let Err(e) = sender.send(Job { path, active }) {
            eprintln!(
                "[LOGGER WARNING] Compressor stopped; leaving {} uncompressed",
                e.into_inner().path.display()
            );
        }
    }

    /// Stop accepting work and wait for queued files to finish
    pub(crate) fn shutdown(&mut self) {
        drop(self.sender.take());
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                eprintln!("[LOGGER ERROR] Compressor thread panicked during shutdown");
            }
        }
    }
}

impl Drop for Compressor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Gzip `x.log` into `x.log.gz`, removing the original only on success.
///
/// Streams through a temporary `x.log.gz.tmp` so a crash never leaves a
/// truncated `.gz` next to a deleted original.
pub fn compress_file(path: &Path) -> Result<PathBuf> {
    let gz_path = gz_path_for(path);
    let temp_gz_path = PathBuf::from(format!("{}.tmp", gz_path.display()));

    let input = File::open(path).map_err(|e| {
        LoggerError::compression(path.display().to_string(), format!("cannot open: {}", e))
    })?;
    let mut reader = BufReader::with_capacity(64 * 1024, input);

    let output = File::create(&temp_gz_path).map_err(|e| {
        LoggerError::compression(
            temp_gz_path.display().to_string(),
            format!("cannot create: {}", e),
        )
    })?;
    let mut encoder = flate2::write::GzEncoder::new(
        BufWriter::with_capacity(64 * 1024, output),
        flate2::Compression::default(),
    );

    let streamed = (|| -> std::io::Result<()> {
        let mut buffer = vec![0u8; 64 * 1024];
        loop {
            let bytes_read = reader.read(&mut buffer)?;
            if bytes_read == 0 {
                break;
            }
            encoder.write_all(&buffer[..bytes_read])?;
        }
        encoder.finish()?.flush()
    })();

    if let Err(e) = streamed {
        let _ = fs::remove_file(&temp_gz_path);
        return Err(LoggerError::compression(
            path.display().to_string(),
            e.to_string(),
        ));
    }

    fs::rename(&temp_gz_path, &gz_path).map_err(|e| {
        let _ = fs::remove_file(&temp_gz_path);
        LoggerError::compression(
            gz_path.display().to_string(),
            format!("cannot move into place: {}", e),
        )
    })?;

    if let Err(e) = fs::remove_file(path) {
        // Both copies exist now; retention removes them together
        eprintln!(
            "[LOGGER WARNING] Compressed {} but could not remove it: {}",
            path.display(),
            e
        );
    }

    Ok(gz_path)
}

pub(crate) fn gz_path_for(path: &Path) -> PathBuf {
    PathBuf::from(format!("{}.gz", path.display()))
}
