//! Rolling File Logger
//!
//! Installs a `tracing` subscriber that writes to `<app_name>.log` inside a
//! log directory. Once the file passes a size limit it is moved aside to
//! `<app_name>.log.1` and a fresh file is started. The most recent lines are
//! also kept in a circular buffer so the app can show them without touching
//! the filesystem.

use std::collections::VecDeque;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use parking_lot::{Mutex, MutexGuard};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Size after which the active log file is rotated
pub const DEFAULT_MAX_BYTES: u64 = 1024 * 1024;

/// Lines retained in memory
pub const DEFAULT_TAIL_LINES: usize = 500;

#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    #[error("log file error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("a global logger is already installed")]
    AlreadyInitialized,
    #[error("logger has not been initialized")]
    NotInitialized,
}

/// Size-rotated log file plus an in-memory tail of recent lines
pub struct RollingFile {
    path: PathBuf,
    backup_path: PathBuf,
    max_bytes: u64,
    file: File,
    written: u64,
    tail: VecDeque<String>,
    tail_capacity: usize,
}

impl RollingFile {
    pub fn open(
        dir: impl AsRef<Path>,
        app_name: &str,
        max_bytes: u64,
        tail_capacity: usize,
    ) -> Result<Self, LoggerError> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).map_err(|source| LoggerError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let path = dir.join(format!("{}.log", app_name));
        let backup_path = dir.join(format!("{}.log.1", app_name));
        let file = open_append(&path)?;
        let written = file.metadata().map(|m| m.len()).unwrap_or(0);

        Ok(Self {
            path,
            backup_path,
            max_bytes,
            file,
            written,
            tail: VecDeque::with_capacity(tail_capacity),
            tail_capacity,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn backup_path(&self) -> &Path {
        &self.backup_path
    }

    /// Most recent lines, oldest first
    pub fn recent_lines(&self) -> Vec<String> {
        self.tail.iter().cloned().collect()
    }

    fn rotate(&mut self) -> io::Result<()> {
        self.file.flush()?;
        if self.backup_path.exists() {
            fs::remove_file(&self.backup_path)?;
        }
        fs::rename(&self.path, &self.backup_path)?;
        self.file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        self.written = 0;
        Ok(())
    }

    fn remember(&mut self, buf: &[u8]) {
        if self.tail_capacity == 0 {
            return;
        }
        let text = String::from_utf8_lossy(buf);
        for line in text.lines().filter(|l| !l.trim().is_empty()) {
            if self.tail.len() == self.tail_capacity {
                self.tail.pop_front();
            }
            self.tail.push_back(line.to_string());
        }
    }
}

impl Write for RollingFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.written > 0 && self.written + buf.len() as u64 > self.max_bytes {
            self.rotate()?;
        }
        self.file.write_all(buf)?;
        self.written += buf.len() as u64;
        self.remember(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

fn open_append(path: &Path) -> Result<File, LoggerError> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| LoggerError::Io {
            path: path.to_path_buf(),
            source,
        })
}

/// Cloneable handle handed to the fmt layer
#[derive(Clone)]
pub struct SharedWriter(Arc<Mutex<RollingFile>>);

impl SharedWriter {
    pub fn new(file: RollingFile) -> Self {
        Self(Arc::new(Mutex::new(file)))
    }

    fn lock(&self) -> MutexGuard<'_, RollingFile> {
        self.0.lock()
    }

    pub fn recent_lines(&self) -> Vec<String> {
        self.lock().recent_lines()
    }
}

impl Write for SharedWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.lock().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.lock().flush()
    }
}

impl<'a> MakeWriter<'a> for SharedWriter {
    type Writer = SharedWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

static SINK: OnceLock<SharedWriter> = OnceLock::new();

/// Install the global subscriber writing to `<log_dir>/<app_name>.log`.
///
/// The filter comes from `RUST_LOG` and defaults to `info`.
pub fn init_logger(log_dir: impl AsRef<Path>, app_name: &str) -> Result<(), LoggerError> {
    if SINK.get().is_some() {
        return Err(LoggerError::AlreadyInitialized);
    }

    let writer = SharedWriter::new(RollingFile::open(
        log_dir,
        app_name,
        DEFAULT_MAX_BYTES,
        DEFAULT_TAIL_LINES,
    )?);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer.clone()),
        )
        .try_init()
        .map_err(|_| LoggerError::AlreadyInitialized)?;

    SINK.set(writer).map_err(|_| LoggerError::AlreadyInitialized)
}

/// Lines captured since `init_logger`, oldest first
pub fn recent_lines() -> Vec<String> {
    SINK.get().map(SharedWriter::recent_lines).unwrap_or_default()
}

pub fn info(msg: &str) -> Result<(), LoggerError> {
    SINK.get().ok_or(LoggerError::NotInitialized)?;
    tracing::info!(target: "app", "{}", msg);
    Ok(())
}

pub fn error(msg: &str) -> Result<(), LoggerError> {
    SINK.get().ok_or(LoggerError::NotInitialized)?;
    tracing::error!(target: "app", "{}", msg);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writes_and_keeps_tail() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = RollingFile::open(dir.path(), "Clarity", DEFAULT_MAX_BYTES, 2).unwrap();

        file.write_all(b"first\nsecond\n").unwrap();
        file.write_all(b"third\n").unwrap();
        file.flush().unwrap();

        assert_eq!(file.recent_lines(), vec!["second".to_string(), "third".to_string()]);
        let on_disk = fs::read_to_string(file.path()).unwrap();
        assert_eq!(on_disk, "first\nsecond\nthird\n");
    }

    #[test]
    fn test_rotates_past_size_limit() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = RollingFile::open(dir.path(), "Clarity", 10, 10).unwrap();

        file.write_all(b"0123456789").unwrap();
        file.write_all(b"abc\n").unwrap();
        file.flush().unwrap();

        assert_eq!(fs::read_to_string(file.backup_path()).unwrap(), "0123456789");
        assert_eq!(fs::read_to_string(file.path()).unwrap(), "abc\n");
    }

    #[test]
    fn test_reopen_appends() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut file = RollingFile::open(dir.path(), "Clarity", DEFAULT_MAX_BYTES, 4).unwrap();
            file.write_all(b"one\n").unwrap();
        }
        let mut file = RollingFile::open(dir.path(), "Clarity", DEFAULT_MAX_BYTES, 4).unwrap();
        file.write_all(b"two\n").unwrap();
        file.flush().unwrap();

        assert_eq!(fs::read_to_string(file.path()).unwrap(), "one\ntwo\n");
    }

    #[test]
    fn test_shared_writer_clones_share_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let writer = SharedWriter::new(RollingFile::open(dir.path(), "Clarity", DEFAULT_MAX_BYTES, 4).unwrap());
        let mut a = writer.make_writer();
        let mut b = writer.clone();

        a.write_all(b"from a\n").unwrap();
        b.write_all(b"from b\n").unwrap();
        b.flush().unwrap();

        assert_eq!(writer.recent_lines(), vec!["from a", "from b"]);
        let on_disk = fs::read_to_string(dir.path().join("Clarity.log")).unwrap();
        assert_eq!(on_disk, "from a\nfrom b\n");
    }

    #[test]
    fn test_helpers_require_init() {
        if SINK.get().is_none() {
            assert!(matches!(info("hello"), Err(LoggerError::NotInitialized)));
        }
    }
}
