//! Rotating JSON Lines writer
//!
//! Files are named `telemetry_<UTC timestamp>_<sequence>.jsonl`, so a plain
//! name sort is also a chronological sort.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::Result;

const FILE_PREFIX: &str = "telemetry_";
const FILE_SUFFIX: &str = ".jsonl";

#[derive(Debug)]
pub struct TelemetryLogger {
    dir: PathBuf,
    max_records_per_file: usize,
    max_files_to_keep: usize,
    writer: BufWriter<File>,
    current_path: PathBuf,
    records_in_file: usize,
    sequence: u32,
}

impl TelemetryLogger {
    /// Create the log directory if needed and open the first file
    ///
    /// # Errors
    ///
    /// Returns `Io` if the directory or file cannot be created
    pub fn new<P: AsRef<Path>>(dir: P, max_records_per_file: usize, max_files_to_keep: usize) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;

        let (current_path, writer) = open_log_file(&dir, 0)?;
        info!("Telemetry logging to {}", current_path.display());

        let logger = Self {
            dir,
            max_records_per_file: max_records_per_file.max(1),
            max_files_to_keep: max_files_to_keep.max(1),
            writer,
            current_path,
            records_in_file: 0,
            sequence: 0,
        };
        logger.prune()?;
        Ok(logger)
    }

    pub fn current_path(&self) -> &Path {
        &self.current_path
    }

    /// Append one record as a single JSON line, rotating first if the
    /// current file is full
    pub fn log<T: Serialize>(&mut self, record: &T) -> Result<()> {
        if self.records_in_file >= self.max_records_per_file {
            self.rotate()?;
        }

        serde_json::to_writer(&mut self.writer, record).map_err(io::Error::from)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        self.records_in_file += 1;
        Ok(())
    }

    fn rotate(&mut self) -> Result<()> {
        self.writer.flush()?;
        self.sequence += 1;

        let (path, writer) = open_log_file(&self.dir, self.sequence)?;
        debug!("Rotated telemetry log to {}", path.display());
        self.writer = writer;
        self.current_path = path;
        self.records_in_file = 0;

        self.prune()
    }

    /// Delete the oldest log files beyond `max_files_to_keep`
    fn prune(&self) -> Result<()> {
        let mut files = list_log_files(&self.dir)?;
        if files.len() <= self.max_files_to_keep {
            return Ok(());
        }

        files.sort();
        let excess = files.len() - self.max_files_to_keep;
        for path in files.into_iter().take(excess) {
            if let Err(e) = fs::remove_file(&path) {
                warn!("Failed to remove old telemetry log {}: {}", path.display(), e);
            }
        }
        Ok(())
    }
}

fn open_log_file(dir: &Path, sequence: u32) -> Result<(PathBuf, BufWriter<File>)> {
    let name = format!(
        "{}{}_{:04}{}",
        FILE_PREFIX,
        Utc::now().format("%Y%m%dT%H%M%S"),
        sequence,
        FILE_SUFFIX
    );
    let path = dir.join(name);
    let file = File::create(&path)?;
    Ok((path, BufWriter::new(file)))
}

fn list_log_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_log = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.starts_with(FILE_PREFIX) && n.ends_with(FILE_SUFFIX))
            .unwrap_or(false);
        if is_log {
            files.push(path);
        }
    }
    Ok(files)
}
