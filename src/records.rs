//! Append-only CSV logs.
//!
//! A [`CsvLog`] touches the filesystem only on its first append. After that
//! every append adds rows to the end of the file; the header is written once,
//! when the file is new or empty.

use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// A row type that can be written to a CSV log
pub trait CsvRecord {
    fn csv_header() -> &'static str;
    fn to_csv_row(&self) -> String;
}

/// Errors raised by a log sink
#[derive(Debug)]
pub enum RecordError {
    Io(std::io::Error),
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordError::Io(e) => write!(f, "log write failed: {}", e),
        }
    }
}

impl std::error::Error for RecordError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RecordError::Io(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for RecordError {
    fn from(e: std::io::Error) -> Self {
        RecordError::Io(e)
    }
}

/// One genome's result in a NEAT generation
#[derive(Clone, Debug, PartialEq)]
pub struct GenomeRecord {
    pub generation: usize,
    pub genome_id: usize,
    pub fitness: f32,
}

impl CsvRecord for GenomeRecord {
    fn csv_header() -> &'static str {
        "generation,genome_id,fitness"
    }

    fn to_csv_row(&self) -> String {
        format!("{},{},{:.2}", self.generation, self.genome_id, self.fitness)
    }
}

/// Lazily created, append-only CSV file
#[derive(Debug, Clone)]
pub struct CsvLog {
    path: PathBuf,
    rows_written: usize,
}

impl CsvLog {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            rows_written: 0,
        }
    }

    /// Log at `dir/file`
    pub fn in_dir<P: AsRef<Path>>(dir: P, file: &str) -> Self {
        Self::new(dir.as_ref().join(file))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rows appended through this handle
    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    /// Append rows, creating the file and its header if needed
    pub fn append<R: CsvRecord>(&mut self, rows: &[R]) -> Result<(), RecordError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        if file.metadata()?.len() == 0 {
            writeln!(file, "{}", R::csv_header())?;
        }
        for row in rows {
            writeln!(file, "{}", row.to_csv_row())?;
        }
        file.flush()?;

        self.rows_written += rows.len();
        Ok(())
    }

    /// Append rows; failures are logged and swallowed
    pub fn append_or_warn<R: CsvRecord>(&mut self, rows: &[R]) {
        if let Err(e) = self.append(rows) {
            log::warn!("{}: {}", self.path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("flappy_evo_{}_{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    fn record(generation: usize, genome_id: usize, fitness: f32) -> GenomeRecord {
        GenomeRecord {
            generation,
            genome_id,
            fitness,
        }
    }

    #[test]
    fn test_lazy_creation() {
        let dir = temp_dir("lazy");
        let log = CsvLog::in_dir(&dir, "NEAT.csv");
        assert!(!dir.exists());
        assert_eq!(log.rows_written(), 0);
    }

    #[test]
    fn test_append_keeps_rows() {
        let dir = temp_dir("append");
        let mut log = CsvLog::in_dir(&dir, "NEAT.csv");
        log.append(&[record(0, 0, 1.5), record(0, 1, 2.0)]).unwrap();
        log.append(&[record(1, 0, 3.25)]).unwrap();

        // A second handle keeps appending instead of clobbering
        let mut again = CsvLog::new(log.path());
        again.append(&[record(2, 0, 4.0)]).unwrap();

        let contents = fs::read_to_string(log.path()).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(
            lines,
            vec![
                "generation,genome_id,fitness",
                "0,0,1.50",
                "0,1,2.00",
                "1,0,3.25",
                "2,0,4.00"
            ]
        );
        assert_eq!(log.rows_written(), 3);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_failure_is_reported() {
        let dir = temp_dir("blocked");
        fs::create_dir_all(&dir).unwrap();
        // A directory where the file should be
        let blocked = dir.join("taken.csv");
        fs::create_dir_all(&blocked).unwrap();
        let mut log = CsvLog::new(&blocked);
        assert!(log.append(&[record(0, 0, 0.0)]).is_err());
        log.append_or_warn(&[record(0, 0, 0.0)]);
        assert_eq!(log.rows_written(), 0);
        let _ = fs::remove_dir_all(&dir);
    }
}
