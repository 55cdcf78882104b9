//! # Dataset Writer
//!
//! Writes token/label triples as CSV files with the columns
//! `Data ID`, `Token` and `Label`. Every write creates a new file.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::info;

use lantas_core::TokenLabel;

use crate::error::Result;

const HEADER: [&str; 3] = ["Data ID", "Token", "Label"];

/// Which stage of a run produced an output file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    /// Rows completed since the previous checkpoint.
    Chunk,
    /// Every row of the run, written once at the end.
    Final,
    /// Stand-alone conversion outside an annotation run.
    Single,
}

impl OutputKind {
    /// File name prefix, without the separating underscore.
    pub fn prefix(&self) -> Option<&'static str> {
        match self {
            OutputKind::Chunk => Some("chunk"),
            OutputKind::Final => Some("final"),
            OutputKind::Single => None,
        }
    }
}

/// Writes timestamped dataset files into a directory.
#[derive(Debug, Clone)]
pub struct DatasetWriter {
    output_dir: PathBuf,
    stem: String,
}

impl DatasetWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            stem: "annotated_data".to_string(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Write `triples` to a new file and return its path.
    ///
    /// The name is `[<prefix>_]annotated_data_<YYYYmmdd_HHMMSS>.csv`. Files
    /// are created exclusively; when the name is taken a `_<n>` suffix is
    /// added, so earlier outputs are never overwritten.
    pub fn write(&self, triples: &[TokenLabel], kind: OutputKind) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.output_dir)?;

        let timestamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
        let (path, file) = self.create_unique(kind, &timestamp)?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        writer.write_record(HEADER)?;
        for triple in triples {
            writer.serialize(triple)?;
        }
        writer.flush()?;

        info!(
            path = %path.display(),
            triples = triples.len(),
            "wrote {} dataset",
            kind.prefix().unwrap_or("single-shot")
        );
        Ok(path)
    }

    fn create_unique(&self, kind: OutputKind, timestamp: &str) -> Result<(PathBuf, File)> {
        let base = match kind.prefix() {
            Some(prefix) => format!("{prefix}_{}_{timestamp}", self.stem),
            None => format!("{}_{timestamp}", self.stem),
        };

        let mut n = 0usize;
        loop {
            let name = if n == 0 {
                format!("{base}.csv")
            } else {
                format!("{base}_{n}.csv")
            };
            let path = self.output_dir.join(name);
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => return Ok((path, file)),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => n += 1,
                Err(e) => return Err(e.into()),
            }
        }
    }
}
