//! Shared fixtures for the annotator integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use lantas_annotator::{AttemptFailure, AttemptOutcome, Annotator};
use lantas_core::Row;

type Probe = Box<dyn Fn(usize) + Send + Sync>;

/// Annotator that answers from a closure and counts its calls.
pub struct FakeAnnotator {
    respond: Box<dyn Fn(&str) -> AttemptOutcome + Send + Sync>,
    calls: AtomicUsize,
    seen: Mutex<Vec<String>>,
    probe: Option<Probe>,
}

impl FakeAnnotator {
    pub fn new(respond: impl Fn(&str) -> AttemptOutcome + Send + Sync + 'static) -> Self {
        Self {
            respond: Box::new(respond),
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
            probe: None,
        }
    }

    /// Wraps every post in a single `<PLOC>` entity.
    pub fn tagging() -> Self {
        Self::new(|text| AttemptOutcome::Completed(format!("<PLOC>{text}</PLOC>")))
    }

    /// Fails every attempt with a transport error.
    pub fn failing() -> Self {
        Self::new(|_| AttemptOutcome::Failed(AttemptFailure::Transport("connection refused".into())))
    }

    /// Run `probe` with the 1-based call number before answering.
    pub fn with_probe(mut self, probe: impl Fn(usize) + Send + Sync + 'static) -> Self {
        self.probe = Some(Box::new(probe));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Source texts received, in call order.
    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

impl Annotator for FakeAnnotator {
    async fn attempt(&self, source_text: &str) -> AttemptOutcome {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(probe) = &self.probe {
            probe(call);
        }
        self.seen.lock().unwrap().push(source_text.to_string());
        (self.respond)(source_text)
    }
}

/// `n` pending rows with ids `1..=n`, each a single-word post.
pub fn pending_rows(n: i64) -> Vec<Row> {
    (1..=n).map(|id| Row::new(id, format!("jalan{id}"))).collect()
}

/// CSV files in `dir` whose names start with `prefix`, sorted.
pub fn outputs_with_prefix(dir: &Path, prefix: &str) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with(prefix) && name.ends_with(".csv"))
        })
        .collect();
    paths.sort();
    paths
}

/// Data lines of a dataset file, without the header.
pub fn dataset_lines(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .skip(1)
        .map(str::to_string)
        .collect()
}
