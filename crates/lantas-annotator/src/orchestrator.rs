//! # Batch Orchestrator
//!
//! Drives a run: annotates pending rows one at a time, checkpoints after
//! every `chunk_size` newly processed rows, and writes a final snapshot and
//! dataset when the run ends, whether or not it ended cleanly.

use std::collections::BTreeSet;
use std::path::PathBuf;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{error, info};

use lantas_core::{Row, RowStatus, TagConverter};

use crate::client::{Annotator, RetryPolicy, TaggedResult, annotate};
use crate::config::DEFAULT_CHUNK_SIZE;
use crate::dataset::{DatasetWriter, OutputKind};
use crate::error::Result;
use crate::progress::ProgressStore;

/// In-memory state of every row in a run.
///
/// Only the orchestrator mutates it; collaborators see read-only slices.
#[derive(Debug, Clone, Default)]
pub struct RowTable {
    rows: Vec<Row>,
}

impl RowTable {
    pub fn new(rows: Vec<Row>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Positions of rows without an outcome, in table order.
    pub fn pending(&self) -> Vec<usize> {
        self.rows
            .iter()
            .enumerate()
            .filter(|(_, row)| !row.is_processed())
            .map(|(i, _)| i)
            .collect()
    }

    /// Count rows per status.
    pub fn counts(&self) -> StatusCounts {
        let mut counts = StatusCounts::default();
        for row in &self.rows {
            match row.status() {
                RowStatus::Pending => counts.pending += 1,
                RowStatus::Tagged => counts.tagged += 1,
                RowStatus::Errored => counts.errored += 1,
            }
        }
        counts
    }

    fn record(&mut self, position: usize, result: TaggedResult) -> Result<RowStatus> {
        let row = &mut self.rows[position];
        match result {
            TaggedResult::Success(text) => row.record_tagged(text)?,
            TaggedResult::Failure { .. } => row.record_error()?,
        }
        Ok(row.status())
    }
}

/// Number of rows in each processing state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub pending: usize,
    pub tagged: usize,
    pub errored: usize,
}

/// What a run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub total_rows: usize,
    /// Rows that already had an outcome when the run started.
    pub skipped: usize,
    /// Rows sent to the annotator during this run.
    pub attempted: usize,
    pub tagged: usize,
    pub errored: usize,
    pub chunk_outputs: Vec<PathBuf>,
    pub final_output: Option<PathBuf>,
    /// Triples in the final dataset.
    pub final_triples: usize,
    /// Entity names emitted by the model that are not in the closed tag set.
    pub unknown_tags: BTreeSet<String>,
}

/// Runs the resumable annotation pipeline over a row table.
pub struct Orchestrator<A> {
    annotator: A,
    policy: RetryPolicy,
    store: ProgressStore,
    writer: DatasetWriter,
    converter: TagConverter,
    chunk_size: usize,
    progress: ProgressBar,
}

impl<A: Annotator> Orchestrator<A> {
    /// Create an orchestrator with the default retry policy and chunk size.
    pub fn new(annotator: A, store: ProgressStore, writer: DatasetWriter) -> Self {
        Self {
            annotator,
            policy: RetryPolicy::default(),
            store,
            writer,
            converter: TagConverter::new(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            progress: ProgressBar::hidden(),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set the checkpoint interval; values below one are raised to one.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Show a progress bar on the terminal while rows are processed.
    pub fn with_progress_bar(mut self) -> Self {
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec}) {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");
        self.progress = ProgressBar::new(0).with_style(style);
        self
    }

    pub fn annotator(&self) -> &A {
        &self.annotator
    }

    /// Annotate every pending row of `rows` and write checkpoints.
    ///
    /// Rows that already carry an outcome are not sent to the annotator.
    /// Row-level failures are recorded as data. If a checkpoint fails, no
    /// further rows are attempted, a final snapshot and dataset are still
    /// attempted, and the checkpoint error is returned.
    pub async fn run(&self, rows: Vec<Row>) -> Result<RunSummary> {
        let mut table = RowTable::new(rows);
        let pending = table.pending();

        let mut summary = RunSummary {
            total_rows: table.len(),
            skipped: table.len() - pending.len(),
            ..RunSummary::default()
        };
        info!(
            total = summary.total_rows,
            pending = pending.len(),
            skipped = summary.skipped,
            chunk_size = self.chunk_size,
            "starting annotation run"
        );

        self.progress.set_length(pending.len() as u64);
        let outcome = self.process(&mut table, &pending, &mut summary).await;
        self.progress.finish_and_clear();

        if let Err(e) = &outcome {
            error!(error = %e, details = ?e, "annotation run aborted; writing final checkpoint");
        }
        let finalized = self.finalize(&table, &mut summary);

        match (outcome, finalized) {
            (Ok(()), Ok(())) => {
                info!(
                    attempted = summary.attempted,
                    tagged = summary.tagged,
                    errored = summary.errored,
                    skipped = summary.skipped,
                    triples = summary.final_triples,
                    "annotation run complete"
                );
                Ok(summary)
            }
            (Err(e), finalized) => {
                if let Err(final_error) = finalized {
                    error!(error = %final_error, "final checkpoint failed");
                }
                Err(e)
            }
            (Ok(()), Err(e)) => {
                error!(error = %e, "final checkpoint failed");
                Err(e)
            }
        }
    }

    async fn process(
        &self,
        table: &mut RowTable,
        pending: &[usize],
        summary: &mut RunSummary,
    ) -> Result<()> {
        let mut chunk = Vec::with_capacity(self.chunk_size);

        for &position in pending {
            let row = &table.rows()[position];
            let row_id = row.row_id;
            let result = annotate(&self.annotator, &self.policy, row_id, &row.source_text).await;

            summary.attempted += 1;
            match table.record(position, result)? {
                RowStatus::Tagged => summary.tagged += 1,
                RowStatus::Errored => summary.errored += 1,
                RowStatus::Pending => {}
            }
            self.progress.inc(1);

            chunk.push(position);
            if chunk.len() >= self.chunk_size {
                self.checkpoint(table, &chunk, summary)?;
                chunk.clear();
            }
        }

        Ok(())
    }

    /// Save the full table and write the rows completed since the last checkpoint.
    fn checkpoint(&self, table: &RowTable, chunk: &[usize], summary: &mut RunSummary) -> Result<()> {
        self.store.save(table.rows())?;

        let rows = chunk.iter().map(|&position| &table.rows()[position]);
        let triples = self.converter.convert_rows(rows);
        let path = self.writer.write(&triples, OutputKind::Chunk)?;

        info!(rows = chunk.len(), path = %path.display(), "checkpoint written");
        summary.chunk_outputs.push(path);
        Ok(())
    }

    /// Save the full table and write the whole-corpus dataset.
    fn finalize(&self, table: &RowTable, summary: &mut RunSummary) -> Result<()> {
        self.store.save(table.rows())?;

        let triples = self.converter.convert_rows(table.rows());
        summary.unknown_tags = triples
            .iter()
            .filter(|t| t.label.entity_tag().is_none())
            .filter_map(|t| t.label.entity().map(str::to_string))
            .collect();
        if !summary.unknown_tags.is_empty() {
            info!(tags = ?summary.unknown_tags, "model emitted tags outside the entity set");
        }

        let path = self.writer.write(&triples, OutputKind::Final)?;
        summary.final_triples = triples.len();
        summary.final_output = Some(path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_table_pending_and_counts() {
        let mut tagged = Row::new(1, "a");
        tagged.record_tagged("<PLOC>a</PLOC>").unwrap();
        let mut errored = Row::new(2, "b");
        errored.record_error().unwrap();

        let table = RowTable::new(vec![tagged, Row::new(3, "c"), errored, Row::new(4, "d")]);

        assert_eq!(table.pending(), vec![1, 3]);
        assert_eq!(
            table.counts(),
            StatusCounts {
                pending: 2,
                tagged: 1,
                errored: 1
            }
        );
    }

    #[test]
    fn test_record_refuses_processed_rows() {
        let mut table = RowTable::new(vec![Row::new(1, "a")]);
        assert_eq!(
            table.record(0, TaggedResult::Failure { attempts: 3 }).unwrap(),
            RowStatus::Errored
        );
        assert!(table.record(0, TaggedResult::Success("a".into())).is_err());
    }
}
