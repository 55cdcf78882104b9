//! # Progress Store
//!
//! Durable per-row annotation state. The snapshot is a CSV with columns
//! `index`, `full_text` and `tagged_full_text`; an empty tagged cell means
//! the row is still pending.

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use lantas_core::Row;

use crate::error::Result;

/// Reads and overwrites the progress snapshot file.
#[derive(Debug, Clone)]
pub struct ProgressStore {
    path: PathBuf,
}

impl ProgressStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the snapshot, or `None` when no snapshot exists yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(&self) -> Result<Option<Vec<Row>>> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "no progress snapshot found");
            return Ok(None);
        }

        let mut reader = csv::Reader::from_path(&self.path)?;
        let rows = reader.deserialize().collect::<std::result::Result<Vec<Row>, _>>()?;
        debug!(path = %self.path.display(), rows = rows.len(), "loaded progress snapshot");
        Ok(Some(rows))
    }

    /// Overwrite the snapshot with `rows`.
    ///
    /// The data is flushed and synced to disk before this returns. The file
    /// is truncated in place rather than replaced by rename, so a save that
    /// fails partway (disk full, I/O error) leaves a truncated snapshot and
    /// the previous checkpoint is lost.
    pub fn save(&self, rows: &[Row]) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let mut writer = csv::Writer::from_writer(File::create(&self.path)?);
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
        let file = writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;

        debug!(path = %self.path.display(), rows = rows.len(), "saved progress snapshot");
        Ok(())
    }

    /// Load the snapshot and merge it with freshly loaded source rows.
    ///
    /// See [`merge_resume`] for the merge rule.
    pub fn resume(&self, source: Vec<Row>, retry_errors: bool) -> Result<Vec<Row>> {
        let snapshot = self.load()?;
        let resumed = snapshot.is_some();
        let rows = merge_resume(source, snapshot, retry_errors);

        let processed = rows.iter().filter(|row| row.is_processed()).count();
        if resumed {
            info!(
                total = rows.len(),
                processed,
                pending = rows.len() - processed,
                "resuming from {}",
                self.path.display()
            );
        } else {
            info!(total = rows.len(), "starting fresh run");
        }
        Ok(rows)
    }
}

/// Build the working set from the source rows and an optional snapshot.
///
/// Source rows whose id already has an outcome in the snapshot take the
/// snapshot's row; every other source row is pending. Processed snapshot
/// rows missing from the source are appended in snapshot order, so a
/// checkpointed outcome is never dropped. When the snapshot already covers
/// every source id, the snapshot itself is the working set. With
/// `retry_errors`, rows carrying the error marker become pending again.
pub fn merge_resume(source: Vec<Row>, snapshot: Option<Vec<Row>>, retry_errors: bool) -> Vec<Row> {
    let mut rows = match snapshot {
        None => source,
        Some(snapshot) => {
            let known: HashSet<i64> = snapshot.iter().map(|row| row.row_id).collect();
            if source.iter().all(|row| known.contains(&row.row_id)) {
                snapshot
            } else {
                let source_ids: HashSet<i64> = source.iter().map(|row| row.row_id).collect();
                let (carried, processed): (Vec<Row>, Vec<Row>) = snapshot
                    .into_iter()
                    .filter(Row::is_processed)
                    .partition(|row| !source_ids.contains(&row.row_id));
                let mut processed: HashMap<i64, Row> =
                    processed.into_iter().map(|row| (row.row_id, row)).collect();

                let mut rows: Vec<Row> = source
                    .into_iter()
                    .map(|row| processed.remove(&row.row_id).unwrap_or(row))
                    .collect();
                if !carried.is_empty() {
                    debug!(rows = carried.len(), "keeping processed rows outside the current selection");
                }
                rows.extend(carried);
                rows
            }
        }
    };

    if retry_errors {
        let reset = rows.iter_mut().map(Row::reset_error).filter(|&reset| reset).count();
        if reset > 0 {
            info!(rows = reset, "re-queued rows marked as ERROR");
        }
    }

    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use lantas_core::{ERROR_MARKER, RowStatus};

    fn tagged(id: i64, text: &str, tagged: &str) -> Row {
        let mut row = Row::new(id, text);
        row.record_tagged(tagged).unwrap();
        row
    }

    fn errored(id: i64, text: &str) -> Row {
        let mut row = Row::new(id, text);
        row.record_error().unwrap();
        row
    }

    #[test]
    fn test_load_missing_is_fresh_run() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProgressStore::new(dir.path().join("progress.csv"));
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProgressStore::new(dir.path().join("nested").join("progress.csv"));
        let rows = vec![
            tagged(1, "macet, parah \"banget\"", "<COND>macet</COND>, parah \"banget\""),
            errored(2, "banjir"),
            Row::new(3, "lancar\njaya"),
        ];

        store.save(&rows).unwrap();
        let loaded = store.load().unwrap().unwrap();

        assert_eq!(loaded, rows);
        assert_eq!(loaded[1].status(), RowStatus::Errored);
        assert_eq!(loaded[2].status(), RowStatus::Pending);
    }

    #[test]
    fn test_save_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProgressStore::new(dir.path().join("progress.csv"));
        store
            .save(&[Row::new(1, "a"), Row::new(2, "b"), Row::new(3, "c")])
            .unwrap();
        store.save(&[Row::new(9, "z")]).unwrap();

        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded, vec![Row::new(9, "z")]);
    }

    #[test]
    fn test_snapshot_header() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProgressStore::new(dir.path().join("progress.csv"));
        store.save(&[errored(4, "x")]).unwrap();

        let contents = std::fs::read_to_string(store.path()).unwrap();
        let mut lines = contents.lines();
        assert_eq!(lines.next(), Some("index,full_text,tagged_full_text"));
        assert_eq!(lines.next(), Some(format!("4,x,{ERROR_MARKER}").as_str()));
    }

    #[test]
    fn test_merge_without_snapshot() {
        let source = vec![Row::new(1, "a"), Row::new(2, "b")];
        assert_eq!(merge_resume(source.clone(), None, false), source);
    }

    #[test]
    fn test_merge_keeps_processed_rows() {
        let source = vec![Row::new(1, "a"), Row::new(2, "b"), Row::new(3, "c")];
        let snapshot = vec![tagged(1, "a", "<PLOC>a</PLOC>"), errored(2, "b")];

        let rows = merge_resume(source, Some(snapshot), false);

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].tagged_text.as_deref(), Some("<PLOC>a</PLOC>"));
        assert_eq!(rows[1].status(), RowStatus::Errored);
        assert_eq!(rows[2].status(), RowStatus::Pending);
    }

    #[test]
    fn test_merge_pending_snapshot_rows_take_fresh_source() {
        let source = vec![Row::new(1, "fresh text"), Row::new(2, "b")];
        let snapshot = vec![Row::new(1, "stale text")];

        let rows = merge_resume(source, Some(snapshot), false);
        assert_eq!(rows[0].source_text, "fresh text");
    }

    #[test]
    fn test_merge_full_coverage_uses_snapshot() {
        let source = vec![Row::new(2, "b")];
        let snapshot = vec![tagged(1, "a", "a"), Row::new(2, "b"), tagged(3, "c", "c")];

        let rows = merge_resume(source, Some(snapshot.clone()), false);
        assert_eq!(rows, snapshot);
    }

    #[test]
    fn test_merge_keeps_processed_rows_outside_selection() {
        let source = vec![Row::new(2, "b"), Row::new(3, "c")];
        let snapshot = vec![
            tagged(1, "a", "<PLOC>a</PLOC>"),
            tagged(2, "b", "<COND>b</COND>"),
            Row::new(4, "d"),
        ];

        let rows = merge_resume(source, Some(snapshot), false);
        let ids: Vec<i64> = rows.iter().map(|r| r.row_id).collect();

        assert_eq!(ids, vec![2, 3, 1]);
        assert_eq!(rows[0].tagged_text.as_deref(), Some("<COND>b</COND>"));
        assert_eq!(rows[1].status(), RowStatus::Pending);
        assert_eq!(rows[2].tagged_text.as_deref(), Some("<PLOC>a</PLOC>"));
    }

    #[test]
    fn test_resume_with_retry_errors() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProgressStore::new(dir.path().join("progress.csv"));
        store
            .save(&[errored(1, "a"), tagged(2, "b", "b")])
            .unwrap();

        let rows = store
            .resume(vec![Row::new(1, "a"), Row::new(2, "b")], true)
            .unwrap();
        assert_eq!(rows[0].status(), RowStatus::Pending);
        assert_eq!(rows[1].status(), RowStatus::Tagged);

        let rows = store
            .resume(vec![Row::new(1, "a"), Row::new(2, "b")], false)
            .unwrap();
        assert_eq!(rows[0].status(), RowStatus::Errored);
    }

    #[test]
    fn test_merge_retry_errors() {
        let source = vec![Row::new(1, "a"), Row::new(2, "b")];
        let snapshot = vec![errored(1, "a"), tagged(2, "b", "b")];

        let rows = merge_resume(source, Some(snapshot), true);
        assert_eq!(rows[0].status(), RowStatus::Pending);
        assert_eq!(rows[1].status(), RowStatus::Tagged);
    }
}
