use serde::{Deserialize, Serialize};

use crate::error::{LantasError, Result};

/// Value stored in place of tagged text when annotation was exhausted.
pub const ERROR_MARKER: &str = "ERROR";

/// Processing state of a row, derived from its tagged text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RowStatus {
    /// No outcome yet.
    Pending,
    /// The annotation service returned tagged text.
    Tagged,
    /// Every annotation attempt failed.
    Errored,
}

/// A source post and its annotation outcome.
///
/// Field names serialize to the progress snapshot columns
/// `index`, `full_text` and `tagged_full_text`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    /// Unique row identifier from the source corpus.
    #[serde(rename = "index")]
    pub row_id: i64,

    /// Original post text sent for annotation.
    #[serde(rename = "full_text")]
    pub source_text: String,

    /// Tagged markup, [`ERROR_MARKER`], or `None` while pending.
    #[serde(rename = "tagged_full_text")]
    pub tagged_text: Option<String>,
}

impl Row {
    /// Creates a pending row.
    #[must_use]
    pub fn new(row_id: i64, source_text: impl Into<String>) -> Self {
        Self {
            row_id,
            source_text: source_text.into(),
            tagged_text: None,
        }
    }

    /// Current processing state.
    pub fn status(&self) -> RowStatus {
        match self.tagged_text.as_deref() {
            None => RowStatus::Pending,
            Some(ERROR_MARKER) => RowStatus::Errored,
            Some(_) => RowStatus::Tagged,
        }
    }

    /// Whether the row carries an outcome (tagged or errored).
    pub fn is_processed(&self) -> bool {
        self.tagged_text.is_some()
    }

    pub fn is_errored(&self) -> bool {
        self.status() == RowStatus::Errored
    }

    /// Record tagged text for a pending row.
    ///
    /// # Errors
    ///
    /// Returns `LantasError::AlreadyProcessed` if the row already has an
    /// outcome; existing outcomes are never overwritten.
    pub fn record_tagged(&mut self, tagged_text: impl Into<String>) -> Result<()> {
        self.record(tagged_text.into())
    }

    /// Record the error marker for a pending row.
    ///
    /// # Errors
    ///
    /// Returns `LantasError::AlreadyProcessed` if the row already has an outcome.
    pub fn record_error(&mut self) -> Result<()> {
        self.record(ERROR_MARKER.to_string())
    }

    /// Drop an error marker so the row is attempted again.
    ///
    /// Tagged rows are left untouched. Returns whether the row was reset.
    pub fn reset_error(&mut self) -> bool {
        if self.is_errored() {
            self.tagged_text = None;
            true
        } else {
            false
        }
    }

    fn record(&mut self, value: String) -> Result<()> {
        if self.is_processed() {
            return Err(LantasError::AlreadyProcessed { row_id: self.row_id });
        }
        self.tagged_text = Some(value);
        Ok(())
    }
}
