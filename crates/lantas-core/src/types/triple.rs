use serde::{Deserialize, Serialize};

use crate::labels::BioLabel;

/// One labeled token of the output dataset.
///
/// Field names serialize to the dataset column headers
/// `Data ID`, `Token` and `Label`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenLabel {
    /// Identifier of the source row.
    #[serde(rename = "Data ID")]
    pub row_id: i64,

    /// Whitespace-delimited token text.
    #[serde(rename = "Token")]
    pub token: String,

    #[serde(rename = "Label")]
    pub label: BioLabel,
}

impl TokenLabel {
    /// Creates a new triple.
    #[must_use]
    pub fn new(row_id: i64, token: impl Into<String>, label: BioLabel) -> Self {
        Self {
            row_id,
            token: token.into(),
            label,
        }
    }
}
