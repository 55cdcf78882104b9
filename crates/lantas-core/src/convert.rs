//! # Tag-to-Token Conversion
//!
//! Turns a row's tagged markup into ordered `(row id, token, BIO label)`
//! triples. Conversion is a pure function of its input: converting the same
//! text twice yields the same triples.

use tracing::warn;

use crate::error::Result;
use crate::labels::BioLabel;
use crate::markup::{MarkupTokenizer, SegmentKind};
use crate::types::{ERROR_MARKER, Row, TokenLabel};

/// Converts tagged rows into token/label triples.
#[derive(Debug, Clone, Default)]
pub struct TagConverter {
    tokenizer: MarkupTokenizer,
}

impl TagConverter {
    /// Create a new converter.
    pub fn new() -> Self {
        Self {
            tokenizer: MarkupTokenizer::new(),
        }
    }

    /// Convert one row's tagged text, absorbing every failure.
    ///
    /// Absent, empty and `ERROR` values are skipped with a warning. Markup
    /// that fails to parse is logged with the row id. Both cases yield no
    /// triples for the row.
    pub fn convert(&self, row_id: i64, tagged_text: Option<&str>) -> Vec<TokenLabel> {
        let markup = match tagged_text.map(str::trim) {
            None | Some("") => {
                warn!(row_id, "skipping row without tagged text");
                return Vec::new();
            }
            Some(ERROR_MARKER) => {
                warn!(row_id, "skipping row whose annotation failed");
                return Vec::new();
            }
            Some(markup) => markup,
        };

        match self.try_convert(row_id, markup) {
            Ok(triples) => triples,
            Err(e) => {
                warn!(row_id, error = %e, "skipping row with unparseable markup");
                Vec::new()
            }
        }
    }

    /// Convert tagged markup, returning the parse error instead of logging it.
    ///
    /// # Examples
    /// ```
    /// use lantas_core::TagConverter;
    ///
    /// let triples = TagConverter::new()
    ///     .try_convert(1, "<PLOC>Jalan Sudirman</PLOC> macet")
    ///     .unwrap();
    /// let labels: Vec<String> = triples.iter().map(|t| t.label.to_string()).collect();
    /// assert_eq!(labels, ["B-PLOC", "I-PLOC", "O"]);
    /// ```
    pub fn try_convert(&self, row_id: i64, markup: &str) -> Result<Vec<TokenLabel>> {
        let segments = self.tokenizer.tokenize(markup)?;
        let mut triples = Vec::new();

        for segment in &segments {
            match &segment.kind {
                SegmentKind::Entity(tag) => {
                    for (i, token) in segment.tokens().enumerate() {
                        let label = if i == 0 {
                            BioLabel::Begin(tag.clone())
                        } else {
                            BioLabel::Inside(tag.clone())
                        };
                        triples.push(TokenLabel::new(row_id, token, label));
                    }
                }
                SegmentKind::Text => {
                    triples.extend(
                        segment
                            .tokens()
                            .map(|token| TokenLabel::new(row_id, token, BioLabel::Outside)),
                    );
                }
            }
        }

        Ok(triples)
    }

    /// Convert a slice of rows, concatenating their triples in row order.
    pub fn convert_rows<'a, I>(&self, rows: I) -> Vec<TokenLabel>
    where
        I: IntoIterator<Item = &'a Row>,
    {
        rows.into_iter()
            .flat_map(|row| self.convert(row.row_id, row.tagged_text.as_deref()))
            .collect()
    }
}

/// Convenience function to convert one row's tagged text with a default converter.
pub fn convert(row_id: i64, tagged_text: Option<&str>) -> Vec<TokenLabel> {
    TagConverter::new().convert(row_id, tagged_text)
}
