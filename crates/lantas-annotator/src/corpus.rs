//! Source corpus loading.
//!
//! Reads the complaint CSV and keeps the rows flagged by the selector
//! column that have an identifier and non-empty text.

use csv::StringRecord;
use tracing::{info, warn};

use lantas_core::Row;

use crate::config::CorpusConfig;
use crate::error::{AnnotatorError, Result};

const INDEX_COLUMN: &str = "index";
const TEXT_COLUMN: &str = "full_text";

/// Load the selected rows described by `config`, in file order.
///
/// # Errors
///
/// Returns `AnnotatorError::MissingColumn` if `index`, `full_text` or the
/// selector column is absent, and I/O or CSV errors from reading the file.
pub fn load_corpus(config: &CorpusConfig) -> Result<Vec<Row>> {
    let mut reader = csv::Reader::from_path(&config.path)?;
    let headers = reader.headers()?.clone();

    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h.trim() == name)
            .ok_or_else(|| AnnotatorError::MissingColumn {
                column: name.to_string(),
                path: config.path.clone(),
            })
    };
    let index_col = column(INDEX_COLUMN)?;
    let text_col = column(TEXT_COLUMN)?;
    let selector_col = column(config.selector_column.as_str())?;

    let mut rows = Vec::new();
    let mut record = StringRecord::new();
    while rows.len() < config.limit && reader.read_record(&mut record)? {
        if !is_selected(record.get(selector_col).unwrap_or_default()) {
            continue;
        }

        let text = record.get(text_col).unwrap_or_default();
        if text.trim().is_empty() {
            continue;
        }

        let raw_id = record.get(index_col).unwrap_or_default();
        match parse_row_id(raw_id) {
            Some(row_id) => rows.push(Row::new(row_id, text)),
            None => {
                let line = record.position().map(|p| p.line()).unwrap_or_default();
                warn!(line, value = raw_id, "skipping row with invalid index");
            }
        }
    }

    if let Some(n) = config.sample {
        rows = sample_rows(rows, n, config.seed);
    }

    info!(
        path = %config.path.display(),
        rows = rows.len(),
        "loaded source corpus"
    );
    Ok(rows)
}

/// Accepts `1`, `1.0` and `true` (any case) as selected.
fn is_selected(value: &str) -> bool {
    let value = value.trim();
    value == "1" || value == "1.0" || value.eq_ignore_ascii_case("true")
}

/// Parses integer ids, including integral floats such as `12.0`.
fn parse_row_id(value: &str) -> Option<i64> {
    let value = value.trim();
    if let Ok(id) = value.parse::<i64>() {
        return Some(id);
    }
    let float = value.parse::<f64>().ok()?;
    (float.is_finite() && float.fract() == 0.0).then_some(float as i64)
}

/// Draw `n` rows at random, keeping their original relative order.
fn sample_rows(rows: Vec<Row>, n: usize, seed: u64) -> Vec<Row> {
    if n >= rows.len() {
        return rows;
    }

    let mut rng = oorandom::Rand64::new(u128::from(seed));
    let mut indices: Vec<usize> = (0..rows.len()).collect();
    for i in 0..n {
        let j = rng.rand_range(i as u64..rows.len() as u64) as usize;
        indices.swap(i, j);
    }
    let mut chosen = indices[..n].to_vec();
    chosen.sort_unstable();

    let mut slots: Vec<Option<Row>> = rows.into_iter().map(Some).collect();
    chosen
        .into_iter()
        .filter_map(|i| slots[i].take())
        .collect()
}
