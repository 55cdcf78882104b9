use std::io;
use std::path::PathBuf;

use thiserror::Error;

use lantas_core::LantasError;

/// Errors raised by the annotation pipeline's I/O and setup layers.
///
/// Row-level failures (exhausted retries, unparseable markup) are recorded
/// as data and never surface as this type.
#[derive(Debug, Error)]
pub enum AnnotatorError {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// The HTTP client could not be constructed.
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// A required column is missing from a tabular input.
    #[error("column '{column}' not found in {}", path.display())]
    MissingColumn { column: String, path: PathBuf },

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error(transparent)]
    Core(#[from] LantasError),
}

/// Result type alias for annotator operations.
pub type Result<T> = std::result::Result<T, AnnotatorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let err = AnnotatorError::MissingColumn {
            column: "full_text".into(),
            path: PathBuf::from("data.csv"),
        };
        assert_eq!(err.to_string(), "column 'full_text' not found in data.csv");

        let err = AnnotatorError::from(LantasError::AlreadyProcessed { row_id: 5 });
        assert!(err.to_string().contains("row 5"));
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<AnnotatorError>();
    }
}
