use thiserror::Error;

/// Errors that can occur during Lantas core operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LantasError {
    /// An entity tag was opened but never closed.
    #[error("unclosed tag <{tag}> opened at byte {offset}")]
    UnclosedTag {
        /// Tag name as written in the markup.
        tag: String,
        /// Byte offset of the opening `<`.
        offset: usize,
    },

    /// A closing tag appeared while no entity was open.
    #[error("unexpected closing tag </{tag}> at byte {offset}")]
    UnexpectedClosingTag { tag: String, offset: usize },

    /// A closing tag did not match the currently open entity.
    #[error("closing tag </{found}> at byte {offset} does not match <{expected}>")]
    MismatchedClosingTag {
        expected: String,
        found: String,
        offset: usize,
    },

    /// Entities may not contain other entities.
    #[error("tag <{inner}> at byte {offset} is nested inside <{outer}>")]
    NestedTag {
        outer: String,
        inner: String,
        offset: usize,
    },

    /// A `<` started a tag that is not `<NAME>` or `</NAME>`.
    #[error("malformed tag at byte {offset}")]
    MalformedTag { offset: usize },

    /// A row that already carries an outcome was written again.
    #[error("row {row_id} already has an annotation outcome")]
    AlreadyProcessed { row_id: i64 },

    /// A label string is not `O`, `B-<TAG>` or `I-<TAG>`.
    #[error("invalid BIO label: {0:?}")]
    InvalidLabel(String),
}

/// Result type alias for Lantas core operations.
pub type Result<T> = std::result::Result<T, LantasError>;
