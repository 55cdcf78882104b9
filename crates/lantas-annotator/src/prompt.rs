//! System instruction sent with every annotation request.

use std::path::Path;

use crate::error::{AnnotatorError, Result};

/// Instruction defining the 14 entity tags and the inline XML-style output format.
pub const SYSTEM_PROMPT: &str = include_str!("../prompt/system.md");

/// Load a replacement instruction from disk, or fall back to [`SYSTEM_PROMPT`].
///
/// # Errors
///
/// Returns an I/O error if the file cannot be read and
/// `AnnotatorError::Configuration` if it holds only whitespace.
pub fn load_system_prompt(path: Option<&Path>) -> Result<String> {
    let Some(path) = path else {
        return Ok(SYSTEM_PROMPT.to_string());
    };

    let prompt = std::fs::read_to_string(path)?;
    if prompt.trim().is_empty() {
        return Err(AnnotatorError::Configuration(format!(
            "system prompt file {} is empty",
            path.display()
        )));
    }
    Ok(prompt)
}
