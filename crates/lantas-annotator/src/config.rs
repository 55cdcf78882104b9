//! Pipeline configuration.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// OpenAI-compatible chat completion endpoint used by default.
pub const DEFAULT_ENDPOINT: &str = "https://openrouter.ai/api/v1/chat/completions";

/// Completion model used by default.
pub const DEFAULT_MODEL: &str = "google/gemini-2.5-flash-preview";

/// Rows flushed per checkpoint.
pub const DEFAULT_CHUNK_SIZE: usize = 10;

/// Selected rows considered per run.
pub const DEFAULT_LIMIT: usize = 1000;

/// Row limit in diagnostic mode.
pub const DIAGNOSTIC_LIMIT: usize = 2;

/// Settings for the completion endpoint.
#[derive(Clone)]
pub struct ClientConfig {
    pub endpoint: String,
    pub model: String,
    pub api_key: String,
    /// Per-attempt request timeout.
    pub timeout: Duration,
    pub system_prompt: String,
}

impl ClientConfig {
    /// Create a client configuration with default endpoint, model and timeout.
    pub fn new(api_key: impl Into<String>, system_prompt: impl Into<String>) -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: api_key.into(),
            timeout: Duration::from_secs(30),
            system_prompt: system_prompt.into(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

// The API key must never reach logs.
impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("api_key", &"<redacted>")
            .field("timeout", &self.timeout)
            .field("system_prompt_len", &self.system_prompt.len())
            .finish()
    }
}

/// Settings for selecting source rows.
#[derive(Debug, Clone)]
pub struct CorpusConfig {
    pub path: PathBuf,
    /// Boolean column marking rows that enter the pipeline.
    pub selector_column: String,
    /// Maximum number of selected rows, taken from the top of the file.
    pub limit: usize,
    /// Optional random subset size, drawn after the limit is applied.
    pub sample: Option<usize>,
    pub seed: u64,
}

impl CorpusConfig {
    /// Create a corpus configuration with default selector and limit.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            selector_column: "is_aduan".to_string(),
            limit: DEFAULT_LIMIT,
            sample: None,
            seed: 42,
        }
    }

    pub fn with_selector_column(mut self, column: impl Into<String>) -> Self {
        self.selector_column = column.into();
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_sample(mut self, sample: Option<usize>, seed: u64) -> Self {
        self.sample = sample;
        self.seed = seed;
        self
    }
}
