//! # Lantas Annotator
//!
//! Resumable batch annotation of traffic-incident posts. Each pending row is
//! sent to an LLM chat completion endpoint that inlines entity tags; progress
//! is checkpointed to a CSV snapshot so interrupted runs pick up where they
//! stopped, and the tagged text is converted into BIO-labeled token datasets.

pub mod client;
pub mod config;
pub mod corpus;
pub mod dataset;
pub mod error;
pub mod orchestrator;
pub mod progress;
pub mod prompt;

pub use client::{
    AttemptFailure, AttemptOutcome, AttemptResult, Annotator, ChatCompletionClient, RetryPolicy,
    TaggedResult, annotate,
};
pub use config::{ClientConfig, CorpusConfig};
pub use corpus::load_corpus;
pub use dataset::{DatasetWriter, OutputKind};
pub use error::{AnnotatorError, Result};
pub use orchestrator::{Orchestrator, RowTable, RunSummary, StatusCounts};
pub use progress::{ProgressStore, merge_resume};
pub use prompt::{SYSTEM_PROMPT, load_system_prompt};
