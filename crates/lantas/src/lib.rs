//! # Lantas
//!
//! Umbrella crate for the traffic-incident annotation pipeline.
//!
//! - [`lantas_core`]: entity tags, BIO labels, the markup tokenizer and the
//!   tag-to-token converter.
//! - [`lantas_annotator`]: the completion client, progress store,
//!   orchestrator and dataset writer.
//!
//! ```
//! use lantas::{BioLabel, TagConverter};
//!
//! let triples = TagConverter::new().convert(7, Some("<VEH>Bus</VEH> mogok"));
//! assert_eq!(triples[0].label, BioLabel::begin("VEH"));
//! assert_eq!(triples[1].label, BioLabel::Outside);
//! ```

pub use lantas_annotator;
pub use lantas_core;

pub use lantas_annotator::{
    ChatCompletionClient, ClientConfig, CorpusConfig, DatasetWriter, Orchestrator, OutputKind,
    ProgressStore, RetryPolicy, RunSummary, TaggedResult,
};
pub use lantas_core::{BioLabel, EntityTag, Row, TagConverter, TokenLabel};
