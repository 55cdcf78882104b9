//! # Lantas Core
//!
//! Label model and markup conversion for Indonesian traffic-incident NER
//! corpora. Turns LLM-tagged posts such as
//! `<PLOC>Jalan Sudirman</PLOC> macet` into BIO-labeled tokens.
//!
//! ## Quick Start
//!
//! ```rust
//! use lantas_core::{BioLabel, TagConverter};
//!
//! let converter = TagConverter::new();
//! let triples = converter.convert(1, Some("<PLOC>Jalan Sudirman</PLOC> macet"));
//!
//! assert_eq!(triples[0].token, "Jalan");
//! assert_eq!(triples[0].label, BioLabel::begin("PLOC"));
//! assert_eq!(triples[2].label, BioLabel::Outside);
//! ```
pub mod convert;
pub mod error;
pub mod labels;
pub mod markup;
pub mod types;

// Re-export primary API
pub use convert::{TagConverter, convert};
pub use error::{LantasError, Result};
pub use labels::{BioLabel, EntityTag};
pub use markup::{MarkupTokenizer, Segment, SegmentKind};
pub use types::{ERROR_MARKER, Row, RowStatus, TokenLabel};
