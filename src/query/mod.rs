//! Question answering for text2sql.
//!
//! The pipeline orchestrates model, extractor and safety gate; the summary
//! module condenses result sets for the explanation prompt.

pub mod pipeline;
pub mod summary;

pub use pipeline::{Pipeline, PipelineResponse, QueryRequest, DEFAULT_LIMIT, MAX_LIMIT};
pub use summary::{fallback_explanation, summarize};
