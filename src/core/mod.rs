//! Core ingestion logic

pub mod config;
pub mod error;
pub mod loader;
pub mod log;
pub mod normalize;
pub mod provision;
pub mod record;
pub mod source;

// Re-export main types for cleaner imports
pub use error::{FetchError, ParseError, PipelineError};
pub use loader::{BatchLoader, ChunkProgress, LoadReport};
pub use normalize::{NormalizeStats, Normalized, SourceFormat};
pub use record::FundRecord;
pub use source::{SourceFetcher, SourceFile};
