//! Error kinds raised by the ingestion pipeline

use crate::store::StoreError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Download of {url} failed with status {status}")]
    Status { url: String, status: u16 },
    #[error("Failed to send request to {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Malformed delimited text: {0}")]
    Csv(#[from] csv::Error),
    #[error("Source file has no header row")]
    MissingHeader,
    #[error("Source header is missing columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),
    #[error("Line {line}: {column} value '{value}' is not a valid {expected}")]
    InvalidValue {
        line: u64,
        column: &'static str,
        value: String,
        expected: &'static str,
    },
}

/// A fatal failure of one pipeline stage. Every variant halts the run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("Failed to parse fund registry: {0}")]
    Parse(#[from] ParseError),
    #[error("Failed to open destination database: {0}")]
    Connect(#[source] StoreError),
    #[error("Failed to provision table {table}: {source}")]
    Provision {
        table: String,
        #[source]
        source: StoreError,
    },
    #[error(
        "Chunk {chunk}/{total_chunks} (rows {first_row}..{}) failed to load: {source}",
        .first_row + .rows
    )]
    ChunkLoad {
        chunk: usize,
        total_chunks: usize,
        first_row: usize,
        rows: usize,
        #[source]
        source: StoreError,
    },
    #[error("Source file {path} could not be accessed: {source}")]
    SourceFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
