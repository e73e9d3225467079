//! Batch loader: writes normalized records in fixed-size chunks, each
//! committed before the next is attempted.
//!
//! A failure on chunk `k` leaves chunks `1..k` committed and nothing after.
//! Chunks are not retried; a fresh run reprovisions the table.

use crate::core::error::PipelineError;
use crate::core::record::FundRecord;
use crate::store::FundTable;
use std::num::NonZeroUsize;
use std::ops::Range;
use tracing::{debug, info};

pub const DEFAULT_CHUNK_SIZE: usize = 5000;

/// Reported after every committed chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkProgress {
    /// 1-based index of the chunk just committed
    pub chunk: usize,
    pub total_chunks: usize,
    pub rows_in_chunk: usize,
    pub loaded: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub chunks: usize,
    pub rows: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct BatchLoader {
    chunk_size: NonZeroUsize,
}

impl Default for BatchLoader {
    fn default() -> Self {
        Self {
            chunk_size: NonZeroUsize::new(DEFAULT_CHUNK_SIZE).unwrap_or(NonZeroUsize::MIN),
        }
    }
}

impl BatchLoader {
    pub fn new(chunk_size: NonZeroUsize) -> Self {
        Self { chunk_size }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size.get()
    }

    /// Contiguous row ranges covering `len` records, all full except possibly the last.
    pub fn plan(&self, len: usize) -> Vec<Range<usize>> {
        let size = self.chunk_size.get();
        (0..len)
            .step_by(size)
            .map(|start| start..(start + size).min(len))
            .collect()
    }

    /// Inserts every record into an already provisioned `table`, one committed
    /// chunk at a time, calling `on_chunk` after each commit.
    pub fn load<T, F>(
        &self,
        table: &mut T,
        records: &[FundRecord],
        mut on_chunk: F,
    ) -> Result<LoadReport, PipelineError>
    where
        T: FundTable + ?Sized,
        F: FnMut(&ChunkProgress),
    {
        let plan = self.plan(records.len());
        let total_chunks = plan.len();
        info!(
            "Loading {} records into {} in {} chunks of up to {}",
            records.len(),
            table.table_name(),
            total_chunks,
            self.chunk_size
        );

        let mut loaded = 0;
        for (idx, range) in plan.into_iter().enumerate() {
            let chunk = idx + 1;
            let rows = range.len();
            table
                .insert_chunk(&records[range.clone()])
                .map_err(|source| PipelineError::ChunkLoad {
                    chunk,
                    total_chunks,
                    first_row: range.start,
                    rows,
                    source,
                })?;
            loaded += rows;
            debug!(
                "Chunk {}/{} committed, rows {}..{}",
                chunk, total_chunks, range.start, range.end
            );
            on_chunk(&ChunkProgress {
                chunk,
                total_chunks,
                rows_in_chunk: rows,
                loaded,
                total: records.len(),
            });
        }

        info!("Loaded {} records into {}", loaded, table.table_name());
        Ok(LoadReport {
            chunks: total_chunks,
            rows: loaded,
        })
    }
}
