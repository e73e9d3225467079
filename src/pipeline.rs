//! End-to-end run: fetch, normalize, provision, load, clean up.
//!
//! Stages run strictly in that order. A failed fetch never touches the
//! database, and a parse failure aborts before any connection is opened.

use crate::core::config::AppConfig;
use crate::core::normalize::{self, SourceFormat};
use crate::core::provision::provision;
use crate::core::{
    BatchLoader, ChunkProgress, LoadReport, NormalizeStats, Normalized, PipelineError,
    SourceFetcher, SourceFile,
};
use crate::providers::CvmProvider;
use crate::store::FundTable;
use crate::store::memory::MemoryTable;
use crate::store::sqlite::SqliteTable;
use anyhow::Result;
use std::path::Path;
use tokio::sync::mpsc;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineOutcome {
    pub normalize: NormalizeStats,
    pub load: LoadReport,
}

/// Where the export comes from for one run.
pub enum Source<'a> {
    Remote(&'a dyn SourceFetcher),
    Local(&'a Path),
}

/// Where the records go for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    Database,
    Memory,
}

pub async fn acquire(source: Source<'_>, download_path: &Path) -> Result<SourceFile, PipelineError> {
    match source {
        Source::Remote(fetcher) => SourceFile::download(fetcher, download_path).await,
        Source::Local(path) => {
            info!("Reading fund registry from {}", path.display());
            Ok(SourceFile::local(path))
        }
    }
}

pub fn normalize_file(
    source: &SourceFile,
    format: &SourceFormat,
) -> Result<Normalized, PipelineError> {
    let bytes = source.read()?;
    let normalized = normalize::normalize(&bytes, format)?;
    info!(
        "Normalized {} records from {}",
        normalized.records.len(),
        source.path().display()
    );
    Ok(normalized)
}

/// Provisions `table` and loads `normalized` into it chunk by chunk.
pub fn replace_contents<T, F>(
    table: &mut T,
    normalized: &Normalized,
    loader: &BatchLoader,
    on_chunk: F,
) -> Result<LoadReport, PipelineError>
where
    T: FundTable + ?Sized,
    F: FnMut(&ChunkProgress),
{
    provision(table)?;
    loader.load(table, &normalized.records, on_chunk)
}

/// Runs the whole job against `source`, reporting each committed chunk.
///
/// The database stage runs on a blocking thread; progress is relayed back
/// to `on_chunk` on the calling task. The downloaded export is removed only
/// after the last chunk commits.
pub async fn run<F>(
    config: &AppConfig,
    source: Source<'_>,
    destination: Destination,
    mut on_chunk: F,
) -> Result<PipelineOutcome>
where
    F: FnMut(&ChunkProgress),
{
    let format = config.source.format()?;
    let loader = BatchLoader::new(config.chunk_size()?);
    let download_path = config.download_path()?;

    let source_file = acquire(source, &download_path).await?;
    let normalized = normalize_file(&source_file, &format)?;
    let stats = normalized.stats;

    let db_path = match destination {
        Destination::Database => Some(config.database_path()?),
        Destination::Memory => None,
    };
    let table_name = config.database.table.clone();
    let (progress_tx, mut progress_rx) = mpsc::unbounded_channel();

    let store = tokio::task::spawn_blocking(move || -> Result<LoadReport, PipelineError> {
        let report = |progress: &ChunkProgress| {
            // The receiver outlives this task unless the run was cancelled.
            let _ = progress_tx.send(*progress);
        };
        match db_path {
            Some(db_path) => {
                let mut table =
                    SqliteTable::open(&db_path, &table_name).map_err(PipelineError::Connect)?;
                info!("Connected to {}", db_path.display());
                replace_contents(&mut table, &normalized, &loader, report)
            }
            None => {
                let mut table = MemoryTable::new(&table_name);
                replace_contents(&mut table, &normalized, &loader, report)
            }
        }
    });

    while let Some(progress) = progress_rx.recv().await {
        on_chunk(&progress);
    }
    let load = store.await??;

    source_file.discard()?;
    Ok(PipelineOutcome {
        normalize: stats,
        load,
    })
}

/// Runs the job with the HTTP provider, or a local export when `input` is given.
pub async fn run_with_config<F>(
    config: &AppConfig,
    input: Option<&Path>,
    destination: Destination,
    on_chunk: F,
) -> Result<PipelineOutcome>
where
    F: FnMut(&ChunkProgress),
{
    match input {
        Some(path) => run(config, Source::Local(path), destination, on_chunk).await,
        None => {
            let provider = CvmProvider::new(&config.source).map_err(PipelineError::from)?;
            run(config, Source::Remote(&provider), destination, on_chunk).await
        }
    }
}
