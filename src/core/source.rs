//! Source acquisition abstractions

use crate::core::error::{FetchError, PipelineError};
use async_trait::async_trait;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Retrieves the raw registry export. Any non-success response is an error.
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    async fn fetch(&self) -> Result<Vec<u8>, FetchError>;
}

/// The export on local disk. A downloaded copy is removed by [`SourceFile::discard`];
/// a file supplied by the user is left alone.
#[derive(Debug)]
pub struct SourceFile {
    path: PathBuf,
    downloaded: bool,
}

impl SourceFile {
    pub fn local(path: &Path) -> Self {
        SourceFile {
            path: path.to_path_buf(),
            downloaded: false,
        }
    }

    /// Fetches the export and writes it to `destination`.
    pub async fn download(
        fetcher: &dyn SourceFetcher,
        destination: &Path,
    ) -> Result<Self, PipelineError> {
        let bytes = fetcher.fetch().await?;
        info!("Downloaded {} bytes", bytes.len());

        if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| PipelineError::SourceFile {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(destination, &bytes).map_err(|source| PipelineError::SourceFile {
            path: destination.to_path_buf(),
            source,
        })?;
        debug!("Saved source file to {}", destination.display());

        Ok(SourceFile {
            path: destination.to_path_buf(),
            downloaded: true,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn read(&self) -> Result<Vec<u8>, PipelineError> {
        fs::read(&self.path).map_err(|source| PipelineError::SourceFile {
            path: self.path.clone(),
            source,
        })
    }

    pub fn discard(self) -> Result<(), PipelineError> {
        if !self.downloaded {
            return Ok(());
        }
        fs::remove_file(&self.path).map_err(|source| PipelineError::SourceFile {
            path: self.path.clone(),
            source,
        })?;
        debug!("Removed source file {}", self.path.display());
        Ok(())
    }
}
