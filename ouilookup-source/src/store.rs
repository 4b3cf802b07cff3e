//! Durable store: a registry copy kept on local disk.
//!
//! The store is read by [`FileStoreSource`] and written by [`StoreWriter`].
//! Each write goes to its own uniquely named temp file in the target's
//! directory and is then renamed over the target, so a reader sees either the
//! previous file or the new one in full, and concurrent writers never share a
//! temp file.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs;
use tracing::{info, instrument};

use ouilookup_core::error::{OuiError, Result};
use ouilookup_core::traits::DatasetSource;

/// Reads the registry from the durable store.
#[derive(Clone, Debug)]
pub struct FileStoreSource {
    path: PathBuf,
}

impl FileStoreSource {
    /// Creates a source reading `path`.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// The store location.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl DatasetSource for FileStoreSource {
    #[instrument(skip(self), fields(path = %self.path.display()))]
    async fn fetch(&self) -> Result<Bytes> {
        let data = fs::read(&self.path).await.map_err(|e| {
            OuiError::SourceUnavailable(format!("{}: {}", self.path.display(), e))
        })?;
        Ok(Bytes::from(data))
    }

    fn describe(&self) -> String {
        format!("file://{}", self.path.display())
    }
}

/// Repopulates the durable store from an upstream source.
///
/// Independent of any in-memory cache: readers pick the new copy up on their
/// next scheduled refresh.
pub struct StoreWriter {
    upstream: Arc<dyn DatasetSource>,
    path: PathBuf,
}

impl StoreWriter {
    /// Creates a writer copying `upstream` into `path`.
    pub fn new(upstream: Arc<dyn DatasetSource>, path: impl AsRef<Path>) -> Self {
        Self {
            upstream,
            path: path.as_ref().to_path_buf(),
        }
    }

    /// The store location.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Downloads from upstream and replaces the store contents.
    ///
    /// Returns the number of bytes written.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub async fn refresh(&self) -> Result<u64> {
        let body = self.upstream.fetch().await?;
        if body.is_empty() {
            return Err(OuiError::SourceUnavailable(format!(
                "{} returned an empty body",
                self.upstream.describe()
            )));
        }

        let dir = match self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            Some(parent) => parent.to_path_buf(),
            None => PathBuf::from("."),
        };
        fs::create_dir_all(&dir).await?;

        let target = self.path.clone();
        let contents = body.clone();
        tokio::task::spawn_blocking(move || -> Result<()> {
            // Deleted on drop unless persisted.
            let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
            tmp.write_all(&contents)?;
            tmp.as_file().sync_all()?;
            tmp.persist(&target).map_err(|e| OuiError::from(e.error))?;
            Ok(())
        })
        .await
        .map_err(|e| OuiError::Internal(format!("store write task failed: {}", e)))??;

        info!(
            upstream = %self.upstream.describe(),
            bytes = body.len(),
            "Store refreshed from upstream"
        );
        Ok(body.len() as u64)
    }
}
