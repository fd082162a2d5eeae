use std::fs;
use std::path::PathBuf;

use tracing::debug;

use crate::error::ClientError;

use super::api::ComicApi;

/// One PNG per comic number under a scratch directory, shared by `display
/// img` and `save`.
#[derive(Debug, Clone)]
pub(crate) struct ImageCache {
    dir: PathBuf,
}

impl ImageCache {
    pub(crate) fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub(crate) fn path_for(&self, num: u32) -> PathBuf {
        self.dir.join(format!("{num}.png"))
    }

    /// Path of the cached image, downloading it first when absent.
    pub(crate) fn ensure(&self, api: &ComicApi, num: u32) -> Result<PathBuf, ClientError> {
        let path = self.path_for(num);
        if path.is_file() {
            debug!(num, "image cache hit");
            return Ok(path);
        }

        debug!(num, "image cache miss");
        let info = api.comic(num)?;
        let bytes = api.image(&info)?;
        fs::create_dir_all(&self.dir)
            .map_err(|err| ClientError::io("failed to create", &self.dir, err))?;
        fs::write(&path, bytes).map_err(|err| ClientError::io("failed to write", &path, err))?;
        Ok(path)
    }

    pub(crate) fn clear(&self) -> Result<(), ClientError> {
        if !self.dir.exists() {
            return Ok(());
        }
        fs::remove_dir_all(&self.dir)
            .map_err(|err| ClientError::io("failed to remove", &self.dir, err))
    }
}
