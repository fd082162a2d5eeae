use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};

pub fn data_dir() -> Result<PathBuf> {
    let base = dirs::data_dir().context("unable to resolve data directory")?;
    Ok(base.join("xkcd-cli"))
}

pub fn image_cache_dir() -> PathBuf {
    env::temp_dir().join("xkcd")
}

pub fn save_dir() -> Result<PathBuf> {
    dirs::picture_dir()
        .or_else(dirs::home_dir)
        .context("unable to resolve a directory for saved comics")
}
