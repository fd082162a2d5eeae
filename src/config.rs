use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;

use crate::cli::Settings;
use crate::paths;

#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    pub explain_url: String,
    pub renderer: String,
    pub pager: Option<String>,
    pub viewer: String,
    pub cache_dir: PathBuf,
    pub data_dir: PathBuf,
    pub save_dir: PathBuf,
    pub timeout: Duration,
    pub attempts: usize,
}

impl Config {
    pub fn from_settings(settings: Settings) -> Result<Self> {
        let data_dir = match settings.data_dir {
            Some(dir) => dir,
            None => paths::data_dir()?,
        };
        let save_dir = match settings.save_dir {
            Some(dir) => dir,
            None => paths::save_dir()?,
        };
        let pager = (!settings.no_pager && !settings.pager.trim().is_empty())
            .then(|| settings.pager.trim().to_string());

        Ok(Self {
            api_url: trim_base(&settings.api_url),
            explain_url: trim_base(&settings.explain_url),
            renderer: settings.renderer,
            pager,
            viewer: settings.viewer,
            cache_dir: settings.cache_dir.unwrap_or_else(paths::image_cache_dir),
            data_dir,
            save_dir,
            timeout: Duration::from_secs(settings.timeout.max(1)),
            attempts: settings.retries.max(1),
        })
    }
}

fn trim_base(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}
