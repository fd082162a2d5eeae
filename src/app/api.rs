use crate::config::Config;
use crate::error::ClientError;
use crate::http::HttpClient;

use super::comic::ComicInfo;

/// Remote comic API plus the explanation wiki.
#[derive(Clone)]
pub(crate) struct ComicApi {
    http: HttpClient,
    api_url: String,
    explain_url: String,
}

impl ComicApi {
    pub(crate) fn new(http: HttpClient, api_url: &str, explain_url: &str) -> Self {
        Self {
            http,
            api_url: api_url.trim_end_matches('/').to_string(),
            explain_url: explain_url.trim_end_matches('/').to_string(),
        }
    }

    pub(crate) fn from_config(config: &Config) -> Self {
        Self::new(
            HttpClient::new(config.timeout, config.attempts),
            &config.api_url,
            &config.explain_url,
        )
    }

    pub(crate) fn comic_url(&self, num: Option<u32>) -> String {
        match num {
            Some(num) => format!("{}/{num}/info.0.json", self.api_url),
            None => format!("{}/info.0.json", self.api_url),
        }
    }

    pub(crate) fn explain_page_url(&self, num: u32) -> String {
        format!("{}/{num}", self.explain_url)
    }

    pub(crate) fn latest(&self) -> Result<ComicInfo, ClientError> {
        self.fetch_info(&self.comic_url(None))
    }

    pub(crate) fn latest_num(&self) -> Result<u32, ClientError> {
        self.latest().map(|info| info.num)
    }

    pub(crate) fn comic(&self, num: u32) -> Result<ComicInfo, ClientError> {
        self.fetch_info(&self.comic_url(Some(num)))
    }

    fn fetch_info(&self, url: &str) -> Result<ComicInfo, ClientError> {
        let body = self.http.get_ok(url)?;
        serde_json::from_slice(&body).map_err(|source| ClientError::Decode {
            url: url.to_string(),
            source,
        })
    }

    /// Raster image bytes; a 404 (or no image URL at all) means the comic has
    /// no plain image.
    pub(crate) fn image(&self, info: &ComicInfo) -> Result<Vec<u8>, ClientError> {
        if info.img.trim().is_empty() {
            return Err(ClientError::NoImage { num: info.num });
        }
        let fetched = self.http.get(&info.img)?;
        match fetched.status {
            404 => Err(ClientError::NoImage { num: info.num }),
            _ if fetched.is_success() => Ok(fetched.body),
            status => Err(ClientError::Status {
                url: info.img.clone(),
                status,
            }),
        }
    }

    pub(crate) fn explain_html(&self, num: u32) -> Result<Vec<u8>, ClientError> {
        self.http.get_ok(&self.explain_page_url(num))
    }
}
