use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("request to {url} failed: {detail}")]
    Transport { url: String, detail: String },

    #[error("request to {url} failed: HTTP status {status}")]
    Status { url: String, status: u16 },

    #[error("malformed comic data from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("No image for comic {num} found (maybe it's interactive?)")]
    NoImage { num: u32 },

    #[error("{role} not found: {program}")]
    ToolMissing { role: &'static str, program: String },

    #[error("{action} {}: {source}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ClientError {
    pub fn io(action: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            action,
            path: path.into(),
            source,
        }
    }
}
