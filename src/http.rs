use std::io::Read;
use std::thread;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::ClientError;

pub const USER_AGENT: &str = concat!("xkcd-cli/", env!("CARGO_PKG_VERSION"));

const MAX_BODY_BYTES: u64 = 32 * 1024 * 1024;

/// Raw result of a GET: any status the server answered with, plus the body.
#[derive(Debug, Clone)]
pub struct Fetched {
    pub status: u16,
    pub body: Vec<u8>,
}

impl Fetched {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

fn should_retry_http_status(status: u16) -> bool {
    status == 408 || status == 429 || (500..=599).contains(&status)
}

#[derive(Clone)]
pub struct HttpClient {
    agent: ureq::Agent,
    attempts: usize,
    retry_delay: Duration,
}

impl HttpClient {
    pub fn new(timeout: Duration, attempts: usize) -> Self {
        Self::with_retry_delay(timeout, attempts, Duration::from_millis(500))
    }

    pub fn with_retry_delay(timeout: Duration, attempts: usize, retry_delay: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(timeout)
            .timeout_read(timeout)
            .timeout_write(timeout)
            .user_agent(USER_AGENT)
            .build();
        Self {
            agent,
            attempts: attempts.max(1),
            retry_delay,
        }
    }

    /// GETs `url`. Non-success statuses are returned, not raised, once
    /// retries for the retryable ones are used up.
    pub fn get(&self, url: &str) -> Result<Fetched, ClientError> {
        let attempts = self.attempts;

        for attempt in 1..=attempts {
            debug!(url, attempt, "GET");
            match self.agent.get(url).call() {
                Ok(response) => {
                    let status = response.status();
                    return read_body(url, response).map(|body| Fetched { status, body });
                }
                Err(ureq::Error::Status(status, response)) => {
                    if should_retry_http_status(status) && attempt < attempts {
                        warn!(url, status, attempt, "retryable status, retrying");
                        thread::sleep(self.retry_delay);
                        continue;
                    }
                    let body = read_body(url, response).unwrap_or_default();
                    return Ok(Fetched { status, body });
                }
                Err(ureq::Error::Transport(err)) => {
                    if attempt < attempts {
                        warn!(url, attempt, "transport error, retrying: {err}");
                        thread::sleep(self.retry_delay);
                        continue;
                    }
                    return Err(ClientError::Transport {
                        url: url.to_string(),
                        detail: format!("transport error after {attempts} attempt(s): {err}"),
                    });
                }
            }
        }

        Err(ClientError::Transport {
            url: url.to_string(),
            detail: "exhausted attempts without a concrete error".to_string(),
        })
    }

    /// Like [`HttpClient::get`] but treats any non-success status as an error.
    pub fn get_ok(&self, url: &str) -> Result<Vec<u8>, ClientError> {
        let fetched = self.get(url)?;
        if fetched.is_success() {
            Ok(fetched.body)
        } else {
            Err(ClientError::Status {
                url: url.to_string(),
                status: fetched.status,
            })
        }
    }
}

fn read_body(url: &str, response: ureq::Response) -> Result<Vec<u8>, ClientError> {
    read_capped(url, response.into_reader(), MAX_BODY_BYTES)
}

/// Reads at most `limit` bytes; a longer body is an error.
fn read_capped(url: &str, reader: impl Read, limit: u64) -> Result<Vec<u8>, ClientError> {
    let mut body = Vec::new();
    reader
        .take(limit.saturating_add(1))
        .read_to_end(&mut body)
        .map_err(|err| ClientError::Transport {
            url: url.to_string(),
            detail: format!("response read failed: {err}"),
        })?;
    if body.len() as u64 > limit {
        warn!(url, limit, "response body over size limit");
        return Err(ClientError::Transport {
            url: url.to_string(),
            detail: format!("response body exceeds {limit} bytes"),
        });
    }
    Ok(body)
}
