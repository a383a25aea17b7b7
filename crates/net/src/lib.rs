use std::io::Read;
use std::time::{Duration, Instant};
use thiserror::Error;

const DEFAULT_MAX_BODY_BYTES: u64 = 1024 * 1024;

pub struct FetchResult {
    pub url: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
    pub duration_ms: u128,
}

impl FetchResult {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, Error)]
pub enum NetError {
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },
    #[error("reading body of {url} failed: {source}")]
    Body {
        url: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub user_agent: String,
    pub timeout: Duration,
    pub max_body_bytes: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            user_agent: concat!("protonbadge/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout: Duration::from_secs(10),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

/// Blocking HTTP client. Non-2xx statuses are returned as results, not errors,
/// so callers can tell "not found" apart from a transport failure.
pub struct HttpClient {
    agent: ureq::Agent,
    max_body_bytes: u64,
}

impl HttpClient {
    pub fn new(config: &ClientConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build();
        Self {
            agent,
            max_body_bytes: config.max_body_bytes,
        }
    }

    pub fn get(&self, url: &str) -> Result<FetchResult, NetError> {
        let start = Instant::now();
        let response = match self.agent.get(url).call() {
            Ok(resp) => resp,
            Err(ureq::Error::Status(_, resp)) => resp,
            Err(ureq::Error::Transport(t)) => {
                return Err(NetError::Transport {
                    url: url.to_string(),
                    message: t.to_string(),
                });
            }
        };

        let status = response.status();
        let final_url = response.get_url().to_string();
        let content_type = response.header("content-type").map(str::to_string);

        let mut buf = Vec::new();
        response
            .into_reader()
            .take(self.max_body_bytes)
            .read_to_end(&mut buf)
            .map_err(|source| NetError::Body {
                url: url.to_string(),
                source,
            })?;

        let result = FetchResult {
            url: final_url,
            status,
            content_type,
            body: String::from_utf8_lossy(&buf).into_owned(),
            duration_ms: start.elapsed().as_millis(),
        };
        log::debug!(
            target: "net",
            "GET {} -> {} ({} bytes, {} ms)",
            url,
            result.status,
            buf.len(),
            result.duration_ms
        );
        Ok(result)
    }
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new(&ClientConfig::default())
    }
}
