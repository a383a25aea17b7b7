use bus::RelayError;

/// Raw answer from an upstream HTTP endpoint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UpstreamResponse {
    pub status: u16,
    pub body: String,
}

/// The network seam of the relay. The production implementation is
/// [`net::HttpClient`]; tests script responses per URL.
pub trait Upstream: Send + Sync + 'static {
    fn get(&self, url: &str) -> Result<UpstreamResponse, RelayError>;
}

impl Upstream for net::HttpClient {
    fn get(&self, url: &str) -> Result<UpstreamResponse, RelayError> {
        let fetched = net::HttpClient::get(self, url)
            .map_err(|e| RelayError::Transport(e.to_string()))?;
        Ok(UpstreamResponse {
            status: fetched.status,
            body: fetched.body,
        })
    }
}
