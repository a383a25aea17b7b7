// crates/runtime_relay/src/lib.rs
//! The privileged relay: owns network access on behalf of the page engine.
//!
//! Commands arrive over the bus; every command is served on its own worker
//! thread so a slow upstream never stalls the others. Each command produces
//! exactly one event, success or failure.

mod upstream;
mod wire;

pub use upstream::{Upstream, UpstreamResponse};

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use bus::{RelayCommand, RelayEnds, RelayError, RelayEvent};
use core_types::{AppId, CompatibilityRecord, Title};
use url::Url;

pub const DEFAULT_SUMMARY_URL: &str =
    "https://www.protondb.com/api/v1/reports/summaries/{id}.json";
pub const DEFAULT_SEARCH_URL: &str = "https://store.steampowered.com/api/storesearch/";

#[derive(Clone, Debug)]
pub struct RelayConfig {
    /// Rating summary endpoint; `{id}` is replaced with the identifier.
    pub summary_url: String,
    /// Catalog search endpoint; `term`, `l` and `cc` are appended.
    pub search_url: String,
    pub language: String,
    pub country: String,
    pub user_agent: String,
    pub timeout: Duration,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            summary_url: DEFAULT_SUMMARY_URL.to_string(),
            search_url: DEFAULT_SEARCH_URL.to_string(),
            language: "english".to_string(),
            country: "US".to_string(),
            user_agent: net::ClientConfig::default().user_agent,
            timeout: Duration::from_secs(10),
        }
    }
}

impl RelayConfig {
    pub fn client_config(&self) -> net::ClientConfig {
        net::ClientConfig {
            user_agent: self.user_agent.clone(),
            timeout: self.timeout,
            ..net::ClientConfig::default()
        }
    }

    pub fn summary_url_for(&self, app_id: &AppId) -> Result<Url, RelayError> {
        let raw = self.summary_url.replace("{id}", app_id.as_str());
        Url::parse(&raw).map_err(|e| RelayError::Malformed(format!("summary url {raw}: {e}")))
    }

    pub fn search_url_for(&self, title: &Title) -> Result<Url, RelayError> {
        Url::parse_with_params(
            &self.search_url,
            &[
                ("term", title.as_str()),
                ("l", self.language.as_str()),
                ("cc", self.country.as_str()),
            ],
        )
        .map_err(|e| RelayError::Malformed(format!("search url {}: {e}", self.search_url)))
    }
}

/// `Ok(None)` when the service has no page for the identifier (HTTP 404).
pub fn fetch_compatibility<U: Upstream + ?Sized>(
    upstream: &U,
    config: &RelayConfig,
    app_id: &AppId,
) -> Result<Option<CompatibilityRecord>, RelayError> {
    let url = config.summary_url_for(app_id)?;
    let resp = upstream.get(url.as_str())?;
    match resp.status {
        404 => return Ok(None),
        200..=299 => {}
        other => return Err(RelayError::Status(other)),
    }
    let wire: wire::SummaryWire =
        serde_json::from_str(&resp.body).map_err(|e| RelayError::Malformed(e.to_string()))?;
    Ok(Some(wire.into()))
}

pub fn resolve_identifier<U: Upstream + ?Sized>(
    upstream: &U,
    config: &RelayConfig,
    title: &Title,
) -> Result<AppId, RelayError> {
    let url = config.search_url_for(title)?;
    let resp = upstream.get(url.as_str())?;
    if !(200..300).contains(&resp.status) {
        return Err(RelayError::Status(resp.status));
    }
    let wire: wire::SearchWire =
        serde_json::from_str(&resp.body).map_err(|e| RelayError::Malformed(e.to_string()))?;
    wire.first_match().ok_or(RelayError::NoMatch)
}

/// Serves one command. `None` only for `Shutdown`.
pub fn serve<U: Upstream + ?Sized>(
    upstream: &U,
    config: &RelayConfig,
    cmd: RelayCommand,
) -> Option<RelayEvent> {
    match cmd {
        RelayCommand::FetchCompatibility { request_id, app_id } => {
            let result = fetch_compatibility(upstream, config, &app_id);
            match &result {
                Ok(Some(record)) => log::debug!(
                    target: "relay",
                    "summary for {app_id}: tier={:?} total={:?}",
                    record.tier.as_ref().map(|t| t.as_str()),
                    record.total
                ),
                Ok(None) => log::debug!(target: "relay", "no summary for {app_id}"),
                Err(e) => log::warn!(target: "relay", "summary fetch for {app_id} failed: {e}"),
            }
            Some(RelayEvent::Compatibility {
                request_id,
                app_id,
                result,
            })
        }
        RelayCommand::ResolveIdentifier { request_id, title } => {
            let result = resolve_identifier(upstream, config, &title);
            match &result {
                Ok(id) => log::debug!(target: "relay", "catalog match for {title:?}: {id}"),
                Err(e) => log::warn!(target: "relay", "catalog search for {title:?} failed: {e}"),
            }
            Some(RelayEvent::Identifier {
                request_id,
                title,
                result,
            })
        }
        RelayCommand::Shutdown => None,
    }
}

/// Starts the relay thread. It runs until `Shutdown` arrives or every command
/// sender is dropped; workers already in flight still deliver their event.
pub fn start_relay_runtime<U: Upstream>(
    ends: RelayEnds,
    upstream: U,
    config: RelayConfig,
) -> JoinHandle<()> {
    let upstream = Arc::new(upstream);
    let config = Arc::new(config);
    let RelayEnds { cmd_rx, evt_tx } = ends;

    thread::spawn(move || {
        while let Ok(cmd) = cmd_rx.recv() {
            if matches!(cmd, RelayCommand::Shutdown) {
                log::debug!(target: "relay", "shutdown requested");
                break;
            }
            log::trace!(target: "relay", "{} #{}", cmd.action(), request_id_of(&cmd));

            let upstream = Arc::clone(&upstream);
            let config = Arc::clone(&config);
            let evt_tx = evt_tx.clone();
            thread::spawn(move || {
                if let Some(evt) = serve(upstream.as_ref(), &config, cmd) {
                    // The engine may already be gone; nothing left to notify.
                    let _ = evt_tx.send(evt);
                }
            });
        }
    })
}

fn request_id_of(cmd: &RelayCommand) -> u64 {
    match cmd {
        RelayCommand::FetchCompatibility { request_id, .. }
        | RelayCommand::ResolveIdentifier { request_id, .. } => *request_id,
        RelayCommand::Shutdown => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct ScriptedUpstream {
        routes: HashMap<String, Result<UpstreamResponse, RelayError>>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedUpstream {
        fn route(mut self, url: &str, status: u16, body: &str) -> Self {
            self.routes.insert(
                url.to_string(),
                Ok(UpstreamResponse {
                    status,
                    body: body.to_string(),
                }),
            );
            self
        }

        fn fail(mut self, url: &str, err: RelayError) -> Self {
            self.routes.insert(url.to_string(), Err(err));
            self
        }
    }

    impl Upstream for ScriptedUpstream {
        fn get(&self, url: &str) -> Result<UpstreamResponse, RelayError> {
            self.calls.lock().unwrap().push(url.to_string());
            self.routes.get(url).cloned().unwrap_or(Ok(UpstreamResponse {
                status: 500,
                body: String::new(),
            }))
        }
    }

    const SUMMARY_440: &str = "https://www.protondb.com/api/v1/reports/summaries/440.json";

    #[test]
    fn summary_is_parsed() {
        let up = ScriptedUpstream::default().route(
            SUMMARY_440,
            200,
            r#"{"tier":"platinum","total":9000}"#,
        );
        let record = fetch_compatibility(&up, &RelayConfig::default(), &AppId::from(440))
            .unwrap()
            .unwrap();
        assert_eq!(record.tier.unwrap().as_str(), "platinum");
        assert_eq!(record.total, Some(9000));
    }

    #[test]
    fn not_found_is_not_an_error() {
        let up = ScriptedUpstream::default().route(SUMMARY_440, 404, "<html>");
        let result = fetch_compatibility(&up, &RelayConfig::default(), &AppId::from(440));
        assert_eq!(result, Ok(None));
    }

    #[test]
    fn server_error_and_bad_json_are_failures() {
        let cfg = RelayConfig::default();
        let up = ScriptedUpstream::default().route(SUMMARY_440, 503, "");
        assert_eq!(
            fetch_compatibility(&up, &cfg, &AppId::from(440)),
            Err(RelayError::Status(503))
        );

        let up = ScriptedUpstream::default().route(SUMMARY_440, 200, "not json");
        assert!(matches!(
            fetch_compatibility(&up, &cfg, &AppId::from(440)),
            Err(RelayError::Malformed(_))
        ));

        let up = ScriptedUpstream::default()
            .fail(SUMMARY_440, RelayError::Transport("reset".into()));
        assert_eq!(
            fetch_compatibility(&up, &cfg, &AppId::from(440)),
            Err(RelayError::Transport("reset".into()))
        );
    }

    #[test]
    fn search_url_encodes_the_title() {
        let url = RelayConfig::default()
            .search_url_for(&Title::new("Half-Life 2: Episode One").unwrap())
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://store.steampowered.com/api/storesearch/?term=Half-Life+2%3A+Episode+One&l=english&cc=US"
        );
    }

    #[test]
    fn title_resolution() {
        let cfg = RelayConfig::default();
        let title = Title::new("Fortnite").unwrap();
        let url = cfg.search_url_for(&title).unwrap().to_string();

        let up = ScriptedUpstream::default().route(&url, 200, r#"{"total":1,"items":[{"id":1172470}]}"#);
        assert_eq!(resolve_identifier(&up, &cfg, &title), Ok(AppId::from(1172470)));

        let up = ScriptedUpstream::default().route(&url, 200, r#"{"total":0,"items":[]}"#);
        assert_eq!(resolve_identifier(&up, &cfg, &title), Err(RelayError::NoMatch));
    }

    #[test]
    fn runtime_answers_every_command() {
        let (bus, ends) = bus::channel();
        let up = ScriptedUpstream::default().route(SUMMARY_440, 200, r#"{"tier":"gold"}"#);
        let handle = start_relay_runtime(ends, up, RelayConfig::default());

        bus.cmd_tx
            .send(RelayCommand::FetchCompatibility {
                request_id: 1,
                app_id: AppId::from(440),
            })
            .unwrap();
        bus.cmd_tx
            .send(RelayCommand::FetchCompatibility {
                request_id: 2,
                app_id: AppId::from(10),
            })
            .unwrap();

        let mut events: Vec<RelayEvent> = (0..2)
            .map(|_| bus.evt_rx.recv_timeout(Duration::from_secs(5)).unwrap())
            .collect();
        events.sort_by_key(RelayEvent::request_id);

        match &events[0] {
            RelayEvent::Compatibility { result, .. } => {
                assert_eq!(result, &Ok(Some(CompatibilityRecord::with_tier("gold"))));
            }
            other => panic!("unexpected event {other:?}"),
        }
        match &events[1] {
            RelayEvent::Compatibility { result, .. } => {
                assert_eq!(result, &Err(RelayError::Status(500)));
            }
            other => panic!("unexpected event {other:?}"),
        }

        bus.cmd_tx.send(RelayCommand::Shutdown).unwrap();
        handle.join().unwrap();
    }
}
