//! Page-shape adapters: where the entries are on a page and where a badge
//! for each one goes.

mod epic;
mod steam_app;
mod steam_listing;

pub use epic::EpicAdapter;
pub use steam_app::SteamAppAdapter;
pub use steam_listing::SteamListingAdapter;

use std::time::Duration;

use core_types::{SiteKind, SizeMode};
use dom::NodeId;
use url::Url;

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::page::PageView;
use crate::resolver::IdentifierHint;

/// A candidate entry found by a scan.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entry {
    pub node: NodeId,
    pub hint: IdentifierHint,
}

pub trait SiteAdapter {
    fn kind(&self) -> SiteKind;

    fn size_mode(&self) -> SizeMode;

    /// Entries currently on the page. A page without matches yields nothing.
    fn scan(&self, page: &dyn PageView) -> Vec<Entry>;

    /// Node that should receive badges for `entry`, looked up at injection
    /// time so late-rendered containers are found.
    fn injection_target(&self, page: &dyn PageView, entry: NodeId) -> Option<NodeId>;

    /// Whether page content shows native support for `entry`.
    fn detect_native(&self, _page: &dyn PageView, _entry: NodeId) -> bool {
        false
    }

    /// Debounce window for re-scans; `None` means the page is scanned once.
    fn debounce(&self) -> Option<Duration>;
}

fn host_matches(host: &str, suffixes: &[String]) -> bool {
    suffixes.iter().any(|s| host.contains(s.as_str()))
}

pub fn detect_site(url: &Url, config: &EngineConfig) -> Option<SiteKind> {
    let host = url.host_str()?;
    if host_matches(host, &config.steam.hosts) {
        if url.path().starts_with(&config.steam.detail_path_prefix) {
            Some(SiteKind::SteamApp)
        } else {
            Some(SiteKind::SteamListing)
        }
    } else if host_matches(host, &config.epic.hosts) {
        Some(SiteKind::Epic)
    } else {
        None
    }
}

pub fn adapter_for(
    kind: SiteKind,
    config: &EngineConfig,
) -> Result<Box<dyn SiteAdapter>, EngineError> {
    let adapter: Box<dyn SiteAdapter> = match kind {
        SiteKind::SteamApp => Box::new(SteamAppAdapter::new(&config.steam)),
        SiteKind::SteamListing => Box::new(SteamListingAdapter::new(&config.steam)?),
        SiteKind::Epic => Box::new(EpicAdapter::new(&config.epic)),
    };
    Ok(adapter)
}
