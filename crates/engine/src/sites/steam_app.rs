use std::time::Duration;

use core_types::{SiteKind, SizeMode};
use dom::{NodeId, SelectorList};

use super::{Entry, SiteAdapter};
use crate::config::SteamConfig;
use crate::page::PageView;
use crate::resolver::{IdentifierHint, app_id_from_path};

/// Single-title detail page: the whole document is the entry and the
/// identifier comes from the URL. Native support is read from the title's own
/// purchase area only; capsules elsewhere on the page carry their own icons.
pub struct SteamAppAdapter {
    title: SelectorList,
    platform_icons: SelectorList,
}

impl SteamAppAdapter {
    pub fn new(config: &SteamConfig) -> Self {
        Self {
            title: config.detail_title.list().clone(),
            platform_icons: config.detail_platform_icons.list().clone(),
        }
    }
}

impl SiteAdapter for SteamAppAdapter {
    fn kind(&self) -> SiteKind {
        SiteKind::SteamApp
    }

    fn size_mode(&self) -> SizeMode {
        SizeMode::Full
    }

    fn scan(&self, page: &dyn PageView) -> Vec<Entry> {
        match app_id_from_path(page.url().path()) {
            Some(id) => vec![Entry {
                node: page.root(),
                hint: IdentifierHint::Direct(id),
            }],
            None => Vec::new(),
        }
    }

    fn injection_target(&self, page: &dyn PageView, entry: NodeId) -> Option<NodeId> {
        page.query_first(entry, &self.title)
    }

    fn detect_native(&self, page: &dyn PageView, entry: NodeId) -> bool {
        page.query_first(entry, &self.platform_icons).is_some()
    }

    fn debounce(&self) -> Option<Duration> {
        None
    }
}
