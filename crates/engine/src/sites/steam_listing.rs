use std::collections::HashSet;
use std::time::Duration;

use core_types::{SiteKind, SizeMode};
use dom::{NodeId, SelectorList};

use super::{Entry, SiteAdapter};
use crate::config::SteamConfig;
use crate::error::EngineError;
use crate::page::PageView;
use crate::resolver::{IdentifierHint, app_id_from_attribute, app_id_from_path};

/// Store front, search and other multi-title pages.
///
/// Entries come from two strategies: elements carrying the identifier
/// attribute, and links whose path names an app. An element carrying both is
/// reported once, by its attribute; an attribute with no usable identifier
/// leaves the element to the link strategy.
pub struct SteamListingAdapter {
    attribute: String,
    with_attribute: SelectorList,
    links: SelectorList,
    price_containers: Vec<SelectorList>,
    cards: SelectorList,
    platform_icons: SelectorList,
    debounce: Duration,
}

impl SteamListingAdapter {
    pub fn new(config: &SteamConfig) -> Result<Self, EngineError> {
        let attribute = config.listing_attribute.trim().to_ascii_lowercase();
        let with_attribute =
            SelectorList::parse(&format!("[{attribute}]")).map_err(|source| EngineError::Selector {
                field: "steam.listing_attribute",
                source,
            })?;
        Ok(Self {
            attribute,
            with_attribute,
            links: config.listing_links.list().clone(),
            price_containers: config
                .price_containers
                .iter()
                .map(|s| s.list().clone())
                .collect(),
            cards: config.card_containers.list().clone(),
            platform_icons: config.platform_icons.list().clone(),
            debounce: config.debounce(),
        })
    }
}

impl SiteAdapter for SteamListingAdapter {
    fn kind(&self) -> SiteKind {
        SiteKind::SteamListing
    }

    fn size_mode(&self) -> SizeMode {
        SizeMode::Small
    }

    fn scan(&self, page: &dyn PageView) -> Vec<Entry> {
        let root = page.root();
        let mut entries = Vec::new();
        let mut claimed = HashSet::new();

        for node in page.query_all(root, &self.with_attribute) {
            let value = page.attribute(node, &self.attribute).unwrap_or_default();
            match app_id_from_attribute(value) {
                Some(id) => {
                    claimed.insert(node);
                    entries.push(Entry {
                        node,
                        hint: IdentifierHint::Direct(id),
                    });
                }
                None => log::trace!(target: "engine.scan", "{node:?}: unusable {}={value:?}", self.attribute),
            }
        }

        for node in page.query_all(root, &self.links) {
            if claimed.contains(&node) {
                continue;
            }
            let Some(href) = page.attribute(node, "href") else {
                continue;
            };
            if let Some(id) = app_id_from_path(href) {
                entries.push(Entry {
                    node,
                    hint: IdentifierHint::Direct(id),
                });
            }
        }

        entries
    }

    fn injection_target(&self, page: &dyn PageView, entry: NodeId) -> Option<NodeId> {
        let nested = self
            .price_containers
            .iter()
            .find_map(|sel| page.query_first(entry, sel));
        Some(nested.unwrap_or(entry))
    }

    fn detect_native(&self, page: &dyn PageView, entry: NodeId) -> bool {
        if page.query_first(entry, &self.platform_icons).is_some() {
            return true;
        }
        page.closest(entry, &self.cards)
            .is_some_and(|card| page.query_first(card, &self.platform_icons).is_some())
    }

    fn debounce(&self) -> Option<Duration> {
        Some(self.debounce)
    }
}
