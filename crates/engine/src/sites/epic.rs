use std::time::Duration;

use core_types::{SiteKind, SizeMode, Title};
use dom::{NodeId, SelectorList};

use super::{Entry, SiteAdapter};
use crate::config::EpicConfig;
use crate::page::PageView;
use crate::resolver::IdentifierHint;

/// Product pages that expose no identifier: the title text is looked up in
/// the storefront catalog.
pub struct EpicAdapter {
    titles: Vec<SelectorList>,
    inline_tags: Vec<String>,
    debounce: Duration,
}

impl EpicAdapter {
    pub fn new(config: &EpicConfig) -> Self {
        Self {
            titles: config
                .title_selectors
                .iter()
                .map(|s| s.list().clone())
                .collect(),
            inline_tags: config
                .inline_title_tags
                .iter()
                .map(|t| t.to_ascii_lowercase())
                .collect(),
            debounce: config.debounce(),
        }
    }
}

impl SiteAdapter for EpicAdapter {
    fn kind(&self) -> SiteKind {
        SiteKind::Epic
    }

    fn size_mode(&self) -> SizeMode {
        SizeMode::Full
    }

    fn scan(&self, page: &dyn PageView) -> Vec<Entry> {
        let root = page.root();
        for selector in &self.titles {
            let Some(node) = page.query_first(root, selector) else {
                continue;
            };
            let Some(title) = Title::new(&page.text_content(node)) else {
                continue;
            };
            log::debug!(target: "engine.scan", "title element via {selector}: {title:?}");
            return vec![Entry {
                node,
                hint: IdentifierHint::Title(title),
            }];
        }
        log::trace!(target: "engine.scan", "no title element yet");
        Vec::new()
    }

    fn injection_target(&self, page: &dyn PageView, entry: NodeId) -> Option<NodeId> {
        let inline = page
            .tag_name(entry)
            .is_some_and(|tag| self.inline_tags.iter().any(|t| t == tag));
        if inline { Some(entry) } else { page.parent(entry) }
    }

    fn debounce(&self) -> Option<Duration> {
        Some(self.debounce)
    }
}
