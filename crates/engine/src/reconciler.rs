//! Per-entry pipeline: mark, resolve, detect native support, fetch, inject.
//!
//! Entry state lives in an explicit ledger keyed by node. An entry is marked
//! `Processing` synchronously the first time a scan yields it, before any
//! request goes out, so later scans racing an in-flight answer skip it.

use std::collections::HashMap;

use core_types::{AppId, CompatibilityRecord, SiteKind, SizeMode, Title};
use dom::NodeId;

use crate::injector::{BadgeContent, BadgeInjector, Injection};
use crate::page::PageView;
use crate::relay_client::{CommandSink, RelayClient};
use crate::request_cache::{Caches, Lookup};
use crate::resolver::{self, Resolution};
use crate::sites::{Entry, SiteAdapter};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryState {
    Unprocessed,
    Processing,
    Done,
}

/// Native-support decision, made at most once per entry and independent of
/// the entry's processing state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NativeCheck {
    Unchecked,
    Checked { detected: bool },
}

#[derive(Debug)]
struct EntryRecord {
    state: EntryState,
    native: NativeCheck,
    app_id: Option<AppId>,
}

/// Per-entry markers for the page's lifetime. Records are never dropped, so
/// the ledger grows with every distinct node a pass has seen.
#[derive(Debug, Default)]
pub struct EntryLedger {
    entries: HashMap<NodeId, EntryRecord>,
}

impl EntryLedger {
    pub fn state(&self, node: NodeId) -> EntryState {
        self.entries
            .get(&node)
            .map_or(EntryState::Unprocessed, |r| r.state)
    }

    pub fn native(&self, node: NodeId) -> NativeCheck {
        self.entries
            .get(&node)
            .map_or(NativeCheck::Unchecked, |r| r.native)
    }

    pub fn app_id(&self, node: NodeId) -> Option<&AppId> {
        self.entries.get(&node)?.app_id.as_ref()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn count(&self, state: EntryState) -> usize {
        self.entries.values().filter(|r| r.state == state).count()
    }

    /// Marks `node` as processing. Returns false if it was seen before.
    fn begin(&mut self, node: NodeId) -> bool {
        if self.entries.contains_key(&node) {
            return false;
        }
        self.entries.insert(
            node,
            EntryRecord {
                state: EntryState::Processing,
                native: NativeCheck::Unchecked,
                app_id: None,
            },
        );
        true
    }

    fn record_mut(&mut self, node: NodeId) -> Option<&mut EntryRecord> {
        self.entries.get_mut(&node)
    }

    fn finish(&mut self, node: NodeId) {
        if let Some(r) = self.record_mut(node) {
            r.state = EntryState::Done;
        }
    }
}

/// Counters for one scan pass or one delivered answer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PassReport {
    pub scanned: usize,
    pub started: usize,
    pub skipped: usize,
    pub badges: usize,
}

pub struct Reconciler {
    adapter: Box<dyn SiteAdapter>,
    injector: BadgeInjector,
    ledger: EntryLedger,
}

impl Reconciler {
    pub fn new(adapter: Box<dyn SiteAdapter>, injector: BadgeInjector) -> Self {
        Self {
            adapter,
            injector,
            ledger: EntryLedger::default(),
        }
    }

    pub fn site(&self) -> SiteKind {
        self.adapter.kind()
    }

    pub fn adapter(&self) -> &dyn SiteAdapter {
        self.adapter.as_ref()
    }

    pub fn injector(&self) -> &BadgeInjector {
        &self.injector
    }

    pub fn ledger(&self) -> &EntryLedger {
        &self.ledger
    }

    /// One reconciliation pass over a fresh scan.
    pub fn run_pass<P: PageView, S: CommandSink>(
        &mut self,
        page: &mut P,
        caches: &mut Caches,
        relay: &mut RelayClient<S>,
    ) -> PassReport {
        let entries = self.adapter.scan(&*page);
        let mut report = PassReport {
            scanned: entries.len(),
            ..PassReport::default()
        };
        if entries.is_empty() {
            log::debug!(target: "engine.reconcile", "{}: no entries on page", self.site());
        }

        for Entry { node, hint } in entries {
            if !self.ledger.begin(node) {
                report.skipped += 1;
                continue;
            }
            report.started += 1;
            log::trace!(target: "engine.reconcile", "{node:?}: start {hint:?}");

            match resolver::resolve(&hint, node, &mut caches.titles, relay) {
                Resolution::Known(app_id) => {
                    report.badges += self.proceed(page, caches, relay, node, app_id);
                }
                Resolution::Waiting => {}
                Resolution::Failed => {
                    log::debug!(target: "engine.reconcile", "{node:?}: no identifier for {hint:?}");
                    self.ledger.finish(node);
                }
            }
        }

        log::debug!(
            target: "engine.reconcile",
            "pass: {} scanned, {} new, {} skipped, {} badges",
            report.scanned,
            report.started,
            report.skipped,
            report.badges
        );
        report
    }

    /// A title lookup settled. Resumes every entry that waited on it.
    pub fn on_identifier<P: PageView, S: CommandSink>(
        &mut self,
        page: &mut P,
        caches: &mut Caches,
        relay: &mut RelayClient<S>,
        title: &Title,
        app_id: Option<AppId>,
    ) -> usize {
        let waiters = caches.titles.settle(title, app_id.clone());
        let mut badges = 0;
        for node in waiters {
            match &app_id {
                Some(id) => {
                    log::info!(target: "engine.reconcile", "{title:?} is {id}");
                    badges += self.proceed(page, caches, relay, node, id.clone());
                }
                None => {
                    log::debug!(target: "engine.reconcile", "{node:?}: {title:?} has no match");
                    self.ledger.finish(node);
                }
            }
        }
        badges
    }

    /// A compatibility lookup settled. Delivers it to every waiting entry.
    pub fn on_compatibility<P: PageView>(
        &mut self,
        page: &mut P,
        caches: &mut Caches,
        app_id: &AppId,
        record: Option<CompatibilityRecord>,
    ) -> usize {
        let waiters = caches.compatibility.settle(app_id, record.clone());
        waiters
            .into_iter()
            .map(|node| self.deliver(page, node, app_id, record.as_ref()))
            .sum()
    }

    fn proceed<P: PageView, S: CommandSink>(
        &mut self,
        page: &mut P,
        caches: &mut Caches,
        relay: &mut RelayClient<S>,
        node: NodeId,
        app_id: AppId,
    ) -> usize {
        if let Some(r) = self.ledger.record_mut(node) {
            r.app_id = Some(app_id.clone());
        }
        let mut badges = self.check_native(page, node, &app_id);

        let lookup = caches
            .compatibility
            .get_or_fetch(app_id.clone(), node, |id| {
                relay.fetch_compatibility(id).map(drop)
            });
        if let Lookup::Ready(record) = lookup {
            badges += self.deliver(page, node, &app_id, record.as_ref());
        }
        badges
    }

    fn check_native<P: PageView>(&mut self, page: &mut P, node: NodeId, app_id: &AppId) -> usize {
        if self.ledger.native(node) != NativeCheck::Unchecked {
            return 0;
        }
        let detected = self.adapter.detect_native(&*page, node);
        if let Some(r) = self.ledger.record_mut(node) {
            r.native = NativeCheck::Checked { detected };
        }
        if !detected {
            return 0;
        }
        self.place(page, node, BadgeContent::Native, app_id)
    }

    fn deliver<P: PageView>(
        &mut self,
        page: &mut P,
        node: NodeId,
        app_id: &AppId,
        record: Option<&CompatibilityRecord>,
    ) -> usize {
        self.ledger.finish(node);
        match record.and_then(|r| r.tier.as_ref()) {
            Some(tier) => self.place(page, node, BadgeContent::Tier(tier), app_id),
            None => {
                log::debug!(target: "engine.reconcile", "{node:?}: no tier for {app_id}");
                0
            }
        }
    }

    fn place<P: PageView>(
        &self,
        page: &mut P,
        node: NodeId,
        content: BadgeContent<'_>,
        app_id: &AppId,
    ) -> usize {
        let Some(target) = self.adapter.injection_target(&*page, node) else {
            log::debug!(target: "engine.reconcile", "{node:?}: no injection target");
            return 0;
        };
        let size: SizeMode = self.adapter.size_mode();
        match self.injector.inject(page, target, content, app_id, size) {
            Ok(Injection::Inserted(_)) => 1,
            Ok(Injection::AlreadyPresent) => 0,
            Ok(Injection::Detached) => {
                log::debug!(target: "engine.reconcile", "{node:?}: target gone before answer for {app_id}");
                0
            }
            Err(e) => {
                log::warn!(target: "engine.reconcile", "{node:?}: injection failed: {e}");
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::sites::adapter_for;
    use bus::RelayCommand;
    use dom::{Document, parse_document};
    use std::sync::mpsc::Sender;
    use url::Url;

    fn setup(url: &str, html: &str) -> (Reconciler, Document, Caches) {
        let cfg = EngineConfig::builtin().unwrap();
        let doc = parse_document(Url::parse(url).unwrap(), html);
        let kind = crate::sites::detect_site(doc.url(), &cfg).unwrap();
        let reconciler = Reconciler::new(
            adapter_for(kind, &cfg).unwrap(),
            BadgeInjector::new(&cfg.badge).unwrap(),
        );
        (reconciler, doc, Caches::new())
    }

    fn relay() -> (RelayClient<Sender<RelayCommand>>, bus::RelayEnds) {
        let (bus, ends) = bus::channel();
        (RelayClient::new(bus.cmd_tx), ends)
    }

    #[test]
    fn entries_are_marked_before_answers_arrive() {
        let (mut rec, mut doc, mut caches) = setup(
            "https://store.steampowered.com/",
            r#"<a href="/app/570/">Dota 2</a>"#,
        );
        let (mut relay, ends) = relay();

        let first = rec.run_pass(&mut doc, &mut caches, &mut relay);
        assert_eq!((first.started, first.skipped), (1, 0));
        let entry = rec.adapter().scan(&doc)[0].node;
        assert_eq!(rec.ledger().state(entry), EntryState::Processing);
        assert_eq!(rec.ledger().app_id(entry), Some(&AppId::from(570)));

        let second = rec.run_pass(&mut doc, &mut caches, &mut relay);
        assert_eq!((second.started, second.skipped), (0, 1));
        assert_eq!(ends.cmd_rx.try_iter().count(), 1);

        let badges = rec.on_compatibility(
            &mut doc,
            &mut caches,
            &AppId::from(570),
            Some(CompatibilityRecord::with_tier("gold")),
        );
        assert_eq!(badges, 1);
        assert_eq!(rec.ledger().state(entry), EntryState::Done);
    }

    #[test]
    fn native_is_checked_once_and_first() {
        let (mut rec, mut doc, mut caches) = setup(
            "https://store.steampowered.com/",
            r#"<a href="/app/620/">Portal 2<span class="platform_img linux"></span></a>"#,
        );
        let (mut relay, _ends) = relay();
        let report = rec.run_pass(&mut doc, &mut caches, &mut relay);
        assert_eq!(report.badges, 1);
        let entry = rec.adapter().scan(&doc)[0].node;
        assert_eq!(
            rec.ledger().native(entry),
            NativeCheck::Checked { detected: true }
        );

        rec.on_compatibility(
            &mut doc,
            &mut caches,
            &AppId::from(620),
            Some(CompatibilityRecord::with_tier("platinum")),
        );
        let kinds: Vec<_> = doc
            .children(entry)
            .iter()
            .filter_map(|n| doc.attribute(*n, crate::injector::KIND_ATTRIBUTE))
            .collect();
        assert_eq!(kinds, vec!["native", "tier"]);
    }

    #[test]
    fn failed_title_lookup_finishes_the_entry() {
        let (mut rec, mut doc, mut caches) = setup(
            "https://store.epicgames.com/en-US/p/unknown",
            "<h1>Some Unlisted Game</h1>",
        );
        let (mut relay, ends) = relay();
        rec.run_pass(&mut doc, &mut caches, &mut relay);
        let entry = rec.adapter().scan(&doc)[0].node;
        assert_eq!(ends.cmd_rx.try_recv().unwrap().action(), "resolveIdentifier");

        let title = Title::new("Some Unlisted Game").unwrap();
        let badges = rec.on_identifier(&mut doc, &mut caches, &mut relay, &title, None);
        assert_eq!(badges, 0);
        assert_eq!(rec.ledger().state(entry), EntryState::Done);
        assert!(ends.cmd_rx.try_recv().is_err());
        assert_eq!(rec.ledger().count(EntryState::Done), 1);
    }
}
