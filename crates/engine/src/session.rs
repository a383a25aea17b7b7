//! One page, start to finish.
//!
//! The session owns everything that lives as long as the page: the adapter
//! and entry ledger (inside the reconciler), both caches, the relay client
//! and the watcher. Relay answers arrive on a channel and are pumped into
//! the pipeline on the caller's thread, like every other page mutation.

use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::time::{Duration, Instant};

use bus::{RelayCommand, RelayEvent};
use core_types::SiteKind;

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::injector::BadgeInjector;
use crate::page::PageView;
use crate::reconciler::{EntryLedger, PassReport, Reconciler};
use crate::relay_client::{CommandSink, RelayClient};
use crate::request_cache::Caches;
use crate::sites::{adapter_for, detect_site};
use crate::watcher::MutationWatcher;

const IDLE_POLL: Duration = Duration::from_millis(50);

/// Totals reported when a session stops running.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SessionSummary {
    pub passes: usize,
    pub badges: usize,
    pub compatibility_requests: usize,
    pub identifier_requests: usize,
    pub pending: usize,
}

pub struct Session<P, S = Sender<RelayCommand>> {
    page: P,
    reconciler: Reconciler,
    caches: Caches,
    relay: RelayClient<S>,
    events: Receiver<RelayEvent>,
    watcher: Option<MutationWatcher>,
    passes: usize,
    badges: usize,
}

impl<P: PageView, S: CommandSink> Session<P, S> {
    pub fn new(
        page: P,
        config: &EngineConfig,
        sink: S,
        events: Receiver<RelayEvent>,
    ) -> Result<Self, EngineError> {
        let kind = detect_site(page.url(), config)
            .ok_or_else(|| EngineError::UnsupportedSite(page.url().to_string()))?;
        let adapter = adapter_for(kind, config)?;
        let watcher = adapter.debounce().map(MutationWatcher::new);
        log::info!(target: "engine", "{} session for {}", kind, page.url());
        Ok(Self {
            page,
            reconciler: Reconciler::new(adapter, BadgeInjector::new(&config.badge)?),
            caches: Caches::new(),
            relay: RelayClient::new(sink),
            events,
            watcher,
            passes: 0,
            badges: 0,
        })
    }

    pub fn site(&self) -> SiteKind {
        self.reconciler.site()
    }

    pub fn page(&self) -> &P {
        &self.page
    }

    /// Host-side mutations go through here; the watcher sees them on the
    /// next [`tick`](Self::tick).
    pub fn page_mut(&mut self) -> &mut P {
        &mut self.page
    }

    pub fn into_page(self) -> P {
        self.page
    }

    pub fn caches(&self) -> &Caches {
        &self.caches
    }

    pub fn ledger(&self) -> &EntryLedger {
        self.reconciler.ledger()
    }

    pub fn relay(&self) -> &RelayClient<S> {
        &self.relay
    }

    pub fn is_watching(&self) -> bool {
        self.watcher.is_some()
    }

    pub fn pending(&self) -> usize {
        self.caches.pending()
    }

    /// Initial pass; attaches the watcher for pages that keep re-rendering.
    pub fn start(&mut self) -> PassReport {
        let report = self.reconcile();
        if let Some(watcher) = self.watcher.as_mut() {
            watcher.attach(&mut self.page);
        }
        report
    }

    pub fn reconcile(&mut self) -> PassReport {
        let report = self
            .reconciler
            .run_pass(&mut self.page, &mut self.caches, &mut self.relay);
        self.passes += 1;
        self.badges += report.badges;
        report
    }

    /// Feed one relay answer into the pipeline. Returns badges inserted.
    pub fn handle_event(&mut self, event: RelayEvent) -> usize {
        let badges = match event {
            RelayEvent::Compatibility {
                request_id,
                app_id,
                result,
            } => {
                let record = result.unwrap_or_else(|e| {
                    log::warn!(target: "engine", "#{request_id} compatibility for {app_id} failed: {e}");
                    None
                });
                if let Some(r) = &record {
                    log::info!(
                        target: "engine",
                        "{app_id}: tier {:?}",
                        r.tier.as_ref().map(|t| t.as_str())
                    );
                }
                self.reconciler
                    .on_compatibility(&mut self.page, &mut self.caches, &app_id, record)
            }
            RelayEvent::Identifier {
                request_id,
                title,
                result,
            } => {
                let app_id = result
                    .map_err(|e| {
                        log::warn!(target: "engine", "#{request_id} identifier for {title:?} failed: {e}");
                    })
                    .ok();
                self.reconciler.on_identifier(
                    &mut self.page,
                    &mut self.caches,
                    &mut self.relay,
                    &title,
                    app_id,
                )
            }
        };
        self.badges += badges;
        badges
    }

    /// Drain every answer already delivered, without blocking. A relay that
    /// went away leaves its outstanding keys settled as misses.
    pub fn pump(&mut self) -> usize {
        let mut handled = 0;
        loop {
            match self.events.try_recv() {
                Ok(event) => {
                    self.handle_event(event);
                    handled += 1;
                }
                Err(TryRecvError::Empty) => return handled,
                Err(TryRecvError::Disconnected) => {
                    self.abandon_pending();
                    return handled;
                }
            }
        }
    }

    fn abandon_pending(&mut self) {
        let pending = self.pending();
        if pending == 0 {
            return;
        }
        log::warn!(target: "engine", "relay gone, settling {pending} request(s) as misses");
        for title in self.caches.titles.pending_keys() {
            self.reconciler.on_identifier(
                &mut self.page,
                &mut self.caches,
                &mut self.relay,
                &title,
                None,
            );
        }
        for app_id in self.caches.compatibility.pending_keys() {
            self.reconciler
                .on_compatibility(&mut self.page, &mut self.caches, &app_id, None);
        }
    }

    /// Collect page mutations and run a pass if the debounce window closed.
    pub fn tick(&mut self, now: Instant) -> Option<PassReport> {
        let watcher = self.watcher.as_mut()?;
        watcher.collect(&mut self.page, now);
        if watcher.due(now) {
            Some(self.reconcile())
        } else {
            None
        }
    }

    /// Run until nothing is pending and no re-scan is scheduled, or until
    /// `deadline`. Blocks on the relay channel between steps.
    pub fn run_until_idle(&mut self, deadline: Instant) -> SessionSummary {
        loop {
            let now = Instant::now();
            self.pump();
            self.tick(now);

            let scheduled = self.watcher.as_ref().and_then(MutationWatcher::deadline);
            if self.pending() == 0 && scheduled.is_none() {
                break;
            }
            if now >= deadline {
                log::warn!(target: "engine", "stopping with {} request(s) pending", self.pending());
                break;
            }

            let wake = scheduled.map_or(deadline, |s| s.min(deadline));
            let wait = wake.saturating_duration_since(now).min(IDLE_POLL);
            match self.events.recv_timeout(wait) {
                Ok(event) => {
                    self.handle_event(event);
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    self.abandon_pending();
                    std::thread::sleep(wait);
                }
            }
        }
        self.summary()
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            passes: self.passes,
            badges: self.badges,
            compatibility_requests: self.relay.compatibility_sent(),
            identifier_requests: self.relay.identifier_sent(),
            pending: self.pending(),
        }
    }

    /// Ask the relay to stop. The page and its badges stay as they are.
    pub fn shutdown(&self) {
        self.relay.shutdown();
    }
}
