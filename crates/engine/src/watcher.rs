use std::time::{Duration, Instant};

use dom::{MutationRecord, NodeId, ObserverId};

use crate::injector::KIND_ATTRIBUTE;
use crate::page::PageView;

/// Trailing-edge debounce over an explicit clock.
#[derive(Clone, Debug)]
pub struct Debouncer {
    window: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            deadline: None,
        }
    }

    /// Restart the window at `now`.
    pub fn poke(&mut self, now: Instant) {
        self.deadline = Some(now + self.window);
    }

    /// True exactly once per armed window, at or after its deadline.
    pub fn fire_if_due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WatcherState {
    Idle,
    Observing(ObserverId),
}

/// Watches the page for host-side re-renders and schedules debounced
/// re-scans. Mutations that only add badges do not count.
pub struct MutationWatcher {
    state: WatcherState,
    debouncer: Debouncer,
    bursts: usize,
}

impl MutationWatcher {
    pub fn new(window: Duration) -> Self {
        Self {
            state: WatcherState::Idle,
            debouncer: Debouncer::new(window),
            bursts: 0,
        }
    }

    pub fn state(&self) -> WatcherState {
        self.state
    }

    /// Idle to observing. Later calls are no-ops.
    pub fn attach<P: PageView + ?Sized>(&mut self, page: &mut P) {
        if self.state == WatcherState::Idle {
            self.state = WatcherState::Observing(page.observe());
        }
    }

    /// Drain queued mutation records as one burst. Returns whether the burst
    /// restarted the debounce window.
    pub fn collect<P: PageView + ?Sized>(&mut self, page: &mut P, now: Instant) -> bool {
        let WatcherState::Observing(observer) = self.state else {
            return false;
        };
        let records = page.take_records(observer);
        let relevant = records
            .iter()
            .filter(|r| !only_badges(&*page, r))
            .count();
        if relevant == 0 {
            return false;
        }
        self.bursts += 1;
        log::trace!(target: "engine.watch", "burst of {relevant} mutation(s)");
        self.debouncer.poke(now);
        true
    }

    pub fn due(&mut self, now: Instant) -> bool {
        self.debouncer.fire_if_due(now)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.debouncer.deadline()
    }

    pub fn bursts(&self) -> usize {
        self.bursts
    }
}

fn only_badges<P: PageView + ?Sized>(page: &P, record: &MutationRecord) -> bool {
    record.removed.is_empty()
        && !record.added.is_empty()
        && record.added.iter().all(|n| is_badge(page, *n))
}

fn is_badge<P: PageView + ?Sized>(page: &P, node: NodeId) -> bool {
    page.attribute(node, KIND_ATTRIBUTE).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use dom::{Document, parse_document};
    use url::Url;

    const WINDOW: Duration = Duration::from_millis(500);

    fn page() -> Document {
        parse_document(
            Url::parse("https://store.steampowered.com/").unwrap(),
            r#"<div id="list"></div>"#,
        )
    }

    fn list(doc: &Document) -> NodeId {
        doc.query_first(doc.root(), &dom::SelectorList::parse("#list").unwrap())
            .unwrap()
    }

    #[test]
    fn bursts_inside_window_coalesce() {
        let mut d = Debouncer::new(WINDOW);
        let t0 = Instant::now();
        d.poke(t0);
        d.poke(t0 + Duration::from_millis(200));
        d.poke(t0 + Duration::from_millis(400));
        assert!(!d.fire_if_due(t0 + Duration::from_millis(800)));
        assert!(d.fire_if_due(t0 + Duration::from_millis(900)));
        assert!(!d.fire_if_due(t0 + Duration::from_millis(2000)));

        d.poke(t0 + Duration::from_millis(3000));
        assert!(d.fire_if_due(t0 + Duration::from_millis(3500)));
    }

    #[test]
    fn idle_watcher_ignores_mutations() {
        let mut doc = page();
        let mut w = MutationWatcher::new(WINDOW);
        let target = list(&doc);
        doc.append_html(target, "<a href=\"/app/1/\">x</a>").unwrap();
        assert!(!w.collect(&mut doc, Instant::now()));
        assert_eq!(w.state(), WatcherState::Idle);
    }

    #[test]
    fn host_mutations_arm_badge_mutations_do_not() {
        let mut doc = page();
        let mut w = MutationWatcher::new(WINDOW);
        w.attach(&mut doc);
        let first = w.state();
        w.attach(&mut doc);
        assert_eq!(w.state(), first);

        let target = list(&doc);
        let now = Instant::now();

        let badge = doc.create_element("div");
        doc.set_attribute(badge, KIND_ATTRIBUTE, "tier").unwrap();
        doc.append_child(target, badge).unwrap();
        assert!(!w.collect(&mut doc, now));
        assert_eq!(w.deadline(), None);

        doc.append_html(target, "<a href=\"/app/2/\">y</a>").unwrap();
        assert!(w.collect(&mut doc, now));
        assert_eq!(w.deadline(), Some(now + WINDOW));
        assert!(w.due(now + WINDOW));
        assert_eq!(w.bursts(), 1);
    }
}
