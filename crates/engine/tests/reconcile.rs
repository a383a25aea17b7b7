mod common;

use common::Harness;
use bus::{RelayCommand, RelayEvent};
use core_types::{AppId, CompatibilityRecord};
use dom::{Document, parse_document};
use engine::{EngineConfig, EntryState, Session};
use url::Url;

const LISTING: &str = "https://store.steampowered.com/";

#[test]
fn repeated_passes_change_nothing() {
    let html = r#"<a data-ds-appid="10" href="/app/10/"><div class="discount_block"></div></a>
                  <a href="/app/20/">Half-Life</a>"#;
    let mut h = Harness::new(LISTING, html).rated(10, "gold").rated(20, "borked");
    h.start();
    h.settle();
    let once = h.badges();
    assert_eq!(once.len(), 2);

    for _ in 0..3 {
        let report = h.reconcile();
        assert_eq!(report.started, 0);
        h.settle();
    }
    assert_eq!(h.badges(), once);
    assert_eq!(h.fetches.len(), 2);
}

#[test]
fn one_fetch_for_entries_sharing_an_identifier() {
    let html = r#"<div class="home_area_spotlight" data-ds-appid="440"></div>
                  <a class="capsule" href="https://store.steampowered.com/app/440/">TF2</a>
                  <a class="capsule" href="https://store.steampowered.com/app/440/?snr=1">TF2</a>"#;
    let mut h = Harness::new(LISTING, html).rated(440, "platinum");
    let report = h.start();
    assert_eq!(report.started, 3);
    assert_eq!(h.fetches, vec![AppId::from(440)]);
    assert_eq!(h.held(), 1);

    h.settle();
    assert_eq!(h.fetches.len(), 1);
    let badges = h.badges();
    assert_eq!(badges.len(), 3, "every waiting entry is badged");
    assert!(badges.iter().all(|b| b.text == "P"));
}

#[test]
fn late_entry_for_a_cached_identifier_is_badged_without_a_request() {
    let mut h = Harness::new(LISTING, r#"<div id="list"><a href="/app/30/">A</a></div>"#)
        .rated(30, "silver");
    h.start();
    h.settle();

    let list = h.first("#list");
    h.session
        .page_mut()
        .append_html(list, r#"<a href="/app/30/?again">A</a>"#)
        .unwrap();
    let report = h.reconcile();
    assert_eq!(report.started, 1);
    assert_eq!(report.badges, 1);
    assert_eq!(h.fetches.len(), 1);
    assert_eq!(h.badges().len(), 2);
}

#[test]
fn absent_tier_and_failures_produce_no_badge() {
    let html = r#"<a href="/app/1/">a</a><a href="/app/2/">b</a><a href="/app/3/">c</a>"#;
    let mut h = Harness::new(LISTING, html).untiered(1).unknown(2).failing(3);
    h.start();
    h.settle();
    assert!(h.badges().is_empty());
    assert_eq!(h.session.ledger().count(EntryState::Done), 3);

    h.reconcile();
    h.settle();
    assert_eq!(h.fetches.len(), 3, "misses and failures are cached");
}

#[test]
fn attribute_wins_over_link_on_the_same_element() {
    let html = r#"<a data-ds-appid="10,20" href="https://store.steampowered.com/app/99/">x</a>"#;
    let mut h = Harness::new(LISTING, html).rated(10, "gold").rated(99, "bronze");
    let report = h.start();
    assert_eq!(report.started, 1);
    h.settle();
    assert_eq!(h.fetches, vec![AppId::from(10)]);
    let badges = h.badges();
    assert_eq!(badges.len(), 1);
    assert_eq!(
        badges[0].opened.as_deref(),
        Some("https://www.protondb.com/app/10")
    );
}

#[test]
fn empty_attribute_leaves_the_entry_to_its_link() {
    let html = r#"<a data-ds-appid="" href="https://store.steampowered.com/app/730/">CS2</a>"#;
    let mut h = Harness::new(LISTING, html).rated(730, "gold");
    let report = h.start();
    assert_eq!(report.started, 1);
    h.settle();
    assert_eq!(h.fetches, vec![AppId::from(730)]);
    let badges = h.badges();
    assert_eq!(badges.len(), 1);
    assert_eq!(badges[0].text, "G");
}

#[test]
fn badge_does_not_trigger_entry_navigation() {
    let mut h = Harness::new(LISTING, r#"<a href="/app/50/">x</a>"#).rated(50, "gold");
    h.start();
    h.settle();
    let entry = h.first("a");
    let badge = h.badges()[0].node;

    let through_badge = h.doc().click(badge);
    assert!(through_badge.default_prevented);
    assert_eq!(through_badge.navigated, None);

    let on_entry = h.doc().click(entry);
    assert_eq!(
        on_entry.navigated.as_deref(),
        Some("https://store.steampowered.com/app/50/")
    );
}

#[test]
fn answer_for_a_removed_entry_is_harmless() {
    let mut h = Harness::new(LISTING, r#"<div id="row"><a href="/app/70/">x</a></div>"#)
        .rated(70, "gold");
    h.start();
    let row = h.first("#row");
    h.session.page_mut().clear_children(row).unwrap();
    h.settle();
    assert!(h.badges().is_empty());
    assert_eq!(h.session.pending(), 0);
}

#[test]
fn dead_relay_settles_requests_as_misses() {
    let doc: Document = parse_document(Url::parse(LISTING).unwrap(), r#"<a href="/app/5/">x</a>"#);
    let (bus, ends) = bus::channel();
    drop(ends);
    let mut session = Session::new(doc, &EngineConfig::builtin().unwrap(), bus.cmd_tx, bus.evt_rx)
        .unwrap();
    let report = session.start();
    assert_eq!(report.started, 1);
    assert_eq!(session.pending(), 0);
    assert_eq!(session.ledger().count(EntryState::Done), 1);
    assert_eq!(session.relay().compatibility_sent(), 0);
}

#[test]
fn relay_lost_mid_session_keeps_badges_and_settles_the_rest() {
    let doc = parse_document(
        Url::parse(LISTING).unwrap(),
        r#"<a href="/app/1/">A</a><a href="/app/2/">B</a>"#,
    );
    let (bus, ends) = bus::channel();
    let mut session = Session::new(doc, &EngineConfig::builtin().unwrap(), bus.cmd_tx, bus.evt_rx)
        .unwrap();
    session.start();
    let request_id = ends
        .cmd_rx
        .try_iter()
        .find_map(|cmd| match cmd {
            RelayCommand::FetchCompatibility { request_id, app_id } if app_id == AppId::from(1) => {
                Some(request_id)
            }
            _ => None,
        })
        .unwrap();
    ends.evt_tx
        .send(RelayEvent::Compatibility {
            request_id,
            app_id: AppId::from(1),
            result: Ok(Some(CompatibilityRecord::with_tier("gold"))),
        })
        .unwrap();
    drop(ends);

    assert_eq!(session.pump(), 1);
    assert_eq!(session.pending(), 0);
    assert_eq!(session.ledger().count(EntryState::Done), 2);
    let summary = session.summary();
    assert_eq!(summary.badges, 1);
    assert_eq!(summary.pending, 0);
}

#[test]
fn unsupported_hosts_are_rejected() {
    let doc = parse_document(Url::parse("https://www.gog.com/").unwrap(), "<p></p>");
    let (bus, _ends) = bus::channel();
    let err = Session::new(doc, &EngineConfig::builtin().unwrap(), bus.cmd_tx, bus.evt_rx)
        .err()
        .unwrap();
    assert!(err.to_string().contains("gog.com"));
}
