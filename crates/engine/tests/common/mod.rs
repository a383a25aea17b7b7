//! Scripted relay harness: a session over a parsed fixture whose relay
//! commands are answered from in-memory tables.
#![allow(dead_code)]

use std::collections::HashMap;

use bus::{RelayCommand, RelayEnds, RelayError, RelayEvent};
use core_types::{AppId, CompatibilityRecord, Title};
use dom::{Document, NodeId, SelectorList, parse_document};
use engine::{EngineConfig, KIND_ATTRIBUTE, Session};
use url::Url;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SeenBadge {
    pub node: NodeId,
    pub kind: String,
    pub text: String,
    pub parent: Option<NodeId>,
    pub opened: Option<String>,
}

pub struct Harness {
    pub session: Session<Document>,
    ends: RelayEnds,
    ratings: HashMap<AppId, Result<Option<CompatibilityRecord>, RelayError>>,
    titles: HashMap<Title, Result<AppId, RelayError>>,
    held: Vec<RelayCommand>,
    pub fetches: Vec<AppId>,
    pub lookups: Vec<Title>,
}

impl Harness {
    pub fn new(url: &str, html: &str) -> Self {
        Self::with_config(url, html, &EngineConfig::builtin().unwrap())
    }

    pub fn with_config(url: &str, html: &str, config: &EngineConfig) -> Self {
        let doc = parse_document(Url::parse(url).unwrap(), html);
        let (bus, ends) = bus::channel();
        let session = Session::new(doc, config, bus.cmd_tx, bus.evt_rx).unwrap();
        Self {
            session,
            ends,
            ratings: HashMap::new(),
            titles: HashMap::new(),
            held: Vec::new(),
            fetches: Vec::new(),
            lookups: Vec::new(),
        }
    }

    pub fn rated(mut self, id: u64, tier: &str) -> Self {
        self.ratings
            .insert(AppId::from(id), Ok(Some(CompatibilityRecord::with_tier(tier))));
        self
    }

    /// The rating service knows the title but has no tier for it.
    pub fn untiered(mut self, id: u64) -> Self {
        self.ratings
            .insert(AppId::from(id), Ok(Some(CompatibilityRecord::default())));
        self
    }

    /// Upstream 404.
    pub fn unknown(mut self, id: u64) -> Self {
        self.ratings.insert(AppId::from(id), Ok(None));
        self
    }

    pub fn failing(mut self, id: u64) -> Self {
        self.ratings
            .insert(AppId::from(id), Err(RelayError::Transport("connection reset".into())));
        self
    }

    pub fn titled(mut self, title: &str, id: u64) -> Self {
        self.titles
            .insert(Title::new(title).unwrap(), Ok(AppId::from(id)));
        self
    }

    pub fn start(&mut self) -> engine::PassReport {
        let report = self.session.start();
        self.collect();
        report
    }

    pub fn reconcile(&mut self) -> engine::PassReport {
        let report = self.session.reconcile();
        self.collect();
        report
    }

    /// Move commands from the channel into the held queue.
    pub fn collect(&mut self) {
        for cmd in self.ends.cmd_rx.try_iter() {
            match &cmd {
                RelayCommand::FetchCompatibility { app_id, .. } => self.fetches.push(app_id.clone()),
                RelayCommand::ResolveIdentifier { title, .. } => self.lookups.push(title.clone()),
                RelayCommand::Shutdown => continue,
            }
            self.held.push(cmd);
        }
    }

    pub fn held(&self) -> usize {
        self.held.len()
    }

    /// Answer every held command (and any they trigger) and pump the
    /// answers into the session.
    pub fn settle(&mut self) {
        loop {
            self.collect();
            if self.held.is_empty() {
                return;
            }
            for cmd in std::mem::take(&mut self.held) {
                let event = self.answer(cmd);
                self.ends.evt_tx.send(event).unwrap();
            }
            self.session.pump();
        }
    }

    fn answer(&self, cmd: RelayCommand) -> RelayEvent {
        match cmd {
            RelayCommand::FetchCompatibility { request_id, app_id } => RelayEvent::Compatibility {
                request_id,
                result: self
                    .ratings
                    .get(&app_id)
                    .cloned()
                    .unwrap_or(Err(RelayError::Status(500))),
                app_id,
            },
            RelayCommand::ResolveIdentifier { request_id, title } => RelayEvent::Identifier {
                request_id,
                result: self
                    .titles
                    .get(&title)
                    .cloned()
                    .unwrap_or(Err(RelayError::NoMatch)),
                title,
            },
            RelayCommand::Shutdown => unreachable!("shutdown is never held"),
        }
    }

    pub fn doc(&self) -> &Document {
        self.session.page()
    }

    pub fn first(&self, selector: &str) -> NodeId {
        let doc = self.doc();
        doc.query_first(doc.root(), &SelectorList::parse(selector).unwrap())
            .unwrap_or_else(|| panic!("no element matches {selector}"))
    }

    pub fn badges(&self) -> Vec<SeenBadge> {
        let doc = self.doc();
        let badges = SelectorList::parse(&format!("[{KIND_ATTRIBUTE}]")).unwrap();
        doc.query_all(doc.root(), &badges)
            .into_iter()
            .map(|node| SeenBadge {
                node,
                kind: doc.attribute(node, KIND_ATTRIBUTE).unwrap_or_default().to_string(),
                text: doc.text_content(node),
                parent: doc.parent(node),
                opened: doc.click(node).opened,
            })
            .collect()
    }
}
