//! Upstream JSON shapes. Only the fields the relay forwards are modeled;
//! everything else in the payload is ignored.

use core_types::{AppId, CompatibilityRecord, Tier};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SummaryWire {
    #[serde(default)]
    tier: Option<String>,
    #[serde(default)]
    best_reported_tier: Option<String>,
    #[serde(default)]
    trending_tier: Option<String>,
    #[serde(default)]
    confidence: Option<String>,
    #[serde(default)]
    score: Option<f64>,
    #[serde(default)]
    total: Option<u64>,
}

impl From<SummaryWire> for CompatibilityRecord {
    fn from(wire: SummaryWire) -> Self {
        let tier = |raw: Option<String>| raw.as_deref().and_then(Tier::new);
        CompatibilityRecord {
            tier: tier(wire.tier),
            best_reported_tier: tier(wire.best_reported_tier),
            trending_tier: tier(wire.trending_tier),
            confidence: wire.confidence,
            score: wire.score,
            total: wire.total,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct SearchWire {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SearchItem {
    pub id: WireId,
}

/// The catalog sends numeric ids; some mirrors quote them.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum WireId {
    Number(u64),
    Text(String),
}

impl WireId {
    pub fn to_app_id(&self) -> Option<AppId> {
        match self {
            WireId::Number(n) => Some(AppId::from(*n)),
            WireId::Text(s) => AppId::parse(s),
        }
    }
}

impl SearchWire {
    pub fn first_match(&self) -> Option<AppId> {
        if self.total == 0 {
            return None;
        }
        self.items.first().and_then(|item| item.id.to_app_id())
    }
}
