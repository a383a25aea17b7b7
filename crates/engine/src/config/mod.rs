//! Engine configuration.
//!
//! Selector lists and per-site timings are data: a built-in profile ships in
//! `default.toml` and a user file may override any subset of it. Every
//! selector is compiled while loading, so a bad one fails here and not in the
//! middle of a page session.

use std::fmt;
use std::time::Duration;

use dom::{SelectorError, SelectorList};
use serde::Deserialize;

use crate::error::EngineError;

const BUILTIN: &str = include_str!("default.toml");

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    pub steam: SteamConfig,
    pub epic: EpicConfig,
    pub badge: BadgeConfig,
    pub relay: RelaySettings,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SteamConfig {
    /// Host suffixes served by the Steam adapters.
    pub hosts: Vec<String>,
    /// Path prefix that marks a single-title detail page.
    pub detail_path_prefix: String,
    pub detail_title: Selector,
    /// Attribute carrying comma-separated identifiers on listing entries.
    pub listing_attribute: String,
    pub listing_links: Selector,
    /// Tried in order inside an entry; the first hit receives the badge.
    pub price_containers: Vec<Selector>,
    pub card_containers: Selector,
    /// Native platform icons inside a listing entry or its card.
    pub platform_icons: Selector,
    /// Native platform icons in the detail page's own purchase area.
    pub detail_platform_icons: Selector,
    pub debounce_ms: u64,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EpicConfig {
    pub hosts: Vec<String>,
    /// Tried in order; the first match with non-empty text is the title.
    pub title_selectors: Vec<Selector>,
    /// Title elements with these tags take the badge inside; others get it
    /// appended to their parent.
    pub inline_title_tags: Vec<String>,
    pub debounce_ms: u64,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BadgeConfig {
    /// Rating service page prefix; the identifier is appended.
    pub service_url: String,
    pub label_prefix: String,
    pub native_label: String,
    pub base_class: String,
    pub tier_class_prefix: String,
    pub native_class: String,
    pub tooltip_prefix: String,
    pub native_tooltip: String,
    /// Classes of price containers that are switched to inline flex layout.
    pub inline_containers: Vec<String>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RelaySettings {
    pub summary_url: String,
    pub search_url: String,
    pub language: String,
    pub country: String,
    #[serde(default)]
    pub user_agent: Option<String>,
    pub timeout_secs: u64,
}

impl SteamConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl EpicConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl RelaySettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl EngineConfig {
    pub fn builtin() -> Result<Self, EngineError> {
        Ok(toml::from_str(BUILTIN)?)
    }

    /// Layers `overrides` on the built-in profile. Tables merge key by key;
    /// arrays and scalars replace.
    pub fn with_overrides(overrides: &str) -> Result<Self, EngineError> {
        let mut base: toml::Table = toml::from_str(BUILTIN)?;
        let user: toml::Table = toml::from_str(overrides)?;
        merge_tables(&mut base, user);
        Ok(toml::Value::Table(base).try_into()?)
    }
}

fn merge_tables(base: &mut toml::Table, overrides: toml::Table) {
    for (key, value) in overrides {
        match value {
            toml::Value::Table(from) if matches!(base.get(&key), Some(toml::Value::Table(_))) => {
                if let Some(toml::Value::Table(into)) = base.get_mut(&key) {
                    merge_tables(into, from);
                }
            }
            value => {
                base.insert(key, value);
            }
        }
    }
}

/// A selector list compiled at load time.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub struct Selector(SelectorList);

impl Selector {
    pub fn parse(source: &str) -> Result<Self, SelectorError> {
        SelectorList::parse(source).map(Self)
    }

    pub fn list(&self) -> &SelectorList {
        &self.0
    }
}

impl TryFrom<String> for Selector {
    type Error = SelectorError;

    fn try_from(source: String) -> Result<Self, Self::Error> {
        Self::parse(&source)
    }
}

impl fmt::Debug for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Selector({:?})", self.0.as_str())
    }
}
