use std::fmt;

pub type RequestId = u64;

/// Storefront identifier in the rating service's namespace (a Steam app id).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AppId(String);

impl AppId {
    /// Accepts a non-empty run of ASCII digits, surrounding whitespace ignored.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        Some(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<u64> for AppId {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for AppId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Free-text game title scraped from a page.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Title(String);

impl Title {
    pub fn new(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Title {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Support tier name as reported by the rating service ("platinum", "gold", ...).
///
/// Kept as a normalized string: the service may add tiers and the engine
/// only needs the name for labels and class names.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Tier(String);

impl Tier {
    pub fn new(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(Self(trimmed.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// "PLATINUM" for the full label.
    pub fn shout(&self) -> String {
        self.0.to_uppercase()
    }

    /// Single-letter abbreviation used by small badges.
    pub fn initial(&self) -> String {
        self.0
            .chars()
            .next()
            .map(|c| c.to_uppercase().collect())
            .unwrap_or_default()
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Summary returned by the rating service for one identifier.
///
/// `tier == None` is a valid "no rating" answer and must not produce a badge.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CompatibilityRecord {
    pub tier: Option<Tier>,
    pub best_reported_tier: Option<Tier>,
    pub trending_tier: Option<Tier>,
    pub confidence: Option<String>,
    pub score: Option<f64>,
    pub total: Option<u64>,
}

impl CompatibilityRecord {
    pub fn with_tier(tier: &str) -> Self {
        Self {
            tier: Tier::new(tier),
            ..Self::default()
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SizeMode {
    Small,
    Full,
}

/// Badge category; at most one badge per kind lives under an injection target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BadgeKind {
    Native,
    Tier,
}

impl BadgeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            BadgeKind::Native => "native",
            BadgeKind::Tier => "tier",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SiteKind {
    SteamApp,
    SteamListing,
    Epic,
}

impl fmt::Display for SiteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SiteKind::SteamApp => "steam-app",
            SiteKind::SteamListing => "steam-listing",
            SiteKind::Epic => "epic",
        };
        f.write_str(name)
    }
}
