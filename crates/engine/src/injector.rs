use core_types::{AppId, BadgeKind, SizeMode, Tier};
use dom::{Activation, DomError, NodeId, SelectorList};

use crate::config::BadgeConfig;
use crate::error::EngineError;
use crate::page::PageView;

/// Attribute recording a badge's category; the same-category check and the
/// mutation filter both key on it.
pub const KIND_ATTRIBUTE: &str = "data-proton-badge";

const SMALL_STYLE: [(&str, &str); 5] = [
    ("padding", "2px 4px"),
    ("font-size", "10px"),
    ("margin-left", "5px"),
    ("min-width", "15px"),
    ("text-align", "center"),
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Injection {
    Inserted(NodeId),
    /// The target already holds a badge of this category.
    AlreadyPresent,
    /// The target left the page before the answer arrived.
    Detached,
}

/// What a badge shows. Native badges carry no tier.
#[derive(Clone, Copy, Debug)]
pub enum BadgeContent<'a> {
    Native,
    Tier(&'a Tier),
}

impl BadgeContent<'_> {
    pub fn kind(&self) -> BadgeKind {
        match self {
            BadgeContent::Native => BadgeKind::Native,
            BadgeContent::Tier(_) => BadgeKind::Tier,
        }
    }
}

pub struct BadgeInjector {
    config: BadgeConfig,
    native_selector: SelectorList,
    tier_selector: SelectorList,
}

impl BadgeInjector {
    pub fn new(config: &BadgeConfig) -> Result<Self, EngineError> {
        let selector_for = |kind: BadgeKind| {
            SelectorList::parse(&format!("[{KIND_ATTRIBUTE}=\"{}\"]", kind.as_str()))
                .map_err(|source| EngineError::Selector {
                    field: "badge",
                    source,
                })
        };
        Ok(Self {
            config: config.clone(),
            native_selector: selector_for(BadgeKind::Native)?,
            tier_selector: selector_for(BadgeKind::Tier)?,
        })
    }

    pub fn base_class(&self) -> &str {
        &self.config.base_class
    }

    pub fn label(&self, content: BadgeContent<'_>, size: SizeMode) -> String {
        match (content, size) {
            (BadgeContent::Native, SizeMode::Full) => self.config.native_label.clone(),
            (BadgeContent::Native, SizeMode::Small) => initial(&self.config.native_label),
            (BadgeContent::Tier(tier), SizeMode::Full) => {
                format!("{}{}", self.config.label_prefix, tier.shout())
            }
            (BadgeContent::Tier(tier), SizeMode::Small) => tier.initial(),
        }
    }

    pub fn service_url(&self, app_id: &AppId) -> String {
        format!("{}{}", self.config.service_url, app_id)
    }

    pub fn has_badge<P: PageView + ?Sized>(&self, page: &P, target: NodeId, kind: BadgeKind) -> bool {
        let existing = match kind {
            BadgeKind::Native => &self.native_selector,
            BadgeKind::Tier => &self.tier_selector,
        };
        page.query_first(target, existing).is_some()
    }

    /// Append a badge to `target` unless one of the same category is already
    /// there. Native and tier badges coexist.
    pub fn inject<P: PageView + ?Sized>(
        &self,
        page: &mut P,
        target: NodeId,
        content: BadgeContent<'_>,
        app_id: &AppId,
        size: SizeMode,
    ) -> Result<Injection, DomError> {
        if !page.is_connected(target) {
            return Ok(Injection::Detached);
        }
        let kind = content.kind();
        if self.has_badge(page, target, kind) {
            return Ok(Injection::AlreadyPresent);
        }

        let badge = self.build(page, content, app_id, size)?;

        if self
            .config
            .inline_containers
            .iter()
            .any(|class| page.has_class(target, class))
        {
            page.set_style_property(target, "display", "flex")?;
            page.set_style_property(target, "align-items", "center")?;
        }
        page.append_child(target, badge)?;
        log::info!(
            target: "engine.inject",
            "{} badge for {} under {:?}",
            kind.as_str(),
            app_id,
            target
        );
        Ok(Injection::Inserted(badge))
    }

    /// Build a detached badge element.
    fn build<P: PageView + ?Sized>(
        &self,
        page: &mut P,
        content: BadgeContent<'_>,
        app_id: &AppId,
        size: SizeMode,
    ) -> Result<NodeId, DomError> {
        let (class, tooltip) = match content {
            BadgeContent::Native => (
                format!("{} {}", self.config.base_class, self.config.native_class),
                self.config.native_tooltip.clone(),
            ),
            BadgeContent::Tier(tier) => (
                format!(
                    "{} {}{}",
                    self.config.base_class, self.config.tier_class_prefix, tier
                ),
                format!("{}{}", self.config.tooltip_prefix, tier),
            ),
        };

        let badge = page.create_element("div");
        page.set_attribute(badge, "class", &class)?;
        page.set_attribute(badge, KIND_ATTRIBUTE, content.kind().as_str())?;
        page.set_attribute(badge, "title", &tooltip)?;
        if size == SizeMode::Small {
            for (name, value) in SMALL_STYLE {
                page.set_style_property(badge, name, value)?;
            }
        }
        page.set_style_property(badge, "cursor", "pointer")?;
        page.append_text(badge, &self.label(content, size))?;
        page.add_activation(
            badge,
            Activation::OpenInNewContext {
                url: self.service_url(app_id),
            },
        );
        Ok(badge)
    }
}

fn initial(label: &str) -> String {
    label
        .chars()
        .next()
        .map(|c| c.to_uppercase().collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use dom::{Document, parse_document};
    use url::Url;

    fn injector() -> BadgeInjector {
        BadgeInjector::new(&EngineConfig::builtin().unwrap().badge).unwrap()
    }

    fn page(html: &str) -> Document {
        parse_document(Url::parse("https://store.steampowered.com/").unwrap(), html)
    }

    fn sel(s: &str) -> SelectorList {
        SelectorList::parse(s).unwrap()
    }

    #[test]
    fn labels() {
        let inj = injector();
        let tier = Tier::new("platinum").unwrap();
        assert_eq!(inj.label(BadgeContent::Tier(&tier), SizeMode::Full), "Proton: PLATINUM");
        assert_eq!(inj.label(BadgeContent::Tier(&tier), SizeMode::Small), "P");
        assert_eq!(inj.label(BadgeContent::Native, SizeMode::Full), "Native");
        assert_eq!(inj.label(BadgeContent::Native, SizeMode::Small), "N");
    }

    #[test]
    fn full_tier_badge_shape() {
        let inj = injector();
        let mut doc = page(r#"<div class="apphub_AppName">Team Fortress 2</div>"#);
        let target = doc.query_first(doc.root(), &sel(".apphub_AppName")).unwrap();
        let tier = Tier::new("gold").unwrap();

        let Injection::Inserted(badge) = inj
            .inject(&mut doc, target, BadgeContent::Tier(&tier), &AppId::from(440), SizeMode::Full)
            .unwrap()
        else {
            panic!("badge not inserted");
        };
        assert_eq!(doc.parent(badge), Some(target));
        assert_eq!(doc.attribute(badge, "class"), Some("proton-badge proton-tier-gold"));
        assert_eq!(doc.attribute(badge, "title"), Some("ProtonDB Tier: gold"));
        assert_eq!(doc.attribute(badge, KIND_ATTRIBUTE), Some("tier"));
        assert_eq!(doc.text_content(badge), "Proton: GOLD");
        assert_eq!(doc.style_property(badge, "cursor").as_deref(), Some("pointer"));
        assert_eq!(doc.style_property(badge, "font-size"), None);
    }

    #[test]
    fn small_badge_styles_and_click() {
        let inj = injector();
        let mut doc = page(r#"<a href="/app/570/"><div class="col_search_price">$0</div></a>"#);
        let target = doc.query_first(doc.root(), &sel(".col_search_price")).unwrap();
        let tier = Tier::new("platinum").unwrap();
        let Injection::Inserted(badge) = inj
            .inject(&mut doc, target, BadgeContent::Tier(&tier), &AppId::from(570), SizeMode::Small)
            .unwrap()
        else {
            panic!("badge not inserted");
        };
        assert_eq!(doc.text_content(badge), "P");
        assert_eq!(doc.style_property(badge, "padding").as_deref(), Some("2px 4px"));
        assert_eq!(doc.style_property(badge, "margin-left").as_deref(), Some("5px"));
        assert_eq!(doc.style_property(badge, "text-align").as_deref(), Some("center"));

        let outcome = doc.click(badge);
        assert_eq!(outcome.opened.as_deref(), Some("https://www.protondb.com/app/570"));
        assert_eq!(outcome.navigated, None);
        assert!(outcome.default_prevented);
    }

    #[test]
    fn one_badge_per_category_and_categories_coexist() {
        let inj = injector();
        let mut doc = page(r#"<div id="t"></div>"#);
        let target = doc.query_first(doc.root(), &sel("#t")).unwrap();
        let id = AppId::from(10);
        let tier = Tier::new("silver").unwrap();

        let native = inj.inject(&mut doc, target, BadgeContent::Native, &id, SizeMode::Full).unwrap();
        assert!(matches!(native, Injection::Inserted(_)));
        let again = inj.inject(&mut doc, target, BadgeContent::Native, &id, SizeMode::Full).unwrap();
        assert_eq!(again, Injection::AlreadyPresent);

        let tiered = inj
            .inject(&mut doc, target, BadgeContent::Tier(&tier), &id, SizeMode::Full)
            .unwrap();
        assert!(matches!(tiered, Injection::Inserted(_)));
        assert_eq!(doc.query_all(target, &sel(".proton-badge")).len(), 2);
        assert!(inj.has_badge(&doc, target, BadgeKind::Native));
        assert!(inj.has_badge(&doc, target, BadgeKind::Tier));
    }

    #[test]
    fn discount_block_goes_inline_flex() {
        let inj = injector();
        let mut doc = page(r#"<div class="discount_block" style="color: red;"></div>"#);
        let target = doc.query_first(doc.root(), &sel(".discount_block")).unwrap();
        inj.inject(&mut doc, target, BadgeContent::Native, &AppId::from(1), SizeMode::Small)
            .unwrap();
        assert_eq!(doc.style_property(target, "display").as_deref(), Some("flex"));
        assert_eq!(doc.style_property(target, "align-items").as_deref(), Some("center"));
        assert_eq!(doc.style_property(target, "color").as_deref(), Some("red"));
    }

    #[test]
    fn detached_target_is_left_alone() {
        let inj = injector();
        let mut doc = page(r#"<div id="t"></div>"#);
        let target = doc.query_first(doc.root(), &sel("#t")).unwrap();
        doc.remove(target).unwrap();
        let out = inj
            .inject(&mut doc, target, BadgeContent::Native, &AppId::from(1), SizeMode::Full)
            .unwrap();
        assert_eq!(out, Injection::Detached);
        assert!(doc.children(target).is_empty());
    }
}
