//! Arena-backed mutable document with observer and listener support.
//!
//! Invariants:
//! - `NodeId::ROOT` is the document node and is never detached.
//! - A node has at most one parent; operations never create cycles.
//! - Ids are never reused, so a removed node stays addressable (disconnected).
//! - Mutation records are only produced for changes under a connected parent.
use crate::error::DomError;
use crate::selector::SelectorList;
use crate::types::{
    Activation, ClickOutcome, MutationRecord, NodeId, NodeKind, NodeRecord, ObserverId,
};
use std::collections::HashMap;
use url::Url;

pub struct Document {
    url: Url,
    nodes: Vec<NodeRecord>,
    observers: Vec<Option<Vec<MutationRecord>>>,
    listeners: HashMap<NodeId, Activation>,
}

impl Document {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            nodes: vec![NodeRecord::new(NodeKind::Document { doctype: None })],
            observers: Vec::new(),
            listeners: HashMap::new(),
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    pub fn doctype(&self) -> Option<&str> {
        match &self.nodes[0].kind {
            NodeKind::Document { doctype } => doctype.as_deref(),
            _ => None,
        }
    }

    pub(crate) fn set_doctype(&mut self, value: String) {
        if let NodeKind::Document { doctype } = &mut self.nodes[0].kind {
            *doctype = Some(value);
        }
    }

    // --- Construction ---

    pub fn create_element(&mut self, name: &str) -> NodeId {
        self.push(NodeKind::Element {
            name: name.to_ascii_lowercase(),
            attributes: Vec::new(),
        })
    }

    pub fn create_element_with(
        &mut self,
        name: &str,
        attributes: Vec<(String, Option<String>)>,
    ) -> NodeId {
        self.push(NodeKind::Element {
            name: name.to_ascii_lowercase(),
            attributes,
        })
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push(NodeKind::Text {
            text: text.to_string(),
        })
    }

    pub fn create_comment(&mut self, text: &str) -> NodeId {
        self.push(NodeKind::Comment {
            text: text.to_string(),
        })
    }

    fn push(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(NodeRecord::new(kind));
        id
    }

    // --- Tree mutation ---

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.check_insert(parent, child)?;
        self.nodes[parent.index()].children.push(child);
        self.nodes[child.index()].parent = Some(parent);
        self.record(parent, vec![child], Vec::new());
        Ok(())
    }

    /// Detach `node` (and its subtree) from its parent.
    pub fn remove(&mut self, node: NodeId) -> Result<(), DomError> {
        self.record_of(node)?;
        if node == NodeId::ROOT {
            return Err(DomError::RootRemoval);
        }
        let Some(parent) = self.nodes[node.index()].parent.take() else {
            return Ok(());
        };
        self.nodes[parent.index()].children.retain(|k| *k != node);
        self.record(parent, Vec::new(), vec![node]);
        Ok(())
    }

    /// Drop every child of `parent`, as a client-side re-render does before
    /// writing fresh markup.
    pub fn clear_children(&mut self, parent: NodeId) -> Result<(), DomError> {
        self.record_of(parent)?;
        let removed = std::mem::take(&mut self.nodes[parent.index()].children);
        for child in &removed {
            self.nodes[child.index()].parent = None;
        }
        if !removed.is_empty() {
            self.record(parent, Vec::new(), removed);
        }
        Ok(())
    }

    fn check_insert(&self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        let parent_rec = self.record_of(parent)?;
        let child_rec = self.record_of(child)?;
        if !parent_rec.allows_children() {
            return Err(DomError::InvalidParent(parent));
        }
        if child == NodeId::ROOT || child_rec.parent.is_some() {
            return Err(DomError::AlreadyAttached(child));
        }
        if parent == child || self.is_inclusive_ancestor(child, parent) {
            return Err(DomError::CycleDetected { parent, child });
        }
        Ok(())
    }

    fn record_of(&self, node: NodeId) -> Result<&NodeRecord, DomError> {
        self.nodes
            .get(node.index())
            .ok_or(DomError::UnknownNode(node))
    }

    // --- Attributes ---

    pub fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        self.attributes(node)?
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_deref().unwrap_or(""))
    }

    pub fn attributes(&self, node: NodeId) -> Option<&[(String, Option<String>)]> {
        match &self.nodes.get(node.index())?.kind {
            NodeKind::Element { attributes, .. } => Some(attributes),
            _ => None,
        }
    }

    pub fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> Result<(), DomError> {
        let record = self
            .nodes
            .get_mut(node.index())
            .ok_or(DomError::UnknownNode(node))?;
        let NodeKind::Element { attributes, .. } = &mut record.kind else {
            return Err(DomError::NotAnElement(node));
        };
        let name = name.to_ascii_lowercase();
        match attributes.iter_mut().find(|(k, _)| *k == name) {
            Some((_, v)) => *v = Some(value.to_string()),
            None => attributes.push((name, Some(value.to_string()))),
        }
        Ok(())
    }

    pub fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.attribute(node, "class")
            .is_some_and(|list| list.split_whitespace().any(|c| c == class))
    }

    pub fn style_property(&self, node: NodeId, property: &str) -> Option<String> {
        let style = self.attribute(node, "style")?;
        parse_declarations(style)
            .into_iter()
            .find(|(name, _)| name == property)
            .map(|(_, value)| value)
    }

    /// Set one inline style property, keeping the others in order.
    pub fn set_style_property(
        &mut self,
        node: NodeId,
        property: &str,
        value: &str,
    ) -> Result<(), DomError> {
        let property = property.trim().to_ascii_lowercase();
        let mut declarations = self
            .attribute(node, "style")
            .map(parse_declarations)
            .unwrap_or_default();
        match declarations.iter_mut().find(|(name, _)| *name == property) {
            Some((_, v)) => *v = value.to_string(),
            None => declarations.push((property, value.to_string())),
        }
        let css = declarations
            .iter()
            .map(|(k, v)| format!("{k}: {v};"))
            .collect::<Vec<_>>()
            .join(" ");
        self.set_attribute(node, "style", &css)
    }

    // --- Navigation ---

    pub fn tag_name(&self, node: NodeId) -> Option<&str> {
        match &self.nodes.get(node.index())?.kind {
            NodeKind::Element { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn is_element(&self, node: NodeId) -> bool {
        self.tag_name(node).is_some()
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(node.index())?.parent
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.nodes
            .get(node.index())
            .map(|r| r.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn is_connected(&self, node: NodeId) -> bool {
        self.is_inclusive_ancestor(NodeId::ROOT, node)
    }

    fn is_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(n) = current {
            if n == ancestor {
                return true;
            }
            current = self.parent(n);
        }
        false
    }

    /// Ancestors of `node`, closest first, excluding `node` itself.
    pub fn ancestors(&self, node: NodeId) -> Ancestors<'_> {
        Ancestors {
            doc: self,
            next: self.parent(node),
        }
    }

    /// Preorder walk of the subtree below `node`, excluding `node` itself.
    pub fn descendants(&self, node: NodeId) -> Descendants<'_> {
        let mut stack: Vec<NodeId> = self.children(node).to_vec();
        stack.reverse();
        Descendants { doc: self, stack }
    }

    pub fn text_content(&self, node: NodeId) -> String {
        let mut out = String::new();
        if let Some(NodeKind::Text { text }) = self.nodes.get(node.index()).map(|r| &r.kind) {
            out.push_str(text);
        }
        for n in self.descendants(node) {
            if let NodeKind::Text { text } = &self.nodes[n.index()].kind {
                out.push_str(text);
            }
        }
        out
    }

    pub(crate) fn kind(&self, node: NodeId) -> Option<&NodeKind> {
        self.nodes.get(node.index()).map(|r| &r.kind)
    }

    // --- Selectors ---

    pub fn matches(&self, node: NodeId, selector: &SelectorList) -> bool {
        selector.matches(self, node)
    }

    /// Elements below `scope` matching `selector`, in document order.
    pub fn query_all(&self, scope: NodeId, selector: &SelectorList) -> Vec<NodeId> {
        self.descendants(scope)
            .filter(|n| selector.matches(self, *n))
            .collect()
    }

    pub fn query_first(&self, scope: NodeId, selector: &SelectorList) -> Option<NodeId> {
        self.descendants(scope).find(|n| selector.matches(self, *n))
    }

    /// Closest inclusive ancestor matching `selector`.
    pub fn closest(&self, node: NodeId, selector: &SelectorList) -> Option<NodeId> {
        if selector.matches(self, node) {
            return Some(node);
        }
        self.ancestors(node).find(|n| selector.matches(self, *n))
    }

    // --- Observation ---

    /// Start recording childList mutations over the whole document subtree.
    pub fn observe(&mut self) -> ObserverId {
        self.observers.push(Some(Vec::new()));
        ObserverId(self.observers.len() - 1)
    }

    pub fn disconnect(&mut self, observer: ObserverId) {
        if let Some(slot) = self.observers.get_mut(observer.0) {
            *slot = None;
        }
    }

    pub fn take_records(&mut self, observer: ObserverId) -> Vec<MutationRecord> {
        self.observers
            .get_mut(observer.0)
            .and_then(|slot| slot.as_mut())
            .map(std::mem::take)
            .unwrap_or_default()
    }

    fn record(&mut self, target: NodeId, added: Vec<NodeId>, removed: Vec<NodeId>) {
        if self.observers.iter().all(Option::is_none) || !self.is_connected(target) {
            return;
        }
        let record = MutationRecord {
            target,
            added,
            removed,
        };
        for queue in self.observers.iter_mut().flatten() {
            queue.push(record.clone());
        }
    }

    // --- Activation ---

    pub fn add_activation(&mut self, node: NodeId, activation: Activation) {
        self.listeners.insert(node, activation);
    }

    pub fn activation(&self, node: NodeId) -> Option<&Activation> {
        self.listeners.get(&node)
    }

    /// Dispatch a click at `node`: the closest listener handles it and stops
    /// propagation; without one, the closest `<a href>` navigates.
    pub fn click(&self, node: NodeId) -> ClickOutcome {
        let path = std::iter::once(node).chain(self.ancestors(node));
        for n in path {
            if let Some(Activation::OpenInNewContext { url }) = self.listeners.get(&n) {
                return ClickOutcome {
                    opened: Some(url.clone()),
                    navigated: None,
                    default_prevented: true,
                };
            }
            if self.tag_name(n) == Some("a") {
                if let Some(href) = self.attribute(n, "href") {
                    let navigated = self.url.join(href).map(|u| u.to_string()).ok();
                    return ClickOutcome {
                        opened: None,
                        navigated,
                        default_prevented: false,
                    };
                }
            }
        }
        ClickOutcome::default()
    }
}

pub struct Ancestors<'a> {
    doc: &'a Document,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.doc.parent(current);
        Some(current)
    }
}

pub struct Descendants<'a> {
    doc: &'a Document,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.stack.pop()?;
        self.stack
            .extend(self.doc.children(current).iter().rev().copied());
        Some(current)
    }
}

// input: "display: flex; align-items:center"
// output: [("display", "flex"), ("align-items", "center")]
fn parse_declarations(input: &str) -> Vec<(String, String)> {
    input
        .split(';')
        .filter_map(|pair| {
            let (n, v) = pair.split_once(':')?;
            let name = n.trim().to_ascii_lowercase();
            if name.is_empty() {
                return None;
            }
            Some((name, v.trim().to_string()))
        })
        .collect()
}
