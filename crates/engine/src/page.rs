//! The page capability the engine runs against.
//!
//! Everything the engine reads from or writes to a storefront page goes
//! through [`PageView`], so reconciliation can be driven against the synthetic
//! [`dom::Document`] in tests and in the CLI alike.

use dom::{Activation, Document, DomError, MutationRecord, NodeId, ObserverId, SelectorList};
use url::Url;

pub trait PageView {
    fn url(&self) -> &Url;
    fn root(&self) -> NodeId;

    // queries
    fn query_all(&self, scope: NodeId, selector: &SelectorList) -> Vec<NodeId>;
    fn query_first(&self, scope: NodeId, selector: &SelectorList) -> Option<NodeId>;
    fn closest(&self, node: NodeId, selector: &SelectorList) -> Option<NodeId>;
    fn attribute(&self, node: NodeId, name: &str) -> Option<&str>;
    fn has_class(&self, node: NodeId, class: &str) -> bool;
    fn tag_name(&self, node: NodeId) -> Option<&str>;
    fn parent(&self, node: NodeId) -> Option<NodeId>;
    fn text_content(&self, node: NodeId) -> String;
    fn is_connected(&self, node: NodeId) -> bool;

    // mutation
    fn create_element(&mut self, tag: &str) -> NodeId;
    fn append_text(&mut self, parent: NodeId, text: &str) -> Result<(), DomError>;
    fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError>;
    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> Result<(), DomError>;
    fn set_style_property(&mut self, node: NodeId, name: &str, value: &str)
    -> Result<(), DomError>;
    fn add_activation(&mut self, node: NodeId, activation: Activation);

    // observation
    fn observe(&mut self) -> ObserverId;
    fn take_records(&mut self, observer: ObserverId) -> Vec<MutationRecord>;
}

impl PageView for Document {
    fn url(&self) -> &Url {
        Document::url(self)
    }

    fn root(&self) -> NodeId {
        Document::root(self)
    }

    fn query_all(&self, scope: NodeId, selector: &SelectorList) -> Vec<NodeId> {
        Document::query_all(self, scope, selector)
    }

    fn query_first(&self, scope: NodeId, selector: &SelectorList) -> Option<NodeId> {
        Document::query_first(self, scope, selector)
    }

    fn closest(&self, node: NodeId, selector: &SelectorList) -> Option<NodeId> {
        Document::closest(self, node, selector)
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        Document::attribute(self, node, name)
    }

    fn has_class(&self, node: NodeId, class: &str) -> bool {
        Document::has_class(self, node, class)
    }

    fn tag_name(&self, node: NodeId) -> Option<&str> {
        Document::tag_name(self, node)
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        Document::parent(self, node)
    }

    fn text_content(&self, node: NodeId) -> String {
        Document::text_content(self, node)
    }

    fn is_connected(&self, node: NodeId) -> bool {
        Document::is_connected(self, node)
    }

    fn create_element(&mut self, tag: &str) -> NodeId {
        Document::create_element(self, tag)
    }

    fn append_text(&mut self, parent: NodeId, text: &str) -> Result<(), DomError> {
        let node = self.create_text(text);
        Document::append_child(self, parent, node)
    }

    fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        Document::append_child(self, parent, child)
    }

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> Result<(), DomError> {
        Document::set_attribute(self, node, name, value)
    }

    fn set_style_property(
        &mut self,
        node: NodeId,
        name: &str,
        value: &str,
    ) -> Result<(), DomError> {
        Document::set_style_property(self, node, name, value)
    }

    fn add_activation(&mut self, node: NodeId, activation: Activation) {
        Document::add_activation(self, node, activation)
    }

    fn observe(&mut self) -> ObserverId {
        Document::observe(self)
    }

    fn take_records(&mut self, observer: ObserverId) -> Vec<MutationRecord> {
        Document::take_records(self, observer)
    }
}
