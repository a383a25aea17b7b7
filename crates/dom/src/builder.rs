use crate::document::Document;
use crate::error::DomError;
use crate::tokenizer::tokenize;
use crate::types::{NodeId, Token};
use url::Url;

/// Parse a full page. Top-level nodes become children of the document node;
/// no `<html>`/`<body>` wrappers are synthesized.
pub fn parse_document(url: Url, html: &str) -> Document {
    let mut doc = Document::new(url);
    let root = doc.root();
    let top = build_detached(&mut doc, html);
    for node in top {
        // Freshly built nodes are detached and acyclic, so this cannot fail.
        if let Err(err) = doc.append_child(root, node) {
            log::warn!(target: "dom.builder", "dropping node {node:?}: {err}");
        }
    }
    doc
}

impl Document {
    /// Parse `html` and append the result to `parent`.
    ///
    /// The fragment is assembled off-tree first, so observers see one
    /// record per top-level node rather than one per element.
    pub fn append_html(&mut self, parent: NodeId, html: &str) -> Result<Vec<NodeId>, DomError> {
        let top = build_detached(self, html);
        for node in &top {
            self.append_child(parent, *node)?;
        }
        Ok(top)
    }

    /// Replace the children of `parent` with freshly parsed markup.
    pub fn set_inner_html(&mut self, parent: NodeId, html: &str) -> Result<Vec<NodeId>, DomError> {
        self.clear_children(parent)?;
        self.append_html(parent, html)
    }
}

fn build_detached(doc: &mut Document, html: &str) -> Vec<NodeId> {
    let mut top = Vec::new();
    let mut open: Vec<(NodeId, String)> = Vec::new();

    for token in tokenize(html) {
        let node = match token {
            Token::Doctype(value) => {
                doc.set_doctype(value);
                continue;
            }
            Token::StartTag {
                name,
                attributes,
                self_closing,
            } => {
                let node = doc.create_element_with(&name, attributes);
                attach(doc, &open, &mut top, node);
                if !self_closing {
                    open.push((node, name));
                }
                continue;
            }
            Token::EndTag(name) => {
                // Close the nearest matching element; stray end tags are ignored.
                if let Some(pos) = open.iter().rposition(|(_, n)| *n == name) {
                    open.truncate(pos);
                }
                continue;
            }
            Token::Text(text) => doc.create_text(&text),
            Token::Comment(text) => doc.create_comment(&text),
        };
        attach(doc, &open, &mut top, node);
    }
    top
}

fn attach(doc: &mut Document, open: &[(NodeId, String)], top: &mut Vec<NodeId>, node: NodeId) {
    match open.last() {
        Some((parent, _)) => {
            if let Err(err) = doc.append_child(*parent, node) {
                log::warn!(target: "dom.builder", "dropping node {node:?}: {err}");
            }
        }
        None => top.push(node),
    }
}
