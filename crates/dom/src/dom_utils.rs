use crate::document::Document;
use crate::tokenizer::is_void_element;
use crate::types::{NodeId, NodeKind};

/// Indented one-line-per-node summary, capped at `cap` lines.
pub fn outline(doc: &Document, root: NodeId, cap: usize) -> Vec<String> {
    fn walk(doc: &Document, node: NodeId, depth: usize, out: &mut Vec<String>, left: &mut usize) {
        if *left == 0 {
            return;
        }
        *left -= 1;
        let indent = "  ".repeat(depth);
        match doc.kind(node) {
            Some(NodeKind::Document { doctype }) => {
                match doctype {
                    Some(dt) => out.push(format!("{indent}<!{dt}>")),
                    None => out.push(format!("{indent}#document")),
                }
            }
            Some(NodeKind::Element { name, .. }) => {
                let mut line = format!("{indent}<{name}");
                for key in ["id", "class"] {
                    if let Some(value) = doc.attribute(node, key).filter(|v| !v.is_empty()) {
                        line.push_str(&format!(r#" {key}="{value}""#));
                    }
                }
                line.push('>');
                out.push(line);
            }
            Some(NodeKind::Text { text }) => {
                let t = text.replace('\n', " ").trim().to_string();
                if !t.is_empty() {
                    out.push(format!("{indent}\"{}\"", clip(&t, 40)));
                }
            }
            Some(NodeKind::Comment { text }) => {
                out.push(format!("{indent}<!-- {} -->", clip(&text.replace('\n', " "), 40)));
            }
            None => {}
        }
        for child in doc.children(node) {
            walk(doc, *child, depth + 1, out, left);
        }
    }

    let mut out = Vec::new();
    let mut left = cap;
    walk(doc, root, 0, &mut out, &mut left);
    out
}

fn clip(s: &str, max_chars: usize) -> String {
    if s.chars().count() > max_chars {
        let head: String = s.chars().take(max_chars).collect();
        format!("{head}…")
    } else {
        s.to_string()
    }
}

/// Serialize the subtree at `node` back to markup.
pub fn to_html(doc: &Document, node: NodeId) -> String {
    let mut out = String::new();
    write_node(doc, node, &mut out);
    out
}

fn write_node(doc: &Document, node: NodeId, out: &mut String) {
    match doc.kind(node) {
        Some(NodeKind::Document { doctype }) => {
            if let Some(dt) = doctype {
                out.push_str(&format!("<!{dt}>"));
            }
            for child in doc.children(node) {
                write_node(doc, *child, out);
            }
        }
        Some(NodeKind::Element { name, attributes }) => {
            out.push('<');
            out.push_str(name);
            for (key, value) in attributes {
                out.push(' ');
                out.push_str(key);
                if let Some(v) = value {
                    out.push_str("=\"");
                    escape_into(v, true, out);
                    out.push('"');
                }
            }
            out.push('>');
            if is_void_element(name) {
                return;
            }
            for child in doc.children(node) {
                write_node(doc, *child, out);
            }
            out.push_str("</");
            out.push_str(name);
            out.push('>');
        }
        Some(NodeKind::Text { text }) => escape_into(text, false, out),
        Some(NodeKind::Comment { text }) => {
            out.push_str("<!--");
            out.push_str(text);
            out.push_str("-->");
        }
        None => {}
    }
}

fn escape_into(s: &str, attribute: bool, out: &mut String) {
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::parse_document;
    use url::Url;

    #[test]
    fn serializes_what_it_parsed() {
        let html = r#"<div class="x" hidden><img src="a.png"><span title="&quot;q&quot;">a &amp; b</span></div>"#;
        let doc = parse_document(Url::parse("https://example.com/").unwrap(), html);
        assert_eq!(to_html(&doc, doc.root()), html);
    }

    #[test]
    fn outline_is_capped() {
        let doc = parse_document(
            Url::parse("https://example.com/").unwrap(),
            "<div id=a><span class=b>text</span><p>more</p></div>",
        );
        let lines = outline(&doc, doc.root(), 3);
        assert_eq!(
            lines,
            vec![
                "#document".to_string(),
                r#"  <div id="a">"#.to_string(),
                r#"    <span class="b">"#.to_string(),
            ]
        );
    }
}
