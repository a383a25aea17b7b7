//! CSS selector subset used by site configuration.
//!
//! Supported: type (`div`), universal (`*`), `#id`, `.class`, attribute
//! selectors `[a]`, `[a=v]`, `[a*=v]`, `[a^=v]`, `[a$=v]`, `[a~=v]`,
//! descendant and child (`>`) combinators, and comma-separated lists.
use crate::document::Document;
use crate::error::SelectorError;
use crate::types::NodeId;
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectorList {
    source: String,
    selectors: Vec<ComplexSelector>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct ComplexSelector {
    // Each compound carries the combinator linking it to the previous one.
    parts: Vec<(Compound, Option<Combinator>)>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attributes: Vec<AttributeSelector>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct AttributeSelector {
    name: String,
    test: Option<(AttributeOp, String)>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum AttributeOp {
    Equals,
    Contains,
    Prefix,
    Suffix,
    Includes,
}

impl SelectorList {
    pub fn parse(input: &str) -> Result<Self, SelectorError> {
        let mut parser = Parser { input, pos: 0 };
        let mut selectors = Vec::new();
        loop {
            parser.skip_whitespace();
            selectors.push(parser.complex()?);
            parser.skip_whitespace();
            match parser.peek() {
                None => break,
                Some(b',') => parser.pos += 1,
                Some(_) => return Err(parser.error("expected ',' or end of selector")),
            }
        }
        Ok(Self {
            source: input.trim().to_string(),
            selectors,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn matches(&self, doc: &Document, node: NodeId) -> bool {
        doc.is_element(node) && self.selectors.iter().any(|s| s.matches(doc, node))
    }
}

impl FromStr for SelectorList {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for SelectorList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl ComplexSelector {
    fn matches(&self, doc: &Document, node: NodeId) -> bool {
        self.matches_at(doc, node, self.parts.len() - 1)
    }

    // Right-to-left, backtracking over ancestors for descendant combinators.
    fn matches_at(&self, doc: &Document, node: NodeId, index: usize) -> bool {
        let (compound, combinator) = &self.parts[index];
        if !compound.matches(doc, node) {
            return false;
        }
        if index == 0 {
            return true;
        }
        match combinator {
            Some(Combinator::Child) => doc
                .parent(node)
                .is_some_and(|p| doc.is_element(p) && self.matches_at(doc, p, index - 1)),
            _ => doc
                .ancestors(node)
                .filter(|a| doc.is_element(*a))
                .any(|a| self.matches_at(doc, a, index - 1)),
        }
    }
}

impl Compound {
    fn matches(&self, doc: &Document, node: NodeId) -> bool {
        let Some(name) = doc.tag_name(node) else {
            return false;
        };
        if let Some(tag) = &self.tag {
            if !name.eq_ignore_ascii_case(tag) {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if doc.attribute(node, "id") != Some(id.as_str()) {
                return false;
            }
        }
        if !self.classes.iter().all(|c| doc.has_class(node, c)) {
            return false;
        }
        self.attributes.iter().all(|a| a.matches(doc, node))
    }
}

impl AttributeSelector {
    fn matches(&self, doc: &Document, node: NodeId) -> bool {
        let Some(value) = doc.attribute(node, &self.name) else {
            return false;
        };
        let Some((op, want)) = &self.test else {
            return true;
        };
        match op {
            AttributeOp::Equals => value == want,
            AttributeOp::Contains => !want.is_empty() && value.contains(want.as_str()),
            AttributeOp::Prefix => !want.is_empty() && value.starts_with(want.as_str()),
            AttributeOp::Suffix => !want.is_empty() && value.ends_with(want.as_str()),
            AttributeOp::Includes => value.split_whitespace().any(|w| w == want),
        }
    }
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<u8> {
        self.input.as_bytes().get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(|b| b.is_ascii_whitespace()) {
            self.pos += 1;
        }
        self.pos > start
    }

    fn error(&self, reason: &'static str) -> SelectorError {
        SelectorError {
            selector: self.input.to_string(),
            position: self.pos,
            reason,
        }
    }

    fn complex(&mut self) -> Result<ComplexSelector, SelectorError> {
        let mut parts = vec![(self.compound()?, None)];
        loop {
            let had_space = self.skip_whitespace();
            match self.peek() {
                None | Some(b',') => break,
                Some(b'>') => {
                    self.pos += 1;
                    self.skip_whitespace();
                    parts.push((self.compound()?, Some(Combinator::Child)));
                }
                Some(_) if had_space => {
                    parts.push((self.compound()?, Some(Combinator::Descendant)));
                }
                Some(_) => return Err(self.error("unexpected character")),
            }
        }
        Ok(ComplexSelector { parts })
    }

    fn compound(&mut self) -> Result<Compound, SelectorError> {
        let start = self.pos;
        let mut compound = Compound::default();
        if self.peek() == Some(b'*') {
            self.pos += 1;
        } else if self.peek().is_some_and(is_ident_byte) {
            compound.tag = Some(self.ident()?.to_ascii_lowercase());
        }
        loop {
            match self.peek() {
                Some(b'.') => {
                    self.pos += 1;
                    let class = self.ident()?;
                    compound.classes.push(class);
                }
                Some(b'#') => {
                    self.pos += 1;
                    compound.id = Some(self.ident()?);
                }
                Some(b'[') => {
                    self.pos += 1;
                    compound.attributes.push(self.attribute()?);
                }
                _ => break,
            }
        }
        if self.pos == start {
            return Err(self.error("expected a simple selector"));
        }
        Ok(compound)
    }

    fn ident(&mut self) -> Result<String, SelectorError> {
        let start = self.pos;
        while self.peek().is_some_and(is_ident_byte) {
            self.pos += 1;
        }
        if self.pos == start {
            return Err(self.error("expected an identifier"));
        }
        Ok(self.input[start..self.pos].to_string())
    }

    fn attribute(&mut self) -> Result<AttributeSelector, SelectorError> {
        self.skip_whitespace();
        let name = self.ident()?.to_ascii_lowercase();
        self.skip_whitespace();
        let op = match self.peek() {
            Some(b']') => {
                self.pos += 1;
                return Ok(AttributeSelector { name, test: None });
            }
            Some(b'=') => AttributeOp::Equals,
            Some(b'*') => AttributeOp::Contains,
            Some(b'^') => AttributeOp::Prefix,
            Some(b'$') => AttributeOp::Suffix,
            Some(b'~') => AttributeOp::Includes,
            _ => return Err(self.error("expected an attribute operator")),
        };
        self.pos += if op == AttributeOp::Equals { 1 } else { 2 };
        if op != AttributeOp::Equals && self.input.as_bytes().get(self.pos - 1) != Some(&b'=') {
            return Err(self.error("expected '='"));
        }
        self.skip_whitespace();
        let value = match self.peek() {
            Some(quote @ (b'"' | b'\'')) => {
                self.pos += 1;
                let start = self.pos;
                while self.peek().is_some_and(|b| b != quote) {
                    self.pos += 1;
                }
                if self.peek().is_none() {
                    return Err(self.error("unterminated string"));
                }
                let value = self.input[start..self.pos].to_string();
                self.pos += 1;
                value
            }
            _ => self.ident()?,
        };
        self.skip_whitespace();
        if self.peek() != Some(b']') {
            return Err(self.error("expected ']'"));
        }
        self.pos += 1;
        Ok(AttributeSelector {
            name,
            test: Some((op, value)),
        })
    }
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b'_'
}
