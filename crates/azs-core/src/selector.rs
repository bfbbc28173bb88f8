//! Structural match-patterns
//!
//! A deliberately small CSS selector engine. It understands the subset the
//! site tables use (type, `#id`, `.class`, attribute selectors, descendant and
//! child combinators, selector lists) and rejects everything else with a
//! [`SelectorError`] instead of guessing.
//!
//! Matching is done right-to-left against any [`ElementTree`], so the same
//! patterns can be checked against the in-memory fixture and linted offline.

use crate::error::SelectorError;

// =============================================================================
// Tree access
// =============================================================================

/// Read-only element tree access used by the matcher.
pub trait ElementTree {
    type Node: Clone;

    fn parent_element(&self, node: &Self::Node) -> Option<Self::Node>;
    /// Lowercase local name (`div`, `ytd-reel-shelf-renderer`).
    fn local_name(&self, node: &Self::Node) -> String;
    fn attribute(&self, node: &Self::Node, name: &str) -> Option<String>;
}

// =============================================================================
// AST
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttrOp {
    Equals,
    Includes,
    DashMatch,
    Prefix,
    Suffix,
    Substring,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct AttrSelector {
    name: String,
    op: Option<(AttrOp, String)>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    /// Explicit `*`.
    universal: bool,
    /// `None` for `*` or an omitted type.
    tag: Option<String>,
    ids: Vec<String>,
    classes: Vec<String>,
    attrs: Vec<AttrSelector>,
}

/// One complex selector, stored left to right.
/// `combinators[i]` sits between `compounds[i]` and `compounds[i + 1]`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Complex {
    compounds: Vec<Compound>,
    combinators: Vec<Combinator>,
}

/// A parsed, comma-separated selector list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorList {
    selectors: Vec<Complex>,
}

impl SelectorList {
    pub fn parse(pattern: &str) -> Result<Self, SelectorError> {
        Parser::new(pattern).parse_list()
    }

    /// Number of comma-separated alternatives.
    pub fn len(&self) -> usize {
        self.selectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selectors.is_empty()
    }

    pub fn matches<T: ElementTree>(&self, tree: &T, node: &T::Node) -> bool {
        self.selectors
            .iter()
            .any(|complex| complex.matches_at(tree, node, complex.compounds.len() - 1))
    }
}

/// Parse and match in one step.
pub fn matches<T: ElementTree>(tree: &T, node: &T::Node, pattern: &str) -> Result<bool, SelectorError> {
    Ok(SelectorList::parse(pattern)?.matches(tree, node))
}

// =============================================================================
// Matching
// =============================================================================

impl Complex {
    fn matches_at<T: ElementTree>(&self, tree: &T, node: &T::Node, idx: usize) -> bool {
        if !self.compounds[idx].matches(tree, node) {
            return false;
        }
        if idx == 0 {
            return true;
        }

        match self.combinators[idx - 1] {
            Combinator::Child => tree
                .parent_element(node)
                .is_some_and(|parent| self.matches_at(tree, &parent, idx - 1)),
            Combinator::Descendant => {
                let mut current = tree.parent_element(node);
                while let Some(ancestor) = current {
                    if self.matches_at(tree, &ancestor, idx - 1) {
                        return true;
                    }
                    current = tree.parent_element(&ancestor);
                }
                false
            }
        }
    }
}

impl Compound {
    fn is_empty(&self) -> bool {
        !self.universal && self.tag.is_none() && self.ids.is_empty() && self.classes.is_empty() && self.attrs.is_empty()
    }

    fn matches<T: ElementTree>(&self, tree: &T, node: &T::Node) -> bool {
        if let Some(tag) = &self.tag {
            if !tree.local_name(node).eq_ignore_ascii_case(tag) {
                return false;
            }
        }

        if !self.ids.is_empty() {
            let id = tree.attribute(node, "id");
            if !self.ids.iter().all(|want| id.as_deref() == Some(want.as_str())) {
                return false;
            }
        }

        if !self.classes.is_empty() {
            let class = tree.attribute(node, "class").unwrap_or_default();
            if !self
                .classes
                .iter()
                .all(|want| class.split_ascii_whitespace().any(|c| c == want))
            {
                return false;
            }
        }

        self.attrs.iter().all(|attr| attr.matches(tree, node))
    }
}

impl AttrSelector {
    fn matches<T: ElementTree>(&self, tree: &T, node: &T::Node) -> bool {
        let Some(actual) = tree.attribute(node, &self.name) else {
            return false;
        };

        let Some((op, expected)) = &self.op else {
            return true;
        };
        let expected = expected.as_str();

        match op {
            AttrOp::Equals => actual == expected,
            AttrOp::Includes => {
                !expected.is_empty() && actual.split_ascii_whitespace().any(|w| w == expected)
            }
            AttrOp::DashMatch => {
                actual == expected
                    || (actual.starts_with(expected) && actual[expected.len()..].starts_with('-'))
            }
            AttrOp::Prefix => !expected.is_empty() && actual.starts_with(expected),
            AttrOp::Suffix => !expected.is_empty() && actual.ends_with(expected),
            AttrOp::Substring => !expected.is_empty() && actual.contains(expected),
        }
    }
}

// =============================================================================
// Parsing
// =============================================================================

struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_' || !c.is_ascii()
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_ws(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
        self.pos != start
    }

    fn unexpected(&self, found: char) -> SelectorError {
        SelectorError::Unexpected {
            pattern: self.src.to_string(),
            offset: self.pos,
            found,
        }
    }

    fn unterminated(&self, what: &'static str) -> SelectorError {
        SelectorError::Unterminated {
            pattern: self.src.to_string(),
            what,
        }
    }

    fn unsupported(&self, syntax: &str) -> SelectorError {
        SelectorError::Unsupported {
            pattern: self.src.to_string(),
            syntax: syntax.to_string(),
        }
    }

    fn ident(&mut self) -> Result<String, SelectorError> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c == '\\' {
                return Err(self.unsupported("escape"));
            }
            if !is_ident_char(c) {
                break;
            }
            self.bump();
        }
        if self.pos == start {
            return Err(match self.peek() {
                Some(c) => self.unexpected(c),
                None => self.unterminated("identifier"),
            });
        }
        Ok(self.src[start..self.pos].to_string())
    }

    fn parse_list(mut self) -> Result<SelectorList, SelectorError> {
        if self.src.trim().is_empty() {
            return Err(SelectorError::Empty);
        }

        let mut selectors = Vec::new();
        loop {
            selectors.push(self.parse_complex()?);
            match self.bump() {
                None => break,
                Some(',') => continue,
                Some(c) => {
                    self.pos -= c.len_utf8();
                    return Err(self.unexpected(c));
                }
            }
        }

        Ok(SelectorList { selectors })
    }

    fn parse_complex(&mut self) -> Result<Complex, SelectorError> {
        self.skip_ws();
        let first = self.required_compound()?;
        let mut compounds = vec![first];
        let mut combinators = Vec::new();

        loop {
            let had_ws = self.skip_ws();
            let combinator = match self.peek() {
                None | Some(',') => break,
                Some('>') => {
                    self.bump();
                    self.skip_ws();
                    Combinator::Child
                }
                Some(c @ ('+' | '~')) => return Err(self.unsupported(&c.to_string())),
                Some(_) if had_ws => Combinator::Descendant,
                Some(c) => return Err(self.unexpected(c)),
            };
            combinators.push(combinator);
            compounds.push(self.required_compound()?);
        }

        Ok(Complex { compounds, combinators })
    }

    fn required_compound(&mut self) -> Result<Compound, SelectorError> {
        let compound = self.parse_compound()?;
        if compound.is_empty() {
            return Err(match self.peek() {
                Some(c) => self.unexpected(c),
                None => self.unterminated("selector"),
            });
        }
        Ok(compound)
    }

    fn parse_compound(&mut self) -> Result<Compound, SelectorError> {
        let mut compound = Compound::default();

        match self.peek() {
            Some('*') => {
                self.bump();
                compound.universal = true;
            }
            Some(c) if is_ident_char(c) => {
                compound.tag = Some(self.ident()?.to_ascii_lowercase());
            }
            _ => {}
        }

        loop {
            match self.peek() {
                Some('#') => {
                    self.bump();
                    compound.ids.push(self.ident()?);
                }
                Some('.') => {
                    self.bump();
                    compound.classes.push(self.ident()?);
                }
                Some('[') => {
                    self.bump();
                    compound.attrs.push(self.parse_attr()?);
                }
                Some(':') => {
                    let start = self.pos;
                    self.bump();
                    if self.peek() == Some(':') {
                        self.bump();
                    }
                    let _ = self.ident();
                    let syntax = self.src[start..self.pos].to_string();
                    return Err(self.unsupported(&syntax));
                }
                _ => break,
            }
        }

        Ok(compound)
    }

    fn parse_attr(&mut self) -> Result<AttrSelector, SelectorError> {
        self.skip_ws();
        let name = self.ident()?.to_ascii_lowercase();
        self.skip_ws();

        let op = match self.bump() {
            None => return Err(self.unterminated("attribute selector")),
            Some(']') => return Ok(AttrSelector { name, op: None }),
            Some('=') => AttrOp::Equals,
            Some(c @ ('~' | '|' | '^' | '$' | '*')) => {
                if self.peek() != Some('=') {
                    return Err(match self.peek() {
                        Some(next) => self.unexpected(next),
                        None => self.unterminated("attribute selector"),
                    });
                }
                self.bump();
                match c {
                    '~' => AttrOp::Includes,
                    '|' => AttrOp::DashMatch,
                    '^' => AttrOp::Prefix,
                    '$' => AttrOp::Suffix,
                    _ => AttrOp::Substring,
                }
            }
            Some(c) => {
                self.pos -= c.len_utf8();
                return Err(self.unexpected(c));
            }
        };

        self.skip_ws();
        let value = match self.peek() {
            Some(quote @ ('"' | '\'')) => {
                self.bump();
                let start = self.pos;
                loop {
                    match self.bump() {
                        None => return Err(self.unterminated("string")),
                        Some('\\') => return Err(self.unsupported("escape")),
                        Some(c) if c == quote => break,
                        Some(_) => {}
                    }
                }
                self.src[start..self.pos - 1].to_string()
            }
            _ => self.ident()?,
        };

        self.skip_ws();
        match self.bump() {
            Some(']') => Ok(AttrSelector {
                name,
                op: Some((op, value)),
            }),
            None => Err(self.unterminated("attribute selector")),
            Some(c) if c.is_ascii_alphabetic() => Err(self.unsupported("attribute flag")),
            Some(c) => {
                self.pos -= c.len_utf8();
                Err(self.unexpected(c))
            }
        }
    }
}
