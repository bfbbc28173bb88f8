//! In-memory element tree
//!
//! A small arena-backed document used by the tests and the CLI. Node `0` is
//! the root (`body`). Inline styles live in the `style` attribute exactly like
//! in a browser, so attribute selectors such as `[style*="overflow: auto"]`
//! see them.

use std::cell::{Cell, RefCell};

use crate::dom::Dom;
use crate::error::SelectorError;
use crate::selector::{ElementTree, SelectorList};

pub type NodeId = usize;

#[derive(Debug, Clone)]
struct NodeData {
    tag: String,
    attrs: Vec<(String, String)>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[derive(Debug)]
pub struct FixtureDom {
    nodes: RefCell<Vec<NodeData>>,
    mutations: Cell<usize>,
}

impl Default for FixtureDom {
    fn default() -> Self {
        Self::new()
    }
}

impl FixtureDom {
    pub fn new() -> Self {
        Self {
            nodes: RefCell::new(vec![NodeData {
                tag: "body".to_string(),
                attrs: Vec::new(),
                parent: None,
                children: Vec::new(),
            }]),
            mutations: Cell::new(0),
        }
    }

    pub fn root(&self) -> NodeId {
        0
    }

    /// Append a new element under `parent`. Does not count as a mutation.
    pub fn append(&self, parent: NodeId, tag: &str, attrs: &[(&str, &str)]) -> NodeId {
        let mut nodes = self.nodes.borrow_mut();
        let id = nodes.len();
        nodes.push(NodeData {
            tag: tag.to_ascii_lowercase(),
            attrs: attrs
                .iter()
                .map(|(k, v)| (k.to_ascii_lowercase(), v.to_string()))
                .collect(),
            parent: Some(parent),
            children: Vec::new(),
        });
        nodes[parent].children.push(id);
        id
    }

    /// Remove `node` (and its subtree) from the document.
    pub fn detach(&self, node: NodeId) {
        let mut nodes = self.nodes.borrow_mut();
        if let Some(parent) = nodes[node].parent.take() {
            nodes[parent].children.retain(|&c| c != node);
        }
    }

    pub fn is_attached(&self, node: NodeId) -> bool {
        let nodes = self.nodes.borrow();
        let mut current = node;
        loop {
            if current == 0 {
                return true;
            }
            match nodes[current].parent {
                Some(p) => current = p,
                None => return false,
            }
        }
    }

    /// Attribute and style writes performed through [`Dom`].
    pub fn mutation_count(&self) -> usize {
        self.mutations.get()
    }

    pub fn attr(&self, node: NodeId, name: &str) -> Option<String> {
        let nodes = self.nodes.borrow();
        nodes[node]
            .attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.clone())
    }

    /// Hidden by an inline `display: none`, on the node or an ancestor.
    pub fn is_hidden(&self, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if self.inline_style(&id, "display").as_deref() == Some("none") {
                return true;
            }
            current = self.parent(&id);
        }
        false
    }

    fn descendants(&self, from: NodeId, out: &mut Vec<NodeId>) {
        out.push(from);
        let children = self.nodes.borrow()[from].children.clone();
        for child in children {
            self.descendants(child, out);
        }
    }

    fn write_attr(&self, node: NodeId, name: &str, value: Option<String>) {
        let mut nodes = self.nodes.borrow_mut();
        let attrs = &mut nodes[node].attrs;
        let pos = attrs.iter().position(|(k, _)| k == name);
        match (pos, value) {
            (Some(i), Some(v)) => attrs[i].1 = v,
            (None, Some(v)) => attrs.push((name.to_string(), v)),
            (Some(i), None) => {
                attrs.remove(i);
            }
            (None, None) => return,
        }
        self.mutations.set(self.mutations.get() + 1);
    }
}

/// Split an inline style attribute into `(property, value)` pairs, with the
/// `!important` suffix stripped from values.
fn parse_style(style: &str) -> Vec<(String, String)> {
    style
        .split(';')
        .filter_map(|decl| {
            let (prop, value) = decl.split_once(':')?;
            let prop = prop.trim().to_ascii_lowercase();
            let value = value.trim();
            let value = value.strip_suffix("!important").unwrap_or(value).trim();
            if prop.is_empty() {
                None
            } else {
                Some((prop, value.to_string()))
            }
        })
        .collect()
}

impl ElementTree for FixtureDom {
    type Node = NodeId;

    fn parent_element(&self, node: &NodeId) -> Option<NodeId> {
        self.nodes.borrow()[*node].parent
    }

    fn local_name(&self, node: &NodeId) -> String {
        self.nodes.borrow()[*node].tag.clone()
    }

    fn attribute(&self, node: &NodeId, name: &str) -> Option<String> {
        self.attr(*node, name)
    }
}

impl Dom for FixtureDom {
    type Node = NodeId;

    fn matches(&self, node: &NodeId, pattern: &str) -> Result<bool, SelectorError> {
        Ok(SelectorList::parse(pattern)?.matches(self, node))
    }

    fn parent(&self, node: &NodeId) -> Option<NodeId> {
        self.parent_element(node)
    }

    fn is_connected(&self, node: &NodeId) -> bool {
        self.is_attached(*node)
    }

    fn is_root(&self, node: &NodeId) -> bool {
        *node == self.root()
    }

    fn query_all(&self, pattern: &str) -> Result<Vec<NodeId>, SelectorError> {
        let list = SelectorList::parse(pattern)?;
        let mut all = Vec::new();
        self.descendants(self.root(), &mut all);
        Ok(all.into_iter().filter(|n| list.matches(self, n)).collect())
    }

    fn attribute(&self, node: &NodeId, name: &str) -> Option<String> {
        self.attr(*node, name)
    }

    fn set_attribute(&self, node: &NodeId, name: &str, value: &str) {
        self.write_attr(*node, name, Some(value.to_string()));
    }

    fn remove_attribute(&self, node: &NodeId, name: &str) {
        self.write_attr(*node, name, None);
    }

    fn inline_style(&self, node: &NodeId, property: &str) -> Option<String> {
        let style = self.attr(*node, "style")?;
        parse_style(&style)
            .into_iter()
            .find(|(p, _)| p == property)
            .map(|(_, v)| v)
    }

    fn set_inline_style(&self, node: &NodeId, property: &str, value: Option<&str>) {
        let mut decls = self
            .attr(*node, "style")
            .map(|s| parse_style(&s))
            .unwrap_or_default();
        decls.retain(|(p, _)| p != property);
        if let Some(v) = value {
            decls.push((property.to_string(), v.to_string()));
        }

        if decls.is_empty() {
            if self.has_attribute(node, "style") {
                self.write_attr(*node, "style", None);
            }
            return;
        }

        let serialized = decls
            .iter()
            .map(|(p, v)| format!("{p}: {v} !important"))
            .collect::<Vec<_>>()
            .join("; ");
        self.write_attr(*node, "style", Some(serialized));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_all_in_document_order() {
        let dom = FixtureDom::new();
        let a = dom.append(dom.root(), "div", &[("class", "x")]);
        let b = dom.append(a, "div", &[("class", "x")]);
        let c = dom.append(dom.root(), "div", &[("class", "x")]);
        assert_eq!(dom.query_all(".x").unwrap(), vec![a, b, c]);

        dom.detach(a);
        assert_eq!(dom.query_all(".x").unwrap(), vec![c]);
        assert!(!dom.is_attached(b));
    }

    #[test]
    fn test_inline_style_round_trip() {
        let dom = FixtureDom::new();
        let el = dom.append(dom.root(), "div", &[("style", "overflow: auto")]);
        assert_eq!(dom.inline_style(&el, "overflow").as_deref(), Some("auto"));

        dom.set_inline_style(&el, "height", Some("100vh"));
        assert_eq!(dom.inline_style(&el, "height").as_deref(), Some("100vh"));
        assert_eq!(dom.inline_style(&el, "overflow").as_deref(), Some("auto"));

        dom.set_inline_style(&el, "height", None);
        dom.set_inline_style(&el, "overflow", None);
        assert!(!dom.has_attribute(&el, "style"));
        assert_eq!(dom.mutation_count(), 3);
    }

    #[test]
    fn test_ancestors_matching_any_stops_at_root() {
        let dom = FixtureDom::new();
        dom.set_attribute(&dom.root(), "role", "dialog");
        let dialog = dom.append(dom.root(), "div", &[("role", "dialog")]);
        let inner = dom.append(dialog, "p", &[]);
        let outside = dom.append(dom.root(), "p", &[]);

        let allow = ["[role=\"dialog\"]"];
        assert!(dom.ancestors_matching_any(&inner, &allow));
        assert!(!dom.ancestors_matching_any(&outside, &allow));
        assert!(!dom.ancestors_matching_any(&inner, &["a:hover", "span"]));
        assert!(dom.ancestors_matching_any(&inner, &["a:hover", "div[role=dialog]"]));
    }
}
