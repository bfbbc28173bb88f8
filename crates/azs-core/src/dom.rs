//! Document capability interface
//!
//! Everything the gate and the suppressor do to a page goes through [`Dom`].
//! The browser binding implements it on top of `web_sys::Element` with native
//! selector matching; [`crate::fixture::FixtureDom`] implements it with the
//! crate's own selector engine for tests and offline tooling.

use crate::error::SelectorError;

pub trait Dom {
    type Node: Clone + PartialEq;

    /// Does `node` itself match `pattern`?
    fn matches(&self, node: &Self::Node, pattern: &str) -> Result<bool, SelectorError>;

    fn parent(&self, node: &Self::Node) -> Option<Self::Node>;

    /// Still part of the document?
    fn is_connected(&self, node: &Self::Node) -> bool;

    /// The boundary for ancestor walks (`document.body` in a browser).
    fn is_root(&self, node: &Self::Node) -> bool;

    /// All attached elements matching `pattern`, in document order.
    fn query_all(&self, pattern: &str) -> Result<Vec<Self::Node>, SelectorError>;

    fn attribute(&self, node: &Self::Node, name: &str) -> Option<String>;

    fn has_attribute(&self, node: &Self::Node, name: &str) -> bool {
        self.attribute(node, name).is_some()
    }

    fn set_attribute(&self, node: &Self::Node, name: &str, value: &str);
    fn remove_attribute(&self, node: &Self::Node, name: &str);

    /// Current inline value of a style property, if any.
    fn inline_style(&self, node: &Self::Node, property: &str) -> Option<String>;

    /// Set (`Some`) with `!important` or clear (`None`) an inline style property.
    fn set_inline_style(&self, node: &Self::Node, property: &str, value: Option<&str>);

    /// True when `node` or one of its ancestors, stopping before the root,
    /// matches any of `patterns`. Malformed patterns never match.
    fn ancestors_matching_any<P: AsRef<str>>(&self, node: &Self::Node, patterns: &[P]) -> bool {
        if patterns.is_empty() {
            return false;
        }

        let mut current = Some(node.clone());
        while let Some(el) = current {
            if self.is_root(&el) {
                break;
            }
            for pattern in patterns {
                match self.matches(&el, pattern.as_ref()) {
                    Ok(true) => return true,
                    Ok(false) => {}
                    Err(e) => log::debug!("skipping pattern: {e}"),
                }
            }
            current = self.parent(&el);
        }
        false
    }
}
