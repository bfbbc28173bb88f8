//! [`Dom`] over the live document, using the browser's own selector engine.

use azs_core::dom::Dom;
use azs_core::error::SelectorError;
use js_sys::Reflect;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{CssStyleDeclaration, Document, Element};

use crate::describe;

pub struct WebDom {
    document: Document,
}

impl WebDom {
    pub fn new(document: Document) -> Self {
        Self { document }
    }
}

/// `element.style`, for HTML and SVG elements alike.
fn style(node: &Element) -> Option<CssStyleDeclaration> {
    Reflect::get(node, &JsValue::from_str("style"))
        .ok()
        .and_then(|value| value.dyn_into::<CssStyleDeclaration>().ok())
}

fn host_error(pattern: &str, e: JsValue) -> SelectorError {
    SelectorError::Host(format!("{pattern:?}: {}", describe(&e)))
}

impl Dom for WebDom {
    type Node = Element;

    fn matches(&self, node: &Element, pattern: &str) -> Result<bool, SelectorError> {
        node.matches(pattern).map_err(|e| host_error(pattern, e))
    }

    fn parent(&self, node: &Element) -> Option<Element> {
        node.parent_element()
    }

    fn is_connected(&self, node: &Element) -> bool {
        node.is_connected()
    }

    fn is_root(&self, node: &Element) -> bool {
        let is_body = self
            .document
            .body()
            .is_some_and(|body| body.unchecked_ref::<Element>() == node);
        is_body || self.document.document_element().as_ref() == Some(node)
    }

    fn query_all(&self, pattern: &str) -> Result<Vec<Element>, SelectorError> {
        let list = self
            .document
            .query_selector_all(pattern)
            .map_err(|e| host_error(pattern, e))?;

        let mut nodes = Vec::with_capacity(list.length() as usize);
        for i in 0..list.length() {
            if let Some(element) = list.get(i).and_then(|n| n.dyn_into::<Element>().ok()) {
                nodes.push(element);
            }
        }
        Ok(nodes)
    }

    fn attribute(&self, node: &Element, name: &str) -> Option<String> {
        node.get_attribute(name)
    }

    fn set_attribute(&self, node: &Element, name: &str, value: &str) {
        if let Err(e) = node.set_attribute(name, value) {
            log::debug!("set_attribute({name}) failed: {}", describe(&e));
        }
    }

    fn remove_attribute(&self, node: &Element, name: &str) {
        let _ = node.remove_attribute(name);
    }

    fn inline_style(&self, node: &Element, property: &str) -> Option<String> {
        style(node)?
            .get_property_value(property)
            .ok()
            .filter(|value| !value.is_empty())
    }

    fn set_inline_style(&self, node: &Element, property: &str, value: Option<&str>) {
        let Some(style) = style(node) else {
            return;
        };
        let result = match value {
            Some(value) => style.set_property_with_priority(property, value, "important"),
            None => style.remove_property(property).map(|_| ()),
        };
        if let Err(e) = result {
            log::debug!("style {property} not updated: {}", describe(&e));
        }
    }
}
