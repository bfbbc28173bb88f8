//! Element Suppressor
//!
//! Hides elements matching a pattern set and keeps them hidden while the page
//! keeps injecting content. Every hidden element carries [`SUPPRESSED_ATTR`],
//! which makes repeat passes free and lets [`Suppressor::restore`] undo them.
//! The mutation observer feeding [`Suppressor::on_mutations`] is owned by
//! [`crate::agent::ActivePolicy`].

use crate::dom::Dom;

/// Marker attribute. Its value is the element's previous inline `display`
/// (empty when there was none).
pub const SUPPRESSED_ATTR: &str = "data-azs-suppressed";

const SUPPRESSED_SELECTOR: &str = "[data-azs-suppressed]";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SuppressReport {
    /// Elements hidden by this pass.
    pub hidden: usize,
    /// Patterns that failed to parse or evaluate.
    pub skipped_patterns: usize,
}

#[derive(Debug, Default)]
pub struct Suppressor {
    patterns: Vec<&'static str>,
    active: bool,
}

impl Suppressor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Apply `patterns` now and keep applying on every
    /// [`Suppressor::on_mutations`]. A running suppressor is stopped (without
    /// restoring) first.
    pub fn start<D: Dom>(&mut self, dom: &D, patterns: Vec<&'static str>) -> SuppressReport {
        self.stop(dom, false);
        self.patterns = patterns;
        self.active = true;

        let report = self.apply(dom);
        log::debug!(
            "suppressor active: {} patterns, {} hidden",
            self.patterns.len(),
            report.hidden
        );
        report
    }

    /// Stop re-applying. With `restore`, un-hide everything we hid.
    pub fn stop<D: Dom>(&mut self, dom: &D, restore: bool) {
        self.active = false;
        if restore {
            let restored = self.restore(dom);
            if restored > 0 {
                log::debug!("restored {restored} suppressed elements");
            }
        }
    }

    /// Mutation-observer callback.
    pub fn on_mutations<D: Dom>(&self, dom: &D) -> Option<SuppressReport> {
        if !self.active {
            return None;
        }
        Some(self.apply(dom))
    }

    /// One suppression pass over the current document.
    pub fn apply<D: Dom>(&self, dom: &D) -> SuppressReport {
        let mut report = SuppressReport::default();

        for pattern in &self.patterns {
            let nodes = match dom.query_all(pattern) {
                Ok(nodes) => nodes,
                Err(e) => {
                    log::warn!("skipping suppression pattern: {e}");
                    report.skipped_patterns += 1;
                    continue;
                }
            };

            for node in nodes {
                if dom.has_attribute(&node, SUPPRESSED_ATTR) {
                    continue;
                }
                let previous = dom.inline_style(&node, "display").unwrap_or_default();
                dom.set_attribute(&node, SUPPRESSED_ATTR, &previous);
                dom.set_inline_style(&node, "display", Some("none"));
                report.hidden += 1;
            }
        }

        report
    }

    /// Un-hide every marked element. Returns how many were restored.
    pub fn restore<D: Dom>(&self, dom: &D) -> usize {
        let nodes = match dom.query_all(SUPPRESSED_SELECTOR) {
            Ok(nodes) => nodes,
            Err(e) => {
                log::warn!("cannot restore suppressed elements: {e}");
                return 0;
            }
        };

        for node in &nodes {
            let previous = dom
                .attribute(node, SUPPRESSED_ATTR)
                .filter(|value| !value.is_empty());
            dom.set_inline_style(node, "display", previous.as_deref());
            dom.remove_attribute(node, SUPPRESSED_ATTR);
        }
        nodes.len()
    }
}
