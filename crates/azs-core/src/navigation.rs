//! Navigation Watcher
//!
//! These sites rewrite the address on nearly every click, so a full policy
//! re-run on every change would thrash. The watcher keeps the last observed
//! address and only asks for a re-run when the first path segment (the
//! section) changes; deeper changes just move the marker.

use std::time::Duration;

use crate::route::url_section;

/// Delay between a section change and the re-run, letting the new view render.
pub const NAVIGATION_DEBOUNCE: Duration = Duration::from_millis(500);

/// Delay between a settings notification and the re-run.
pub const SETTINGS_DEBOUNCE: Duration = Duration::from_millis(100);

/// Fallback reconciliation period for missed navigation events.
pub const POLL_INTERVAL: Duration = Duration::from_millis(1000);

/// Polling never runs faster than this.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavTrigger {
    PushState,
    ReplaceState,
    PopState,
    Poll,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteChange {
    /// Same address as the marker.
    Unchanged,
    /// Deeper segments changed; marker updated, no re-run.
    WithinSection,
    /// Section changed; re-run the site handler after `delay`.
    SectionChanged { delay: Duration },
}

#[derive(Debug, Clone)]
pub struct NavigationWatcher {
    marker: String,
    debounce: Duration,
}

impl NavigationWatcher {
    pub fn new(url: &str, debounce: Duration) -> Self {
        Self {
            marker: url.to_string(),
            debounce,
        }
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }

    /// Move the marker without comparing, after a forced re-evaluation.
    pub fn reset(&mut self, url: &str) {
        if self.marker != url {
            self.marker = url.to_string();
        }
    }

    pub fn observe(&mut self, url: &str, trigger: NavTrigger) -> RouteChange {
        if url == self.marker {
            return RouteChange::Unchanged;
        }

        let before = url_section(&self.marker);
        let after = url_section(url);
        let change = if before == after {
            RouteChange::WithinSection
        } else {
            log::info!("section change via {trigger:?}: /{before} -> /{after}");
            RouteChange::SectionChanged {
                delay: self.debounce,
            }
        };

        self.marker = url.to_string();
        change
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_section_does_not_rerun() {
        let mut watcher = NavigationWatcher::new("https://example.com/a/1", NAVIGATION_DEBOUNCE);
        assert_eq!(
            watcher.observe("https://example.com/a/2", NavTrigger::PushState),
            RouteChange::WithinSection
        );
        assert_eq!(watcher.marker(), "https://example.com/a/2");
    }

    #[test]
    fn test_section_change_reruns_after_debounce() {
        let mut watcher = NavigationWatcher::new("https://example.com/a/1", NAVIGATION_DEBOUNCE);
        assert_eq!(
            watcher.observe("https://example.com/b/1", NavTrigger::PopState),
            RouteChange::SectionChanged { delay: NAVIGATION_DEBOUNCE }
        );
        assert_eq!(
            watcher.observe("https://example.com/b/1", NavTrigger::Poll),
            RouteChange::Unchanged
        );
    }

    #[test]
    fn test_query_only_change_stays_in_section() {
        let mut watcher =
            NavigationWatcher::new("https://www.youtube.com/watch?v=1", NAVIGATION_DEBOUNCE);
        assert_eq!(
            watcher.observe("https://www.youtube.com/watch?v=2", NavTrigger::ReplaceState),
            RouteChange::WithinSection
        );
        assert!(matches!(
            watcher.observe("https://www.youtube.com/", NavTrigger::PopState),
            RouteChange::SectionChanged { .. }
        ));
    }
}
