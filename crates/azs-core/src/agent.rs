//! Page Agent
//!
//! One [`PageAgent`] per page owns everything the content script installs:
//! the flag set, the navigation marker and the [`ActivePolicy`] handle. The
//! host only forwards events into it and schedules the re-evaluations it
//! asks for; there is no module-level state.

use std::time::Duration;

use crate::dom::Dom;
use crate::error::HookError;
use crate::gate::{InputEvent, InputKinds, Offset, ScrollGate, Verdict};
use crate::navigation::{
    NavTrigger, NavigationWatcher, RouteChange, MIN_POLL_INTERVAL, NAVIGATION_DEBOUNCE,
    POLL_INTERVAL, SETTINGS_DEBOUNCE,
};
use crate::settings::{FeatureFlags, Message};
use crate::sites::{classify_url, policy_for, PagePolicy, Site};
use crate::suppressor::{SuppressReport, Suppressor};

// =============================================================================
// Host capabilities
// =============================================================================

/// Listener and observer registration, provided by the host page.
pub trait EventHooks {
    /// Register one listener per kind. All-or-nothing: on error nothing
    /// stays registered.
    fn attach_input_listeners(&mut self, kinds: InputKinds) -> Result<(), HookError>;
    fn detach_input_listeners(&mut self);

    /// Start calling back into the agent after DOM mutations.
    fn observe_mutations(&mut self) -> Result<(), HookError>;
    fn disconnect_mutations(&mut self);
}

// =============================================================================
// Configuration
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgentConfig {
    pub nav_debounce: Duration,
    pub settings_debounce: Duration,
    pub poll_interval: Duration,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            nav_debounce: NAVIGATION_DEBOUNCE,
            settings_debounce: SETTINGS_DEBOUNCE,
            poll_interval: POLL_INTERVAL,
        }
    }
}

impl AgentConfig {
    /// Keep the polling fallback low-frequency.
    pub fn clamped(mut self) -> Self {
        self.poll_interval = self.poll_interval.max(MIN_POLL_INTERVAL);
        self
    }
}

// =============================================================================
// Active policy
// =============================================================================

/// The single installed policy of a page: at most one gate bundle, one
/// suppressor and one mutation observer.
pub struct ActivePolicy<N> {
    gate: ScrollGate<N>,
    suppressor: Suppressor,
    policy: Option<PagePolicy>,
    observing: bool,
}

impl<N> Default for ActivePolicy<N> {
    fn default() -> Self {
        Self {
            gate: ScrollGate::default(),
            suppressor: Suppressor::default(),
            policy: None,
            observing: false,
        }
    }
}

impl<N: Clone + PartialEq> ActivePolicy<N> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn policy(&self) -> Option<&PagePolicy> {
        self.policy.as_ref()
    }

    /// Install `policy`, tearing down whatever was installed before.
    pub fn start<D, H>(&mut self, dom: &D, hooks: &mut H, policy: PagePolicy, offset: Offset)
    where
        D: Dom<Node = N>,
        H: EventHooks,
    {
        self.stop(dom, hooks);

        if let Some(config) = policy.gate.clone() {
            if let Err(e) = self.gate.activate(dom, hooks, config, offset) {
                log::warn!("scroll gate not installed: {e}");
            }
        }
        if !policy.suppress.is_empty() {
            self.suppressor.start(dom, policy.suppress.clone());
        }

        // Late content needs the observer for re-suppression and for clip
        // containers rendered after the route change.
        let clips = self.gate.config().is_some_and(|c| !c.clip.is_empty());
        if self.suppressor.is_active() || clips {
            match hooks.observe_mutations() {
                Ok(()) => self.observing = true,
                // The initial pass still happened; the next re-evaluation retries.
                Err(e) => log::warn!("running without mutation observer: {e}"),
            }
        }
        self.policy = Some(policy);
    }

    /// Remove listeners, observers, clipping and every suppression marker.
    pub fn stop<D, H>(&mut self, dom: &D, hooks: &mut H)
    where
        D: Dom<Node = N>,
        H: EventHooks,
    {
        if std::mem::take(&mut self.observing) {
            hooks.disconnect_mutations();
        }
        self.gate.deactivate(dom, hooks);
        self.suppressor.stop(dom, true);
        self.policy = None;
    }

    pub fn on_mutations<D: Dom<Node = N>>(&mut self, dom: &D) -> SuppressReport {
        self.gate.clip(dom);
        self.suppressor.on_mutations(dom).unwrap_or_default()
    }

    pub fn handle_input<D: Dom<Node = N>>(
        &mut self,
        dom: &D,
        target: Option<&N>,
        event: &InputEvent,
        offset: Offset,
    ) -> Verdict {
        self.gate.decide(dom, target, event, offset)
    }
}

// =============================================================================
// Agent
// =============================================================================

pub struct PageAgent<D: Dom, H: EventHooks> {
    dom: D,
    hooks: H,
    config: AgentConfig,
    flags: FeatureFlags,
    site: Option<Site>,
    watcher: NavigationWatcher,
    active: ActivePolicy<D::Node>,
}

impl<D: Dom, H: EventHooks> PageAgent<D, H> {
    /// Build an agent for the page at `url`. Nothing is installed until the
    /// first [`PageAgent::reevaluate`].
    pub fn new(dom: D, hooks: H, url: &str, flags: FeatureFlags, config: AgentConfig) -> Self {
        let config = config.clamped();
        Self {
            dom,
            hooks,
            config,
            flags,
            site: classify_url(url),
            watcher: NavigationWatcher::new(url, config.nav_debounce),
            active: ActivePolicy::new(),
        }
    }

    pub fn dom(&self) -> &D {
        &self.dom
    }

    pub fn hooks(&self) -> &H {
        &self.hooks
    }

    pub fn config(&self) -> AgentConfig {
        self.config
    }

    pub fn site(&self) -> Option<Site> {
        self.site
    }

    pub fn flags(&self) -> &FeatureFlags {
        &self.flags
    }

    pub fn policy(&self) -> Option<&PagePolicy> {
        self.active.policy()
    }

    /// Last address seen by the navigation watcher.
    pub fn url(&self) -> &str {
        self.watcher.marker()
    }

    /// Tear everything down and install the policy for `url` from scratch.
    /// Safe to call any number of times.
    pub fn reevaluate(&mut self, url: &str, offset: Offset) {
        self.active.stop(&self.dom, &mut self.hooks);
        self.watcher.reset(url);
        self.site = classify_url(url);

        let policy = policy_for(self.site, url, &self.flags);
        if policy.is_idle() {
            log::debug!("nothing to install for {url}");
            return;
        }

        log::info!(
            "installing {} policy for {:?} view (gate: {}, {} suppression patterns)",
            self.site.map_or("no", Site::name),
            policy.view,
            policy.gate.as_ref().map_or("none".to_string(), |g| format!("{:?}", g.mode)),
            policy.suppress.len()
        );
        self.active.start(&self.dom, &mut self.hooks, policy, offset);
    }

    /// Apply a settings notification. Returns the delay after which the host
    /// must call [`PageAgent::reevaluate`].
    pub fn on_message(&mut self, message: &Message) -> Option<Duration> {
        match message.feature() {
            Ok((feature, value)) => {
                let previous = self.flags.set(feature, value);
                log::info!("setting {} changed: {previous} -> {value}", feature.key());
                Some(self.config.settings_debounce)
            }
            Err(e) => {
                log::warn!("ignoring message: {e}");
                None
            }
        }
    }

    /// Feed an observed address. Returns the re-evaluation delay when the
    /// section changed.
    pub fn on_navigation(&mut self, url: &str, trigger: NavTrigger) -> Option<Duration> {
        match self.watcher.observe(url, trigger) {
            RouteChange::SectionChanged { delay } => Some(delay),
            RouteChange::Unchanged | RouteChange::WithinSection => None,
        }
    }

    pub fn on_mutations(&mut self) -> SuppressReport {
        self.active.on_mutations(&self.dom)
    }

    pub fn handle_input(&mut self, target: Option<&D::Node>, event: &InputEvent, offset: Offset) -> Verdict {
        self.active.handle_input(&self.dom, target, event, offset)
    }

    /// Uninstall everything. The agent can be re-evaluated afterwards.
    pub fn shutdown(&mut self) {
        self.active.stop(&self.dom, &mut self.hooks);
        log::debug!("page agent stopped");
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::fixture::{FixtureDom, NodeId};
    use crate::gate::GateMode;
    use crate::settings::Feature;
    use crate::sites::View;

    /// Counts registrations instead of touching a real page.
    #[derive(Debug, Default)]
    pub struct RecordingHooks {
        pub attached_bundles: usize,
        pub attach_calls: usize,
        pub detach_calls: usize,
        pub refuse_attach: bool,
        pub observing: bool,
    }

    impl EventHooks for RecordingHooks {
        fn attach_input_listeners(&mut self, kinds: InputKinds) -> Result<(), HookError> {
            if self.refuse_attach {
                return Err(HookError::Listener {
                    kind: "wheel",
                    reason: format!("refused {kinds:?}"),
                });
            }
            self.attach_calls += 1;
            self.attached_bundles += 1;
            Ok(())
        }

        fn detach_input_listeners(&mut self) {
            self.detach_calls += 1;
            self.attached_bundles = self.attached_bundles.saturating_sub(1);
        }

        fn observe_mutations(&mut self) -> Result<(), HookError> {
            self.observing = true;
            Ok(())
        }

        fn disconnect_mutations(&mut self) {
            self.observing = false;
        }
    }

    const HOME: &str = "https://www.youtube.com/";

    struct Home {
        feed_item: NodeId,
        shelf: NodeId,
    }

    fn youtube_home(dom: &FixtureDom) -> Home {
        let browse = dom.append(dom.root(), "ytd-browse", &[("page-subtype", "home")]);
        let grid = dom.append(browse, "ytd-rich-grid-renderer", &[]);
        let feed_item = dom.append(grid, "ytd-rich-item-renderer", &[]);
        let shelf = dom.append(grid, "ytd-reel-shelf-renderer", &[]);
        Home { feed_item, shelf }
    }

    fn agent(url: &str, flags: FeatureFlags) -> PageAgent<FixtureDom, RecordingHooks> {
        PageAgent::new(
            FixtureDom::new(),
            RecordingHooks::default(),
            url,
            flags,
            AgentConfig::default(),
        )
    }

    #[test]
    fn test_reevaluate_keeps_single_bundle() {
        let mut agent = agent(HOME, FeatureFlags::default());
        youtube_home(agent.dom());

        for _ in 0..3 {
            agent.reevaluate(HOME, Offset::default());
        }
        assert_eq!(agent.hooks().attached_bundles, 1);
        assert_eq!(agent.hooks().attach_calls, 3);
        assert_eq!(agent.policy().map(|p| p.view), Some(View::Home));
    }

    #[test]
    fn test_unsupported_site_installs_nothing() {
        let mut agent = agent("https://example.com/", FeatureFlags::default());
        agent.reevaluate("https://example.com/", Offset::default());
        assert_eq!(agent.site(), None);
        assert!(agent.policy().is_none());
        assert_eq!(agent.hooks().attach_calls, 0);
        assert!(!agent.hooks().observing);
    }

    #[test]
    fn test_navigation_reruns_only_on_section_change() {
        let mut agent = agent("https://www.youtube.com/a/1", FeatureFlags::default());
        assert_eq!(agent.on_navigation("https://www.youtube.com/a/2", NavTrigger::PushState), None);
        assert_eq!(
            agent.on_navigation("https://www.youtube.com/b/1", NavTrigger::PushState),
            Some(NAVIGATION_DEBOUNCE)
        );
        assert_eq!(agent.url(), "https://www.youtube.com/b/1");
    }

    #[test]
    fn test_flag_off_tears_down_on_reevaluate() {
        let mut agent = agent(HOME, FeatureFlags::default());
        let page = youtube_home(agent.dom());
        agent.reevaluate(HOME, Offset::default());
        assert!(agent.dom().is_hidden(page.shelf));

        let delay = agent.on_message(&Message::setting_changed(Feature::YouTube, false));
        assert_eq!(delay, Some(SETTINGS_DEBOUNCE));
        assert!(!agent.flags().get(Feature::YouTube));

        agent.reevaluate(HOME, Offset::default());
        assert!(agent.policy().is_none());
        assert_eq!(agent.hooks().attached_bundles, 0);
        assert!(!agent.hooks().observing);
        assert!(!agent.dom().is_hidden(page.shelf));

        let wheel = InputEvent::Wheel { delta_x: 0.0, delta_y: 100.0 };
        assert_eq!(agent.handle_input(Some(&page.feed_item), &wheel, Offset::default()), Verdict::Pass);
    }

    #[test]
    fn test_unknown_message_is_ignored() {
        let mut agent = agent(HOME, FeatureFlags::default());
        let message = Message::SettingChanged {
            feature: "tiktok".to_string(),
            value: false,
        };
        assert_eq!(agent.on_message(&message), None);
        assert_eq!(*agent.flags(), FeatureFlags::default());
    }

    #[test]
    fn test_mutations_hide_late_content() {
        let mut agent = agent(HOME, FeatureFlags::default());
        youtube_home(agent.dom());
        agent.reevaluate(HOME, Offset::default());
        assert_eq!(agent.policy().and_then(|p| p.gate.as_ref()).map(|g| g.mode), Some(GateMode::VerticalOnly));

        let late = agent.dom().append(agent.dom().root(), "ytd-reel-shelf-renderer", &[]);
        assert_eq!(agent.on_mutations().hidden, 1);
        assert!(agent.dom().is_hidden(late));
    }

    #[test]
    fn test_x_home_clips_late_primary_column() {
        const X_HOME: &str = "https://x.com/home";
        let mut agent = agent(X_HOME, FeatureFlags::default());
        agent.reevaluate(X_HOME, Offset::default());
        assert_eq!(agent.policy().and_then(|p| p.gate.as_ref()).map(|g| g.mode), Some(GateMode::AllowList));
        assert!(agent.policy().is_some_and(|p| p.suppress.is_empty()));
        assert!(agent.hooks().observing);

        let column = agent
            .dom()
            .append(agent.dom().root(), "div", &[("data-testid", "primaryColumn")]);
        assert_eq!(agent.dom().inline_style(&column, "overflow"), None);
        agent.on_mutations();
        assert_eq!(agent.dom().inline_style(&column, "overflow").as_deref(), Some("hidden"));

        agent.shutdown();
        assert!(!agent.hooks().observing);
        assert_eq!(agent.dom().inline_style(&column, "overflow"), None);
    }

    #[test]
    fn test_shutdown_then_reevaluate() {
        let mut agent = agent(HOME, FeatureFlags::default());
        youtube_home(agent.dom());
        agent.reevaluate(HOME, Offset::default());
        agent.shutdown();
        assert_eq!(agent.hooks().attached_bundles, 0);
        agent.reevaluate(HOME, Offset::default());
        assert_eq!(agent.hooks().attached_bundles, 1);
    }

    #[test]
    fn test_poll_interval_is_bounded() {
        let config = AgentConfig {
            poll_interval: Duration::from_millis(10),
            ..AgentConfig::default()
        };
        assert_eq!(config.clamped().poll_interval, MIN_POLL_INTERVAL);
    }
}
