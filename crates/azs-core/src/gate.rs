//! Scroll Gate
//!
//! Decides, per input event, whether scrolling may proceed. The host attaches
//! one listener per [`InputKinds`] bit (wheel, key, touch, scroll), always as a
//! single bundle, and forwards every event to [`ScrollGate::decide`].
//!
//! Two policies:
//! - [`GateMode::AllowList`]: block every scroll input outside the allow-list.
//! - [`GateMode::VerticalOnly`]: block only vertical motion, so horizontal
//!   shelves and carousels keep working.

use serde::Serialize;

use crate::agent::EventHooks;
use crate::dom::Dom;
use crate::error::HookError;

// =============================================================================
// Configuration
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum GateMode {
    AllowList,
    VerticalOnly,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GateConfig {
    pub mode: GateMode,
    /// Regions exempt from blocking.
    pub allow: Vec<&'static str>,
    /// Containers whose scrollable area is clipped while the gate is active.
    pub clip: Vec<&'static str>,
}

bitflags::bitflags! {
    /// Input listener kinds in a bundle.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct InputKinds: u8 {
        const WHEEL = 1 << 0;
        const KEY = 1 << 1;
        /// touchstart + touchmove
        const TOUCH = 1 << 2;
        /// window scroll (programmatic scroll position changes)
        const SCROLL = 1 << 3;

        const ALL = Self::WHEEL.bits() | Self::KEY.bits() | Self::TOUCH.bits() | Self::SCROLL.bits();
    }
}

/// Key events that scroll the page.
const SCROLL_KEYS: &[&str] = &[
    " ",
    "Spacebar",
    "PageUp",
    "PageDown",
    "End",
    "Home",
    "ArrowLeft",
    "ArrowUp",
    "ArrowRight",
    "ArrowDown",
];

const HORIZONTAL_KEYS: &[&str] = &["ArrowLeft", "ArrowRight"];

/// Key targets that consume keys themselves (typing a space in a reply box).
const EDITABLE: &[&str] = &[
    "input",
    "textarea",
    "select",
    "[contenteditable=\"true\"]",
    "[contenteditable=\"\"]",
    "[role=\"textbox\"]",
];

/// Style properties rewritten on clipped containers.
const CLIP_STYLE: &[(&str, &str)] = &[("overflow", "hidden"), ("height", "100vh")];

// =============================================================================
// Events
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Offset {
    pub x: f64,
    pub y: f64,
}

impl Offset {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    Wheel { delta_x: f64, delta_y: f64 },
    /// `KeyboardEvent.key`
    Key { key: String },
    TouchStart { x: f64, y: f64 },
    TouchMove { x: f64, y: f64 },
    /// The window scrolled; the current offset is passed alongside.
    Scroll,
}

impl InputEvent {
    pub fn key(key: &str) -> Self {
        InputEvent::Key { key: key.to_string() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Verdict {
    Pass,
    /// `preventDefault()` + `stopPropagation()`
    Prevent,
    /// Scroll the window back to this offset.
    SnapBack(Offset),
}

pub fn is_scroll_key(key: &str) -> bool {
    SCROLL_KEYS.contains(&key)
}

// =============================================================================
// Gate
// =============================================================================

struct Clipped<N> {
    node: N,
    previous: Vec<(&'static str, Option<String>)>,
}

impl<N> Clipped<N> {
    fn restore<D: Dom<Node = N>>(&self, dom: &D) {
        for (prop, value) in &self.previous {
            dom.set_inline_style(&self.node, prop, value.as_deref());
        }
    }
}

pub struct ScrollGate<N> {
    config: Option<GateConfig>,
    accepted: Offset,
    last_touch: Option<(f64, f64)>,
    clipped: Vec<Clipped<N>>,
}

impl<N> Default for ScrollGate<N> {
    fn default() -> Self {
        Self {
            config: None,
            accepted: Offset::default(),
            last_touch: None,
            clipped: Vec::new(),
        }
    }
}

impl<N: Clone + PartialEq> ScrollGate<N> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.config.is_some()
    }

    pub fn config(&self) -> Option<&GateConfig> {
        self.config.as_ref()
    }

    /// Last offset the gate accepted; snap-backs return here.
    pub fn accepted_offset(&self) -> Offset {
        self.accepted
    }

    /// Install the listener bundle. An already-active gate is torn down first
    /// so there is never more than one bundle.
    pub fn activate<D, H>(
        &mut self,
        dom: &D,
        hooks: &mut H,
        config: GateConfig,
        offset: Offset,
    ) -> Result<(), HookError>
    where
        D: Dom<Node = N>,
        H: EventHooks,
    {
        self.deactivate(dom, hooks);

        hooks.attach_input_listeners(InputKinds::ALL)?;

        log::debug!(
            "scroll gate active ({:?}, {} allowed regions)",
            config.mode,
            config.allow.len()
        );
        self.accepted = offset;
        self.last_touch = None;
        self.config = Some(config);
        self.clip(dom);
        Ok(())
    }

    /// Remove the bundle and undo clipping. No-op when inactive.
    pub fn deactivate<D, H>(&mut self, dom: &D, hooks: &mut H)
    where
        D: Dom<Node = N>,
        H: EventHooks,
    {
        if self.config.take().is_none() {
            return;
        }
        hooks.detach_input_listeners();
        self.unclip(dom);
        self.last_touch = None;
        log::debug!("scroll gate removed");
    }

    /// Clip containers that appeared since activation. Already clipped
    /// containers are left alone; entries the page detached or re-rendered
    /// into something else are dropped.
    pub fn clip<D: Dom<Node = N>>(&mut self, dom: &D) {
        let Some(config) = &self.config else {
            return;
        };

        self.clipped.retain(|clipped| {
            if !dom.is_connected(&clipped.node) {
                return false;
            }
            let still_matches = config
                .clip
                .iter()
                .any(|pattern| dom.matches(&clipped.node, pattern).unwrap_or(false));
            if !still_matches {
                clipped.restore(dom);
            }
            still_matches
        });

        for pattern in &config.clip {
            let nodes = match dom.query_all(pattern) {
                Ok(nodes) => nodes,
                Err(e) => {
                    log::warn!("skipping clip pattern: {e}");
                    continue;
                }
            };
            for node in nodes {
                if self.clipped.iter().any(|c| c.node == node) {
                    continue;
                }
                let previous = CLIP_STYLE
                    .iter()
                    .map(|(prop, _)| (*prop, dom.inline_style(&node, prop)))
                    .collect();
                for (prop, value) in CLIP_STYLE {
                    dom.set_inline_style(&node, prop, Some(*value));
                }
                self.clipped.push(Clipped { node, previous });
            }
        }
    }

    fn unclip<D: Dom<Node = N>>(&mut self, dom: &D) {
        for clipped in self.clipped.drain(..) {
            clipped.restore(dom);
        }
    }

    /// Decide what to do with one input event.
    ///
    /// `target` is the event target element (`None` for the document/window),
    /// `offset` the window scroll offset at the time of the event.
    pub fn decide<D: Dom<Node = N>>(
        &mut self,
        dom: &D,
        target: Option<&N>,
        event: &InputEvent,
        offset: Offset,
    ) -> Verdict {
        let Some(config) = &self.config else {
            return Verdict::Pass;
        };

        let allowed = target.is_some_and(|t| dom.ancestors_matching_any(t, config.allow.as_slice()));
        if allowed {
            self.accepted = offset;
            if let InputEvent::TouchStart { x, y } | InputEvent::TouchMove { x, y } = event {
                self.last_touch = Some((*x, *y));
            }
            return Verdict::Pass;
        }

        let mode = config.mode;
        match event {
            InputEvent::Wheel { delta_x, delta_y } => match mode {
                GateMode::AllowList => Verdict::Prevent,
                GateMode::VerticalOnly if delta_y.abs() > delta_x.abs() => Verdict::Prevent,
                GateMode::VerticalOnly => Verdict::Pass,
            },
            InputEvent::Key { key } => {
                if !is_scroll_key(key) {
                    return Verdict::Pass;
                }
                if target.is_some_and(|t| EDITABLE.iter().any(|p| dom.matches(t, p).unwrap_or(false))) {
                    return Verdict::Pass;
                }
                if mode == GateMode::VerticalOnly && HORIZONTAL_KEYS.contains(&key.as_str()) {
                    return Verdict::Pass;
                }
                Verdict::Prevent
            }
            InputEvent::TouchStart { x, y } => {
                self.last_touch = Some((*x, *y));
                Verdict::Pass
            }
            InputEvent::TouchMove { x, y } => {
                let previous = self.last_touch.replace((*x, *y));
                match mode {
                    GateMode::AllowList => Verdict::Prevent,
                    GateMode::VerticalOnly => {
                        let (px, py) = previous.unwrap_or((*x, *y));
                        if (y - py).abs() > (x - px).abs() {
                            Verdict::Prevent
                        } else {
                            Verdict::Pass
                        }
                    }
                }
            }
            InputEvent::Scroll => match mode {
                GateMode::AllowList => {
                    if offset == self.accepted {
                        Verdict::Pass
                    } else {
                        Verdict::SnapBack(self.accepted)
                    }
                }
                GateMode::VerticalOnly => {
                    self.accepted.x = offset.x;
                    if offset.y == self.accepted.y {
                        Verdict::Pass
                    } else {
                        Verdict::SnapBack(Offset::new(offset.x, self.accepted.y))
                    }
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::tests::RecordingHooks;
    use crate::fixture::{FixtureDom, NodeId};

    fn config(mode: GateMode) -> GateConfig {
        GateConfig {
            mode,
            allow: vec!["[role=\"dialog\"]", "ytd-menu-popup-renderer"],
            clip: vec!["#primary"],
        }
    }

    struct Page {
        dom: FixtureDom,
        primary: NodeId,
        feed_item: NodeId,
        dialog_item: NodeId,
        input: NodeId,
    }

    fn page() -> Page {
        let dom = FixtureDom::new();
        let primary = dom.append(dom.root(), "div", &[("id", "primary"), ("style", "overflow: auto")]);
        let feed_item = dom.append(primary, "ytd-rich-item-renderer", &[]);
        let dialog = dom.append(dom.root(), "tp-yt-paper-dialog", &[("role", "dialog")]);
        let dialog_item = dom.append(dialog, "div", &[]);
        let input = dom.append(primary, "input", &[]);
        Page { dom, primary, feed_item, dialog_item, input }
    }

    fn active(page: &Page, mode: GateMode) -> (ScrollGate<NodeId>, RecordingHooks) {
        let mut gate = ScrollGate::new();
        let mut hooks = RecordingHooks::default();
        gate.activate(&page.dom, &mut hooks, config(mode), Offset::default()).unwrap();
        (gate, hooks)
    }

    #[test]
    fn test_allow_list_wheel() {
        let p = page();
        let (mut gate, _) = active(&p, GateMode::AllowList);
        let wheel = InputEvent::Wheel { delta_x: 0.0, delta_y: 120.0 };

        assert_eq!(gate.decide(&p.dom, Some(&p.dialog_item), &wheel, Offset::default()), Verdict::Pass);
        assert_eq!(gate.decide(&p.dom, Some(&p.feed_item), &wheel, Offset::default()), Verdict::Prevent);
        assert_eq!(gate.decide(&p.dom, None, &wheel, Offset::default()), Verdict::Prevent);
    }

    #[test]
    fn test_allow_list_keys() {
        let p = page();
        let (mut gate, _) = active(&p, GateMode::AllowList);

        for key in ["ArrowDown", "PageDown", " ", "End", "ArrowLeft"] {
            assert_eq!(
                gate.decide(&p.dom, Some(&p.feed_item), &InputEvent::key(key), Offset::default()),
                Verdict::Prevent,
                "{key}"
            );
        }
        assert_eq!(
            gate.decide(&p.dom, Some(&p.feed_item), &InputEvent::key("a"), Offset::default()),
            Verdict::Pass
        );
        assert_eq!(
            gate.decide(&p.dom, Some(&p.input), &InputEvent::key(" "), Offset::default()),
            Verdict::Pass
        );
    }

    #[test]
    fn test_vertical_only_wheel_and_keys() {
        let p = page();
        let (mut gate, _) = active(&p, GateMode::VerticalOnly);
        let t = Some(&p.feed_item);

        let horizontal = InputEvent::Wheel { delta_x: 10.0, delta_y: 2.0 };
        let vertical = InputEvent::Wheel { delta_x: 2.0, delta_y: 10.0 };
        assert_eq!(gate.decide(&p.dom, t, &horizontal, Offset::default()), Verdict::Pass);
        assert_eq!(gate.decide(&p.dom, t, &vertical, Offset::default()), Verdict::Prevent);

        assert_eq!(gate.decide(&p.dom, t, &InputEvent::key("ArrowLeft"), Offset::default()), Verdict::Pass);
        assert_eq!(gate.decide(&p.dom, t, &InputEvent::key("ArrowRight"), Offset::default()), Verdict::Pass);
        assert_eq!(gate.decide(&p.dom, t, &InputEvent::key("ArrowDown"), Offset::default()), Verdict::Prevent);
    }

    #[test]
    fn test_vertical_only_touch_uses_previous_sample() {
        let p = page();
        let (mut gate, _) = active(&p, GateMode::VerticalOnly);
        let t = Some(&p.feed_item);

        gate.decide(&p.dom, t, &InputEvent::TouchStart { x: 100.0, y: 100.0 }, Offset::default());
        assert_eq!(
            gate.decide(&p.dom, t, &InputEvent::TouchMove { x: 60.0, y: 95.0 }, Offset::default()),
            Verdict::Pass
        );
        assert_eq!(
            gate.decide(&p.dom, t, &InputEvent::TouchMove { x: 58.0, y: 40.0 }, Offset::default()),
            Verdict::Prevent
        );
    }

    #[test]
    fn test_scroll_snap_back() {
        let p = page();
        let (mut gate, _) = active(&p, GateMode::AllowList);

        assert_eq!(
            gate.decide(&p.dom, None, &InputEvent::Scroll, Offset::new(0.0, 300.0)),
            Verdict::SnapBack(Offset::new(0.0, 0.0))
        );

        // an event inside an allowed region moves the accepted offset
        let wheel = InputEvent::Wheel { delta_x: 0.0, delta_y: 50.0 };
        gate.decide(&p.dom, Some(&p.dialog_item), &wheel, Offset::new(0.0, 40.0));
        assert_eq!(gate.accepted_offset(), Offset::new(0.0, 40.0));
        assert_eq!(gate.decide(&p.dom, None, &InputEvent::Scroll, Offset::new(0.0, 40.0)), Verdict::Pass);
    }

    #[test]
    fn test_vertical_only_snap_back_keeps_x() {
        let p = page();
        let (mut gate, _) = active(&p, GateMode::VerticalOnly);
        assert_eq!(
            gate.decide(&p.dom, None, &InputEvent::Scroll, Offset::new(80.0, 500.0)),
            Verdict::SnapBack(Offset::new(80.0, 0.0))
        );
        assert_eq!(gate.decide(&p.dom, None, &InputEvent::Scroll, Offset::new(120.0, 0.0)), Verdict::Pass);
    }

    #[test]
    fn test_reactivation_keeps_single_bundle() {
        let p = page();
        let (mut gate, mut hooks) = active(&p, GateMode::AllowList);
        gate.activate(&p.dom, &mut hooks, config(GateMode::VerticalOnly), Offset::default())
            .unwrap();

        assert_eq!(hooks.attached_bundles, 1);
        assert_eq!(hooks.attach_calls, 2);
        assert_eq!(hooks.detach_calls, 1);
    }

    #[test]
    fn test_deactivate_reverts_clip_and_is_idempotent() {
        let p = page();
        let (mut gate, mut hooks) = active(&p, GateMode::AllowList);
        assert_eq!(p.dom.inline_style(&p.primary, "overflow").as_deref(), Some("hidden"));
        assert_eq!(p.dom.inline_style(&p.primary, "height").as_deref(), Some("100vh"));

        gate.deactivate(&p.dom, &mut hooks);
        gate.deactivate(&p.dom, &mut hooks);
        assert_eq!(p.dom.inline_style(&p.primary, "overflow").as_deref(), Some("auto"));
        assert_eq!(p.dom.inline_style(&p.primary, "height"), None);
        assert_eq!(hooks.detach_calls, 1);
        assert_eq!(hooks.attached_bundles, 0);

        let wheel = InputEvent::Wheel { delta_x: 0.0, delta_y: 120.0 };
        assert_eq!(gate.decide(&p.dom, Some(&p.feed_item), &wheel, Offset::default()), Verdict::Pass);
    }

    #[test]
    fn test_clip_forgets_replaced_containers() {
        let p = page();
        let (mut gate, _) = active(&p, GateMode::AllowList);
        assert_eq!(gate.clipped.len(), 1);

        // same-section re-render: the container is swapped for a fresh one
        for _ in 0..3 {
            let current = gate.clipped[0].node;
            p.dom.detach(current);
            let fresh = p.dom.append(p.dom.root(), "div", &[("id", "primary")]);
            gate.clip(&p.dom);
            assert_eq!(gate.clipped.len(), 1);
            assert_eq!(p.dom.inline_style(&fresh, "overflow").as_deref(), Some("hidden"));
        }
    }

    #[test]
    fn test_clip_restores_container_that_stopped_matching() {
        let p = page();
        let (mut gate, _) = active(&p, GateMode::AllowList);

        p.dom.set_attribute(&p.primary, "id", "secondary");
        gate.clip(&p.dom);
        assert!(gate.clipped.is_empty());
        assert_eq!(p.dom.inline_style(&p.primary, "overflow").as_deref(), Some("auto"));
        assert_eq!(p.dom.inline_style(&p.primary, "height"), None);
    }

    #[test]
    fn test_failed_attach_leaves_gate_inactive() {
        let p = page();
        let mut gate = ScrollGate::new();
        let mut hooks = RecordingHooks { refuse_attach: true, ..Default::default() };
        assert!(gate.activate(&p.dom, &mut hooks, config(GateMode::AllowList), Offset::default()).is_err());
        assert!(!gate.is_active());
        assert_eq!(p.dom.inline_style(&p.primary, "overflow").as_deref(), Some("auto"));
    }
}
