//! X / Twitter
//!
//! Only the home and explore timelines are gated. Messages get a full bypass.

use crate::gate::{GateConfig, GateMode};
use crate::route::section;
use crate::settings::{Feature, FeatureFlags};

use super::{PagePolicy, Site, View};

pub const ALLOW: &[&str] = &[
    "[data-testid=\"dm-drawer\"]",
    "[data-testid=\"DMDrawer\"]",
    "[data-testid=\"conversation-container\"]",
    "[role=\"dialog\"]",
    "[data-testid=\"modal\"]",
    "[data-testid=\"settingsModal\"]",
    "[data-testid=\"sidebarColumn\"]",
    "[data-testid=\"Dropdown\"]",
    "[role=\"menu\"]",
];

pub const CLIP: &[&str] = &["[data-testid=\"primaryColumn\"]"];

pub const TABLES: &[(&str, &[&str])] = &[("x.allow", ALLOW), ("x.clip", CLIP)];

pub fn view(path: &str) -> View {
    match section(path) {
        "messages" => View::Messages,
        "" | "home" | "explore" => View::Home,
        _ => View::Other,
    }
}

pub fn policy(path: &str, flags: &FeatureFlags) -> PagePolicy {
    let view = view(path);
    let mut policy = PagePolicy::idle(Some(Site::X), view);

    if view == View::Home && flags.get(Feature::X) {
        policy.gate = Some(GateConfig {
            mode: GateMode::AllowList,
            allow: ALLOW.to_vec(),
            clip: CLIP.to_vec(),
        });
    }

    policy
}
