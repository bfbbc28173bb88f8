//! Instagram

use crate::gate::{GateConfig, GateMode};
use crate::route::section;
use crate::settings::{Feature, FeatureFlags};

use super::{PagePolicy, Site, View};

/// Reels and Explore entry points, English and Spanish labels.
pub const PROMO: &[&str] = &[
    "a[href=\"/reels/\"]",
    "a[href*=\"/reels/\"]",
    "a[href=\"/explore/\"]",
    "a[href*=\"/explore/\"]",
    "[aria-label=\"Reels\"]",
    "[aria-label=\"Explore\"]",
    "[aria-label=\"Explorar\"]",
    "[aria-label=\"Carretes\"]",
    "[aria-label=\"Descubrir\"]",
    "svg[aria-label=\"Reels\"]",
    "svg[aria-label=\"Explore\"]",
    "svg[aria-label=\"Explorar\"]",
    "svg[aria-label=\"Carretes\"]",
    "div[role=\"tablist\"] a[href*=\"/reels/\"]",
    "div[role=\"tablist\"] a[href*=\"/explore/\"]",
];

/// Story viewers, message threads and navigation lists keep scrolling.
pub const ALLOW: &[&str] = &[
    "[role=\"dialog\"]",
    "[data-testid=\"stories-viewer\"]",
    "[data-testid=\"story-viewer-list\"]",
    ".story-container",
    "[data-testid=\"direct-messaging\"]",
    "[data-testid=\"thread-list\"]",
    "[data-testid=\"message-list\"]",
    "[data-testid=\"conversation-viewer\"]",
    "[data-testid=\"message-composer\"]",
    "[data-testid=\"inbox-list\"]",
    "[role=\"log\"]",
    ".message-container",
    ".thread-container",
    "nav[role=\"navigation\"]",
    "div[role=\"listbox\"]",
    "ul[role=\"list\"]",
];

pub const CLIP: &[&str] = &["main section > div"];

pub const TABLES: &[(&str, &[&str])] = &[
    ("instagram.promo", PROMO),
    ("instagram.allow", ALLOW),
    ("instagram.clip", CLIP),
];

pub fn view(path: &str) -> View {
    match section(path) {
        "direct" => View::Messages,
        "" => View::Home,
        "reels" => View::Shorts,
        _ => View::Other,
    }
}

pub fn policy(path: &str, flags: &FeatureFlags) -> PagePolicy {
    let view = view(path);
    let mut policy = PagePolicy::idle(Some(Site::Instagram), view);

    if !flags.get(Feature::Instagram) {
        return policy;
    }

    policy.suppress.extend(PROMO);
    if view != View::Messages {
        policy.gate = Some(GateConfig {
            mode: GateMode::AllowList,
            allow: ALLOW.to_vec(),
            clip: CLIP.to_vec(),
        });
    }

    policy
}
