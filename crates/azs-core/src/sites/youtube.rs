//! YouTube
//!
//! Home feed: vertical scroll gated, Shorts shelves hidden, optionally the
//! whole recommendation grid. Watch pages: never gated. Shorts player: entry
//! points and next / previous controls hidden and every scroll input gated,
//! which is what stops swiping from one short to the next.

use crate::gate::{GateConfig, GateMode};
use crate::route::section;
use crate::settings::{Feature, FeatureFlags};

use super::{PagePolicy, Site, View};

/// Shorts entry points in the guide and links anywhere on the page.
pub const SHORTS_ENTRY: &[&str] = &[
    "a[href=\"/shorts\"]",
    "a[href*=\"/shorts/\"]",
    "ytd-guide-entry-renderer a[title=\"Shorts\"]",
    "ytd-mini-guide-entry-renderer[aria-label=\"Shorts\"]",
    "[title=\"Shorts\"]",
    "[aria-label=\"Shorts\"]",
];

/// Shorts shelves mixed into feeds, search results and watch-page suggestions.
pub const SHORTS_SHELVES: &[&str] = &[
    "ytd-rich-shelf-renderer[is-shorts]",
    "ytd-reel-shelf-renderer",
    "ytd-shorts-shelf-renderer",
    "ytd-rich-section-renderer ytd-rich-shelf-renderer[is-shorts]",
    "ytd-compact-video-renderer[is-shorts]",
    "ytd-video-renderer[is-shorts]",
    "[data-content-type=\"shorts\"]",
    "grid-shelf-view-model",
];

/// Up / down buttons of the Shorts player.
pub const SHORTS_NAVIGATION: &[&str] = &[
    "#navigation-button-down",
    "#navigation-button-up",
    "ytd-shorts #navigation-button-down",
    "ytd-shorts #navigation-button-up",
];

/// The recommendation grid on the home page.
pub const HOME_FEED: &[&str] = &[
    "ytd-browse[page-subtype=\"home\"] ytd-rich-grid-renderer",
    "ytd-browse[page-subtype=\"home\"] ytd-feed-filter-chip-bar-renderer",
];

/// Regions that keep scrolling on the home feed: menus, dialogs, the guide.
pub const HOME_ALLOW: &[&str] = &[
    "ytd-menu-popup-renderer",
    "[role=\"dialog\"]",
    "[role=\"menu\"]",
    "ytd-mini-guide-renderer",
    "ytd-dropdown-renderer",
    "tp-yt-iron-dropdown",
    "tp-yt-app-drawer",
    "#guide-inner-content",
];

pub const HOME_CLIP: &[&str] = &["ytd-two-column-browse-results-renderer #primary"];

/// Regions that keep scrolling inside the Shorts player: comments, menus.
pub const SHORTS_ALLOW: &[&str] = &[
    "ytd-engagement-panel-section-list-renderer",
    "ytd-menu-popup-renderer",
    "[role=\"dialog\"]",
    "[role=\"menu\"]",
];

pub const SHORTS_CLIP: &[&str] = &["#shorts-container"];

pub const TABLES: &[(&str, &[&str])] = &[
    ("youtube.shorts-entry", SHORTS_ENTRY),
    ("youtube.shorts-shelves", SHORTS_SHELVES),
    ("youtube.shorts-navigation", SHORTS_NAVIGATION),
    ("youtube.home-feed", HOME_FEED),
    ("youtube.home-allow", HOME_ALLOW),
    ("youtube.home-clip", HOME_CLIP),
    ("youtube.shorts-allow", SHORTS_ALLOW),
    ("youtube.shorts-clip", SHORTS_CLIP),
];

pub fn view(path: &str) -> View {
    match section(path) {
        "" | "feed" => View::Home,
        "watch" => View::Watch,
        "shorts" => View::Shorts,
        _ => View::Other,
    }
}

pub fn policy(path: &str, flags: &FeatureFlags) -> PagePolicy {
    let view = view(path);
    let enabled = flags.get(Feature::YouTube);
    let mut policy = PagePolicy::idle(Some(Site::YouTube), view);

    match view {
        View::Home => {
            if enabled {
                policy.gate = Some(GateConfig {
                    mode: GateMode::VerticalOnly,
                    allow: HOME_ALLOW.to_vec(),
                    clip: HOME_CLIP.to_vec(),
                });
                policy.suppress.extend(SHORTS_ENTRY);
                policy.suppress.extend(SHORTS_SHELVES);
            }
            if flags.get(Feature::YouTubeFeedHidden) {
                policy.suppress.extend(HOME_FEED);
            }
        }
        View::Shorts => {
            if enabled {
                policy.gate = Some(GateConfig {
                    mode: GateMode::AllowList,
                    allow: SHORTS_ALLOW.to_vec(),
                    clip: SHORTS_CLIP.to_vec(),
                });
                policy.suppress.extend(SHORTS_ENTRY);
                policy.suppress.extend(SHORTS_NAVIGATION);
            }
        }
        View::Watch | View::Messages | View::Other => {
            if enabled {
                policy.suppress.extend(SHORTS_ENTRY);
                policy.suppress.extend(SHORTS_SHELVES);
            }
        }
    }

    policy
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flags(youtube: bool, feed_hidden: bool) -> FeatureFlags {
        let mut flags = FeatureFlags::default();
        flags.set(Feature::YouTube, youtube);
        flags.set(Feature::YouTubeFeedHidden, feed_hidden);
        flags
    }

    #[test]
    fn test_home_gates_vertical_scroll() {
        for path in ["/", "/feed/subscriptions"] {
            let policy = policy(path, &flags(true, false));
            assert_eq!(policy.view, View::Home);
            let gate = policy.gate.expect("gate on home");
            assert_eq!(gate.mode, GateMode::VerticalOnly);
            assert!(gate.allow.contains(&"[role=\"dialog\"]"));
            assert!(policy.suppress.contains(&"ytd-reel-shelf-renderer"));
            assert!(!policy.suppress.iter().any(|p| HOME_FEED.contains(p)));
        }
    }

    #[test]
    fn test_feed_hidden_is_independent() {
        let policy = policy("/", &flags(false, true));
        assert!(policy.gate.is_none());
        assert_eq!(policy.suppress, HOME_FEED.to_vec());
    }

    #[test]
    fn test_watch_never_gated() {
        let policy = policy("/watch", &flags(true, true));
        assert_eq!(policy.view, View::Watch);
        assert!(policy.gate.is_none());
        assert!(policy.suppress.contains(&"ytd-compact-video-renderer[is-shorts]"));

        assert!(super::policy("/watch", &flags(false, false)).is_idle());
    }

    #[test]
    fn test_shorts_blocks_navigation() {
        let policy = policy("/shorts/abc123", &flags(true, false));
        assert_eq!(policy.view, View::Shorts);
        assert_eq!(policy.gate.as_ref().map(|g| g.mode), Some(GateMode::AllowList));
        assert!(policy.suppress.contains(&"#navigation-button-down"));
        assert!(super::policy("/shorts/abc123", &flags(false, false)).is_idle());
    }
}
